mod audio;
mod command;
mod context;
mod dispatch;
mod entity;
mod formation;
mod group;
mod player;
mod state;
mod tuning;
mod turret;
mod universe;

pub use audio::{AudioCue, AudioQueue, AudioSink, MutedAudio};
pub use command::{Command, CommandError, CommandKind, CommandQueue, LockSubject};
pub use entity::{
    CombatSystems, DamageLayer, Entity, EntityBody, EntityId, EntityIdAllocator, EntityRegistry,
    HealthPools, HealthRatios, MovementProfile, PlayerId, Projectile, ProjectileKind,
    ShieldPolicy, Vessel, ENTITY_HALF_DIMENSION,
};
pub use formation::SquareFormation;
pub use group::Group;
pub use player::{Player, PlayerColor};
pub use state::{BeamState, BehaviorState, MoveState, StateTransition, TravelState};
pub use tuning::{DamageProfile, SimTuning, TuningError};
pub use turret::{MountPoint, Turret, TurretGroup, TurretKind, TurretState};
pub use universe::{OrderOutcome, TickReport, Universe, WorldError, LOCAL_PLAYER};
