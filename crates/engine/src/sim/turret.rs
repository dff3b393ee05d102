use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::Vec2;

use super::command::Command;
use super::context::UpdateContext;
use super::entity::{Entity, EntityId, PlayerId, Projectile, ProjectileKind};
use super::state::{BeamState, BehaviorState, TravelState};
use super::tuning::SimTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurretKind {
    Cannon,
    Laser,
}

/// Turrets run their own two-state machine beside the hosting entity's
/// behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurretState {
    #[default]
    Idle,
    AttackTarget,
}

/// Where a turret sits when it fires: the hosting vessel this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountPoint {
    pub vessel: EntityId,
    pub owner: PlayerId,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turret {
    kind: TurretKind,
    cooldown: u32,
    min_cooldown: u32,
    target: Option<EntityId>,
    state: TurretState,
}

impl Turret {
    /// A freshly mounted turret waits one full cooldown before its first shot.
    pub fn new(kind: TurretKind, tuning: &SimTuning) -> Self {
        let min_cooldown = match kind {
            TurretKind::Cannon => tuning.cannon_cooldown_ticks,
            TurretKind::Laser => tuning.laser_cooldown_ticks,
        };
        Self {
            kind,
            cooldown: min_cooldown,
            min_cooldown,
            target: None,
            state: TurretState::Idle,
        }
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn kind(&self) -> TurretKind {
        self.kind
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn min_cooldown(&self) -> u32 {
        self.min_cooldown
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn state(&self) -> TurretState {
        self.state
    }

    pub fn lock_on_target(&mut self, target: EntityId) {
        self.target = Some(target);
        self.state = TurretState::AttackTarget;
    }

    /// Counts the cooldown down by one tick; ready only once it sits at zero.
    pub fn can_shoot(&mut self) -> bool {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return false;
        }
        true
    }

    /// Range gate. Every turret currently reaches anywhere on the map.
    pub fn in_combat_range(&self, _mount: &MountPoint, _target_position: Vec2) -> bool {
        true
    }

    pub(crate) fn update(&mut self, mount: MountPoint, ctx: &mut UpdateContext<'_>) {
        if self.state != TurretState::AttackTarget {
            return;
        }

        let live_target = self
            .target
            .and_then(|id| ctx.entities.get(id))
            .filter(|entity| entity.is_alive_target())
            .map(|entity| (entity.id, entity.position));
        let Some((target, target_position)) = live_target else {
            debug!(vessel = mount.vessel.0, "turret_target_lost");
            self.target = None;
            self.state = TurretState::Idle;
            return;
        };

        if !self.in_combat_range(&mount, target_position) {
            return;
        }
        if !self.can_shoot() {
            return;
        }

        let projectile = self.launch_projectile(mount, target_position, ctx);
        debug!(
            vessel = mount.vessel.0,
            target = target.0,
            projectile = projectile.id.0,
            kind = ?self.kind,
            "turret_fired"
        );
        ctx.dispatch(Command::LaunchProjectile {
            projectile: Box::new(projectile),
        });
        self.cooldown = self.min_cooldown;
    }

    /// Builds the shot at the mount point, aimed at where the target is now.
    fn launch_projectile(
        &self,
        mount: MountPoint,
        aim: Vec2,
        ctx: &mut UpdateContext<'_>,
    ) -> Entity {
        let id = ctx.ids.allocate();
        let tuning = ctx.tuning;
        match self.kind {
            TurretKind::Cannon => Entity::projectile(
                id,
                mount.owner,
                mount.position,
                Projectile {
                    kind: ProjectileKind::Shell,
                    damage: tuning.cannon_damage,
                },
                BehaviorState::Travel(TravelState::new(
                    aim,
                    tuning.projectile_speed,
                    tuning.projectile_arrival_distance,
                    tuning.projectile_max_travel_ticks,
                )),
            ),
            TurretKind::Laser => Entity::projectile(
                id,
                mount.owner,
                mount.position,
                Projectile {
                    kind: ProjectileKind::LaserBeam,
                    damage: tuning.laser_damage,
                },
                BehaviorState::Beam(BeamState::new(aim, tuning.beam_duration_ticks)),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurretGroup {
    turrets: Vec<Turret>,
}

impl TurretGroup {
    pub fn add(&mut self, turret: Turret) {
        self.turrets.push(turret);
    }

    pub fn len(&self) -> usize {
        self.turrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turrets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turret> {
        self.turrets.iter()
    }

    pub fn lock_on_target(&mut self, target: EntityId) {
        for turret in &mut self.turrets {
            turret.lock_on_target(target);
        }
    }

    pub(crate) fn update(&mut self, mount: MountPoint, ctx: &mut UpdateContext<'_>) {
        for turret in &mut self.turrets {
            turret.update(mount, ctx);
        }
    }
}
