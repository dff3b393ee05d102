use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::app::{EntityView, EntityViewKind, RenderSink};
use crate::math::{Bounds2D, Vec2};

use super::audio::{AudioCue, AudioQueue, AudioSink};
use super::command::{Command, CommandError, CommandQueue, LockSubject};
use super::context::UpdateContext;
use super::entity::{
    Entity, EntityBody, EntityId, EntityIdAllocator, EntityRegistry, HealthPools,
    MovementProfile, PlayerId, ProjectileKind,
};
use super::formation::SquareFormation;
use super::group::Group;
use super::player::{hostile_unit_at, Player, PlayerColor};
use super::tuning::{SimTuning, TuningError};
use super::turret::Turret;

/// The player whose input drives selection and orders. Always registered
/// first.
pub const LOCAL_PLAYER: PlayerId = PlayerId(0);

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("invalid simulation tuning: {0}")]
    Tuning(#[from] TuningError),
    #[error("player {0} is not registered")]
    UnknownPlayer(PlayerId),
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("entity {0} cannot carry turrets")]
    Unarmed(EntityId),
    #[error("spawn position {0:?} is not finite")]
    NonFinitePosition(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: u64,
    pub cues_played: usize,
    pub commands_applied: usize,
    pub entities_updated: usize,
}

/// What a click in the world turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOutcome {
    Selected(EntityId),
    LockedOn { target: EntityId, units: usize },
    Moved { units: usize },
    NoSelection,
}

/// The shared world: players, their unit groups, the scene group for
/// projectiles, and the command and audio queues that every mutation flows
/// through.
#[derive(Debug)]
pub struct Universe {
    tuning: SimTuning,
    formation: SquareFormation,
    pub(crate) entities: EntityRegistry,
    ids: EntityIdAllocator,
    pub(crate) players: Vec<Player>,
    pub(crate) scene: Group,
    pub(crate) commands: CommandQueue,
    pub(crate) audio: AudioQueue,
    pub(crate) tick: u64,
    debug_bounds: bool,
}

impl Universe {
    pub fn new(
        tuning: SimTuning,
        local_name: impl Into<String>,
        local_color: PlayerColor,
    ) -> Result<Self, WorldError> {
        tuning.validate()?;
        let formation = SquareFormation::from_tuning(&tuning);
        let local_name = local_name.into();
        info!(local_player = %local_name, "universe_created");
        Ok(Self {
            tuning,
            formation,
            entities: EntityRegistry::default(),
            ids: EntityIdAllocator::default(),
            players: vec![Player::new(LOCAL_PLAYER, local_name, local_color)],
            scene: Group::new(),
            commands: CommandQueue::default(),
            audio: AudioQueue::default(),
            tick: 0,
            debug_bounds: false,
        })
    }

    pub fn add_player(&mut self, name: impl Into<String>, color: PlayerColor) -> PlayerId {
        let id = PlayerId(self.players.len());
        let player = Player::new(id, name, color);
        info!(player = id.0, name = player.name(), "player_joined");
        self.players.push(player);
        id
    }

    pub fn tuning(&self) -> &SimTuning {
        &self.tuning
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0)
    }

    pub fn local_player(&self) -> &Player {
        &self.players[LOCAL_PLAYER.0]
    }

    pub fn scene(&self) -> &Group {
        &self.scene
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Direct access for scenario setup between ticks. Gameplay effects go
    /// through [`Universe::dispatch_command`].
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn pending_audio(&self) -> usize {
        self.audio.len()
    }

    pub fn debug_bounds(&self) -> bool {
        self.debug_bounds
    }

    pub fn set_debug_bounds(&mut self, enabled: bool) {
        self.debug_bounds = enabled;
    }

    pub fn spawn_vessel(
        &mut self,
        owner: PlayerId,
        position: Vec2,
    ) -> Result<EntityId, WorldError> {
        let movement = MovementProfile::from_tuning(&self.tuning);
        self.spawn_unit(owner, position, |id| Entity::vessel(id, owner, position, movement))
    }

    pub fn spawn_attack_vessel(
        &mut self,
        owner: PlayerId,
        position: Vec2,
    ) -> Result<EntityId, WorldError> {
        let movement = MovementProfile::from_tuning(&self.tuning);
        let health = HealthPools::from_tuning(&self.tuning);
        self.spawn_unit(owner, position, |id| {
            Entity::attack_vessel(id, owner, position, movement, health)
        })
    }

    fn spawn_unit(
        &mut self,
        owner: PlayerId,
        position: Vec2,
        build: impl FnOnce(EntityId) -> Entity,
    ) -> Result<EntityId, WorldError> {
        if owner.0 >= self.players.len() {
            return Err(WorldError::UnknownPlayer(owner));
        }
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition(position));
        }
        let id = self.ids.allocate();
        self.entities.insert(build(id));
        self.players[owner.0].units.add(id);
        debug!(entity = id.0, owner = owner.0, x = position.x, y = position.y, "unit_spawned");
        Ok(id)
    }

    pub fn mount_turret(&mut self, vessel: EntityId, turret: Turret) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(vessel)
            .ok_or(WorldError::UnknownEntity(vessel))?;
        let combat = entity.combat_mut().ok_or(WorldError::Unarmed(vessel))?;
        debug!(entity = vessel.0, kind = ?turret.kind(), "turret_mounted");
        combat.turrets.add(turret);
        Ok(())
    }

    /// Queues a command for the next drain. Nothing changes until then.
    pub fn dispatch_command(&mut self, command: Command) -> Result<(), CommandError> {
        self.commands.enqueue(command)
    }

    pub fn dispatch_audio(&mut self, cue: AudioCue) {
        self.audio.enqueue(cue);
    }

    pub fn hostile_unit_at(&self, point: Vec2, viewer: PlayerId) -> Option<EntityId> {
        hostile_unit_at(&self.players, &self.entities, point, viewer)
    }

    /// One simulation step: hand queued cues to `audio`, apply every queued
    /// command (including ones queued along the way), then update each
    /// player's units in registration order followed by the scene.
    pub fn update(&mut self, audio: &mut dyn AudioSink) -> TickReport {
        self.tick = self.tick.saturating_add(1);
        let cues_played = self.audio.drain_into(audio);
        let commands_applied = self.process_command_queue();

        let mut entities_updated = 0;
        for player_index in 0..self.players.len() {
            let mut member = 0;
            while let Some(id) = self.players[player_index].units.get(member) {
                entities_updated += usize::from(self.update_entity(id));
                member += 1;
            }
        }
        let mut member = 0;
        while let Some(id) = self.scene.get(member) {
            entities_updated += usize::from(self.update_entity(id));
            member += 1;
        }

        TickReport {
            tick: self.tick,
            cues_played,
            commands_applied,
            entities_updated,
        }
    }

    fn update_entity(&mut self, id: EntityId) -> bool {
        let Some(mut entity) = self.entities.remove(id) else {
            return false;
        };
        {
            let mut ctx = UpdateContext {
                entities: &mut self.entities,
                players: &self.players,
                commands: &mut self.commands,
                ids: &mut self.ids,
                tuning: &self.tuning,
            };
            entity.update(&mut ctx);
        }
        self.entities.insert(entity);
        true
    }

    /// Read-only pass over the same groups, in the same order, as `update`.
    pub fn render(&self, sink: &mut dyn RenderSink) {
        for player in &self.players {
            for id in player.units.iter() {
                self.render_entity(id, sink);
            }
        }
        for id in self.scene.iter() {
            self.render_entity(id, sink);
        }
    }

    fn render_entity(&self, id: EntityId, sink: &mut dyn RenderSink) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let kind = match &entity.body {
            EntityBody::Vessel(vessel) if vessel.combat.is_some() => EntityViewKind::AttackVessel,
            EntityBody::Vessel(_) => EntityViewKind::Vessel,
            EntityBody::Projectile(projectile) => match projectile.kind {
                ProjectileKind::Shell => EntityViewKind::Shell,
                ProjectileKind::LaserBeam => EntityViewKind::LaserBeam,
            },
        };
        let view = EntityView {
            id,
            owner: entity.owner,
            color: self
                .player(entity.owner)
                .map(Player::color)
                .unwrap_or_default(),
            position: entity.position,
            bounds: entity.bounds(),
            kind,
            selected: entity.is_selected(),
            health: entity.health().map(HealthPools::ratios),
            state: entity.state.name(),
        };
        sink.draw_entity(&view);
        entity.state.render(entity, sink);
        if self.debug_bounds {
            sink.draw_bounds(entity.bounds());
        }
    }

    /// Adds the local unit under `point` to the selection.
    pub fn select_at(&mut self, point: Vec2) -> Option<EntityId> {
        let id = self.players[LOCAL_PLAYER.0]
            .units
            .find_one_by_coordinates(point, &self.entities)?;
        self.mark_selected(id);
        Some(id)
    }

    /// Selects every local unit whose position lies inside the rectangle
    /// spanned by the two corners, edges included. Returns how many units
    /// joined the selection.
    pub fn select_in_rect(&mut self, corner_a: Vec2, corner_b: Vec2) -> usize {
        let area = Bounds2D::from_corners(corner_a, corner_b);
        let inside: Vec<EntityId> = self.players[LOCAL_PLAYER.0]
            .units
            .iter()
            .filter(|id| {
                self.entities
                    .get(*id)
                    .is_some_and(|entity| area.contains_point_inclusive(entity.position))
            })
            .collect();
        inside.into_iter().filter(|id| self.mark_selected(*id)).count()
    }

    fn mark_selected(&mut self, id: EntityId) -> bool {
        if !self.players[LOCAL_PLAYER.0].selected_units.add(id) {
            return false;
        }
        if let Some(vessel) = self.entities.get_mut(id).and_then(Entity::as_vessel_mut) {
            vessel.selected = true;
        }
        debug!(entity = id.0, "unit_selected");
        true
    }

    pub fn clear_selection(&mut self) -> usize {
        let selection = &mut self.players[LOCAL_PLAYER.0].selected_units;
        let cleared = selection.len();
        for id in selection.iter() {
            if let Some(vessel) = self.entities.get_mut(id).and_then(Entity::as_vessel_mut) {
                vessel.selected = false;
            }
        }
        selection.clear();
        cleared
    }

    /// Turns a world-space click into orders for the local player. Enemies
    /// under the cursor are locked on by the whole selection; own units are
    /// added to the selection; anywhere else is a move, spread over a
    /// formation when more than one unit is selected. When an enemy and an own
    /// unit overlap under the cursor, the enemy wins.
    pub fn issue_order_at<R: Rng + ?Sized>(
        &mut self,
        point: Vec2,
        rng: &mut R,
    ) -> Result<OrderOutcome, CommandError> {
        if let Some(target) = self.hostile_unit_at(point, LOCAL_PLAYER) {
            let selection = self.local_player().selected_units.ids().to_vec();
            if selection.is_empty() {
                return Ok(OrderOutcome::NoSelection);
            }
            let units = selection.len();
            self.dispatch_command(Command::LockOnTarget {
                subject: LockSubject::Group(selection),
                target,
            })?;
            return Ok(OrderOutcome::LockedOn { target, units });
        }

        if let Some(id) = self.select_at(point) {
            return Ok(OrderOutcome::Selected(id));
        }

        let selection = self.local_player().selected_units.ids().to_vec();
        match selection.as_slice() {
            [] => Ok(OrderOutcome::NoSelection),
            [only] => {
                self.dispatch_command(Command::Move {
                    entity: *only,
                    destination: point,
                })?;
                Ok(OrderOutcome::Moved { units: 1 })
            }
            units => {
                let destinations = self.formation.compute_destinations(units.len(), point, rng);
                for (entity, destination) in units.iter().zip(destinations) {
                    self.dispatch_command(Command::Move {
                        entity: *entity,
                        destination,
                    })?;
                }
                Ok(OrderOutcome::Moved { units: units.len() })
            }
        }
    }
}
