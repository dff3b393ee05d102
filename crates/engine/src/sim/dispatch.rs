use tracing::{debug, info, trace, warn};

use super::audio::AudioCue;
use super::command::{Command, CommandKind, CommandQueue};
use super::entity::{Entity, EntityBody, EntityId, PlayerId, ProjectileKind};
use super::group::Group;
use super::player::Player;
use super::universe::{Universe, LOCAL_PLAYER};

/// A unit collection a command may need to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitRoute {
    LocalUnits,
    Selection,
    PlayerUnits(PlayerId),
}

impl UnitRoute {
    fn is_local(self) -> bool {
        matches!(self, UnitRoute::LocalUnits | UnitRoute::Selection)
    }
}

impl Universe {
    /// Applies queued commands until the queue is empty, including commands
    /// enqueued while the drain is running.
    pub(crate) fn process_command_queue(&mut self) -> usize {
        self.drain_commands(|_, _| {})
    }

    /// Drain loop behind [`Universe::process_command_queue`]. `after_apply`
    /// sees the queue after each command lands and may push follow-ups.
    fn drain_commands(
        &mut self,
        mut after_apply: impl FnMut(&mut CommandQueue, CommandKind),
    ) -> usize {
        let mut applied = 0;
        while let Some(command) = self.commands.dequeue() {
            let kind = command.kind();
            self.apply_command(command);
            after_apply(&mut self.commands, kind);
            applied += 1;
        }
        applied
    }

    fn apply_command(&mut self, command: Command) {
        trace!(tick = self.tick, kind = ?command.kind(), "command_applied");
        if let Command::LaunchProjectile { projectile } = command {
            self.launch_projectile(*projectile);
            return;
        }

        let routes = self.unit_routes(command.subjects());
        self.dispatch_entity_command(&command);

        let mut reached_local = false;
        for route in routes {
            let applied = self.dispatch_unit_command(route, &command);
            reached_local |= applied && route.is_local();
        }

        if reached_local {
            match command {
                Command::Move { .. } => self.audio.enqueue(AudioCue::MovingToPosition),
                Command::LockOnTarget { .. } => self.audio.enqueue(AudioCue::TargetConfirmed),
                Command::LaunchProjectile { .. } | Command::Destroy { .. } => {}
            }
        }
    }

    fn unit_routes(&self, subjects: &[EntityId]) -> Vec<UnitRoute> {
        let holds_subject = |group: &Group| subjects.iter().any(|id| group.contains(*id));
        let mut routes = Vec::new();
        let Some(local) = self.players.get(LOCAL_PLAYER.0) else {
            return routes;
        };
        if holds_subject(&local.units) {
            routes.push(UnitRoute::LocalUnits);
        }
        if !local.selected_units.is_empty() {
            routes.push(UnitRoute::Selection);
        }
        routes.extend(
            self.players
                .iter()
                .filter(|player| player.id() != LOCAL_PLAYER && holds_subject(&player.units))
                .map(|player| UnitRoute::PlayerUnits(player.id())),
        );
        routes
    }

    /// Scene-level effects: only destruction lands here, since launches are
    /// handled before routing.
    fn dispatch_entity_command(&mut self, command: &Command) {
        let Command::Destroy { entity } = command else {
            return;
        };
        self.scene.remove(*entity);
        match self.entities.remove(*entity) {
            Some(removed) => info!(
                tick = self.tick,
                entity = entity.0,
                owner = removed.owner.0,
                kind = kind_label(&removed),
                "entity_destroyed"
            ),
            None => debug!(tick = self.tick, entity = entity.0, "destroy_target_missing"),
        }
    }

    /// Applies `command` to the members of one routed group. Returns whether
    /// any member was affected.
    fn dispatch_unit_command(&mut self, route: UnitRoute, command: &Command) -> bool {
        let Some(group) = route_group_mut(&mut self.players, route) else {
            return false;
        };

        match command {
            Command::Move { entity, destination } => {
                group.contains(*entity)
                    && self
                        .entities
                        .get_mut(*entity)
                        .is_some_and(|unit| unit.move_to(*destination))
            }
            Command::LockOnTarget { subject, target } => {
                let mut locked = false;
                for id in subject.ids() {
                    if !group.contains(*id) {
                        continue;
                    }
                    if let Some(unit) = self.entities.get_mut(*id) {
                        locked |= unit.lock_on_target(*target);
                    }
                }
                locked
            }
            Command::Destroy { entity } => group.remove(*entity),
            Command::LaunchProjectile { .. } => false,
        }
    }

    fn launch_projectile(&mut self, projectile: Entity) {
        let id = projectile.id;
        if self.entities.contains(id) {
            warn!(tick = self.tick, entity = id.0, "launch_id_collision");
            return;
        }
        debug!(
            tick = self.tick,
            entity = id.0,
            owner = projectile.owner.0,
            kind = kind_label(&projectile),
            "projectile_launched"
        );
        self.entities.insert(projectile);
        self.scene.add(id);
    }
}

fn route_group_mut(players: &mut [Player], route: UnitRoute) -> Option<&mut Group> {
    match route {
        UnitRoute::LocalUnits => players.get_mut(LOCAL_PLAYER.0).map(|player| &mut player.units),
        UnitRoute::Selection => players
            .get_mut(LOCAL_PLAYER.0)
            .map(|player| &mut player.selected_units),
        UnitRoute::PlayerUnits(id) => players.get_mut(id.0).map(|player| &mut player.units),
    }
}

fn kind_label(entity: &Entity) -> &'static str {
    match &entity.body {
        EntityBody::Vessel(vessel) if vessel.combat.is_some() => "attack_vessel",
        EntityBody::Vessel(_) => "vessel",
        EntityBody::Projectile(projectile) => match projectile.kind {
            ProjectileKind::Shell => "shell",
            ProjectileKind::LaserBeam => "laser_beam",
        },
    }
}
