use tracing::{trace, warn};

use crate::math::Vec2;

use super::command::{Command, CommandQueue};
use super::entity::{Entity, EntityId, EntityIdAllocator, EntityRegistry, PlayerId, ShieldPolicy};
use super::player::{hostile_unit_at, Player};
use super::tuning::{DamageProfile, SimTuning};

/// Everything an entity may touch while it updates. The entity being updated
/// is not in `entities` for the duration of its own update.
pub(crate) struct UpdateContext<'a> {
    pub(crate) entities: &'a mut EntityRegistry,
    pub(crate) players: &'a [Player],
    pub(crate) commands: &'a mut CommandQueue,
    pub(crate) ids: &'a mut EntityIdAllocator,
    pub(crate) tuning: &'a SimTuning,
}

impl UpdateContext<'_> {
    pub(crate) fn dispatch(&mut self, command: Command) {
        if let Err(error) = self.commands.enqueue(command) {
            warn!(error = %error, "command_rejected");
        }
    }

    pub(crate) fn hostile_unit_at(&self, point: Vec2, shooter: PlayerId) -> Option<EntityId> {
        hostile_unit_at(self.players, self.entities, point, shooter)
    }

    /// Resolves one hit on `target` and queues its destruction once the hull
    /// is wrecked. Targets without health pools shrug the hit off.
    pub(crate) fn apply_hit(
        &mut self,
        source: EntityId,
        target: EntityId,
        damage: &DamageProfile,
        policy: ShieldPolicy,
    ) {
        let Some(health) = self.entities.get_mut(target).and_then(Entity::health_mut) else {
            return;
        };
        let layer = health.apply_hit(damage, policy);
        let wrecked = health.is_wrecked();
        trace!(
            source = source.0,
            target = target.0,
            layer = ?layer,
            hull = health.hull(),
            "hit_resolved"
        );
        if wrecked {
            self.dispatch(Command::Destroy { entity: target });
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sim::entity::{HealthPools, MovementProfile};
    use crate::sim::player::PlayerColor;

    /// Stand-alone world pieces for driving single entities: player 0 is the
    /// shooter side, player 1 the enemy.
    pub(crate) struct ContextFixture {
        pub(crate) entities: EntityRegistry,
        pub(crate) players: Vec<Player>,
        pub(crate) commands: CommandQueue,
        pub(crate) ids: EntityIdAllocator,
        pub(crate) tuning: SimTuning,
    }

    impl ContextFixture {
        pub(crate) fn new() -> Self {
            Self {
                entities: EntityRegistry::default(),
                players: vec![
                    Player::new(PlayerId(0), "local", PlayerColor::rgb(0, 128, 255)),
                    Player::new(PlayerId(1), "enemy", PlayerColor::rgb(255, 64, 0)),
                ],
                commands: CommandQueue::default(),
                ids: EntityIdAllocator::default(),
                tuning: SimTuning::default(),
            }
        }

        pub(crate) fn context(&mut self) -> UpdateContext<'_> {
            UpdateContext {
                entities: &mut self.entities,
                players: &self.players,
                commands: &mut self.commands,
                ids: &mut self.ids,
                tuning: &self.tuning,
            }
        }

        /// A vessel that is not registered anywhere, for driving by hand.
        pub(crate) fn local_vessel(&mut self, position: Vec2) -> Entity {
            Entity::vessel(
                self.ids.allocate(),
                PlayerId(0),
                position,
                MovementProfile::from_tuning(&self.tuning),
            )
        }

        pub(crate) fn spawn_local_attack_vessel(&mut self, position: Vec2) -> EntityId {
            self.spawn_attack_vessel(PlayerId(0), position)
        }

        pub(crate) fn spawn_enemy_attack_vessel(&mut self, position: Vec2) -> EntityId {
            self.spawn_attack_vessel(PlayerId(1), position)
        }

        fn spawn_attack_vessel(&mut self, owner: PlayerId, position: Vec2) -> EntityId {
            let id = self.ids.allocate();
            self.entities.insert(Entity::attack_vessel(
                id,
                owner,
                position,
                MovementProfile::from_tuning(&self.tuning),
                HealthPools::from_tuning(&self.tuning),
            ));
            self.players[owner.0].units.add(id);
            id
        }

        pub(crate) fn set_health(&mut self, id: EntityId, shield: f32, armor: f32, hull: f32) {
            if let Some(health) = self.entities.get_mut(id).and_then(Entity::health_mut) {
                *health = health.with_levels(shield, armor, hull);
            }
        }

        pub(crate) fn health_of(&self, id: EntityId) -> HealthPools {
            self.entities
                .get(id)
                .and_then(Entity::health)
                .copied()
                .expect("attack vessel health")
        }
    }
}
