use std::collections::HashMap;
use std::fmt;
use std::mem;

use crate::math::{Bounds2D, Vec2};

use super::context::UpdateContext;
use super::state::{BehaviorState, MoveState, StateTransition};
use super::tuning::{DamageProfile, SimTuning};
use super::turret::{MountPoint, TurretGroup};

/// Half the side length of every entity's square hit box, in world units.
pub const ENTITY_HALF_DIMENSION: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Index of a player inside the universe's player list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageLayer {
    Shield,
    Armor,
    Hull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldPolicy {
    Respect,
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthRatios {
    pub shield: f32,
    pub armor: f32,
    pub hull: f32,
}

/// Shield, armor and hull pools, each kept in `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPools {
    shield: f32,
    armor: f32,
    hull: f32,
    max_shield: f32,
    max_armor: f32,
    max_hull: f32,
}

impl HealthPools {
    pub fn full(max_shield: f32, max_armor: f32, max_hull: f32) -> Self {
        let max_shield = max_shield.max(0.0);
        let max_armor = max_armor.max(0.0);
        let max_hull = max_hull.max(0.0);
        Self {
            shield: max_shield,
            armor: max_armor,
            hull: max_hull,
            max_shield,
            max_armor,
            max_hull,
        }
    }

    pub fn from_tuning(tuning: &SimTuning) -> Self {
        Self::full(tuning.max_shield, tuning.max_armor, tuning.max_hull)
    }

    /// Overrides the current levels, clamped into `[0, max]`.
    pub fn with_levels(mut self, shield: f32, armor: f32, hull: f32) -> Self {
        self.shield = shield.clamp(0.0, self.max_shield);
        self.armor = armor.clamp(0.0, self.max_armor);
        self.hull = hull.clamp(0.0, self.max_hull);
        self
    }

    pub fn shield(&self) -> f32 {
        self.shield
    }

    pub fn armor(&self) -> f32 {
        self.armor
    }

    pub fn hull(&self) -> f32 {
        self.hull
    }

    pub fn is_alive(&self) -> bool {
        self.hull > 0.0
    }

    /// Below one hull point the vessel counts as wrecked.
    pub fn is_wrecked(&self) -> bool {
        self.hull < 1.0
    }

    /// Applies a single hit to the outermost non-empty layer. Only that layer
    /// changes; the rest of the damage profile is ignored. Returns the layer
    /// that absorbed the hit, or `None` when every eligible layer is empty.
    pub fn apply_hit(
        &mut self,
        damage: &DamageProfile,
        policy: ShieldPolicy,
    ) -> Option<DamageLayer> {
        if policy == ShieldPolicy::Respect && self.shield > 0.0 {
            self.shield = settle_layer(self.shield - damage.shield, self.max_shield);
            return Some(DamageLayer::Shield);
        }
        if self.armor > 0.0 {
            self.armor = settle_layer(self.armor - damage.armor, self.max_armor);
            return Some(DamageLayer::Armor);
        }
        if self.hull > 0.0 {
            self.hull = settle_layer(self.hull - damage.hull, self.max_hull);
            return Some(DamageLayer::Hull);
        }
        None
    }

    pub fn ratios(&self) -> HealthRatios {
        HealthRatios {
            shield: ratio(self.shield, self.max_shield),
            armor: ratio(self.armor, self.max_armor),
            hull: ratio(self.hull, self.max_hull),
        }
    }
}

// Fractions of a point are not kept: anything under 1 drops to zero.
fn settle_layer(value: f32, max: f32) -> f32 {
    if !(value >= 1.0) {
        0.0
    } else {
        value.min(max)
    }
}

fn ratio(value: f32, max: f32) -> f32 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementProfile {
    pub acceleration: f32,
    pub max_velocity: f32,
    pub arrival_threshold: f32,
}

impl MovementProfile {
    pub fn from_tuning(tuning: &SimTuning) -> Self {
        Self {
            acceleration: tuning.vessel_acceleration,
            max_velocity: tuning.vessel_max_velocity,
            arrival_threshold: tuning.move_arrival_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CombatSystems {
    pub health: HealthPools,
    pub turrets: TurretGroup,
}

#[derive(Debug, Clone)]
pub struct Vessel {
    pub movement: MovementProfile,
    pub selected: bool,
    /// Present on attack vessels only.
    pub combat: Option<CombatSystems>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    Shell,
    LaserBeam,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub damage: DamageProfile,
}

#[derive(Debug, Clone)]
pub enum EntityBody {
    Vessel(Vessel),
    Projectile(Projectile),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub owner: PlayerId,
    pub position: Vec2,
    pub scale: f32,
    pub state: BehaviorState,
    pub body: EntityBody,
}

impl Entity {
    pub fn vessel(
        id: EntityId,
        owner: PlayerId,
        position: Vec2,
        movement: MovementProfile,
    ) -> Self {
        Self {
            id,
            owner,
            position,
            scale: 1.0,
            state: BehaviorState::Idle,
            body: EntityBody::Vessel(Vessel {
                movement,
                selected: false,
                combat: None,
            }),
        }
    }

    pub fn attack_vessel(
        id: EntityId,
        owner: PlayerId,
        position: Vec2,
        movement: MovementProfile,
        health: HealthPools,
    ) -> Self {
        let mut entity = Self::vessel(id, owner, position, movement);
        if let EntityBody::Vessel(vessel) = &mut entity.body {
            vessel.combat = Some(CombatSystems {
                health,
                turrets: TurretGroup::default(),
            });
        }
        entity
    }

    pub fn projectile(
        id: EntityId,
        owner: PlayerId,
        position: Vec2,
        projectile: Projectile,
        state: BehaviorState,
    ) -> Self {
        Self {
            id,
            owner,
            position,
            scale: 1.0,
            state,
            body: EntityBody::Projectile(projectile),
        }
    }

    /// Recomputed from the current position on every call.
    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::around(self.position, ENTITY_HALF_DIMENSION * self.scale)
    }

    pub fn as_vessel(&self) -> Option<&Vessel> {
        match &self.body {
            EntityBody::Vessel(vessel) => Some(vessel),
            EntityBody::Projectile(_) => None,
        }
    }

    pub fn as_vessel_mut(&mut self) -> Option<&mut Vessel> {
        match &mut self.body {
            EntityBody::Vessel(vessel) => Some(vessel),
            EntityBody::Projectile(_) => None,
        }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.body {
            EntityBody::Projectile(projectile) => Some(projectile),
            EntityBody::Vessel(_) => None,
        }
    }

    pub fn combat(&self) -> Option<&CombatSystems> {
        self.as_vessel().and_then(|vessel| vessel.combat.as_ref())
    }

    pub fn combat_mut(&mut self) -> Option<&mut CombatSystems> {
        self.as_vessel_mut()
            .and_then(|vessel| vessel.combat.as_mut())
    }

    pub fn health(&self) -> Option<&HealthPools> {
        self.combat().map(|combat| &combat.health)
    }

    pub fn health_mut(&mut self) -> Option<&mut HealthPools> {
        self.combat_mut().map(|combat| &mut combat.health)
    }

    /// Liveness as seen by a turret: an attack vessel with hull left.
    pub fn is_alive_target(&self) -> bool {
        self.health().is_some_and(HealthPools::is_alive)
    }

    pub fn is_selected(&self) -> bool {
        self.as_vessel().is_some_and(|vessel| vessel.selected)
    }

    /// Starts a move order. Returns `false` for entities that cannot steer.
    pub fn move_to(&mut self, destination: Vec2) -> bool {
        let Some(vessel) = self.as_vessel() else {
            return false;
        };
        self.state = BehaviorState::Move(MoveState::new(destination, vessel.movement));
        true
    }

    /// Points every turret at `target` and drops any pending move. Returns
    /// `false` when the entity carries no weapons.
    pub fn lock_on_target(&mut self, target: EntityId) -> bool {
        let Some(combat) = self.combat_mut() else {
            return false;
        };
        combat.turrets.lock_on_target(target);
        self.state = BehaviorState::Idle;
        true
    }

    pub(crate) fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let mut state = mem::take(&mut self.state);
        let transition = state.update(self, ctx);
        self.state = match transition {
            StateTransition::Stay => state,
            StateTransition::Enter(next) => next,
        };

        let mount = MountPoint {
            vessel: self.id,
            owner: self.owner,
            position: self.position,
        };
        if let Some(combat) = self.combat_mut() {
            combat.turrets.update(mount, ctx);
        }
    }
}

/// Owns every live entity. Groups refer to members by id only.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
}

impl EntityRegistry {
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Inserts `entity`, handing back any record previously stored under its id.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id, entity)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools() -> HealthPools {
        HealthPools::full(100.0, 100.0, 100.0)
    }

    #[test]
    fn shield_absorbs_hit_before_armor_and_hull() {
        let mut health = pools();
        let layer = health.apply_hit(&DamageProfile::LASER_BEAM, ShieldPolicy::Respect);

        assert_eq!(layer, Some(DamageLayer::Shield));
        assert_eq!(health.shield(), 99.5);
        assert_eq!(health.armor(), 100.0);
        assert_eq!(health.hull(), 100.0);
    }

    #[test]
    fn armor_absorbs_hit_once_shield_is_down() {
        let mut health = HealthPools {
            shield: 0.0,
            ..pools()
        };
        let layer = health.apply_hit(&DamageProfile::LASER_BEAM, ShieldPolicy::Respect);

        assert_eq!(layer, Some(DamageLayer::Armor));
        assert_eq!(health.armor(), 98.0);
        assert_eq!(health.hull(), 100.0);
    }

    #[test]
    fn bypass_skips_a_full_shield() {
        let mut health = pools();
        let layer = health.apply_hit(&DamageProfile::CANNON_SHELL, ShieldPolicy::Bypass);

        assert_eq!(layer, Some(DamageLayer::Armor));
        assert_eq!(health.shield(), 100.0);
        assert_eq!(health.armor(), 95.0);
    }

    #[test]
    fn overkill_exhausts_layer_to_exactly_zero() {
        let mut health = HealthPools {
            shield: 0.0,
            armor: 0.0,
            hull: 4.0,
            ..pools()
        };
        health.apply_hit(&DamageProfile::CANNON_SHELL, ShieldPolicy::Bypass);

        assert_eq!(health.hull(), 0.0);
        assert!(!health.is_alive());
        assert!(health.is_wrecked());
        assert_eq!(
            health.apply_hit(&DamageProfile::CANNON_SHELL, ShieldPolicy::Bypass),
            None
        );
        assert_eq!(health.hull(), 0.0);
    }

    #[test]
    fn fractional_remainder_is_dropped() {
        let mut health = HealthPools {
            shield: 1.2,
            ..pools()
        };
        health.apply_hit(&DamageProfile::LASER_BEAM, ShieldPolicy::Respect);
        assert_eq!(health.shield(), 0.0);
    }

    #[test]
    fn layers_stay_within_bounds_for_any_damage() {
        for amount in [0.0_f32, 0.3, 1.0, 7.5, 99.0, 100.0, 250.0, 1.0e9] {
            let damage = DamageProfile {
                shield: amount,
                armor: amount,
                hull: amount,
            };
            let mut health = pools();
            for _ in 0..5 {
                health.apply_hit(&damage, ShieldPolicy::Respect);
                for (value, max) in [
                    (health.shield(), 100.0),
                    (health.armor(), 100.0),
                    (health.hull(), 100.0),
                ] {
                    assert!((0.0..=max).contains(&value), "{value} outside [0, {max}]");
                }
            }
        }
    }

    #[test]
    fn ratios_follow_pool_levels() {
        let health = HealthPools {
            shield: 50.0,
            armor: 25.0,
            ..pools()
        };
        let ratios = health.ratios();
        assert_eq!(ratios.shield, 0.5);
        assert_eq!(ratios.armor, 0.25);
        assert_eq!(ratios.hull, 1.0);
    }

    #[test]
    fn bounds_track_position_and_scale() {
        let mut entity = Entity::vessel(
            EntityId(1),
            PlayerId(0),
            Vec2::new(10.0, 20.0),
            MovementProfile::from_tuning(&SimTuning::default()),
        );
        assert_eq!(entity.bounds().min, Vec2::new(1.0, 11.0));

        entity.position = Vec2::new(0.0, 0.0);
        entity.scale = 2.0;
        assert_eq!(entity.bounds().max, Vec2::new(18.0, 18.0));
        assert!(!entity.bounds().contains_point(Vec2::new(18.0, 0.0)));
    }

    #[test]
    fn unarmed_vessel_ignores_lock_and_is_never_a_live_target() {
        let mut entity = Entity::vessel(
            EntityId(1),
            PlayerId(0),
            Vec2::ZERO,
            MovementProfile::from_tuning(&SimTuning::default()),
        );
        assert!(!entity.lock_on_target(EntityId(2)));
        assert!(!entity.is_alive_target());
    }

    #[test]
    fn lock_on_target_cancels_move() {
        let tuning = SimTuning::default();
        let mut entity = Entity::attack_vessel(
            EntityId(1),
            PlayerId(0),
            Vec2::ZERO,
            MovementProfile::from_tuning(&tuning),
            HealthPools::from_tuning(&tuning),
        );
        assert!(entity.move_to(Vec2::new(100.0, 0.0)));
        assert!(matches!(entity.state, BehaviorState::Move(_)));

        assert!(entity.lock_on_target(EntityId(9)));
        assert!(matches!(entity.state, BehaviorState::Idle));
    }

    #[test]
    fn allocator_hands_out_increasing_ids() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate(), EntityId(0));
        assert_eq!(allocator.allocate(), EntityId(1));
    }
}
