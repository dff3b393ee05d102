use crate::app::{LineKind, RenderSink};
use crate::math::{chebyshev_distance, Vec2};

use super::command::Command;
use super::context::UpdateContext;
use super::entity::{Entity, MovementProfile, ShieldPolicy};

/// Result of one state update. The caller swaps the entity's state in a
/// single assignment, so a state is never observed half-replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum StateTransition {
    Stay,
    Enter(BehaviorState),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BehaviorState {
    #[default]
    Idle,
    Move(MoveState),
    Travel(TravelState),
    Beam(BeamState),
}

impl BehaviorState {
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorState::Idle => "idle",
            BehaviorState::Move(_) => "move",
            BehaviorState::Travel(_) => "travel",
            BehaviorState::Beam(_) => "beam",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, BehaviorState::Idle)
    }

    pub(crate) fn update(
        &mut self,
        entity: &mut Entity,
        ctx: &mut UpdateContext<'_>,
    ) -> StateTransition {
        match self {
            BehaviorState::Idle => StateTransition::Stay,
            BehaviorState::Move(state) => state.update(entity),
            BehaviorState::Travel(state) => state.update(entity, ctx),
            BehaviorState::Beam(state) => state.update(entity, ctx),
        }
    }

    pub fn render(&self, entity: &Entity, sink: &mut dyn RenderSink) {
        match self {
            BehaviorState::Move(state) => {
                sink.draw_line(entity.position, state.destination, LineKind::MoveOrder)
            }
            BehaviorState::Beam(state) => {
                sink.draw_line(entity.position, state.destination, LineKind::LaserBeam)
            }
            BehaviorState::Idle | BehaviorState::Travel(_) => {}
        }
    }
}

/// Steers a vessel towards a point. Velocity grows by a fixed acceleration
/// along the heading while its mean absolute component is under the cap.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveState {
    destination: Vec2,
    velocity: Vec2,
    movement: MovementProfile,
}

impl MoveState {
    pub fn new(destination: Vec2, movement: MovementProfile) -> Self {
        Self {
            destination,
            velocity: Vec2::ZERO,
            movement,
        }
    }

    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn update(&mut self, entity: &mut Entity) -> StateTransition {
        if chebyshev_distance(entity.position, self.destination) < self.movement.arrival_threshold {
            return StateTransition::Enter(BehaviorState::Idle);
        }

        let heading = entity.position.angle_to(self.destination);
        if self.velocity.mean_abs() < self.movement.max_velocity {
            self.velocity = self.velocity + Vec2::from_angle(heading) * self.movement.acceleration;
        }
        entity.position = entity.position + self.velocity;
        StateTransition::Stay
    }
}

/// Straight-line flight towards a fixed point, hit-testing every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelState {
    destination: Vec2,
    speed: f32,
    arrival_distance: f32,
    ticks_remaining: u32,
}

impl TravelState {
    pub fn new(destination: Vec2, speed: f32, arrival_distance: f32, max_ticks: u32) -> Self {
        Self {
            destination,
            speed,
            arrival_distance,
            ticks_remaining: max_ticks,
        }
    }

    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    fn update(&mut self, entity: &mut Entity, ctx: &mut UpdateContext<'_>) -> StateTransition {
        if let Some(target) = ctx.hostile_unit_at(entity.position, entity.owner) {
            ctx.dispatch(Command::Destroy { entity: entity.id });
            if let Some(projectile) = entity.as_projectile() {
                ctx.apply_hit(entity.id, target, &projectile.damage, ShieldPolicy::Bypass);
            }
            return StateTransition::Enter(BehaviorState::Idle);
        }

        let distance = chebyshev_distance(entity.position, self.destination);
        let heading = entity.position.angle_to(self.destination);
        entity.position = entity.position + Vec2::from_angle(heading) * self.speed;

        if distance < self.arrival_distance {
            ctx.dispatch(Command::Destroy { entity: entity.id });
            return StateTransition::Enter(BehaviorState::Idle);
        }

        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        if self.ticks_remaining == 0 {
            ctx.dispatch(Command::Destroy { entity: entity.id });
            return StateTransition::Enter(BehaviorState::Idle);
        }
        StateTransition::Stay
    }
}

/// A beam stays where it was fired and burns whatever sits on its end point.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamState {
    destination: Vec2,
    ticks_remaining: u32,
}

impl BeamState {
    pub fn new(destination: Vec2, duration_ticks: u32) -> Self {
        Self {
            destination,
            ticks_remaining: duration_ticks,
        }
    }

    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    fn update(&mut self, entity: &mut Entity, ctx: &mut UpdateContext<'_>) -> StateTransition {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);

        let Some(target) = ctx.hostile_unit_at(self.destination, entity.owner) else {
            ctx.dispatch(Command::Destroy { entity: entity.id });
            return StateTransition::Enter(BehaviorState::Idle);
        };

        if let Some(projectile) = entity.as_projectile() {
            ctx.apply_hit(entity.id, target, &projectile.damage, ShieldPolicy::Respect);
        }

        if self.ticks_remaining == 0 {
            ctx.dispatch(Command::Destroy { entity: entity.id });
            return StateTransition::Enter(BehaviorState::Idle);
        }
        StateTransition::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Bounds2D;
    use crate::sim::context::tests::ContextFixture;
    use crate::sim::entity::{EntityId, PlayerId, Projectile, ProjectileKind};
    use crate::sim::tuning::{DamageProfile, SimTuning};

    const EPSILON: f32 = 1e-4;

    fn assert_vec2_close(actual: Vec2, expected: Vec2) {
        assert!((actual.x - expected.x).abs() < EPSILON, "x {} vs {}", actual.x, expected.x);
        assert!((actual.y - expected.y).abs() < EPSILON, "y {} vs {}", actual.y, expected.y);
    }

    fn shell(fixture: &mut ContextFixture, position: Vec2, state: BehaviorState) -> Entity {
        Entity::projectile(
            fixture.ids.allocate(),
            PlayerId(0),
            position,
            Projectile {
                kind: ProjectileKind::Shell,
                damage: DamageProfile::CANNON_SHELL,
            },
            state,
        )
    }

    fn beam(fixture: &mut ContextFixture, position: Vec2, state: BehaviorState) -> Entity {
        Entity::projectile(
            fixture.ids.allocate(),
            PlayerId(0),
            position,
            Projectile {
                kind: ProjectileKind::LaserBeam,
                damage: DamageProfile::LASER_BEAM,
            },
            state,
        )
    }

    fn step(entity: &mut Entity, fixture: &mut ContextFixture) {
        entity.update(&mut fixture.context());
    }

    fn drained_destroys(fixture: &mut ContextFixture) -> Vec<EntityId> {
        let mut destroyed = Vec::new();
        while let Some(command) = fixture.commands.dequeue() {
            if let Command::Destroy { entity } = command {
                destroyed.push(entity);
            }
        }
        destroyed
    }

    #[test]
    fn move_at_destination_goes_idle_without_moving() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::new(10.0, 10.0));
        vessel.move_to(Vec2::new(10.0, 10.0));

        step(&mut vessel, &mut fixture);

        assert!(vessel.state.is_idle());
        assert_eq!(vessel.position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn move_accelerates_along_heading() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::ZERO);
        vessel.move_to(Vec2::new(100.0, 0.0));

        step(&mut vessel, &mut fixture);
        assert_vec2_close(vessel.position, Vec2::new(0.01, 0.0));
        step(&mut vessel, &mut fixture);
        assert_vec2_close(vessel.position, Vec2::new(0.03, 0.0));
        assert!(matches!(vessel.state, BehaviorState::Move(_)));
    }

    #[test]
    fn move_velocity_stops_growing_at_cap() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::ZERO);
        vessel.move_to(Vec2::new(10_000.0, 0.0));

        for _ in 0..500 {
            step(&mut vessel, &mut fixture);
        }
        let BehaviorState::Move(state) = &vessel.state else {
            panic!("vessel should still be moving");
        };
        // Mean of |x| and |y| for a pure x heading is half the x speed.
        assert!(state.velocity().mean_abs() >= SimTuning::default().vessel_max_velocity);
        assert!(state.velocity().x <= 2.0 + 0.01 + EPSILON);
    }

    #[test]
    fn move_eventually_arrives() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::ZERO);
        vessel.move_to(Vec2::new(30.0, -20.0));

        for _ in 0..2_000 {
            step(&mut vessel, &mut fixture);
            if vessel.state.is_idle() {
                break;
            }
        }
        assert!(vessel.state.is_idle());
        assert!(chebyshev_distance(vessel.position, Vec2::new(30.0, -20.0)) < 5.0);
    }

    #[test]
    fn idle_entity_stays_put() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::new(3.0, 4.0));

        step(&mut vessel, &mut fixture);

        assert!(vessel.state.is_idle());
        assert_eq!(vessel.position, Vec2::new(3.0, 4.0));
        assert!(fixture.commands.is_empty());
    }

    #[test]
    fn travel_with_one_tick_left_destroys_itself_and_idles() {
        let mut fixture = ContextFixture::new();
        let state = BehaviorState::Travel(TravelState::new(Vec2::new(500.0, 0.0), 5.0, 2.0, 1));
        let mut projectile = shell(&mut fixture, Vec2::ZERO, state);

        step(&mut projectile, &mut fixture);

        assert!(projectile.state.is_idle());
        assert_eq!(drained_destroys(&mut fixture), vec![projectile.id]);

        step(&mut projectile, &mut fixture);
        assert!(fixture.commands.is_empty());
    }

    #[test]
    fn travel_advances_towards_destination() {
        let mut fixture = ContextFixture::new();
        let state = BehaviorState::Travel(TravelState::new(Vec2::new(0.0, 100.0), 5.0, 2.0, 100));
        let mut projectile = shell(&mut fixture, Vec2::ZERO, state);

        step(&mut projectile, &mut fixture);

        assert_vec2_close(projectile.position, Vec2::new(0.0, 5.0));
        let BehaviorState::Travel(travel) = &projectile.state else {
            panic!("projectile should keep travelling");
        };
        assert_eq!(travel.ticks_remaining(), 99);
        assert!(fixture.commands.is_empty());
    }

    #[test]
    fn travel_reaching_destination_destroys_itself() {
        let mut fixture = ContextFixture::new();
        let state = BehaviorState::Travel(TravelState::new(Vec2::new(1.0, 0.0), 5.0, 2.0, 100));
        let mut projectile = shell(&mut fixture, Vec2::ZERO, state);

        step(&mut projectile, &mut fixture);

        assert!(projectile.state.is_idle());
        assert_eq!(drained_destroys(&mut fixture), vec![projectile.id]);
    }

    #[test]
    fn travel_hit_damages_armor_and_skips_shield() {
        let mut fixture = ContextFixture::new();
        let target = fixture.spawn_enemy_attack_vessel(Vec2::new(50.0, 50.0));
        let state = BehaviorState::Travel(TravelState::new(Vec2::new(50.0, 50.0), 5.0, 2.0, 100));
        let mut projectile = shell(&mut fixture, Vec2::new(52.0, 50.0), state);

        step(&mut projectile, &mut fixture);

        assert!(projectile.state.is_idle());
        assert_eq!(projectile.position, Vec2::new(52.0, 50.0));
        assert_eq!(drained_destroys(&mut fixture), vec![projectile.id]);
        let health = fixture.health_of(target);
        assert_eq!(health.shield(), 100.0);
        assert_eq!(health.armor(), 95.0);
        assert_eq!(health.hull(), 100.0);
    }

    #[test]
    fn travel_hit_that_wrecks_hull_destroys_target() {
        let mut fixture = ContextFixture::new();
        let target = fixture.spawn_enemy_attack_vessel(Vec2::ZERO);
        fixture.set_health(target, 0.0, 0.0, 10.0);
        let state = BehaviorState::Travel(TravelState::new(Vec2::ZERO, 5.0, 2.0, 100));
        let mut projectile = shell(&mut fixture, Vec2::ZERO, state);

        step(&mut projectile, &mut fixture);

        assert_eq!(drained_destroys(&mut fixture), vec![projectile.id, target]);
        assert_eq!(fixture.health_of(target).hull(), 0.0);
    }

    #[test]
    fn travel_ignores_own_units() {
        let mut fixture = ContextFixture::new();
        fixture.spawn_local_attack_vessel(Vec2::ZERO);
        let state = BehaviorState::Travel(TravelState::new(Vec2::new(100.0, 0.0), 5.0, 2.0, 100));
        let mut projectile = shell(&mut fixture, Vec2::ZERO, state);

        step(&mut projectile, &mut fixture);

        assert!(matches!(projectile.state, BehaviorState::Travel(_)));
        assert!(fixture.commands.is_empty());
    }

    #[test]
    fn beam_without_target_destroys_itself() {
        let mut fixture = ContextFixture::new();
        let state = BehaviorState::Beam(BeamState::new(Vec2::new(40.0, 0.0), 30));
        let mut laser = beam(&mut fixture, Vec2::ZERO, state);

        step(&mut laser, &mut fixture);

        assert!(laser.state.is_idle());
        assert_eq!(drained_destroys(&mut fixture), vec![laser.id]);
    }

    #[test]
    fn beam_burns_shield_first_and_stays_in_place() {
        let mut fixture = ContextFixture::new();
        let target = fixture.spawn_enemy_attack_vessel(Vec2::new(40.0, 0.0));
        let state = BehaviorState::Beam(BeamState::new(Vec2::new(40.0, 0.0), 30));
        let mut laser = beam(&mut fixture, Vec2::ZERO, state);

        step(&mut laser, &mut fixture);
        step(&mut laser, &mut fixture);

        assert_eq!(laser.position, Vec2::ZERO);
        assert!(matches!(laser.state, BehaviorState::Beam(_)));
        let health = fixture.health_of(target);
        assert_eq!(health.shield(), 99.0);
        assert_eq!(health.armor(), 100.0);
        assert!(fixture.commands.is_empty());
    }

    #[test]
    fn beam_expires_after_its_duration() {
        let mut fixture = ContextFixture::new();
        let target = fixture.spawn_enemy_attack_vessel(Vec2::new(40.0, 0.0));
        let state = BehaviorState::Beam(BeamState::new(Vec2::new(40.0, 0.0), 3));
        let mut laser = beam(&mut fixture, Vec2::ZERO, state);

        for _ in 0..3 {
            step(&mut laser, &mut fixture);
        }

        assert!(laser.state.is_idle());
        assert_eq!(drained_destroys(&mut fixture), vec![laser.id]);
        assert_eq!(fixture.health_of(target).shield(), 98.5);
    }

    #[test]
    fn beam_cuts_through_armor_then_hull() {
        let mut fixture = ContextFixture::new();
        let target = fixture.spawn_enemy_attack_vessel(Vec2::ZERO);
        fixture.set_health(target, 0.0, 2.0, 6.0);
        let state = BehaviorState::Beam(BeamState::new(Vec2::ZERO, 30));
        let mut laser = beam(&mut fixture, Vec2::new(-100.0, 0.0), state);

        step(&mut laser, &mut fixture);
        assert_eq!(fixture.health_of(target).armor(), 0.0);
        assert!(fixture.commands.is_empty());

        step(&mut laser, &mut fixture);
        assert_eq!(fixture.health_of(target).hull(), 0.0);
        assert_eq!(drained_destroys(&mut fixture), vec![target]);
    }

    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<(Vec2, Vec2, LineKind)>,
    }

    impl RenderSink for RecordingSink {
        fn draw_entity(&mut self, _view: &crate::app::EntityView) {}

        fn draw_line(&mut self, from: Vec2, to: Vec2, kind: LineKind) {
            self.lines.push((from, to, kind));
        }

        fn draw_bounds(&mut self, _bounds: Bounds2D) {}
    }

    #[test]
    fn render_hooks_draw_order_and_beam_lines() {
        let mut fixture = ContextFixture::new();
        let mut vessel = fixture.local_vessel(Vec2::ZERO);
        vessel.move_to(Vec2::new(20.0, 0.0));
        let laser = beam(
            &mut fixture,
            Vec2::new(1.0, 1.0),
            BehaviorState::Beam(BeamState::new(Vec2::new(9.0, 9.0), 30)),
        );
        let mut sink = RecordingSink::default();

        vessel.state.render(&vessel, &mut sink);
        laser.state.render(&laser, &mut sink);
        BehaviorState::Idle.render(&vessel, &mut sink);

        assert_eq!(
            sink.lines,
            vec![
                (Vec2::ZERO, Vec2::new(20.0, 0.0), LineKind::MoveOrder),
                (Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0), LineKind::LaserBeam),
            ]
        );
    }
}
