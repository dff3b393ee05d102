use crate::math::{Bounds2D, Vec2};
use crate::sim::{EntityId, HealthRatios, PlayerColor, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityViewKind {
    Vessel,
    AttackVessel,
    Shell,
    LaserBeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    MoveOrder,
    LaserBeam,
}

/// Read-only snapshot of one entity, built fresh for every render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub owner: PlayerId,
    pub color: PlayerColor,
    pub position: Vec2,
    pub bounds: Bounds2D,
    pub kind: EntityViewKind,
    pub selected: bool,
    /// Shield, armor and hull as fractions of their maximum. Attack vessels only.
    pub health: Option<HealthRatios>,
    pub state: &'static str,
}

/// Drawing backend. All coordinates are world space; projecting them
/// through the camera is the sink's job.
pub trait RenderSink {
    fn draw_entity(&mut self, view: &EntityView);

    fn draw_line(&mut self, from: Vec2, to: Vec2, kind: LineKind);

    /// Hit-box outlines, only requested when debug bounds are enabled.
    fn draw_bounds(&mut self, _bounds: Bounds2D) {}
}
