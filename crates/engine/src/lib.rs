pub mod app;
pub mod math;
pub mod sim;

pub use app::{
    run_loop, Affine2, CameraConfig, CameraError, EntityView, EntityViewKind, FixedStepLoop,
    FloatingOrigin, FrameOutcome, FrameReport, LineKind, LoopConfig, LoopMetricsSnapshot,
    LoopSummary, RenderSink, Simulation, SLOW_FRAME_ENV_VAR,
};
pub use math::{chebyshev_distance, euclidean_distance, Bounds2D, Vec2};
pub use sim::{
    AudioCue, AudioSink, Command, CommandError, EntityId, LockSubject, MutedAudio, OrderOutcome,
    PlayerColor, PlayerId, SimTuning, TickReport, TuningError, Turret, TurretKind, Universe,
    WorldError, LOCAL_PLAYER,
};
