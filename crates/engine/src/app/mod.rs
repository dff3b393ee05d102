mod camera;
mod loop_runner;
mod metrics;
mod rendering;

pub use camera::{
    CameraConfig, CameraError, FloatingOrigin, CAMERA_SCALE_DEFAULT, CAMERA_SCALE_MAX,
    CAMERA_SCALE_MIN, CAMERA_ZOOM_SENSITIVITY,
};
pub use loop_runner::{
    run_loop, FixedStepLoop, FrameOutcome, FrameReport, LoopConfig, LoopSummary, Simulation,
    DEFAULT_MAX_RENDER_FPS, DEFAULT_MAX_STEPS_PER_FRAME, DEFAULT_STEP_MS, SLOW_FRAME_ENV_VAR,
};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{Affine2, EntityView, EntityViewKind, LineKind, RenderSink};
