use std::env;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};

pub const SLOW_FRAME_ENV_VAR: &str = "SKIRMISH_SLOW_FRAME_MS";

/// Whole milliseconds per step at 60 Hz, truncated (16 ms).
pub const DEFAULT_STEP_MS: u64 = 1000 / 60;
pub const DEFAULT_MAX_STEPS_PER_FRAME: u32 = 20;
pub const DEFAULT_MAX_RENDER_FPS: u32 = 30;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Fixed simulation step.
    pub step: Duration,
    /// Catch-up bound: beyond this many steps in one frame the backlog is discarded.
    pub max_steps_per_frame: u32,
    /// Optional clamp on a single frame's wall delta before it is accumulated.
    pub max_frame_delta: Option<Duration>,
    /// Frame-rate ceiling. Callbacks arriving sooner than `1 / fps` after the
    /// last executed frame are skipped entirely.
    pub max_render_fps: Option<u32>,
    pub metrics_interval: Duration,
    /// Host polling period for the timer-driven driver.
    pub poll_interval: Duration,
    pub simulated_slow_frame_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(DEFAULT_STEP_MS),
            max_steps_per_frame: DEFAULT_MAX_STEPS_PER_FRAME,
            max_frame_delta: None,
            max_render_fps: Some(DEFAULT_MAX_RENDER_FPS),
            metrics_interval: Duration::from_secs(1),
            poll_interval: Duration::from_millis(DEFAULT_STEP_MS),
            simulated_slow_frame_ms: 0,
        }
    }
}

/// The world side of the loop. `update` runs zero or more times per executed
/// frame; `render` exactly once after them.
pub trait Simulation {
    fn update(&mut self);
    fn render(&mut self);
    fn stats(&mut self, _metrics: &LoopMetricsSnapshot) {}
    fn is_finished(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub steps_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame-rate ceiling rejected this callback; nothing ran.
    Skipped,
    Ran(FrameReport),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames_run: u64,
    pub frames_skipped: u64,
    pub steps_run: u64,
}

/// Accumulator-driven fixed-timestep scheduler. Time is supplied by the caller
/// as elapsed time since the loop started.
#[derive(Debug)]
pub struct FixedStepLoop {
    step: Duration,
    max_steps_per_frame: u32,
    max_frame_delta: Option<Duration>,
    frame_target: Option<Duration>,
    accumulator: Duration,
    last_frame: Duration,
    metrics: MetricsAccumulator,
    latest_metrics: LoopMetricsSnapshot,
    summary: LoopSummary,
}

impl FixedStepLoop {
    pub fn new(config: &LoopConfig) -> Self {
        let step = normalize_non_zero_duration(config.step, Duration::from_millis(DEFAULT_STEP_MS));
        let max_steps_per_frame = config.max_steps_per_frame.max(1);
        let metrics_interval =
            normalize_non_zero_duration(config.metrics_interval, Duration::from_secs(1));
        let render_cap = normalize_render_fps_cap(config.max_render_fps);

        info!(
            step_ms = step.as_millis() as u64,
            max_steps_per_frame,
            render_fps_cap = %format_render_cap(render_cap),
            metrics_interval_ms = metrics_interval.as_millis() as u64,
            "loop_config"
        );

        Self {
            step,
            max_steps_per_frame,
            max_frame_delta: config.max_frame_delta,
            frame_target: target_frame_duration(render_cap),
            accumulator: Duration::ZERO,
            last_frame: Duration::ZERO,
            metrics: MetricsAccumulator::new(metrics_interval),
            latest_metrics: LoopMetricsSnapshot::default(),
            summary: LoopSummary::default(),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    pub fn latest_metrics(&self) -> LoopMetricsSnapshot {
        self.latest_metrics
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    /// One host callback at time `now`.
    pub fn frame<S: Simulation + ?Sized>(
        &mut self,
        now: Duration,
        simulation: &mut S,
    ) -> FrameOutcome {
        if let Some(target) = self.frame_target {
            if now < self.last_frame.saturating_add(target) {
                self.summary.frames_skipped = self.summary.frames_skipped.saturating_add(1);
                return FrameOutcome::Skipped;
            }
        }

        let raw_frame_dt = now.saturating_sub(self.last_frame);
        self.last_frame = now;
        let frame_dt = match self.max_frame_delta {
            Some(max_frame_delta) => clamp_frame_delta(raw_frame_dt, max_frame_delta),
            None => raw_frame_dt,
        };
        self.accumulator = self.accumulator.saturating_add(frame_dt);

        if let Some(snapshot) = self.metrics.maybe_snapshot(now) {
            self.latest_metrics = snapshot;
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                "loop_metrics"
            );
        }
        self.metrics.record_frame(raw_frame_dt);

        let plan = plan_sim_steps(self.accumulator, self.step, self.max_steps_per_frame);
        for _ in 0..plan.steps_run {
            simulation.update();
            self.metrics.record_tick();
        }
        self.accumulator = plan.remaining_accumulator;

        if plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                max_steps_per_frame = self.max_steps_per_frame,
                "sim_clamp_triggered"
            );
        }

        simulation.render();
        simulation.stats(&self.latest_metrics);

        self.summary.frames_run = self.summary.frames_run.saturating_add(1);
        self.summary.steps_run = self
            .summary
            .steps_run
            .saturating_add(u64::from(plan.steps_run));

        FrameOutcome::Ran(plan)
    }
}

/// Timer-driven host: polls the loop every `poll_interval` until the
/// simulation reports it is finished.
pub fn run_loop<S: Simulation + ?Sized>(config: &LoopConfig, simulation: &mut S) -> LoopSummary {
    let mut fixed_loop = FixedStepLoop::new(config);
    let poll_interval = normalize_non_zero_duration(config.poll_interval, fixed_loop.step());
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    if slow_frame_delay > Duration::ZERO {
        info!(
            slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
            "slow_frame_perturbation_enabled"
        );
    }

    let started = Instant::now();
    while !simulation.is_finished() {
        if slow_frame_delay > Duration::ZERO {
            // Explicit debug perturbation only; this is not the FPS cap.
            thread::sleep(slow_frame_delay);
        }

        let now = started.elapsed();
        if let FrameOutcome::Ran(report) = fixed_loop.frame(now, simulation) {
            debug!(
                steps_run = report.steps_run,
                remaining_ms = report.remaining_accumulator.as_millis() as u64,
                "frame"
            );
        }

        thread::sleep(poll_interval);
    }

    let summary = fixed_loop.summary();
    info!(
        frames_run = summary.frames_run,
        frames_skipped = summary.frames_skipped,
        steps_run = summary.steps_run,
        "loop_finished"
    );
    summary
}

pub(crate) fn plan_sim_steps(
    mut accumulator: Duration,
    step: Duration,
    max_steps_per_frame: u32,
) -> FrameReport {
    let mut steps_run = 0u32;

    while accumulator >= step && steps_run < max_steps_per_frame {
        accumulator = accumulator.saturating_sub(step);
        steps_run = steps_run.saturating_add(1);
    }

    if accumulator >= step {
        FrameReport {
            steps_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        FrameReport {
            steps_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_millis(1000 / u64::from(fps)))
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
