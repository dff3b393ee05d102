use std::time::Duration;

pub const FPS_SMOOTHING_NEW_WEIGHT: f32 = 0.25;
pub const FPS_INITIAL_ESTIMATE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopMetricsSnapshot {
    /// Exponentially smoothed frames per second.
    pub fps: f32,
    /// Simulation steps executed during the last interval, per second.
    pub tps: f32,
    pub frame_time_ms: f32,
    pub frames_in_interval: u32,
}

impl Default for LoopMetricsSnapshot {
    fn default() -> Self {
        Self {
            fps: FPS_INITIAL_ESTIMATE,
            tps: 0.0,
            frame_time_ms: 0.0,
            frames_in_interval: 0,
        }
    }
}

/// Collects per-frame samples and folds them into a smoothed snapshot once
/// per interval: `fps = 0.25 * frames_this_interval + 0.75 * fps`.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Duration,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    smoothed_fps: f32,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Duration::ZERO,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            smoothed_fps: FPS_INITIAL_ESTIMATE,
        }
    }

    #[cfg(test)]
    pub(crate) fn smoothed_fps(&self) -> f32 {
        self.smoothed_fps
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Must be called before the current frame is recorded, so the fold only
    /// sees frames from the elapsed interval.
    pub(crate) fn maybe_snapshot(&mut self, now: Duration) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_sub(self.interval_start);
        if elapsed <= self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };
        self.smoothed_fps = FPS_SMOOTHING_NEW_WEIGHT * self.frames as f32
            + (1.0 - FPS_SMOOTHING_NEW_WEIGHT) * self.smoothed_fps;

        let snapshot = LoopMetricsSnapshot {
            fps: self.smoothed_fps,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            frames_in_interval: self.frames,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_smooths_frame_count() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        for _ in 0..30 {
            accumulator.record_frame(Duration::from_millis(33));
            accumulator.record_tick();
            accumulator.record_tick();
        }

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_millis(1001))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - (0.25 * 30.0 + 0.75 * 60.0)).abs() < 1e-4);
        assert!((snapshot.tps - 60.0 / 1.001).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 33.0).abs() < 0.001);
        assert_eq!(snapshot.frames_in_interval, 30);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500))
            .is_none());
        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(1000))
            .is_none());
    }

    #[test]
    fn smoothing_converges_towards_steady_rate() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let mut now = Duration::ZERO;
        for _ in 0..40 {
            for _ in 0..30 {
                accumulator.record_frame(Duration::from_millis(33));
            }
            now += Duration::from_millis(1001);
            accumulator.maybe_snapshot(now).expect("snapshot");
        }
        assert!((accumulator.smoothed_fps() - 30.0).abs() < 0.01);
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16));
        accumulator.maybe_snapshot(Duration::from_millis(1500));

        let next = accumulator
            .maybe_snapshot(Duration::from_millis(2600))
            .expect("second snapshot");
        assert_eq!(next.frames_in_interval, 0);
        assert_eq!(next.frame_time_ms, 0.0);
        assert_eq!(next.tps, 0.0);
    }
}
