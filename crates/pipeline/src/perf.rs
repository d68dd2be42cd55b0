//! Per-frame latency and frame-rate accounting

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Performance monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfConfig {
    /// Pacing target for the processing cycle
    pub target_frame_rate_hz: f32,
    /// Floor rate; sustained operation below it flags degradation
    pub min_frame_rate_hz: f32,
    /// How long the smoothed rate may sit under the floor before flagging
    pub degraded_grace_seconds: f32,
    /// EWMA weight for the smoothed rate
    pub smoothing: f32,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            target_frame_rate_hz: 100.0,
            min_frame_rate_hz: 50.0,
            degraded_grace_seconds: 2.0,
            smoothing: 0.1,
        }
    }
}

/// One frame's performance figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Pipeline pass duration for this frame, microseconds
    pub latency_us: u64,
    /// Exponentially smoothed frame rate
    pub fps: f32,
    /// Sustained below-floor degradation flag
    pub degraded: bool,
}

impl PerformanceSample {
    pub fn latency_ms(&self) -> f32 {
        self.latency_us as f32 / 1000.0
    }
}

/// Frame-rate and latency monitor
///
/// Degradation is a warning surfaced to the orchestrator and front end; it
/// never interrupts processing.
pub struct PerformanceMonitor {
    config: PerfConfig,
    smoothed_fps: f32,
    last_completion: Option<Instant>,
    below_floor_since: Option<Instant>,
    degraded: bool,
    last_latency_us: u64,
}

impl PerformanceMonitor {
    pub fn new(config: PerfConfig) -> Self {
        let smoothed_fps = config.target_frame_rate_hz;
        Self {
            config,
            smoothed_fps,
            last_completion: None,
            below_floor_since: None,
            degraded: false,
            last_latency_us: 0,
        }
    }

    /// Interval matching the target frame rate
    pub fn target_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.target_frame_rate_hz.max(1.0) as f64)
    }

    /// Mark the start of a frame's pipeline pass
    pub fn start_frame(&self) -> Instant {
        Instant::now()
    }

    /// Mark the end of a frame's pipeline pass
    pub fn end_frame(&mut self, started: Instant) -> PerformanceSample {
        let now = Instant::now();
        self.record(now.saturating_duration_since(started), now)
    }

    /// Core accounting, driven with explicit times
    pub fn record(&mut self, latency: Duration, now: Instant) -> PerformanceSample {
        self.last_latency_us = latency.as_micros() as u64;

        if let Some(prev) = self.last_completion {
            let dt = now.saturating_duration_since(prev).as_secs_f32();
            if dt > 0.0 {
                let instantaneous = 1.0 / dt;
                let alpha = self.config.smoothing.clamp(0.01, 1.0);
                self.smoothed_fps = self.smoothed_fps * (1.0 - alpha) + instantaneous * alpha;
            }
        }
        self.last_completion = Some(now);

        if self.smoothed_fps < self.config.min_frame_rate_hz {
            let since = *self.below_floor_since.get_or_insert(now);
            let grace = Duration::from_secs_f32(self.config.degraded_grace_seconds);
            if !self.degraded && now.saturating_duration_since(since) >= grace {
                self.degraded = true;
                warn!(
                    "Frame rate degraded: {:.1} fps below floor {:.1} fps",
                    self.smoothed_fps, self.config.min_frame_rate_hz
                );
            }
        } else {
            self.below_floor_since = None;
            if self.degraded {
                self.degraded = false;
                info!("Frame rate recovered: {:.1} fps", self.smoothed_fps);
            }
        }

        self.sample()
    }

    /// Latest figures
    pub fn sample(&self) -> PerformanceSample {
        PerformanceSample {
            latency_us: self.last_latency_us,
            fps: self.smoothed_fps,
            degraded: self.degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(monitor: &mut PerformanceMonitor, frame_interval: Duration, frames: usize) {
        let mut now = Instant::now();
        for _ in 0..frames {
            now += frame_interval;
            monitor.record(frame_interval / 4, now);
        }
    }

    #[test]
    fn test_smoothed_fps_converges_to_actual_rate() {
        let mut monitor = PerformanceMonitor::new(PerfConfig::default());
        drive(&mut monitor, Duration::from_millis(10), 200);

        let fps = monitor.sample().fps;
        assert!((fps - 100.0).abs() < 5.0, "fps {fps}");
    }

    #[test]
    fn test_degradation_flag_needs_sustained_slowdown() {
        let mut monitor = PerformanceMonitor::new(PerfConfig::default());
        let mut now = Instant::now();

        // A few slow frames inside the grace period: no flag yet.
        for _ in 0..10 {
            now += Duration::from_millis(40);
            monitor.record(Duration::from_millis(35), now);
        }
        assert!(!monitor.sample().degraded);

        // Kept below the floor past the grace period: flagged.
        for _ in 0..100 {
            now += Duration::from_millis(40);
            monitor.record(Duration::from_millis(35), now);
        }
        assert!(monitor.sample().degraded);
        assert!(monitor.sample().fps < 50.0);
    }

    #[test]
    fn test_degradation_clears_on_recovery() {
        let mut monitor = PerformanceMonitor::new(PerfConfig::default());
        let mut now = Instant::now();
        for _ in 0..150 {
            now += Duration::from_millis(40);
            monitor.record(Duration::from_millis(35), now);
        }
        assert!(monitor.sample().degraded);

        for _ in 0..300 {
            now += Duration::from_millis(10);
            monitor.record(Duration::from_millis(2), now);
        }
        assert!(!monitor.sample().degraded);
    }

    #[test]
    fn test_latency_reported_per_frame() {
        let mut monitor = PerformanceMonitor::new(PerfConfig::default());
        let now = Instant::now();
        let sample = monitor.record(Duration::from_micros(4200), now);
        assert_eq!(sample.latency_us, 4200);
        assert!((sample.latency_ms() - 4.2).abs() < 1e-3);
    }
}
