use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use camwatch_common::config::DashboardConfig;
use chrono::{DateTime, Local};
use rand::Rng;

use crate::detector::session::Phase;

/// Wall-clock display, `dd.mm.yyyy hh:mm:ss`.
pub fn clock_display(now: DateTime<Local>) -> String {
    now.format("%d.%m.%Y %H:%M:%S").to_string()
}

/// Placeholder CPU figure, uniform in [45, 70].
///
/// Explicitly fake: it has no relation to actual system load, and wiring
/// in a real measurement would change observable behavior.
pub struct SimulatedLoad;

impl SimulatedLoad {
    pub fn sample(&self) -> u8 {
        rand::thread_rng().gen_range(45..=70)
    }
}

/// Approximate detection-loop rate: ticks observed since the previous
/// sample divided by the elapsed time.
pub struct FpsEstimator {
    ticks: Arc<AtomicU64>,
    last_total: u64,
    last_sample: Instant,
}

impl FpsEstimator {
    pub fn new(ticks: Arc<AtomicU64>) -> Self {
        Self::with_start(ticks, Instant::now())
    }

    fn with_start(ticks: Arc<AtomicU64>, start: Instant) -> Self {
        Self {
            ticks,
            last_total: 0,
            last_sample: start,
        }
    }

    pub fn sample(&mut self) -> u32 {
        self.sample_at(Instant::now())
    }

    fn sample_at(&mut self, now: Instant) -> u32 {
        let total = self.ticks.load(Ordering::Relaxed);
        let delta = total.saturating_sub(self.last_total);
        let elapsed = now.duration_since(self.last_sample).as_secs_f64();
        self.last_total = total;
        self.last_sample = now;
        if elapsed <= 0.0 {
            return 0;
        }
        (delta as f64 / elapsed).round() as u32
    }
}

/// Once-per-second status samplers. Independent of the detector apart
/// from the read-only display inputs passed to [`Dashboard::status_line`].
pub struct Dashboard {
    fps: FpsEstimator,
    load: SimulatedLoad,
    network_rate_label: String,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig, ticks: Arc<AtomicU64>) -> Self {
        Self {
            fps: FpsEstimator::new(ticks),
            load: SimulatedLoad,
            network_rate_label: config.network_rate_label.clone(),
        }
    }

    /// Render the status line for one refresh tick.
    pub fn status_line(&mut self, phase: Phase, motion: bool, score: u32) -> String {
        let state = if phase == Phase::Stopped { "OFF" } else { "LIVE" };
        let activity = if motion { "MOTION" } else { "still" };
        format!(
            "{} | {:<4} | {:<6} | {:>3} fps | cpu {:>2}% | net {} | score {}",
            clock_display(Local::now()),
            state,
            activity,
            self.fps.sample(),
            self.load.sample(),
            self.network_rate_label,
            score,
        )
    }
}
