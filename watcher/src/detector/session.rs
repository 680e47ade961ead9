use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use camwatch_common::config::Config;
use camwatch_common::frame::Frame;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::alert::AlertSink;
use crate::capture::{CameraCapture, CaptureError};
use crate::render::Surface;

use super::diff::MotionDetector;

/// Capture lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No device held, no baseline, detection off.
    Stopped,
    /// Device acquired, waiting for the first decoded frame.
    AwaitingFirstFrame,
    /// Normal tick cycle.
    Running,
}

/// Owns the capture-compare-alert cycle: the camera handle, the
/// frame-differencing detector, the display surface, and the alert sink.
///
/// Driving is external: the caller pulls frames off the receiver returned
/// by [`WatchSession::start`] and feeds them to [`WatchSession::tick`],
/// which keeps the detection step synchronous and testable with injected
/// frame data.
pub struct WatchSession {
    config: Config,
    detector: MotionDetector,
    surface: Surface,
    alert: Box<dyn AlertSink + Send>,
    /// Tick counter shared with the dashboard FPS estimator.
    ticks: Arc<AtomicU64>,
    capture: Option<CameraCapture>,
    phase: Phase,
    score: u32,
    motion: bool,
}

impl WatchSession {
    pub fn new(config: Config, alert: Box<dyn AlertSink + Send>, ticks: Arc<AtomicU64>) -> Self {
        let mut surface = Surface::new(config.capture.width, config.capture.height);
        surface.render_offline();
        Self {
            detector: MotionDetector::new(&config.detector),
            surface,
            alert,
            ticks,
            capture: None,
            phase: Phase::Stopped,
            score: 0,
            motion: false,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Stopped
    }

    /// Whether motion is currently present. Derived fresh each tick; no
    /// hysteresis, so it can flip every tick.
    pub fn motion(&self) -> bool {
        self.motion
    }

    /// Changed-pixel count from the latest comparison.
    pub fn score(&self) -> u32 {
        self.score
    }

    #[allow(dead_code)]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Acquire the camera and hand back the frame stream to drive ticks
    /// with. No-op (no new receiver) when already active.
    ///
    /// On failure the error is returned for a single user-facing report
    /// and the session stays Stopped with no device held; there is no
    /// automatic retry.
    pub async fn start(&mut self) -> Result<Option<mpsc::Receiver<Frame>>, CaptureError> {
        if self.is_active() {
            debug!("start ignored, session already active");
            return Ok(None);
        }
        let (capture, frames) = CameraCapture::open(&self.config.capture).await?;
        self.capture = Some(capture);
        self.phase = Phase::AwaitingFirstFrame;
        info!(device = self.config.capture.device_index, "watch session started");
        Ok(Some(frames))
    }

    /// One detection step.
    ///
    /// `None` means the source has no decoded frame yet; the step is a
    /// no-op and the caller simply polls again. Frames arriving while
    /// Stopped are discarded, which keeps the loop-only-runs-while-active
    /// invariant even if a stale frame slips past a stop.
    pub fn tick(&mut self, frame: Option<Frame>) {
        let Some(frame) = frame else { return };
        if self.phase == Phase::Stopped {
            debug!(seq = frame.seq, "discarding frame, session stopped");
            return;
        }

        self.ticks.fetch_add(1, Ordering::Relaxed);
        if self.phase == Phase::AwaitingFirstFrame {
            self.phase = Phase::Running;
            info!(seq = frame.seq, "first frame received");
        }

        self.surface.blit(&frame);
        let report = self.detector.observe(&frame);
        if report.motion && !self.motion {
            info!(score = report.score, seq = frame.seq, "motion detected");
            self.alert.motion_alert();
        } else if !report.motion && self.motion {
            info!(score = report.score, seq = frame.seq, "motion cleared");
        }
        self.motion = report.motion;
        self.score = report.score;
    }

    /// Stop capture and release the camera.
    ///
    /// Idempotent, valid from any phase, including before the first frame
    /// has arrived. The capture thread is awaited before state is cleared,
    /// so once this returns the device is released and no further tick can
    /// observe a live frame.
    pub async fn stop(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.shutdown().await;
        }
        self.detector.reset();
        self.motion = false;
        self.score = 0;
        self.surface.render_offline();
        if self.phase != Phase::Stopped {
            info!("watch session stopped");
        }
        self.phase = Phase::Stopped;
    }

    /// Test seam: enter AwaitingFirstFrame without opening a device, so
    /// ticks can be driven with injected frames.
    #[cfg(test)]
    pub(crate) fn begin_awaiting(&mut self) {
        self.phase = Phase::AwaitingFirstFrame;
    }
}
