use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use camwatch_common::config::CaptureConfig;
use camwatch_common::frame::Frame;
use chrono::Utc;
use image::imageops::FilterType;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Bounded frame channel; the capture thread drops frames when the
/// detection loop falls behind rather than buffering stale video.
const FRAME_CHANNEL_DEPTH: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open camera: {0}")]
    Open(String),
    #[error("failed to start camera stream: {0}")]
    Stream(String),
}

/// Handle to a running camera capture thread.
///
/// Camera capture runs on a blocking thread since `nokhwa::Camera` is
/// `!Send`. The thread owns the device exclusively for its lifetime and
/// releases it when the shutdown flag flips, including when that happens
/// before the first frame is grabbed.
pub struct CameraCapture {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CameraCapture {
    /// Open the camera and start the capture thread.
    ///
    /// Resolves once the device is acquired and streaming (or has failed
    /// to). Frames arrive on the returned receiver, already scaled to the
    /// configured target resolution.
    pub async fn open(
        config: &CaptureConfig,
    ) -> Result<(Self, mpsc::Receiver<Frame>), CaptureError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();

        let config = config.clone();
        let handle =
            tokio::task::spawn_blocking(move || capture_loop(config, frame_tx, shutdown_rx, ready_tx));

        match ready_rx.await {
            Ok(Ok(())) => Ok((
                Self {
                    shutdown: shutdown_tx,
                    handle,
                },
                frame_rx,
            )),
            Ok(Err(e)) => {
                let _ = handle.await;
                Err(e)
            }
            Err(_) => {
                let _ = handle.await;
                Err(CaptureError::Open(
                    "capture thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    /// Signal the capture thread and wait for it to release the camera.
    /// Once this returns, no further frame can be produced.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "capture thread panicked during shutdown");
        }
    }
}

fn capture_loop(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<Frame>,
    shutdown_rx: watch::Receiver<bool>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
) {
    let index = CameraIndex::Index(config.device_index);
    let format = CameraFormat::new_from(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.fps,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut camera = match Camera::new(index, requested) {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::Open(e.to_string())));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }

    let actual = camera.camera_format();
    info!(
        device = config.device_index,
        requested_w = config.width,
        requested_h = config.height,
        actual_w = actual.resolution().width_x,
        actual_h = actual.resolution().height_y,
        fps = config.fps,
        "camera capture started"
    );
    let _ = ready_tx.send(Ok(()));

    let frame_interval = Duration::from_millis(1000 / u64::from(config.fps.max(1)));

    loop {
        if *shutdown_rx.borrow() {
            info!(device = config.device_index, "camera capture shutdown requested");
            break;
        }

        let grab_start = std::time::Instant::now();

        match camera.frame() {
            Ok(raw) => match raw.decode_image::<RgbFormat>() {
                Ok(decoded) => {
                    let (width, height) = decoded.dimensions();
                    match scale_to_target(
                        decoded.into_raw(),
                        width,
                        height,
                        config.width,
                        config.height,
                    ) {
                        Some(frame) => {
                            if frame_tx.try_send(frame).is_err() {
                                debug!("frame dropped (receiver behind)");
                            }
                        }
                        None => warn!(width, height, "failed to rescale captured frame"),
                    }
                }
                Err(e) => warn!(error = %e, "failed to decode camera frame"),
            },
            Err(e) => {
                warn!(error = %e, "failed to grab camera frame");
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
        }

        // Pace to the target fps
        if let Some(remaining) = frame_interval.checked_sub(grab_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if let Err(e) = camera.stop_stream() {
        warn!(error = %e, "error stopping camera stream");
    }
    info!(device = config.device_index, "camera capture stopped");
}

/// Scale a raw RGB image to the target resolution and wrap it as a
/// timestamped RGBA frame. Returns `None` when the buffer does not match
/// the claimed dimensions.
fn scale_to_target(
    rgb: Vec<u8>,
    width: u32,
    height: u32,
    target_w: u32,
    target_h: u32,
) -> Option<Frame> {
    let img = RgbImage::from_raw(width, height, rgb)?;
    let rgba = image::DynamicImage::ImageRgb8(img)
        .resize_exact(target_w, target_h, FilterType::Nearest)
        .to_rgba8()
        .into_raw();

    let seq = SEQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    Frame::new(target_w, target_h, rgba, Utc::now().timestamp_millis(), seq).ok()
}
