mod alert;
mod capture;
mod dashboard;
mod detector;
mod render;

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use camwatch_common::config::Config;
use camwatch_common::frame::Frame;
use dashboard::Dashboard;
use detector::session::WatchSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        device = config.capture.device_index,
        width = config.capture.width,
        height = config.capture.height,
        fps = config.capture.fps,
        pixel_threshold = config.detector.pixel_threshold,
        min_area = config.detector.min_area,
        "starting camwatch"
    );

    let ticks = Arc::new(AtomicU64::new(0));
    let alert = Box::new(alert::BeepAlert::new(&config.alert));
    let dashboard = Dashboard::new(&config.dashboard, Arc::clone(&ticks));
    let refresh = Duration::from_secs(config.dashboard.refresh_secs.max(1));
    let mut session = WatchSession::new(config, alert, ticks);

    // Capture starts immediately; Enter toggles it off and on again.
    let frames = match session.start().await {
        Ok(frames) => frames,
        Err(e) => {
            error!(error = %e, "failed to open camera");
            eprintln!("Camera could not be started: {e}");
            None
        }
    };

    run_watch_loop(&mut session, dashboard, frames, refresh).await;

    session.stop().await;
}

/// Single cooperative loop: captured frames drive detection ticks, stdin
/// toggles capture, the dashboard refreshes on its own interval, Ctrl-C
/// exits. All session state is mutated only from here.
async fn run_watch_loop(
    session: &mut WatchSession,
    mut dashboard: Dashboard,
    mut frames: Option<mpsc::Receiver<Frame>>,
    refresh: Duration,
) {
    let mut ticker = tokio::time::interval(refresh);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            maybe_frame = next_frame(&mut frames), if frames.is_some() => {
                match maybe_frame {
                    Some(frame) => session.tick(Some(frame)),
                    None => {
                        warn!("camera stream ended");
                        frames = None;
                        session.stop().await;
                        eprintln!("Camera stream ended; press Enter to restart.");
                    }
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => toggle(session, &mut frames).await,
                    Ok(None) => stdin_open = false,
                    Err(e) => warn!(error = %e, "stdin read error"),
                }
            }
            _ = ticker.tick() => {
                println!(
                    "{}",
                    dashboard.status_line(session.phase(), session.motion(), session.score())
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }
}

async fn next_frame(frames: &mut Option<mpsc::Receiver<Frame>>) -> Option<Frame> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// The single user-facing control: flip capture on or off.
async fn toggle(session: &mut WatchSession, frames: &mut Option<mpsc::Receiver<Frame>>) {
    if session.is_active() {
        *frames = None;
        session.stop().await;
        println!("Capture stopped.");
    } else {
        match session.start().await {
            Ok(new_frames) => {
                *frames = new_frames;
                println!("Capture started.");
            }
            Err(e) => {
                error!(error = %e, "failed to open camera");
                eprintln!("Camera could not be started: {e}");
            }
        }
    }
}
