use std::time::Duration;

use camwatch_common::config::AlertConfig;
use rodio::source::SineWave;
use rodio::{OutputStreamBuilder, Sink, Source};

/// Sink for the motion alert cue.
///
/// Fire-and-forget: implementations must never block the detection loop,
/// and playback failure is not an event the rest of the system reacts to.
pub trait AlertSink {
    fn motion_alert(&self);
}

/// Short sine beep played through the default audio output.
///
/// Playback runs on its own thread (`OutputStream` is not `Send`), and any
/// failure to open or drive the output is swallowed there.
pub struct BeepAlert {
    frequency_hz: f32,
    duration: Duration,
    volume: f32,
}

impl BeepAlert {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            frequency_hz: config.frequency_hz,
            duration: Duration::from_millis(config.duration_ms),
            volume: f32::from(config.volume.min(100)) / 100.0,
        }
    }
}

impl AlertSink for BeepAlert {
    fn motion_alert(&self) {
        let frequency_hz = self.frequency_hz;
        let duration = self.duration;
        let volume = self.volume;

        std::thread::spawn(move || {
            let Ok(stream) = OutputStreamBuilder::open_default_stream() else {
                return;
            };
            let sink = Sink::connect_new(stream.mixer());
            sink.set_volume(volume);
            sink.append(SineWave::new(frequency_hz).take_duration(duration));
            sink.sleep_until_end();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_maps_to_unit_range() {
        let alert = BeepAlert::new(&AlertConfig {
            frequency_hz: 440.0,
            duration_ms: 100,
            volume: 50,
        });
        assert!((alert.volume - 0.5).abs() < f32::EPSILON);
        assert_eq!(alert.duration, Duration::from_millis(100));
    }

    #[test]
    fn volume_is_clamped_to_100() {
        let alert = BeepAlert::new(&AlertConfig {
            frequency_hz: 440.0,
            duration_ms: 100,
            volume: 250,
        });
        assert!((alert.volume - 1.0).abs() < f32::EPSILON);
    }
}
