use camwatch_common::config::DetectorConfig;
use camwatch_common::frame::Frame;
use tracing::debug;

/// Outcome of one frame comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionReport {
    /// Pixels whose combined RGB delta exceeded the per-pixel threshold.
    pub score: u32,
    /// Whether the score cleared the area threshold.
    pub motion: bool,
}

impl MotionReport {
    const QUIET: Self = Self {
        score: 0,
        motion: false,
    };
}

/// Frame-differencing motion detector.
///
/// Each frame is compared against the previous one with a per-pixel
/// sum-of-absolute-differences over RGB (alpha excluded), and the count of
/// changed pixels is held against an area threshold. Deliberately simple
/// and resolution-dependent; the default thresholds are tuned for 720x480.
pub struct MotionDetector {
    combined_threshold: u32,
    min_area: u32,
    previous: Option<Frame>,
}

impl MotionDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            combined_threshold: config.pixel_threshold * 3,
            min_area: config.min_area,
            previous: None,
        }
    }

    /// Compare the frame against the baseline, then replace the baseline
    /// unconditionally.
    ///
    /// The first frame after a start or reset scores zero: there is
    /// nothing to compare against yet. A baseline with a different buffer
    /// size (the stream changed resolution mid-flight) also scores zero
    /// and is rebased.
    pub fn observe(&mut self, frame: &Frame) -> MotionReport {
        let report = match &self.previous {
            Some(prev) if prev.rgba().len() == frame.rgba().len() => {
                let score = changed_pixels(prev, frame, self.combined_threshold);
                MotionReport {
                    score,
                    motion: score > self.min_area,
                }
            }
            Some(_) => {
                debug!(seq = frame.seq, "frame size changed, rebasing");
                MotionReport::QUIET
            }
            None => {
                debug!(seq = frame.seq, "first frame, nothing to compare");
                MotionReport::QUIET
            }
        };
        self.previous = Some(frame.clone());
        report
    }

    /// Drop the comparison baseline.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Count pixels whose summed RGB delta exceeds `combined_threshold`
/// (strictly). Alpha is excluded from the comparison.
pub fn changed_pixels(prev: &Frame, curr: &Frame, combined_threshold: u32) -> u32 {
    prev.rgba()
        .chunks_exact(4)
        .zip(curr.rgba().chunks_exact(4))
        .filter(|(p, c)| {
            let diff = u32::from(p[0].abs_diff(c[0]))
                + u32::from(p[1].abs_diff(c[1]))
                + u32::from(p[2].abs_diff(c[2]));
            diff > combined_threshold
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> MotionDetector {
        MotionDetector::new(&DetectorConfig::default())
    }

    /// 720x480 frame where the first `changed` pixels are white and the
    /// rest black.
    fn frame_with_white_prefix(changed: usize) -> Frame {
        let mut data = vec![0u8; 720 * 480 * 4];
        for px in data.chunks_exact_mut(4).take(changed) {
            px.copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        }
        for px in data.chunks_exact_mut(4).skip(changed) {
            px[3] = 0xFF;
        }
        Frame::new(720, 480, data, 0, 0).unwrap()
    }

    #[test]
    fn first_frame_scores_zero() {
        let mut det = detector();
        let report = det.observe(&Frame::filled(720, 480, [128, 128, 128]));
        assert_eq!(report, MotionReport { score: 0, motion: false });
        // the frame became the baseline: an identical follow-up stays quiet
        let report = det.observe(&Frame::filled(720, 480, [128, 128, 128]));
        assert_eq!(report.score, 0);
    }

    #[test]
    fn identical_frames_score_zero() {
        let mut det = detector();
        let frame = Frame::filled(720, 480, [90, 120, 47]);
        det.observe(&frame);
        let report = det.observe(&frame.clone());
        assert_eq!(report.score, 0);
        assert!(!report.motion);
    }

    #[test]
    fn black_to_white_counts_every_pixel() {
        let mut det = detector();
        det.observe(&Frame::filled(720, 480, [0, 0, 0]));
        let report = det.observe(&Frame::filled(720, 480, [0xFF, 0xFF, 0xFF]));
        assert_eq!(report.score, 345_600);
        assert!(report.motion);
    }

    #[test]
    fn five_hundred_changed_pixels_stay_quiet() {
        let mut det = detector();
        det.observe(&frame_with_white_prefix(0));
        let report = det.observe(&frame_with_white_prefix(500));
        assert_eq!(report.score, 500);
        assert!(!report.motion);
    }

    #[test]
    fn six_hundred_one_changed_pixels_trip_detection() {
        let mut det = detector();
        det.observe(&frame_with_white_prefix(0));
        let report = det.observe(&frame_with_white_prefix(601));
        assert_eq!(report.score, 601);
        assert!(report.motion);
    }

    #[test]
    fn combined_threshold_is_strict() {
        let prev = Frame::new(1, 1, vec![0, 0, 0, 0xFF], 0, 0).unwrap();
        // 28 per channel sums to exactly 84: not counted
        let at = Frame::new(1, 1, vec![28, 28, 28, 0xFF], 0, 1).unwrap();
        assert_eq!(changed_pixels(&prev, &at, 84), 0);
        // one past it is
        let over = Frame::new(1, 1, vec![28, 28, 29, 0xFF], 0, 2).unwrap();
        assert_eq!(changed_pixels(&prev, &over, 84), 1);
    }

    #[test]
    fn alpha_channel_is_excluded() {
        let prev = Frame::new(1, 1, vec![10, 10, 10, 0x00], 0, 0).unwrap();
        let curr = Frame::new(1, 1, vec![10, 10, 10, 0xFF], 0, 1).unwrap();
        assert_eq!(changed_pixels(&prev, &curr, 84), 0);
    }

    #[test]
    fn score_is_monotonic_in_changed_pixels() {
        let base = frame_with_white_prefix(0);
        let few = frame_with_white_prefix(100);
        let many = frame_with_white_prefix(2000);
        let few_score = changed_pixels(&base, &few, 84);
        let many_score = changed_pixels(&base, &many, 84);
        assert!(few_score <= many_score);
        assert_eq!(few_score, 100);
        assert_eq!(many_score, 2000);
    }

    #[test]
    fn reset_clears_baseline() {
        let mut det = detector();
        det.observe(&Frame::filled(720, 480, [0, 0, 0]));
        det.reset();
        let report = det.observe(&Frame::filled(720, 480, [0xFF, 0xFF, 0xFF]));
        assert_eq!(report.score, 0);
        assert!(!report.motion);
    }

    #[test]
    fn resolution_change_rebases() {
        let mut det = detector();
        det.observe(&Frame::filled(720, 480, [0, 0, 0]));
        let report = det.observe(&Frame::filled(360, 240, [0xFF, 0xFF, 0xFF]));
        assert_eq!(report.score, 0);
        assert!(!report.motion);
    }
}
