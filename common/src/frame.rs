/// A captured camera frame with timestamp metadata.
///
/// Pixel layout is interleaved RGBA, row-major, 4 bytes per pixel, so
/// `data.len() == width * height * 4`. A frame is immutable once built;
/// each capture tick produces a fresh one that supersedes the last.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    /// Capture time as Unix millis.
    pub captured_at_ms: i64,
    /// Capture sequence number, monotonic per session.
    pub seq: u64,
}

impl Frame {
    /// Build a frame from a raw RGBA buffer, validating its length.
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        captured_at_ms: i64,
        seq: u64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                got: data.len(),
                expected,
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
            captured_at_ms,
            seq,
        })
    }

    /// Solid-color frame, fully opaque. Used for the offline placeholder
    /// and as a test fixture.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
        }
        Self {
            width,
            height,
            data,
            captured_at_ms: 0,
            seq: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    /// Capture time as a chrono timestamp, if the millis are representable.
    pub fn captured_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.captured_at_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer is {got} bytes, expected {expected} for {width}x{height} RGBA")]
    SizeMismatch {
        got: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}
