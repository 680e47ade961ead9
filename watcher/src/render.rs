use camwatch_common::frame::Frame;
use tracing::debug;

const OFFLINE_BACKGROUND: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];
const OFFLINE_BANNER: [u8; 4] = [0x00, 0xFF, 0x00, 0xFF];

/// Fixed-size RGBA display buffer the detection loop draws into.
///
/// While capture runs it mirrors the latest frame; when stopped it shows
/// the camera-off placeholder: a black fill with a green band across the
/// middle, standing in for the banner text a canvas front end would draw.
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&OFFLINE_BACKGROUND);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Raw RGBA bytes, row-major.
    #[allow(dead_code)]
    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    /// Copy a frame of matching dimensions into the buffer. Mismatched
    /// frames are dropped; the capture side scales everything to the
    /// target resolution, so a mismatch means a stale producer.
    pub fn blit(&mut self, frame: &Frame) {
        if frame.width() != self.width || frame.height() != self.height {
            debug!(
                frame_w = frame.width(),
                frame_h = frame.height(),
                surface_w = self.width,
                surface_h = self.height,
                "dropping frame with mismatched dimensions"
            );
            return;
        }
        self.data.copy_from_slice(frame.rgba());
    }

    /// Paint the camera-off placeholder.
    pub fn render_offline(&mut self) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&OFFLINE_BACKGROUND);
        }

        let band_half = (self.height / 24).max(1);
        let mid = self.height / 2;
        let start = mid.saturating_sub(band_half);
        let end = (mid + band_half).min(self.height);
        let row_bytes = self.width as usize * 4;
        for y in start..end {
            let row = y as usize * row_bytes;
            for px in self.data[row..row + row_bytes].chunks_exact_mut(4) {
                px.copy_from_slice(&OFFLINE_BANNER);
            }
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        &self.data[offset..offset + 4]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_black() {
        let surface = Surface::new(8, 8);
        assert_eq!(surface.rgba().len(), 8 * 8 * 4);
        assert_eq!(surface.pixel(0, 0), &OFFLINE_BACKGROUND);
        assert_eq!(surface.pixel(7, 7), &OFFLINE_BACKGROUND);
    }

    #[test]
    fn blit_copies_matching_frame() {
        let mut surface = Surface::new(4, 4);
        surface.blit(&Frame::filled(4, 4, [1, 2, 3]));
        assert_eq!(surface.pixel(2, 2), &[1, 2, 3, 0xFF]);
    }

    #[test]
    fn blit_drops_mismatched_frame() {
        let mut surface = Surface::new(4, 4);
        surface.blit(&Frame::filled(8, 8, [1, 2, 3]));
        assert_eq!(surface.pixel(0, 0), &OFFLINE_BACKGROUND);
    }

    #[test]
    fn render_offline_paints_banner_over_live_content() {
        let mut surface = Surface::new(16, 24);
        surface.blit(&Frame::filled(16, 24, [200, 200, 200]));
        surface.render_offline();
        // middle of the banner band
        assert_eq!(surface.pixel(8, 12), &OFFLINE_BANNER);
        // corners back to black
        assert_eq!(surface.pixel(0, 0), &OFFLINE_BACKGROUND);
        assert_eq!(surface.pixel(15, 23), &OFFLINE_BACKGROUND);
    }
}
