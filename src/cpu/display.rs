//! Logical display and the presentation surface interface.
//!
//! The [`FrameBuffer`] is the machine's own 64x32 one-bit display. A host
//! mirrors it through a [`Surface`], which only ever sees per-pixel commands
//! and a `present` after each change. Scaling and colour are the surface's
//! business.

use serde::{Serialize, Deserialize};

/// Display width in pixels.
pub const WIDTH: usize = 64;

/// Display height in pixels.
pub const HEIGHT: usize = 32;

/// Receives draw commands from the executor.
pub trait Surface {
    /// Blank the whole surface.
    fn clear(&mut self);

    /// Turn a pixel on.
    fn set_pixel(&mut self, x: u8, y: u8);

    /// Turn a pixel off.
    fn clear_pixel(&mut self, x: u8, y: u8);

    /// Flush pending changes.
    fn present(&mut self);
}

/// Surface that ignores everything. Useful for headless runs, where the
/// frame buffer itself is the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn clear(&mut self) {}
    fn set_pixel(&mut self, _x: u8, _y: u8) {}
    fn clear_pixel(&mut self, _x: u8, _y: u8) {}
    fn present(&mut self) {}
}

/// A single command sent to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawCommand {
    Clear,
    Set(u8, u8),
    Unset(u8, u8),
    Present,
}

/// Surface that records every command it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `Present` commands seen.
    pub fn presents(&self) -> usize {
        self.commands.iter().filter(|c| **c == DrawCommand::Present).count()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn set_pixel(&mut self, x: u8, y: u8) {
        self.commands.push(DrawCommand::Set(x, y));
    }

    fn clear_pixel(&mut self, x: u8, y: u8) {
        self.commands.push(DrawCommand::Unset(x, y));
    }

    fn present(&mut self) {
        self.commands.push(DrawCommand::Present);
    }
}

/// The machine's 64x32 monochrome display buffer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameBuffer {
    pixels: Vec<bool>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![false; WIDTH * HEIGHT],
        }
    }

    /// Pixel state. Coordinates wrap.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::index(x, y)]
    }

    /// XOR a pixel on, returning `true` if it was already on (a collision).
    /// Coordinates wrap.
    #[inline]
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let idx = Self::index(x, y);
        let was_on = self.pixels[idx];
        self.pixels[idx] = !was_on;
        was_on
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
    }

    /// Whether any pixel is on.
    pub fn is_blank(&self) -> bool {
        !self.pixels.iter().any(|p| *p)
    }

    /// Number of lit pixels.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    /// Rows of pixels, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(WIDTH)
    }

    /// Row-major pixel data as bytes, one byte per pixel (0 or 1).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().map(|p| *p as u8).collect()
    }

    /// Send the whole buffer to a surface.
    pub fn replay(&self, surface: &mut impl Surface) {
        surface.clear();
        for (y, row) in self.rows().enumerate() {
            for (x, on) in row.iter().enumerate() {
                if *on {
                    surface.set_pixel(x as u8, y as u8);
                }
            }
        }
        surface.present();
    }

    #[inline]
    fn index(x: usize, y: usize) -> usize {
        (y % HEIGHT) * WIDTH + (x % WIDTH)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("lit", &self.lit_count())
            .field("size", &(WIDTH, HEIGHT))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_reports_collision() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.toggle(3, 4));
        assert!(fb.get(3, 4));
        assert!(fb.toggle(3, 4));
        assert!(!fb.get(3, 4));
    }

    #[test]
    fn test_coordinates_wrap() {
        let mut fb = FrameBuffer::new();
        fb.toggle(WIDTH + 1, HEIGHT + 2);
        assert!(fb.get(1, 2));
    }

    #[test]
    fn test_clear() {
        let mut fb = FrameBuffer::new();
        fb.toggle(0, 0);
        fb.toggle(63, 31);
        assert_eq!(fb.lit_count(), 2);
        fb.clear();
        assert!(fb.is_blank());
    }

    #[test]
    fn test_replay_sends_lit_pixels() {
        let mut fb = FrameBuffer::new();
        fb.toggle(5, 6);
        let mut surface = RecordingSurface::new();
        fb.replay(&mut surface);
        assert_eq!(
            surface.commands,
            vec![DrawCommand::Clear, DrawCommand::Set(5, 6), DrawCommand::Present]
        );
    }
}
