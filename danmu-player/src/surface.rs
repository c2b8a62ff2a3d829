//! Drawing collaborators supplied by the host
//!
//! The render loop owns the [`SurfaceProvider`], so surface access is
//! exclusive without further locking. A [`Rasterizer`] both measures items
//! (it is the [`Measurer`] behind the measurement cache) and draws them.

use danmu_core::{DrawCommand, Measurer, Rect, StyleConfig};

/// Something items are drawn onto for one frame
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Erases everything drawn so far
    fn clear(&mut self);
}

/// Hands out a surface per frame and takes it back for display
pub trait SurfaceProvider: Send + 'static {
    type Frame: Surface;

    /// Returns `None` when no surface is available; the frame is skipped.
    fn acquire(&mut self) -> Option<Self::Frame>;
    fn submit(&mut self, frame: Self::Frame);
}

/// Measures and draws items onto surfaces of type `S`
pub trait Rasterizer<S: Surface>: Measurer + Send + Sync {
    /// Draws one item. Returns the rectangle drawn, or `None` if nothing was.
    fn draw(&self, surface: &mut S, command: &DrawCommand<'_>, style: &StyleConfig)
        -> Option<Rect>;

    /// Draws diagnostic text in a corner of the surface
    fn draw_debug(&self, surface: &mut S, lines: &[String]);
}
