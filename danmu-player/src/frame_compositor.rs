//! Offline frame rendering
//!
//! Renders frames at explicit timestamps with the same composer the player
//! uses, so lane assignment matches a real-time run that hits the same
//! timestamps.

use crate::raster::BlockRasterizer;
use crate::surface::Rasterizer;
use crate::{Error, Result};
use danmu_core::{
    FrameComposer, FrameRequest, FrameStats, ItemHandle, MeasurementCache, OverlayItem, Size,
    StyleConfig,
};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Renders overlay frames at given timestamps onto in-memory images
pub struct FrameCompositor {
    items: Vec<ItemHandle>,
    style: StyleConfig,
    width: u32,
    height: u32,
    background: Rgba<u8>,
    rasterizer: BlockRasterizer,
    cache: MeasurementCache,
    composer: FrameComposer,
    last_timestamp: Option<u64>,
    last_stats: FrameStats,
}

impl FrameCompositor {
    /// Creates a compositor over `items` for frames of the given size
    pub fn new(items: Vec<OverlayItem>, style: StyleConfig, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrameSize { width, height });
        }
        Ok(Self {
            items: items.into_iter().map(Arc::new).collect(),
            style,
            width,
            height,
            background: Rgba([0, 0, 0, 255]),
            rasterizer: BlockRasterizer::new(),
            cache: MeasurementCache::new(),
            composer: FrameComposer::new(),
            last_timestamp: None,
            last_stats: FrameStats::default(),
        })
    }

    /// Sets the color frames are cleared to
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// End of the last item window under the current style, ms
    pub fn duration_ms(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.window(self.style.duration_coefficient).1.ceil() as u64)
            .max()
            .unwrap_or(0)
    }

    /// Renders a frame at the given timestamp.
    ///
    /// Frames are expected in increasing timestamp order; going back in time
    /// starts lane assignment over.
    pub fn render_frame(&mut self, timestamp_ms: u64) -> RgbaImage {
        if self.last_timestamp.is_some_and(|last| timestamp_ms < last) {
            self.composer.reset();
        }
        self.last_timestamp = Some(timestamp_ms);

        let mut frame = ImageBuffer::from_pixel(self.width, self.height, self.background);
        let request = FrameRequest {
            time_ms: timestamp_ms as f64,
            surface: Size::new(self.width as f32, self.height as f32),
            style: &self.style,
        };

        let rasterizer = &self.rasterizer;
        let style = &self.style;
        self.last_stats = self.composer.compose(
            &request,
            &self.items,
            &self.cache,
            rasterizer,
            |command| rasterizer.draw(&mut frame, command, style),
        );
        trace!(timestamp_ms, drawn = self.last_stats.drawn, "rendered offline frame");

        frame
    }

    /// Renders a frame and writes it to `path`; the format follows the extension
    pub fn save_frame(&mut self, timestamp_ms: u64, path: &Path) -> Result<()> {
        self.render_frame(timestamp_ms).save(path)?;
        Ok(())
    }

    /// Counters of the last rendered frame
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Items on screen in the last rendered frame
    pub fn showing(&self) -> usize {
        self.composer.showing().len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use danmu_core::{Anchor, Direction, ItemKind};

    fn items() -> Vec<OverlayItem> {
        vec![
            OverlayItem::new(ItemKind::Stationary(Anchor::Top), "first", 0),
            OverlayItem::new(ItemKind::Stationary(Anchor::Top), "second", 0),
            OverlayItem::new(ItemKind::Moving(Direction::RightToLeft), "moving", 1000),
        ]
    }

    #[test]
    fn test_rejects_empty_frame() {
        assert!(matches!(
            FrameCompositor::new(items(), StyleConfig::default(), 0, 100),
            Err(Error::InvalidFrameSize { width: 0, height: 100 })
        ));
    }

    #[test]
    fn test_renders_active_items() {
        let mut compositor = FrameCompositor::new(items(), StyleConfig::default(), 320, 120).unwrap();
        assert_eq!(compositor.duration_ms(), 11_000);

        let frame = compositor.render_frame(100);
        assert_eq!(frame.dimensions(), (320, 120));
        assert_eq!(compositor.last_stats().drawn, 2);
        assert!(frame.pixels().any(|p| p[0] > 0));

        compositor.render_frame(5_000);
        assert_eq!(compositor.last_stats().drawn, 3);

        // window closed for both banners
        compositor.render_frame(6_000);
        assert_eq!(compositor.showing(), 1);
    }

    #[test]
    fn test_background_only_before_first_item() {
        let background = Rgba([10, 20, 30, 255]);
        let mut compositor = FrameCompositor::new(
            vec![OverlayItem::new(ItemKind::Stationary(Anchor::Top), "late", 1_000)],
            StyleConfig::default(),
            64,
            48,
        )
        .unwrap()
        .with_background(background);

        let frame = compositor.render_frame(0);
        assert!(frame.pixels().all(|p| *p == background));
    }
}
