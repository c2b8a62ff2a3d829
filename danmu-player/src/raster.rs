//! Reference software rasterizer and in-memory surfaces
//!
//! [`BlockRasterizer`] draws each glyph as a filled block. It has no font
//! engine, but it measures and positions text with the same metrics a real
//! rasterizer would use, which makes it suitable for headless runs, offline
//! rendering and tests. Rotation affects the reported bounds only.

use crate::surface::{Rasterizer, Surface, SurfaceProvider};
use danmu_core::{
    Color, DrawCommand, DrawMode, Measurer, OverlayItem, Rect, Size, StyleConfig, Typeface,
};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Advance of an ASCII glyph, as a fraction of the text size
const NARROW_ADVANCE: f32 = 0.55;

impl Surface for RgbaImage {
    fn width(&self) -> u32 {
        RgbaImage::width(self)
    }

    fn height(&self) -> u32 {
        RgbaImage::height(self)
    }

    fn clear(&mut self) {
        for pixel in self.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
}

/// Block-glyph rasterizer drawing onto [`RgbaImage`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl BlockRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn text_size(item: &OverlayItem, style: &StyleConfig) -> f32 {
        item.style.text_size * style.text_size_coefficient
    }

    fn advance(c: char, size: f32, typeface: Typeface) -> f32 {
        let base = if c.is_ascii() {
            NARROW_ADVANCE * size
        } else {
            size
        };
        match typeface {
            Typeface::DefaultBold => base * 1.1,
            Typeface::Monospace if c.is_ascii() => 0.6 * size,
            _ => base,
        }
    }

    fn line_width(line: &str, size: f32, typeface: Typeface) -> f32 {
        line.chars().map(|c| Self::advance(c, size, typeface)).sum()
    }

    fn padding(size: f32) -> f32 {
        size / 3.0
    }
}

impl Measurer for BlockRasterizer {
    fn measure(&self, item: &OverlayItem, style: &StyleConfig) -> Size {
        let size = Self::text_size(item, style);
        let lines = item.text_lines();
        let text_width = lines
            .iter()
            .map(|line| Self::line_width(line, size, style.typeface))
            .fold(0.0, f32::max);
        if text_width <= 0.0 || size <= 0.0 {
            return Size::default();
        }

        let mut width = text_width + Self::padding(size);
        let mut height = size * lines.len() as f32 + Self::padding(size);
        if let DrawMode::Shadow { radius, .. } = style.draw_mode {
            width += radius;
            height += radius;
        }
        Size::new(width, height)
    }
}

impl Rasterizer<RgbaImage> for BlockRasterizer {
    fn draw(
        &self,
        surface: &mut RgbaImage,
        command: &DrawCommand<'_>,
        style: &StyleConfig,
    ) -> Option<Rect> {
        if command.footprint.is_empty() {
            return None;
        }
        let item = command.item;
        let size = Self::text_size(item, style);
        let pad = Self::padding(size) / 2.0;
        let origin = command.placement.origin;
        let opacity = command.placement.alpha as f32 / 255.0;

        let mut glyphs = Vec::new();
        for (row, line) in item.text_lines().iter().enumerate() {
            let top = origin.y + pad + row as f32 * size;
            let mut x = origin.x + pad;
            for c in line.chars() {
                let advance = Self::advance(c, size, style.typeface);
                if !c.is_whitespace() {
                    glyphs.push(Rect::new(
                        x + advance * 0.1,
                        top + size * 0.15,
                        x + advance * 0.9,
                        top + size * 0.9,
                    ));
                }
                x += advance;
            }
        }

        if let DrawMode::Shadow { radius, dx, dy, color } = style.draw_mode {
            let color = if item.style.shadow_color.is_transparent() {
                color
            } else {
                item.style.shadow_color
            };
            let spread = (radius / 4.0).max(1.0);
            for glyph in &glyphs {
                let halo = Rect::new(
                    glyph.left - spread + dx,
                    glyph.top - spread + dy,
                    glyph.right + spread + dx,
                    glyph.bottom + spread + dy,
                );
                fill_rect(surface, halo, color, opacity);
            }
        }

        for glyph in &glyphs {
            fill_rect(surface, *glyph, item.style.color, opacity);
        }

        let bounds = Rect::from_origin(origin, command.footprint);
        if item.style.underline {
            let y = bounds.bottom - pad;
            let underline = Rect::new(bounds.left + pad, y - 1.5, bounds.right - pad, y);
            fill_rect(surface, underline, item.style.color, opacity);
        }
        if !item.style.border_color.is_transparent() {
            stroke_rect(surface, bounds, 2.0, item.style.border_color, opacity);
        }

        Some(command.placement.bounds(command.footprint))
    }

    fn draw_debug(&self, surface: &mut RgbaImage, lines: &[String]) {
        let size = 12.0;
        for (row, line) in lines.iter().enumerate() {
            let top = 4.0 + row as f32 * size * 1.2;
            let width = Self::line_width(line, size, Typeface::Monospace);
            fill_rect(
                surface,
                Rect::new(4.0, top, 4.0 + width, top + size),
                Color::argb(160, 0, 0, 0),
                1.0,
            );
            let mut x = 4.0;
            for c in line.chars() {
                let advance = Self::advance(c, size, Typeface::Monospace);
                if !c.is_whitespace() {
                    let glyph = Rect::new(x + 1.0, top + 2.0, x + advance - 1.0, top + size - 2.0);
                    fill_rect(surface, glyph, Color::WHITE, 1.0);
                }
                x += advance;
            }
        }
    }
}

/// Fills `rect`, clipped to the image, blending `color` over what is there
pub fn fill_rect(image: &mut RgbaImage, rect: Rect, color: Color, opacity: f32) {
    let [r, g, b, a] = color.to_rgba();
    let alpha = a as f32 / 255.0 * opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    let x_start = rect.left.max(0.0).round() as u32;
    let y_start = rect.top.max(0.0).round() as u32;
    let x_end = rect.right.min(image.width() as f32).round().max(0.0) as u32;
    let y_end = rect.bottom.min(image.height() as f32).round().max(0.0) as u32;

    for y in y_start..y_end {
        for x in x_start..x_end {
            let base = image.get_pixel_mut(x, y);
            *base = blend(*base, [r, g, b], alpha);
        }
    }
}

fn stroke_rect(image: &mut RgbaImage, rect: Rect, width: f32, color: Color, opacity: f32) {
    let Rect {
        left,
        top,
        right,
        bottom,
    } = rect;
    fill_rect(image, Rect::new(left, top, right, top + width), color, opacity);
    fill_rect(image, Rect::new(left, bottom - width, right, bottom), color, opacity);
    fill_rect(image, Rect::new(left, top + width, left + width, bottom - width), color, opacity);
    fill_rect(image, Rect::new(right - width, top + width, right, bottom - width), color, opacity);
}

/// Source-over blend of an RGB color with coverage `alpha`
fn blend(base: Rgba<u8>, color: [u8; 3], alpha: f32) -> Rgba<u8> {
    let inv_alpha = 1.0 - alpha;
    let base_alpha = base[3] as f32 / 255.0;
    Rgba([
        (color[0] as f32 * alpha + base[0] as f32 * inv_alpha) as u8,
        (color[1] as f32 * alpha + base[1] as f32 * inv_alpha) as u8,
        (color[2] as f32 * alpha + base[2] as f32 * inv_alpha) as u8,
        ((alpha + base_alpha * inv_alpha) * 255.0).round() as u8,
    ])
}

#[derive(Debug, Default)]
struct Sink {
    available: bool,
    acquired: u64,
    submitted: u64,
    last: Option<RgbaImage>,
}

/// Observer side of an [`ImageSurfaceProvider`]
#[derive(Debug, Clone)]
pub struct FrameSink {
    inner: Arc<Mutex<Sink>>,
}

impl FrameSink {
    /// Frames submitted so far
    pub fn submitted(&self) -> u64 {
        self.inner.lock().submitted
    }

    /// Surfaces handed out so far
    pub fn acquired(&self) -> u64 {
        self.inner.lock().acquired
    }

    /// Copy of the most recently submitted frame
    pub fn last_frame(&self) -> Option<RgbaImage> {
        self.inner.lock().last.clone()
    }

    /// Makes [`SurfaceProvider::acquire`] fail while `false`
    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }
}

/// Surface provider handing out fresh in-memory images
#[derive(Debug)]
pub struct ImageSurfaceProvider {
    width: u32,
    height: u32,
    sink: Arc<Mutex<Sink>>,
}

impl ImageSurfaceProvider {
    pub fn new(width: u32, height: u32) -> (Self, FrameSink) {
        let sink = Arc::new(Mutex::new(Sink {
            available: true,
            ..Sink::default()
        }));
        let provider = Self {
            width,
            height,
            sink: Arc::clone(&sink),
        };
        (provider, FrameSink { inner: sink })
    }
}

impl SurfaceProvider for ImageSurfaceProvider {
    type Frame = RgbaImage;

    fn acquire(&mut self) -> Option<RgbaImage> {
        let mut sink = self.sink.lock();
        if !sink.available {
            return None;
        }
        sink.acquired += 1;
        Some(RgbaImage::new(self.width, self.height))
    }

    fn submit(&mut self, frame: RgbaImage) {
        let mut sink = self.sink.lock();
        sink.submitted += 1;
        sink.last = Some(frame);
    }
}
