//! Overlay item data structures

use crate::kind::{ItemKind, KindTag};

/// Packed ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const DARK_GRAY: Color = Color(0xFF44_4444);

    /// Creates an opaque color from its RGB components
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(255, r, g, b)
    }

    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(u32::from_be_bytes([a, r, g, b]))
    }

    pub fn alpha(self) -> u8 {
        self.0.to_be_bytes()[0]
    }

    /// Returns `[r, g, b, a]`
    pub fn to_rgba(self) -> [u8; 4] {
        let [a, r, g, b] = self.0.to_be_bytes();
        [r, g, b, a]
    }

    pub fn is_transparent(self) -> bool {
        self.alpha() == 0
    }
}

/// Per-item style overrides
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ItemStyle {
    /// Text size before the global size coefficient
    pub text_size: f32,
    pub color: Color,
    /// Shadow/outline color
    pub shadow_color: Color,
    pub underline: bool,
    /// Border drawn around the item, transparent for none
    pub border_color: Color,
    pub alpha: u8,
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self {
            text_size: 25.0,
            color: Color::WHITE,
            shadow_color: Color::TRANSPARENT,
            underline: false,
            border_color: Color::TRANSPARENT,
            alpha: 255,
        }
    }
}

/// A single timed overlay item.
///
/// Items have no key: the pool hands them out as `Arc<OverlayItem>` and two
/// handles refer to the same item only if they point to the same allocation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayItem {
    /// Display text
    pub text: String,
    /// Pre-split lines; when `None` the text is a single line
    #[cfg_attr(feature = "serde", serde(default))]
    pub lines: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: ItemStyle,
    /// Time in milliseconds at which the item becomes visible
    pub offset_ms: u64,
    /// Base lifetime in milliseconds, before the duration coefficient
    pub duration_ms: u64,
    /// Visibility toggle, independent of timing
    #[cfg_attr(feature = "serde", serde(default = "visible_default"))]
    pub visible: bool,
    pub kind: ItemKind,
    /// Opaque caller data
    #[cfg_attr(feature = "serde", serde(default))]
    pub tag: Option<String>,
}

#[cfg(feature = "serde")]
fn visible_default() -> bool {
    true
}

impl OverlayItem {
    /// Creates a new item with the default duration for its kind
    pub fn new(kind: ItemKind, text: impl Into<String>, offset_ms: u64) -> Self {
        Self {
            text: text.into(),
            lines: None,
            style: ItemStyle::default(),
            offset_ms,
            duration_ms: kind.default_duration_ms(),
            visible: true,
            kind,
            tag: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_style(mut self, style: ItemStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Splits the text into lines on `separator`. Single-line text is left
    /// untouched.
    pub fn with_lines_split_on(mut self, separator: &str) -> Self {
        if !self.text.is_empty() && self.text.contains(separator) {
            self.lines = Some(self.text.split(separator).map(str::to_owned).collect());
        }
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Concrete kind of this item
    pub fn tag_kind(&self) -> KindTag {
        self.kind.tag()
    }

    /// Lines to render, in order
    pub fn text_lines(&self) -> Vec<&str> {
        match &self.lines {
            Some(lines) => lines.iter().map(String::as_str).collect(),
            None => vec![self.text.as_str()],
        }
    }

    /// Lifetime in milliseconds after applying the duration coefficient
    pub fn effective_duration(&self, coefficient: f32) -> f64 {
        self.duration_ms as f64 * coefficient as f64
    }

    /// Inclusive `[start, end]` window in milliseconds
    pub fn window(&self, coefficient: f32) -> (f64, f64) {
        let start = self.offset_ms as f64;
        (start, start + self.effective_duration(coefficient))
    }

    /// Checks if this item is within its window at the given time
    pub fn is_active(&self, time_ms: f64, coefficient: f32) -> bool {
        let (start, end) = self.window(coefficient);
        time_ms >= start && time_ms <= end
    }

    /// Fraction of the lifetime elapsed at `time_ms`.
    ///
    /// Not clamped: callers see values slightly outside `[0, 1]` at the
    /// window edges.
    pub fn progress(&self, time_ms: f64, coefficient: f32) -> f32 {
        let duration = self.effective_duration(coefficient);
        if duration <= 0.0 {
            return 1.0;
        }
        ((time_ms - self.offset_ms as f64) / duration) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Anchor, Direction};

    #[test]
    fn test_window_applies_coefficient() {
        let item = OverlayItem::new(ItemKind::Stationary(Anchor::Top), "hi", 1000);
        assert_eq!(item.duration_ms, 5000);
        assert_eq!(item.window(1.0), (1000.0, 6000.0));
        assert_eq!(item.window(0.5), (1000.0, 3500.0));
    }

    #[test]
    fn test_window_is_inclusive() {
        let item = OverlayItem::new(ItemKind::Moving(Direction::RightToLeft), "hi", 100)
            .with_duration(1000);
        assert!(!item.is_active(99.9, 1.0));
        assert!(item.is_active(100.0, 1.0));
        assert!(item.is_active(1100.0, 1.0));
        assert!(!item.is_active(1100.1, 1.0));
    }

    #[test]
    fn test_progress() {
        let item = OverlayItem::new(ItemKind::Moving(Direction::LeftToRight), "hi", 0);
        assert!((item.progress(5000.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((item.progress(5000.0, 2.0) - 0.25).abs() < 1e-6);
        let instant = item.clone().with_duration(0);
        assert_eq!(instant.progress(0.0, 1.0), 1.0);
    }

    #[test]
    fn test_lines_split() {
        let item = OverlayItem::new(ItemKind::Stationary(Anchor::Bottom), "a/nb/nc", 0)
            .with_lines_split_on("/n");
        assert_eq!(item.text_lines(), vec!["a", "b", "c"]);

        let single = OverlayItem::new(ItemKind::Stationary(Anchor::Bottom), "abc", 0)
            .with_lines_split_on("/n");
        assert!(single.lines.is_none());
        assert_eq!(single.text_lines(), vec!["abc"]);
    }

    #[test]
    fn test_color_components() {
        let c = Color::argb(0x80, 0x10, 0x20, 0x30);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.to_rgba(), [0x10, 0x20, 0x30, 0x80]);
        assert!(Color::TRANSPARENT.is_transparent());
        assert!(!Color::rgb(1, 2, 3).is_transparent());
    }
}
