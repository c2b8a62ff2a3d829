//! Style configuration shared by every item on a surface

use crate::blocker::BlockerSet;
use crate::item::Color;

/// Typeface family requested from the rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Typeface {
    #[default]
    Default,
    DefaultBold,
    SansSerif,
    Serif,
    Monospace,
}

/// How text is decorated
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrawMode {
    #[default]
    Plain,
    Shadow {
        radius: f32,
        dx: f32,
        dy: f32,
        color: Color,
    },
}

impl DrawMode {
    /// Shadow with the stock parameters
    pub fn shadow() -> Self {
        Self::Shadow {
            radius: 5.0,
            dx: 0.0,
            dy: 0.0,
            color: Color::DARK_GRAY,
        }
    }
}

/// The fields of a [`StyleConfig`] that change an item's measured footprint.
///
/// Measurements are cached per key, so publishing a config with a different
/// key makes every cached measurement stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FootprintKey {
    text_size_coefficient: u32,
    typeface: Typeface,
    /// Bits of the shadow radius and offsets, `None` when drawing plain
    shadow: Option<[u32; 3]>,
}

/// Configuration snapshot used for one frame
#[derive(Debug, Clone)]
pub struct StyleConfig {
    pub typeface: Typeface,
    /// Multiplier applied to every item's duration
    pub duration_coefficient: f32,
    /// Multiplier applied to every item's text size
    pub text_size_coefficient: f32,
    /// Lane height in pixels
    pub lane_height: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub draw_mode: DrawMode,
    /// Wrap laned items onto occupied lanes instead of deferring them
    pub allow_covering: bool,
    pub blockers: BlockerSet,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            typeface: Typeface::Default,
            duration_coefficient: 1.0,
            text_size_coefficient: 1.0,
            lane_height: 40,
            margin_top: 0,
            margin_bottom: 0,
            draw_mode: DrawMode::Plain,
            allow_covering: false,
            blockers: BlockerSet::new(),
        }
    }
}

impl StyleConfig {
    pub fn builder() -> StyleConfigBuilder {
        StyleConfigBuilder::default()
    }

    /// Builder seeded with this configuration
    pub fn to_builder(&self) -> StyleConfigBuilder {
        StyleConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn footprint_key(&self) -> FootprintKey {
        FootprintKey {
            text_size_coefficient: self.text_size_coefficient.to_bits(),
            typeface: self.typeface,
            shadow: match self.draw_mode {
                DrawMode::Plain => None,
                DrawMode::Shadow { radius, dx, dy, .. } => {
                    Some([radius.to_bits(), dx.to_bits(), dy.to_bits()])
                }
            },
        }
    }

    /// Number of lanes that fit on a surface of the given height.
    ///
    /// Zero means nothing laned can be drawn.
    pub fn max_lane(&self, surface_height: u32) -> u32 {
        if self.lane_height == 0 {
            return 0;
        }
        surface_height
            .saturating_sub(self.margin_top)
            .saturating_sub(self.margin_bottom)
            / self.lane_height
    }
}

/// Builder for [`StyleConfig`]
#[derive(Debug, Clone, Default)]
pub struct StyleConfigBuilder {
    config: StyleConfig,
}

impl StyleConfigBuilder {
    pub fn typeface(mut self, typeface: Typeface) -> Self {
        self.config.typeface = typeface;
        self
    }

    pub fn duration_coefficient(mut self, coefficient: f32) -> Self {
        self.config.duration_coefficient = coefficient;
        self
    }

    pub fn text_size_coefficient(mut self, coefficient: f32) -> Self {
        self.config.text_size_coefficient = coefficient;
        self
    }

    pub fn lane_height(mut self, lane_height: u32) -> Self {
        self.config.lane_height = lane_height;
        self
    }

    pub fn margins(mut self, top: u32, bottom: u32) -> Self {
        self.config.margin_top = top;
        self.config.margin_bottom = bottom;
        self
    }

    pub fn draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.config.draw_mode = draw_mode;
        self
    }

    pub fn allow_covering(mut self, allow: bool) -> Self {
        self.config.allow_covering = allow;
        self
    }

    pub fn blockers(mut self, blockers: BlockerSet) -> Self {
        self.config.blockers = blockers;
        self
    }

    pub fn build(self) -> StyleConfig {
        self.config
    }
}

/// Serializable form of a [`StyleConfig`], as stored in settings files.
///
/// Custom blockers cannot be serialized; keyword blocking is the only blocker
/// expressible here.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub typeface: Typeface,
    pub duration_coefficient: f32,
    pub text_size_coefficient: f32,
    pub lane_height: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub draw_mode: DrawMode,
    pub allow_covering: bool,
    pub blocked_keywords: Vec<String>,
}

#[cfg(feature = "serde")]
impl Default for StyleSettings {
    fn default() -> Self {
        let config = StyleConfig::default();
        Self {
            typeface: config.typeface,
            duration_coefficient: config.duration_coefficient,
            text_size_coefficient: config.text_size_coefficient,
            lane_height: config.lane_height,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
            draw_mode: config.draw_mode,
            allow_covering: config.allow_covering,
            blocked_keywords: Vec::new(),
        }
    }
}

#[cfg(feature = "serde")]
impl StyleSettings {
    /// Parses settings from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_config(self) -> StyleConfig {
        let mut blockers = BlockerSet::new();
        if !self.blocked_keywords.is_empty() {
            blockers.push(crate::blocker::KeywordBlocker::new(&self.blocked_keywords));
        }
        StyleConfig {
            typeface: self.typeface,
            duration_coefficient: self.duration_coefficient,
            text_size_coefficient: self.text_size_coefficient,
            lane_height: self.lane_height,
            margin_top: self.margin_top,
            margin_bottom: self.margin_bottom,
            draw_mode: self.draw_mode,
            allow_covering: self.allow_covering,
            blockers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_lane() {
        let config = StyleConfig::builder().lane_height(40).margins(10, 30).build();
        assert_eq!(config.max_lane(160), 3);
        assert_eq!(config.max_lane(159), 2);
        assert_eq!(config.max_lane(20), 0);

        let zero = StyleConfig::builder().lane_height(0).build();
        assert_eq!(zero.max_lane(1000), 0);
    }

    #[test]
    fn test_footprint_key_tracks_size_fields_only() {
        let base = StyleConfig::default();
        let longer = base.to_builder().duration_coefficient(2.0).lane_height(80).build();
        assert_eq!(base.footprint_key(), longer.footprint_key());

        let bigger = base.to_builder().text_size_coefficient(1.5).build();
        assert_ne!(base.footprint_key(), bigger.footprint_key());

        let bold = base.to_builder().typeface(Typeface::DefaultBold).build();
        assert_ne!(base.footprint_key(), bold.footprint_key());

        let shadowed = base.to_builder().draw_mode(DrawMode::shadow()).build();
        assert_ne!(base.footprint_key(), shadowed.footprint_key());
    }

    #[test]
    fn test_footprint_key_tracks_shadow_geometry() {
        let shadow = |radius: f32, color: Color| {
            StyleConfig::builder()
                .draw_mode(DrawMode::Shadow {
                    radius,
                    dx: 0.0,
                    dy: 0.0,
                    color,
                })
                .build()
                .footprint_key()
        };
        assert_ne!(shadow(2.0, Color::DARK_GRAY), shadow(40.0, Color::DARK_GRAY));
        // color does not change the footprint
        assert_eq!(shadow(2.0, Color::DARK_GRAY), shadow(2.0, Color::WHITE));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_from_json() {
        let settings = StyleSettings::from_json(
            r#"{"lane_height": 32, "allow_covering": true, "blocked_keywords": ["spam"]}"#,
        )
        .unwrap();
        assert_eq!(settings.lane_height, 32);
        assert_eq!(settings.duration_coefficient, 1.0);

        let config = settings.into_config();
        assert!(config.allow_covering);
        assert_eq!(config.blockers.len(), 1);
    }
}
