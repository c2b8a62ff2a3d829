//! Item kinds and the per-kind behavior table
//!
//! Every item carries an [`ItemKind`]. Lane allocation, collision and
//! placement never match on the kind directly; they go through
//! [`KindTag::behavior`], a static table keyed by the concrete kind.

use crate::collision::{self, CollisionFn};
use crate::layout::{self, PlaceFn};

/// Width of the reference player space used by [`Motion`] coordinates
pub const REFERENCE_WIDTH: f32 = 682.0;
/// Height of the reference player space used by [`Motion`] coordinates
pub const REFERENCE_HEIGHT: f32 = 438.0;

/// Where a stationary item is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Anchor {
    /// Centered, lanes counted downward from the top margin
    Top,
    /// Centered, lanes counted upward from the bottom margin
    Bottom,
}

/// Scroll direction of a moving item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    RightToLeft,
    LeftToRight,
}

/// Linear motion of a free-form item, in reference player coordinates
/// ([`REFERENCE_WIDTH`] x [`REFERENCE_HEIGHT`])
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motion {
    pub begin_x: f32,
    pub begin_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub begin_alpha: u8,
    pub end_alpha: u8,
    /// Rotation in degrees around the item origin
    pub rotation: f32,
}

impl Motion {
    /// A motionless item pinned at the given reference coordinates
    pub fn fixed(x: f32, y: f32) -> Self {
        Self {
            begin_x: x,
            begin_y: y,
            end_x: x,
            end_y: y,
            begin_alpha: 255,
            end_alpha: 255,
            rotation: 0.0,
        }
    }
}

/// One frame of a keyframed item.
///
/// `x` and `y` are fractions of the surface size; `progress` is the point in
/// the item's lifetime (0..=1) the frame applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    pub progress: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub alpha: u8,
}

impl Keyframe {
    /// Implicit frame used when no keyframe precedes the current progress
    pub const START: Keyframe = Keyframe {
        progress: 0.0,
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        alpha: 255,
    };

    /// Implicit frame used when no keyframe follows the current progress
    pub const END: Keyframe = Keyframe {
        progress: 1.0,
        x: 1.0,
        y: 1.0,
        rotation: 0.0,
        alpha: 255,
    };
}

/// What an item is and how it moves
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ItemKind {
    /// Fixed banner occupying a lane for its whole lifetime
    Stationary(Anchor),
    /// Constant-velocity horizontal scroll through a lane
    Moving(Direction),
    /// Not laned; moves linearly between two points
    FreeForm(Motion),
    /// Not laned; interpolates between keyframes
    Keyframed(Vec<Keyframe>),
}

impl ItemKind {
    /// Concrete kind used for collision grouping and dispatch
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Stationary(Anchor::Top) => KindTag::Top,
            Self::Stationary(Anchor::Bottom) => KindTag::Bottom,
            Self::Moving(Direction::RightToLeft) => KindTag::RightToLeft,
            Self::Moving(Direction::LeftToRight) => KindTag::LeftToRight,
            Self::FreeForm(_) => KindTag::FreeForm,
            Self::Keyframed(_) => KindTag::Keyframed,
        }
    }

    /// Lifetime an item of this kind gets when none is given
    pub fn default_duration_ms(&self) -> u64 {
        match self {
            Self::Moving(_) => 10_000,
            _ => 5_000,
        }
    }
}

/// The concrete kind of an item. Two laned items only compete for a lane
/// when their tags are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KindTag {
    Top = 0,
    Bottom = 1,
    RightToLeft = 2,
    LeftToRight = 3,
    FreeForm = 4,
    Keyframed = 5,
}

impl KindTag {
    pub const ALL: [KindTag; 6] = [
        KindTag::Top,
        KindTag::Bottom,
        KindTag::RightToLeft,
        KindTag::LeftToRight,
        KindTag::FreeForm,
        KindTag::Keyframed,
    ];

    /// Looks up the behavior of this kind in the dispatch table
    pub fn behavior(self) -> &'static KindBehavior {
        &BEHAVIORS[self as usize]
    }

    /// Whether items of this kind go through lane allocation
    pub fn is_laned(self) -> bool {
        self.behavior().collides.is_some()
    }

    pub fn name(self) -> &'static str {
        self.behavior().name
    }
}

/// Per-kind entry of the dispatch table
#[derive(Debug)]
pub struct KindBehavior {
    pub name: &'static str,
    /// `None` for kinds that bypass lane allocation
    pub collides: Option<CollisionFn>,
    pub place: PlaceFn,
}

static BEHAVIORS: [KindBehavior; 6] = [
    KindBehavior {
        name: "top",
        collides: Some(collision::stationary_collides),
        place: layout::place_top,
    },
    KindBehavior {
        name: "bottom",
        collides: Some(collision::stationary_collides),
        place: layout::place_bottom,
    },
    KindBehavior {
        name: "right_to_left",
        collides: Some(collision::moving_collides),
        place: layout::place_right_to_left,
    },
    KindBehavior {
        name: "left_to_right",
        collides: Some(collision::moving_collides),
        place: layout::place_left_to_right,
    },
    KindBehavior {
        name: "free_form",
        collides: None,
        place: layout::place_free_form,
    },
    KindBehavior {
        name: "keyframed",
        collides: None,
        place: layout::place_keyframed,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_tag() {
        for tag in KindTag::ALL {
            let expected = match tag {
                KindTag::Top => "top",
                KindTag::Bottom => "bottom",
                KindTag::RightToLeft => "right_to_left",
                KindTag::LeftToRight => "left_to_right",
                KindTag::FreeForm => "free_form",
                KindTag::Keyframed => "keyframed",
            };
            assert_eq!(tag.name(), expected);
        }
    }

    #[test]
    fn test_laned_kinds() {
        assert!(KindTag::Top.is_laned());
        assert!(KindTag::Bottom.is_laned());
        assert!(KindTag::RightToLeft.is_laned());
        assert!(KindTag::LeftToRight.is_laned());
        assert!(!KindTag::FreeForm.is_laned());
        assert!(!KindTag::Keyframed.is_laned());
    }

    #[test]
    fn test_default_durations() {
        assert_eq!(ItemKind::Moving(Direction::RightToLeft).default_duration_ms(), 10_000);
        assert_eq!(ItemKind::Stationary(Anchor::Top).default_duration_ms(), 5_000);
        assert_eq!(ItemKind::FreeForm(Motion::fixed(0.0, 0.0)).default_duration_ms(), 5_000);
    }
}
