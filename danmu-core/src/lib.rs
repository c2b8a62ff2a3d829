//! danmu core library
//!
//! Platform-independent logic of the overlay engine: the item model, lane
//! allocation, collision prediction, placement, the measurement cache and the
//! per-frame visible-set computation, plus the DMK binary track format.
//!
//! Nothing in this crate spawns threads or touches a surface; the player
//! crate drives it from its render loop.

pub mod blocker;
pub mod collision;
pub mod compose;
pub mod config;
pub mod geometry;
pub mod item;
pub mod kind;
pub mod lane;
pub mod layout;
pub mod measure;
pub mod parser;
pub mod pool;
pub mod track;

pub use blocker::{Blocker, BlockerSet, KeywordBlocker, KindBlocker};
pub use compose::{DrawCommand, FrameComposer, FrameRequest, FrameStats, ShowingInfo};
#[cfg(feature = "serde")]
pub use config::StyleSettings;
pub use config::{DrawMode, StyleConfig, StyleConfigBuilder, Typeface};
pub use geometry::{Point, Rect, Size};
pub use item::{Color, ItemStyle, OverlayItem};
pub use kind::{Anchor, Direction, ItemKind, Keyframe, KindTag, Motion};
pub use layout::Placement;
pub use measure::{CacheStats, MeasurementCache, Measurer};
#[cfg(feature = "serde")]
pub use parser::JsonParser;
pub use parser::{EmptyParser, ItemsParser, Parser, TrackParser};
pub use pool::{ItemHandle, ItemKey, ItemPool, PoolSnapshot};
pub use track::{Track, TrackHeader};

/// Result type for danmu-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmu-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes, expected 'DMK\\0'")]
    InvalidMagic,

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid item kind: {0}")]
    InvalidKind(u8),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
