//! danmu player library
//!
//! Runs the core engine in real time: a ticker thread drives the playback
//! clock and a render thread composes frames onto host-supplied surfaces.
//! Also ships a reference software rasterizer and an offline compositor
//! that renders frames at explicit timestamps.

pub mod clock;
pub mod config;
pub mod frame_compositor;
pub mod player;
pub mod raster;
mod scheduler;
pub mod surface;

pub use clock::PlaybackClock;
pub use config::PlayerConfig;
pub use frame_compositor::FrameCompositor;
pub use player::Player;
pub use raster::{BlockRasterizer, FrameSink, ImageSurfaceProvider};
pub use scheduler::PlayerState;
pub use surface::{Rasterizer, Surface, SurfaceProvider};

/// Result type for danmu-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmu-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("danmu core error: {0}")]
    Core(#[from] danmu_core::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f64),

    #[error("Invalid frame size: {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
