//! Player configuration

use std::time::Duration;

/// Thread timing of a [`Player`](crate::Player)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Minimum time between two rendered frames
    pub frame_period: Duration,
    /// Interval at which the clock accumulates elapsed time
    pub tick_period: Duration,
    /// Render loop poll interval while nothing needs drawing
    pub idle_wait: Duration,
    /// Draw the diagnostic overlay
    pub debug: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_millis(16),
            tick_period: Duration::from_millis(16),
            idle_wait: Duration::from_millis(1),
            debug: false,
        }
    }
}
