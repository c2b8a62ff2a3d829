//! Caller-facing player
//!
//! [`Player`] owns the ticker and render threads. Every method may be called
//! from any thread; none of them block on a frame. After
//! [`destroy`](Player::destroy) every operation is a no-op.

use crate::clock::PlaybackClock;
use crate::config::PlayerConfig;
use crate::scheduler::{self, PlayerState, Shared};
use crate::surface::{Rasterizer, SurfaceProvider};
use crate::{Error, Result};
use danmu_core::{ItemHandle, Measurer, OverlayItem, Parser, StyleConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Real-time overlay player
pub struct Player {
    shared: Arc<Shared>,
    /// Released on destroy, together with the render thread's handle
    measurer: Mutex<Option<Arc<dyn Measurer + Send + Sync>>>,
    render: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Starts the ticker and render threads. The player starts stopped with
    /// an empty pool.
    pub fn spawn<P, R>(provider: P, rasterizer: R, config: PlayerConfig) -> Result<Self>
    where
        P: SurfaceProvider,
        R: Rasterizer<P::Frame> + 'static,
    {
        let clock = PlaybackClock::spawn(config.tick_period)?;
        let shared = Arc::new(Shared::new(clock, config.debug));
        let rasterizer = Arc::new(rasterizer);

        let render_shared = Arc::clone(&shared);
        let render_rasterizer = Arc::clone(&rasterizer);
        let render = thread::Builder::new()
            .name("danmu-render".into())
            .spawn(move || scheduler::run(render_shared, provider, render_rasterizer, config))
            .map_err(|source| Error::Spawn {
                name: "render",
                source,
            })?;

        Ok(Self {
            shared,
            measurer: Mutex::new(Some(rasterizer)),
            render: Mutex::new(Some(render)),
        })
    }

    /// Replaces the pool with the parser's items. Pauses, rewinds to zero
    /// and drops every cached measurement. Returns how many items were
    /// loaded.
    pub fn load<P>(&self, parser: &mut P) -> Result<usize>
    where
        P: Parser + ?Sized,
    {
        if self.is_destroyed() {
            return Ok(0);
        }
        let items = parser.parse()?;
        let count = items.len();

        self.shared.clock.pause();
        self.shared.transition(|state| {
            (state == PlayerState::Running).then_some(PlayerState::Paused)
        });
        self.shared.pool.replace(items);
        self.shared.cache.clear();
        self.shared.clock.seek(Duration::ZERO);
        self.shared.request_reset();
        self.shared.request_draw();

        info!(items = count, "loaded track");
        Ok(count)
    }

    /// Adds one item at the end of the pool
    pub fn add(&self, item: OverlayItem) -> Option<ItemHandle> {
        if self.is_destroyed() {
            return None;
        }
        Some(self.shared.pool.add(item))
    }

    /// Adds items at the end of the pool, in order
    pub fn add_all(&self, items: impl IntoIterator<Item = OverlayItem>) -> usize {
        if self.is_destroyed() {
            return 0;
        }
        self.shared.pool.add_all(items)
    }

    /// Removes an item by identity
    pub fn remove(&self, item: &ItemHandle) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.shared.cache.invalidate(item);
        self.shared.pool.remove(item)
    }

    /// Empties the pool
    pub fn clear(&self) {
        if self.is_destroyed() {
            return;
        }
        self.shared.pool.clear();
        self.shared.cache.clear();
        self.shared.request_reset();
        self.shared.request_draw();
    }

    /// Starts playing from `offset`
    pub fn start(&self, offset: Duration) {
        if self.is_destroyed() {
            return;
        }
        self.shared.clock.seek(offset);
        self.shared.clock.resume();
        self.shared.transition(|_| Some(PlayerState::Running));
        info!(offset_ms = offset.as_millis() as u64, "playback started");
    }

    /// Freezes conducted time. Idempotent.
    pub fn pause(&self) {
        if self.is_destroyed() {
            return;
        }
        self.shared.clock.pause();
        if self.shared.transition(|state| {
            (state == PlayerState::Running).then_some(PlayerState::Paused)
        }) {
            debug!(conducted_ms = self.shared.clock.conducted_ms(), "paused");
        }
    }

    /// Continues from the current position. Idempotent.
    pub fn resume(&self) {
        if self.is_destroyed() {
            return;
        }
        self.shared.clock.resume();
        if self.shared.transition(|state| {
            (state != PlayerState::Running).then_some(PlayerState::Running)
        }) {
            debug!(conducted_ms = self.shared.clock.conducted_ms(), "resumed");
        }
    }

    /// Pauses, rewinds to zero and clears the surface of old items
    pub fn stop(&self) {
        if self.is_destroyed() {
            return;
        }
        self.shared.clock.pause();
        self.shared.clock.seek(Duration::ZERO);
        self.shared.transition(|_| Some(PlayerState::Stopped));
        self.shared.request_reset();
        self.shared.request_draw();
        info!("playback stopped");
    }

    /// Jumps to `position`. A paused player redraws once at the new position.
    pub fn seek(&self, position: Duration) {
        if self.is_destroyed() {
            return;
        }
        self.shared.clock.seek(position);
        self.shared.request_draw();
        debug!(position_ms = position.as_millis() as u64, "seek");
    }

    /// Sets the playback rate. Negative and non-finite rates are rejected.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        if let Err(e) = self.shared.clock.set_speed(speed) {
            warn!(speed, "rejected playback speed");
            return Err(e);
        }
        debug!(speed, "speed changed");
        Ok(())
    }

    /// Stops both threads and waits for them. Later calls do nothing.
    pub fn destroy(&self) {
        if !self.shared.mark_destroyed() {
            return;
        }
        self.shared.clock.destroy();
        if let Some(handle) = self.render.lock().take() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
        }
        self.measurer.lock().take();
        info!(frames = self.shared.frames(), "player destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state() == PlayerState::Destroyed
    }

    /// Current conducted time
    pub fn conducted_time(&self) -> Duration {
        self.shared.clock.conducted_time()
    }

    /// Requests one frame even while paused or stopped
    pub fn draw_once(&self) {
        if self.is_destroyed() {
            return;
        }
        self.shared.request_draw();
    }

    /// Publishes a new style. Takes effect from the next frame.
    pub fn set_config(&self, config: StyleConfig) {
        if self.is_destroyed() {
            return;
        }
        self.shared.set_style(config);
        self.shared.request_draw();
    }

    /// Current style
    pub fn config(&self) -> Arc<StyleConfig> {
        self.shared.style()
    }

    /// Toggles the diagnostic overlay
    pub fn set_debug(&self, debug: bool) {
        if self.is_destroyed() {
            return;
        }
        self.shared.set_debug(debug);
        self.shared.request_draw();
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    pub fn speed(&self) -> f64 {
        self.shared.clock.speed()
    }

    /// Items on screen in the last rendered frame
    pub fn showing_count(&self) -> usize {
        self.shared.showing_count()
    }

    /// Items in the pool
    pub fn item_count(&self) -> usize {
        self.shared.pool.len()
    }

    /// Frames submitted so far
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames()
    }

    /// Measures every item in the pool ahead of playback. With `refresh`
    /// the cache is emptied first. Returns how many footprints were newly
    /// built; items already cached under the current style are not counted.
    pub fn warm_cache(&self, refresh: bool) -> usize {
        if self.is_destroyed() {
            return 0;
        }
        let Some(measurer) = self.measurer.lock().clone() else {
            return 0;
        };
        if refresh {
            self.shared.cache.clear();
        }

        let started = Instant::now();
        let style = self.shared.style();
        let snapshot = self.shared.pool.snapshot();
        let mut built = 0;
        for item in snapshot.iter() {
            if self.shared.cache.get(item, &style).is_none() {
                self.shared.cache.measure(item, &style, measurer.as_ref());
                built += 1;
            }
        }

        info!(
            built,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "measurement cache warmed"
        );
        built
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state())
            .field("conducted_time", &self.conducted_time())
            .field("items", &self.item_count())
            .finish_non_exhaustive()
    }
}
