//! Render loop
//!
//! One thread owns the surface provider and the [`FrameComposer`]. While
//! the player runs it renders a frame, then sleeps out the rest of the frame
//! period. Otherwise it polls for a draw-once request every idle wait.

use crate::clock::PlaybackClock;
use crate::config::PlayerConfig;
use crate::surface::{Rasterizer, Surface, SurfaceProvider};
use danmu_core::{FrameComposer, FrameRequest, FrameStats, ItemPool, MeasurementCache, Size, StyleConfig};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, trace};

/// Lifecycle state of a [`Player`](crate::Player)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerState {
    Stopped = 0,
    Running = 1,
    Paused = 2,
    Destroyed = 3,
}

impl From<u8> for PlayerState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Destroyed,
            _ => Self::Stopped,
        }
    }
}

/// State shared by the caller-facing player and the render loop
pub(crate) struct Shared {
    pub(crate) pool: ItemPool,
    pub(crate) cache: MeasurementCache,
    pub(crate) clock: PlaybackClock,
    style: RwLock<Arc<StyleConfig>>,
    state: AtomicU8,
    draw_once: AtomicBool,
    reset_showing: AtomicBool,
    debug: AtomicBool,
    showing: AtomicUsize,
    frames: AtomicU64,
}

impl Shared {
    pub(crate) fn new(clock: PlaybackClock, debug: bool) -> Self {
        Self {
            pool: ItemPool::new(),
            cache: MeasurementCache::new(),
            clock,
            style: RwLock::new(Arc::new(StyleConfig::default())),
            state: AtomicU8::new(PlayerState::Stopped as u8),
            draw_once: AtomicBool::new(false),
            reset_showing: AtomicBool::new(false),
            debug: AtomicBool::new(debug),
            showing: AtomicUsize::new(0),
            frames: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> PlayerState {
        PlayerState::from(self.state.load(Ordering::Acquire))
    }

    /// Applies `f` to the current state unless the player is destroyed.
    /// Returns whether the state changed.
    pub(crate) fn transition(&self, f: impl Fn(PlayerState) -> Option<PlayerState>) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match PlayerState::from(current) {
                    PlayerState::Destroyed => None,
                    state => f(state).map(|next| next as u8),
                }
            })
            .is_ok()
    }

    /// Marks the player destroyed. Returns `false` if it already was.
    pub(crate) fn mark_destroyed(&self) -> bool {
        self.state.swap(PlayerState::Destroyed as u8, Ordering::AcqRel)
            != PlayerState::Destroyed as u8
    }

    pub(crate) fn style(&self) -> Arc<StyleConfig> {
        Arc::clone(&self.style.read())
    }

    pub(crate) fn set_style(&self, style: StyleConfig) {
        *self.style.write() = Arc::new(style);
    }

    pub(crate) fn request_draw(&self) {
        self.draw_once.store(true, Ordering::Release);
    }

    /// Makes the next frame treat every visible item as new
    pub(crate) fn request_reset(&self) {
        self.reset_showing.store(true, Ordering::Release);
    }

    pub(crate) fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub(crate) fn showing_count(&self) -> usize {
        self.showing.load(Ordering::Relaxed)
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

/// Body of the render thread
pub(crate) fn run<P, R>(shared: Arc<Shared>, mut provider: P, rasterizer: Arc<R>, config: PlayerConfig)
where
    P: SurfaceProvider,
    R: Rasterizer<P::Frame>,
{
    let mut composer = FrameComposer::new();
    debug!("render loop started");

    loop {
        let state = shared.state();
        if state == PlayerState::Destroyed {
            break;
        }

        // Read the draw request before the reset flag; writers set them in
        // the opposite order.
        let once = shared.draw_once.swap(false, Ordering::AcqRel);
        if shared.reset_showing.swap(false, Ordering::AcqRel) {
            composer.reset();
            shared.showing.store(0, Ordering::Relaxed);
        }
        if state != PlayerState::Running && !once {
            thread::sleep(config.idle_wait);
            continue;
        }

        let started = Instant::now();
        let rendered = render_frame(&shared, &mut provider, rasterizer.as_ref(), &mut composer);
        if once && !rendered {
            // keep the request until a surface shows up
            shared.request_draw();
        }
        let elapsed = started.elapsed();
        match config.frame_period.checked_sub(elapsed) {
            Some(remaining) => thread::sleep(remaining),
            None => debug!(elapsed_ms = elapsed.as_secs_f64() * 1000.0, "slow frame"),
        }
    }

    debug!(frames = shared.frames(), "render loop exiting");
}

/// Renders and submits one frame. Returns `false` if no surface was available.
fn render_frame<P, R>(shared: &Shared, provider: &mut P, rasterizer: &R, composer: &mut FrameComposer) -> bool
where
    P: SurfaceProvider,
    R: Rasterizer<P::Frame>,
{
    let Some(mut frame) = provider.acquire() else {
        trace!("no surface available, skipping frame");
        return false;
    };
    frame.clear();

    let style = shared.style();
    let snapshot = shared.pool.snapshot();
    let surface = Size::new(frame.width() as f32, frame.height() as f32);
    let request = FrameRequest {
        time_ms: shared.clock.conducted_ms(),
        surface,
        style: &*style,
    };

    let stats = composer.compose(&request, &snapshot, &shared.cache, rasterizer, |command| {
        rasterizer.draw(&mut frame, command, &style)
    });
    shared.showing.store(composer.showing().len(), Ordering::Relaxed);

    if shared.debug.load(Ordering::Relaxed) {
        let lines = debug_lines(shared, &request, &stats, snapshot.len());
        rasterizer.draw_debug(&mut frame, &lines);
    }

    provider.submit(frame);
    shared.frames.fetch_add(1, Ordering::Relaxed);
    true
}

fn debug_lines(shared: &Shared, request: &FrameRequest<'_>, stats: &FrameStats, pool: usize) -> Vec<String> {
    vec![
        format!(
            "time: {:.0} ms  speed: {:.2}x",
            request.time_ms,
            shared.clock.speed()
        ),
        format!("surface: {}x{}", request.surface.width, request.surface.height),
        format!("showing: {}  pool: {}", stats.drawn, pool),
        format!("deferred: {}  undrawable: {}", stats.deferred, stats.undrawable),
    ]
}
