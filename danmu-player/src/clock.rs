//! Playback clock
//!
//! Conducted time advances on a ticker thread by the wall time elapsed
//! since the last anchor, scaled by the speed. Every change of pause state,
//! position or speed re-anchors, so conducted time is exact at those points
//! and at most one tick stale in between.

use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct Anchor {
    paused: bool,
    destroyed: bool,
    /// Wall time conducted time was last brought up to date
    last: Instant,
}

struct ClockShared {
    conducted_ns: AtomicU64,
    speed_bits: AtomicU64,
    anchor: Mutex<Anchor>,
    wake: Condvar,
}

impl ClockShared {
    fn speed(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::Acquire))
    }

    /// Adds the wall time since the anchor. Caller holds the anchor lock.
    fn advance(&self, anchor: &mut Anchor, now: Instant) {
        let elapsed = now.saturating_duration_since(anchor.last);
        anchor.last = now;
        if anchor.paused || anchor.destroyed {
            return;
        }
        let delta = (elapsed.as_nanos() as f64 * self.speed()) as u64;
        // saturates instead of wrapping past the end of representable time
        let _ = self
            .conducted_ns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |ns| {
                Some(ns.saturating_add(delta))
            });
    }
}

/// Speed-scaled, pausable media clock
pub struct PlaybackClock {
    shared: Arc<ClockShared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackClock {
    /// Starts a paused clock at zero with its ticker thread
    pub fn spawn(tick_period: Duration) -> Result<Self> {
        let shared = Arc::new(ClockShared {
            conducted_ns: AtomicU64::new(0),
            speed_bits: AtomicU64::new(1.0f64.to_bits()),
            anchor: Mutex::new(Anchor {
                paused: true,
                destroyed: false,
                last: Instant::now(),
            }),
            wake: Condvar::new(),
        });

        let ticker_shared = Arc::clone(&shared);
        let ticker = thread::Builder::new()
            .name("danmu-ticker".into())
            .spawn(move || run_ticker(&ticker_shared, tick_period))
            .map_err(|source| Error::Spawn {
                name: "ticker",
                source,
            })?;

        Ok(Self {
            shared,
            ticker: Mutex::new(Some(ticker)),
        })
    }

    /// Conducted time
    pub fn conducted_time(&self) -> Duration {
        Duration::from_nanos(self.shared.conducted_ns.load(Ordering::Acquire))
    }

    /// Conducted time in milliseconds
    pub fn conducted_ms(&self) -> f64 {
        self.shared.conducted_ns.load(Ordering::Acquire) as f64 / 1_000_000.0
    }

    pub fn speed(&self) -> f64 {
        self.shared.speed()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.anchor.lock().paused
    }

    /// Sets the playback rate from now on. Rejects negative and non-finite
    /// rates. Does nothing once destroyed.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(Error::InvalidSpeed(speed));
        }
        let mut anchor = self.shared.anchor.lock();
        if anchor.destroyed {
            return Ok(());
        }
        // time so far counts at the old rate
        self.shared.advance(&mut anchor, Instant::now());
        self.shared
            .speed_bits
            .store(speed.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Freezes conducted time. Idempotent.
    pub fn pause(&self) {
        let mut anchor = self.shared.anchor.lock();
        if anchor.paused || anchor.destroyed {
            return;
        }
        self.shared.advance(&mut anchor, Instant::now());
        anchor.paused = true;
        trace!(conducted_ms = self.conducted_ms(), "clock paused");
    }

    /// Lets conducted time advance again. Idempotent.
    pub fn resume(&self) {
        let mut anchor = self.shared.anchor.lock();
        if !anchor.paused || anchor.destroyed {
            return;
        }
        anchor.paused = false;
        anchor.last = Instant::now();
        self.shared.wake.notify_all();
        trace!(conducted_ms = self.conducted_ms(), "clock resumed");
    }

    /// Jumps to `position` without changing the pause state
    pub fn seek(&self, position: Duration) {
        let mut anchor = self.shared.anchor.lock();
        if anchor.destroyed {
            return;
        }
        anchor.last = Instant::now();
        let nanos = u64::try_from(position.as_nanos()).unwrap_or(u64::MAX);
        self.shared.conducted_ns.store(nanos, Ordering::Release);
    }

    /// Stops the ticker thread and waits for it. Later calls do nothing.
    pub fn destroy(&self) {
        {
            let mut anchor = self.shared.anchor.lock();
            self.shared.advance(&mut anchor, Instant::now());
            anchor.destroyed = true;
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.ticker.lock().take() {
            if handle.join().is_err() {
                debug!("ticker thread panicked");
            }
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.anchor.lock().destroyed
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("conducted_ms", &self.conducted_ms())
            .field("speed", &self.speed())
            .finish_non_exhaustive()
    }
}

fn run_ticker(shared: &ClockShared, tick_period: Duration) {
    let mut anchor = shared.anchor.lock();
    loop {
        if anchor.destroyed {
            break;
        }
        if anchor.paused {
            // resume() re-anchors, nothing to account for here
            shared.wake.wait(&mut anchor);
            continue;
        }
        shared.wake.wait_for(&mut anchor, tick_period);
        shared.advance(&mut anchor, Instant::now());
    }
    debug!("ticker thread exiting");
}
