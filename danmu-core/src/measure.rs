//! Measurement cache
//!
//! Footprints are computed by an external [`Measurer`] on first use and kept
//! per item and per [`FootprintKey`]. Nothing is recomputed proactively.

use crate::config::{FootprintKey, StyleConfig};
use crate::geometry::Size;
use crate::item::OverlayItem;
use crate::pool::{ItemHandle, ItemKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Computes the on-screen footprint of an item
pub trait Measurer {
    fn measure(&self, item: &OverlayItem, style: &StyleConfig) -> Size;
}

impl<F> Measurer for F
where
    F: Fn(&OverlayItem, &StyleConfig) -> Size,
{
    fn measure(&self, item: &OverlayItem, style: &StyleConfig) -> Size {
        self(item, style)
    }
}

struct Entry {
    // Keeps the allocation, and therefore the key, from being reused while
    // the entry exists.
    item: Weak<OverlayItem>,
    key: FootprintKey,
    size: Size,
}

/// Hit/miss counters of a [`MeasurementCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Identity-keyed footprint cache
#[derive(Default)]
pub struct MeasurementCache {
    entries: Mutex<HashMap<ItemKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MeasurementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the footprint of `item` under `style`, measuring on a miss
    pub fn measure<M>(&self, item: &ItemHandle, style: &StyleConfig, measurer: &M) -> Size
    where
        M: Measurer + ?Sized,
    {
        let key = ItemKey::of(item);
        let footprint_key = style.footprint_key();

        if let Some(entry) = self.entries.lock().get(&key) {
            if entry.key == footprint_key {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return entry.size;
            }
        }

        // Measured outside the lock; the measurer may be slow.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let size = measurer.measure(item, style);
        self.entries.lock().insert(
            key,
            Entry {
                item: Arc::downgrade(item),
                key: footprint_key,
                size,
            },
        );
        size
    }

    /// Returns the cached footprint without measuring
    pub fn get(&self, item: &ItemHandle, style: &StyleConfig) -> Option<Size> {
        let entries = self.entries.lock();
        let entry = entries.get(&ItemKey::of(item))?;
        (entry.key == style.footprint_key()).then_some(entry.size)
    }

    /// Forgets the footprint of one item
    pub fn invalidate(&self, item: &ItemHandle) -> bool {
        self.entries.lock().remove(&ItemKey::of(item)).is_some()
    }

    /// Forgets every footprint
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drops entries whose item no longer exists. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.item.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for MeasurementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementCache")
            .field("stats", &self.stats())
            .finish()
    }
}
