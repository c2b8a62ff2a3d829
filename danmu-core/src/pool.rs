//! Shared item pool
//!
//! Callers add and remove items from any thread while the render loop reads
//! the pool once per frame. Readers take a snapshot (an `Arc` clone of the
//! current vector); writers copy the vector only when a snapshot is still
//! alive.

use crate::item::OverlayItem;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a pooled item
pub type ItemHandle = Arc<OverlayItem>;

/// Identity of a pooled item, derived from its allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(usize);

impl ItemKey {
    pub fn of(item: &ItemHandle) -> Self {
        Self(Arc::as_ptr(item) as usize)
    }
}

/// Immutable view of the pool taken at one instant
pub type PoolSnapshot = Arc<Vec<ItemHandle>>;

/// Ordered, concurrently accessible collection of items
#[derive(Debug, Default)]
pub struct ItemPool {
    items: RwLock<PoolSnapshot>,
}

impl ItemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool holding the given items, in order
    pub fn from_items(items: impl IntoIterator<Item = OverlayItem>) -> Self {
        let pool = Self::new();
        pool.add_all(items);
        pool
    }

    /// Adds an item at the end of the pool and returns its handle
    pub fn add(&self, item: OverlayItem) -> ItemHandle {
        let handle = Arc::new(item);
        self.add_shared(Arc::clone(&handle));
        handle
    }

    /// Adds an item that is already shared
    pub fn add_shared(&self, handle: ItemHandle) {
        let mut items = self.items.write();
        Arc::make_mut(&mut items).push(handle);
    }

    /// Adds several items, returning how many were added
    pub fn add_all(&self, items: impl IntoIterator<Item = OverlayItem>) -> usize {
        let mut guard = self.items.write();
        let vec = Arc::make_mut(&mut guard);
        let before = vec.len();
        vec.extend(items.into_iter().map(Arc::new));
        vec.len() - before
    }

    /// Removes an item by identity. Returns false if it was not pooled.
    pub fn remove(&self, handle: &ItemHandle) -> bool {
        let mut guard = self.items.write();
        let Some(index) = guard.iter().position(|h| Arc::ptr_eq(h, handle)) else {
            return false;
        };
        Arc::make_mut(&mut guard).remove(index);
        true
    }

    /// Empties the pool, returning what it held
    pub fn clear(&self) -> PoolSnapshot {
        std::mem::take(&mut *self.items.write())
    }

    /// Swaps in a new set of items atomically, returning the old set
    pub fn replace(&self, items: Vec<OverlayItem>) -> PoolSnapshot {
        let fresh: PoolSnapshot = Arc::new(items.into_iter().map(Arc::new).collect());
        std::mem::replace(&mut *self.items.write(), fresh)
    }

    /// Current contents; later writes do not affect the returned snapshot
    pub fn snapshot(&self) -> PoolSnapshot {
        Arc::clone(&self.items.read())
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
