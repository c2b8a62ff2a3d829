//! Per-frame visible-set computation
//!
//! [`FrameComposer`] turns a pool snapshot and a conducted time into draw
//! commands. It owns the showing set of the previous frame, which is how an
//! item that stays visible keeps its lane: lanes are looked up by item
//! identity and never recomputed while the item remains on screen.

use crate::collision::Occupant;
use crate::config::StyleConfig;
use crate::geometry::{Rect, Size};
use crate::lane::{display_lane, LaneAllocator, LaneAssignment};
use crate::layout::{self, LayoutContext, Placement};
use crate::measure::{MeasurementCache, Measurer};
use crate::pool::{ItemHandle, ItemKey};
use std::collections::HashMap;
use tracing::trace;

/// An item on screen in the last composed frame
#[derive(Debug, Clone)]
pub struct ShowingInfo {
    pub item: ItemHandle,
    /// Virtual lane, 0 for items without lanes
    pub lane: u32,
    /// Bounds reported by the rasterizer
    pub bounds: Rect,
    pub progress: f32,
}

/// Inputs of one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    /// Conducted time in milliseconds
    pub time_ms: f64,
    pub surface: Size,
    pub style: &'a StyleConfig,
}

/// One item to draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub item: &'a ItemHandle,
    /// Lane on the surface (1-based), 0 for items without lanes
    pub lane: u32,
    pub progress: f32,
    pub footprint: Size,
    pub placement: Placement,
}

/// Counters for one composed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Items within their window and not blocked
    pub visible: usize,
    /// Items that kept their lane from the previous frame
    pub continuing: usize,
    /// Items that did not fit in any lane
    pub deferred: usize,
    /// Items the rasterizer could not draw
    pub undrawable: usize,
    pub drawn: usize,
}

/// Builds each frame's showing set from the previous one
#[derive(Debug, Default)]
pub struct FrameComposer {
    showing: Vec<ShowingInfo>,
}

impl FrameComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items drawn in the last composed frame
    pub fn showing(&self) -> &[ShowingInfo] {
        &self.showing
    }

    /// Virtual lane the item held in the last composed frame
    pub fn lane_of(&self, item: &ItemHandle) -> Option<u32> {
        let key = ItemKey::of(item);
        self.showing
            .iter()
            .find(|info| ItemKey::of(&info.item) == key)
            .map(|info| info.lane)
    }

    /// Forgets the showing set; every visible item is treated as new next frame
    pub fn reset(&mut self) {
        self.showing.clear();
    }

    /// Composes one frame.
    ///
    /// `draw` is called once per item to put on screen and returns the bounds
    /// it drew, or `None` if it drew nothing; such items are left out of the
    /// showing set and retried next frame.
    pub fn compose<M, D>(
        &mut self,
        request: &FrameRequest<'_>,
        pool: &[ItemHandle],
        cache: &MeasurementCache,
        measurer: &M,
        mut draw: D,
    ) -> FrameStats
    where
        M: Measurer + ?Sized,
        D: FnMut(&DrawCommand<'_>) -> Option<Rect>,
    {
        let style = request.style;
        let coefficient = style.duration_coefficient;
        let previous: HashMap<ItemKey, u32> = self
            .showing
            .iter()
            .map(|info| (ItemKey::of(&info.item), info.lane))
            .collect();

        let max_lane = style.max_lane(request.surface.height.max(0.0) as u32);
        let mut lanes = LaneAllocator::new(max_lane, style.allow_covering, request.surface.width);
        let layout = LayoutContext {
            surface: request.surface,
            style,
        };

        let mut stats = FrameStats::default();
        let mut continuing = Vec::new();
        let mut fresh = Vec::new();
        for item in pool {
            if !item.visible
                || style.blockers.blocks(item)
                || !item.is_active(request.time_ms, coefficient)
            {
                continue;
            }
            stats.visible += 1;
            match previous.get(&ItemKey::of(item)) {
                Some(&lane) => continuing.push((item, lane)),
                None => fresh.push(item),
            }
        }

        let mut showing = Vec::with_capacity(continuing.len() + fresh.len());
        let mut put = |item: &ItemHandle,
                       lane: u32,
                       footprint: Size,
                       lanes: &mut LaneAllocator,
                       stats: &mut FrameStats| {
            let progress = item.progress(request.time_ms, coefficient);
            let shown_lane = if lane == 0 { 0 } else { display_lane(lane, max_lane) };
            let command = DrawCommand {
                item,
                lane: shown_lane,
                progress,
                footprint,
                placement: layout::place(item, shown_lane, progress, footprint, &layout),
            };
            let Some(bounds) = draw(&command) else {
                stats.undrawable += 1;
                return;
            };
            if lane > 0 {
                lanes.occupy(item.tag_kind(), lane, occupant(item, footprint, coefficient));
            }
            stats.drawn += 1;
            showing.push(ShowingInfo {
                item: ItemHandle::clone(item),
                lane,
                bounds,
                progress,
            });
        };

        // Continuing items go first so new items see all of them.
        for (item, lane) in continuing {
            if lane > 0 && !lanes.is_displayable(lane) {
                stats.deferred += 1;
                continue;
            }
            let footprint = cache.measure(item, style, measurer);
            if footprint.is_empty() {
                stats.undrawable += 1;
                continue;
            }
            stats.continuing += 1;
            put(item, lane, footprint, &mut lanes, &mut stats);
        }

        for item in fresh {
            let footprint = cache.measure(item, style, measurer);
            if footprint.is_empty() {
                stats.undrawable += 1;
                continue;
            }
            let tag = item.tag_kind();
            if !tag.is_laned() {
                put(item, 0, footprint, &mut lanes, &mut stats);
                continue;
            }
            match lanes.assign(tag, &occupant(item, footprint, coefficient)) {
                LaneAssignment::Lane(lane) => put(item, lane, footprint, &mut lanes, &mut stats),
                LaneAssignment::Deferred => stats.deferred += 1,
            }
        }

        trace!(
            time_ms = request.time_ms,
            max_lane,
            visible = stats.visible,
            drawn = stats.drawn,
            deferred = stats.deferred,
            "composed frame"
        );
        self.showing = showing;
        stats
    }
}

fn occupant(item: &ItemHandle, footprint: Size, coefficient: f32) -> Occupant {
    Occupant::new(
        item.offset_ms as f64,
        item.effective_duration(coefficient),
        footprint.width,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocker::KindBlocker;
    use crate::item::OverlayItem;
    use crate::kind::{Anchor, Direction, ItemKind, KindTag, Motion};
    use crate::pool::ItemPool;

    fn measurer(item: &OverlayItem, _: &StyleConfig) -> Size {
        Size::new(item.text.chars().count() as f32 * 20.0, 30.0)
    }

    /// Surface 1000 px wide, `lanes` lanes of 40 px
    fn request(time_ms: f64, lanes: u32, style: &StyleConfig) -> FrameRequest<'_> {
        FrameRequest {
            time_ms,
            surface: Size::new(1000.0, (lanes * 40) as f32),
            style,
        }
    }

    fn compose(
        composer: &mut FrameComposer,
        request: &FrameRequest<'_>,
        pool: &ItemPool,
        cache: &MeasurementCache,
    ) -> (FrameStats, Vec<(String, u32)>) {
        let mut drawn = Vec::new();
        let stats = composer.compose(request, &pool.snapshot(), cache, &measurer, |cmd| {
            drawn.push((cmd.item.text.clone(), cmd.lane));
            Some(cmd.placement.bounds(cmd.footprint))
        });
        (stats, drawn)
    }

    fn top(text: &str, offset_ms: u64) -> OverlayItem {
        OverlayItem::new(ItemKind::Stationary(Anchor::Top), text, offset_ms)
    }

    #[test]
    fn test_two_banners_take_consecutive_lanes() {
        let pool = ItemPool::from_items(vec![top("a", 0), top("b", 0)]);
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let (stats, drawn) = compose(&mut composer, &request(100.0, 3, &style), &pool, &cache);
        assert_eq!(drawn, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.deferred, 0);
    }

    #[test]
    fn test_lane_is_kept_while_visible() {
        let pool = ItemPool::new();
        let first = pool.add(top("first", 0));
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        compose(&mut composer, &request(100.0, 3, &style), &pool, &cache);
        assert_eq!(composer.lane_of(&first), Some(1));

        // an earlier item inserted ahead in pool order does not displace it
        pool.remove(&first);
        let early = pool.add(top("early", 0));
        pool.add_shared(ItemHandle::clone(&first));
        let (stats, _) = compose(&mut composer, &request(200.0, 3, &style), &pool, &cache);

        assert_eq!(stats.continuing, 1);
        assert_eq!(composer.lane_of(&first), Some(1));
        assert_eq!(composer.lane_of(&early), Some(2));
    }

    #[test]
    fn test_window_bounds_drawing() {
        let pool = ItemPool::from_items(vec![top("a", 1000).with_duration(1000)]);
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        for (time, expected) in [(999.0, 0), (1000.0, 1), (2000.0, 1), (2000.5, 0)] {
            let (stats, _) = compose(&mut composer, &request(time, 3, &style), &pool, &cache);
            assert_eq!(stats.drawn, expected, "at t={time}");
        }
    }

    #[test]
    fn test_exhausted_lanes_defer_then_retry() {
        let pool = ItemPool::from_items(vec![
            top("a", 0).with_duration(1000),
            top("b", 0).with_duration(5000),
            top("c", 0).with_duration(5000),
        ]);
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let (stats, drawn) = compose(&mut composer, &request(100.0, 2, &style), &pool, &cache);
        assert_eq!(stats.deferred, 1);
        assert_eq!(drawn.len(), 2);

        // "a" has expired and no longer holds lane 1
        let (stats, drawn) = compose(&mut composer, &request(1500.0, 2, &style), &pool, &cache);
        assert_eq!(drawn, vec![("b".to_string(), 2), ("c".to_string(), 1)]);
        assert_eq!(stats.deferred, 0);
    }

    #[test]
    fn test_covering_wraps_onto_surface() {
        let pool = ItemPool::from_items(vec![top("a", 0), top("b", 0), top("c", 0)]);
        let style = StyleConfig::builder().allow_covering(true).build();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let (_, drawn) = compose(&mut composer, &request(100.0, 2, &style), &pool, &cache);
        assert_eq!(
            drawn,
            vec![("a".to_string(), 1), ("b".to_string(), 2), ("c".to_string(), 1)]
        );
        assert_eq!(composer.showing()[2].lane, 3);
    }

    #[test]
    fn test_hidden_blocked_and_free_form() {
        let pool = ItemPool::from_items(vec![
            top("hidden", 0).hidden(),
            OverlayItem::new(ItemKind::Stationary(Anchor::Bottom), "blocked", 0),
            OverlayItem::new(ItemKind::FreeForm(Motion::fixed(10.0, 10.0)), "free", 0),
        ]);
        let mut blockers = crate::blocker::BlockerSet::new();
        blockers.push(KindBlocker::new([KindTag::Bottom]));
        let style = StyleConfig::builder().blockers(blockers).build();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        // free-form items are drawn even with no lanes at all
        let (stats, drawn) = compose(&mut composer, &request(100.0, 0, &style), &pool, &cache);
        assert_eq!(drawn, vec![("free".to_string(), 0)]);
        assert_eq!(stats.visible, 1);
    }

    #[test]
    fn test_undrawable_items_are_retried() {
        let pool = ItemPool::from_items(vec![
            top("", 0),
            OverlayItem::new(ItemKind::Moving(Direction::RightToLeft), "r", 0),
        ]);
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let mut refuse = true;
        let stats = composer.compose(&request(100.0, 3, &style), &pool.snapshot(), &cache, &measurer, |cmd| {
            if refuse {
                refuse = false;
                return None;
            }
            Some(cmd.placement.bounds(cmd.footprint))
        });
        // empty text has no footprint; the moving item was refused by the rasterizer
        assert_eq!(stats.undrawable, 2);
        assert!(composer.showing().is_empty());

        let (stats, drawn) = compose(&mut composer, &request(200.0, 3, &style), &pool, &cache);
        assert_eq!(stats.undrawable, 1);
        assert_eq!(drawn, vec![("r".to_string(), 1)]);
    }

    #[test]
    fn test_lanes_stay_continuous_across_frames() {
        let pool = ItemPool::new();
        for i in 0..40u64 {
            pool.add(
                OverlayItem::new(ItemKind::Moving(Direction::RightToLeft), "x".repeat(1 + (i % 7) as usize), i * 250)
                    .with_duration(4000 + (i % 5) * 500),
            );
            pool.add(top("t", i * 400).with_duration(1500));
        }
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let mut last: HashMap<ItemKey, u32> = HashMap::new();
        let mut time = 0.0;
        while time < 14_000.0 {
            compose(&mut composer, &request(time, 6, &style), &pool, &cache);
            for info in composer.showing() {
                if let Some(&lane) = last.get(&ItemKey::of(&info.item)) {
                    assert_eq!(lane, info.lane, "lane changed at t={time}");
                }
            }
            last = composer
                .showing()
                .iter()
                .map(|info| (ItemKey::of(&info.item), info.lane))
                .collect();
            time += 16.0;
        }
    }

    #[test]
    fn test_same_lane_banners_never_share_a_frame() {
        let pool = ItemPool::new();
        for i in 0..30u64 {
            pool.add(top("t", i * 300).with_duration(2000));
        }
        let style = StyleConfig::default();
        let cache = MeasurementCache::new();
        let mut composer = FrameComposer::new();

        let mut time = 0.0;
        while time < 12_000.0 {
            compose(&mut composer, &request(time, 4, &style), &pool, &cache);
            let showing = composer.showing();
            for (i, a) in showing.iter().enumerate() {
                for b in &showing[i + 1..] {
                    assert_ne!(a.lane, b.lane, "shared lane at t={time}");
                }
            }
            time += 50.0;
        }
    }
}
