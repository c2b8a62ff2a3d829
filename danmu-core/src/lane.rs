//! Lane allocation
//!
//! Lanes are numbered from 1. The allocator is rebuilt every frame: items
//! that keep their lane are recorded with [`LaneAllocator::occupy`], then
//! new items ask for a lane with [`LaneAllocator::assign`] in pool order.
//! The first lane without a colliding same-kind occupant wins.
//!
//! When covering is allowed the search continues past the last lane that
//! fits on the surface. The lane found there is a *virtual* lane: it is what
//! the item keeps while it stays visible, and [`display_lane`] folds it back
//! onto the surface.

use crate::collision::{collides, CollisionContext, Occupant};
use crate::kind::KindTag;
use std::collections::HashMap;

/// Result of a lane search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneAssignment {
    /// Virtual lane granted to the item
    Lane(u32),
    /// Every lane collides; try again next frame
    Deferred,
}

/// Folds a virtual lane onto `1..=max_lane`
pub fn display_lane(virtual_lane: u32, max_lane: u32) -> u32 {
    if max_lane == 0 || virtual_lane == 0 {
        return 0;
    }
    (virtual_lane - 1) % max_lane + 1
}

/// Per-frame lane bookkeeping
#[derive(Debug)]
pub struct LaneAllocator {
    max_lane: u32,
    allow_covering: bool,
    ctx: CollisionContext,
    lanes: HashMap<(KindTag, u32), Vec<Occupant>>,
    highest: HashMap<KindTag, u32>,
}

impl LaneAllocator {
    pub fn new(max_lane: u32, allow_covering: bool, surface_width: f32) -> Self {
        Self {
            max_lane,
            allow_covering,
            ctx: CollisionContext { surface_width },
            lanes: HashMap::new(),
            highest: HashMap::new(),
        }
    }

    pub fn max_lane(&self) -> u32 {
        self.max_lane
    }

    /// Whether a virtual lane can be shown on the current surface
    pub fn is_displayable(&self, virtual_lane: u32) -> bool {
        self.max_lane > 0 && (virtual_lane <= self.max_lane || self.allow_covering)
    }

    /// Records an item holding `lane` this frame
    pub fn occupy(&mut self, tag: KindTag, lane: u32, occupant: Occupant) {
        self.lanes.entry((tag, lane)).or_default().push(occupant);
        let highest = self.highest.entry(tag).or_insert(0);
        *highest = (*highest).max(lane);
    }

    /// Finds the first lane where `occupant` collides with nothing of its
    /// kind. Does not record the result; call [`occupy`](Self::occupy) once
    /// the item is actually drawn.
    pub fn assign(&self, tag: KindTag, occupant: &Occupant) -> LaneAssignment {
        if self.max_lane == 0 {
            return LaneAssignment::Deferred;
        }

        let last = if self.allow_covering {
            // anything above the highest occupied lane is free
            self.max_lane
                .max(self.highest.get(&tag).copied().unwrap_or(0) + 1)
        } else {
            self.max_lane
        };

        for lane in 1..=last {
            let taken = self.lanes.get(&(tag, lane)).is_some_and(|occupants| {
                occupants
                    .iter()
                    .any(|other| collides(tag, occupant, tag, other, &self.ctx))
            });
            if !taken {
                return LaneAssignment::Lane(lane);
            }
        }
        LaneAssignment::Deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(offset_ms: f64) -> Occupant {
        Occupant::new(offset_ms, 5000.0, 100.0)
    }

    #[test]
    fn test_display_lane_wraps() {
        assert_eq!(display_lane(1, 3), 1);
        assert_eq!(display_lane(3, 3), 3);
        assert_eq!(display_lane(4, 3), 1);
        assert_eq!(display_lane(7, 3), 1);
        assert_eq!(display_lane(5, 0), 0);
    }

    #[test]
    fn test_first_free_lane_wins() {
        let mut lanes = LaneAllocator::new(3, false, 1000.0);
        assert_eq!(lanes.assign(KindTag::Top, &banner(0.0)), LaneAssignment::Lane(1));
        lanes.occupy(KindTag::Top, 1, banner(0.0));
        assert_eq!(lanes.assign(KindTag::Top, &banner(0.0)), LaneAssignment::Lane(2));
        lanes.occupy(KindTag::Top, 2, banner(0.0));

        // window starting after lane 1's ends can reuse it
        assert_eq!(lanes.assign(KindTag::Top, &banner(6000.0)), LaneAssignment::Lane(1));
    }

    #[test]
    fn test_other_kinds_do_not_block() {
        let mut lanes = LaneAllocator::new(3, false, 1000.0);
        lanes.occupy(KindTag::Top, 1, banner(0.0));
        assert_eq!(lanes.assign(KindTag::Bottom, &banner(0.0)), LaneAssignment::Lane(1));
    }

    #[test]
    fn test_exhaustion_defers_without_covering() {
        let mut lanes = LaneAllocator::new(2, false, 1000.0);
        lanes.occupy(KindTag::Top, 1, banner(0.0));
        lanes.occupy(KindTag::Top, 2, banner(0.0));
        assert_eq!(lanes.assign(KindTag::Top, &banner(0.0)), LaneAssignment::Deferred);
        assert!(!lanes.is_displayable(3));
    }

    #[test]
    fn test_exhaustion_wraps_with_covering() {
        let mut lanes = LaneAllocator::new(2, true, 1000.0);
        lanes.occupy(KindTag::Top, 1, banner(0.0));
        lanes.occupy(KindTag::Top, 2, banner(0.0));
        let LaneAssignment::Lane(lane) = lanes.assign(KindTag::Top, &banner(0.0)) else {
            panic!("covering never defers");
        };
        assert_eq!(lane, 3);
        assert!(lanes.is_displayable(lane));
        assert_eq!(display_lane(lane, lanes.max_lane()), 1);

        lanes.occupy(KindTag::Top, 3, banner(0.0));
        assert_eq!(lanes.assign(KindTag::Top, &banner(0.0)), LaneAssignment::Lane(4));
    }

    #[test]
    fn test_no_lanes_on_short_surface() {
        let lanes = LaneAllocator::new(0, true, 1000.0);
        assert_eq!(lanes.assign(KindTag::Top, &banner(0.0)), LaneAssignment::Deferred);
        assert!(!lanes.is_displayable(1));
    }
}
