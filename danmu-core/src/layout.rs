//! Where an item sits on the surface for a given lane and progress

use crate::config::StyleConfig;
use crate::geometry::{Point, Rect, Size};
use crate::item::OverlayItem;
use crate::kind::{ItemKind, Keyframe, REFERENCE_HEIGHT, REFERENCE_WIDTH};

/// Surface and style the placement is computed against
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub surface: Size,
    pub style: &'a StyleConfig,
}

/// Resolved position of an item in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Top-left corner before rotation
    pub origin: Point,
    /// Degrees, clockwise around `origin`
    pub rotation: f32,
    pub alpha: u8,
}

impl Placement {
    /// Bounding rectangle of a footprint at this placement
    pub fn bounds(&self, footprint: Size) -> Rect {
        Rect::from_origin(self.origin, footprint).rotated(self.rotation)
    }
}

/// Signature shared by the per-kind placement functions. `lane` is the
/// display lane (1-based, 0 for kinds without lanes).
pub type PlaceFn = fn(&OverlayItem, u32, f32, Size, &LayoutContext<'_>) -> Placement;

/// Places `item` through the dispatch table of its kind
pub fn place(
    item: &OverlayItem,
    lane: u32,
    progress: f32,
    footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    (item.tag_kind().behavior().place)(item, lane, progress, footprint, ctx)
}

/// Top edge of a lane counted from the top margin
fn top_lane_y(lane: u32, ctx: &LayoutContext<'_>) -> f32 {
    (ctx.style.lane_height * lane.saturating_sub(1) + ctx.style.margin_top) as f32
}

fn laned(item: &OverlayItem, x: f32, y: f32) -> Placement {
    Placement {
        origin: Point::new(x, y),
        rotation: 0.0,
        alpha: item.style.alpha,
    }
}

pub(crate) fn place_top(
    item: &OverlayItem,
    lane: u32,
    _progress: f32,
    footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let x = (ctx.surface.width - footprint.width) / 2.0;
    laned(item, x, top_lane_y(lane, ctx))
}

pub(crate) fn place_bottom(
    item: &OverlayItem,
    lane: u32,
    _progress: f32,
    footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let x = (ctx.surface.width - footprint.width) / 2.0;
    let y = ctx.surface.height
        - (ctx.style.lane_height * lane) as f32
        - ctx.style.margin_bottom as f32;
    laned(item, x, y)
}

pub(crate) fn place_right_to_left(
    item: &OverlayItem,
    lane: u32,
    progress: f32,
    footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let x = (ctx.surface.width + footprint.width) * (1.0 - progress) - footprint.width;
    laned(item, x, top_lane_y(lane, ctx))
}

pub(crate) fn place_left_to_right(
    item: &OverlayItem,
    lane: u32,
    progress: f32,
    footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let x = (ctx.surface.width + footprint.width) * progress - footprint.width;
    laned(item, x, top_lane_y(lane, ctx))
}

pub(crate) fn place_free_form(
    item: &OverlayItem,
    _lane: u32,
    progress: f32,
    _footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let ItemKind::FreeForm(motion) = &item.kind else {
        return laned(item, 0.0, 0.0);
    };
    let x = lerp(motion.begin_x, motion.end_x, progress);
    let y = lerp(motion.begin_y, motion.end_y, progress);
    Placement {
        origin: Point::new(
            x / REFERENCE_WIDTH * ctx.surface.width,
            y / REFERENCE_HEIGHT * ctx.surface.height,
        ),
        rotation: motion.rotation,
        alpha: lerp_alpha(motion.begin_alpha, motion.end_alpha, progress),
    }
}

pub(crate) fn place_keyframed(
    item: &OverlayItem,
    _lane: u32,
    progress: f32,
    _footprint: Size,
    ctx: &LayoutContext<'_>,
) -> Placement {
    let ItemKind::Keyframed(frames) = &item.kind else {
        return laned(item, 0.0, 0.0);
    };
    let frame = interpolate(frames, progress);
    Placement {
        origin: Point::new(frame.x * ctx.surface.width, frame.y * ctx.surface.height),
        rotation: frame.rotation,
        alpha: frame.alpha,
    }
}

/// Blends the keyframes surrounding `progress`. Missing neighbours fall
/// back to [`Keyframe::START`] and [`Keyframe::END`].
pub fn interpolate(frames: &[Keyframe], progress: f32) -> Keyframe {
    let mut last = Keyframe::START;
    let mut next = Keyframe::END;
    for frame in frames {
        if frame.progress <= progress && frame.progress >= last.progress {
            last = *frame;
        }
        if frame.progress >= progress && frame.progress <= next.progress {
            next = *frame;
        }
    }

    let span = next.progress - last.progress;
    let fraction = if span > 0.0 {
        (progress - last.progress) / span
    } else {
        0.0
    };
    Keyframe {
        progress,
        x: lerp(last.x, next.x, fraction),
        y: lerp(last.y, next.y, fraction),
        rotation: lerp(last.rotation, next.rotation, fraction),
        alpha: lerp_alpha(last.alpha, next.alpha, fraction),
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

fn lerp_alpha(from: u8, to: u8, t: f32) -> u8 {
    lerp(from as f32, to as f32, t).round().clamp(0.0, 255.0) as u8
}
