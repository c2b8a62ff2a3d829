//! Collision predicates for items sharing a lane
//!
//! Both predicates take the two items' timing and footprint width and answer
//! whether they would ever overlap on screen if given the same lane. Only
//! items of the same concrete kind are ever compared; see [`collides`].

use crate::kind::KindTag;

/// What the predicates need to know about a laned item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    /// Start of the visible window, ms
    pub offset_ms: f64,
    /// Duration after the coefficient, ms
    pub duration_ms: f64,
    /// Footprint width, px
    pub width: f32,
}

impl Occupant {
    pub fn new(offset_ms: f64, duration_ms: f64, width: f32) -> Self {
        Self {
            offset_ms,
            duration_ms,
            width,
        }
    }

    fn end_ms(&self) -> f64 {
        self.offset_ms + self.duration_ms
    }

    /// Horizontal speed in px/ms needed to cross a surface of `surface_width`
    /// entirely within the item's lifetime
    fn speed(&self, surface_width: f64) -> Option<f64> {
        (self.duration_ms > 0.0).then(|| (surface_width + self.width as f64) / self.duration_ms)
    }

    /// Time at which the item has fully entered the surface
    fn fully_entered_ms(&self, speed: f64) -> f64 {
        self.offset_ms + self.width as f64 / speed
    }
}

/// Surface parameters the predicates depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContext {
    pub surface_width: f32,
}

/// Signature shared by the per-kind predicates
pub type CollisionFn = fn(&Occupant, &Occupant, &CollisionContext) -> bool;

/// Dispatches to the predicate of the concrete kind. Items of different
/// kinds never collide, nor do kinds without lanes.
pub fn collides(
    tag_a: KindTag,
    a: &Occupant,
    tag_b: KindTag,
    b: &Occupant,
    ctx: &CollisionContext,
) -> bool {
    if tag_a != tag_b {
        return false;
    }
    tag_a
        .behavior()
        .collides
        .is_some_and(|predicate| predicate(a, b, ctx))
}

/// Stationary items collide when their visible windows intersect
pub fn stationary_collides(a: &Occupant, b: &Occupant, _ctx: &CollisionContext) -> bool {
    let within = |t: f64, o: &Occupant| t >= o.offset_ms && t <= o.end_ms();
    within(a.offset_ms, b) || within(b.offset_ms, a)
}

/// Moving items collide when a trailing item would catch up with the one
/// ahead of it before either leaves the surface
pub fn moving_collides(a: &Occupant, b: &Occupant, ctx: &CollisionContext) -> bool {
    if a.offset_ms == b.offset_ms {
        return true;
    }
    if a.width <= 0.0 || b.width <= 0.0 {
        return false;
    }

    let surface_width = ctx.surface_width as f64;
    let (Some(speed_a), Some(speed_b)) = (a.speed(surface_width), b.speed(surface_width)) else {
        return false;
    };

    // One spawns while the other is still entering
    if a.offset_ms >= b.offset_ms && a.offset_ms <= b.fully_entered_ms(speed_b) {
        return true;
    }
    if b.offset_ms >= a.offset_ms && b.offset_ms <= a.fully_entered_ms(speed_a) {
        return true;
    }

    if speed_a == speed_b {
        return false;
    }

    catches_up(a, speed_a, b, speed_b, surface_width)
        || catches_up(b, speed_b, a, speed_a, surface_width)
}

/// Whether `trailing`, spawned after `leading` has fully entered, reaches
/// the tail of `leading` while still on screen
fn catches_up(
    trailing: &Occupant,
    trailing_speed: f64,
    leading: &Occupant,
    leading_speed: f64,
    surface_width: f64,
) -> bool {
    let gap = leading_speed * (trailing.offset_ms - leading.offset_ms) - leading.width as f64;
    if gap <= 0.0 {
        return false;
    }
    let t = gap / (trailing_speed - leading_speed);
    (0.0..=surface_width / trailing_speed).contains(&t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: CollisionContext = CollisionContext {
        surface_width: 1000.0,
    };

    #[test]
    fn test_stationary_overlap() {
        let a = Occupant::new(0.0, 5000.0, 100.0);
        let b = Occupant::new(5000.0, 5000.0, 100.0);
        let c = Occupant::new(5000.1, 5000.0, 100.0);
        assert!(stationary_collides(&a, &b, &CTX));
        assert!(stationary_collides(&b, &a, &CTX));
        assert!(!stationary_collides(&a, &c, &CTX));
        assert!(!stationary_collides(&c, &a, &CTX));
    }

    #[test]
    fn test_moving_same_offset() {
        let a = Occupant::new(100.0, 10_000.0, 10.0);
        let b = Occupant::new(100.0, 3_000.0, 900.0);
        assert!(moving_collides(&a, &b, &CTX));
    }

    #[test]
    fn test_moving_spawn_while_entering() {
        // speed = 1200 / 10000 = 0.12 px/ms, fully entered after 1666.7 ms
        let a = Occupant::new(0.0, 10_000.0, 200.0);
        let b = Occupant::new(1600.0, 10_000.0, 200.0);
        let c = Occupant::new(1700.0, 10_000.0, 200.0);
        assert!(moving_collides(&a, &b, &CTX));
        assert!(moving_collides(&b, &a, &CTX));
        // equal speeds once fully entered never converge
        assert!(!moving_collides(&a, &c, &CTX));
    }

    #[test]
    fn test_moving_fast_follower_catches_up() {
        // leader: speed 0.12, fully in at ~1667 ms
        let leader = Occupant::new(0.0, 10_000.0, 200.0);
        // follower: speed 1100 / 2000 = 0.55 px/ms
        let follower = Occupant::new(2000.0, 2_000.0, 100.0);
        assert!(moving_collides(&follower, &leader, &CTX));
        assert!(moving_collides(&leader, &follower, &CTX));
    }

    #[test]
    fn test_moving_slow_follower_never_catches_up() {
        let leader = Occupant::new(0.0, 2_000.0, 100.0);
        let follower = Occupant::new(1000.0, 10_000.0, 200.0);
        assert!(!moving_collides(&follower, &leader, &CTX));
        assert!(!moving_collides(&leader, &follower, &CTX));
    }

    #[test]
    fn test_zero_width_never_collides_unless_simultaneous() {
        let a = Occupant::new(0.0, 10_000.0, 0.0);
        let b = Occupant::new(10.0, 10_000.0, 200.0);
        assert!(!moving_collides(&a, &b, &CTX));
        assert!(moving_collides(&a, &Occupant::new(0.0, 10_000.0, 200.0), &CTX));
    }

    #[test]
    fn test_cross_kind_never_collides() {
        let a = Occupant::new(0.0, 5000.0, 100.0);
        assert!(collides(KindTag::Top, &a, KindTag::Top, &a, &CTX));
        assert!(!collides(KindTag::Top, &a, KindTag::Bottom, &a, &CTX));
        assert!(!collides(KindTag::RightToLeft, &a, KindTag::LeftToRight, &a, &CTX));
        assert!(!collides(KindTag::FreeForm, &a, KindTag::FreeForm, &a, &CTX));
    }

    /// Left edge of a right-to-left item at `t`
    fn left_edge(o: &Occupant, t: f64, surface_width: f64) -> f64 {
        let progress = (t - o.offset_ms) / o.duration_ms;
        (surface_width + o.width as f64) * (1.0 - progress) - o.width as f64
    }

    // Deterministic xorshift so the sampled cases are reproducible.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn range(&mut self, lo: f64, hi: f64) -> f64 {
            lo + (self.next() % 10_000) as f64 / 10_000.0 * (hi - lo)
        }
    }

    #[test]
    fn test_moving_predicate_is_sound_when_sampled() {
        let surface_width = CTX.surface_width as f64;
        let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
        let mut checked = 0;

        for _ in 0..2000 {
            let a = Occupant::new(
                rng.range(0.0, 8000.0).round(),
                rng.range(1000.0, 12_000.0).round(),
                rng.range(20.0, 600.0) as f32,
            );
            let b = Occupant::new(
                rng.range(0.0, 8000.0).round(),
                rng.range(1000.0, 12_000.0).round(),
                rng.range(20.0, 600.0) as f32,
            );
            if moving_collides(&a, &b, &CTX) {
                continue;
            }
            checked += 1;

            let start = a.offset_ms.max(b.offset_ms);
            let end = a.end_ms().min(b.end_ms());
            let mut t = start;
            while t <= end {
                let (la, lb) = (left_edge(&a, t, surface_width), left_edge(&b, t, surface_width));
                // clip both spans to the surface before intersecting
                let lo = la.max(lb).max(0.0);
                let hi = (la + a.width as f64).min(lb + b.width as f64).min(surface_width);
                assert!(
                    hi - lo <= 1e-3,
                    "overlap of {} px at t={t} for {a:?} / {b:?}",
                    hi - lo
                );
                t += 5.0;
            }
        }
        assert!(checked > 100, "too few non-colliding samples: {checked}");
    }
}
