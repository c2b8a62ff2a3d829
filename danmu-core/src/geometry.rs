//! Plain geometry types shared by the core and the renderers

/// On-screen footprint of an item, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Size {
    /// Creates a new size
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A footprint with no area cannot be drawn
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A point in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Creates a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Creates a rectangle from its edges
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from an origin and a size
    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Bounding box of this rectangle rotated by `degrees` around its origin
    pub fn rotated(&self, degrees: f32) -> Rect {
        if degrees == 0.0 {
            return *self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (w, h) = (self.width(), self.height());
        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];

        let mut out = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (cx, cy) in corners {
            let x = self.left + cx * cos - cy * sin;
            let y = self.top + cx * sin + cy * cos;
            out.left = out.left.min(x);
            out.top = out.top.min(y);
            out.right = out.right.max(x);
            out.bottom = out.bottom.max(y);
        }
        out
    }
}
