//! Plain screen-space geometry shared by the directory and the session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// Axis-aligned rectangle in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// Half-open containment: the origin edge is inside, the far edge is not,
    /// so a point on the border between two adjacent screens belongs to one.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x < self.max_x()
            && point.y >= self.origin.y
            && point.y < self.max_y()
    }

    /// Origin that centres a box of `size` inside this rectangle.
    ///
    /// A box larger than the rectangle ends up with an origin before ours,
    /// overhanging equally on both sides.
    pub fn centered_origin(&self, size: Size) -> Point {
        Point::new(
            self.origin.x + (self.size.width - size.width) / 2.0,
            self.origin.y + (self.size.height - size.height) / 2.0,
        )
    }

    pub fn center(&self) -> Point {
        self.centered_origin(Size::default())
    }
}
