//! Geometry primitives shared by the grid engine and the server-snapshot adapter.
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in display coordinates.
///
/// The engine operates entirely in floating point; rounding to integer
/// pixels is deferred to the server boundary (see [`Rect::rounded`]).
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    /// The x-coordinate of the top left corner of this rect.
    pub x: f64,
    /// The y-coordinate of the top left corner of this rect.
    pub y: f64,
    /// The width of this rect.
    pub w: f64,
    /// The height of this rect.
    pub h: f64,
}

impl Rect {
    /// Create a new [Rect].
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The center point of this rectangle as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Shrink this rect on all four sides by the given padding, clamping
    /// width/height at zero rather than going negative.
    pub fn inset(&self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        let w = (self.w - left - right).max(0.0);
        let h = (self.h - top - bottom).max(0.0);
        Self {
            x: self.x + left,
            y: self.y + top,
            w,
            h,
        }
    }

    /// Translate this rect by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Whether `self` is fully contained within `other`, within `eps`.
    pub fn contained_in(&self, other: &Rect, eps: f64) -> bool {
        self.x + eps >= other.x
            && self.y + eps >= other.y
            && self.x + self.w <= other.x + other.w + eps
            && self.y + self.h <= other.y + other.h + eps
    }

    /// The area of overlap between `self` and `other`, or `0.0` if they do
    /// not intersect.
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        let x_overlap = (self.x + self.w).min(other.x + other.w) - self.x.max(other.x);
        let y_overlap = (self.y + self.h).min(other.y + other.h) - self.y.max(other.y);

        if x_overlap > 0.0 && y_overlap > 0.0 {
            x_overlap * y_overlap
        } else {
            0.0
        }
    }

    /// Round every field to the nearest integer pixel, for handoff to the
    /// server's `updateWindow` RPC.
    pub fn rounded(&self) -> (i64, i64, i64, i64) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.w.round() as i64,
            self.h.round() as i64,
        )
    }
}

/// One of the four cardinal directions used for focus and window movement.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// The direction a window travels to undo a move in this direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(0.0, 0.0, 20.0, 20.0), true; "fully inside")]
    #[test_case(Rect::new(15.0, 0.0, 10.0, 10.0), Rect::new(0.0, 0.0, 20.0, 20.0), false; "overhangs right edge")]
    #[test]
    fn contained_in(inner: Rect, outer: Rect, expected: bool) {
        assert_eq!(inner.contained_in(&outer, 1e-6), expected);
    }

    #[test]
    fn overlap_area_of_disjoint_rects_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);

        assert_eq!(a.overlap_area(&b), 0.0);
    }

    #[test]
    fn overlap_area_of_partial_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        assert_eq!(a.overlap_area(&b), 25.0);
    }

    #[test]
    fn opposite_direction() {
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
    }
}
