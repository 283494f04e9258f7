//! Screen-space rectangles shared by the store, the engine and the platform layer.
//!
//! Coordinates are logical pixels with the origin at the top-left of the primary
//! display and y growing downwards, which is the space both the window server and
//! the accessibility API report in.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Size { width, height } }
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rect { left, top, width, height }
    }

    pub fn right(&self) -> f64 { self.left + self.width }

    pub fn bottom(&self) -> f64 { self.top + self.height }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// A rectangle with no usable area. Consumers treat these as "no zone".
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Rect { left: self.left + dx, top: self.top + dy, ..*self }
    }

    /// Floors width and height at `min`, keeping the origin where it is.
    pub fn with_min_size(&self, min: Size) -> Self {
        Rect {
            width: self.width.max(min.width),
            height: self.height.max(min.height),
            ..*self
        }
    }

    /// Resolves a fractional rectangle (each component in 0..=1) against `area`.
    pub fn fraction_of(area: Rect, fx: f64, fy: f64, fw: f64, fh: f64) -> Self {
        Rect {
            left: area.left + area.width * fx,
            top: area.top + area.height * fy,
            width: area.width * fw,
            height: area.height * fh,
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let left = f64::max(self.left, other.left);
        let right = f64::min(self.right(), other.right());
        let top = f64::max(self.top, other.top);
        let bottom = f64::min(self.bottom(), other.bottom());
        Rect {
            left,
            top,
            width: f64::max(right - left, 0.),
            height: f64::max(bottom - top, 0.),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.left, self.top)
    }
}

#[cfg(target_os = "macos")]
mod cg {
    use objc2_core_foundation::CGRect;

    use super::Rect;

    impl From<CGRect> for Rect {
        fn from(r: CGRect) -> Self {
            Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height)
        }
    }
}
