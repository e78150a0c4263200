//! Plane geometry used by the physics : a floating point [`Vec2`] and an integer, axis-aligned [`Rect`].
//!
//! Both use screen coordinates : the origin is the top left corner of the field and `y` grows downwards.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub};

/// A 2D vector of `f64`s, used for ball centers and directions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector with the given heading.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(f64::cos(angle), f64::sin(angle))
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        f64::hypot(self.x, self.y)
    }

    /// Heading in radians in `(-PI, PI]`, measured from the positive `x` axis towards the positive `y` axis.
    pub fn angle(self) -> f64 {
        f64::atan2(self.y, self.x)
    }

    /// Scale to unit length. The zero vector stays zero instead of turning into NaNs.
    pub fn normalized(self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            Self::new(self.x / norm, self.y / norm)
        } else {
            Self::ZERO
        }
    }

    /// Same heading with the given length. Zero stays zero.
    pub fn with_norm(self, norm: f64) -> Self {
        self.normalized() * norm
    }

    /// Rotate by `angle` radians, from the positive `x` axis towards the positive `y` axis.
    pub fn rotated(self, angle: f64) -> Self {
        let (sin, cos) = f64::sin_cos(angle);
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Integer axis-aligned rectangle. `right` and `bottom` are exclusive : a rectangle at `left = 0` of width `10`
/// covers the columns `0..10`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle of the given size whose center is the given point, rounded to the pixel grid.
    pub fn centered_at(center: Vec2, width: i32, height: i32) -> Self {
        Self::new(
            (center.x - width as f64 / 2.0).round() as i32,
            (center.y - height as f64 / 2.0).round() as i32,
            width,
            height,
        )
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.left as f64 + self.width as f64 / 2.0,
            self.top as f64 + self.height as f64 / 2.0,
        )
    }

    /// Whether both rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    const BIAS: f64 = 1.0e-9;

    #[test]
    fn normalize_keeps_heading_and_handles_zero() {
        let v = Vec2::new(3.0, -4.0);
        assert!((v.norm() - 5.0).abs() < BIAS);
        let n = v.normalized();
        assert!((n.norm() - 1.0).abs() < BIAS);
        assert!((n.angle() - v.angle()).abs() < BIAS);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        assert_eq!(Vec2::ZERO.with_norm(12.0), Vec2::ZERO);
    }

    #[test]
    fn rotation_turns_towards_positive_y() {
        let v = Vec2::new(1.0, 0.0).rotated(FRAC_PI_2);
        assert!(v.x.abs() < BIAS && (v.y - 1.0).abs() < BIAS);
        let back = v.rotated(-FRAC_PI_2);
        assert!((back.x - 1.0).abs() < BIAS && back.y.abs() < BIAS);
        assert!((Vec2::from_angle(PI).angle().abs() - PI).abs() < BIAS);
    }

    #[test]
    fn rect_geometry() {
        let r = Rect::centered_at(Vec2::new(400.0, 300.0), 10, 10);
        assert_eq!(r, Rect::new(395, 295, 10, 10));
        assert_eq!(r.right(), 405);
        assert_eq!(r.bottom(), 305);
        assert_eq!(r.center(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersects(&Rect::new(9, 9, 5, 5)));
        assert!(!a.intersects(&Rect::new(10, 0, 5, 5)));
        assert!(!a.intersects(&Rect::new(0, 10, 5, 5)));
        assert!(!a.intersects(&Rect::new(2, 2, 0, 5)));
    }
}
