use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Immutable 2D vector. Arithmetic always produces a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(value: f32) -> Self {
        Self { x: value, y: value }
    }

    pub fn add_scalar(self, value: f32) -> Self {
        Self::new(self.x + value, self.y + value)
    }

    pub fn sub_scalar(self, value: f32) -> Self {
        Self::new(self.x - value, self.y - value)
    }

    /// Component-wise product.
    pub fn mul_components(self, other: Vec2) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    pub fn min(self, other: Vec2) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Mean of the absolute components. Used as the speed metric for
    /// vessel acceleration caps; this is not the Euclidean norm.
    pub fn mean_abs(self) -> f32 {
        (self.x.abs() + self.y.abs()) * 0.5
    }

    /// Heading from `self` towards `target`, in radians.
    pub fn angle_to(self, target: Vec2) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// Unit vector pointing along `angle_radians`.
    pub fn from_angle(angle_radians: f32) -> Self {
        Self::new(angle_radians.cos(), angle_radians.sin())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounds. Always derived from an owner's position; never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2D {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2D {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn around(center: Vec2, half_dimension: f32) -> Self {
        Self {
            min: center.sub_scalar(half_dimension),
            max: center.add_scalar(half_dimension),
        }
    }

    /// Builds bounds from two arbitrary corners, normalising their order.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn dimension(&self) -> Vec2 {
        self.max - self.min
    }

    /// Open-interval test: points on the edge are outside.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x > self.min.x && point.x < self.max.x && point.y > self.min.y && point.y < self.max.y
    }

    /// Closed-interval test, used for rectangle selection.
    pub fn contains_point_inclusive(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Chebyshev distance, `max(|dx|, |dy|)`. The arrival metric for moves and projectiles.
pub fn chebyshev_distance(a: Vec2, b: Vec2) -> f32 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    dx.max(dy)
}

pub fn euclidean_distance(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}
