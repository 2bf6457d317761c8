// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::EPSILON;

/// Point or direction in the tracker's frame: metres, Y up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3 {
    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// +X; plane width runs along it.
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    /// Up.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    /// +Z; plane height runs along it.
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Builds a vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// `[x, y, z]`.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Horizontal axis.
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Height above the tracking origin.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Horizontal axis orthogonal to X.
    pub fn z(&self) -> f32 {
        self.z
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self::new(f(self.x, other.x), f(self.y, other.y), f(self.z, other.z))
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a - b)
    }

    /// Uniform scale.
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// `-self`.
    pub fn negate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Inner product.
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Right-handed cross product.
    pub fn cross(&self, o: &Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    /// Magnitude.
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Magnitude squared; avoids the square root for comparisons.
    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    /// Straight-line distance between two points.
    pub fn distance(&self, other: &Self) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction, or [`Vec3::ZERO`] for vectors shorter
    /// than [`EPSILON`].
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > EPSILON {
            self.scale(len.recip())
        } else {
            Self::ZERO
        }
    }

    /// `true` if no component differs by more than `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        let d = self.sub(other);
        d.x.abs() <= tolerance && d.y.abs() <= tolerance && d.z.abs() <= tolerance
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}
