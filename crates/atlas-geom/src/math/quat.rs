// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::{Vec3, EPSILON};

/// Orientation as a quaternion `(x, y, z, w)`, `w` being the scalar part.
///
/// Trackers hand over unit quaternions that drift slightly; every operation that
/// rotates something normalises first. Angles are radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    v: Vec3,
    w: f32,
}

impl Quat {
    /// Builds a quaternion from raw components (not normalised).
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self {
            v: Vec3::new(x, y, z),
            w,
        }
    }

    /// No rotation.
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// `[x, y, z, w]`.
    pub fn to_array(self) -> [f32; 4] {
        let [x, y, z] = self.v.to_array();
        [x, y, z, self.w]
    }

    /// Rotation of `angle` about `axis`; identity for a degenerate axis.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        if axis == Vec3::ZERO {
            return Self::identity();
        }
        let (s, c) = (angle * 0.5).sin_cos();
        Self { v: axis.scale(s), w: c }
    }

    /// Rotation about +Y, the only rotation a floor-aligned anchor usually has.
    pub fn from_yaw(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::UNIT_Y, angle)
    }

    /// `self * other`: rotating by the product applies `other`, then `self`.
    pub fn multiply(&self, other: &Self) -> Self {
        let v = other
            .v
            .scale(self.w)
            .add(&self.v.scale(other.w))
            .add(&self.v.cross(&other.v));
        Self {
            v,
            w: self.w * other.w - self.v.dot(&other.v),
        }
    }

    /// Inverse rotation for unit quaternions.
    pub fn conjugate(&self) -> Self {
        Self {
            v: self.v.negate(),
            w: self.w,
        }
    }

    fn norm(&self) -> f32 {
        (self.w * self.w + self.v.length_squared()).sqrt()
    }

    /// Unit-length copy; identity when the norm is ~0.
    pub fn normalize(&self) -> Self {
        let n = self.norm();
        if n <= EPSILON {
            return Self::identity();
        }
        let inv = n.recip();
        Self {
            v: self.v.scale(inv),
            w: self.w * inv,
        }
    }

    /// Applies the rotation to `v`.
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        let q = self.normalize();
        // t = 2 (u × v); v' = v + w t + u × t
        let t = q.v.cross(v).scale(2.0);
        v.add(&t.scale(q.w)).add(&q.v.cross(&t))
    }

    /// Same rotation within `tolerance`; `q` and `-q` count as equal.
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        let a = self.normalize();
        let b = other.normalize();
        let close = |sign: f32| {
            a.v.approx_eq(&b.v.scale(sign), tolerance) && (a.w - sign * b.w).abs() <= tolerance
        };
        close(1.0) || close(-1.0)
    }

    /// Images of the unit axes: `[x_axis, y_axis, z_axis]`.
    pub fn to_basis(&self) -> [Vec3; 3] {
        [Vec3::UNIT_X, Vec3::UNIT_Y, Vec3::UNIT_Z].map(|axis| self.rotate(&axis))
    }
}

impl From<[f32; 4]> for Quat {
    fn from([x, y, z, w]: [f32; 4]) -> Self {
        Self::new(x, y, z, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    #[test]
    fn yaw_quarter_turn_maps_x_to_negative_z() {
        let r = Quat::from_yaw(FRAC_PI_2).rotate(&Vec3::UNIT_X);
        assert!(r.approx_eq(&Vec3::new(0.0, 0.0, -1.0), 1e-6), "{r:?}");
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let v = Vec3::new(0.3, -2.0, 5.0);
        let back = q.conjugate().rotate(&q.rotate(&v));
        assert!(back.approx_eq(&v, 1e-5));
    }

    #[test]
    fn product_applies_right_operand_first() {
        let yaw = Quat::from_yaw(FRAC_PI_2);
        let roll = Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2);
        let v = Vec3::UNIT_X;
        let composed = yaw.multiply(&roll).rotate(&v);
        let stepwise = yaw.rotate(&roll.rotate(&v));
        assert!(composed.approx_eq(&stepwise, 1e-6));
    }

    #[test]
    fn approx_eq_accepts_double_cover() {
        let q = Quat::from_yaw(0.4);
        let [x, y, z, w] = q.to_array();
        assert!(q.approx_eq(&Quat::new(-x, -y, -z, -w), 1e-6));
    }
}
