// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::{Quat, Vec3};

/// Rigid transform (position + orientation) used for anchors, scene nodes and ports.
///
/// Conventions:
/// - `position` in metres, in the parent frame.
/// - `orientation` as a unit quaternion (normalised when applied).
/// - No scale: anchors are rigid and assemblies snap by pose only.
///
/// Composition follows the usual parent-to-child order: `parent.compose(&local)`
/// yields the child's pose in the parent's frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    position: Vec3,
    orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Identity pose (origin, no rotation).
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::identity(),
        }
    }

    /// Creates a pose from components.
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pure translation.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    /// Position component.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Orientation component.
    #[must_use]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Returns `self ∘ local`: `local` expressed in this pose's parent frame.
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        Self {
            position: self.position.add(&self.orientation.rotate(&local.position)),
            orientation: self.orientation.multiply(&local.orientation).normalize(),
        }
    }

    /// Inverse rigid transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rot = self.orientation.normalize().conjugate();
        Self {
            position: inv_rot.rotate(&self.position).negate(),
            orientation: inv_rot,
        }
    }

    /// Maps a point from this pose's local frame into the parent frame.
    #[must_use]
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.position.add(&self.orientation.rotate(point))
    }

    /// Compares position and orientation within `tolerance`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.position.approx_eq(&other.position, tolerance)
            && self.orientation.approx_eq(&other.orientation, tolerance)
    }

    /// Column-major 4×4 matrix, the layout renderers upload directly.
    #[must_use]
    pub fn to_cols_array(&self) -> [f32; 16] {
        let [x, y, z] = self.orientation.to_basis();
        let [tx, ty, tz] = self.position.to_array();
        [
            x.x(),
            x.y(),
            x.z(),
            0.0,
            y.x(),
            y.y(),
            y.z(),
            0.0,
            z.x(),
            z.y(),
            z.z(),
            0.0,
            tx,
            ty,
            tz,
            1.0,
        ]
    }
}
