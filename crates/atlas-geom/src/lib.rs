// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives for Atlas.

This crate provides:
- Float32 linear algebra (`Vec3`, `Quat`).
- Rigid transforms (`Pose`) shared by anchors and scene nodes.
- Planar shapes in an anchor's local XZ plane (`Extent2`, `Polygon2`).

Design notes:
- Y is up in every reference frame; planar shapes live in local X/Z.
- Deterministic: no ambient RNG, no FMA; boundary tests have a fixed tolerance.
- Rustdoc is treated as part of the contract; public items are documented.
"]
#![forbid(unsafe_code)]

/// Vector and rotation math.
pub mod math;
/// Foundational geometric types.
pub mod types;

pub use math::{Quat, Vec3, EPSILON};
pub use types::extent::Extent2;
pub use types::polygon::Polygon2;
pub use types::pose::Pose;
