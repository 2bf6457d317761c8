// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Foundational geometric types.

/// Plane sizes (width × height).
pub mod extent;
/// Closed polygons in a local XZ plane.
pub mod polygon;
/// Rigid transforms.
pub mod pose;
