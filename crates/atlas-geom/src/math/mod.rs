// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Float32 vector and quaternion helpers.
//!
//! All operations round to `f32`; poses arriving from trackers are float32 already.

mod quat;
mod vec3;

pub use quat::Quat;
pub use vec3::Vec3;

/// Global epsilon used when detecting degenerate values and boundary contact.
pub const EPSILON: f32 = 1e-5;

/// Returns `true` when `a` and `b` differ by at most `tolerance`.
pub fn approx_eq(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}
