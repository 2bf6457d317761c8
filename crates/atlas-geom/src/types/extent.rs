// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

/// Size of an oriented planar rectangle, centered on its pose.
///
/// `width` runs along local X, `height` along local Z (the plane normal is local Y).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Extent2 {
    /// Extent along local X, metres.
    pub width: f32,
    /// Extent along local Z, metres.
    pub height: f32,
}

impl Extent2 {
    /// Creates an extent.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Shrinks the extent by `padding` on every side; clamps at zero.
    #[must_use]
    pub fn inset(&self, padding: f32) -> Self {
        Self {
            width: (self.width - 2.0 * padding).max(0.0),
            height: (self.height - 2.0 * padding).max(0.0),
        }
    }

    /// Returns `true` if a `width × height` rectangle fits inside (inclusive).
    #[must_use]
    pub fn fits(&self, width: f32, height: f32) -> bool {
        width >= 0.0 && height >= 0.0 && width <= self.width && height <= self.height
    }

    /// Area in square metres.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}
