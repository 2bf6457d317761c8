// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Anchor and template fixtures.

use atlas_core::{make_anchor_id, Anchor, Classification, PlaneAlignment};
use atlas_geom::{Extent2, Polygon2, Pose, Vec3};

/// Name of the template returned by [`straight_piece_json`].
pub const STRAIGHT_PIECE: &str = "straight";

/// `side × side` square room centered on the origin.
pub fn square_room(label: &str, side: f32, primary: bool) -> Anchor {
    square_room_at(label, Vec3::ZERO, side, primary)
}

/// `side × side` square room centered on `center`, axis-aligned.
pub fn square_room_at(label: &str, center: Vec3, side: f32, primary: bool) -> Anchor {
    Anchor::room(
        make_anchor_id(label),
        Pose::from_position(center),
        Polygon2::rectangle(side, side),
        primary,
    )
}

/// Horizontal table plane of `width × depth` centered on `center`.
pub fn table(label: &str, center: Vec3, width: f32, depth: f32) -> Anchor {
    Anchor::plane(
        make_anchor_id(label),
        Pose::from_position(center),
        Extent2::new(width, depth),
        PlaneAlignment::Horizontal,
        Classification::Table,
    )
}

/// World point anchor at `position`.
pub fn point(label: &str, position: Vec3) -> Anchor {
    Anchor::point(make_anchor_id(label), Pose::from_position(position))
}

/// A 1 m straight track piece: In port at its origin, Out port 1 m along +X, and
/// a decorative child drawn after the body.
pub fn straight_piece_json() -> Vec<u8> {
    br#"{
  "name": "straight",
  "root": {
    "name": "straight",
    "renderable": { "mesh": "track/straight.mesh", "material": "track/wood" },
    "ports": [
      { "direction": "in", "tag": "slide" },
      { "direction": "out", "tag": "slide", "position": [1.0, 0.0, 0.0] }
    ],
    "children": [
      {
        "name": "rail",
        "draw_order": 1,
        "position": [0.5, 0.02, 0.0],
        "renderable": { "mesh": "track/rail.mesh", "material": "track/steel" }
      }
    ]
  }
}"#
    .to_vec()
}
