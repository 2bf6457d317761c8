// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Integration tests for polygon containment and pose algebra.

use atlas_geom::{Polygon2, Pose, Quat, Vec3};
use proptest::prelude::*;

#[test]
fn square_room_containment_center_outside_boundary() {
    let room = Polygon2::rectangle(4.0, 4.0);
    assert!(room.contains([0.0, 0.0]), "center is inside");
    assert!(!room.contains([12.0, 0.0]), "10 m past the wall is outside");
    // Boundary points are inside, and stay inside on repeated queries.
    for _ in 0..3 {
        assert!(room.contains([2.0, 0.0]));
        assert!(room.contains([2.0, 2.0]));
        assert!(room.contains([-2.0, 1.5]));
    }
}

#[test]
fn winding_order_does_not_change_answer() {
    let ccw = Polygon2::new(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
    let cw = Polygon2::new(vec![[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]]);
    for p in [[1.0, 1.0], [3.0, 1.0], [2.0, 1.0], [-0.1, -0.1]] {
        assert_eq!(ccw.contains(p), cw.contains(p), "mismatch at {p:?}");
    }
}

proptest! {
    #[test]
    fn pose_inverse_round_trips_points(
        yaw in -3.0f32..3.0,
        tx in -50.0f32..50.0,
        tz in -50.0f32..50.0,
        px in -10.0f32..10.0,
        pz in -10.0f32..10.0,
    ) {
        let pose = Pose::new(Vec3::new(tx, 0.5, tz), Quat::from_yaw(yaw));
        let p = Vec3::new(px, 1.0, pz);
        let back = pose.inverse().transform_point(&pose.transform_point(&p));
        prop_assert!(back.approx_eq(&p, 1e-3), "{back:?} != {p:?}");
    }

    #[test]
    fn rectangle_contains_matches_bounds(
        w in 0.5f32..20.0,
        d in 0.5f32..20.0,
        x in -15.0f32..15.0,
        z in -15.0f32..15.0,
    ) {
        let rect = Polygon2::rectangle(w, d);
        let strictly_inside = x.abs() < w * 0.5 - 1e-3 && z.abs() < d * 0.5 - 1e-3;
        let clearly_outside = x.abs() > w * 0.5 + 1e-3 || z.abs() > d * 0.5 + 1e-3;
        if strictly_inside {
            prop_assert!(rect.contains([x, z]));
        }
        if clearly_outside {
            prop_assert!(!rect.contains([x, z]));
        }
    }
}
