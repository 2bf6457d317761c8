// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end behaviour of the world aggregate.

use atlas_core::{
    make_anchor_id, AnchorError, AnchorEvent, AnchorFilter, AnchorKind, ConnectError, NodeId,
    NodeSpec, PortDirection, PortId, Renderable, SceneError, World,
};
use atlas_dry_tests::{point, square_room, square_room_at, table};
use atlas_geom::{Pose, Quat, Vec3};

fn add(world: &mut World, anchor: atlas_core::Anchor) {
    world.apply_anchor_event(AnchorEvent::Added(anchor)).unwrap();
}

/// Piece with an In port at its origin and an Out port `len` metres along +X.
fn piece(world: &mut World, name: &str, tag: &str, len: f32) -> (NodeId, PortId, PortId) {
    let node = world
        .create_node(NodeSpec::new(name).with_renderable(Renderable::new(name, "mat")))
        .unwrap();
    let input = world
        .add_port(node, PortDirection::In, tag, Pose::identity())
        .unwrap();
    let out = world
        .add_port(node, PortDirection::Out, tag, Pose::from_position(Vec3::new(len, 0.0, 0.0)))
        .unwrap();
    (node, input, out)
}

/// World pose of a port.
fn port_world(world: &World, port: PortId) -> Pose {
    let port = world.connections().port(port).unwrap();
    world
        .scene()
        .world_transform(port.node())
        .unwrap()
        .compose(&port.local())
}

fn assert_link_aligned(world: &World, out: PortId, input: PortId) {
    let (o, i) = (port_world(world, out), port_world(world, input));
    assert!(i.approx_eq(&o, 1e-5), "in {i:?} left out {o:?}");
}

fn assert_no_dangling_links(world: &World) {
    for node in world.scene().nodes() {
        for port in world.connections().ports_of(node.id()) {
            if let Some(peer) = port.link() {
                let peer = world.connections().port(peer).expect("peer port exists");
                assert_eq!(peer.link(), Some(port.id()), "links are symmetric");
                assert!(world.scene().contains(peer.node()), "peer node exists");
            }
        }
    }
}

#[test]
fn marking_second_room_primary_demotes_first() {
    let mut world = World::new();
    add(&mut world, square_room("r1", 4.0, true));
    add(&mut world, square_room_at("r2", Vec3::new(10.0, 0.0, 0.0), 4.0, false));
    let r1 = make_anchor_id("r1");
    let r2 = make_anchor_id("r2");

    let change = world
        .apply_anchor_event(AnchorEvent::Updated(square_room_at(
            "r2",
            Vec3::new(10.0, 0.0, 0.0),
            4.0,
            true,
        )))
        .unwrap();
    assert_eq!(change.demoted.len(), 1);
    assert_eq!(change.demoted[0].id, r1);
    assert!(!world.anchors().get(&r1).unwrap().is_primary());
    assert!(world.anchors().get(&r2).unwrap().is_primary());
    assert_eq!(world.anchors().primary_room(), Some(r2));

    // The index followed the demotion too: overlapping queries now prefer r2.
    assert_eq!(world.spatial().room_at(&Vec3::new(10.0, 0.0, 0.0)), Some(r2));
}

#[test]
fn containment_on_four_metre_square() {
    let mut world = World::new();
    add(&mut world, square_room("r", 4.0, false));
    let r = make_anchor_id("r");
    let spatial = world.spatial();
    assert!(spatial.contains(&r, &Vec3::new(0.0, 0.0, 0.0)));
    assert!(!spatial.contains(&r, &Vec3::new(12.0, 0.0, 0.0)));
    for _ in 0..4 {
        assert!(spatial.contains(&r, &Vec3::new(2.0, 0.0, 0.0)));
        assert!(spatial.contains(&r, &Vec3::new(-2.0, 0.0, -2.0)));
    }
    assert!(!spatial.contains(&make_anchor_id("nope"), &Vec3::ZERO));
}

#[test]
fn snapshot_filters_and_queries() {
    let mut world = World::new();
    add(&mut world, square_room("room", 6.0, true));
    add(&mut world, table("desk", Vec3::new(1.0, 0.7, 1.0), 1.2, 0.8));
    add(&mut world, point("lamp", Vec3::new(1.2, 0.7, 1.0)));

    let planes = world.snapshot(Some(&AnchorFilter::kind(AnchorKind::Plane)));
    assert_eq!(planes.len(), 1);
    let near = world
        .spatial()
        .nearest(&Vec3::new(1.3, 0.7, 1.0), None, 0.5);
    assert_eq!(near, Some(make_anchor_id("lamp")));
    let desk = make_anchor_id("desk");
    let placement = world.spatial().fits_on(&desk, (0.5, 0.5)).unwrap();
    assert!(placement.approx_eq(&Pose::from_position(Vec3::new(1.0, 0.7, 1.0)), 1e-6));
    assert!(world.spatial().fits_on(&desk, (1.2, 0.5)).is_none());
}

#[test]
fn duplicate_and_unknown_events_leave_world_unchanged() {
    let mut world = World::new();
    add(&mut world, point("p", Vec3::ZERO));
    let before = world.anchors().version();
    assert_eq!(
        world.apply_anchor_event(AnchorEvent::Added(point("p", Vec3::ZERO))),
        Err(AnchorError::DuplicateAnchor(make_anchor_id("p")))
    );
    assert_eq!(
        world.apply_anchor_event(AnchorEvent::Removed(make_anchor_id("q"))),
        Err(AnchorError::UnknownAnchor(make_anchor_id("q")))
    );
    assert_eq!(world.anchors().version(), before);
    assert_eq!(world.spatial().version(), before);
}

#[test]
fn connect_aligns_in_port_to_out_port_then_reconnect_elsewhere() {
    let mut world = World::new();
    let (a, _, a_out) = piece(&mut world, "a", "slide", 1.0);
    let (b, b_in, _) = piece(&mut world, "b", "slide", 1.0);
    let (c, c_in, _) = piece(&mut world, "c", "slide", 1.0);

    // Rotate A a quarter turn and move it; B must follow A's out port.
    world
        .set_local_transform(
            a,
            Pose::new(Vec3::new(2.0, 0.0, 3.0), Quat::from_yaw(core::f32::consts::FRAC_PI_2)),
        )
        .unwrap();
    world.connect(a_out, b_in).unwrap();

    let out_world = world
        .scene()
        .world_transform(a)
        .unwrap()
        .compose(&world.connections().port(a_out).unwrap().local());
    let in_world = world
        .scene()
        .world_transform(b)
        .unwrap()
        .compose(&world.connections().port(b_in).unwrap().local());
    assert!(in_world.approx_eq(&out_world, 1e-5), "{in_world:?} vs {out_world:?}");
    assert_eq!(world.connections().next_piece(a), Some(b));

    world.disconnect(a_out).unwrap();
    world.connect(a_out, c_in).unwrap();
    assert_eq!(world.connections().next_piece(a), Some(c));
    assert_eq!(world.connections().previous_piece(b), None);
}

#[test]
fn connect_validation_errors() {
    let mut world = World::new();
    let (_, _, a_out) = piece(&mut world, "a", "slide", 1.0);
    let (_, b_in, _) = piece(&mut world, "b", "junction", 1.0);
    let (_, c_in, _) = piece(&mut world, "c", "slide", 1.0);
    let (_, d_in, _) = piece(&mut world, "d", "slide", 1.0);

    assert_eq!(
        world.connect(a_out, b_in),
        Err(ConnectError::PortTypeMismatch {
            out_tag: "slide".into(),
            in_tag: "junction".into(),
        })
    );
    world.connect(a_out, c_in).unwrap();
    assert_eq!(world.connect(a_out, d_in), Err(ConnectError::PortBusy(a_out)));
    assert_eq!(
        world.connect(PortId(9999), d_in),
        Err(ConnectError::UnknownPort(PortId(9999)))
    );
}

#[test]
fn node_cannot_branch_through_second_out_port() {
    let mut world = World::new();
    let (a, _, a_out) = piece(&mut world, "a", "slide", 1.0);
    let extra = world
        .add_port(a, PortDirection::Out, "slide", Pose::identity())
        .unwrap();
    let (_, b_in, _) = piece(&mut world, "b", "slide", 1.0);
    let (_, c_in, _) = piece(&mut world, "c", "slide", 1.0);
    world.connect(a_out, b_in).unwrap();
    assert_eq!(world.connect(extra, c_in), Err(ConnectError::PortBusy(extra)));
}

#[test]
fn destroying_chain_middle_leaves_no_dangling_ports() {
    let mut world = World::new();
    let (a, _, a_out) = piece(&mut world, "a", "slide", 1.0);
    let (b, b_in, b_out) = piece(&mut world, "b", "slide", 1.0);
    let (c, c_in, _) = piece(&mut world, "c", "slide", 1.0);
    let child = world
        .create_node(NodeSpec::new("b-child").with_parent(b))
        .unwrap();
    world
        .add_port(child, PortDirection::Out, "slide", Pose::identity())
        .unwrap();
    world.connect(a_out, b_in).unwrap();
    world.connect(b_out, c_in).unwrap();

    let removed = world.destroy(b).unwrap();
    assert_eq!(removed, vec![b, child]);
    assert!(!world.scene().contains(child));
    assert!(world.connections().port(b_in).is_none());
    assert_eq!(world.connections().next_piece(a), None);
    assert_eq!(world.connections().previous_piece(c), None);
    assert_eq!(world.connections().port_count(), 4);
    assert_no_dangling_links(&world);

    assert_eq!(world.destroy(b), Err(SceneError::UnknownNode(b)));
}

#[test]
fn destroying_bound_node_clears_binding() {
    let mut world = World::new();
    add(&mut world, point("spot", Vec3::ZERO));
    let spot = make_anchor_id("spot");
    let n = world.create_node(NodeSpec::new("n").bound_to(spot)).unwrap();
    assert_eq!(world.scene().bound_to(&spot), vec![n]);
    world.destroy(n).unwrap();
    assert!(world.scene().bound_to(&spot).is_empty());
    // Removing the anchor afterwards touches nothing.
    world.apply_anchor_event(AnchorEvent::Removed(spot)).unwrap();
    assert!(world.scene().is_empty());
}

#[test]
fn anchor_removal_disables_unless_always_visible() {
    let mut world = World::new();
    add(&mut world, point("spot", Vec3::new(0.0, 0.0, 2.0)));
    let spot = make_anchor_id("spot");
    let hidden = world
        .create_node(
            NodeSpec::new("hidden")
                .bound_to(spot)
                .with_renderable(Renderable::new("a", "m")),
        )
        .unwrap();
    let sticky = world
        .create_node(
            NodeSpec::new("sticky")
                .bound_to(spot)
                .always_visible()
                .with_renderable(Renderable::new("b", "m")),
        )
        .unwrap();
    assert_eq!(world.enumerate_visible().len(), 2);

    world.apply_anchor_event(AnchorEvent::Removed(spot)).unwrap();
    let visible = world.enumerate_visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].node, sticky);
    assert!(visible[0]
        .world
        .approx_eq(&Pose::from_position(Vec3::new(0.0, 0.0, 2.0)), 1e-6));
    assert!(!world.scene().node(hidden).unwrap().is_enabled());
}

#[test]
fn bound_node_follows_anchor_updates() {
    let mut world = World::new();
    add(&mut world, point("spot", Vec3::ZERO));
    let spot = make_anchor_id("spot");
    let n = world
        .create_node(
            NodeSpec::new("n")
                .bound_to(spot)
                .with_transform(Pose::from_position(Vec3::new(0.0, 1.0, 0.0))),
        )
        .unwrap();
    world
        .apply_anchor_event(AnchorEvent::Updated(point("spot", Vec3::new(5.0, 0.0, 0.0))))
        .unwrap();
    assert!(world
        .scene()
        .world_transform(n)
        .unwrap()
        .approx_eq(&Pose::from_position(Vec3::new(5.0, 1.0, 0.0)), 1e-6));
}

#[test]
fn draw_order_is_hierarchical() {
    let mut world = World::new();
    let back = world
        .create_node(
            NodeSpec::new("back")
                .with_draw_order(0)
                .with_renderable(Renderable::new("back", "m")),
        )
        .unwrap();
    let front = world
        .create_node(
            NodeSpec::new("front")
                .with_draw_order(10)
                .with_renderable(Renderable::new("front", "m")),
        )
        .unwrap();
    // A child with a low order still draws after its parent and before later roots.
    let detail = world
        .create_node(
            NodeSpec::new("detail")
                .with_parent(back)
                .with_draw_order(-100)
                .with_renderable(Renderable::new("detail", "m")),
        )
        .unwrap();
    let order: Vec<_> = world.enumerate_visible().into_iter().map(|v| v.node).collect();
    assert_eq!(order, vec![back, detail, front]);

    world.scene_mut().set_draw_order(front, -1).unwrap();
    let order: Vec<_> = world.enumerate_visible().into_iter().map(|v| v.node).collect();
    assert_eq!(order, vec![front, back, detail]);
}

#[test]
fn in_node_above_out_node_cannot_link() {
    let mut world = World::new();
    let (b, b_in, _) = piece(&mut world, "b", "slide", 1.0);
    let (a, _, a_out) = piece(&mut world, "a", "slide", 1.0);
    world.reparent(a, Some(b)).unwrap();
    assert_eq!(
        world.connect(a_out, b_in),
        Err(ConnectError::Cycle { from: a, to: b })
    );
    assert_eq!(world.connections().link_count(), 0);
}

/// `p` bound to `spot`, `d` under `p` with an Out port 1 m along +X, `e` a free
/// piece linked to it.
fn carried_chain(world: &mut World) -> (NodeId, PortId, PortId) {
    add(world, point("spot", Vec3::ZERO));
    let p = world
        .create_node(NodeSpec::new("p").bound_to(make_anchor_id("spot")))
        .unwrap();
    let d = world.create_node(NodeSpec::new("d").with_parent(p)).unwrap();
    let tip = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
    let d_out = world.add_port(d, PortDirection::Out, "slide", tip).unwrap();
    let (_, e_in, _) = piece(world, "e", "slide", 1.0);
    world.connect(d_out, e_in).unwrap();
    (p, d_out, e_in)
}

#[test]
fn anchor_update_drags_chain_hanging_off_a_child() {
    let mut world = World::new();
    let (_, d_out, e_in) = carried_chain(&mut world);
    world
        .apply_anchor_event(AnchorEvent::Updated(point("spot", Vec3::new(5.0, 0.0, 0.0))))
        .unwrap();
    assert!(port_world(&world, d_out)
        .approx_eq(&Pose::from_position(Vec3::new(6.0, 0.0, 0.0)), 1e-5));
    assert_link_aligned(&world, d_out, e_in);
}

#[test]
fn moving_parent_drags_chain_hanging_off_a_child() {
    let mut world = World::new();
    let (p, d_out, e_in) = carried_chain(&mut world);
    world
        .set_local_transform(p, Pose::from_position(Vec3::new(0.0, 0.0, 3.0)))
        .unwrap();
    assert!(port_world(&world, d_out)
        .approx_eq(&Pose::from_position(Vec3::new(1.0, 0.0, 3.0)), 1e-5));
    assert_link_aligned(&world, d_out, e_in);
}

#[test]
fn reparenting_carrier_drags_its_chain() {
    let mut world = World::new();
    let (_, d_out, e_in) = carried_chain(&mut world);
    let d = world.connections().port(d_out).unwrap().node();
    let shelf_pose = Pose::from_position(Vec3::new(0.0, 2.0, 0.0));
    let shelf = world
        .create_node(NodeSpec::new("shelf").with_transform(shelf_pose))
        .unwrap();
    world.reparent(d, Some(shelf)).unwrap();
    assert!(port_world(&world, d_out)
        .approx_eq(&Pose::from_position(Vec3::new(1.0, 2.0, 0.0)), 1e-5));
    assert_link_aligned(&world, d_out, e_in);
}

#[test]
fn anchored_downstream_piece_stays_on_upstream_port() {
    let mut world = World::new();
    add(&mut world, point("dock", Vec3::ZERO));
    let (_, _, u_out) = piece(&mut world, "u", "slide", 1.0);
    let (v, v_in, _) = piece(&mut world, "v", "slide", 1.0);
    world.bind(v, make_anchor_id("dock")).unwrap();
    world.connect(u_out, v_in).unwrap();

    world
        .apply_anchor_event(AnchorEvent::Updated(point("dock", Vec3::new(0.0, 0.0, 4.0))))
        .unwrap();
    assert_link_aligned(&world, u_out, v_in);
    assert!(world
        .scene()
        .world_transform(v)
        .unwrap()
        .approx_eq(&Pose::from_position(Vec3::new(1.0, 0.0, 0.0)), 1e-5));
}

#[test]
fn anchor_removal_bakes_pose_relative_to_parent() {
    let mut world = World::new();
    add(&mut world, point("spot", Vec3::new(0.0, 0.0, 2.0)));
    let spot = make_anchor_id("spot");
    let parent = world
        .create_node(
            NodeSpec::new("parent").with_transform(Pose::from_position(Vec3::new(1.0, 0.0, 0.0))),
        )
        .unwrap();
    let child = world
        .create_node(NodeSpec::new("child").with_parent(parent).bound_to(spot))
        .unwrap();

    world.apply_anchor_event(AnchorEvent::Removed(spot)).unwrap();
    let node = world.scene().node(child).unwrap();
    assert_eq!(node.anchor(), None);
    assert!(node
        .local_transform()
        .approx_eq(&Pose::from_position(Vec3::new(-1.0, 0.0, 2.0)), 1e-6));
    assert!(world
        .scene()
        .world_transform(child)
        .unwrap()
        .approx_eq(&Pose::from_position(Vec3::new(0.0, 0.0, 2.0)), 1e-6));
}
