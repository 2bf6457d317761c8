// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Property tests for the store and connection graph invariants.

use std::collections::BTreeSet;

use atlas_core::{
    make_anchor_id, AnchorEvent, AnchorStore, ConnectError, NodeId, NodeSpec, PortDirection,
    PortId, World,
};
use atlas_dry_tests::square_room;
use atlas_geom::{Pose, Vec3};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum RoomOp {
    Add(usize, bool),
    Update(usize, bool),
    Remove(usize),
}

fn room_op() -> impl Strategy<Value = RoomOp> {
    prop_oneof![
        (0..5usize, any::<bool>()).prop_map(|(i, p)| RoomOp::Add(i, p)),
        (0..5usize, any::<bool>()).prop_map(|(i, p)| RoomOp::Update(i, p)),
        (0..5usize).prop_map(RoomOp::Remove),
    ]
}

#[derive(Debug, Clone)]
enum LinkOp {
    Connect(usize, usize),
    Disconnect(usize),
    Destroy(usize),
}

fn link_op(pieces: usize) -> impl Strategy<Value = LinkOp> {
    prop_oneof![
        4 => (0..pieces, 0..pieces).prop_map(|(a, b)| LinkOp::Connect(a, b)),
        2 => (0..pieces).prop_map(LinkOp::Disconnect),
        1 => (0..pieces).prop_map(LinkOp::Destroy),
    ]
}

proptest! {
    #[test]
    fn at_most_one_primary_room(ops in prop::collection::vec(room_op(), 1..60)) {
        let mut store = AnchorStore::new();
        for op in ops {
            let event = match op {
                RoomOp::Add(i, p) => AnchorEvent::Added(square_room(&format!("r{i}"), 4.0, p)),
                RoomOp::Update(i, p) => AnchorEvent::Updated(square_room(&format!("r{i}"), 4.0, p)),
                RoomOp::Remove(i) => AnchorEvent::Removed(make_anchor_id(&format!("r{i}"))),
            };
            let before = store.version();
            let applied = store.apply(event).is_ok();
            prop_assert_eq!(store.version(), before + u64::from(applied));

            let snapshot = store.snapshot(None);
            let primaries: Vec<_> = snapshot
                .iter()
                .filter(|a| a.is_primary())
                .map(|a| a.id)
                .collect();
            prop_assert!(primaries.len() <= 1, "primaries: {:?}", primaries);
            prop_assert_eq!(primaries.first().copied(), store.primary_room());
        }
    }

    #[test]
    fn chains_stay_simple_paths(ops in prop::collection::vec(link_op(6), 1..80)) {
        let mut world = World::new();
        let mut pieces: Vec<(NodeId, PortId, PortId)> = Vec::new();
        for i in 0..6 {
            let node = world.create_node(NodeSpec::new(format!("p{i}"))).unwrap();
            let input = world
                .add_port(node, PortDirection::In, "slide", Pose::identity())
                .unwrap();
            let tip = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
            let out = world.add_port(node, PortDirection::Out, "slide", tip).unwrap();
            pieces.push((node, input, out));
        }

        for op in ops {
            match op {
                LinkOp::Connect(a, b) => {
                    let links_before = world.connections().link_count();
                    match world.connect(pieces[a].2, pieces[b].1) {
                        Ok(()) => {
                            prop_assert_eq!(world.connections().link_count(), links_before + 1);
                        }
                        Err(ConnectError::Cycle { .. }) => {
                            prop_assert_eq!(world.connections().link_count(), links_before);
                            // The downstream chain really did reach the upstream node.
                            let reach: Vec<_> = world.connections().traverse(pieces[b].0).collect();
                            prop_assert!(reach.contains(&pieces[a].0));
                        }
                        Err(_) => prop_assert_eq!(world.connections().link_count(), links_before),
                    }
                }
                LinkOp::Disconnect(a) => {
                    let _ = world.disconnect(pieces[a].2);
                }
                LinkOp::Destroy(a) => {
                    let _ = world.destroy(pieces[a].0);
                }
            }

            let live: Vec<NodeId> = world.scene().nodes().map(|n| n.id()).collect();
            for &node in &live {
                let walk: Vec<_> = world.connections().traverse(node).collect();
                let unique: BTreeSet<_> = walk.iter().copied().collect();
                prop_assert_eq!(unique.len(), walk.len(), "walk revisits a node: {:?}", walk);
                prop_assert!(walk.len() <= live.len());
                prop_assert!(walk.iter().all(|n| world.scene().contains(*n)));

                let start = world.connections().chain_start(node);
                prop_assert_eq!(world.connections().previous_piece(start), None);
                prop_assert!(world.connections().chain(node).contains(&node));
            }
        }
    }
}
