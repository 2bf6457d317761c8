// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! atlas-core: anchor tracking and modular scene assembly.
//!
//! The tracking provider reports anchors (planes, rooms, world points). The
//! [`AnchorStore`] keeps the authoritative set and emits an [`AnchorChange`] per
//! event; the [`SpatialIndex`] and [`SceneGraph`] fold those changes in
//! incrementally. The [`ConnectionGraph`] snaps modular pieces together through
//! typed ports. [`World`] owns all four and runs the cascades.
//!
//! Everything here is synchronous and single-threaded; `atlas-runtime` serializes
//! access on one writer task.
#![forbid(unsafe_code)]

mod anchor;
mod connect;
mod ident;
mod scene;
mod spatial;
mod store;
mod template;
mod world;

pub use anchor::{
    Anchor, AnchorEvent, AnchorEventKind, AnchorGeometry, AnchorKind, Classification,
    PlaneAlignment, PlaneGeometry, RoomGeometry, Surface,
};
pub use connect::{Chain, ConnectError, ConnectPort, ConnectionGraph, PortDirection};
pub use ident::{make_anchor_id, AnchorId, Hash, NodeId, PortId};
pub use scene::{NodeSpec, Renderable, SceneError, SceneGraph, SceneNode, VisibleItem};
pub use spatial::{SpatialIndex, DEFAULT_PLACEMENT_PADDING};
pub use store::{AnchorChange, AnchorError, AnchorFilter, AnchorSnapshot, AnchorStore};
pub use template::{NodeTemplate, TemplateNode, TemplatePort};
pub use world::{Instantiated, World, WorldError};
