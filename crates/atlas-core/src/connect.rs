// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port graph for snapping modular pieces into chains.
//!
//! Every node has at most one linked Out port and one linked In port, so the linked
//! nodes always form a forest of simple paths ("chains"). Connecting aligns the
//! downstream piece so its In port sits exactly on the upstream Out port.
use std::collections::{BTreeMap, BTreeSet};

use atlas_geom::Pose;
use thiserror::Error;
use tracing::debug;

use crate::ident::{NodeId, PortId};
use crate::scene::{SceneError, SceneGraph};

/// Direction of a connect port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Accepts an upstream piece.
    In,
    /// Offers a downstream attachment point.
    Out,
}

/// Errors returned by [`ConnectionGraph`] operations. The graph is unchanged on
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Port id not registered (never added, or removed with its node).
    #[error("unknown port {0}")]
    UnknownPort(PortId),
    /// Owning node does not exist in the scene graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// An In port was passed where an Out port was expected, or vice versa.
    #[error("port {0} has the wrong direction for this end of the link")]
    WrongDirection(PortId),
    /// Port type tags differ.
    #[error("port type mismatch: out `{out_tag}` vs in `{in_tag}`")]
    PortTypeMismatch {
        /// Tag on the Out port.
        out_tag: String,
        /// Tag on the In port.
        in_tag: String,
    },
    /// The port, or its node's link slot in that direction, is already taken.
    #[error("port {0} is busy")]
    PortBusy(PortId),
    /// The link would close a loop: either through existing links, or because a
    /// piece that has to move carries the upstream side in its scene subtree.
    #[error("linking {from} to {to} would create a cycle")]
    Cycle {
        /// Upstream node.
        from: NodeId,
        /// Downstream node.
        to: NodeId,
    },
    /// Moving a piece into place failed in the scene graph.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// A typed attachment point on a scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectPort {
    id: PortId,
    node: NodeId,
    direction: PortDirection,
    tag: String,
    local: Pose,
    link: Option<PortId>,
}

impl ConnectPort {
    /// Port id.
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Owning node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// In or Out.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Type tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Pose relative to the owning node.
    pub fn local(&self) -> Pose {
        self.local
    }

    /// Linked peer, if any.
    pub fn link(&self) -> Option<PortId> {
        self.link
    }
}

/// Explicit adjacency over connect ports.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    ports: BTreeMap<PortId, ConnectPort>,
    by_node: BTreeMap<NodeId, BTreeSet<PortId>>,
    next_id: u64,
}

impl ConnectionGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Number of active links.
    pub fn link_count(&self) -> usize {
        self.ports
            .values()
            .filter(|p| p.direction == PortDirection::Out && p.link.is_some())
            .count()
    }

    /// Registers a port on `node`.
    pub fn add_port(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        direction: PortDirection,
        tag: impl Into<String>,
        local: Pose,
    ) -> Result<PortId, ConnectError> {
        if !scene.contains(node) {
            return Err(ConnectError::UnknownNode(node));
        }
        Ok(self.insert_port(node, direction, tag.into(), local))
    }

    /// Registers a port on a node the caller knows to exist.
    pub(crate) fn insert_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        tag: String,
        local: Pose,
    ) -> PortId {
        self.next_id += 1;
        let id = PortId(self.next_id);
        self.ports.insert(
            id,
            ConnectPort {
                id,
                node,
                direction,
                tag,
                local,
                link: None,
            },
        );
        self.by_node.entry(node).or_default().insert(id);
        id
    }

    /// Looks up a port.
    pub fn port(&self, id: PortId) -> Option<&ConnectPort> {
        self.ports.get(&id)
    }

    /// Ports owned by `node`, in registration order.
    pub fn ports_of(&self, node: NodeId) -> Vec<&ConnectPort> {
        self.by_node
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.ports.get(id))
            .collect()
    }

    fn get(&self, id: PortId) -> Result<&ConnectPort, ConnectError> {
        self.ports.get(&id).ok_or(ConnectError::UnknownPort(id))
    }

    /// The linked port of `node` in `direction`, paired with its peer.
    fn linked(
        &self,
        node: NodeId,
        direction: PortDirection,
    ) -> Option<(&ConnectPort, &ConnectPort)> {
        self.ports_of(node)
            .into_iter()
            .filter(|p| p.direction == direction)
            .find_map(|p| {
                let peer = self.ports.get(&p.link?)?;
                Some((p, peer))
            })
    }

    /// Downstream neighbour of `node`.
    pub fn next_piece(&self, node: NodeId) -> Option<NodeId> {
        self.linked(node, PortDirection::Out).map(|(_, peer)| peer.node)
    }

    /// Upstream neighbour of `node`.
    pub fn previous_piece(&self, node: NodeId) -> Option<NodeId> {
        self.linked(node, PortDirection::In).map(|(_, peer)| peer.node)
    }

    /// Upper bound on any chain length; walking further means the stored links
    /// contain a loop.
    fn step_limit(&self) -> usize {
        self.by_node.len() + 1
    }

    /// First node of the chain containing `node`.
    ///
    /// # Panics
    /// If the stored links contain a cycle (invariant corruption).
    pub fn chain_start(&self, node: NodeId) -> NodeId {
        let mut current = node;
        let mut steps = 0;
        while let Some(prev) = self.previous_piece(current) {
            steps += 1;
            assert!(
                steps <= self.step_limit(),
                "connection graph corrupted: cycle through {node}"
            );
            current = prev;
        }
        current
    }

    /// Lazy walk along `next_piece` starting at (and including) `start`.
    ///
    /// Restartable: call again to walk again.
    pub fn traverse(&self, start: NodeId) -> Chain<'_> {
        Chain {
            graph: self,
            next: Some(start),
            origin: start,
            remaining: self.step_limit(),
        }
    }

    /// The whole chain containing `node`, from its start.
    pub fn chain(&self, node: NodeId) -> Vec<NodeId> {
        self.traverse(self.chain_start(node)).collect()
    }

    /// Links `out` to `input` and snaps the downstream piece into place.
    ///
    /// On success the In node (and everything already chained after it) is moved so
    /// the In port's world pose equals the Out port's world pose.
    pub fn connect(
        &mut self,
        out: PortId,
        input: PortId,
        scene: &mut SceneGraph,
    ) -> Result<(), ConnectError> {
        let out_port = self.get(out)?;
        let in_port = self.get(input)?;
        if out_port.direction != PortDirection::Out {
            return Err(ConnectError::WrongDirection(out));
        }
        if in_port.direction != PortDirection::In {
            return Err(ConnectError::WrongDirection(input));
        }
        if out_port.tag != in_port.tag {
            return Err(ConnectError::PortTypeMismatch {
                out_tag: out_port.tag.clone(),
                in_tag: in_port.tag.clone(),
            });
        }
        if out_port.link.is_some() {
            return Err(ConnectError::PortBusy(out));
        }
        if in_port.link.is_some() {
            return Err(ConnectError::PortBusy(input));
        }
        let (from, to) = (out_port.node, in_port.node);
        if self.linked(from, PortDirection::Out).is_some() {
            return Err(ConnectError::PortBusy(out));
        }
        if self.linked(to, PortDirection::In).is_some() {
            return Err(ConnectError::PortBusy(input));
        }
        if !scene.contains(from) {
            return Err(ConnectError::UnknownNode(from));
        }
        if !scene.contains(to) {
            return Err(ConnectError::UnknownNode(to));
        }
        // Everything from `to` on gets moved; none of it may be, or carry, a piece
        // at or above `from` in the chain.
        let upstream = self.chain(from);
        let moving: Vec<NodeId> = self.traverse(to).collect();
        if moving
            .iter()
            .any(|&m| upstream.iter().any(|&u| scene.is_self_or_descendant(m, u)))
        {
            return Err(ConnectError::Cycle { from, to });
        }

        let saved: Vec<(NodeId, Pose)> = moving
            .iter()
            .filter_map(|&m| scene.node(m).map(|n| (m, n.local_transform())))
            .collect();
        self.set_link(out, Some(input));
        self.set_link(input, Some(out));
        if let Err(err) = self.realign_chain(from, scene) {
            self.set_link(out, None);
            self.set_link(input, None);
            scene.restore_locals(&saved);
            return Err(err);
        }
        debug!(%out, %input, %from, %to, "ports connected");
        Ok(())
    }

    fn set_link(&mut self, port: PortId, peer: Option<PortId>) {
        if let Some(p) = self.ports.get_mut(&port) {
            p.link = peer;
        }
    }

    /// Unlinks `port` from its peer. Unlinking an unlinked port is a no-op.
    pub fn disconnect(&mut self, port: PortId) -> Result<(), ConnectError> {
        let peer = self.get(port)?.link;
        if let Some(peer) = peer {
            self.set_link(port, None);
            self.set_link(peer, None);
            debug!(%port, %peer, "ports disconnected");
        }
        Ok(())
    }

    /// Re-snaps every piece downstream of `start` onto its upstream neighbour.
    ///
    /// `start` itself is not moved.
    pub fn realign_chain(
        &self,
        start: NodeId,
        scene: &mut SceneGraph,
    ) -> Result<(), ConnectError> {
        let mut current = start;
        let mut steps = 0;
        while let Some((out_port, in_port)) = self.linked(current, PortDirection::Out) {
            steps += 1;
            assert!(
                steps <= self.step_limit(),
                "connection graph corrupted: cycle through {start}"
            );
            let upstream = scene
                .world_transform(current)
                .ok_or(ConnectError::UnknownNode(current))?;
            let target = upstream.compose(&out_port.local);
            let world = target.compose(&in_port.local.inverse());
            scene.set_world_transform(in_port.node, world)?;
            current = in_port.node;
        }
        Ok(())
    }

    /// Unlinks and drops every port owned by `nodes`.
    ///
    /// Neighbours keep their ports; only their link is cleared. Returns the removed
    /// port ids.
    pub fn detach_nodes(&mut self, nodes: &[NodeId]) -> Vec<PortId> {
        let mut removed = Vec::new();
        for node in nodes {
            let Some(ids) = self.by_node.remove(node) else {
                continue;
            };
            for id in ids {
                if let Some(port) = self.ports.remove(&id) {
                    if let Some(peer) = port.link.and_then(|l| self.ports.get_mut(&l)) {
                        peer.link = None;
                    }
                    removed.push(id);
                }
            }
        }
        removed
    }
}

/// Iterator returned by [`ConnectionGraph::traverse`].
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    graph: &'a ConnectionGraph,
    next: Option<NodeId>,
    origin: NodeId,
    remaining: usize,
}

impl Iterator for Chain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        assert!(
            self.remaining > 0,
            "connection graph corrupted: cycle through {}",
            self.origin
        );
        self.remaining -= 1;
        self.next = self.graph.next_piece(current);
        Some(current)
    }
}
