// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `World`: the anchor store, spatial index, scene graph and connection graph
//! wired together so that cascades happen in one place.
use std::sync::Arc;

use atlas_geom::Pose;
use thiserror::Error;
use tracing::{debug, warn};

use crate::anchor::{AnchorEvent, AnchorEventKind};
use crate::connect::{ConnectError, ConnectionGraph, PortDirection};
use crate::ident::{AnchorId, NodeId, PortId};
use crate::scene::{NodeSpec, SceneError, SceneGraph, VisibleItem};
use crate::spatial::{SpatialIndex, DEFAULT_PLACEMENT_PADDING};
use crate::store::{AnchorChange, AnchorError, AnchorFilter, AnchorSnapshot, AnchorStore};
use crate::template::NodeTemplate;

/// Any error a [`World`] operation can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Anchor store rejected an event.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
    /// Scene graph rejected a mutation.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// Connection graph rejected a mutation.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Result of [`World::instantiate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instantiated {
    /// Root of the new subtree (unattached).
    pub root: NodeId,
    /// Every created node, in template pre-order.
    pub nodes: Vec<NodeId>,
    /// Every created port, in template order.
    pub ports: Vec<PortId>,
}

/// The whole mutable engine state.
///
/// Single-threaded by construction; the runtime crate owns one `World` on its
/// writer task and publishes read views from it.
#[derive(Debug, Clone)]
pub struct World {
    anchors: AnchorStore,
    spatial: Arc<SpatialIndex>,
    scene: SceneGraph,
    connections: ConnectionGraph,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Empty world with the default placement padding.
    pub fn new() -> Self {
        Self::with_padding(DEFAULT_PLACEMENT_PADDING)
    }

    /// Empty world whose spatial index uses `padding` for placement queries.
    pub fn with_padding(padding: f32) -> Self {
        Self {
            anchors: AnchorStore::new(),
            spatial: Arc::new(SpatialIndex::with_padding(padding)),
            scene: SceneGraph::new(),
            connections: ConnectionGraph::new(),
        }
    }

    /// Anchor store.
    pub fn anchors(&self) -> &AnchorStore {
        &self.anchors
    }

    /// Current spatial index. Clone the `Arc` to keep a consistent view.
    pub fn spatial(&self) -> &Arc<SpatialIndex> {
        &self.spatial
    }

    /// Scene graph.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mutable scene graph for metadata edits (draw order, flags).
    ///
    /// Pose and hierarchy edits made through it skip chain realignment; use
    /// [`World::set_local_transform`], [`World::reparent`] and [`World::bind`].
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Connection graph.
    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    /// Anchor snapshot at the current version.
    pub fn snapshot(&self, filter: Option<&AnchorFilter>) -> AnchorSnapshot {
        self.anchors.snapshot(filter)
    }

    /// Applies a provider event and cascades it.
    ///
    /// Order: store, then spatial index, then scene bindings, then every chain
    /// running through the subtree of a node whose anchor moved.
    pub fn apply_anchor_event(
        &mut self,
        event: AnchorEvent,
    ) -> Result<AnchorChange, AnchorError> {
        let change = self.anchors.apply(event)?;
        // Readers holding the previous index keep it; we only copy if shared.
        Arc::make_mut(&mut self.spatial).apply_change(&change);
        let touched = self.scene.on_anchor_changed(&change);
        let realigned = if change.kind == AnchorEventKind::Updated {
            self.realign_around(&touched)
        } else {
            Ok(())
        };
        if let Err(err) = realigned {
            warn!(anchor = %change.id, %err, "chain realignment failed after anchor update");
        }
        Ok(change)
    }

    /// Re-snaps every chain that passes through `moved` or their descendants.
    ///
    /// Each chain is walked from its first piece, so a linked piece always ends up
    /// on its upstream Out port, even when its own anchor or parent moved it away.
    fn realign_around(&mut self, moved: &[NodeId]) -> Result<(), ConnectError> {
        let mut starts: Vec<NodeId> = Vec::new();
        for &root in moved {
            for node in self.scene.subtree(root)? {
                let start = self.connections.chain_start(node);
                if !starts.contains(&start) {
                    starts.push(start);
                }
            }
        }
        for start in starts {
            self.connections.realign_chain(start, &mut self.scene)?;
        }
        Ok(())
    }

    /// Creates a scene node.
    pub fn create_node(&mut self, spec: NodeSpec) -> Result<NodeId, SceneError> {
        self.scene.create_node(spec, &self.anchors)
    }

    /// Binds an existing node to an anchor and re-snaps the chains it carries.
    pub fn bind(&mut self, node: NodeId, anchor: AnchorId) -> Result<(), WorldError> {
        self.scene.bind(node, anchor, &self.anchors)?;
        self.realign_around(&[node])?;
        Ok(())
    }

    /// Replaces a node's local transform and drags every chain hanging off its
    /// subtree along. A piece linked downstream of another stays on its upstream
    /// Out port.
    pub fn set_local_transform(&mut self, node: NodeId, local: Pose) -> Result<(), WorldError> {
        self.scene.set_local_transform(node, local)?;
        self.realign_around(&[node])?;
        Ok(())
    }

    /// Moves `node` under `new_parent` (or to the root set), then re-snaps the
    /// chains it carries.
    pub fn reparent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<(), WorldError> {
        self.scene.reparent(node, new_parent)?;
        self.realign_around(&[node])?;
        Ok(())
    }

    /// Destroys `node` and its subtree.
    ///
    /// Ports on the doomed nodes are unlinked and dropped first, so no surviving
    /// port ever points at a destroyed node. Returns the destroyed node ids.
    pub fn destroy(&mut self, node: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let doomed = self.scene.subtree(node)?;
        let ports = self.connections.detach_nodes(&doomed);
        let removed = self.scene.destroy(node)?;
        debug!(%node, nodes = removed.len(), ports = ports.len(), "subtree destroyed");
        Ok(removed)
    }

    /// Adds a connect port to `node`.
    pub fn add_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        tag: impl Into<String>,
        local: Pose,
    ) -> Result<PortId, ConnectError> {
        self.connections
            .add_port(&self.scene, node, direction, tag, local)
    }

    /// Links two ports, snapping the downstream piece into place.
    pub fn connect(&mut self, out: PortId, input: PortId) -> Result<(), ConnectError> {
        self.connections.connect(out, input, &mut self.scene)
    }

    /// Unlinks a port. No-op if already unlinked.
    pub fn disconnect(&mut self, port: PortId) -> Result<(), ConnectError> {
        self.connections.disconnect(port)
    }

    /// Deep-clones a template into fresh nodes and ports.
    pub fn instantiate(&mut self, template: &NodeTemplate) -> Instantiated {
        let (root, created) = self.scene.clone_template(template);
        let mut nodes = Vec::with_capacity(created.len());
        let mut ports = Vec::new();
        for (node, tnode) in created {
            nodes.push(node);
            for port in &tnode.ports {
                ports.push(self.connections.insert_port(
                    node,
                    port.direction,
                    port.tag.clone(),
                    port.local,
                ));
            }
        }
        debug!(
            template = template.name(),
            %root,
            nodes = nodes.len(),
            "template instantiated"
        );
        Instantiated { root, nodes, ports }
    }

    /// Render list; see [`SceneGraph::enumerate_visible`].
    pub fn enumerate_visible(&self) -> Vec<VisibleItem> {
        self.scene.enumerate_visible()
    }
}
