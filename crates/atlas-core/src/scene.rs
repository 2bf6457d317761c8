// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene node tree with weak anchor bindings and draw-order resolution.
use std::collections::{BTreeMap, BTreeSet};

use atlas_geom::Pose;
use thiserror::Error;
use tracing::debug;

use crate::anchor::AnchorEventKind;
use crate::ident::{AnchorId, NodeId};
use crate::store::{AnchorChange, AnchorStore};
use crate::template::{NodeTemplate, TemplateNode};

/// Errors returned by scene graph mutations. The graph is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The node does not exist (never created, or destroyed).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// An anchor binding names an anchor the store does not track.
    #[error("unknown anchor {0}")]
    UnknownAnchor(AnchorId),
    /// Re-parenting would make a node its own ancestor.
    #[error("re-parenting {node} under {parent} would create a cycle")]
    Cycle {
        /// Node being moved.
        node: NodeId,
        /// Requested parent (the node itself or one of its descendants).
        parent: NodeId,
    },
}

/// Mesh and material references handed to the renderer verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderable {
    /// Mesh resource reference.
    pub mesh: String,
    /// Material resource reference.
    pub material: String,
}

impl Renderable {
    /// Creates a renderable.
    pub fn new(mesh: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            material: material.into(),
        }
    }
}

/// Parameters for [`SceneGraph::create_node`].
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Display name.
    pub name: String,
    /// Owning parent; `None` creates a root.
    pub parent: Option<NodeId>,
    /// Local transform (relative to the anchor when bound, else to the parent).
    pub transform: Pose,
    /// Weak binding to an anchor.
    pub anchor: Option<AnchorId>,
    /// Sibling draw order, lower first.
    pub draw_order: i32,
    /// What to draw, if anything.
    pub renderable: Option<Renderable>,
    /// Stay enabled when the bound anchor is removed.
    pub always_visible: bool,
}

impl NodeSpec {
    /// Spec for a root node named `name` at the identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the parent.
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the local transform.
    pub fn with_transform(mut self, transform: Pose) -> Self {
        self.transform = transform;
        self
    }

    /// Binds the node to an anchor.
    pub fn bound_to(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Sets the draw order.
    pub fn with_draw_order(mut self, order: i32) -> Self {
        self.draw_order = order;
        self
    }

    /// Sets the renderable.
    pub fn with_renderable(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    /// Marks the node always visible.
    pub fn always_visible(mut self) -> Self {
        self.always_visible = true;
        self
    }
}

/// A node of the scene tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: NodeId,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Pose,
    anchor: Option<AnchorId>,
    /// Last pose seen for `anchor`; refreshed on every anchor update.
    anchor_pose: Option<Pose>,
    draw_order: i32,
    enabled: bool,
    always_visible: bool,
    renderable: Option<Renderable>,
}

impl SceneNode {
    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order (see [`SceneGraph::children`] for draw order).
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local transform.
    pub fn local_transform(&self) -> Pose {
        self.local
    }

    /// Bound anchor, if any.
    pub fn anchor(&self) -> Option<AnchorId> {
        self.anchor
    }

    /// Draw-order key.
    pub fn draw_order(&self) -> i32 {
        self.draw_order
    }

    /// Enabled flag.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Always-visible override.
    pub fn is_always_visible(&self) -> bool {
        self.always_visible
    }

    /// Renderable, if any.
    pub fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }

    fn sort_key(&self) -> (i32, NodeId) {
        (self.draw_order, self.id)
    }
}

/// One entry of [`SceneGraph::enumerate_visible`].
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem {
    /// Node that produced the item.
    pub node: NodeId,
    /// Mesh reference.
    pub mesh: String,
    /// Material reference.
    pub material: String,
    /// World transform at enumeration time.
    pub world: Pose,
}

/// Strict tree of scene nodes.
///
/// Parents own their children; anchor bindings are ids looked up on demand, so an
/// anchor's disappearance can never leave a dangling reference behind.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, SceneNode>,
    roots: BTreeSet<NodeId>,
    bindings: BTreeMap<AnchorId, BTreeSet<NodeId>>,
    next_id: u64,
}

impl SceneGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Returns `true` if `id` is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterates live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    /// Nodes currently bound to `anchor`.
    pub fn bound_to(&self, anchor: &AnchorId) -> Vec<NodeId> {
        self.bindings
            .get(anchor)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn alloc_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    fn get(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))
    }

    /// Creates a node from `spec`.
    ///
    /// Fails with [`SceneError::UnknownNode`] for a missing parent and
    /// [`SceneError::UnknownAnchor`] when the requested anchor is not tracked.
    pub fn create_node(
        &mut self,
        spec: NodeSpec,
        anchors: &AnchorStore,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = spec.parent {
            self.get(parent)?;
        }
        let anchor_pose = match spec.anchor {
            Some(anchor) => Some(
                anchors
                    .get(&anchor)
                    .ok_or(SceneError::UnknownAnchor(anchor))?
                    .pose,
            ),
            None => None,
        };
        Ok(self.insert(spec, anchor_pose))
    }

    /// Inserts a validated spec.
    fn insert(&mut self, spec: NodeSpec, anchor_pose: Option<Pose>) -> NodeId {
        let id = self.alloc_id();
        let node = SceneNode {
            id,
            name: spec.name,
            parent: spec.parent,
            children: Vec::new(),
            local: spec.transform,
            anchor: spec.anchor,
            anchor_pose,
            draw_order: spec.draw_order,
            enabled: true,
            always_visible: spec.always_visible,
            renderable: spec.renderable,
        };
        self.nodes.insert(id, node);
        self.attach(id, spec.parent);
        if let Some(anchor) = spec.anchor {
            self.bindings.entry(anchor).or_default().insert(id);
        }
        id
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => p.children.push(id),
            None => {
                self.roots.insert(id);
            }
        }
    }

    fn detach_from_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => {
                self.roots.remove(&id);
            }
        }
    }

    /// Returns `true` if `candidate` is `node` or lies below it.
    pub(crate) fn is_self_or_descendant(&self, node: NodeId, candidate: NodeId) -> bool {
        let mut cursor = Some(candidate);
        while let Some(current) = cursor {
            if current == node {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    /// Moves `node` under `new_parent` (or to the root set). The local transform is
    /// kept as-is.
    pub fn reparent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<(), SceneError> {
        let old_parent = self.get(node)?.parent;
        if let Some(parent) = new_parent {
            self.get(parent)?;
            if self.is_self_or_descendant(node, parent) {
                return Err(SceneError::Cycle { node, parent });
            }
        }
        self.detach_from_parent(node, old_parent);
        self.get_mut(node)?.parent = new_parent;
        self.attach(node, new_parent);
        Ok(())
    }

    /// Binds `node` to `anchor`; the local transform becomes relative to the anchor.
    pub fn bind(
        &mut self,
        node: NodeId,
        anchor: AnchorId,
        anchors: &AnchorStore,
    ) -> Result<(), SceneError> {
        let pose = anchors
            .get(&anchor)
            .ok_or(SceneError::UnknownAnchor(anchor))?
            .pose;
        let previous = self.get(node)?.anchor;
        if let Some(prev) = previous {
            self.drop_binding(prev, node);
        }
        let n = self.get_mut(node)?;
        n.anchor = Some(anchor);
        n.anchor_pose = Some(pose);
        self.bindings.entry(anchor).or_default().insert(node);
        Ok(())
    }

    fn drop_binding(&mut self, anchor: AnchorId, node: NodeId) {
        if let Some(set) = self.bindings.get_mut(&anchor) {
            set.remove(&node);
            if set.is_empty() {
                self.bindings.remove(&anchor);
            }
        }
    }

    /// Sets the draw-order key. Pure metadata.
    pub fn set_draw_order(&mut self, node: NodeId, order: i32) -> Result<(), SceneError> {
        self.get_mut(node)?.draw_order = order;
        Ok(())
    }

    /// Sets the enabled flag.
    pub fn set_enabled(&mut self, node: NodeId, enabled: bool) -> Result<(), SceneError> {
        self.get_mut(node)?.enabled = enabled;
        Ok(())
    }

    /// Sets the always-visible override.
    pub fn set_always_visible(&mut self, node: NodeId, value: bool) -> Result<(), SceneError> {
        self.get_mut(node)?.always_visible = value;
        Ok(())
    }

    /// Replaces the local transform.
    pub fn set_local_transform(&mut self, node: NodeId, local: Pose) -> Result<(), SceneError> {
        self.get_mut(node)?.local = local;
        Ok(())
    }

    /// Frame the node's local transform is expressed in.
    fn base_frame(&self, node: &SceneNode) -> Pose {
        match (node.anchor_pose, node.parent) {
            (Some(anchor_pose), _) => anchor_pose,
            (None, Some(parent)) => self.world_transform(parent).unwrap_or_default(),
            (None, None) => Pose::identity(),
        }
    }

    /// World transform of `node`, or `None` if it does not exist.
    pub fn world_transform(&self, node: NodeId) -> Option<Pose> {
        let n = self.nodes.get(&node)?;
        Some(self.base_frame(n).compose(&n.local))
    }

    /// Puts back local transforms saved before a failed multi-node move.
    pub(crate) fn restore_locals(&mut self, saved: &[(NodeId, Pose)]) {
        for (id, local) in saved {
            if let Some(n) = self.nodes.get_mut(id) {
                n.local = *local;
            }
        }
    }

    /// Rewrites the local transform so the node lands on `world`.
    pub fn set_world_transform(&mut self, node: NodeId, world: Pose) -> Result<(), SceneError> {
        let base = self.base_frame(self.get(node)?);
        self.get_mut(node)?.local = base.inverse().compose(&world);
        Ok(())
    }

    /// Reacts to an anchor store change.
    ///
    /// Removal detaches (never destroys) every bound node: the last world pose is
    /// baked into the local transform and the node is disabled unless it is
    /// always-visible. Updates refresh the cached anchor pose. Returns the nodes
    /// that were touched.
    pub(crate) fn on_anchor_changed(&mut self, change: &AnchorChange) -> Vec<NodeId> {
        let bound = self.bound_to(&change.id);
        if bound.is_empty() {
            return bound;
        }
        match (change.kind, &change.anchor) {
            (AnchorEventKind::Removed, _) | (_, None) => {
                self.bindings.remove(&change.id);
                for id in &bound {
                    let Some(world) = self.world_transform(*id) else {
                        continue;
                    };
                    let parent_frame = self
                        .nodes
                        .get(id)
                        .and_then(|n| n.parent)
                        .and_then(|p| self.world_transform(p))
                        .unwrap_or_default();
                    if let Some(n) = self.nodes.get_mut(id) {
                        n.anchor = None;
                        n.anchor_pose = None;
                        n.local = parent_frame.inverse().compose(&world);
                        if !n.always_visible {
                            n.enabled = false;
                        }
                    }
                }
                debug!(
                    anchor = %change.id,
                    detached = bound.len(),
                    "anchor removed; nodes detached"
                );
            }
            (_, Some(anchor)) => {
                for id in &bound {
                    if let Some(n) = self.nodes.get_mut(id) {
                        n.anchor_pose = Some(anchor.pose);
                    }
                }
            }
        }
        bound
    }

    /// `node` followed by all of its descendants, pre-order.
    pub fn subtree(&self, node: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.get(node)?;
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.nodes.get(&id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Removes `node` and its subtree, returning the removed ids.
    ///
    /// Port cleanup is the caller's job (see `World::destroy`), which is why this
    /// is not public.
    pub(crate) fn destroy(&mut self, node: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let doomed = self.subtree(node)?;
        let parent = self.get(node)?.parent;
        self.detach_from_parent(node, parent);
        for id in &doomed {
            if let Some(n) = self.nodes.remove(id) {
                self.roots.remove(id);
                if let Some(anchor) = n.anchor {
                    self.drop_binding(anchor, *id);
                }
            }
        }
        Ok(doomed)
    }

    /// Children of `node` sorted by `(draw_order, creation order)`.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| self.sorted(n.children.iter().copied()))
            .unwrap_or_default()
    }

    /// Roots sorted by `(draw_order, creation order)`.
    pub fn roots(&self) -> Vec<NodeId> {
        self.sorted(self.roots.iter().copied())
    }

    fn sorted(&self, ids: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
        let mut keyed: Vec<_> = ids
            .filter_map(|id| self.nodes.get(&id).map(SceneNode::sort_key))
            .collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, id)| id).collect()
    }

    /// What the renderer should draw, in order.
    ///
    /// Depth-first: parents before children, siblings in non-decreasing draw order
    /// with ties broken by creation order. A disabled node hides its subtree. Only
    /// nodes with a [`Renderable`] produce items.
    pub fn enumerate_visible(&self) -> Vec<VisibleItem> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Pose)> = self
            .roots()
            .into_iter()
            .rev()
            .map(|id| (id, Pose::identity()))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.enabled {
                continue;
            }
            let world = node.anchor_pose.unwrap_or(parent_world).compose(&node.local);
            if let Some(r) = &node.renderable {
                out.push(VisibleItem {
                    node: id,
                    mesh: r.mesh.clone(),
                    material: r.material.clone(),
                    world,
                });
            }
            stack.extend(self.children(id).into_iter().rev().map(|c| (c, world)));
        }
        out
    }

    /// Deep-clones `template` into fresh nodes under a new, unattached root.
    ///
    /// Returns the root id and every created node paired with the template node it
    /// came from, in creation order.
    pub(crate) fn clone_template<'t>(
        &mut self,
        template: &'t NodeTemplate,
    ) -> (NodeId, Vec<(NodeId, &'t TemplateNode)>) {
        let mut created = Vec::with_capacity(template.node_count());
        let mut stack: Vec<(&TemplateNode, Option<NodeId>)> = vec![(template.root(), None)];
        while let Some((tnode, parent)) = stack.pop() {
            let spec = NodeSpec {
                name: tnode.name.clone(),
                parent,
                transform: tnode.transform,
                anchor: None,
                draw_order: tnode.draw_order,
                renderable: tnode.renderable.clone(),
                always_visible: tnode.always_visible,
            };
            let id = self.insert(spec, None);
            created.push((id, tnode));
            stack.extend(tnode.children.iter().rev().map(|c| (c, Some(id))));
        }
        let root = created.first().map(|(id, _)| *id).unwrap_or(NodeId(0));
        (root, created)
    }
}
