// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable node templates (prototype subtrees) for modular pieces.

use atlas_geom::Pose;

use crate::connect::PortDirection;
use crate::scene::Renderable;

/// Port declared on a template node.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePort {
    /// In or Out.
    pub direction: PortDirection,
    /// Type tag that must match the peer's.
    pub tag: String,
    /// Pose relative to the owning node.
    pub local: Pose,
}

/// One node of a template subtree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateNode {
    /// Node name.
    pub name: String,
    /// Local transform relative to the template parent.
    pub transform: Pose,
    /// Sibling draw order.
    pub draw_order: i32,
    /// Mesh/material, if the node draws anything.
    pub renderable: Option<Renderable>,
    /// Keeps the node visible even when its anchor goes away.
    pub always_visible: bool,
    /// Connect ports.
    pub ports: Vec<TemplatePort>,
    /// Children in declaration order.
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// A named, immutable prototype subtree.
///
/// Fields are private: once loaded, a template is only ever read and cloned.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    name: String,
    root: TemplateNode,
}

impl NodeTemplate {
    /// Wraps a decoded subtree.
    pub fn new(name: impl Into<String>, root: TemplateNode) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// Template name (cache key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the prototype subtree.
    pub fn root(&self) -> &TemplateNode {
        &self.root
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.root.subtree_len()
    }
}
