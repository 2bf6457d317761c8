// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use blake3::Hasher;

/// 256-bit hash backing anchor identities.
pub type Hash = [u8; 32];

/// Stable identifier for a tracked anchor.
///
/// Tracking providers hand out opaque string handles; [`make_anchor_id`] maps them
/// onto a fixed-width, totally ordered id so that spatial queries can break ties
/// deterministically ("lowest id wins").
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AnchorId(pub Hash);

impl AnchorId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 8 bytes are plenty to tell anchors apart in logs.
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

/// Produces a stable, domain-separated anchor identifier (prefix `b"anchor:"`).
pub fn make_anchor_id(label: &str) -> AnchorId {
    let mut hasher = Hasher::new();
    hasher.update(b"anchor:");
    hasher.update(label.as_bytes());
    AnchorId(hasher.finalize().into())
}

/// Identifier for a scene node.
///
/// Allocated from a monotonically increasing counter and never reused, so id
/// order is creation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifier for a connect port.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PortId(pub u64);

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port#{}", self.0)
    }
}
