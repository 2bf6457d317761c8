// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Authoritative anchor state with copy-on-write snapshots.
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::anchor::{Anchor, AnchorEvent, AnchorEventKind, AnchorKind, Classification};
use crate::ident::AnchorId;

/// Errors returned by [`AnchorStore::apply`]. The store is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    /// `Added` for an id that is already tracked.
    #[error("duplicate anchor {0}")]
    DuplicateAnchor(AnchorId),
    /// `Updated`/`Removed` (or a node binding) for an id that is not tracked.
    #[error("unknown anchor {0}")]
    UnknownAnchor(AnchorId),
    /// `Updated` carrying geometry of a different kind.
    #[error("anchor {id} cannot change kind from {from:?} to {to:?}")]
    KindChanged {
        /// Offending anchor.
        id: AnchorId,
        /// Kind on record.
        from: AnchorKind,
        /// Kind in the update.
        to: AnchorKind,
    },
}

/// Change notification produced by every successful [`AnchorStore::apply`].
///
/// Consumers (the spatial index and the scene graph) update themselves from this
/// value alone; they never rescan the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorChange {
    /// What happened.
    pub kind: AnchorEventKind,
    /// Which anchor.
    pub id: AnchorId,
    /// New value; `None` for removals.
    pub anchor: Option<Arc<Anchor>>,
    /// Rooms whose primary flag was cleared as a consequence, with their new values.
    pub demoted: Vec<Arc<Anchor>>,
    /// Store version after the change.
    pub version: u64,
}

type AnchorMap = BTreeMap<AnchorId, Arc<Anchor>>;

/// Owns the set of tracked anchors.
///
/// The map lives behind an `Arc`; [`AnchorStore::snapshot`] hands out clones of it
/// and writers go through `Arc::make_mut`, so a published snapshot is never
/// modified and readers never block writers.
#[derive(Debug, Clone, Default)]
pub struct AnchorStore {
    anchors: Arc<AnchorMap>,
    primary: Option<AnchorId>,
    version: u64,
}

impl AnchorStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// `true` when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Monotonic version, bumped by every successful `apply`.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Looks up an anchor.
    pub fn get(&self, id: &AnchorId) -> Option<&Arc<Anchor>> {
        self.anchors.get(id)
    }

    /// Returns `true` when `id` is tracked.
    pub fn contains(&self, id: &AnchorId) -> bool {
        self.anchors.contains_key(id)
    }

    /// The primary room, if any.
    pub fn primary_room(&self) -> Option<AnchorId> {
        self.primary
    }

    /// Applies one provider event.
    ///
    /// Validation happens before any mutation, so a returned error leaves the store
    /// exactly as it was.
    pub fn apply(&mut self, event: AnchorEvent) -> Result<AnchorChange, AnchorError> {
        let kind = event.kind();
        let id = event.id();
        let (anchor, demoted) = match event {
            AnchorEvent::Added(anchor) => {
                if self.anchors.contains_key(&anchor.id) {
                    return Err(AnchorError::DuplicateAnchor(anchor.id));
                }
                let demoted = self.settle_primary(&anchor);
                let anchor = Arc::new(anchor);
                Arc::make_mut(&mut self.anchors).insert(id, Arc::clone(&anchor));
                (Some(anchor), demoted)
            }
            AnchorEvent::Updated(anchor) => {
                let existing = self
                    .anchors
                    .get(&anchor.id)
                    .ok_or(AnchorError::UnknownAnchor(anchor.id))?;
                if existing.kind() != anchor.kind() {
                    return Err(AnchorError::KindChanged {
                        id: anchor.id,
                        from: existing.kind(),
                        to: anchor.kind(),
                    });
                }
                let demoted = self.settle_primary(&anchor);
                let anchor = Arc::new(anchor);
                Arc::make_mut(&mut self.anchors).insert(id, Arc::clone(&anchor));
                (Some(anchor), demoted)
            }
            AnchorEvent::Removed(id) => {
                if !self.anchors.contains_key(&id) {
                    return Err(AnchorError::UnknownAnchor(id));
                }
                Arc::make_mut(&mut self.anchors).remove(&id);
                if self.primary == Some(id) {
                    self.primary = None;
                }
                (None, Vec::new())
            }
        };
        self.version += 1;
        debug!(anchor = %id, ?kind, version = self.version, "anchor applied");
        Ok(AnchorChange {
            kind,
            id,
            anchor,
            demoted,
            version: self.version,
        })
    }

    /// Updates the primary bookkeeping for an incoming room and demotes the previous
    /// primary when the incoming room claims the flag. Infallible: only called once
    /// the event has been validated.
    fn settle_primary(&mut self, incoming: &Anchor) -> Vec<Arc<Anchor>> {
        if incoming.kind() != AnchorKind::Room {
            return Vec::new();
        }
        if !incoming.is_primary() {
            if self.primary == Some(incoming.id) {
                self.primary = None;
            }
            return Vec::new();
        }
        let previous = self.primary.replace(incoming.id);
        let mut demoted = Vec::new();
        if let Some(prev) = previous.filter(|prev| *prev != incoming.id) {
            let anchors = Arc::make_mut(&mut self.anchors);
            if let Some(slot) = anchors.get_mut(&prev) {
                let mut room = (**slot).clone();
                room.set_primary(false);
                *slot = Arc::new(room);
                demoted.push(Arc::clone(slot));
            }
        }
        demoted
    }

    /// Returns an immutable view of the current anchors, optionally filtered.
    ///
    /// Unfiltered snapshots share the store's map (O(1)); filtered ones copy the
    /// matching `Arc`s.
    pub fn snapshot(&self, filter: Option<&AnchorFilter>) -> AnchorSnapshot {
        let anchors = match filter {
            None => Arc::clone(&self.anchors),
            Some(filter) => Arc::new(
                self.anchors
                    .iter()
                    .filter(|(_, a)| filter.matches(a))
                    .map(|(id, a)| (*id, Arc::clone(a)))
                    .collect(),
            ),
        };
        AnchorSnapshot {
            version: self.version,
            anchors,
        }
    }
}

/// Selects anchors by kind and/or classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorFilter {
    /// Required kind.
    pub kind: Option<AnchorKind>,
    /// Required plane classification (implies `Plane`).
    pub classification: Option<Classification>,
}

impl AnchorFilter {
    /// Matches anchors of `kind`.
    pub fn kind(kind: AnchorKind) -> Self {
        Self {
            kind: Some(kind),
            classification: None,
        }
    }

    /// Matches planes with `classification`.
    pub fn classification(classification: Classification) -> Self {
        Self {
            kind: Some(AnchorKind::Plane),
            classification: Some(classification),
        }
    }

    /// Returns `true` if `anchor` passes the filter.
    pub fn matches(&self, anchor: &Anchor) -> bool {
        self.kind.is_none_or(|k| anchor.kind() == k)
            && self
                .classification
                .is_none_or(|c| anchor.classification() == Some(c))
    }
}

/// Immutable, consistent view of the store at one version.
#[derive(Debug, Clone, Default)]
pub struct AnchorSnapshot {
    version: u64,
    anchors: Arc<AnchorMap>,
}

impl AnchorSnapshot {
    /// Store version the snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Looks up an anchor.
    pub fn get(&self, id: &AnchorId) -> Option<&Arc<Anchor>> {
        self.anchors.get(id)
    }

    /// Iterates anchors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Anchor>> {
        self.anchors.values()
    }

    /// Number of anchors in view.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// `true` when the view is empty.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// The primary room in this view, if any.
    pub fn primary_room(&self) -> Option<&Arc<Anchor>> {
        self.anchors.values().find(|a| a.is_primary())
    }
}
