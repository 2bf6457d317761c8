// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Derived spatial queries over tracked anchors.
//!
//! The index keeps one precomputed entry per anchor (inverse pose, floor-plan
//! polygon, plane extent) and is maintained from [`AnchorChange`]s: each change
//! touches only the anchors it names, never the whole store.
use std::collections::BTreeMap;
use std::sync::Arc;

use atlas_geom::{Extent2, Polygon2, Pose, Vec3};

use crate::anchor::{Anchor, AnchorEventKind, AnchorGeometry, AnchorKind, Classification};
use crate::ident::AnchorId;
use crate::store::{AnchorChange, AnchorSnapshot};

/// Margin kept free around a placement on a plane, metres.
pub const DEFAULT_PLACEMENT_PADDING: f32 = 0.05;

#[derive(Debug, Clone)]
struct IndexEntry {
    kind: AnchorKind,
    classification: Option<Classification>,
    pose: Pose,
    shape: EntryShape,
}

#[derive(Debug, Clone)]
enum EntryShape {
    Room {
        to_local: Pose,
        boundary: Polygon2,
        bounds: Option<([f32; 2], [f32; 2])>,
        is_primary: bool,
    },
    Plane {
        extent: Extent2,
    },
    Point,
}

impl IndexEntry {
    fn from_anchor(anchor: &Anchor) -> Self {
        let shape = match &anchor.geometry {
            AnchorGeometry::Room(room) => EntryShape::Room {
                to_local: anchor.pose.inverse(),
                bounds: room.boundary.bounds(),
                boundary: room.boundary.clone(),
                is_primary: room.is_primary,
            },
            AnchorGeometry::Plane(plane) => EntryShape::Plane {
                extent: plane.extent,
            },
            AnchorGeometry::WorldPoint => EntryShape::Point,
        };
        Self {
            kind: anchor.kind(),
            classification: anchor.classification(),
            pose: anchor.pose,
            shape,
        }
    }

    fn room_contains(&self, point: &Vec3) -> bool {
        let EntryShape::Room {
            to_local,
            boundary,
            bounds,
            ..
        } = &self.shape
        else {
            return false;
        };
        // Vertical component is dropped: containment is a floor-plan question.
        let local = to_local.transform_point(point);
        let p = [local.x(), local.z()];
        let Some((lo, hi)) = bounds else {
            return false;
        };
        let slack = atlas_geom::EPSILON;
        if p[0] < lo[0] - slack
            || p[0] > hi[0] + slack
            || p[1] < lo[1] - slack
            || p[1] > hi[1] + slack
        {
            return false;
        }
        boundary.contains(p)
    }
}

/// Queryable view over anchors: containment, proximity and placement.
///
/// Cloning is cheap (entries are shared), which is what lets the update loop
/// publish a fresh index after every commit.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    entries: BTreeMap<AnchorId, Arc<IndexEntry>>,
    padding: f32,
    version: u64,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Empty index with [`DEFAULT_PLACEMENT_PADDING`].
    pub fn new() -> Self {
        Self::with_padding(DEFAULT_PLACEMENT_PADDING)
    }

    /// Empty index with a custom placement padding.
    pub fn with_padding(padding: f32) -> Self {
        Self {
            entries: BTreeMap::new(),
            padding: padding.max(0.0),
            version: 0,
        }
    }

    /// Seeds an index from a snapshot. Used once at start-up; afterwards the index
    /// follows [`SpatialIndex::apply_change`].
    pub fn from_snapshot(snapshot: &AnchorSnapshot, padding: f32) -> Self {
        let mut index = Self::with_padding(padding);
        index.entries = snapshot
            .iter()
            .map(|a| (a.id, Arc::new(IndexEntry::from_anchor(a))))
            .collect();
        index.version = snapshot.version();
        index
    }

    /// Folds one store change into the index. O(anchors named by the change).
    pub fn apply_change(&mut self, change: &AnchorChange) {
        match (change.kind, &change.anchor) {
            (AnchorEventKind::Removed, _) | (_, None) => {
                self.entries.remove(&change.id);
            }
            (_, Some(anchor)) => {
                self.entries
                    .insert(anchor.id, Arc::new(IndexEntry::from_anchor(anchor)));
            }
        }
        for room in &change.demoted {
            self.entries
                .insert(room.id, Arc::new(IndexEntry::from_anchor(room)));
        }
        self.version = change.version;
    }

    /// Store version this index reflects.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of indexed anchors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Placement padding in metres.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Returns `true` if `point` lies inside the floor plan of `room`.
    ///
    /// The point is moved into the room's local frame and projected onto local XZ.
    /// Points on the boundary count as inside. Unknown ids and non-room anchors
    /// answer `false`.
    pub fn contains(&self, room: &AnchorId, point: &Vec3) -> bool {
        self.entries
            .get(room)
            .is_some_and(|entry| entry.room_contains(point))
    }

    /// Closest anchor (optionally of `kind`) whose origin is within `max_distance`
    /// of `point`. Equal distances resolve to the lowest id.
    pub fn nearest(
        &self,
        point: &Vec3,
        kind: Option<AnchorKind>,
        max_distance: f32,
    ) -> Option<AnchorId> {
        let mut best: Option<(f32, AnchorId)> = None;
        // BTreeMap iterates in id order, so a strict `<` keeps the lowest id on ties.
        for (id, entry) in &self.entries {
            if kind.is_some_and(|k| k != entry.kind) {
                continue;
            }
            let d = entry.pose.position().distance(point);
            if d > max_distance {
                continue;
            }
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, *id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Centered placement on `plane` for a `width × height` footprint.
    ///
    /// Returns the plane's own pose (its center) when the footprint fits inside the
    /// plane extent shrunk by the padding on every side; `None` otherwise or when
    /// `plane` is not a plane anchor.
    pub fn fits_on(&self, plane: &AnchorId, size: (f32, f32)) -> Option<Pose> {
        let entry = self.entries.get(plane)?;
        let EntryShape::Plane { extent } = &entry.shape else {
            return None;
        };
        extent
            .inset(self.padding)
            .fits(size.0, size.1)
            .then_some(entry.pose)
    }

    /// Every room whose floor plan contains `point`, in id order.
    pub fn rooms_containing(&self, point: &Vec3) -> Vec<AnchorId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.room_contains(point))
            .map(|(id, _)| *id)
            .collect()
    }

    /// The room `point` is in; the primary room wins when rooms overlap, otherwise
    /// the lowest id.
    pub fn room_at(&self, point: &Vec3) -> Option<AnchorId> {
        let rooms = self.rooms_containing(point);
        rooms
            .iter()
            .copied()
            .find(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| matches!(e.shape, EntryShape::Room { is_primary: true, .. }))
            })
            .or_else(|| rooms.first().copied())
    }

    /// Planes carrying `classification`, in id order.
    pub fn planes_classified(&self, classification: Classification) -> Vec<AnchorId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.classification == Some(classification))
            .map(|(id, _)| *id)
            .collect()
    }
}
