// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Anchor data model: what the tracking provider tells us about the room.

use atlas_geom::{Extent2, Polygon2, Pose};

use crate::ident::AnchorId;

/// Which kind of thing an anchor tracks. Never changes for a given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnchorKind {
    /// A detected planar surface.
    Plane,
    /// A room with a boundary and sub-surfaces.
    Room,
    /// An arbitrary tracked point in space.
    WorldPoint,
}

/// Orientation of a plane relative to gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneAlignment {
    /// Normal points up or down (floors, tables, ceilings).
    Horizontal,
    /// Normal is perpendicular to gravity (walls, doors, windows).
    Vertical,
}

/// Semantic label attached to a plane by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// Walkable floor.
    Floor,
    /// Wall surface.
    Wall,
    /// Ceiling surface.
    Ceiling,
    /// Table top.
    Table,
    /// Seat surface.
    Seat,
    /// Window pane.
    Window,
    /// Door.
    Door,
    /// Provider could not classify the plane.
    Unknown,
}

/// Geometry of a plane anchor, in the anchor's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    /// Rectangle centered on the anchor pose (width along X, height along Z).
    pub extent: Extent2,
    /// Gravity alignment.
    pub alignment: PlaneAlignment,
    /// Semantic label.
    pub classification: Classification,
}

/// A bounded sub-surface of a room (floor, one wall, ceiling).
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Pose relative to the room anchor.
    pub pose: Pose,
    /// Boundary in the surface's own XZ plane.
    pub boundary: Polygon2,
}

/// Geometry of a room anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomGeometry {
    /// Floor-plan boundary in the room's local XZ plane.
    pub boundary: Polygon2,
    /// Floor surface, when reconstructed.
    pub floor: Option<Surface>,
    /// Wall surfaces in provider order.
    pub walls: Vec<Surface>,
    /// Ceiling surface, when reconstructed.
    pub ceiling: Option<Surface>,
    /// Whether this is the room the user currently occupies. At most one room in a
    /// store carries this flag.
    pub is_primary: bool,
}

/// Kind-specific anchor geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorGeometry {
    /// Plane extent and labels.
    Plane(PlaneGeometry),
    /// Room boundary and surfaces.
    Room(RoomGeometry),
    /// Points carry no geometry beyond their pose.
    WorldPoint,
}

impl AnchorGeometry {
    /// The anchor kind this geometry describes.
    pub fn kind(&self) -> AnchorKind {
        match self {
            Self::Plane(_) => AnchorKind::Plane,
            Self::Room(_) => AnchorKind::Room,
            Self::WorldPoint => AnchorKind::WorldPoint,
        }
    }
}

/// A tracked anchor as last reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Stable identity.
    pub id: AnchorId,
    /// Pose in the shared reference frame.
    pub pose: Pose,
    /// Kind-specific geometry.
    pub geometry: AnchorGeometry,
}

impl Anchor {
    /// Plane anchor.
    pub fn plane(
        id: AnchorId,
        pose: Pose,
        extent: Extent2,
        alignment: PlaneAlignment,
        classification: Classification,
    ) -> Self {
        Self {
            id,
            pose,
            geometry: AnchorGeometry::Plane(PlaneGeometry {
                extent,
                alignment,
                classification,
            }),
        }
    }

    /// Room anchor with a boundary and no reconstructed sub-surfaces.
    pub fn room(id: AnchorId, pose: Pose, boundary: Polygon2, is_primary: bool) -> Self {
        Self {
            id,
            pose,
            geometry: AnchorGeometry::Room(RoomGeometry {
                boundary,
                floor: None,
                walls: Vec::new(),
                ceiling: None,
                is_primary,
            }),
        }
    }

    /// World point anchor.
    pub fn point(id: AnchorId, pose: Pose) -> Self {
        Self {
            id,
            pose,
            geometry: AnchorGeometry::WorldPoint,
        }
    }

    /// Anchor kind.
    pub fn kind(&self) -> AnchorKind {
        self.geometry.kind()
    }

    /// Plane classification; `None` for rooms and points.
    pub fn classification(&self) -> Option<Classification> {
        match &self.geometry {
            AnchorGeometry::Plane(p) => Some(p.classification),
            _ => None,
        }
    }

    /// `true` only for the primary room.
    pub fn is_primary(&self) -> bool {
        matches!(&self.geometry, AnchorGeometry::Room(r) if r.is_primary)
    }

    /// Room geometry, if this is a room.
    pub fn as_room(&self) -> Option<&RoomGeometry> {
        match &self.geometry {
            AnchorGeometry::Room(r) => Some(r),
            _ => None,
        }
    }

    /// Plane geometry, if this is a plane.
    pub fn as_plane(&self) -> Option<&PlaneGeometry> {
        match &self.geometry {
            AnchorGeometry::Plane(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn set_primary(&mut self, primary: bool) {
        if let AnchorGeometry::Room(r) = &mut self.geometry {
            r.is_primary = primary;
        }
    }
}

/// Lifecycle discriminant of an [`AnchorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorEventKind {
    /// First sighting.
    Added,
    /// Pose or geometry changed.
    Updated,
    /// Tracking lost for good.
    Removed,
}

/// One record of the provider's anchor stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorEvent {
    /// A new anchor.
    Added(Anchor),
    /// Replacement pose/geometry for an existing anchor.
    Updated(Anchor),
    /// Removal of an anchor.
    Removed(AnchorId),
}

impl AnchorEvent {
    /// Anchor the event refers to.
    pub fn id(&self) -> AnchorId {
        match self {
            Self::Added(a) | Self::Updated(a) => a.id,
            Self::Removed(id) => *id,
        }
    }

    /// Lifecycle discriminant.
    pub fn kind(&self) -> AnchorEventKind {
        match self {
            Self::Added(_) => AnchorEventKind::Added,
            Self::Updated(_) => AnchorEventKind::Updated,
            Self::Removed(_) => AnchorEventKind::Removed,
        }
    }
}
