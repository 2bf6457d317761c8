// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON-lines records accepted by `atlas replay`.
use anyhow::{bail, Result};
use atlas_core::{
    make_anchor_id, Anchor, AnchorEvent, AnchorGeometry, Classification, PlaneAlignment,
    PlaneGeometry, RoomGeometry,
};
use atlas_geom::{Extent2, Polygon2, Pose, Quat, Vec3};
use serde::Deserialize;

/// One line of a replay log.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Record {
    Added(AnchorRecord),
    Updated(AnchorRecord),
    Removed { id: String },
    Place(PlaceRecord),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorRecord {
    pub id: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// `[x, y, z, w]`; normalised on the way in.
    #[serde(default = "identity_orientation")]
    pub orientation: [f32; 4],
    #[serde(flatten)]
    pub geometry: GeometryRecord,
}

fn identity_orientation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeometryRecord {
    Plane {
        extent: [f32; 2],
        #[serde(default)]
        alignment: AlignmentRecord,
        #[serde(default)]
        classification: ClassificationRecord,
    },
    Room {
        boundary: Vec<[f32; 2]>,
        #[serde(default)]
        primary: bool,
    },
    Point,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentRecord {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationRecord {
    Floor,
    Wall,
    Ceiling,
    Table,
    Seat,
    Window,
    Door,
    #[default]
    Unknown,
}

impl From<AlignmentRecord> for PlaneAlignment {
    fn from(value: AlignmentRecord) -> Self {
        match value {
            AlignmentRecord::Horizontal => Self::Horizontal,
            AlignmentRecord::Vertical => Self::Vertical,
        }
    }
}

impl From<ClassificationRecord> for Classification {
    fn from(value: ClassificationRecord) -> Self {
        match value {
            ClassificationRecord::Floor => Self::Floor,
            ClassificationRecord::Wall => Self::Wall,
            ClassificationRecord::Ceiling => Self::Ceiling,
            ClassificationRecord::Table => Self::Table,
            ClassificationRecord::Seat => Self::Seat,
            ClassificationRecord::Window => Self::Window,
            ClassificationRecord::Door => Self::Door,
            ClassificationRecord::Unknown => Self::Unknown,
        }
    }
}

/// Instantiate a template, optionally bound to an anchor and/or chained onto the
/// previously placed piece.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceRecord {
    pub template: String,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub chain: bool,
}

/// What the replay driver does with a record.
#[derive(Debug)]
pub enum Step {
    Anchor(AnchorEvent),
    Place(PlaceRecord),
}

impl Record {
    /// Validates the record and converts it into engine terms.
    pub fn into_step(self) -> Result<Step> {
        Ok(match self {
            Self::Added(anchor) => Step::Anchor(AnchorEvent::Added(anchor.into_anchor()?)),
            Self::Updated(anchor) => Step::Anchor(AnchorEvent::Updated(anchor.into_anchor()?)),
            Self::Removed { id } => Step::Anchor(AnchorEvent::Removed(make_anchor_id(&id))),
            Self::Place(place) => Step::Place(place),
        })
    }
}

impl AnchorRecord {
    fn into_anchor(self) -> Result<Anchor> {
        if self.position.iter().any(|c| !c.is_finite()) {
            bail!("anchor `{}` has a non-finite position", self.id);
        }
        let pose = Pose::new(
            Vec3::from(self.position),
            Quat::from(self.orientation).normalize(),
        );
        let geometry = match self.geometry {
            GeometryRecord::Plane {
                extent,
                alignment,
                classification,
            } => {
                if extent.iter().any(|e| !e.is_finite() || *e < 0.0) {
                    bail!("plane `{}` needs a non-negative extent", self.id);
                }
                AnchorGeometry::Plane(PlaneGeometry {
                    extent: Extent2::new(extent[0], extent[1]),
                    alignment: alignment.into(),
                    classification: classification.into(),
                })
            }
            GeometryRecord::Room { boundary, primary } => {
                if boundary.len() < 3 {
                    bail!("room `{}` needs at least three boundary vertices", self.id);
                }
                AnchorGeometry::Room(RoomGeometry {
                    boundary: Polygon2::new(boundary),
                    floor: None,
                    walls: Vec::new(),
                    ceiling: None,
                    is_primary: primary,
                })
            }
            GeometryRecord::Point => AnchorGeometry::WorldPoint,
        };
        Ok(Anchor {
            id: make_anchor_id(&self.id),
            pose,
            geometry,
        })
    }
}
