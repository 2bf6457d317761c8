// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON template format.
//!
//! Poses are written as `position: [x, y, z]` and `orientation: [x, y, z, w]`,
//! both optional (origin / identity). Orientations are normalized on decode.
use atlas_core::{NodeTemplate, PortDirection, Renderable, TemplateNode, TemplatePort};
use atlas_geom::{Pose, Quat, Vec3, EPSILON};
use serde::Deserialize;

use crate::error::TemplateLoadError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateDoc {
    #[serde(default)]
    name: Option<String>,
    root: NodeDoc,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDoc {
    name: String,
    #[serde(default)]
    position: [f32; 3],
    #[serde(default = "identity_orientation")]
    orientation: [f32; 4],
    #[serde(default)]
    draw_order: i32,
    #[serde(default)]
    renderable: Option<RenderableDoc>,
    #[serde(default)]
    always_visible: bool,
    #[serde(default)]
    ports: Vec<PortDoc>,
    #[serde(default)]
    children: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenderableDoc {
    mesh: String,
    material: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DirectionDoc {
    In,
    Out,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PortDoc {
    direction: DirectionDoc,
    tag: String,
    #[serde(default)]
    position: [f32; 3],
    #[serde(default = "identity_orientation")]
    orientation: [f32; 4],
}

fn identity_orientation() -> [f32; 4] {
    Quat::identity().to_array()
}

/// Decodes the template stored under `name`.
///
/// A document may repeat its own name; if it does, it must match `name`.
pub fn decode_template(name: &str, bytes: &[u8]) -> Result<NodeTemplate, TemplateLoadError> {
    let decode_err = |reason: String| TemplateLoadError::Decode {
        name: name.to_owned(),
        reason,
    };
    let doc: TemplateDoc = serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
    if let Some(declared) = doc.name.as_deref() {
        if declared != name {
            return Err(decode_err(format!("document declares name `{declared}`")));
        }
    }
    let root = node_from_doc(doc.root).map_err(decode_err)?;
    Ok(NodeTemplate::new(name, root))
}

fn node_from_doc(doc: NodeDoc) -> Result<TemplateNode, String> {
    let transform = pose_from(doc.position, doc.orientation)
        .map_err(|reason| format!("node `{}`: {reason}", doc.name))?;
    let ports = doc
        .ports
        .into_iter()
        .map(|p| {
            let local = pose_from(p.position, p.orientation)
                .map_err(|reason| format!("port `{}` on `{}`: {reason}", p.tag, doc.name))?;
            Ok(TemplatePort {
                direction: match p.direction {
                    DirectionDoc::In => PortDirection::In,
                    DirectionDoc::Out => PortDirection::Out,
                },
                tag: p.tag,
                local,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    let children = doc
        .children
        .into_iter()
        .map(node_from_doc)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TemplateNode {
        name: doc.name,
        transform,
        draw_order: doc.draw_order,
        renderable: doc.renderable.map(|r| Renderable::new(r.mesh, r.material)),
        always_visible: doc.always_visible,
        ports,
        children,
    })
}

fn pose_from(position: [f32; 3], orientation: [f32; 4]) -> Result<Pose, String> {
    if !position.iter().chain(orientation.iter()).all(|c| c.is_finite()) {
        return Err("non-finite pose component".to_owned());
    }
    let q = Quat::from(orientation);
    let len_sq: f32 = orientation.iter().map(|c| c * c).sum();
    if len_sq <= EPSILON {
        return Err("zero-length orientation".to_owned());
    }
    Ok(Pose::new(Vec3::from(position), q.normalize()))
}
