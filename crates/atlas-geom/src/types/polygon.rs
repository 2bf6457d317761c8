// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::EPSILON;

/// Closed polygon in a local XZ plane; vertices are `[x, z]` pairs in metres.
///
/// The closing edge (last → first vertex) is implicit. Winding order does not
/// matter for containment.
///
/// Invariants:
/// - Polygons with fewer than three vertices are degenerate and contain nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon2 {
    vertices: Vec<[f32; 2]>,
}

impl Polygon2 {
    /// Builds a polygon from `[x, z]` vertices.
    #[must_use]
    pub fn new(vertices: Vec<[f32; 2]>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle centered on the local origin.
    #[must_use]
    pub fn rectangle(width: f32, depth: f32) -> Self {
        let hx = width * 0.5;
        let hz = depth * 0.5;
        Self::new(vec![[-hx, -hz], [hx, -hz], [hx, hz], [-hx, hz]])
    }

    /// Vertex list.
    #[must_use]
    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    /// Returns `true` if the polygon has at least three vertices.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Iterates edges as `(start, end)` pairs including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = ([f32; 2], [f32; 2])> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Minimum and maximum corners of the bounding rectangle, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<([f32; 2], [f32; 2])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (
                [lo[0].min(v[0]), lo[1].min(v[1])],
                [hi[0].max(v[0]), hi[1].max(v[1])],
            )
        }))
    }

    /// Unsigned area (shoelace formula).
    #[must_use]
    pub fn area(&self) -> f32 {
        let twice: f32 = self
            .edges()
            .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
            .sum();
        twice.abs() * 0.5
    }

    /// Point-in-polygon test for `[x, z]`.
    ///
    /// Points within `EPSILON` of an edge or vertex count as inside, so the answer
    /// for boundary points never depends on floating-point crossing parity.
    /// Everything else uses the even-odd crossing rule.
    #[must_use]
    pub fn contains(&self, point: [f32; 2]) -> bool {
        if !self.is_closed() {
            return false;
        }
        if self.edges().any(|(a, b)| on_segment(point, a, b)) {
            return true;
        }
        let [px, pz] = point;
        let mut inside = false;
        for (a, b) in self.edges() {
            let straddles = (a[1] > pz) != (b[1] > pz);
            if straddles {
                let x_cross = a[0] + (pz - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn on_segment(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> bool {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq <= EPSILON * EPSILON {
        0.0
    } else {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    };
    let closest = [a[0] + ab[0] * t, a[1] + ab[1] * t];
    let dx = p[0] - closest[0];
    let dz = p[1] - closest[1];
    dx * dx + dz * dz <= EPSILON * EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = Polygon2::new(vec![[0.0, 0.0], [1.0, 0.0]]);
        assert!(!line.contains([0.5, 0.0]));
    }

    #[test]
    fn area_of_rectangle() {
        assert!((Polygon2::rectangle(4.0, 3.0).area() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn concave_notch_is_outside() {
        // U-shape: notch between x=1..2 above z=1
        let u = Polygon2::new(vec![
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
        ]);
        assert!(!u.contains([1.5, 2.0]));
        assert!(u.contains([0.5, 2.0]));
        assert!(u.contains([2.5, 2.5]));
    }
}
