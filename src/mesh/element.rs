//! Triangular control volumes and their edge topology.
//!
//! Edge convention: edge `j` lies opposite vertex `j`, so it joins vertices
//! `(j + 1) % 3` and `(j + 2) % 3`.

use serde::{Deserialize, Serialize};

use super::MeshError;
use crate::types::{ElementIndex, RiverIndex, SeriesIndex};

/// Boundary condition on an element edge at the domain boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementBoundary {
    /// Zero surface and subsurface flux.
    #[default]
    NoFlow,
    /// Prescribed groundwater head (m) from a forcing series.
    Dirichlet(SeriesIndex),
    /// Prescribed flux (m³/s) from a forcing series, applied to both
    /// surface and subsurface legs.
    Neumann(SeriesIndex),
}

impl ElementBoundary {
    /// Resolve a legacy integer boundary code.
    ///
    /// `0` is no-flow, `1` Dirichlet, any other code Neumann. Dirichlet and
    /// Neumann edges need a forcing series.
    pub fn from_code(code: i32, series: Option<SeriesIndex>) -> Result<Self, MeshError> {
        match (code, series) {
            (0, _) => Ok(ElementBoundary::NoFlow),
            (1, Some(s)) => Ok(ElementBoundary::Dirichlet(s)),
            (_, Some(s)) => Ok(ElementBoundary::Neumann(s)),
            (code, None) => Err(MeshError::MissingBoundarySeries { code }),
        }
    }
}

/// What lies across an element edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeNeighbor {
    /// Another element shares the edge.
    Interior(ElementIndex),
    /// A river segment runs along the edge. `opposite` is the element on the
    /// far bank, if any.
    RiverBank {
        river: RiverIndex,
        opposite: Option<ElementIndex>,
    },
    /// Domain boundary.
    Boundary(ElementBoundary),
}

impl Default for EdgeNeighbor {
    fn default() -> Self {
        EdgeNeighbor::Boundary(ElementBoundary::NoFlow)
    }
}

impl EdgeNeighbor {
    /// The element whose state drives element-element exchange across this edge.
    pub fn flux_partner(&self) -> Option<ElementIndex> {
        match *self {
            EdgeNeighbor::Interior(n) => Some(n),
            EdgeNeighbor::RiverBank { opposite, .. } => opposite,
            EdgeNeighbor::Boundary(_) => None,
        }
    }

    /// The river along this edge, if any.
    pub fn river(&self) -> Option<RiverIndex> {
        match *self {
            EdgeNeighbor::RiverBank { river, .. } => Some(river),
            _ => None,
        }
    }
}

/// A triangular element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Centroid (x, y)
    pub centroid: (f64, f64),
    /// Aquifer bottom elevation (m)
    pub z_min: f64,
    /// Ground surface elevation (m)
    pub z_max: f64,
    /// Plan area (m²)
    pub area: f64,
    /// Edge lengths, edge `j` opposite vertex `j` (m)
    pub edge_lengths: [f64; 3],
    /// Points of the 3-point surface gradient stencil, one per edge
    pub stencil: [(f64, f64); 3],
    /// Neighbor across each edge
    pub edges: [EdgeNeighbor; 3],
    /// Soil table index
    pub soil: usize,
    /// Land-cover table index
    pub land_cover: usize,
}

impl Element {
    /// Distance from the circumcenter to edge `j`.
    ///
    /// Used as the Darcy flow length towards a prescribed-head boundary.
    pub fn circumcenter_edge_distance(&self, j: usize) -> f64 {
        let [e0, e1, e2] = self.edge_lengths;
        let radius = e0 * e1 * e2 / (4.0 * self.area);
        let half = self.edge_lengths[j] / 2.0;
        (radius * radius - half * half).max(0.0).sqrt()
    }

    /// Centroid distance to a point.
    #[inline]
    pub fn distance_to(&self, point: (f64, f64)) -> f64 {
        distance(self.centroid, point)
    }

    /// Index of the edge bordering `river`, if any.
    pub fn bank_edge(&self, river: RiverIndex) -> Option<usize> {
        self.edges.iter().position(|e| e.river() == Some(river))
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_triangle() -> Element {
        // Vertices (0,0), (4,0), (0,3): edges opposite each vertex are 5, 3, 4.
        Element {
            centroid: (4.0 / 3.0, 1.0),
            z_min: 0.0,
            z_max: 2.0,
            area: 6.0,
            edge_lengths: [5.0, 3.0, 4.0],
            stencil: [(0.0, 0.0); 3],
            edges: [EdgeNeighbor::default(); 3],
            soil: 0,
            land_cover: 0,
        }
    }

    #[test]
    fn test_boundary_from_code() {
        let s = Some(SeriesIndex::new(2));
        assert_eq!(
            ElementBoundary::from_code(0, None),
            Ok(ElementBoundary::NoFlow)
        );
        assert_eq!(
            ElementBoundary::from_code(1, s),
            Ok(ElementBoundary::Dirichlet(SeriesIndex::new(2)))
        );
        assert_eq!(
            ElementBoundary::from_code(4, s),
            Ok(ElementBoundary::Neumann(SeriesIndex::new(2)))
        );
        assert_eq!(
            ElementBoundary::from_code(1, None),
            Err(MeshError::MissingBoundarySeries { code: 1 })
        );
    }

    #[test]
    fn test_circumcenter_distance_right_triangle() {
        // Circumcenter of a right triangle is the hypotenuse midpoint.
        let e = right_triangle();
        assert!(e.circumcenter_edge_distance(0).abs() < 1e-12);
        assert!((e.circumcenter_edge_distance(1) - 2.0).abs() < 1e-12);
        assert!((e.circumcenter_edge_distance(2) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_bank_edge_lookup() {
        let mut e = right_triangle();
        e.edges[2] = EdgeNeighbor::RiverBank {
            river: RiverIndex::new(7),
            opposite: None,
        };
        assert_eq!(e.bank_edge(RiverIndex::new(7)), Some(2));
        assert_eq!(e.bank_edge(RiverIndex::new(1)), None);
        assert_eq!(e.edges[2].flux_partner(), None);
    }
}
