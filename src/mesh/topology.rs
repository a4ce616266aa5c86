//! The validated element/river store.

use serde::{Deserialize, Serialize};

use super::{Downstream, EdgeNeighbor, Element, MeshError, RiverSegment};
use crate::material::MaterialTables;
use crate::types::{ElementIndex, RiverIndex};

/// Elements and river segments of a watershed, with cross references checked.
///
/// Immutable once built; the RHS engine only reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mesh {
    elements: Vec<Element>,
    rivers: Vec<RiverSegment>,
}

impl Mesh {
    /// Create a mesh, validating every index.
    pub fn new(elements: Vec<Element>, rivers: Vec<RiverSegment>) -> Result<Self, MeshError> {
        let mesh = Self { elements, rivers };
        mesh.validate()?;

        let n_bank_edges = mesh
            .elements
            .iter()
            .flat_map(|e| e.edges.iter())
            .filter(|e| e.river().is_some())
            .count();
        log::debug!(
            "Mesh: {} elements, {} river segments, {} river bank edges",
            mesh.n_elements(),
            mesh.n_rivers(),
            n_bank_edges
        );
        Ok(mesh)
    }

    #[inline]
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn n_rivers(&self) -> usize {
        self.rivers.len()
    }

    #[inline]
    pub fn element(&self, i: ElementIndex) -> &Element {
        &self.elements[i]
    }

    #[inline]
    pub fn river(&self, r: RiverIndex) -> &RiverSegment {
        &self.rivers[r]
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn rivers(&self) -> &[RiverSegment] {
        &self.rivers
    }

    /// Check that every material index resolves in `tables`.
    pub fn validate_against(&self, tables: &MaterialTables) -> Result<(), MeshError> {
        for e in &self.elements {
            tables.soil(e.soil)?;
            tables.land_cover(e.land_cover)?;
        }
        for r in &self.rivers {
            tables.shape(r.shape)?;
            tables.channel_material(r.material)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), MeshError> {
        let ne = self.n_elements();
        let nr = self.n_rivers();
        let element_ok = |e: ElementIndex| e.get() < ne;

        for (i, elem) in self.elements.iter().enumerate() {
            let element = ElementIndex::new(i);
            if !(elem.area.is_finite() && elem.area > 0.0) {
                return Err(MeshError::DegenerateElement {
                    element,
                    area: elem.area,
                });
            }
            for edge in &elem.edges {
                match *edge {
                    EdgeNeighbor::Interior(n) => {
                        if !element_ok(n) || n == element {
                            return Err(MeshError::NeighborOutOfRange {
                                element,
                                neighbor: n,
                            });
                        }
                    }
                    EdgeNeighbor::RiverBank { river, opposite } => {
                        if river.get() >= nr {
                            return Err(MeshError::RiverOutOfRange { element, river });
                        }
                        if let Some(n) = opposite.filter(|&n| !element_ok(n) || n == element) {
                            return Err(MeshError::NeighborOutOfRange {
                                element,
                                neighbor: n,
                            });
                        }
                    }
                    EdgeNeighbor::Boundary(_) => {}
                }
            }
        }

        for (r, seg) in self.rivers.iter().enumerate() {
            let river = RiverIndex::new(r);
            for (_, bank) in seg.banks() {
                if !element_ok(bank) {
                    return Err(MeshError::BankOutOfRange {
                        river,
                        element: bank,
                    });
                }
                if self.elements[bank].bank_edge(river).is_none() {
                    return Err(MeshError::MissingBankEdge {
                        river,
                        element: bank,
                    });
                }
            }
            if let Downstream::Segment(down) = seg.downstream {
                if down.get() >= nr || down == river {
                    return Err(MeshError::DownstreamOutOfRange {
                        river,
                        downstream: down,
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Every downstream walk must reach an outlet within `n_rivers` steps.
    fn check_acyclic(&self) -> Result<(), MeshError> {
        let nr = self.n_rivers();
        for start in RiverIndex::iter(nr) {
            let mut current = start;
            let mut steps = 0;
            while let Downstream::Segment(next) = self.rivers[current].downstream {
                steps += 1;
                if steps > nr {
                    return Err(MeshError::DownstreamCycle { river: start });
                }
                current = next;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ElementBoundary, RiverBoundary, RiverOutlet};

    fn element(edges: [EdgeNeighbor; 3]) -> Element {
        Element {
            centroid: (0.0, 0.0),
            z_min: 0.0,
            z_max: 1.0,
            area: 1.0,
            edge_lengths: [1.0, 1.0, 1.0],
            stencil: [(0.0, 0.0); 3],
            edges,
            soil: 0,
            land_cover: 0,
        }
    }

    fn segment(left: Option<ElementIndex>, downstream: Downstream) -> RiverSegment {
        RiverSegment {
            centroid: (0.0, 0.0),
            z_max: 1.0,
            z_min: 0.0,
            length: 1.0,
            left,
            right: None,
            shape: 0,
            material: 0,
            downstream,
        }
    }

    fn outlet() -> Downstream {
        Downstream::Outlet(RiverOutlet {
            boundary: RiverBoundary::CriticalDepth,
            node: (0.0, 0.0),
            node_z_max: 1.0,
        })
    }

    const WALL: EdgeNeighbor = EdgeNeighbor::Boundary(ElementBoundary::NoFlow);

    #[test]
    fn test_rejects_out_of_range_neighbor() {
        let elems = vec![element([
            EdgeNeighbor::Interior(ElementIndex::new(5)),
            WALL,
            WALL,
        ])];
        assert!(matches!(
            Mesh::new(elems, vec![]),
            Err(MeshError::NeighborOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_bank_without_river_edge() {
        let elems = vec![element([WALL; 3])];
        let rivers = vec![segment(Some(ElementIndex::new(0)), outlet())];
        assert_eq!(
            Mesh::new(elems, rivers).err(),
            Some(MeshError::MissingBankEdge {
                river: RiverIndex::new(0),
                element: ElementIndex::new(0)
            })
        );
    }

    #[test]
    fn test_rejects_downstream_cycle() {
        let rivers = vec![
            segment(None, Downstream::Segment(RiverIndex::new(1))),
            segment(None, Downstream::Segment(RiverIndex::new(0))),
        ];
        assert!(matches!(
            Mesh::new(vec![], rivers),
            Err(MeshError::DownstreamCycle { .. })
        ));
    }

    #[test]
    fn test_accepts_bank_with_river_edge() {
        let bank = EdgeNeighbor::RiverBank {
            river: RiverIndex::new(0),
            opposite: None,
        };
        let elems = vec![element([bank, WALL, WALL])];
        let rivers = vec![segment(Some(ElementIndex::new(0)), outlet())];
        let mesh = Mesh::new(elems, rivers).unwrap();
        assert_eq!(mesh.n_elements(), 1);
        assert_eq!(mesh.n_rivers(), 1);
    }

    #[test]
    fn test_validate_against_missing_soil() {
        let mesh = Mesh::new(vec![element([WALL; 3])], vec![]).unwrap();
        assert!(matches!(
            mesh.validate_against(&MaterialTables::new()),
            Err(MeshError::Material(_))
        ));
    }
}
