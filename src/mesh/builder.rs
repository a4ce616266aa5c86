//! Builder for watershed meshes from nodes, triangles and river reaches.
//!
//! # Example
//!
//! ```
//! use watershed_rs::mesh::{MeshBuilder, Node, ReachDownstream, RiverBoundary};
//!
//! let nodes = vec![
//!     Node::new(0.0, 0.0, 0.0, 10.0),
//!     Node::new(100.0, 0.0, 0.0, 9.0),
//!     Node::new(100.0, 100.0, 0.0, 8.0),
//!     Node::new(0.0, 100.0, 0.0, 9.0),
//! ];
//! let mesh = MeshBuilder::new(nodes)
//!     .with_triangle([0, 1, 2], 0, 0)
//!     .with_triangle([0, 2, 3], 0, 0)
//!     .with_reach(0, 2, 0, 0, ReachDownstream::Outlet(RiverBoundary::CriticalDepth))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(mesh.n_elements(), 2);
//! assert_eq!(mesh.n_rivers(), 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    BankSide, Downstream, EdgeNeighbor, Element, ElementBoundary, Mesh, MeshError, RiverBoundary,
    RiverOutlet, RiverSegment, distance,
};
use crate::types::{ElementIndex, RiverIndex};

/// Mesh node with its surface and aquifer-bottom elevations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f64,
    pub y: f64,
    /// Aquifer bottom elevation (m)
    pub z_min: f64,
    /// Ground surface elevation (m)
    pub z_max: f64,
}

impl Node {
    pub fn new(x: f64, y: f64, z_min: f64, z_max: f64) -> Self {
        Self { x, y, z_min, z_max }
    }

    fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Downstream link of a reach added to the builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReachDownstream {
    Segment(RiverIndex),
    /// Outlet at the reach's end node.
    Outlet(RiverBoundary),
}

#[derive(Clone, Debug)]
struct Triangle {
    vertices: [usize; 3],
    soil: usize,
    land_cover: usize,
}

#[derive(Clone, Debug)]
struct Reach {
    from: usize,
    to: usize,
    shape: usize,
    material: usize,
    downstream: ReachDownstream,
}

/// Builder for [`Mesh`].
///
/// Edges without a neighbor default to [`ElementBoundary::NoFlow`]; reaches
/// must run along an existing element edge.
#[derive(Clone, Debug)]
pub struct MeshBuilder {
    nodes: Vec<Node>,
    triangles: Vec<Triangle>,
    boundaries: HashMap<(usize, usize), ElementBoundary>,
    reaches: Vec<Reach>,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Mirror `p` across the line through `a` and `b`.
fn mirror(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let d = (b.0 - a.0, b.1 - a.1);
    let t = ((p.0 - a.0) * d.0 + (p.1 - a.1) * d.1) / (d.0 * d.0 + d.1 * d.1);
    let proj = (a.0 + t * d.0, a.1 + t * d.1);
    (2.0 * proj.0 - p.0, 2.0 * proj.1 - p.1)
}

impl MeshBuilder {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            triangles: Vec::new(),
            boundaries: HashMap::new(),
            reaches: Vec::new(),
        }
    }

    /// Add a triangle over three node indices.
    pub fn with_triangle(mut self, vertices: [usize; 3], soil: usize, land_cover: usize) -> Self {
        self.triangles.push(Triangle {
            vertices,
            soil,
            land_cover,
        });
        self
    }

    /// Set the boundary condition of the domain edge joining two nodes.
    pub fn with_boundary(mut self, a: usize, b: usize, boundary: ElementBoundary) -> Self {
        self.boundaries.insert(edge_key(a, b), boundary);
        self
    }

    /// Add a river reach flowing from node `from` to node `to`.
    ///
    /// Reaches are numbered in insertion order.
    pub fn with_reach(
        mut self,
        from: usize,
        to: usize,
        shape: usize,
        material: usize,
        downstream: ReachDownstream,
    ) -> Self {
        self.reaches.push(Reach {
            from,
            to,
            shape,
            material,
            downstream,
        });
        self
    }

    fn node(&self, i: usize) -> Result<&Node, MeshError> {
        self.nodes.get(i).ok_or(MeshError::NodeOutOfRange {
            node: i,
            n_nodes: self.nodes.len(),
        })
    }

    /// Build and validate the mesh.
    pub fn build(self) -> Result<Mesh, MeshError> {
        let mut elements = Vec::with_capacity(self.triangles.len());
        let mut edge_owners: HashMap<(usize, usize), Vec<(ElementIndex, usize)>> = HashMap::new();

        for (k, tri) in self.triangles.iter().enumerate() {
            let v = [
                *self.node(tri.vertices[0])?,
                *self.node(tri.vertices[1])?,
                *self.node(tri.vertices[2])?,
            ];
            let p = v.map(|n| n.position());

            let cross =
                (p[1].0 - p[0].0) * (p[2].1 - p[0].1) - (p[2].0 - p[0].0) * (p[1].1 - p[0].1);
            let area = 0.5 * cross.abs();
            let centroid = (
                (p[0].0 + p[1].0 + p[2].0) / 3.0,
                (p[0].1 + p[1].1 + p[2].1) / 3.0,
            );
            let edge_lengths =
                std::array::from_fn(|j| distance(p[(j + 1) % 3], p[(j + 2) % 3]));

            for j in 0..3 {
                let key = edge_key(tri.vertices[(j + 1) % 3], tri.vertices[(j + 2) % 3]);
                edge_owners
                    .entry(key)
                    .or_default()
                    .push((ElementIndex::new(k), j));
            }

            elements.push(Element {
                centroid,
                z_min: v.iter().map(|n| n.z_min).sum::<f64>() / 3.0,
                z_max: v.iter().map(|n| n.z_max).sum::<f64>() / 3.0,
                area,
                edge_lengths,
                stencil: [centroid; 3],
                edges: [EdgeNeighbor::default(); 3],
                soil: tri.soil,
                land_cover: tri.land_cover,
            });
        }

        // Neighbors and stencil points
        for (k, tri) in self.triangles.iter().enumerate() {
            for j in 0..3 {
                let a = tri.vertices[(j + 1) % 3];
                let b = tri.vertices[(j + 2) % 3];
                let key = edge_key(a, b);
                let other = edge_owners
                    .get(&key)
                    .and_then(|owners| owners.iter().find(|(e, _)| e.get() != k))
                    .map(|&(e, _)| e);

                match other {
                    Some(n) => {
                        elements[k].edges[j] = EdgeNeighbor::Interior(n);
                        elements[k].stencil[j] = elements[n.get()].centroid;
                    }
                    None => {
                        let boundary = self.boundaries.get(&key).copied().unwrap_or_default();
                        elements[k].edges[j] = EdgeNeighbor::Boundary(boundary);
                        elements[k].stencil[j] = mirror(
                            elements[k].centroid,
                            self.nodes[a].position(),
                            self.nodes[b].position(),
                        );
                    }
                }
            }
        }

        let mut rivers = Vec::with_capacity(self.reaches.len());
        for (r, reach) in self.reaches.iter().enumerate() {
            let river = RiverIndex::new(r);
            let from = *self.node(reach.from)?;
            let to = *self.node(reach.to)?;
            let owners = edge_owners
                .get(&edge_key(reach.from, reach.to))
                .ok_or(MeshError::ReachNotOnEdge(reach.from, reach.to))?;

            let dir = (to.x - from.x, to.y - from.y);
            let mut left = None;
            let mut right = None;
            for &(e, j) in owners {
                let opposite = owners.iter().find(|(o, _)| *o != e).map(|&(o, _)| o);
                let c = elements[e.get()].centroid;
                let cross = dir.0 * (c.1 - from.y) - dir.1 * (c.0 - from.x);
                let side = if cross > 0.0 {
                    BankSide::Left
                } else {
                    BankSide::Right
                };
                match side {
                    BankSide::Left => left = Some(e),
                    BankSide::Right => right = Some(e),
                }
                elements[e.get()].edges[j] = EdgeNeighbor::RiverBank { river, opposite };
            }

            let downstream = match reach.downstream {
                ReachDownstream::Segment(d) => Downstream::Segment(d),
                ReachDownstream::Outlet(boundary) => Downstream::Outlet(RiverOutlet {
                    boundary,
                    node: to.position(),
                    node_z_max: to.z_max,
                }),
            };

            rivers.push(RiverSegment {
                centroid: ((from.x + to.x) / 2.0, (from.y + to.y) / 2.0),
                z_max: (from.z_max + to.z_max) / 2.0,
                z_min: (from.z_min + to.z_min) / 2.0,
                length: distance(from.position(), to.position()),
                left,
                right,
                shape: reach.shape,
                material: reach.material,
                downstream,
            });
        }

        log::debug!(
            "MeshBuilder: {} nodes, {} triangles, {} reaches",
            self.nodes.len(),
            self.triangles.len(),
            self.reaches.len()
        );

        Mesh::new(elements, rivers)
    }
}
