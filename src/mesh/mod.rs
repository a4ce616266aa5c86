//! Geometry and topology of the watershed.
//!
//! - [`Element`]: triangular control volume with per-edge neighbor tags
//! - [`RiverSegment`]: channel reach with bank elements and downstream link
//! - [`Mesh`]: validated store of both
//! - [`MeshBuilder`]: assembles a [`Mesh`] from nodes, triangles and reaches

mod builder;
mod element;
mod river;
mod topology;

pub use builder::{MeshBuilder, Node, ReachDownstream};
pub use element::{EdgeNeighbor, Element, ElementBoundary, distance};
pub use river::{BankSide, Downstream, RiverBoundary, RiverOutlet, RiverSegment};
pub use topology::Mesh;

use thiserror::Error;

use crate::material::MaterialError;
use crate::types::{ElementIndex, RiverIndex};

/// Errors in mesh and channel-network setup.
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("Unknown river boundary code: {0}")]
    UnknownRiverBoundary(i32),

    #[error("Boundary code {code} requires a forcing series")]
    MissingBoundarySeries { code: i32 },

    #[error("Element {element} has zero or invalid area {area}")]
    DegenerateElement { element: ElementIndex, area: f64 },

    #[error("Element {element} refers to invalid neighbor {neighbor}")]
    NeighborOutOfRange {
        element: ElementIndex,
        neighbor: ElementIndex,
    },

    #[error("Element {element} borders unknown river {river}")]
    RiverOutOfRange {
        element: ElementIndex,
        river: RiverIndex,
    },

    #[error("River {river} has unknown bank element {element}")]
    BankOutOfRange {
        river: RiverIndex,
        element: ElementIndex,
    },

    #[error("Bank element {element} of river {river} has no edge along it")]
    MissingBankEdge {
        river: RiverIndex,
        element: ElementIndex,
    },

    #[error("River {river} drains to invalid segment {downstream}")]
    DownstreamOutOfRange {
        river: RiverIndex,
        downstream: RiverIndex,
    },

    #[error("Channel network starting at {river} never reaches an outlet")]
    DownstreamCycle { river: RiverIndex },

    #[error("Node index {node} out of range ({n_nodes} nodes)")]
    NodeOutOfRange { node: usize, n_nodes: usize },

    #[error("No element edge joins nodes {0} and {1}")]
    ReachNotOnEdge(usize, usize),

    #[error("Material lookup failed: {0}")]
    Material(#[from] MaterialError),
}
