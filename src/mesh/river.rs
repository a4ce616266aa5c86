//! River segments and channel-network outlets.

use serde::{Deserialize, Serialize};

use super::MeshError;
use crate::material::ChannelShape;
use crate::types::{ElementIndex, RiverIndex, SeriesIndex};

/// Boundary condition at a channel-network outlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiverBoundary {
    /// Prescribed outlet stage (m) from a forcing series.
    Dirichlet(SeriesIndex),
    /// Prescribed outflow (m³/s) from a forcing series.
    Neumann(SeriesIndex),
    /// Manning flow driven by the bed slope to the outlet node.
    ZeroDepthGradient,
    /// Critical-depth outflow `A·sqrt(g·stage)`.
    CriticalDepth,
}

impl RiverBoundary {
    /// Resolve a legacy negative downstream code.
    ///
    /// `-1` Dirichlet, `-2` Neumann, `-3` zero depth gradient, `-4` critical
    /// depth. Any other code is a configuration error.
    pub fn from_code(code: i32, series: Option<SeriesIndex>) -> Result<Self, MeshError> {
        match code {
            -1 | -2 => {
                let s = series.ok_or(MeshError::MissingBoundarySeries { code })?;
                Ok(if code == -1 {
                    RiverBoundary::Dirichlet(s)
                } else {
                    RiverBoundary::Neumann(s)
                })
            }
            -3 => Ok(RiverBoundary::ZeroDepthGradient),
            -4 => Ok(RiverBoundary::CriticalDepth),
            _ => Err(MeshError::UnknownRiverBoundary(code)),
        }
    }
}

/// Terminal node of the channel network.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiverOutlet {
    pub boundary: RiverBoundary,
    /// Outlet node position (x, y)
    pub node: (f64, f64),
    /// Bank elevation at the outlet node (m)
    pub node_z_max: f64,
}

/// Where a segment drains to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Downstream {
    Segment(RiverIndex),
    Outlet(RiverOutlet),
}

/// A channel reach between two mesh nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiverSegment {
    /// Reach midpoint (x, y)
    pub centroid: (f64, f64),
    /// Bank elevation (m)
    pub z_max: f64,
    /// Channel aquifer bottom elevation (m)
    pub z_min: f64,
    /// Reach length (m)
    pub length: f64,
    /// Element on the left bank, looking downstream
    pub left: Option<ElementIndex>,
    /// Element on the right bank, looking downstream
    pub right: Option<ElementIndex>,
    /// Channel shape table index
    pub shape: usize,
    /// Channel material table index
    pub material: usize,
    pub downstream: Downstream,
}

impl RiverSegment {
    /// Channel bed elevation for the given cross-section.
    #[inline]
    pub fn z_bed(&self, shape: &ChannelShape) -> f64 {
        self.z_max - shape.depth
    }

    /// Both bank elements with their side, left first.
    pub fn banks(&self) -> impl Iterator<Item = (BankSide, ElementIndex)> {
        [
            self.left.map(|e| (BankSide::Left, e)),
            self.right.map(|e| (BankSide::Right, e)),
        ]
        .into_iter()
        .flatten()
    }

    /// The bank element on `side`.
    pub fn bank(&self, side: BankSide) -> Option<ElementIndex> {
        match side {
            BankSide::Left => self.left,
            BankSide::Right => self.right,
        }
    }
}

/// River bank side, looking downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankSide {
    Left,
    Right,
}

impl BankSide {
    /// The other bank.
    pub fn opposite(self) -> Self {
        match self {
            BankSide::Left => BankSide::Right,
            BankSide::Right => BankSide::Left,
        }
    }
}
