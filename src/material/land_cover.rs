//! Land-cover parameters used by the flux laws.

use serde::{Deserialize, Serialize};

/// Surface parameters of one land-cover class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandCover {
    /// Manning roughness for overland flow (s/m^(1/3))
    pub roughness: f64,
    /// Depth of the root zone (m)
    pub root_zone_depth: f64,
}

impl LandCover {
    /// Create a land-cover class.
    pub fn new(roughness: f64, root_zone_depth: f64) -> Self {
        Self {
            roughness,
            root_zone_depth,
        }
    }
}
