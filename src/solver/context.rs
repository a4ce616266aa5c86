//! Read-only view shared by the flux passes of one evaluation.

use super::HydroState;
use crate::config::HydroConfig;
use crate::material::{ChannelMaterial, ChannelShape, LandCover, MaterialTables, SoilProperties};
use crate::mesh::{Element, Mesh, RiverSegment};
use crate::types::{ElementIndex, RiverIndex};

/// Static data plus the clipped state at time `t`.
///
/// Material indices were checked when the system was built, so lookups
/// index the tables directly.
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    pub mesh: &'a Mesh,
    pub tables: &'a MaterialTables,
    pub config: &'a HydroConfig,
    pub state: &'a HydroState,
    pub t: f64,
}

impl<'a> EvalContext<'a> {
    #[inline]
    pub fn element(&self, i: ElementIndex) -> &'a Element {
        self.mesh.element(i)
    }

    #[inline]
    pub fn river(&self, r: RiverIndex) -> &'a RiverSegment {
        self.mesh.river(r)
    }

    #[inline]
    pub fn soil(&self, i: ElementIndex) -> &'a SoilProperties {
        &self.tables.soils[self.element(i).soil]
    }

    #[inline]
    pub fn land_cover(&self, i: ElementIndex) -> &'a LandCover {
        &self.tables.land_covers[self.element(i).land_cover]
    }

    #[inline]
    pub fn shape(&self, r: RiverIndex) -> &'a ChannelShape {
        &self.tables.shapes[self.river(r).shape]
    }

    #[inline]
    pub fn channel(&self, r: RiverIndex) -> &'a ChannelMaterial {
        &self.tables.channel_materials[self.river(r).material]
    }

    /// Macropore-aware horizontal conductivity of an element at its current
    /// groundwater depth.
    #[inline]
    pub fn effective_kh(&self, i: ElementIndex) -> f64 {
        self.soil(i).effective_kh(self.state.groundwater[i])
    }

    /// Channel bed elevation.
    #[inline]
    pub fn z_bed(&self, r: RiverIndex) -> f64 {
        self.river(r).z_bed(self.shape(r))
    }

    #[inline]
    pub fn dry_depth(&self) -> f64 {
        self.config.constants.dry_depth()
    }

    #[inline]
    pub fn slope_floor(&self) -> f64 {
        self.config.constants.slope_floor()
    }
}
