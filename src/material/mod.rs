//! Material property tables.
//!
//! Elements and river segments refer to their soil, land-cover, channel
//! shape and channel material by index into these tables. The tables are
//! built once before the run and are read-only afterwards.

mod channel;
mod land_cover;
mod soil;

pub use channel::{ChannelMaterial, ChannelShape, ShapeOrder};
pub use land_cover::LandCover;
pub use soil::{Macropore, MacroporeStatus, SoilProperties};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in material table setup.
#[derive(Debug, Error, PartialEq)]
pub enum MaterialError {
    /// Channel interpolation order outside 1..=3
    #[error("Unknown channel shape interpolation order: {0}")]
    UnknownShapeOrder(i32),

    /// An entity refers to a table entry that does not exist
    #[error("No {table} entry at index {index}")]
    MissingEntry { table: &'static str, index: usize },

    /// A parameter is outside its physical range
    #[error("Invalid {table}[{index}].{name}: {value}")]
    InvalidParameter {
        table: &'static str,
        index: usize,
        name: &'static str,
        value: f64,
    },
}

/// All material tables of a watershed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MaterialTables {
    /// Soil classes
    pub soils: Vec<SoilProperties>,
    /// Land-cover classes
    pub land_covers: Vec<LandCover>,
    /// Channel cross-sections
    pub shapes: Vec<ChannelShape>,
    /// Channel bed materials
    pub channel_materials: Vec<ChannelMaterial>,
}

fn check(
    table: &'static str,
    index: usize,
    name: &'static str,
    value: f64,
    ok: bool,
) -> Result<(), MaterialError> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(MaterialError::InvalidParameter {
            table,
            index,
            name,
            value,
        })
    }
}

impl MaterialTables {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a soil class, returning its index.
    pub fn push_soil(&mut self, soil: SoilProperties) -> usize {
        self.soils.push(soil);
        self.soils.len() - 1
    }

    /// Add a land-cover class, returning its index.
    pub fn push_land_cover(&mut self, land_cover: LandCover) -> usize {
        self.land_covers.push(land_cover);
        self.land_covers.len() - 1
    }

    /// Add a channel shape, returning its index.
    pub fn push_shape(&mut self, shape: ChannelShape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    /// Add a channel material, returning its index.
    pub fn push_channel_material(&mut self, material: ChannelMaterial) -> usize {
        self.channel_materials.push(material);
        self.channel_materials.len() - 1
    }

    /// Look up a soil class.
    pub fn soil(&self, index: usize) -> Result<&SoilProperties, MaterialError> {
        self.soils.get(index).ok_or(MaterialError::MissingEntry {
            table: "soil",
            index,
        })
    }

    /// Look up a land-cover class.
    pub fn land_cover(&self, index: usize) -> Result<&LandCover, MaterialError> {
        self.land_covers.get(index).ok_or(MaterialError::MissingEntry {
            table: "land_cover",
            index,
        })
    }

    /// Look up a channel shape.
    pub fn shape(&self, index: usize) -> Result<&ChannelShape, MaterialError> {
        self.shapes.get(index).ok_or(MaterialError::MissingEntry {
            table: "shape",
            index,
        })
    }

    /// Look up a channel material.
    pub fn channel_material(&self, index: usize) -> Result<&ChannelMaterial, MaterialError> {
        self.channel_materials
            .get(index)
            .ok_or(MaterialError::MissingEntry {
                table: "channel_material",
                index,
            })
    }

    /// Check every entry for physically admissible parameters.
    pub fn validate(&self) -> Result<(), MaterialError> {
        for (i, s) in self.soils.iter().enumerate() {
            check("soil", i, "depth", s.depth, s.depth > 0.0)?;
            check("soil", i, "porosity", s.porosity, s.porosity > 0.0 && s.porosity <= 1.0)?;
            check(
                "soil",
                i,
                "infiltration_depth",
                s.infiltration_depth,
                s.infiltration_depth > 0.0 && s.infiltration_depth < s.depth,
            )?;
            check("soil", i, "k_inf_v", s.k_inf_v, s.k_inf_v >= 0.0)?;
            check("soil", i, "k_sat_v", s.k_sat_v, s.k_sat_v >= 0.0)?;
            check("soil", i, "k_sat_h", s.k_sat_h, s.k_sat_h >= 0.0)?;
            check("soil", i, "alpha", s.alpha, s.alpha > 0.0)?;
            check("soil", i, "beta", s.beta, s.beta > 1.0)?;
            if let Some(mac) = s.macropore {
                check(
                    "soil",
                    i,
                    "macropore.depth",
                    mac.depth,
                    mac.depth > 0.0 && mac.depth < s.depth,
                )?;
                check(
                    "soil",
                    i,
                    "macropore.area_fraction_v",
                    mac.area_fraction_v,
                    (0.0..=1.0).contains(&mac.area_fraction_v),
                )?;
                check(
                    "soil",
                    i,
                    "macropore.area_fraction_h",
                    mac.area_fraction_h,
                    (0.0..=1.0).contains(&mac.area_fraction_h),
                )?;
                check("soil", i, "macropore.k_mac_v", mac.k_mac_v, mac.k_mac_v >= 0.0)?;
                check("soil", i, "macropore.k_mac_h", mac.k_mac_h, mac.k_mac_h >= 0.0)?;
            }
        }

        for (i, lc) in self.land_covers.iter().enumerate() {
            check("land_cover", i, "roughness", lc.roughness, lc.roughness > 0.0)?;
            check(
                "land_cover",
                i,
                "root_zone_depth",
                lc.root_zone_depth,
                lc.root_zone_depth >= 0.0,
            )?;
        }

        for (i, sh) in self.shapes.iter().enumerate() {
            check("shape", i, "depth", sh.depth, sh.depth > 0.0)?;
            check("shape", i, "coefficient", sh.coefficient, sh.coefficient > 0.0)?;
        }

        for (i, m) in self.channel_materials.iter().enumerate() {
            check("channel_material", i, "roughness", m.roughness, m.roughness > 0.0)?;
            check(
                "channel_material",
                i,
                "weir_coefficient",
                m.weir_coefficient,
                m.weir_coefficient >= 0.0,
            )?;
            check("channel_material", i, "k_sat_h", m.k_sat_h, m.k_sat_h >= 0.0)?;
            check("channel_material", i, "k_sat_v", m.k_sat_v, m.k_sat_v >= 0.0)?;
            check(
                "channel_material",
                i,
                "bed_thickness",
                m.bed_thickness,
                m.bed_thickness > 0.0,
            )?;
            check(
                "channel_material",
                i,
                "porosity",
                m.porosity,
                m.porosity > 0.0 && m.porosity <= 1.0,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soil() -> SoilProperties {
        SoilProperties {
            depth: 2.0,
            porosity: 0.4,
            infiltration_depth: 0.1,
            k_inf_v: 1.0e-5,
            k_sat_v: 1.0e-5,
            k_sat_h: 1.0e-5,
            alpha: 2.0,
            beta: 1.5,
            macropore: None,
        }
    }

    #[test]
    fn test_lookup_missing_entry() {
        let tables = MaterialTables::new();
        assert_eq!(
            tables.soil(3).err(),
            Some(MaterialError::MissingEntry {
                table: "soil",
                index: 3
            })
        );
    }

    #[test]
    fn test_validate_accepts_reasonable_tables() {
        let mut tables = MaterialTables::new();
        tables.push_soil(soil());
        tables.push_land_cover(LandCover::new(0.1, 0.5));
        tables.push_shape(ChannelShape::new(1.0, ShapeOrder::Rectangle, 3.0));
        tables.push_channel_material(ChannelMaterial {
            roughness: 0.04,
            weir_coefficient: 0.6,
            k_sat_h: 1.0e-5,
            k_sat_v: 1.0e-6,
            bed_thickness: 0.5,
            porosity: 0.3,
        });
        assert!(tables.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_van_genuchten_beta() {
        let mut tables = MaterialTables::new();
        tables.push_soil(SoilProperties { beta: 1.0, ..soil() });
        assert!(matches!(
            tables.validate(),
            Err(MaterialError::InvalidParameter { name: "beta", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_macropore_deeper_than_soil() {
        let mut tables = MaterialTables::new();
        tables.push_soil(SoilProperties {
            macropore: Some(Macropore {
                k_mac_v: 1.0e-3,
                k_mac_h: 1.0e-3,
                depth: 3.0,
                area_fraction_v: 0.01,
                area_fraction_h: 0.01,
            }),
            ..soil()
        });
        assert!(matches!(
            tables.validate(),
            Err(MaterialError::InvalidParameter {
                name: "macropore.depth",
                ..
            })
        ));
    }
}
