//! Evapotranspiration strategies.
//!
//! The RHS engine routes the three ET components to different storages
//! depending on the active [`EtScheme`]:
//!
//! | Scheme        | Soil evaporation              | Transpiration                         |
//! |---------------|-------------------------------|---------------------------------------|
//! | `Standalone`  | surface if ponded, else soil  | groundwater if roots reach it         |
//! | `LandSurface` | top storage of active regime  | split by `transpiration_from_saturated` |
//!
//! Canopy evaporation is already removed from net precipitation and is only
//! reported.

use serde::{Deserialize, Serialize};

use super::{ForcingError, TimeSeries};
use crate::types::ElementIndex;

/// Evapotranspiration components on one element (m/s).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EtComponents {
    pub canopy: f64,
    pub transpiration: f64,
    pub soil: f64,
}

/// How ET components are partitioned among storages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtScheme {
    #[default]
    Standalone,
    LandSurface,
}

/// Source of evapotranspiration terms.
pub trait EvapotranspirationProvider: Send + Sync {
    fn scheme(&self) -> EtScheme;

    fn components(&self, element: ElementIndex, t: f64) -> Result<EtComponents, ForcingError>;

    /// Fraction of transpiration drawn from the saturated zone (land-surface scheme).
    fn transpiration_from_saturated(&self, _element: ElementIndex) -> f64 {
        0.0
    }
}

/// Per-element ET component series.
#[derive(Clone, Debug, PartialEq)]
pub struct EtSeries {
    pub canopy: TimeSeries,
    pub transpiration: TimeSeries,
    pub soil: TimeSeries,
}

impl EtSeries {
    /// Constant components.
    pub fn constant(components: EtComponents) -> Self {
        Self {
            canopy: TimeSeries::constant(components.canopy),
            transpiration: TimeSeries::constant(components.transpiration),
            soil: TimeSeries::constant(components.soil),
        }
    }
}

/// ET read from time series, partitioned with the standalone scheme.
#[derive(Clone, Debug, Default)]
pub struct StandaloneEt {
    series: Vec<EtSeries>,
}

impl StandaloneEt {
    pub fn new(series: Vec<EtSeries>) -> Self {
        Self { series }
    }

    /// Zero ET on `n_elements` elements.
    pub fn zero(n_elements: usize) -> Self {
        Self::uniform(n_elements, EtComponents::default())
    }

    /// The same constant components on every element.
    pub fn uniform(n_elements: usize, components: EtComponents) -> Self {
        Self {
            series: vec![EtSeries::constant(components); n_elements],
        }
    }
}

impl EvapotranspirationProvider for StandaloneEt {
    fn scheme(&self) -> EtScheme {
        EtScheme::Standalone
    }

    fn components(&self, element: ElementIndex, t: f64) -> Result<EtComponents, ForcingError> {
        let s = self
            .series
            .get(element.get())
            .ok_or(ForcingError::MissingElement(element))?;
        Ok(EtComponents {
            canopy: s.canopy.value_at(t)?,
            transpiration: s.transpiration.value_at(t)?,
            soil: s.soil.value_at(t)?,
        })
    }
}

/// ET fields written by an external land-surface model between RHS batches.
#[derive(Clone, Debug, Default)]
pub struct LandSurfaceEt {
    components: Vec<EtComponents>,
    saturated_fraction: Vec<f64>,
}

impl LandSurfaceEt {
    /// Zero fields on `n_elements` elements.
    pub fn new(n_elements: usize) -> Self {
        Self {
            components: vec![EtComponents::default(); n_elements],
            saturated_fraction: vec![0.0; n_elements],
        }
    }

    /// Overwrite one element's fields. The fraction is clamped to `[0, 1]`.
    pub fn set(
        &mut self,
        element: ElementIndex,
        components: EtComponents,
        transpiration_from_saturated: f64,
    ) -> Result<(), ForcingError> {
        let i = element.get();
        if i >= self.components.len() {
            return Err(ForcingError::MissingElement(element));
        }
        self.components[i] = components;
        self.saturated_fraction[i] = transpiration_from_saturated.clamp(0.0, 1.0);
        Ok(())
    }
}

impl EvapotranspirationProvider for LandSurfaceEt {
    fn scheme(&self) -> EtScheme {
        EtScheme::LandSurface
    }

    fn components(&self, element: ElementIndex, _t: f64) -> Result<EtComponents, ForcingError> {
        self.components
            .get(element.get())
            .copied()
            .ok_or(ForcingError::MissingElement(element))
    }

    fn transpiration_from_saturated(&self, element: ElementIndex) -> f64 {
        self.saturated_fraction
            .get(element.get())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_series() {
        let et = StandaloneEt::uniform(
            2,
            EtComponents {
                canopy: 0.0,
                transpiration: 2.0e-8,
                soil: 1.0e-8,
            },
        );
        assert_eq!(et.scheme(), EtScheme::Standalone);
        let c = et.components(ElementIndex::new(1), 0.0).unwrap();
        assert!((c.transpiration - 2.0e-8).abs() < 1e-20);
        assert!(et.components(ElementIndex::new(2), 0.0).is_err());
    }

    #[test]
    fn test_land_surface_fields() {
        let mut et = LandSurfaceEt::new(1);
        let c = EtComponents {
            canopy: 1.0e-9,
            transpiration: 3.0e-8,
            soil: 0.0,
        };
        et.set(ElementIndex::new(0), c, 1.5).unwrap();
        assert_eq!(et.components(ElementIndex::new(0), 7.0), Ok(c));
        assert_eq!(et.transpiration_from_saturated(ElementIndex::new(0)), 1.0);
        assert!(et.set(ElementIndex::new(1), c, 0.0).is_err());
    }
}
