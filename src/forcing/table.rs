//! Precipitation and boundary-condition lookups.

use super::{ForcingError, TimeSeries};
use crate::types::{ElementIndex, SeriesIndex};

/// Time-indexed forcing read by the RHS engine.
///
/// Lookups that cannot resolve the requested time must fail; the engine
/// propagates the error to the integrator.
pub trait ForcingProvider: Send + Sync {
    /// Net precipitation reaching the ground on an element (m/s).
    fn net_precipitation(&self, element: ElementIndex, t: f64) -> Result<f64, ForcingError>;

    /// Element boundary value: Dirichlet head (m) or Neumann flux (m³/s).
    fn boundary_value(&self, series: SeriesIndex, t: f64) -> Result<f64, ForcingError>;

    /// River outlet value: Dirichlet stage (m) or Neumann flux (m³/s).
    fn river_boundary_value(&self, series: SeriesIndex, t: f64) -> Result<f64, ForcingError>;
}

/// [`ForcingProvider`] backed by in-memory time series.
#[derive(Clone, Debug, Default)]
pub struct ForcingTable {
    precipitation: Vec<TimeSeries>,
    element_boundaries: Vec<TimeSeries>,
    river_boundaries: Vec<TimeSeries>,
}

impl ForcingTable {
    /// Create a table with no series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-element net precipitation series.
    pub fn with_precipitation(mut self, series: Vec<TimeSeries>) -> Self {
        self.precipitation = series;
        self
    }

    /// The same precipitation series on every element.
    pub fn with_uniform_precipitation(mut self, n_elements: usize, series: TimeSeries) -> Self {
        self.precipitation = vec![series; n_elements];
        self
    }

    /// Element boundary series, addressed by [`SeriesIndex`].
    pub fn with_element_boundaries(mut self, series: Vec<TimeSeries>) -> Self {
        self.element_boundaries = series;
        self
    }

    /// River outlet series, addressed by [`SeriesIndex`].
    pub fn with_river_boundaries(mut self, series: Vec<TimeSeries>) -> Self {
        self.river_boundaries = series;
        self
    }
}

fn lookup(
    table: &[TimeSeries],
    kind: &'static str,
    index: usize,
    t: f64,
) -> Result<f64, ForcingError> {
    table
        .get(index)
        .ok_or(ForcingError::MissingSeries { kind, index })?
        .value_at(t)
}

impl ForcingProvider for ForcingTable {
    fn net_precipitation(&self, element: ElementIndex, t: f64) -> Result<f64, ForcingError> {
        lookup(&self.precipitation, "precipitation", element.get(), t)
    }

    fn boundary_value(&self, series: SeriesIndex, t: f64) -> Result<f64, ForcingError> {
        lookup(&self.element_boundaries, "element boundary", series.get(), t)
    }

    fn river_boundary_value(&self, series: SeriesIndex, t: f64) -> Result<f64, ForcingError> {
        lookup(&self.river_boundaries, "river boundary", series.get(), t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_series_is_error() {
        let table = ForcingTable::new();
        assert_eq!(
            table.boundary_value(SeriesIndex::new(2), 0.0),
            Err(ForcingError::MissingSeries {
                kind: "element boundary",
                index: 2
            })
        );
    }

    #[test]
    fn test_uniform_precipitation() {
        let table =
            ForcingTable::new().with_uniform_precipitation(3, TimeSeries::constant(1.0e-6));
        let p = table.net_precipitation(ElementIndex::new(2), 100.0).unwrap();
        assert!((p - 1.0e-6).abs() < 1e-18);
        assert!(table.net_precipitation(ElementIndex::new(3), 0.0).is_err());
    }
}
