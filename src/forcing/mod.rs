//! External forcing consumed by the RHS engine.
//!
//! The engine never owns forcing data; it reads it through three strategy
//! traits chosen when the [`HydroSystem`](crate::HydroSystem) is built:
//!
//! - [`ForcingProvider`]: precipitation and boundary-condition series
//! - [`EvapotranspirationProvider`]: ET components and partition scheme
//! - [`InfiltrationCapacityProvider`]: frozen-soil style capacity modifiers

mod evapotranspiration;
mod infiltration;
mod table;
mod timeseries;

pub use evapotranspiration::{
    EtComponents, EtScheme, EtSeries, EvapotranspirationProvider, LandSurfaceEt, StandaloneEt,
};
pub use infiltration::{FrozenSoil, InfiltrationCapacityProvider, UnfrozenSoil};
pub use table::{ForcingProvider, ForcingTable};
pub use timeseries::{TimeSeries, TimeSeriesRecord};

use thiserror::Error;

use crate::types::ElementIndex;

/// Errors from forcing lookups.
#[derive(Debug, Error, PartialEq)]
pub enum ForcingError {
    #[error("Time series contains no records")]
    EmptySeries,

    #[error("Non-monotonic time at record {index}")]
    NonMonotonic { index: usize },

    #[error("Time {time} outside series range [{start}, {end}]")]
    OutOfRange { time: f64, start: f64, end: f64 },

    #[error("No {kind} series at index {index}")]
    MissingSeries { kind: &'static str, index: usize },

    #[error("No forcing for element {0}")]
    MissingElement(ElementIndex),
}
