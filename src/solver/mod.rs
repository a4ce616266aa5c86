//! Right-hand-side evaluation for the coupled surface, subsurface and
//! channel system.
//!
//! See [`StateLayout`] for the packing of the state vector.
//!
//! Fluxes are volumetric (m³/s), positive out of the control volume that
//! owns them.

mod assembly;
mod context;
mod error;
pub mod flow_laws;
mod fluxes;
mod lateral;
mod river;
mod state;
mod system;
mod vertical;

pub(crate) use context::EvalContext;
pub use error::{Entity, RhsError, StateComponent};
pub use fluxes::{ElementFluxes, FluxLeg, MacroporeMemory, RiverFluxes, VerticalFluxes};
pub use state::{HydroState, StateLayout};
pub use system::{HydroSystem, HydroSystemBuilder};
pub use vertical::ElementForcing;
