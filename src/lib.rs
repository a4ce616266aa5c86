//! # watershed-rs
//!
//! Right-hand-side engine for a distributed watershed model on an
//! unstructured triangular mesh coupled to a channel network.
//!
//! Each triangle carries three storages (surface ponding, unsaturated
//! zone, groundwater) and each river segment two (stage and the aquifer
//! under its bed). Given a time and a state vector, [`HydroSystem`]
//! computes the time derivative of every storage from:
//!
//! - Overland flow between elements (kinematic or diffusion wave)
//! - Darcy groundwater flow between elements
//! - Infiltration and recharge with perched and deep regimes, including
//!   macropore pathways
//! - Channel routing between river segments and through outlets
//! - Overbank weir exchange and bank/bed seepage between rivers and
//!   elements
//! - External forcing: precipitation, evapotranspiration, boundary series
//!
//! The engine does not integrate in time itself; [`time`] provides a few
//! integrators over the [`time::OdeSystem`] trait for tests and small
//! runs.
//!
//! ## Modules
//!
//! | Module          | Contents                                          |
//! |-----------------|---------------------------------------------------|
//! | [`config`]      | evaluation settings and physical constants        |
//! | [`types`]       | typed element, river and series indices           |
//! | [`material`]    | soil, land-cover and channel parameter tables     |
//! | [`mesh`]        | elements, river segments, builder and validation  |
//! | [`forcing`]     | time series and forcing provider traits           |
//! | [`solver`]      | flux passes, state layout, [`HydroSystem`]        |
//! | [`time`]        | explicit and implicit integrators                 |
//! | [`diagnostics`] | storage volumes and water-balance tracking        |

pub mod config;
pub mod diagnostics;
pub mod forcing;
pub mod material;
pub mod mesh;
pub mod solver;
pub mod time;
pub mod types;

// Re-export main types for convenience
pub use config::{ChannelRouting, HydroConfig, HydroConstants, SurfaceRouting};
pub use diagnostics::{BalanceTracker, ExternalFluxes, StorageVolumes};
pub use forcing::{
    EtScheme, EvapotranspirationProvider, ForcingProvider, ForcingTable,
    InfiltrationCapacityProvider, TimeSeries,
};
pub use material::MaterialTables;
pub use mesh::{Mesh, MeshBuilder, MeshError};
pub use solver::{HydroState, HydroSystem, RhsError, StateLayout};
pub use time::{BackwardEuler, OdeSystem, TimeIntegrator, integrate};
pub use types::{ElementIndex, RiverIndex, SeriesIndex};
