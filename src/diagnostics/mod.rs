//! Water-balance diagnostics.
//!
//! Storage volumes and their rates are computed with the same conversion
//! factors the RHS uses, so for any evaluation
//!
//! ```text
//! StorageVolumes::rates(dy).total() == ExternalFluxes::net_inflow()
//! ```
//!
//! up to round-off. [`BalanceTracker`] accumulates this over a run.

mod water_balance;

pub use water_balance::{BalanceTracker, ExternalFluxes, StorageVolumes};
