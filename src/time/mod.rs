//! Time integration of the hydrologic system.
//!
//! The RHS engine is solver agnostic: anything implementing [`OdeSystem`]
//! can be stepped. The integrators here cover testing and small runs; a
//! production host would hand [`HydroSystem`](crate::HydroSystem) to its
//! own stiff solver through the same trait.

mod integrator;
mod ode;

pub use integrator::{
    BackwardEuler, ForwardEuler, IntegrationError, Integrator, IntegratorInfo, SSPRK3,
    TimeIntegrator, integrate,
};
pub use ode::OdeSystem;
