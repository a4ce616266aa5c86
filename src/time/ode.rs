//! The `dy/dt = f(t, y)` seam between models and integrators.

use crate::solver::{HydroSystem, RhsError};

/// A first-order ODE system over a flat `f64` state vector.
pub trait OdeSystem {
    /// Length of the state vector.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `f(t, y)` into `dy`.
    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError>;
}

impl OdeSystem for HydroSystem {
    fn len(&self) -> usize {
        HydroSystem::len(self)
    }

    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError> {
        self.evaluate(t, y, dy)
    }
}
