//! Time integrators over [`OdeSystem`].
//!
//! | Integrator        | Order | Kind     | RHS calls per step        |
//! |-------------------|-------|----------|---------------------------|
//! | [`ForwardEuler`]  | 1     | explicit | 1                         |
//! | [`SSPRK3`]        | 3     | explicit | 3                         |
//! | [`BackwardEuler`] | 1     | implicit | `(n + 1)` per Newton iter |
//!
//! The hydrologic system is stiff wherever thin ponding meets steep
//! terrain, so [`BackwardEuler`] is the one to use beyond toy meshes. It
//! solves each step with Newton's method on a finite-difference Jacobian
//! and halves the step when Newton fails.
//!
//! # Example
//! ```
//! use watershed_rs::solver::RhsError;
//! use watershed_rs::time::{BackwardEuler, OdeSystem, integrate};
//!
//! // dy/dt = -y
//! struct Decay;
//! impl OdeSystem for Decay {
//!     fn len(&self) -> usize { 1 }
//!     fn rhs(&mut self, _t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError> {
//!         dy[0] = -y[0];
//!         Ok(())
//!     }
//! }
//!
//! let mut y = vec![1.0];
//! integrate(&BackwardEuler::default(), &mut Decay, &mut y, 0.0, 1.0, 0.1).unwrap();
//! assert!((y[0] - (-1.0f64).exp()).abs() < 0.05);
//! ```

use faer::{Mat, linalg::solvers::Solve};
use thiserror::Error;

use super::OdeSystem;
use crate::solver::RhsError;

/// Errors from advancing a system in time.
#[derive(Debug, Error, PartialEq)]
pub enum IntegrationError {
    #[error(transparent)]
    Rhs(#[from] RhsError),

    #[error("Invalid time step {0}")]
    InvalidStep(f64),

    #[error("Newton iteration did not converge at t = {time} after {halvings} step halvings")]
    NoConvergence { time: f64, halvings: usize },
}

// =============================================================================
// Traits
// =============================================================================

/// Non-generic information about an integrator.
pub trait IntegratorInfo: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Order of accuracy.
    fn order(&self) -> usize;

    fn is_implicit(&self) -> bool;
}

/// Advance a state vector by one step.
pub trait TimeIntegrator: IntegratorInfo {
    /// Advance `y` from `t` to `t + dt`.
    ///
    /// On error `y` holds the last accepted state.
    fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t: f64,
        dt: f64,
    ) -> Result<(), IntegrationError>;
}

fn check_step(dt: f64) -> Result<(), IntegrationError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(IntegrationError::InvalidStep(dt))
    }
}

#[inline]
fn axpy(y: &mut [f64], c: f64, x: &[f64]) {
    for (a, b) in y.iter_mut().zip(x) {
        *a += c * b;
    }
}

// =============================================================================
// Explicit integrators
// =============================================================================

/// First-order explicit Euler.
///
/// Only stable for tiny steps on this system; kept for tests and debugging.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl IntegratorInfo for ForwardEuler {
    fn name(&self) -> &'static str {
        "forward-euler"
    }

    fn order(&self) -> usize {
        1
    }

    fn is_implicit(&self) -> bool {
        false
    }
}

impl TimeIntegrator for ForwardEuler {
    fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t: f64,
        dt: f64,
    ) -> Result<(), IntegrationError> {
        check_step(dt)?;
        let mut dy = vec![0.0; y.len()];
        system.rhs(t, y, &mut dy)?;
        axpy(y, dt, &dy);
        Ok(())
    }
}

/// Strong-stability-preserving Runge-Kutta, third order (Shu-Osher form).
///
/// ```text
/// u1 = u + dt * L(u, t)
/// u2 = 3/4 * u + 1/4 * u1 + 1/4 * dt * L(u1, t + dt)
/// u_new = 1/3 * u + 2/3 * u2 + 2/3 * dt * L(u2, t + dt/2)
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SSPRK3;

impl IntegratorInfo for SSPRK3 {
    fn name(&self) -> &'static str {
        "ssp-rk3"
    }

    fn order(&self) -> usize {
        3
    }

    fn is_implicit(&self) -> bool {
        false
    }
}

impl TimeIntegrator for SSPRK3 {
    fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t: f64,
        dt: f64,
    ) -> Result<(), IntegrationError> {
        check_step(dt)?;
        let n = y.len();
        let mut l = vec![0.0; n];

        // Stage 1
        system.rhs(t, y, &mut l)?;
        let mut u1 = y.to_vec();
        axpy(&mut u1, dt, &l);

        // Stage 2
        system.rhs(t + dt, &u1, &mut l)?;
        let mut u2: Vec<f64> = y.iter().zip(&u1).map(|(u, v)| 0.75 * u + 0.25 * v).collect();
        axpy(&mut u2, 0.25 * dt, &l);

        // Stage 3
        system.rhs(t + 0.5 * dt, &u2, &mut l)?;
        for k in 0..n {
            y[k] = y[k] / 3.0 + 2.0 / 3.0 * (u2[k] + dt * l[k]);
        }
        Ok(())
    }
}

// =============================================================================
// Implicit integrator
// =============================================================================

/// First-order implicit Euler with Newton iterations.
///
/// Each step solves `G(y) = y - y_n - h f(t + h, y) = 0` with a dense
/// Jacobian `I - h ∂f/∂y` built by forward differences and factored with
/// faer's full-pivoting LU. A failed Newton solve (no convergence, or an
/// RHS singularity at a trial state) halves `h` and retries; the step
/// always covers the requested `dt`, possibly in several sub-steps.
#[derive(Clone, Copy, Debug)]
pub struct BackwardEuler {
    /// Convergence tolerance on the scaled Newton update
    pub tolerance: f64,
    /// Newton iterations before a step is rejected
    pub max_iterations: usize,
    /// Relative perturbation for the finite-difference Jacobian
    pub perturbation: f64,
    /// Step halvings before giving up
    pub max_halvings: usize,
}

impl Default for BackwardEuler {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 20,
            perturbation: 1e-7,
            max_halvings: 12,
        }
    }
}

impl BackwardEuler {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_halvings(mut self, max_halvings: usize) -> Self {
        self.max_halvings = max_halvings;
        self
    }

    /// Forward-difference Jacobian of `G` at `y`, given `f0 = f(t, y)`.
    fn jacobian<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        t: f64,
        h: f64,
        y: &[f64],
        f0: &[f64],
    ) -> Result<Mat<f64>, RhsError> {
        let n = y.len();
        let mut jac = Mat::<f64>::zeros(n, n);
        let mut yp = y.to_vec();
        let mut fp = vec![0.0; n];

        for k in 0..n {
            let delta = self.perturbation * y[k].abs().max(1.0);
            yp[k] = y[k] + delta;
            system.rhs(t, &yp, &mut fp)?;
            yp[k] = y[k];

            for i in 0..n {
                jac[(i, k)] = -h * (fp[i] - f0[i]) / delta;
            }
            jac[(k, k)] += 1.0;
        }
        Ok(jac)
    }

    /// One Newton solve from `y_n` over `h`. `Ok(None)` means no
    /// convergence.
    fn solve_step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y_n: &[f64],
        t: f64,
        h: f64,
    ) -> Result<Option<Vec<f64>>, RhsError> {
        let n = y_n.len();
        let t_new = t + h;
        let mut y = y_n.to_vec();
        let mut f = vec![0.0; n];

        for _ in 0..self.max_iterations {
            system.rhs(t_new, &y, &mut f)?;
            let jac = self.jacobian(system, t_new, h, &y, &f)?;

            let mut residual = Mat::<f64>::zeros(n, 1);
            for k in 0..n {
                residual[(k, 0)] = -(y[k] - y_n[k] - h * f[k]);
            }

            let lu = jac.as_ref().full_piv_lu();
            let delta = lu.solve(&residual);

            let mut update = 0.0f64;
            let mut scale = 1.0f64;
            for k in 0..n {
                let d = delta[(k, 0)];
                if !d.is_finite() {
                    return Ok(None);
                }
                y[k] += d;
                update = update.max(d.abs());
                scale = scale.max(y[k].abs());
            }

            if update <= self.tolerance * scale {
                return Ok(Some(y));
            }
        }
        Ok(None)
    }
}

impl IntegratorInfo for BackwardEuler {
    fn name(&self) -> &'static str {
        "backward-euler"
    }

    fn order(&self) -> usize {
        1
    }

    fn is_implicit(&self) -> bool {
        true
    }
}

impl TimeIntegrator for BackwardEuler {
    fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t: f64,
        dt: f64,
    ) -> Result<(), IntegrationError> {
        check_step(dt)?;

        let t_end = t + dt;
        let mut t_cur = t;
        let mut h = dt;
        let mut halvings = 0;

        while t_end - t_cur > 1e-12 * dt {
            h = h.min(t_end - t_cur);
            let outcome = match self.solve_step(system, y, t_cur, h) {
                Ok(outcome) => outcome,
                Err(RhsError::NumericalSingularity { .. }) => None,
                Err(e) => return Err(e.into()),
            };

            match outcome {
                Some(y_new) => {
                    y.copy_from_slice(&y_new);
                    t_cur += h;
                }
                None => {
                    halvings += 1;
                    if halvings > self.max_halvings {
                        log::error!(
                            "Backward Euler gave up at t = {} after {} halvings (h = {:e})",
                            t_cur,
                            halvings - 1,
                            h
                        );
                        return Err(IntegrationError::NoConvergence {
                            time: t_cur,
                            halvings: halvings - 1,
                        });
                    }
                    h *= 0.5;
                    log::debug!(
                        "Backward Euler rejected step at t = {}, retrying with h = {:e}",
                        t_cur,
                        h
                    );
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Runtime dispatch
// =============================================================================

/// Integrator chosen at runtime, e.g. from a configuration file.
#[derive(Clone, Copy, Debug)]
pub enum Integrator {
    ForwardEuler,
    SSPRK3,
    BackwardEuler(BackwardEuler),
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::BackwardEuler(BackwardEuler::default())
    }
}

impl IntegratorInfo for Integrator {
    fn name(&self) -> &'static str {
        match self {
            Integrator::ForwardEuler => ForwardEuler.name(),
            Integrator::SSPRK3 => SSPRK3.name(),
            Integrator::BackwardEuler(be) => be.name(),
        }
    }

    fn order(&self) -> usize {
        match self {
            Integrator::ForwardEuler => ForwardEuler.order(),
            Integrator::SSPRK3 => SSPRK3.order(),
            Integrator::BackwardEuler(be) => be.order(),
        }
    }

    fn is_implicit(&self) -> bool {
        matches!(self, Integrator::BackwardEuler(_))
    }
}

impl TimeIntegrator for Integrator {
    fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t: f64,
        dt: f64,
    ) -> Result<(), IntegrationError> {
        match self {
            Integrator::ForwardEuler => ForwardEuler.step(system, y, t, dt),
            Integrator::SSPRK3 => SSPRK3.step(system, y, t, dt),
            Integrator::BackwardEuler(be) => be.step(system, y, t, dt),
        }
    }
}

/// Integrate from `t0` to `t1` with fixed steps of at most `dt`.
///
/// The last step is shortened to land on `t1`. Returns the number of steps.
pub fn integrate<I, S>(
    integrator: &I,
    system: &mut S,
    y: &mut [f64],
    t0: f64,
    t1: f64,
    dt: f64,
) -> Result<usize, IntegrationError>
where
    I: TimeIntegrator + ?Sized,
    S: OdeSystem + ?Sized,
{
    check_step(dt)?;
    if y.len() != system.len() {
        return Err(RhsError::StateLength {
            expected: system.len(),
            actual: y.len(),
        }
        .into());
    }

    log::debug!(
        "Integrating {} slots from t = {} to {} with {} (dt = {})",
        y.len(),
        t0,
        t1,
        integrator.name(),
        dt
    );

    let mut t = t0;
    let mut steps = 0;
    while t1 - t > 1e-12 * dt {
        let h = dt.min(t1 - t);
        integrator.step(system, y, t, h)?;
        t += h;
        steps += 1;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Entity, StateComponent};
    use crate::types::ElementIndex;

    /// dy/dt = -k y
    struct Decay {
        k: f64,
        calls: usize,
    }

    impl OdeSystem for Decay {
        fn len(&self) -> usize {
            1
        }

        fn rhs(&mut self, _t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError> {
            self.calls += 1;
            dy[0] = -self.k * y[0];
            Ok(())
        }
    }

    /// dy/dt = -y, reporting a singularity on the first `failures` calls.
    struct Flaky {
        failures: usize,
    }

    impl OdeSystem for Flaky {
        fn len(&self) -> usize {
            1
        }

        fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(RhsError::NumericalSingularity {
                    entity: Entity::Element(ElementIndex::new(0)),
                    component: StateComponent::Surface,
                    time: t,
                });
            }
            dy[0] = -y[0];
            Ok(())
        }
    }

    fn decay(k: f64) -> Decay {
        Decay { k, calls: 0 }
    }

    #[test]
    fn test_forward_euler_order() {
        let exact = (-1.0f64).exp();
        let mut errors = Vec::new();
        for &dt in &[0.1, 0.05] {
            let mut y = vec![1.0];
            integrate(&ForwardEuler, &mut decay(1.0), &mut y, 0.0, 1.0, dt).unwrap();
            errors.push((y[0] - exact).abs());
        }
        let rate = (errors[0] / errors[1]).log2();
        assert!((rate - 1.0).abs() < 0.2, "Forward Euler rate {}", rate);
    }

    #[test]
    fn test_ssprk3_order() {
        let exact = (-1.0f64).exp();
        let mut errors = Vec::new();
        for &dt in &[0.1, 0.05] {
            let mut y = vec![1.0];
            integrate(&SSPRK3, &mut decay(1.0), &mut y, 0.0, 1.0, dt).unwrap();
            errors.push((y[0] - exact).abs());
        }
        let rate = (errors[0] / errors[1]).log2();
        assert!((rate - 3.0).abs() < 0.3, "SSP-RK3 rate {}", rate);
    }

    #[test]
    fn test_backward_euler_matches_closed_form() {
        // For linear decay one implicit step gives y / (1 + k h)
        let k = 50.0;
        let h = 0.1;
        let mut y = vec![2.0];
        BackwardEuler::default()
            .step(&mut decay(k), &mut y, 0.0, h)
            .unwrap();
        let expected = 2.0 / (1.0 + k * h);
        assert!((y[0] - expected).abs() < 1e-9, "got {}, expected {}", y[0], expected);
    }

    #[test]
    fn test_backward_euler_stable_on_stiff_decay() {
        let mut y = vec![1.0];
        integrate(&BackwardEuler::default(), &mut decay(1e4), &mut y, 0.0, 1.0, 0.5).unwrap();
        assert!(y[0] >= 0.0 && y[0] < 1e-6);
    }

    #[test]
    fn test_backward_euler_halves_on_singularity() {
        // Two rejections leave h = 1/4 for the rest of the step
        let mut y = vec![1.0];
        BackwardEuler::default()
            .step(&mut Flaky { failures: 2 }, &mut y, 0.0, 1.0)
            .unwrap();
        let expected = 1.25f64.powi(-4);
        assert!((y[0] - expected).abs() < 1e-9, "got {}, expected {}", y[0], expected);
    }

    #[test]
    fn test_backward_euler_gives_up() {
        let mut y = vec![1.0];
        let solver = BackwardEuler::default().with_max_halvings(3);
        let err = solver
            .step(&mut Flaky { failures: 100 }, &mut y, 0.0, 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::NoConvergence {
                time: 0.0,
                halvings: 3
            }
        );
        assert_eq!(y[0], 1.0);
    }

    #[test]
    fn test_integrate_lands_on_end_time() {
        let mut system = decay(0.0);
        let mut y = vec![1.0];
        let steps = integrate(&ForwardEuler, &mut system, &mut y, 0.0, 1.0, 0.3).unwrap();
        assert_eq!(steps, 4);
        assert_eq!(system.calls, 4);
    }

    #[test]
    fn test_invalid_step_rejected() {
        let mut y = vec![1.0];
        assert_eq!(
            ForwardEuler.step(&mut decay(1.0), &mut y, 0.0, -1.0),
            Err(IntegrationError::InvalidStep(-1.0))
        );
    }

    #[test]
    fn test_length_mismatch() {
        let mut y = vec![1.0, 2.0];
        let err = integrate(&SSPRK3, &mut decay(1.0), &mut y, 0.0, 1.0, 0.1).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::Rhs(RhsError::StateLength {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_runtime_dispatch() {
        let integrators = [
            Integrator::ForwardEuler,
            Integrator::SSPRK3,
            Integrator::default(),
        ];
        let names: Vec<_> = integrators.iter().map(|i| i.name()).collect();
        assert_eq!(names, ["forward-euler", "ssp-rk3", "backward-euler"]);
        assert!(integrators[2].is_implicit());

        for integrator in &integrators {
            let mut y = vec![1.0];
            integrate(integrator, &mut decay(1.0), &mut y, 0.0, 0.5, 0.01).unwrap();
            assert!((y[0] - (-0.5f64).exp()).abs() < 5e-3, "{}", integrator.name());
        }
    }
}
