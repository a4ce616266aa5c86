//! Run configuration for the hydrology right-hand side.
//!
//! All numerical thresholds used by the flux laws live in [`HydroConstants`]
//! so that hosts can reproduce a run exactly from its configuration.
//!
//! # Example
//!
//! ```
//! use watershed_rs::config::{ChannelRouting, HydroConfig, SurfaceRouting};
//!
//! let config = HydroConfig::new(60.0)
//!     .with_surface_routing(SurfaceRouting::Kinematic)
//!     .with_channel_routing(ChannelRouting::Diffusion);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.constants.dry_depth(), 0.05 / 100.0);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid run configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Nominal step must be positive and finite.
    #[error("Invalid nominal time step: {0}")]
    InvalidTimeStep(f64),

    /// A numerical constant is out of its admissible range.
    #[error("Invalid constant {name}: {value}")]
    InvalidConstant { name: &'static str, value: f64 },
}

/// Overland flow approximation between triangular elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceRouting {
    /// Kinematic wave: friction slope from ground-surface elevation only.
    Kinematic,
    /// Diffusion wave: friction slope from the local water-surface gradient.
    #[default]
    Diffusion,
}

/// Channel flow approximation between river segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelRouting {
    /// Kinematic wave: head difference from bed elevations only.
    Kinematic,
    /// Diffusion wave: head difference from water-surface elevations.
    #[default]
    Diffusion,
}

/// Numerical thresholds shared by all flux laws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HydroConstants {
    /// Base tolerance from which the dry-depth and slope floors derive
    pub eps: f64,
    /// Multiplier on `eps` giving the minimum soil saturation
    pub mult_f: f64,
    /// Lower bound on matric head (m), cuts the Van Genuchten dry tail
    pub psi_min: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
}

impl Default for HydroConstants {
    fn default() -> Self {
        Self {
            eps: 0.05,
            mult_f: 2.0,
            psi_min: -70.0,
            gravity: 9.80665,
        }
    }
}

impl HydroConstants {
    /// Ponding depth below which a surface is treated as dry.
    #[inline]
    pub fn dry_depth(&self) -> f64 {
        self.eps / 100.0
    }

    /// Floor applied to overland friction slopes.
    #[inline]
    pub fn slope_floor(&self) -> f64 {
        self.eps / 1.0e6
    }

    /// Lower clamp for unsaturated-zone saturation.
    #[inline]
    pub fn min_saturation(&self) -> f64 {
        self.mult_f * self.eps
    }
}

/// Configuration of one hydrology RHS instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HydroConfig {
    /// Nominal integrator step (s), used by the infiltration capacity bound
    pub dt: f64,
    /// Overland routing mode
    pub surface_routing: SurfaceRouting,
    /// Channel routing mode
    pub channel_routing: ChannelRouting,
    /// Numerical thresholds
    pub constants: HydroConstants,
}

impl HydroConfig {
    /// Create a configuration with diffusion-wave routing and default constants.
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            surface_routing: SurfaceRouting::default(),
            channel_routing: ChannelRouting::default(),
            constants: HydroConstants::default(),
        }
    }

    /// Set the overland routing mode.
    pub fn with_surface_routing(mut self, routing: SurfaceRouting) -> Self {
        self.surface_routing = routing;
        self
    }

    /// Set the channel routing mode.
    pub fn with_channel_routing(mut self, routing: ChannelRouting) -> Self {
        self.channel_routing = routing;
        self
    }

    /// Replace the numerical constants.
    pub fn with_constants(mut self, constants: HydroConstants) -> Self {
        self.constants = constants;
        self
    }

    /// Check that the step and constants are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }

        let c = &self.constants;
        let checks = [
            ("eps", c.eps, c.eps > 0.0),
            ("mult_f", c.mult_f, c.mult_f > 0.0 && c.mult_f * c.eps < 1.0),
            ("psi_min", c.psi_min, c.psi_min < 0.0),
            ("gravity", c.gravity, c.gravity > 0.0),
        ];
        for (name, value, ok) in checks {
            if !value.is_finite() || !ok {
                return Err(ConfigError::InvalidConstant { name, value });
            }
        }
        Ok(())
    }
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_thresholds() {
        let c = HydroConstants::default();
        assert!((c.dry_depth() - 5.0e-4).abs() < 1e-15);
        assert!((c.slope_floor() - 5.0e-8).abs() < 1e-20);
        assert!((c.min_saturation() - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_validate_rejects_bad_step() {
        assert_eq!(
            HydroConfig::new(0.0).validate(),
            Err(ConfigError::InvalidTimeStep(0.0))
        );
        assert!(HydroConfig::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_constant() {
        let constants = HydroConstants {
            psi_min: 5.0,
            ..Default::default()
        };
        let err = HydroConfig::new(1.0).with_constants(constants).validate();
        assert!(matches!(
            err,
            Err(ConfigError::InvalidConstant { name: "psi_min", .. })
        ));
    }
}
