//! Soil hydraulic properties and the conductivity/retention functions
//! evaluated on them.
//!
//! Retention follows Van Genuchten with `m = 1 - 1/β`; relative conductivity
//! follows the Mualem form. Macropores add a high-conductivity pathway over
//! a fraction of the cross-section, active only in the upper `depth` of the
//! soil column.

use serde::{Deserialize, Serialize};

/// Macropore pathway parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Macropore {
    /// Vertical macropore conductivity (m/s)
    pub k_mac_v: f64,
    /// Horizontal macropore conductivity (m/s)
    pub k_mac_h: f64,
    /// Depth of the macropore zone below the surface (m)
    pub depth: f64,
    /// Areal fraction of vertical macropores (acts on horizontal flow)
    pub area_fraction_v: f64,
    /// Areal fraction of horizontal macropores (acts on vertical flow)
    pub area_fraction_h: f64,
}

/// Activity state of the macropore pathway for vertical flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroporeStatus {
    /// Matrix flow only.
    #[default]
    Matrix,
    /// Macropores conducting in proportion to matrix wetness.
    Application,
    /// Macropores fully conducting, matrix limited by wetness.
    Macropore,
    /// Soil column saturated at the surface.
    Saturated,
}

impl MacroporeStatus {
    /// Classify the pathway from the relative conductivity and infiltration gradient.
    ///
    /// Gradients at or below unit gravity keep the macropores inactive. Once
    /// the matrix flux `kr * grad` would exceed its saturated value the
    /// macropores conduct at full capacity.
    pub fn classify(kr: f64, grad: f64) -> Self {
        if grad <= 1.0 {
            MacroporeStatus::Matrix
        } else if kr * grad >= 1.0 {
            MacroporeStatus::Macropore
        } else {
            MacroporeStatus::Application
        }
    }
}

impl Macropore {
    /// Effective vertical conductivity blending matrix and macropore paths.
    ///
    /// `k_matrix` is the saturated matrix conductivity of the layer in
    /// question (infiltration layer or deeper soil).
    pub fn effective_kv(&self, kr: f64, status: MacroporeStatus, k_matrix: f64) -> f64 {
        let af = self.area_fraction_h;
        match status {
            MacroporeStatus::Matrix => k_matrix * kr,
            MacroporeStatus::Application => (self.k_mac_v * af + k_matrix * (1.0 - af)) * kr,
            MacroporeStatus::Macropore | MacroporeStatus::Saturated => {
                self.k_mac_v * af + k_matrix * (1.0 - af) * kr
            }
        }
    }
}

/// Hydraulic properties of one soil class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoilProperties {
    /// Soil (aquifer) depth from surface to bedrock (m)
    pub depth: f64,
    /// Effective porosity
    pub porosity: f64,
    /// Depth of the infiltration front layer (m)
    pub infiltration_depth: f64,
    /// Vertical conductivity of the infiltration layer (m/s)
    pub k_inf_v: f64,
    /// Saturated vertical conductivity (m/s)
    pub k_sat_v: f64,
    /// Saturated horizontal conductivity (m/s)
    pub k_sat_h: f64,
    /// Van Genuchten α (1/m)
    pub alpha: f64,
    /// Van Genuchten β (n), must exceed 1
    pub beta: f64,
    /// Macropore pathway, if present
    pub macropore: Option<Macropore>,
}

impl SoilProperties {
    /// Depth of groundwater above which the perched regime applies.
    #[inline]
    pub fn perched_threshold(&self) -> f64 {
        self.depth - self.infiltration_depth
    }

    /// Effective horizontal conductivity at groundwater depth `gw`.
    ///
    /// When the water table rises into the macropore zone the conductivity is
    /// the thickness-weighted mix of matrix and macropore conductivity over
    /// the saturated column.
    pub fn effective_kh(&self, gw: f64) -> f64 {
        let gw = gw.max(0.0);
        let Some(mac) = self.macropore else {
            return self.k_sat_h;
        };

        let top_of_matrix = self.depth - mac.depth;
        if gw <= top_of_matrix {
            return self.k_sat_h;
        }

        let af = mac.area_fraction_v;
        if gw > self.depth {
            (mac.k_mac_h * mac.depth * af + self.k_sat_h * (self.depth - mac.depth * af))
                / self.depth
        } else {
            let in_macropore_zone = gw - top_of_matrix;
            (mac.k_mac_h * in_macropore_zone * af
                + self.k_sat_h * (top_of_matrix + in_macropore_zone * (1.0 - af)))
                / gw
        }
    }

    /// Mualem–Van Genuchten relative conductivity at saturation `satn`.
    pub fn relative_conductivity(&self, satn: f64) -> f64 {
        let b = self.beta;
        let inner = 1.0 - satn.powf(b / (b - 1.0));
        satn.sqrt() * (-1.0 + inner.powf((b - 1.0) / b)).powi(2)
    }

    /// Van Genuchten matric head (m, non-positive) at saturation `satn`.
    pub fn matric_head(&self, satn: f64) -> f64 {
        let b = self.beta;
        -((1.0 / satn).powf(b / (b - 1.0)) - 1.0).powf(1.0 / b) / self.alpha
    }

    /// Effective vertical conductivity, macropore-aware when present.
    ///
    /// Without macropores this is `k_matrix * kr`.
    pub fn effective_kv(&self, kr: f64, status: MacroporeStatus, k_matrix: f64) -> f64 {
        match self.macropore {
            Some(mac) => mac.effective_kv(kr, status, k_matrix),
            None => k_matrix * kr,
        }
    }

    /// Whether the water table reaches into the macropore zone.
    pub fn macropores_reached(&self, gw: f64) -> bool {
        self.macropore
            .is_some_and(|mac| gw > self.depth - mac.depth)
    }
}
