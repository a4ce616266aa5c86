//! Flux containers filled by one RHS evaluation.
//!
//! Sign convention: a positive flux leaves the owning element or segment.

use std::ops::{Index, IndexMut};

use crate::material::MacroporeStatus;

/// Lateral fluxes across the three edges of an element (m³/s).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementFluxes {
    pub surface: [f64; 3],
    pub subsurface: [f64; 3],
}

impl ElementFluxes {
    /// Net surface outflow.
    #[inline]
    pub fn total_surface(&self) -> f64 {
        self.surface[0] + self.surface[1] + self.surface[2]
    }

    /// Net subsurface outflow.
    #[inline]
    pub fn total_subsurface(&self) -> f64 {
        self.subsurface[0] + self.subsurface[1] + self.subsurface[2]
    }
}

/// Vertical exchange on an element (m/s).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerticalFluxes {
    /// Surface to soil
    pub infiltration: f64,
    /// Unsaturated zone to groundwater
    pub recharge: f64,
    /// Surface water budget bounding infiltration
    pub capacity: f64,
    /// Whether the perched regime was active
    pub perched: bool,
}

/// Flux legs of a river segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FluxLeg {
    /// Negated sum of upstream outflows
    Inflow,
    /// Channel flow to the downstream segment or outlet
    Outflow,
    /// Overbank exchange with the left element
    LeftSurface,
    /// Overbank exchange with the right element
    RightSurface,
    /// River to left element groundwater
    LeftSubsurface,
    /// River to right element groundwater
    RightSubsurface,
    /// River to channel aquifer through the bed
    BedSeepage,
    /// Channel aquifer to left element groundwater
    LeftUnderRiver,
    /// Channel aquifer to right element groundwater
    RightUnderRiver,
    /// Channel aquifer flow to the downstream segment
    AquiferOutflow,
    /// Negated sum of upstream channel aquifer outflows
    AquiferInflow,
}

impl FluxLeg {
    pub const COUNT: usize = 11;

    pub const ALL: [FluxLeg; Self::COUNT] = [
        FluxLeg::Inflow,
        FluxLeg::Outflow,
        FluxLeg::LeftSurface,
        FluxLeg::RightSurface,
        FluxLeg::LeftSubsurface,
        FluxLeg::RightSubsurface,
        FluxLeg::BedSeepage,
        FluxLeg::LeftUnderRiver,
        FluxLeg::RightUnderRiver,
        FluxLeg::AquiferOutflow,
        FluxLeg::AquiferInflow,
    ];

    /// Legs that change the river stage.
    pub const CHANNEL: [FluxLeg; 7] = [
        FluxLeg::Inflow,
        FluxLeg::Outflow,
        FluxLeg::LeftSurface,
        FluxLeg::RightSurface,
        FluxLeg::LeftSubsurface,
        FluxLeg::RightSubsurface,
        FluxLeg::BedSeepage,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Flux legs of one river segment (m³/s).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiverFluxes {
    legs: [f64; FluxLeg::COUNT],
}

impl RiverFluxes {
    /// Net outflow from the channel (stage storage).
    pub fn channel_outflow(&self) -> f64 {
        FluxLeg::CHANNEL.iter().map(|&leg| self[leg]).sum()
    }

    /// Net outflow from the channel aquifer.
    pub fn aquifer_outflow(&self) -> f64 {
        self[FluxLeg::LeftUnderRiver]
            + self[FluxLeg::RightUnderRiver]
            + self[FluxLeg::AquiferOutflow]
            + self[FluxLeg::AquiferInflow]
            - self[FluxLeg::BedSeepage]
    }

    pub fn reset(&mut self) {
        self.legs = [0.0; FluxLeg::COUNT];
    }
}

impl Index<FluxLeg> for RiverFluxes {
    type Output = f64;

    #[inline]
    fn index(&self, leg: FluxLeg) -> &f64 {
        &self.legs[leg.index()]
    }
}

impl IndexMut<FluxLeg> for RiverFluxes {
    #[inline]
    fn index_mut(&mut self, leg: FluxLeg) -> &mut f64 {
        &mut self.legs[leg.index()]
    }
}

/// Macropore activity carried from one evaluation to the next.
///
/// The deep-regime infiltration pass writes the status; recharge on the
/// same call reads it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MacroporeMemory {
    status: Vec<MacroporeStatus>,
}

impl MacroporeMemory {
    pub fn new(n_elements: usize) -> Self {
        Self {
            status: vec![MacroporeStatus::default(); n_elements],
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> MacroporeStatus {
        self.status[i]
    }

    #[inline]
    pub fn set(&mut self, i: usize, status: MacroporeStatus) {
        self.status[i] = status;
    }

    pub fn as_slice(&self) -> &[MacroporeStatus] {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_indices_are_dense() {
        for (i, leg) in FluxLeg::ALL.iter().enumerate() {
            assert_eq!(leg.index(), i);
        }
    }

    #[test]
    fn test_channel_and_aquifer_totals() {
        let mut f = RiverFluxes::default();
        f[FluxLeg::Outflow] = 2.0;
        f[FluxLeg::Inflow] = -1.5;
        f[FluxLeg::BedSeepage] = 0.25;
        f[FluxLeg::LeftUnderRiver] = 0.1;
        assert!((f.channel_outflow() - 0.75).abs() < 1e-12);
        assert!((f.aquifer_outflow() - (0.1 - 0.25)).abs() < 1e-12);

        f.reset();
        assert_eq!(f, RiverFluxes::default());
    }
}
