//! Infiltration capacity modifiers.

use crate::types::ElementIndex;

/// Adjusts infiltration for soil conditions not represented in the state.
pub trait InfiltrationCapacityProvider: Send + Sync {
    /// Multiplier on infiltration conductivity, in `[0, 1]`.
    fn reduction_factor(&self, element: ElementIndex, t: f64) -> f64;

    /// Saturation of the infiltration layer overriding the deep-regime value.
    fn surface_saturation(&self, element: ElementIndex, t: f64) -> Option<f64>;
}

/// No reduction; saturation from the unsaturated storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnfrozenSoil;

impl InfiltrationCapacityProvider for UnfrozenSoil {
    fn reduction_factor(&self, _element: ElementIndex, _t: f64) -> f64 {
        1.0
    }

    fn surface_saturation(&self, _element: ElementIndex, _t: f64) -> Option<f64> {
        None
    }
}

/// Frozen-soil factors supplied by a land-surface model.
///
/// Elements without an entry behave as unfrozen.
#[derive(Clone, Debug, Default)]
pub struct FrozenSoil {
    pub reduction: Vec<f64>,
    pub surface_saturation: Vec<Option<f64>>,
}

impl FrozenSoil {
    pub fn new(n_elements: usize) -> Self {
        Self {
            reduction: vec![1.0; n_elements],
            surface_saturation: vec![None; n_elements],
        }
    }
}

impl InfiltrationCapacityProvider for FrozenSoil {
    fn reduction_factor(&self, element: ElementIndex, _t: f64) -> f64 {
        self.reduction
            .get(element.get())
            .map_or(1.0, |f| f.clamp(0.0, 1.0))
    }

    fn surface_saturation(&self, element: ElementIndex, _t: f64) -> Option<f64> {
        self.surface_saturation.get(element.get()).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_soil_defaults_to_unfrozen() {
        let mut frozen = FrozenSoil::new(2);
        frozen.reduction[0] = 0.25;
        frozen.surface_saturation[0] = Some(0.9);

        let e0 = ElementIndex::new(0);
        let e5 = ElementIndex::new(5);
        assert_eq!(frozen.reduction_factor(e0, 0.0), 0.25);
        assert_eq!(frozen.surface_saturation(e0, 0.0), Some(0.9));
        assert_eq!(frozen.reduction_factor(e5, 0.0), 1.0);
        assert_eq!(frozen.surface_saturation(e5, 0.0), None);
        assert_eq!(UnfrozenSoil.reduction_factor(e5, 0.0), 1.0);
    }
}
