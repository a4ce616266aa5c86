//! Flat state vector layout and the clipped per-entity view of it.
//!
//! Layout of a state (and derivative) vector of length `3·ne + 2·nr`:
//!
//! | Range                    | Component                 |
//! |--------------------------|---------------------------|
//! | `[0, ne)`                | surface ponding depth     |
//! | `[ne, 2ne)`              | unsaturated storage       |
//! | `[2ne, 3ne)`             | groundwater depth         |
//! | `[3ne, 3ne + nr)`        | river stage               |
//! | `[3ne + nr, 3ne + 2nr)`  | channel aquifer storage   |

use super::{Entity, RhsError, StateComponent};
use crate::types::{ElementIndex, RiverIndex};

/// Index arithmetic for the flat state vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLayout {
    pub n_elements: usize,
    pub n_rivers: usize,
}

impl StateLayout {
    pub fn new(n_elements: usize, n_rivers: usize) -> Self {
        Self {
            n_elements,
            n_rivers,
        }
    }

    /// Total vector length.
    #[inline]
    pub fn len(&self) -> usize {
        3 * self.n_elements + 2 * self.n_rivers
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot of an element component.
    #[inline]
    pub fn element_slot(&self, component: StateComponent, e: ElementIndex) -> usize {
        let ne = self.n_elements;
        match component {
            StateComponent::Surface => e.get(),
            StateComponent::Unsaturated => ne + e.get(),
            StateComponent::Groundwater => 2 * ne + e.get(),
            StateComponent::RiverStage | StateComponent::RiverGroundwater => {
                unreachable!("river component for an element")
            }
        }
    }

    /// Slot of a river component.
    #[inline]
    pub fn river_slot(&self, component: StateComponent, r: RiverIndex) -> usize {
        let base = 3 * self.n_elements;
        match component {
            StateComponent::RiverStage => base + r.get(),
            StateComponent::RiverGroundwater => base + self.n_rivers + r.get(),
            _ => unreachable!("element component for a river"),
        }
    }

    /// Entity and component stored at `slot`.
    pub fn locate(&self, slot: usize) -> (Entity, StateComponent) {
        let ne = self.n_elements;
        let nr = self.n_rivers;
        let element = |i: usize| Entity::Element(ElementIndex::new(i));
        let river = |i: usize| Entity::River(RiverIndex::new(i));
        if slot < ne {
            (element(slot), StateComponent::Surface)
        } else if slot < 2 * ne {
            (element(slot - ne), StateComponent::Unsaturated)
        } else if slot < 3 * ne {
            (element(slot - 2 * ne), StateComponent::Groundwater)
        } else if slot < 3 * ne + nr {
            (river(slot - 3 * ne), StateComponent::RiverStage)
        } else {
            (river(slot - 3 * ne - nr), StateComponent::RiverGroundwater)
        }
    }

    /// Check a vector's length against the layout.
    pub fn check(&self, v: &[f64]) -> Result<(), RhsError> {
        if v.len() == self.len() {
            Ok(())
        } else {
            Err(RhsError::StateLength {
                expected: self.len(),
                actual: v.len(),
            })
        }
    }
}

/// Per-entity storages with negative values clipped to zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HydroState {
    /// Surface ponding depth (m)
    pub surface: Vec<f64>,
    /// Unsaturated storage (m of water column, before porosity)
    pub unsaturated: Vec<f64>,
    /// Groundwater depth above the aquifer bottom (m)
    pub groundwater: Vec<f64>,
    /// River stage above the bed (m)
    pub stage: Vec<f64>,
    /// Channel aquifer depth above its bottom (m)
    pub river_groundwater: Vec<f64>,
}

#[inline]
fn clip(v: f64) -> f64 {
    if v >= 0.0 { v } else { 0.0 }
}

impl HydroState {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            surface: vec![0.0; layout.n_elements],
            unsaturated: vec![0.0; layout.n_elements],
            groundwater: vec![0.0; layout.n_elements],
            stage: vec![0.0; layout.n_rivers],
            river_groundwater: vec![0.0; layout.n_rivers],
        }
    }

    /// Overwrite from a flat vector, clipping negative entries to zero.
    ///
    /// NaN entries are kept so that they surface as a singularity in the
    /// derivative rather than being silently zeroed.
    pub fn unpack(&mut self, layout: StateLayout, y: &[f64]) -> Result<(), RhsError> {
        layout.check(y)?;
        let ne = layout.n_elements;
        let nr = layout.n_rivers;

        let (elements, rivers) = y.split_at(3 * ne);
        let targets = [
            (&mut self.surface, &elements[..ne]),
            (&mut self.unsaturated, &elements[ne..2 * ne]),
            (&mut self.groundwater, &elements[2 * ne..]),
            (&mut self.stage, &rivers[..nr]),
            (&mut self.river_groundwater, &rivers[nr..]),
        ];
        for (dst, src) in targets {
            dst.clear();
            dst.extend(src.iter().map(|&v| if v.is_nan() { v } else { clip(v) }));
        }
        Ok(())
    }

    /// Build from a flat vector.
    pub fn from_vector(layout: StateLayout, y: &[f64]) -> Result<Self, RhsError> {
        let mut state = Self::new(layout);
        state.unpack(layout, y)?;
        Ok(state)
    }
}
