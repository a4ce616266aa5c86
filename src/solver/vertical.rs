//! Infiltration and groundwater recharge.
//!
//! Two regimes per element, chosen by the water-table depth:
//!
//! - **Perched**: the water table lies inside the infiltration layer.
//!   Infiltration is driven by the head difference between ponded water and
//!   groundwater over the layer thickness and feeds groundwater directly.
//! - **Deep**: infiltration is driven against the matric head of the
//!   unsaturated zone; recharge uses the integrated arithmetic-mean
//!   conductivity between the unsaturated zone and the water table.
//!
//! In both regimes infiltration is limited to the water available at the
//! surface during a nominal step and never becomes negative.

use super::{ElementFluxes, EvalContext, MacroporeMemory, VerticalFluxes};
use crate::forcing::{EtComponents, EtScheme, InfiltrationCapacityProvider};
use crate::material::MacroporeStatus;
use crate::types::ElementIndex;

/// External terms of one element at the evaluation time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementForcing {
    /// Net precipitation reaching the ground (m/s)
    pub net_precipitation: f64,
    pub et: EtComponents,
    /// Share of transpiration taken from groundwater (land-surface scheme)
    pub transpiration_from_saturated: f64,
}

/// Upper bound on infiltration from the surface water budget (m/s).
///
/// Ponded storage drained over one nominal step plus precipitation plus
/// net lateral surface inflow, less soil evaporation from a ponded surface
/// under the standalone ET scheme.
pub(crate) fn infiltration_capacity(
    ctx: &EvalContext,
    scheme: EtScheme,
    forcing: &ElementForcing,
    lateral: &ElementFluxes,
    i: ElementIndex,
) -> f64 {
    let surf = ctx.state.surface[i];
    let wet = surf >= ctx.dry_depth();
    let et = match scheme {
        EtScheme::Standalone if wet => forcing.et.soil,
        _ => 0.0,
    };
    // Lateral surface outflow is subtracted so the term is net inflow
    surf / ctx.config.dt + forcing.net_precipitation
        - lateral.total_surface() / ctx.element(i).area
        - et
}

/// Recharge from the unsaturated zone to the water table (deep regime).
fn recharge(ctx: &EvalContext, status: MacroporeStatus, i: ElementIndex) -> f64 {
    let soil = ctx.soil(i);
    let unsat = ctx.state.unsaturated[i];
    let gw = ctx.state.groundwater[i];
    let deficit = soil.depth - gw;
    if deficit <= 0.0 {
        return 0.0;
    }

    let satn = (unsat / deficit)
        .min(1.0)
        .max(ctx.config.constants.min_saturation());
    let kr = soil.relative_conductivity(satn);
    let effk = if soil.macropores_reached(gw) {
        soil.effective_kv(kr, status, soil.k_sat_v)
    } else {
        soil.k_sat_v * kr
    };

    let b = soil.beta;
    let suction = (-1.0 + satn.powf(b / (1.0 - b))).powf(1.0 / b);
    let rechg = (soil.k_sat_v * gw + effk * deficit) * (soil.alpha * deficit - 2.0 * suction)
        / (soil.alpha * (deficit + gw).powi(2));

    if (rechg > 0.0 && unsat <= 0.0) || (rechg < 0.0 && gw <= 0.0) {
        0.0
    } else {
        rechg
    }
}

/// Infiltration and recharge of one element.
pub(crate) fn element_vertical(
    ctx: &EvalContext,
    scheme: EtScheme,
    capacity_provider: &dyn InfiltrationCapacityProvider,
    forcing: &ElementForcing,
    lateral: &ElementFluxes,
    memory: &mut MacroporeMemory,
    i: ElementIndex,
) -> VerticalFluxes {
    let soil = ctx.soil(i);
    let elem = ctx.element(i);
    let surf = ctx.state.surface[i];
    let unsat = ctx.state.unsaturated[i];
    let gw = ctx.state.groundwater[i];
    let dry = surf < ctx.dry_depth();
    let dinf = soil.infiltration_depth;

    let fcr = capacity_provider.reduction_factor(i, ctx.t);
    let capacity = infiltration_capacity(ctx, scheme, forcing, lateral, i);
    let limit = |infil: f64| infil.min(capacity).max(0.0);

    if gw > soil.perched_threshold() {
        let mut grad = (surf + elem.z_max - (gw + elem.z_min)) / dinf;
        if dry && grad > 0.0 {
            grad = 0.0;
        }
        let effk = match soil.macropore {
            Some(mac) => mac.effective_kv(1.0, MacroporeStatus::Saturated, soil.k_inf_v),
            None => soil.k_inf_v,
        };
        let infiltration = limit(fcr * effk * grad);
        return VerticalFluxes {
            infiltration,
            recharge: infiltration,
            capacity,
            perched: true,
        };
    }

    let constants = &ctx.config.constants;
    let deficit = soil.depth - gw;
    let satn = capacity_provider
        .surface_saturation(i, ctx.t)
        .unwrap_or(unsat / deficit)
        .min(1.0)
        .max(constants.min_saturation());
    let psi = soil.matric_head(satn).max(constants.psi_min);
    let total_y = psi + elem.z_min + soil.depth - dinf;
    let mut grad = (surf + elem.z_max - total_y) / dinf;
    if dry && grad > 0.0 {
        grad = 0.0;
    }

    let kr = soil.relative_conductivity(satn);
    let effk = match soil.macropore {
        Some(mac) => {
            let status = MacroporeStatus::classify(kr, grad);
            memory.set(i.get(), status);
            mac.effective_kv(kr, status, soil.k_inf_v)
        }
        None => soil.k_inf_v,
    };
    let infiltration = limit(fcr * 0.5 * effk * grad);

    VerticalFluxes {
        infiltration,
        recharge: recharge(ctx, memory.get(i.get()), i),
        capacity,
        perched: false,
    }
}

/// Fill `out` with infiltration and recharge of every element.
pub(crate) fn vertical_flow(
    ctx: &EvalContext,
    scheme: EtScheme,
    capacity_provider: &dyn InfiltrationCapacityProvider,
    forcing: &[ElementForcing],
    lateral: &[ElementFluxes],
    memory: &mut MacroporeMemory,
    out: &mut [VerticalFluxes],
) {
    for (k, v) in out.iter_mut().enumerate() {
        *v = element_vertical(
            ctx,
            scheme,
            capacity_provider,
            &forcing[k],
            &lateral[k],
            memory,
            ElementIndex::new(k),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HydroConfig;
    use crate::forcing::{FrozenSoil, UnfrozenSoil};
    use crate::material::{LandCover, Macropore, MaterialTables, SoilProperties};
    use crate::mesh::{Mesh, MeshBuilder, Node};
    use crate::solver::{HydroState, StateLayout};

    fn soil() -> SoilProperties {
        SoilProperties {
            depth: 2.0,
            porosity: 0.4,
            infiltration_depth: 0.1,
            k_inf_v: 1.0e-5,
            k_sat_v: 1.0e-5,
            k_sat_h: 1.0e-4,
            alpha: 2.0,
            beta: 1.5,
            macropore: None,
        }
    }

    fn single(soil: SoilProperties) -> (Mesh, MaterialTables) {
        let mesh = MeshBuilder::new(vec![
            Node::new(0.0, 0.0, 0.0, 2.0),
            Node::new(10.0, 0.0, 0.0, 2.0),
            Node::new(0.0, 10.0, 0.0, 2.0),
        ])
        .with_triangle([0, 1, 2], 0, 0)
        .build()
        .unwrap();
        let mut tables = MaterialTables::new();
        tables.push_soil(soil);
        tables.push_land_cover(LandCover::new(0.1, 0.5));
        (mesh, tables)
    }

    fn evaluate(
        soil: SoilProperties,
        y: [f64; 3],
        forcing: ElementForcing,
        lateral: ElementFluxes,
        capacity_provider: &dyn InfiltrationCapacityProvider,
    ) -> (VerticalFluxes, MacroporeMemory) {
        let (mesh, tables) = single(soil);
        let config = HydroConfig::default();
        let state = HydroState::from_vector(StateLayout::new(1, 0), &y).unwrap();
        let ctx = EvalContext {
            mesh: &mesh,
            tables: &tables,
            config: &config,
            state: &state,
            t: 0.0,
        };
        let mut memory = MacroporeMemory::new(1);
        let v = element_vertical(
            &ctx,
            EtScheme::Standalone,
            capacity_provider,
            &forcing,
            &lateral,
            &mut memory,
            ElementIndex::new(0),
        );
        (v, memory)
    }

    #[test]
    fn test_flat_saturated_column_does_not_infiltrate() {
        // Water table at the surface, no ponding
        let (v, _) = evaluate(
            soil(),
            [0.0, 0.0, 2.0],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert!(v.perched);
        assert_eq!(v.infiltration, 0.0);
        assert_eq!(v.recharge, 0.0);
    }

    #[test]
    fn test_infiltration_respects_capacity() {
        // Heavy ponding, tiny nominal step budget is the limit
        let forcing = ElementForcing {
            net_precipitation: 1.0e-6,
            ..Default::default()
        };
        let mut lateral = ElementFluxes::default();
        lateral.surface = [1.0e3, 0.0, 0.0];
        let (v, _) = evaluate(soil(), [0.001, 0.3, 0.5], forcing, lateral, &UnfrozenSoil);
        assert!(v.infiltration >= 0.0);
        assert!(
            v.infiltration <= v.capacity.max(0.0),
            "infiltration {} exceeds capacity {}",
            v.infiltration,
            v.capacity
        );
        // Outflow of 1000 m³/s from 50 m² exhausts the budget
        assert_eq!(v.infiltration, 0.0);
    }

    #[test]
    fn test_deep_regime_ponded_infiltration_positive() {
        let (v, _) = evaluate(
            soil(),
            [0.05, 0.3, 0.5],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert!(!v.perched);
        assert!(v.infiltration > 0.0);
        assert!(v.infiltration <= v.capacity);
    }

    #[test]
    fn test_recharge_zero_when_unsaturated_store_empty() {
        // Large α makes the raw recharge positive at the clamped saturation
        let soil = SoilProperties {
            alpha: 200.0,
            ..soil()
        };
        let (wet, _) = evaluate(
            soil,
            [0.0, 1.0e-4, 0.5],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert!(wet.recharge > 0.0, "recharge {}", wet.recharge);

        let (empty, _) = evaluate(
            soil,
            [0.0, 0.0, 0.5],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert_eq!(empty.recharge, 0.0);
    }

    #[test]
    fn test_recharge_zero_when_groundwater_empty() {
        let (v, _) = evaluate(
            soil(),
            [0.0, 0.01, 0.0],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert_eq!(v.recharge, 0.0);
    }

    #[test]
    fn test_frozen_soil_blocks_infiltration() {
        let mut frozen = FrozenSoil::new(1);
        frozen.reduction[0] = 0.0;
        let (v, _) = evaluate(
            soil(),
            [0.05, 0.3, 0.5],
            ElementForcing::default(),
            ElementFluxes::default(),
            &frozen,
        );
        assert_eq!(v.infiltration, 0.0);
    }

    #[test]
    fn test_macropore_status_is_remembered() {
        let soil = SoilProperties {
            macropore: Some(Macropore {
                k_mac_v: 1.0e-3,
                k_mac_h: 1.0e-3,
                depth: 0.5,
                area_fraction_v: 0.01,
                area_fraction_h: 0.01,
            }),
            ..soil()
        };
        let (v, memory) = evaluate(
            soil,
            [0.2, 0.3, 0.5],
            ElementForcing::default(),
            ElementFluxes::default(),
            &UnfrozenSoil,
        );
        assert!(!v.perched);
        // Large ponding over a dry soil gives a steep gradient
        assert_ne!(memory.get(0), MacroporeStatus::Matrix);
    }
}
