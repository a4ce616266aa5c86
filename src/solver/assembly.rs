//! Combination of fluxes and external terms into the derivative vector.

use super::{
    ElementFluxes, ElementForcing, Entity, EvalContext, RhsError, RiverFluxes, StateComponent,
    StateLayout, VerticalFluxes,
};
use crate::forcing::EtScheme;
use crate::types::{ElementIndex, RiverIndex};

/// Element storage rates `(surface, unsaturated, groundwater)` before the
/// porosity conversion.
fn element_rates(
    ctx: &EvalContext,
    scheme: EtScheme,
    forcing: &ElementForcing,
    vertical: &VerticalFluxes,
    i: ElementIndex,
) -> (f64, f64, f64) {
    let surf = ctx.state.surface[i];
    let gw = ctx.state.groundwater[i];
    let wet = surf >= ctx.dry_depth();
    let et = forcing.et;
    let (infil, rechg) = (vertical.infiltration, vertical.recharge);

    let mut ds = forcing.net_precipitation - infil;
    let (mut du, mut dg);

    match scheme {
        EtScheme::Standalone => {
            // Soil evaporation comes from ponded water when there is any
            let from_soil = if wet { 0.0 } else { et.soil };
            if vertical.perched {
                du = infil - rechg;
                dg = rechg - from_soil;
            } else {
                du = infil - rechg - from_soil;
                dg = rechg;
            }
            if wet {
                ds -= et.soil;
            }

            let soil = ctx.soil(i);
            if gw > soil.depth - ctx.land_cover(i).root_zone_depth {
                dg -= et.transpiration;
            } else {
                du -= et.transpiration;
            }
        }
        EtScheme::LandSurface => {
            if vertical.perched {
                du = infil - rechg;
                dg = rechg - et.soil;
            } else {
                du = infil - rechg - et.soil;
                dg = rechg;
            }
            let f = forcing.transpiration_from_saturated;
            dg -= f * et.transpiration;
            du -= (1.0 - f) * et.transpiration;
        }
    }

    (ds, du, dg)
}

/// Write element and river derivatives into `dy`.
///
/// `dy` must be zeroed and match `layout`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn assemble(
    ctx: &EvalContext,
    layout: StateLayout,
    scheme: EtScheme,
    forcing: &[ElementForcing],
    lateral: &[ElementFluxes],
    vertical: &[VerticalFluxes],
    rivers: &[RiverFluxes],
    dy: &mut [f64],
) {
    let eps = ctx.config.constants.eps;

    for i in ElementIndex::iter(layout.n_elements) {
        let elem = ctx.element(i);
        let porosity = ctx.soil(i).porosity;
        let (mut ds, mut du, mut dg) = element_rates(ctx, scheme, &forcing[i], &vertical[i], i);

        ds -= lateral[i].total_surface() / elem.area;
        dg -= lateral[i].total_subsurface() / elem.area;

        dy[layout.element_slot(StateComponent::Surface, i)] += ds;
        dy[layout.element_slot(StateComponent::Unsaturated, i)] += du / porosity;
        dy[layout.element_slot(StateComponent::Groundwater, i)] += dg / porosity;
    }

    for r in RiverIndex::iter(layout.n_rivers) {
        let shape = ctx.shape(r);
        // Storage width at bank-full depth
        let area = ctx.river(r).length * shape.equivalent_width(shape.depth, eps);
        let porosity = ctx.channel(r).porosity;

        dy[layout.river_slot(StateComponent::RiverStage, r)] -= rivers[r].channel_outflow() / area;
        dy[layout.river_slot(StateComponent::RiverGroundwater, r)] -=
            rivers[r].aquifer_outflow() / (porosity * area);
    }
}

/// Fail on the first NaN derivative.
pub(crate) fn check_finite(layout: StateLayout, dy: &[f64], t: f64) -> Result<(), RhsError> {
    match dy.iter().position(|v| v.is_nan()) {
        None => Ok(()),
        Some(slot) => {
            let (entity, component) = layout.locate(slot);
            log::error!("NaN in {component} derivative of {entity} at t = {t}");
            Err(RhsError::NumericalSingularity {
                entity,
                component,
                time: t,
            })
        }
    }
}
