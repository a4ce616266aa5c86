//! Channel routing, channel-floodplain exchange and bed seepage.
//!
//! Segments are processed in index order. Each segment computes its own
//! outflow legs and accumulates their negation into the downstream
//! segment's inflow legs, so what leaves one segment enters the next
//! exactly. Bank exchange legs replace the lateral flux of the bank
//! element on the edge along the river.

use super::flow_laws::{avg_y, bank_overflow, overland_flow};
use super::{ElementFluxes, EvalContext, FluxLeg, RhsError, RiverFluxes};
use crate::config::ChannelRouting;
use crate::forcing::ForcingProvider;
use crate::mesh::{BankSide, Downstream, RiverBoundary, RiverOutlet, distance};
use crate::types::{ElementIndex, RiverIndex};

/// Mean effective horizontal conductivity of the banks of `r`.
///
/// Falls back to the channel's own bank conductivity when the segment has no
/// bank elements.
fn bank_conductivity(ctx: &EvalContext, r: RiverIndex) -> f64 {
    let seg = ctx.river(r);
    let (sum, count) = seg
        .banks()
        .fold((0.0, 0), |(sum, count), (_, e)| (sum + ctx.effective_kh(e), count + 1));
    if count == 0 {
        ctx.channel(r).k_sat_h
    } else {
        sum / count as f64
    }
}

/// Channel and channel-aquifer flow from `r` to its downstream segment `d`.
fn segment_to_segment(ctx: &EvalContext, r: RiverIndex, d: RiverIndex) -> (f64, f64) {
    let state = ctx.state;
    let constants = &ctx.config.constants;
    let (seg, down) = (ctx.river(r), ctx.river(d));
    let (shape, shape_d) = (ctx.shape(r), ctx.shape(d));
    let (stage, stage_d) = (state.stage[r], state.stage[d]);
    let (zbed, zbed_d) = (ctx.z_bed(r), ctx.z_bed(d));
    let dist = 0.5 * (seg.length + down.length);

    // Channel flow
    let avg_perim = 0.5 * (shape.wetted_perimeter(stage) + shape_d.wetted_perimeter(stage_d));
    let roughness = 0.5 * (ctx.channel(r).roughness + ctx.channel(d).roughness);
    let dif = match ctx.config.channel_routing {
        ChannelRouting::Kinematic => zbed - zbed_d,
        ChannelRouting::Diffusion => (stage + zbed) - (stage_d + zbed_d),
    };
    let grad = dif / dist;
    let sf = if grad > 0.0 { grad } else { constants.eps };
    let crossa = shape.area(stage);
    let avg_crossa = 0.5 * (crossa + shape_d.area(stage_d));
    let hydraulic_radius = if avg_perim == 0.0 {
        0.0
    } else {
        avg_crossa / avg_perim
    };
    let outflow = overland_flow(hydraulic_radius, grad, sf, crossa, roughness);

    // Channel aquifer Darcy flow
    let (gw, gw_d) = (state.river_groundwater[r], state.river_groundwater[d]);
    let dif_sub = (gw + seg.z_min) - (gw_d + down.z_min);
    let thickness = avg_y(dif_sub, gw, gw_d, ctx.dry_depth());
    let avg_wid = 0.5
        * (shape.equivalent_width(shape.depth, constants.eps)
            + shape_d.equivalent_width(shape_d.depth, constants.eps));
    let avg_ksat = 0.5 * (bank_conductivity(ctx, r) + bank_conductivity(ctx, d));
    let aquifer = avg_ksat * (dif_sub / dist) * thickness * avg_wid;

    (outflow, aquifer)
}

/// Channel outflow through a network outlet.
fn outlet_flow(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    r: RiverIndex,
    outlet: &RiverOutlet,
) -> Result<f64, RhsError> {
    let seg = ctx.river(r);
    let shape = ctx.shape(r);
    let roughness = ctx.channel(r).roughness;
    let stage = ctx.state.stage[r];
    let crossa = shape.area(stage);
    let perim = shape.wetted_perimeter(stage);
    let outlet_bed = outlet.node_z_max - shape.depth;

    let q = match outlet.boundary {
        RiverBoundary::Dirichlet(s) => {
            let head_out = forcing.river_boundary_value(s, ctx.t)? + outlet_bed;
            let dist = distance(seg.centroid, outlet.node);
            let grad = (stage + ctx.z_bed(r) - head_out) / dist;
            let sf = grad.abs().max(ctx.slope_floor());
            let hydraulic_radius = if perim == 0.0 { 0.0 } else { crossa / perim };
            overland_flow(hydraulic_radius, grad, sf, crossa, roughness)
        }
        RiverBoundary::Neumann(s) => forcing.river_boundary_value(s, ctx.t)?,
        RiverBoundary::ZeroDepthGradient => {
            let dist = distance(seg.centroid, outlet.node);
            let grad = ((ctx.z_bed(r) - outlet_bed) / dist).max(0.0);
            let radius_term = if perim > 0.0 {
                (crossa / perim).powf(2.0 / 3.0)
            } else {
                0.0
            };
            grad.sqrt() * crossa * radius_term / roughness
        }
        RiverBoundary::CriticalDepth => crossa * (ctx.config.constants.gravity * stage).sqrt(),
    };
    Ok(q)
}

/// Exchange legs between segment `r` and bank element `e`.
///
/// Returns `(surface, river_to_groundwater, under_river)`, each positive from
/// the river side to the element.
fn bank_legs(
    ctx: &EvalContext,
    r: RiverIndex,
    e: ElementIndex,
    opposite: Option<ElementIndex>,
) -> (f64, f64, f64) {
    let state = ctx.state;
    let seg = ctx.river(r);
    let chan = ctx.channel(r);
    let elem = ctx.element(e);
    let (stage, rivgw) = (state.stage[r], state.river_groundwater[r]);
    let (surf, gw) = (state.surface[e], state.groundwater[e]);
    let zbed = ctx.z_bed(r);
    let dry = ctx.dry_depth();
    let dist = distance(seg.centroid, elem.centroid);
    let kh = ctx.effective_kh(e);

    let surface = bank_overflow(
        surf + elem.z_max,
        elem.z_max,
        stage + zbed,
        seg.z_max,
        chan.weir_coefficient,
        seg.length,
        ctx.config.constants.gravity,
    );

    // River water to element groundwater through the bank
    let dif = stage + zbed - (gw + elem.z_min);
    let elem_thickness = if elem.z_min > zbed {
        gw
    } else if elem.z_min + gw > zbed {
        elem.z_min + gw - zbed
    } else {
        0.0
    };
    let thickness = avg_y(dif, stage, elem_thickness, dry);
    let avg_ksat = 0.5 * (chan.k_sat_h + kh);
    let through_bank = seg.length * avg_ksat * (dif / dist) * thickness;

    // Channel aquifer to element groundwater below the bed
    let dif = (rivgw + seg.z_min) - (gw + elem.z_min);
    let elem_thickness = if elem.z_min > zbed {
        0.0
    } else if elem.z_min + gw > zbed {
        zbed - elem.z_min
    } else {
        gw
    };
    let thickness = avg_y(dif, rivgw, elem_thickness, dry);
    let banks_k = 0.5 * (kh + opposite.map_or(kh, |o| ctx.effective_kh(o)));
    let avg_ksat = 0.5 * (banks_k + kh);
    let under_river = seg.length * avg_ksat * (dif / dist) * thickness;

    (surface, through_bank, under_river)
}

/// River-to-channel-aquifer seepage through the bed.
fn bed_seepage(ctx: &EvalContext, r: RiverIndex) -> f64 {
    let seg = ctx.river(r);
    let chan = ctx.channel(r);
    let stage = ctx.state.stage[r];
    let aquifer_head = ctx.state.river_groundwater[r] + seg.z_min;
    let zbed = ctx.z_bed(r);

    let dif = if zbed - aquifer_head > 0.0 {
        stage
    } else {
        stage + zbed - aquifer_head
    };
    let wid = ctx
        .shape(r)
        .equivalent_width(stage, ctx.config.constants.eps);
    chan.k_sat_v * wid * seg.length * dif / chan.bed_thickness
}

const fn side_legs(side: BankSide) -> (FluxLeg, FluxLeg, FluxLeg) {
    match side {
        BankSide::Left => (
            FluxLeg::LeftSurface,
            FluxLeg::LeftSubsurface,
            FluxLeg::LeftUnderRiver,
        ),
        BankSide::Right => (
            FluxLeg::RightSurface,
            FluxLeg::RightSubsurface,
            FluxLeg::RightUnderRiver,
        ),
    }
}

/// Fill `rivers` and overwrite river-bank edges of `lateral`.
pub(crate) fn river_flow(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    lateral: &mut [ElementFluxes],
    rivers: &mut [RiverFluxes],
) -> Result<(), RhsError> {
    for f in rivers.iter_mut() {
        f.reset();
    }

    for r in RiverIndex::iter(ctx.mesh.n_rivers()) {
        let seg = ctx.river(r);

        match seg.downstream {
            Downstream::Segment(d) => {
                let (outflow, aquifer) = segment_to_segment(ctx, r, d);
                rivers[r][FluxLeg::Outflow] = outflow;
                rivers[d][FluxLeg::Inflow] -= outflow;
                rivers[r][FluxLeg::AquiferOutflow] = aquifer;
                rivers[d][FluxLeg::AquiferInflow] -= aquifer;
            }
            Downstream::Outlet(ref outlet) => {
                rivers[r][FluxLeg::Outflow] = outlet_flow(ctx, forcing, r, outlet)?;
                rivers[r][FluxLeg::AquiferOutflow] = 0.0;
            }
        }

        for (side, e) in seg.banks() {
            let opposite = seg.bank(side.opposite());
            let (mut surface, through_bank, under_river) = bank_legs(ctx, r, e, opposite);

            if let Some(j) = ctx.element(e).bank_edge(r) {
                let edge = &mut lateral[e.get()];
                if surface < 0.0 && surface < edge.surface[j] {
                    surface = -ctx.state.surface[e] / ctx.config.dt;
                }
                edge.surface[j] = -surface;
                edge.subsurface[j] = -(through_bank + under_river);
            }

            let (surface_leg, bank_leg, under_leg) = side_legs(side);
            rivers[r][surface_leg] = surface;
            rivers[r][bank_leg] = through_bank;
            rivers[r][under_leg] = under_river;
        }

        rivers[r][FluxLeg::BedSeepage] = bed_seepage(ctx, r);
    }
    Ok(())
}
