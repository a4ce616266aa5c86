//! Element-element and element-boundary lateral fluxes.
//!
//! Subsurface exchange is Darcy flow between groundwater heads; surface
//! exchange is Manning flow driven either by the ground slope (kinematic)
//! or by the water-surface slope (diffusion). Edges along a river get the
//! plain element-element value here and are overwritten by the river pass.

use super::flow_laws::{avg_y, gradient_magnitude, overland_flow};
use super::{ElementFluxes, EvalContext, RhsError};
use crate::config::SurfaceRouting;
use crate::forcing::ForcingProvider;
use crate::mesh::{EdgeNeighbor, ElementBoundary, distance};
use crate::types::ElementIndex;

// =============================================================================
// Surface slope estimator
// =============================================================================

/// Water-surface heads at the three stencil points of element `i`.
fn stencil_heads(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    i: ElementIndex,
) -> Result<[f64; 3], RhsError> {
    let elem = ctx.element(i);
    let own = elem.z_max + ctx.state.surface[i];
    let mut heads = [own; 3];

    for (j, edge) in elem.edges.iter().enumerate() {
        heads[j] = match *edge {
            EdgeNeighbor::Interior(n) => ctx.element(n).z_max + ctx.state.surface[n],
            EdgeNeighbor::RiverBank { river, .. } => {
                let stage = ctx.state.stage[river];
                if stage > ctx.shape(river).depth {
                    ctx.z_bed(river) + stage
                } else {
                    ctx.river(river).z_max
                }
            }
            EdgeNeighbor::Boundary(ElementBoundary::Dirichlet(s)) => {
                forcing.boundary_value(s, ctx.t)?
            }
            EdgeNeighbor::Boundary(_) => own,
        };
    }
    Ok(heads)
}

fn surface_slope(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    i: ElementIndex,
) -> Result<f64, RhsError> {
    let heads = stencil_heads(ctx, forcing, i)?;
    Ok(gradient_magnitude(&ctx.element(i).stencil, &heads))
}

/// Water-surface slope magnitude of every element.
///
/// Only needed for diffusion-wave routing; returns an empty vector otherwise.
pub(crate) fn surface_slopes(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
) -> Result<Vec<f64>, RhsError> {
    if ctx.config.surface_routing != SurfaceRouting::Diffusion {
        return Ok(Vec::new());
    }
    ElementIndex::iter(ctx.mesh.n_elements())
        .map(|i| surface_slope(ctx, forcing, i))
        .collect()
}

// =============================================================================
// Edge fluxes
// =============================================================================

/// Surface and subsurface flux from `i` to element `n` across edge `j`.
fn element_pair_flux(
    ctx: &EvalContext,
    slopes: &[f64],
    i: ElementIndex,
    n: ElementIndex,
    j: usize,
) -> (f64, f64) {
    let state = ctx.state;
    let dry = ctx.dry_depth();
    let elem = ctx.element(i);
    let nabr = ctx.element(n);
    let edge = elem.edge_lengths[j];
    let dist = distance(elem.centroid, nabr.centroid);

    // Darcy flow between groundwater heads
    let dif_sub = (state.groundwater[i] + elem.z_min) - (state.groundwater[n] + nabr.z_min);
    let thickness = avg_y(dif_sub, state.groundwater[i], state.groundwater[n], dry);
    let avg_ksat = 0.5 * (ctx.effective_kh(i) + ctx.effective_kh(n));
    let subsurface = avg_ksat * (dif_sub / dist) * thickness * edge;

    // Manning flow between ponded surfaces
    let (dif_surf, sf) = match ctx.config.surface_routing {
        SurfaceRouting::Kinematic => {
            let dif = elem.z_max - nabr.z_max;
            (dif, (dif / dist).abs())
        }
        SurfaceRouting::Diffusion => {
            let dif = (state.surface[i] + elem.z_max) - (state.surface[n] + nabr.z_max);
            (dif, 0.5 * (slopes[i] + slopes[n]))
        }
    };
    let sf = sf.max(ctx.slope_floor());
    let depth = avg_y(dif_surf, state.surface[i], state.surface[n], dry);
    let roughness = 0.5 * (ctx.land_cover(i).roughness + ctx.land_cover(n).roughness);
    let surface = overland_flow(depth, dif_surf / dist, sf, depth * edge, roughness);

    (surface, subsurface)
}

/// Subsurface flux from `i` towards a prescribed head across edge `j`.
fn dirichlet_flux(ctx: &EvalContext, i: ElementIndex, j: usize, head: f64) -> f64 {
    let elem = ctx.element(i);
    let gw = ctx.state.groundwater[i];
    let dif = gw + elem.z_min - head;
    let thickness = avg_y(dif, gw, head - elem.z_min, ctx.dry_depth());

    let mut dist = elem.circumcenter_edge_distance(j);
    if dist <= f64::EPSILON * elem.edge_lengths[j] {
        // Circumcenter on the edge: fall back to the centroid-edge distance
        dist = 2.0 * elem.area / (3.0 * elem.edge_lengths[j]);
    }

    ctx.effective_kh(i) * (dif / dist) * thickness * elem.edge_lengths[j]
}

/// Lateral fluxes of one element.
pub(crate) fn element_lateral(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    slopes: &[f64],
    i: ElementIndex,
) -> Result<ElementFluxes, RhsError> {
    let elem = ctx.element(i);
    let mut out = ElementFluxes::default();

    for (j, edge) in elem.edges.iter().enumerate() {
        let (surface, subsurface) = match *edge {
            EdgeNeighbor::Interior(n) => element_pair_flux(ctx, slopes, i, n, j),
            EdgeNeighbor::RiverBank { opposite, .. } => match opposite {
                Some(n) => element_pair_flux(ctx, slopes, i, n, j),
                None => (0.0, 0.0),
            },
            EdgeNeighbor::Boundary(ElementBoundary::NoFlow) => (0.0, 0.0),
            EdgeNeighbor::Boundary(ElementBoundary::Dirichlet(s)) => {
                let head = forcing.boundary_value(s, ctx.t)?;
                (0.0, dirichlet_flux(ctx, i, j, head))
            }
            EdgeNeighbor::Boundary(ElementBoundary::Neumann(s)) => {
                let q = forcing.boundary_value(s, ctx.t)?;
                (q, q)
            }
        };
        out.surface[j] = surface;
        out.subsurface[j] = subsurface;
    }
    Ok(out)
}

/// Fill `fluxes` with the lateral fluxes of every element.
pub(crate) fn lateral_flow(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    fluxes: &mut [ElementFluxes],
) -> Result<(), RhsError> {
    let slopes = surface_slopes(ctx, forcing)?;
    for (k, out) in fluxes.iter_mut().enumerate() {
        *out = element_lateral(ctx, forcing, &slopes, ElementIndex::new(k))?;
    }
    Ok(())
}

/// Parallel version of [`lateral_flow`]; results are bitwise identical.
#[cfg(feature = "parallel")]
pub(crate) fn lateral_flow_parallel(
    ctx: &EvalContext,
    forcing: &dyn ForcingProvider,
    fluxes: &mut [ElementFluxes],
) -> Result<(), RhsError> {
    use rayon::prelude::*;

    let slopes: Vec<f64> = if ctx.config.surface_routing == SurfaceRouting::Diffusion {
        (0..ctx.mesh.n_elements())
            .into_par_iter()
            .map(|k| surface_slope(ctx, forcing, ElementIndex::new(k)))
            .collect::<Result<_, _>>()?
    } else {
        Vec::new()
    };

    fluxes
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(k, out)| {
            *out = element_lateral(ctx, forcing, &slopes, ElementIndex::new(k))?;
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HydroConfig;
    use crate::forcing::{ForcingTable, TimeSeries};
    use crate::material::{LandCover, MaterialTables, SoilProperties};
    use crate::mesh::{Mesh, MeshBuilder, Node};
    use crate::solver::{HydroState, StateLayout};
    use crate::types::SeriesIndex;

    fn tables() -> MaterialTables {
        let mut t = MaterialTables::new();
        t.push_soil(SoilProperties {
            depth: 2.0,
            porosity: 0.4,
            infiltration_depth: 0.1,
            k_inf_v: 1.0e-5,
            k_sat_v: 1.0e-5,
            k_sat_h: 1.0e-4,
            alpha: 2.0,
            beta: 1.5,
            macropore: None,
        });
        t.push_land_cover(LandCover::new(0.1, 0.5));
        t
    }

    fn square(boundary: ElementBoundary) -> Mesh {
        MeshBuilder::new(vec![
            Node::new(0.0, 0.0, 0.0, 2.0),
            Node::new(10.0, 0.0, 0.0, 2.0),
            Node::new(10.0, 10.0, 0.0, 2.0),
            Node::new(0.0, 10.0, 0.0, 2.0),
        ])
        .with_triangle([0, 1, 2], 0, 0)
        .with_triangle([0, 2, 3], 0, 0)
        .with_boundary(1, 2, boundary)
        .build()
        .unwrap()
    }

    fn state(mesh: &Mesh, surf: [f64; 2], gw: [f64; 2]) -> HydroState {
        let layout = StateLayout::new(mesh.n_elements(), 0);
        let y = [surf[0], surf[1], 0.0, 0.0, gw[0], gw[1]];
        HydroState::from_vector(layout, &y).unwrap()
    }

    fn run(mesh: &Mesh, state: &HydroState, forcing: &ForcingTable) -> Vec<ElementFluxes> {
        let tables = tables();
        let config = HydroConfig::default();
        let ctx = EvalContext {
            mesh,
            tables: &tables,
            config: &config,
            state,
            t: 0.0,
        };
        let mut fluxes = vec![ElementFluxes::default(); mesh.n_elements()];
        lateral_flow(&ctx, forcing, &mut fluxes).unwrap();
        fluxes
    }

    #[test]
    fn test_pair_fluxes_are_antisymmetric() {
        let mesh = square(ElementBoundary::NoFlow);
        let s = state(&mesh, [0.05, 0.01], [1.5, 1.0]);
        let f = run(&mesh, &s, &ForcingTable::new());

        // Element 0 edge 1 and element 1 edge 2 are the shared diagonal.
        assert!(f[0].subsurface[1] > 0.0);
        assert_eq!(f[0].subsurface[1], -f[1].subsurface[2]);
        assert_eq!(f[0].surface[1], -f[1].surface[2]);
        assert_eq!(f[0].subsurface[0], 0.0);
        assert_eq!(f[0].surface[0], 0.0);
    }

    #[test]
    fn test_darcy_flux_magnitude() {
        let mesh = square(ElementBoundary::NoFlow);
        let s = state(&mesh, [0.0, 0.0], [1.5, 1.0]);
        let f = run(&mesh, &s, &ForcingTable::new());

        let a = mesh.element(ElementIndex::new(0));
        let b = mesh.element(ElementIndex::new(1));
        let dist = distance(a.centroid, b.centroid);
        let expected = 1.0e-4 * (0.5 / dist) * 1.5 * a.edge_lengths[1];
        assert!(
            (f[0].subsurface[1] - expected).abs() < 1e-15,
            "flux {} expected {}",
            f[0].subsurface[1],
            expected
        );
    }

    #[test]
    fn test_neumann_boundary_applies_series_to_both_legs() {
        let mesh = square(ElementBoundary::Neumann(SeriesIndex::new(0)));
        let s = state(&mesh, [0.0, 0.0], [1.0, 1.0]);
        let forcing =
            ForcingTable::new().with_element_boundaries(vec![TimeSeries::constant(-0.25)]);
        let f = run(&mesh, &s, &forcing);
        assert_eq!(f[0].surface[0], -0.25);
        assert_eq!(f[0].subsurface[0], -0.25);
    }

    #[test]
    fn test_dirichlet_boundary_drains_towards_lower_head() {
        let mesh = square(ElementBoundary::Dirichlet(SeriesIndex::new(0)));
        let s = state(&mesh, [0.1, 0.0], [1.0, 1.0]);
        let forcing =
            ForcingTable::new().with_element_boundaries(vec![TimeSeries::constant(0.5)]);
        let f = run(&mesh, &s, &forcing);
        assert_eq!(f[0].surface[0], 0.0);
        assert!(f[0].subsurface[0] > 0.0);
    }

    #[test]
    fn test_missing_boundary_series_propagates() {
        let mesh = square(ElementBoundary::Dirichlet(SeriesIndex::new(3)));
        let s = state(&mesh, [0.0, 0.0], [1.0, 1.0]);
        let tables = tables();
        let config = HydroConfig::default();
        let ctx = EvalContext {
            mesh: &mesh,
            tables: &tables,
            config: &config,
            state: &s,
            t: 0.0,
        };
        let mut fluxes = vec![ElementFluxes::default(); 2];
        assert!(matches!(
            lateral_flow(&ctx, &ForcingTable::new(), &mut fluxes),
            Err(RhsError::Forcing(_))
        ));
    }
}
