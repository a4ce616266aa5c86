use crate::mesh::{Downstream, EdgeNeighbor};
use crate::solver::{FluxLeg, HydroSystem, RhsError, StateComponent};
use crate::types::{ElementIndex, RiverIndex};

/// Water volume (m³) held in each storage, or its rate (m³/s).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StorageVolumes {
    pub surface: f64,
    pub unsaturated: f64,
    pub groundwater: f64,
    pub channel: f64,
    pub channel_aquifer: f64,
}

impl StorageVolumes {
    /// Volumes of a state vector. Negative entries count as empty.
    pub fn compute(system: &HydroSystem, y: &[f64]) -> Result<Self, RhsError> {
        Self::weighted(system, y, |v| v.max(0.0))
    }

    /// Volume rates of a derivative vector.
    pub fn rates(system: &HydroSystem, dy: &[f64]) -> Result<Self, RhsError> {
        Self::weighted(system, dy, |v| v)
    }

    fn weighted(
        system: &HydroSystem,
        v: &[f64],
        map: impl Fn(f64) -> f64,
    ) -> Result<Self, RhsError> {
        let layout = system.layout();
        layout.check(v)?;
        let mesh = system.mesh();
        let tables = system.tables();
        let eps = system.config().constants.eps;
        let mut out = Self::default();

        for i in ElementIndex::iter(layout.n_elements) {
            let elem = mesh.element(i);
            let porosity = tables.soil(elem.soil)?.porosity;
            let at = |c| map(v[layout.element_slot(c, i)]);
            out.surface += at(StateComponent::Surface) * elem.area;
            out.unsaturated += at(StateComponent::Unsaturated) * porosity * elem.area;
            out.groundwater += at(StateComponent::Groundwater) * porosity * elem.area;
        }

        for r in RiverIndex::iter(layout.n_rivers) {
            let seg = mesh.river(r);
            let shape = tables.shape(seg.shape)?;
            let porosity = tables.channel_material(seg.material)?.porosity;
            let area = seg.length * shape.equivalent_width(shape.depth, eps);
            let at = |c| map(v[layout.river_slot(c, r)]);
            out.channel += at(StateComponent::RiverStage) * area;
            out.channel_aquifer += at(StateComponent::RiverGroundwater) * porosity * area;
        }
        Ok(out)
    }

    pub fn total(&self) -> f64 {
        self.surface + self.unsaturated + self.groundwater + self.channel + self.channel_aquifer
    }

    pub fn summary_line(&self) -> String {
        format!(
            "surface={:.4e} unsat={:.4e} gw={:.4e} channel={:.4e} aquifer={:.4e} total={:.6e}",
            self.surface,
            self.unsaturated,
            self.groundwater,
            self.channel,
            self.channel_aquifer,
            self.total()
        )
    }
}

/// Flows across the domain boundary during the last evaluation (m³/s).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExternalFluxes {
    /// Net precipitation onto elements
    pub precipitation: f64,
    /// Soil evaporation plus transpiration
    pub evapotranspiration: f64,
    /// Outflow through Dirichlet and Neumann element edges
    pub element_boundary: f64,
    /// Outflow through river outlets
    pub outlet: f64,
}

impl ExternalFluxes {
    /// Read the flux buffers of the last [`HydroSystem::evaluate`] call.
    pub fn from_last_evaluation(system: &HydroSystem) -> Self {
        let mesh = system.mesh();
        let mut out = Self::default();

        for ((elem, forcing), fluxes) in mesh
            .elements()
            .iter()
            .zip(system.element_forcing())
            .zip(system.element_fluxes())
        {
            out.precipitation += forcing.net_precipitation * elem.area;
            out.evapotranspiration += (forcing.et.soil + forcing.et.transpiration) * elem.area;
            for j in 0..3 {
                if let EdgeNeighbor::Boundary(_) = elem.edges[j] {
                    out.element_boundary += fluxes.surface[j] + fluxes.subsurface[j];
                }
            }
        }

        for (seg, legs) in mesh.rivers().iter().zip(system.river_fluxes()) {
            if let Downstream::Outlet(_) = seg.downstream {
                out.outlet += legs[FluxLeg::Outflow] + legs[FluxLeg::AquiferOutflow];
            }
        }
        out
    }

    pub fn net_inflow(&self) -> f64 {
        self.precipitation - self.evapotranspiration - self.element_boundary - self.outlet
    }
}

/// Running water-balance check over an integration.
#[derive(Clone, Debug)]
pub struct BalanceTracker {
    initial: StorageVolumes,
    current: StorageVolumes,
    cumulative_inflow: f64,
    time: f64,
    n_updates: usize,
}

impl BalanceTracker {
    pub fn new(initial: StorageVolumes, time: f64) -> Self {
        Self {
            initial,
            current: initial,
            cumulative_inflow: 0.0,
            time,
            n_updates: 0,
        }
    }

    /// Record storage at `time` after a step of length `dt` with the given
    /// boundary flows.
    pub fn update(
        &mut self,
        time: f64,
        volumes: StorageVolumes,
        external: &ExternalFluxes,
        dt: f64,
    ) {
        self.cumulative_inflow += external.net_inflow() * dt;
        self.current = volumes;
        self.time = time;
        self.n_updates += 1;
    }

    pub fn initial(&self) -> &StorageVolumes {
        &self.initial
    }

    pub fn current(&self) -> &StorageVolumes {
        &self.current
    }

    /// Net volume that entered through the boundary so far (m³).
    pub fn cumulative_inflow(&self) -> f64 {
        self.cumulative_inflow
    }

    /// Storage change not explained by boundary flows (m³).
    pub fn residual(&self) -> f64 {
        self.current.total() - self.initial.total() - self.cumulative_inflow
    }

    /// Residual relative to the initial storage.
    pub fn relative_error(&self) -> f64 {
        self.residual() / self.initial.total().abs().max(f64::MIN_POSITIVE)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Water balance at t = {:.1} s ({} updates): residual {:.3e} m³ ({:.3e} relative)",
            self.time,
            self.n_updates,
            self.residual(),
            self.relative_error()
        );
        log::debug!("Initial: {}", self.initial.summary_line());
        log::debug!("Current: {}", self.current.summary_line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volumes(total: f64) -> StorageVolumes {
        StorageVolumes {
            groundwater: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_tracker_residual() {
        let mut tracker = BalanceTracker::new(volumes(100.0), 0.0);
        let external = ExternalFluxes {
            precipitation: 2.0,
            evapotranspiration: 0.5,
            ..Default::default()
        };
        tracker.update(10.0, volumes(115.0), &external, 10.0);
        assert!((tracker.cumulative_inflow() - 15.0).abs() < 1e-12);
        assert!(tracker.residual().abs() < 1e-12);

        tracker.update(20.0, volumes(131.0), &external, 10.0);
        assert!((tracker.residual() - 1.0).abs() < 1e-12);
        assert!((tracker.relative_error() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_net_inflow_signs() {
        let external = ExternalFluxes {
            precipitation: 3.0,
            evapotranspiration: 1.0,
            element_boundary: 0.5,
            outlet: 0.25,
        };
        assert!((external.net_inflow() - 1.25).abs() < 1e-12);
    }
}
