//! The hydrologic right-hand side as a stateful system.
//!
//! [`HydroSystem`] owns the mesh, material tables, configuration and
//! forcing strategies plus the scratch buffers one evaluation fills. A call
//! to [`HydroSystem::evaluate`] runs four passes in fixed order:
//!
//! | Pass     | Produces                                         |
//! |----------|--------------------------------------------------|
//! | lateral  | element edge fluxes (overland and Darcy)         |
//! | vertical | infiltration and recharge per element            |
//! | river    | channel legs, bank exchange, bank-edge overrides |
//! | assembly | the derivative vector                            |
//!
//! The flux buffers stay readable after the call so a host can report
//! them.
//!
//! # Example
//!
//! ```
//! use watershed_rs::forcing::{ForcingTable, TimeSeries};
//! use watershed_rs::material::{LandCover, MaterialTables, SoilProperties};
//! use watershed_rs::mesh::{MeshBuilder, Node};
//! use watershed_rs::HydroSystem;
//!
//! let nodes = vec![
//!     Node::new(0.0, 0.0, 0.0, 2.0),
//!     Node::new(10.0, 0.0, 0.0, 2.0),
//!     Node::new(0.0, 10.0, 0.0, 2.0),
//! ];
//! let mesh = MeshBuilder::new(nodes).with_triangle([0, 1, 2], 0, 0).build().unwrap();
//!
//! let mut tables = MaterialTables::new();
//! tables.push_soil(SoilProperties {
//!     depth: 2.0,
//!     porosity: 0.4,
//!     infiltration_depth: 0.1,
//!     k_inf_v: 1e-5,
//!     k_sat_v: 1e-5,
//!     k_sat_h: 1e-4,
//!     alpha: 2.0,
//!     beta: 1.5,
//!     macropore: None,
//! });
//! tables.push_land_cover(LandCover::new(0.1, 0.5));
//!
//! let forcing = ForcingTable::new().with_uniform_precipitation(1, TimeSeries::constant(1e-6));
//! let mut system = HydroSystem::builder(mesh, tables)
//!     .with_forcing(forcing)
//!     .build()
//!     .unwrap();
//!
//! let y = vec![0.0, 0.5, 1.0];
//! let mut dy = vec![0.0; system.len()];
//! system.evaluate(0.0, &y, &mut dy).unwrap();
//! assert!(dy.iter().all(|v| v.is_finite()));
//! ```

use super::assembly::{assemble, check_finite};
use super::lateral::lateral_flow;
#[cfg(feature = "parallel")]
use super::lateral::lateral_flow_parallel;
use super::river::river_flow;
use super::vertical::vertical_flow;
use super::{
    ElementFluxes, ElementForcing, EvalContext, HydroState, MacroporeMemory, RhsError,
    RiverFluxes, StateLayout, VerticalFluxes,
};
use crate::config::HydroConfig;
use crate::forcing::{
    EvapotranspirationProvider, ForcingProvider, ForcingTable, InfiltrationCapacityProvider,
    StandaloneEt, TimeSeries, UnfrozenSoil,
};
use crate::material::{MacroporeStatus, MaterialTables};
use crate::mesh::Mesh;
use crate::types::ElementIndex;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HydroSystem`].
///
/// Unset strategies default to zero precipitation, zero standalone ET and
/// unfrozen soil.
pub struct HydroSystemBuilder {
    mesh: Mesh,
    tables: MaterialTables,
    config: HydroConfig,
    forcing: Option<Box<dyn ForcingProvider>>,
    evapotranspiration: Option<Box<dyn EvapotranspirationProvider>>,
    infiltration: Option<Box<dyn InfiltrationCapacityProvider>>,
    #[cfg(feature = "parallel")]
    parallel: bool,
}

impl HydroSystemBuilder {
    /// Set the solver configuration.
    pub fn with_config(mut self, config: HydroConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the precipitation and boundary-series provider.
    pub fn with_forcing(mut self, forcing: impl ForcingProvider + 'static) -> Self {
        self.forcing = Some(Box::new(forcing));
        self
    }

    /// Set the evapotranspiration provider.
    pub fn with_evapotranspiration(
        mut self,
        provider: impl EvapotranspirationProvider + 'static,
    ) -> Self {
        self.evapotranspiration = Some(Box::new(provider));
        self
    }

    /// Set the infiltration-capacity provider.
    pub fn with_infiltration_capacity(
        mut self,
        provider: impl InfiltrationCapacityProvider + 'static,
    ) -> Self {
        self.infiltration = Some(Box::new(provider));
        self
    }

    /// Compute element fluxes with rayon.
    #[cfg(feature = "parallel")]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate inputs and allocate scratch buffers.
    pub fn build(self) -> Result<HydroSystem, RhsError> {
        self.config.validate()?;
        self.tables.validate()?;
        self.mesh.validate_against(&self.tables)?;
        warn_shallow_macropores(&self.tables);

        let n_elements = self.mesh.n_elements();
        let n_rivers = self.mesh.n_rivers();
        let layout = StateLayout::new(n_elements, n_rivers);

        log::info!(
            "Hydro system: {} elements, {} river segments, {} state slots, dt = {} s",
            n_elements,
            n_rivers,
            layout.len(),
            self.config.dt
        );

        let forcing = self.forcing.unwrap_or_else(|| {
            Box::new(
                ForcingTable::new()
                    .with_uniform_precipitation(n_elements, TimeSeries::constant(0.0)),
            )
        });
        let evapotranspiration = self
            .evapotranspiration
            .unwrap_or_else(|| Box::new(StandaloneEt::zero(n_elements)));
        let infiltration = self
            .infiltration
            .unwrap_or_else(|| Box::new(UnfrozenSoil));

        Ok(HydroSystem {
            mesh: self.mesh,
            tables: self.tables,
            config: self.config,
            forcing,
            evapotranspiration,
            infiltration,
            layout,
            state: HydroState::new(layout),
            element_forcing: vec![ElementForcing::default(); n_elements],
            element_fluxes: vec![ElementFluxes::default(); n_elements],
            vertical_fluxes: vec![VerticalFluxes::default(); n_elements],
            river_fluxes: vec![RiverFluxes::default(); n_rivers],
            macropores: MacroporeMemory::new(n_elements),
            #[cfg(feature = "parallel")]
            parallel: self.parallel,
        })
    }
}

fn warn_shallow_macropores(tables: &MaterialTables) {
    for (k, soil) in tables.soils.iter().enumerate() {
        if let Some(mac) = &soil.macropore {
            if mac.depth < soil.infiltration_depth {
                log::warn!(
                    "Soil {}: macropore depth {} is shallower than infiltration layer {}",
                    k,
                    mac.depth,
                    soil.infiltration_depth
                );
            }
        }
    }
}

// ============================================================================
// System
// ============================================================================

/// Hydrologic right-hand side over a fixed mesh.
pub struct HydroSystem {
    mesh: Mesh,
    tables: MaterialTables,
    config: HydroConfig,
    forcing: Box<dyn ForcingProvider>,
    evapotranspiration: Box<dyn EvapotranspirationProvider>,
    infiltration: Box<dyn InfiltrationCapacityProvider>,
    layout: StateLayout,
    state: HydroState,
    element_forcing: Vec<ElementForcing>,
    element_fluxes: Vec<ElementFluxes>,
    vertical_fluxes: Vec<VerticalFluxes>,
    river_fluxes: Vec<RiverFluxes>,
    macropores: MacroporeMemory,
    #[cfg(feature = "parallel")]
    parallel: bool,
}

impl HydroSystem {
    /// Start building a system over `mesh` with `tables`.
    pub fn builder(mesh: Mesh, tables: MaterialTables) -> HydroSystemBuilder {
        HydroSystemBuilder {
            mesh,
            tables,
            config: HydroConfig::default(),
            forcing: None,
            evapotranspiration: None,
            infiltration: None,
            #[cfg(feature = "parallel")]
            parallel: false,
        }
    }

    /// Length of the state vector.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Evaluate `dy = f(t, y)`.
    ///
    /// Negative entries of `y` are read as zero. `dy` is overwritten. On
    /// error the content of `dy` is unspecified.
    pub fn evaluate(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> Result<(), RhsError> {
        self.layout.check(dy)?;
        self.state.unpack(self.layout, y)?;
        dy.fill(0.0);

        for (k, f) in self.element_forcing.iter_mut().enumerate() {
            let i = ElementIndex::new(k);
            *f = ElementForcing {
                net_precipitation: self.forcing.net_precipitation(i, t)?,
                et: self.evapotranspiration.components(i, t)?,
                transpiration_from_saturated: self
                    .evapotranspiration
                    .transpiration_from_saturated(i),
            };
        }

        let ctx = EvalContext {
            mesh: &self.mesh,
            tables: &self.tables,
            config: &self.config,
            state: &self.state,
            t,
        };
        let scheme = self.evapotranspiration.scheme();

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                lateral_flow_parallel(&ctx, self.forcing.as_ref(), &mut self.element_fluxes)?;
            } else {
                lateral_flow(&ctx, self.forcing.as_ref(), &mut self.element_fluxes)?;
            }
        }
        #[cfg(not(feature = "parallel"))]
        lateral_flow(&ctx, self.forcing.as_ref(), &mut self.element_fluxes)?;

        vertical_flow(
            &ctx,
            scheme,
            self.infiltration.as_ref(),
            &self.element_forcing,
            &self.element_fluxes,
            &mut self.macropores,
            &mut self.vertical_fluxes,
        );

        river_flow(
            &ctx,
            self.forcing.as_ref(),
            &mut self.element_fluxes,
            &mut self.river_fluxes,
        )?;

        assemble(
            &ctx,
            self.layout,
            scheme,
            &self.element_forcing,
            &self.element_fluxes,
            &self.vertical_fluxes,
            &self.river_fluxes,
            dy,
        );

        check_finite(self.layout, dy, t)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn tables(&self) -> &MaterialTables {
        &self.tables
    }

    pub fn config(&self) -> &HydroConfig {
        &self.config
    }

    /// Clipped state of the last evaluation.
    pub fn state(&self) -> &HydroState {
        &self.state
    }

    /// Edge fluxes of the last evaluation, river-bank edges overridden.
    pub fn element_fluxes(&self) -> &[ElementFluxes] {
        &self.element_fluxes
    }

    /// Infiltration and recharge of the last evaluation.
    pub fn vertical_fluxes(&self) -> &[VerticalFluxes] {
        &self.vertical_fluxes
    }

    pub fn river_fluxes(&self) -> &[RiverFluxes] {
        &self.river_fluxes
    }

    /// Forcing gathered for the last evaluation.
    pub fn element_forcing(&self) -> &[ElementForcing] {
        &self.element_forcing
    }

    /// Macropore status carried from the last evaluation.
    pub fn macropore_status(&self) -> &[MacroporeStatus] {
        self.macropores.as_slice()
    }

    // ========================================================================
    // Updates between integration batches
    // ========================================================================

    pub fn set_forcing(&mut self, forcing: impl ForcingProvider + 'static) {
        self.forcing = Box::new(forcing);
    }

    pub fn set_evapotranspiration(&mut self, provider: impl EvapotranspirationProvider + 'static) {
        self.evapotranspiration = Box::new(provider);
    }

    pub fn set_infiltration_capacity(
        &mut self,
        provider: impl InfiltrationCapacityProvider + 'static,
    ) {
        self.infiltration = Box::new(provider);
    }

    /// Replace the material tables, e.g. after a soil-parameter update.
    ///
    /// The tables must still cover every index the mesh references.
    pub fn set_tables(&mut self, tables: MaterialTables) -> Result<(), RhsError> {
        tables.validate()?;
        self.mesh.validate_against(&tables)?;
        warn_shallow_macropores(&tables);
        self.tables = tables;
        Ok(())
    }

    /// Change the nominal step used by the infiltration bound.
    pub fn set_config(&mut self, config: HydroConfig) -> Result<(), RhsError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Forget the macropore regime of every element.
    pub fn reset_macropores(&mut self) {
        self.macropores = MacroporeMemory::new(self.mesh.n_elements());
    }
}
