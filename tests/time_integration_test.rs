//! Running the hydrologic system through the bundled integrators.

use watershed_rs::diagnostics::{BalanceTracker, ExternalFluxes, StorageVolumes};
use watershed_rs::forcing::{ForcingTable, TimeSeries};
use watershed_rs::material::{
    ChannelMaterial, ChannelShape, LandCover, Macropore, MaterialTables, ShapeOrder,
    SoilProperties,
};
use watershed_rs::mesh::{Mesh, MeshBuilder, Node, ReachDownstream, RiverBoundary};
use watershed_rs::solver::StateComponent;
use watershed_rs::time::{BackwardEuler, TimeIntegrator};
use watershed_rs::{ElementIndex, HydroSystem, RiverIndex, SeriesIndex, StateLayout};

fn tables() -> MaterialTables {
    let mut t = MaterialTables::new();
    t.push_soil(SoilProperties {
        depth: 4.0,
        porosity: 0.45,
        infiltration_depth: 0.1,
        k_inf_v: 2.0e-6,
        k_sat_v: 1.0e-6,
        k_sat_h: 1.0e-5,
        alpha: 2.0,
        beta: 1.4,
        macropore: Some(Macropore {
            k_mac_v: 1.0e-4,
            k_mac_h: 1.0e-4,
            depth: 1.0,
            area_fraction_v: 0.01,
            area_fraction_h: 0.01,
        }),
    });
    t.push_land_cover(LandCover::new(0.2, 0.5));
    t.push_shape(ChannelShape::new(1.5, ShapeOrder::Triangle, 0.5));
    t.push_channel_material(ChannelMaterial {
        roughness: 0.04,
        weir_coefficient: 0.6,
        k_sat_h: 1.0e-5,
        k_sat_v: 1.0e-6,
        bed_thickness: 0.5,
        porosity: 0.3,
    });
    t
}

/// Unit square valley with a channel on its diagonal.
fn valley() -> Mesh {
    MeshBuilder::new(vec![
        Node::new(0.0, 0.0, 6.0, 10.0),
        Node::new(100.0, 0.0, 6.5, 10.5),
        Node::new(100.0, 100.0, 5.0, 9.0),
        Node::new(0.0, 100.0, 6.5, 10.5),
    ])
    .with_triangle([0, 1, 2], 0, 0)
    .with_triangle([0, 2, 3], 0, 0)
    .with_reach(
        0,
        2,
        0,
        0,
        ReachDownstream::Outlet(RiverBoundary::Neumann(SeriesIndex::new(0))),
    )
    .build()
    .unwrap()
}

fn initial_state(layout: StateLayout) -> Vec<f64> {
    let mut y = vec![0.0; layout.len()];
    for i in ElementIndex::iter(layout.n_elements) {
        y[layout.element_slot(StateComponent::Surface, i)] = 0.01;
        y[layout.element_slot(StateComponent::Unsaturated, i)] = 0.6;
        y[layout.element_slot(StateComponent::Groundwater, i)] = 2.0;
    }
    let r = RiverIndex::new(0);
    y[layout.river_slot(StateComponent::RiverStage, r)] = 0.3;
    y[layout.river_slot(StateComponent::RiverGroundwater, r)] = 1.5;
    y
}

#[test]
fn test_backward_euler_run_closes_water_balance() {
    let mesh = valley();
    let n = mesh.n_elements();
    let forcing = ForcingTable::new()
        .with_uniform_precipitation(n, TimeSeries::constant(1.0e-6))
        .with_river_boundaries(vec![TimeSeries::constant(0.0)]);
    let mut system = HydroSystem::builder(mesh, tables())
        .with_forcing(forcing)
        .build()
        .unwrap();

    let mut y = initial_state(system.layout());
    let initial = StorageVolumes::compute(&system, &y).unwrap();
    let mut tracker = BalanceTracker::new(initial, 0.0);
    let integrator = BackwardEuler::default().with_tolerance(1e-10);

    let dt = 60.0;
    let mut dy = vec![0.0; y.len()];
    for step in 0..10 {
        let t = step as f64 * dt;
        integrator.step(&mut system, &mut y, t, dt).unwrap();

        // Boundary flows at the accepted state
        system.evaluate(t + dt, &y, &mut dy).unwrap();
        let external = ExternalFluxes::from_last_evaluation(&system);
        let volumes = StorageVolumes::compute(&system, &y).unwrap();
        tracker.update(t + dt, volumes, &external, dt);
    }
    tracker.log_summary();

    assert!(y.iter().all(|v| v.is_finite()));
    assert!(tracker.cumulative_inflow() > 0.0);
    assert!(
        tracker.relative_error().abs() < 1e-7,
        "water balance residual {} ({} relative)",
        tracker.residual(),
        tracker.relative_error()
    );
}

#[test]
fn test_macropore_status_is_reported() {
    let mut system = HydroSystem::builder(valley(), tables()).build().unwrap();
    let layout = system.layout();
    let mut y = initial_state(layout);
    // Ponded, dry soil: steep infiltration gradient
    for i in ElementIndex::iter(layout.n_elements) {
        y[layout.element_slot(StateComponent::Surface, i)] = 0.2;
        y[layout.element_slot(StateComponent::Unsaturated, i)] = 0.05;
    }
    let mut dy = vec![0.0; y.len()];
    system.evaluate(0.0, &y, &mut dy).unwrap();

    assert_eq!(system.macropore_status().len(), layout.n_elements);
    assert!(
        system
            .macropore_status()
            .iter()
            .all(|s| *s != watershed_rs::material::MacroporeStatus::Matrix),
        "{:?}",
        system.macropore_status()
    );

    system.reset_macropores();
    assert!(
        system
            .macropore_status()
            .iter()
            .all(|s| *s == watershed_rs::material::MacroporeStatus::Matrix)
    );
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_serial() {
    let mut serial = HydroSystem::builder(valley(), tables()).build().unwrap();
    let mut parallel = HydroSystem::builder(valley(), tables())
        .with_parallel(true)
        .build()
        .unwrap();

    let y = initial_state(serial.layout());
    let mut dy_serial = vec![0.0; y.len()];
    let mut dy_parallel = vec![0.0; y.len()];
    serial.evaluate(0.0, &y, &mut dy_serial).unwrap();
    parallel.evaluate(0.0, &y, &mut dy_parallel).unwrap();

    assert_eq!(dy_serial, dy_parallel);
    assert_eq!(serial.element_fluxes(), parallel.element_fluxes());
}
