//! Scenario 1: straight horizontal single-phase gas pipe (spec.md §8.1).
//!
//! Same shape as the teacher-pack's tank-blowdown integration test: build a
//! concrete config/adapter pair, drive the public `TransientDriver` API for
//! a fixed horizon, then check trends rather than exact field values.

use pipeflow::config::{BoundaryKind, SimulationConfig};
use pipeflow::driver::{DriverState, TransientDriver};
use pipeflow::friction::darcy_friction_factor;
use pipeflow::stream::{FixedInletStream, PhaseSplit, RecordingOutletStream};
use pipeflow::thermo::MockThermoAdapter;

#[test]
fn single_phase_gas_pipe_reaches_steady_outlet_flow_without_slugs() {
    let mut config = SimulationConfig::default();
    config.pipe.length_m = 1000.0;
    config.pipe.diameter_m = 0.2;
    config.pipe.roughness_m = 1e-5;
    config.pipe.n_cells = 50;
    config.time.max_sim_time_s = 120.0;
    config.time.cfl = 0.5;
    config.boundary.inlet = BoundaryKind::ConstantFlow;
    config.boundary.outlet = BoundaryKind::ConstantPressure;
    config.boundary.inlet_mass_flow_kg_s = 2.0;
    config.boundary.outlet_pressure_pa = 40.0e5;
    config.slug.enable_inlet = true;
    config.slug.enable_terrain = true;

    // A gas with molar mass tuned so rho_g ~50 kg/m3 near the outlet
    // conditions, mu_g ~1e-5 Pa*s, matching the scenario's stated fluid.
    let thermo = MockThermoAdapter {
        molar_mass_g_kg_mol: 0.031,
        mu_g_ref: 1.0e-5,
        ..MockThermoAdapter::default()
    };

    let inlet = FixedInletStream {
        mass_flow_kg_s: 2.0,
        pressure_bar: 45.0,
        temperature_k: 300.0,
        phase_split: PhaseSplit {
            beta_gas: 1.0,
            beta_liquid: 0.0,
        },
        enthalpy_gas_j_kg: 3.0e5,
        enthalpy_liquid_j_kg: 1.0e5,
    };

    let mut driver = TransientDriver::initialize_pipe(config, thermo, &inlet)
        .expect("single-phase gas pipe should initialize cleanly");

    let mut outlet = RecordingOutletStream::default();
    driver
        .run_transient(120.0, &inlet, &mut outlet)
        .expect("transient run should not hit fatal instability");

    assert_eq!(driver.state(), DriverState::Paused);

    let rel_flow_error = (outlet.mass_flow_kg_s - 2.0).abs() / 2.0;
    println!(
        "outlet mass flow = {:.4} kg/s (target 2.0, rel error {:.3}%)",
        outlet.mass_flow_kg_s,
        rel_flow_error * 100.0
    );
    assert!(
        rel_flow_error < 0.25,
        "outlet mass flow {} kg/s strayed too far from the 2.0 kg/s inlet rate",
        outlet.mass_flow_kg_s
    );

    let inlet_cell = &driver.cells()[0];
    let outlet_cell = driver.cells().last().unwrap();
    let observed_dp = inlet_cell.pressure_pa - outlet_cell.pressure_pa;

    let u = 2.0 / (inlet_cell.rho_g.max(1e-6) * inlet_cell.area_m2);
    let re = (inlet_cell.rho_g * u.abs() * inlet_cell.diameter_m / inlet_cell.mu_g.max(1e-9)).max(1.0);
    let f = darcy_friction_factor(re, inlet_cell.roughness_m, inlet_cell.diameter_m);
    let reference_dp = f * (config_length(&driver) / inlet_cell.diameter_m) * inlet_cell.rho_g * u * u / 2.0;

    println!(
        "observed dp = {:.2} Pa, Darcy-Weisbach reference dp = {:.2} Pa",
        observed_dp, reference_dp
    );
    assert!(reference_dp > 0.0, "reference pressure drop must be positive");
    let ratio = observed_dp / reference_dp;
    assert!(
        ratio > 0.2 && ratio < 5.0,
        "observed dp {} Pa is not within an order of magnitude of the Darcy-Weisbach reference {} Pa",
        observed_dp,
        reference_dp
    );

    assert!(
        driver.slug_tracker().slugs.is_empty(),
        "single-phase gas scenario should not spawn slugs, found {}",
        driver.slug_tracker().slugs.len()
    );
    assert!(
        driver.slug_tracker().outlet_stats.is_empty(),
        "single-phase gas scenario should not see slugs arrive at the outlet"
    );

    println!("scenario 1 PASSED (steady flow, Darcy-Weisbach trend, no slugs)");
}

fn config_length(driver: &TransientDriver<MockThermoAdapter>) -> f64 {
    driver.cells().iter().map(|c| c.length_m).sum()
}
