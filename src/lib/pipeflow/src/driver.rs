//! Transient driver: mesh construction, the per-step orchestration loop,
//! and the persisted snapshot (spec.md §4.9, §5, §6).
//!
//! Shaped after the teacher's `ReservoirSimulator`/`step_internal`: a
//! state machine that owns the mesh and steps it forward in bounded
//! retries, shrinking `dt` on instability rather than failing the whole
//! external step. `run_transient` is the direct analogue of
//! `step_internal`'s `while time_stepped < target_dt_days && attempts <
//! MAX_ATTEMPTS` loop, generalized from days to seconds and from a single
//! pressure equation to the two-fluid AUSM+ update.

use serde::{Deserialize, Serialize};

use crate::accumulation::{self, AccumulationZone};
use crate::cell::{Cell, ConservativeState};
use crate::config::{BoundaryConfig, BoundaryKind, SimulationConfig};
use crate::drift_flux::{self, distribution_params};
use crate::error::{SimError, SimResult, SimWarning, WarningCounters};
use crate::flux::{self, FaceFlux, StreamFaceData};
use crate::integrator;
use crate::regime::{self, RegimeInputs};
use crate::rng::SimRng;
use crate::slug::SlugTracker;
use crate::stream::{InletStream, OutletStream};
use crate::thermo::{PhaseProperties, ThermoAdapter};

const GRAVITY: f64 = 9.80665;
const MAX_SUBSTEP_ATTEMPTS: u32 = 10;
const MAX_CONSECUTIVE_INSTABILITY: u32 = 10;

/// Driver lifecycle state (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Initialised,
    Running,
    Paused,
    Finished,
}

/// One history sample (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySample {
    pub t_s: f64,
    pub pressures_pa: Vec<f64>,
    pub temperatures_k: Vec<f64>,
}

/// Full persisted state (spec.md §6): enough to resume the simulation or
/// inspect it after a fatal halt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSnapshot {
    pub t_s: f64,
    pub dt_s: f64,
    pub cells: Vec<Cell>,
    pub slugs: Vec<crate::slug::SlugUnit>,
    pub accumulation_zones: Vec<AccumulationZone>,
    pub slug_id_counter: u64,
    pub history: Vec<HistorySample>,
}

fn apply_phase_properties(cell: &mut Cell, props: &PhaseProperties) {
    cell.rho_g = props.rho_g;
    cell.rho_l = props.rho_l;
    cell.mu_g = props.mu_g;
    cell.mu_l = props.mu_l;
    cell.h_g = props.h_g;
    cell.h_l = props.h_l;
    cell.cp_mixture = props.cp_mixture;
    cell.sigma = props.sigma;
    cell.c_g = props.c_g;
    cell.c_l = props.c_l;
    cell.mu_jt = props.mu_jt;
}

fn build_elevation_profile(config: &SimulationConfig, dx: f64) -> Vec<f64> {
    let n = config.pipe.n_cells;
    if let Some(profile) = &config.pipe.elevation_profile_m {
        return profile.clone();
    }
    if let Some(profile) = &config.pipe.inclination_profile_rad {
        let mut elevation = vec![0.0; n];
        let mut cumulative = 0.0;
        for i in 0..n {
            elevation[i] = cumulative;
            cumulative += profile[i].sin() * dx;
        }
        return elevation;
    }
    vec![0.0; n]
}

fn inlet_pressure_estimate(config: &SimulationConfig, inlet: &dyn InletStream) -> f64 {
    match config.boundary.inlet {
        BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
            config.boundary.inlet_pressure_pa
        }
        _ => inlet.pressure_bar() * 1.0e5,
    }
}

fn outlet_pressure_estimate(config: &SimulationConfig) -> f64 {
    match config.boundary.outlet {
        BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
            config.boundary.outlet_pressure_pa
        }
        _ => 0.8 * config.boundary.inlet_pressure_pa,
    }
}

fn build_inlet_stream_data(config: &BoundaryConfig, inlet: &dyn InletStream) -> Option<StreamFaceData> {
    match config.inlet {
        BoundaryKind::ConstantFlow | BoundaryKind::TransientFlow => {
            let split = inlet.phase_split();
            Some(StreamFaceData {
                mass_flow_kg_s: inlet.mass_flow_kg_s(),
                holdup_gas: split.beta_gas.clamp(0.0, 1.0),
                enthalpy_gas_j_kg: inlet.enthalpy_gas_j_kg(),
                enthalpy_liquid_j_kg: inlet.enthalpy_liquid_j_kg(),
            })
        }
        _ => None,
    }
}

fn build_outlet_stream_data(config: &BoundaryConfig, last_cell: &Cell) -> Option<StreamFaceData> {
    match config.outlet {
        BoundaryKind::ConstantFlow | BoundaryKind::TransientFlow => Some(StreamFaceData {
            mass_flow_kg_s: config.outlet_mass_flow_kg_s,
            holdup_gas: last_cell.alpha_g,
            enthalpy_gas_j_kg: last_cell.h_g,
            enthalpy_liquid_j_kg: last_cell.h_l,
        }),
        _ => None,
    }
}

/// Invert the post-flux conservative state back to primitives and apply
/// the acoustic pressure update (spec.md §4.5/§4.9): `dp = c_mix^2 *
/// drho`, clamped to ±5% per step, phase velocities split from the new
/// mixture velocity via the regime's drift-flux closure.
fn invert_primitives(cell: &mut Cell, state: ConservativeState, previous_rho_m: f64, mu_g: f64, roughness: f64) {
    let (alpha_g, alpha_l, u_m) = state.to_primitives(cell.rho_g, cell.rho_l);
    cell.alpha_g = alpha_g;
    cell.alpha_l = alpha_l;
    cell.u_m = u_m;

    let new_rho_m = alpha_g * cell.rho_g + alpha_l * cell.rho_l;
    let max_drho = 0.05 * previous_rho_m.abs().max(1e-6);
    let drho = (new_rho_m - previous_rho_m).clamp(-max_drho, max_drho);
    let c_mix = cell.c_g.min(cell.c_l).max(10.0);
    let max_dp = 0.05 * cell.pressure_pa.abs().max(1.0);
    let dp = (c_mix * c_mix * drho).clamp(-max_dp, max_dp);
    cell.pressure_pa += dp;

    let params = distribution_params(cell, mu_g, roughness);
    let u_g = params.c0 * u_m + params.v_d;
    let rho_m = new_rho_m.max(1e-6);
    let u_l = if alpha_l > 1e-6 {
        (rho_m * u_m - cell.rho_g * alpha_g * u_g) / (cell.rho_l * alpha_l)
    } else {
        u_m
    };
    cell.u_g = u_g;
    cell.u_l = u_l;
}

/// Boundary-cell pressure correction (spec.md §4.5): BC value for
/// pressure-type boundaries, gravity-corrected extrapolation from the
/// neighbour otherwise.
fn apply_boundary_pressure_correction(
    cell: &mut Cell,
    i: usize,
    n: usize,
    boundary: &BoundaryConfig,
    snapshot: &[Cell],
    warnings: &mut WarningCounters,
) {
    if i == 0 {
        match boundary.inlet {
            BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
                let requested = boundary.inlet_pressure_pa;
                let clamped = requested.clamp(1.0e5, 5.0e7);
                if (clamped - requested).abs() > 1.0 {
                    warnings.record(SimWarning::BoundaryUnsatisfiable {
                        requested_pa: requested,
                        clamped_pa: clamped,
                    });
                }
                cell.pressure_pa = clamped;
            }
            _ if n > 1 => {
                let neighbor = &snapshot[1];
                let dp_gravity = -cell.rho_m * GRAVITY * cell.inclination_rad.sin() * cell.length_m;
                cell.pressure_pa = (neighbor.pressure_pa - dp_gravity).clamp(1.0e5, 5.0e7);
            }
            _ => {}
        }
    } else if i == n - 1 {
        match boundary.outlet {
            BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
                let requested = boundary.outlet_pressure_pa;
                let clamped = requested.clamp(1.0e5, 5.0e7);
                if (clamped - requested).abs() > 1.0 {
                    warnings.record(SimWarning::BoundaryUnsatisfiable {
                        requested_pa: requested,
                        clamped_pa: clamped,
                    });
                }
                cell.pressure_pa = clamped;
            }
            _ if n > 1 => {
                let neighbor = &snapshot[n - 2];
                let dp_gravity = -cell.rho_m * GRAVITY * cell.inclination_rad.sin() * cell.length_m;
                cell.pressure_pa = (neighbor.pressure_pa + dp_gravity).clamp(1.0e5, 5.0e7);
            }
            _ => {}
        }
    }
}

/// Outlet mass flow rate (spec.md §4.9): effective density × u_m × A, using
/// the slug body's own holdup rather than the Eulerian cell average when the
/// outlet cell is currently covered by a slug (spec.md §4.8 "slug_holdup").
fn outlet_mass_flow_kg_s(cell: &Cell) -> f64 {
    let rho_eff = if cell.in_slug_body {
        cell.slug_holdup * cell.rho_l + (1.0 - cell.slug_holdup) * cell.rho_g
    } else {
        cell.rho_m
    };
    rho_eff * cell.u_m * cell.area_m2
}

/// Rebuild primitive cells for one RK stage from its conservative state,
/// without boundary-pressure correction or warning bookkeeping (that is
/// applied once, to the final stage, by the caller).
fn stage_cells(snapshot: &[Cell], state: &[ConservativeState]) -> Vec<Cell> {
    snapshot
        .iter()
        .zip(state.iter())
        .map(|(base, s)| {
            let mut cell = base.clone();
            invert_primitives(&mut cell, *s, base.rho_m, base.mu_g, base.roughness_m);
            cell.enforce_invariants();
            cell
        })
        .collect()
}

fn compute_faces(snapshot: &[Cell], boundary: &BoundaryConfig, inlet: &dyn InletStream) -> Vec<FaceFlux> {
    let n = snapshot.len();
    let mut faces = Vec::with_capacity(n + 1);

    let inlet_stream = build_inlet_stream_data(boundary, inlet);
    faces.push(flux::inlet_boundary_flux(boundary, &snapshot[0], inlet_stream.as_ref()));

    for i in 0..n.saturating_sub(1) {
        faces.push(flux::ausm_plus_face_flux(&snapshot[i], &snapshot[i + 1]));
    }

    let outlet_stream = build_outlet_stream_data(boundary, &snapshot[n - 1]);
    faces.push(flux::outlet_boundary_flux(boundary, &snapshot[n - 1], outlet_stream.as_ref()));

    faces
}

/// The running transient solver, including mesh state, slug/accumulation
/// trackers, and warning/history bookkeeping (spec.md §4.9).
pub struct TransientDriver<T: ThermoAdapter> {
    config: SimulationConfig,
    state: DriverState,
    cells: Vec<Cell>,
    accumulation_zones: Vec<AccumulationZone>,
    slug_tracker: SlugTracker,
    rng: SimRng,
    thermo: T,
    t_s: f64,
    step_count: u64,
    consecutive_instability_steps: u32,
    warnings: WarningCounters,
    last_error: Option<SimError>,
    history: Vec<HistorySample>,
}

impl<T: ThermoAdapter> TransientDriver<T> {
    /// Build the mesh, identify low points, seed an initial pressure
    /// profile, and run one TP flash per cell (spec.md §4.9 step 0).
    pub fn initialize_pipe(config: SimulationConfig, thermo: T, inlet: &dyn InletStream) -> SimResult<Self> {
        config.validate()?;

        let n = config.pipe.n_cells;
        let dx = config.pipe.length_m / n as f64;
        let elevations = build_elevation_profile(&config, dx);

        let mut cells = Vec::with_capacity(n);
        for i in 0..n {
            let elevation_m = elevations[i];
            let inclination_rad = if i + 1 < n {
                ((elevations[i + 1] - elevation_m) / dx).atan()
            } else if i > 0 {
                ((elevation_m - elevations[i - 1]) / dx).atan()
            } else {
                0.0
            };
            let position_m = (i as f64 + 0.5) * dx;
            cells.push(Cell::new(
                position_m,
                dx,
                config.pipe.diameter_m,
                inclination_rad,
                elevation_m,
                config.pipe.roughness_m,
            ));
        }

        let inlet_pressure_pa = inlet_pressure_estimate(&config, inlet);
        let outlet_pressure_pa = outlet_pressure_estimate(&config);
        for (i, cell) in cells.iter_mut().enumerate() {
            let frac = (i as f64 + 0.5) / n as f64;
            cell.pressure_pa =
                (inlet_pressure_pa + frac * (outlet_pressure_pa - inlet_pressure_pa)).clamp(1.0e5, 5.0e7);
            cell.temperature_k = inlet.temperature_k();
        }

        let mut warnings = WarningCounters::default();
        for (i, cell) in cells.iter_mut().enumerate() {
            match thermo.flash_pt(cell.pressure_pa, cell.temperature_k) {
                Ok(props) => apply_phase_properties(cell, &props),
                Err(err) => warnings.record(SimWarning::ThermoFailure {
                    cell_index: i,
                    kind: err.kind,
                }),
            }
            cell.enforce_invariants();
        }

        let accumulation_zones = accumulation::identify_low_points(&cells);
        let rng_seed = config.rng_seed;

        Ok(TransientDriver {
            config,
            state: DriverState::Initialised,
            cells,
            accumulation_zones,
            slug_tracker: SlugTracker::new(),
            rng: SimRng::from_seed(rng_seed),
            thermo,
            t_s: 0.0,
            step_count: 0,
            consecutive_instability_steps: 0,
            warnings,
            last_error: None,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn slug_tracker(&self) -> &SlugTracker {
        &self.slug_tracker
    }

    pub fn accumulation_zones(&self) -> &[AccumulationZone] {
        &self.accumulation_zones
    }

    pub fn warning_counts(&self) -> &WarningCounters {
        &self.warnings
    }

    pub fn last_warning(&self) -> Option<&SimWarning> {
        self.warnings.last()
    }

    pub fn history(&self) -> &[HistorySample] {
        &self.history
    }

    pub fn t_s(&self) -> f64 {
        self.t_s
    }

    /// Preserve the current state for post-mortem inspection after a fatal
    /// halt (spec.md §6/§7).
    pub fn snapshot(&self, dt_s: f64) -> SimulationSnapshot {
        SimulationSnapshot {
            t_s: self.t_s,
            dt_s,
            cells: self.cells.clone(),
            slugs: self.slug_tracker.slugs.clone(),
            accumulation_zones: self.accumulation_zones.clone(),
            slug_id_counter: self.slug_tracker.slugs.iter().map(|s| s.id).max().map(|m| m + 1).unwrap_or(0),
            history: self.history.clone(),
        }
    }

    fn refresh_regimes(&mut self) {
        for cell in self.cells.iter_mut() {
            let inputs = RegimeInputs {
                u_sl: cell.u_sl,
                u_sg: cell.u_sg,
                d: cell.diameter_m,
                theta_rad: cell.inclination_rad,
                rho_l: cell.rho_l,
                rho_g: cell.rho_g,
                mu_l: cell.mu_l,
                sigma: cell.sigma,
            };
            cell.regime = match self.config.regime.detection {
                crate::config::RegimeDetectionMode::Mechanistic => {
                    regime::detect_regime(&inputs, cell.mu_g, cell.roughness_m)
                }
                crate::config::RegimeDetectionMode::MinimumSlip => {
                    regime::detect_regime_minimum_slip(&inputs, cell.mu_g, cell.roughness_m)
                }
            };
        }
    }

    fn refresh_thermo(&mut self) {
        for (i, cell) in self.cells.iter_mut().enumerate() {
            match self.thermo.flash_pt(cell.pressure_pa, cell.temperature_k) {
                Ok(props) => apply_phase_properties(cell, &props),
                Err(err) => self.warnings.record(SimWarning::ThermoFailure {
                    cell_index: i,
                    kind: err.kind,
                }),
            }
            cell.enforce_invariants();
        }
    }

    fn record_history(&mut self) {
        self.history.push(HistorySample {
            t_s: self.t_s,
            pressures_pa: self.cells.iter().map(|c| c.pressure_pa).collect(),
            temperatures_k: self.cells.iter().map(|c| c.temperature_k).collect(),
        });
    }

    /// Integrate with the configured scheme, re-assembling AUSM+ fluxes and
    /// sources from each stage's own state so multi-stage schemes are
    /// genuinely higher-order, then invert to primitives and apply the
    /// boundary pressure correction (spec.md §4.5/§4.6/§4.9). Heat transfer
    /// is folded in afterward if enabled.
    fn apply_conservative_update(&mut self, dt: f64, inlet: &dyn InletStream) {
        let snapshot = self.cells.clone();
        let n = snapshot.len();

        let state: Vec<ConservativeState> = snapshot.iter().map(ConservativeState::from_cell).collect();

        let rhs = |current: &[ConservativeState]| -> Vec<ConservativeState> {
            // Re-derive primitives and re-assemble AUSM+ fluxes + sources
            // from the stage state so multi-stage schemes (Heun/RK4/SSP-RK3)
            // are genuinely higher-order rather than degenerating to Euler.
            let stage = stage_cells(&snapshot, current);
            let faces = compute_faces(&stage, &self.config.boundary, inlet);

            (0..n)
                .map(|i| {
                    let dx = stage[i].length_m.max(1e-9);
                    let left = faces[i];
                    let right = faces[i + 1];

                    let mut source_cell = stage[i].clone();
                    let source_mu_g = source_cell.mu_g;
                    let source_roughness = source_cell.roughness_m;
                    drift_flux::pressure_gradient(&mut source_cell, source_mu_g, source_roughness);
                    let s_momentum = source_cell.gravity_gradient_pa_m + source_cell.friction_gradient_pa_m;

                    ConservativeState {
                        gas_mass: -(right.gas_mass_flux - left.gas_mass_flux) / dx,
                        liquid_mass: -(right.liquid_mass_flux - left.liquid_mass_flux) / dx,
                        momentum: -(right.momentum_flux - left.momentum_flux) / dx + s_momentum,
                        energy: -(right.energy_flux - left.energy_flux) / dx,
                    }
                })
                .collect()
        };

        let new_state = integrator::step(self.config.time.scheme, &state, rhs, dt);

        for i in 0..n {
            let previous_rho_m = snapshot[i].rho_m;
            let cell = &mut self.cells[i];
            invert_primitives(cell, new_state[i], previous_rho_m, snapshot[i].mu_g, snapshot[i].roughness_m);
            apply_boundary_pressure_correction(cell, i, n, &self.config.boundary, &snapshot, &mut self.warnings);

            if self.config.heat.enabled {
                let mass_flow_kg_s = cell.rho_m * cell.u_m * cell.area_m2;
                let delta_t = drift_flux::energy_delta_t(
                    cell,
                    self.config.heat.u_overall,
                    self.config.heat.t_ambient_k,
                    cell.mu_jt,
                    mass_flow_kg_s,
                );
                cell.temperature_k += delta_t;
            }

            cell.enforce_invariants();
        }
    }

    /// Single bounded-retry internal step (spec.md §4.9/§7), grounded on
    /// the teacher's `step_internal` shrink-on-instability shape: try the
    /// candidate `dt`; if too many cells come back non-finite, revert and
    /// redo at `dt_min`, reverting any cell still non-finite to its prior
    /// value and counting it as a recovered instability.
    fn advance_internal_step(&mut self, dt: f64, inlet: &dyn InletStream) -> f64 {
        let previous_cells = self.cells.clone();
        self.apply_conservative_update(dt, inlet);

        let nan_count = self
            .cells
            .iter()
            .filter(|c| !ConservativeState::from_cell(c).is_finite())
            .count();
        let nan_fraction = nan_count as f64 / self.cells.len().max(1) as f64;

        if nan_fraction >= 0.25 {
            self.cells = previous_cells.clone();
            let dt_min = self.config.time.dt_min_s.min(dt);
            self.apply_conservative_update(dt_min, inlet);

            let mut reverted = 0usize;
            for (cell, prev) in self.cells.iter_mut().zip(previous_cells.iter()) {
                if !ConservativeState::from_cell(cell).is_finite() {
                    *cell = prev.clone();
                    reverted += 1;
                }
            }
            self.warnings.record(SimWarning::NumericalInstabilityRecovered {
                reverted_cells: reverted,
            });
            self.consecutive_instability_steps += 1;
            self.t_s += dt_min;
            self.post_flux_updates(dt_min, inlet);
            dt_min
        } else {
            self.consecutive_instability_steps = 0;
            self.t_s += dt;
            self.post_flux_updates(dt, inlet);
            dt
        }
    }

    fn post_flux_updates(&mut self, dt: f64, inlet: &dyn InletStream) {
        self.refresh_regimes();

        let roughness = self.config.pipe.roughness_m;
        let mu_g = self.cells.first().map(|c| c.mu_g).unwrap_or(1.2e-5);
        let alpha_l_equilibrium = 0.02;

        let terrain_seeds = accumulation::advance(
            &mut self.accumulation_zones,
            &self.cells,
            alpha_l_equilibrium,
            self.t_s,
            dt,
            &self.config.slug,
            &mut self.warnings,
        );

        // Inlet slugging frequency falls back to the boundary-requested
        // flow when the first cell's own velocity is too small to carry a
        // meaningful Froude number (spec.md §4.8 note).
        let original_first_u_m = self.cells.first().map(|c| c.u_m);
        if let Some(first) = self.cells.first_mut() {
            if first.u_m.abs() < 0.1 {
                let rho_m = first.rho_m.max(1e-6);
                first.u_m = inlet.mass_flow_kg_s() / (rho_m * first.area_m2.max(1e-9));
            }
        }

        self.slug_tracker.step(
            &mut self.cells,
            terrain_seeds,
            &self.config.slug,
            self.t_s,
            dt,
            mu_g,
            roughness,
            self.config.pipe.length_m,
            &mut self.rng,
            &mut self.warnings,
        );

        if let (Some(original), Some(first)) = (original_first_u_m, self.cells.first_mut()) {
            first.u_m = original;
        }

        self.step_count += 1;
        if self.config.thermo.enable_updates
            && self.config.thermo.update_interval_steps > 0
            && self.step_count % self.config.thermo.update_interval_steps as u64 == 0
        {
            self.refresh_thermo();
        }
        if self.config.history_interval_steps > 0
            && self.step_count % self.config.history_interval_steps as u64 == 0
        {
            self.record_history();
        }
    }

    /// Advance the simulation by `dt_external` seconds, sub-stepping at
    /// the CFL-stable `dt` and shrinking on instability, mirroring the
    /// teacher's `step_internal` bounded-retry loop (spec.md §4.9).
    /// Publishes the final outlet state to `outlet` before returning.
    pub fn run_transient(
        &mut self,
        dt_external: f64,
        inlet: &dyn InletStream,
        outlet: &mut dyn OutletStream,
    ) -> SimResult<()> {
        if matches!(self.state, DriverState::Idle) {
            return Err(SimError::InvalidConfiguration(
                "driver must be initialised before run_transient".into(),
            ));
        }
        self.state = DriverState::Running;

        let mut time_stepped = 0.0;
        let mut attempts = 0u32;

        while time_stepped < dt_external && attempts < MAX_SUBSTEP_ATTEMPTS {
            let remaining = dt_external - time_stepped;
            let cfl = self.config.time.cfl_clamped();
            let candidate_dt =
                integrator::stable_dt(&self.cells, cfl, self.config.time.dt_min_s, self.config.time.dt_max_s)
                    .min(remaining);

            let actual_dt = self.advance_internal_step(candidate_dt, inlet);
            time_stepped += actual_dt;

            if self.consecutive_instability_steps >= MAX_CONSECUTIVE_INSTABILITY {
                self.state = DriverState::Finished;
                let err = SimError::NumericalInstability {
                    consecutive_steps: self.consecutive_instability_steps,
                    detail: "instability persisted at dt_min for too many consecutive steps".into(),
                };
                self.last_error = Some(err.clone());
                return Err(err);
            }

            if actual_dt + 1e-12 < candidate_dt {
                attempts += 1;
            } else {
                attempts = 0;
            }
        }

        self.state = DriverState::Paused;

        if let Some(last) = self.cells.last() {
            outlet.set_pressure_pa(last.pressure_pa);
            outlet.set_temperature_k(last.temperature_k);
            outlet.set_mass_flow_kg_s(outlet_mass_flow_kg_s(last));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::stream::{FixedInletStream, PhaseSplit, RecordingOutletStream};
    use crate::thermo::MockThermoAdapter;

    fn sample_inlet() -> FixedInletStream {
        FixedInletStream {
            mass_flow_kg_s: 2.0,
            pressure_bar: 50.0,
            temperature_k: 300.0,
            phase_split: PhaseSplit {
                beta_gas: 0.4,
                beta_liquid: 0.6,
            },
            enthalpy_gas_j_kg: 3.0e5,
            enthalpy_liquid_j_kg: 1.0e5,
        }
    }

    #[test]
    fn initialize_pipe_builds_n_cells_with_seeded_properties() {
        let mut config = SimulationConfig::default();
        config.pipe.n_cells = 10;
        let inlet = sample_inlet();
        let driver = TransientDriver::initialize_pipe(config, MockThermoAdapter::default(), &inlet).unwrap();
        assert_eq!(driver.cells().len(), 10);
        assert_eq!(driver.state(), DriverState::Initialised);
        assert!(driver.cells().iter().all(|c| c.rho_g > 0.0));
    }

    #[test]
    fn run_transient_advances_time_without_panicking() {
        let mut config = SimulationConfig::default();
        config.pipe.n_cells = 8;
        config.pipe.length_m = 200.0;
        config.time.max_sim_time_s = 5.0;
        let inlet = sample_inlet();
        let mut driver =
            TransientDriver::initialize_pipe(config, MockThermoAdapter::default(), &inlet).unwrap();

        let mut outlet = RecordingOutletStream::default();
        let result = driver.run_transient(1.0, &inlet, &mut outlet);
        assert!(result.is_ok());
        assert_eq!(driver.state(), DriverState::Paused);
        assert!(outlet.pressure_pa > 0.0);
    }

    #[test]
    fn run_transient_rejects_uninitialised_driver() {
        let config = SimulationConfig::default();
        let inlet = sample_inlet();
        let mut driver = TransientDriver {
            config,
            state: DriverState::Idle,
            cells: Vec::new(),
            accumulation_zones: Vec::new(),
            slug_tracker: SlugTracker::new(),
            rng: SimRng::from_seed(1),
            thermo: MockThermoAdapter::default(),
            t_s: 0.0,
            step_count: 0,
            consecutive_instability_steps: 0,
            warnings: WarningCounters::default(),
            last_error: None,
            history: Vec::new(),
        };
        let mut outlet = RecordingOutletStream::default();
        assert!(driver.run_transient(1.0, &inlet, &mut outlet).is_err());
    }
}
