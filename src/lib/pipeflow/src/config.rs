//! Simulation configuration (spec.md §6).
//!
//! Follows the teacher's "struct of physical parameters with a
//! `default_*()` constructor" idiom (`GridCell::default_cell`,
//! `RockFluidProps::default_scal`, `CapillaryPressure::default_pc`) but
//! gathered under `Default` impls per sub-section instead of private
//! free functions, since these are now user-facing configuration knobs.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntegrationScheme {
    Euler,
    Rk2,
    Rk4,
    SspRk3,
}

impl Default for IntegrationScheme {
    fn default() -> Self {
        IntegrationScheme::Rk4
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoundaryKind {
    ConstantFlow,
    ConstantPressure,
    Closed,
    TransientFlow,
    TransientPressure,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegimeDetectionMode {
    Mechanistic,
    MinimumSlip,
}

impl Default for RegimeDetectionMode {
    fn default() -> Self {
        RegimeDetectionMode::Mechanistic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipeConfig {
    /// Pipe length [m]
    pub length_m: f64,
    /// Pipe internal diameter [m]
    pub diameter_m: f64,
    /// Wall roughness [m]
    pub roughness_m: f64,
    /// Number of finite-volume cells
    pub n_cells: usize,
    /// Elevation profile [m], one entry per cell; mutually exclusive with
    /// `inclination_profile_rad` (spec.md §6). `None` means flat/horizontal
    /// unless `inclination_profile_rad` is given.
    pub elevation_profile_m: Option<Vec<f64>>,
    /// Inclination profile [rad], one entry per cell.
    pub inclination_profile_rad: Option<Vec<f64>>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            length_m: 1000.0,
            diameter_m: 0.2,
            roughness_m: 1e-4,
            n_cells: 50,
            elevation_profile_m: None,
            inclination_profile_rad: None,
        }
    }
}

impl PipeConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.n_cells < 2 {
            return Err(SimError::GeometryOutOfRange(format!(
                "n_cells must be >= 2, got {}",
                self.n_cells
            )));
        }
        if self.diameter_m <= 0.0 || !self.diameter_m.is_finite() {
            return Err(SimError::GeometryOutOfRange(format!(
                "diameter must be positive and finite, got {}",
                self.diameter_m
            )));
        }
        if self.length_m <= 0.0 || !self.length_m.is_finite() {
            return Err(SimError::GeometryOutOfRange(format!(
                "length must be positive and finite, got {}",
                self.length_m
            )));
        }
        if let Some(profile) = &self.elevation_profile_m {
            if profile.len() != self.n_cells {
                return Err(SimError::GeometryOutOfRange(format!(
                    "elevation_profile_m has {} entries, expected n_cells={}",
                    profile.len(),
                    self.n_cells
                )));
            }
        }
        if let Some(profile) = &self.inclination_profile_rad {
            if profile.len() != self.n_cells {
                return Err(SimError::GeometryOutOfRange(format!(
                    "inclination_profile_rad has {} entries, expected n_cells={}",
                    profile.len(),
                    self.n_cells
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeConfig {
    /// Max simulated time [s]
    pub max_sim_time_s: f64,
    /// CFL number, clamped to [0.1, 1.0]
    pub cfl: f64,
    pub dt_min_s: f64,
    pub dt_max_s: f64,
    pub scheme: IntegrationScheme,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            max_sim_time_s: 60.0,
            cfl: 0.5,
            dt_min_s: 1e-4,
            dt_max_s: 10.0,
            scheme: IntegrationScheme::Rk4,
        }
    }
}

impl TimeConfig {
    pub fn cfl_clamped(&self) -> f64 {
        self.cfl.clamp(0.1, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundaryConfig {
    pub inlet: BoundaryKind,
    pub outlet: BoundaryKind,
    pub inlet_pressure_pa: f64,
    pub outlet_pressure_pa: f64,
    pub inlet_mass_flow_kg_s: f64,
    pub outlet_mass_flow_kg_s: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            inlet: BoundaryKind::ConstantFlow,
            outlet: BoundaryKind::ConstantPressure,
            inlet_pressure_pa: 50e5,
            outlet_pressure_pa: 40e5,
            inlet_mass_flow_kg_s: 2.0,
            outlet_mass_flow_kg_s: 2.0,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> SimResult<()> {
        let both_closed = matches!(self.inlet, BoundaryKind::Closed)
            && matches!(self.outlet, BoundaryKind::Closed);
        let nonzero_flow = self.inlet_mass_flow_kg_s.abs() > 1e-9
            || self.outlet_mass_flow_kg_s.abs() > 1e-9;
        if both_closed && nonzero_flow {
            return Err(SimError::InvalidConfiguration(
                "both ends closed with non-zero requested flow".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HeatConfig {
    pub enabled: bool,
    /// Overall heat transfer coefficient [W/m²K]
    pub u_overall: f64,
    /// Ambient temperature [K]
    pub t_ambient_k: f64,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            u_overall: 10.0,
            t_ambient_k: 288.15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThermoConfig {
    pub update_interval_steps: u32,
    pub enable_updates: bool,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            update_interval_steps: 10,
            enable_updates: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegimeConfig {
    pub detection: RegimeDetectionMode,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            detection: RegimeDetectionMode::Mechanistic,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlugConfig {
    pub enable_inlet: bool,
    pub enable_terrain: bool,
    pub enable_wake: bool,
    pub enable_stochastic: bool,
    pub l_min_diameters: f64,
    pub l_max_diameters: f64,
    pub initial_diameters: f64,
    pub wake_diameters: f64,
    pub max_wake_acc: f64,
    pub merge_distance_m: f64,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            enable_inlet: true,
            enable_terrain: true,
            enable_wake: true,
            enable_stochastic: false,
            l_min_diameters: 12.0,
            l_max_diameters: 300.0,
            initial_diameters: 20.0,
            wake_diameters: 30.0,
            max_wake_acc: 1.3,
            merge_distance_m: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub pipe: PipeConfig,
    pub time: TimeConfig,
    pub boundary: BoundaryConfig,
    pub heat: HeatConfig,
    pub thermo: ThermoConfig,
    pub regime: RegimeConfig,
    pub slug: SlugConfig,
    /// Seed for the injected RNG (Zabaras randomization, stochastic
    /// instability, spec.md §9).
    pub rng_seed: u64,
    /// History snapshot interval [steps]
    pub history_interval_steps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pipe: PipeConfig::default(),
            time: TimeConfig::default(),
            boundary: BoundaryConfig::default(),
            heat: HeatConfig::default(),
            thermo: ThermoConfig::default(),
            regime: RegimeConfig::default(),
            slug: SlugConfig::default(),
            rng_seed: 0xC0FF_EE42,
            history_interval_steps: 10,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.pipe.validate()?;
        self.boundary.validate()?;
        if self.pipe.elevation_profile_m.is_some() && self.pipe.inclination_profile_rad.is_some()
        {
            return Err(SimError::InvalidConfiguration(
                "specify either elevation_profile_m or inclination_profile_rad, not both".into(),
            ));
        }
        Ok(())
    }
}
