//! Narrow inlet/outlet stream collaborator interfaces (spec.md §1, §6).
//!
//! Deliberately out of scope to implement (process-framework wiring); this
//! module only defines the boundary the driver consumes/produces through,
//! the same shape as `thermo::ThermoAdapter`.

/// Phase split requested from the upstream process model, on demand
/// (spec.md §6: "per-phase β on demand").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSplit {
    pub beta_gas: f64,
    pub beta_liquid: f64,
}

/// Inlet stream collaborator (spec.md §6: consumed).
pub trait InletStream {
    fn mass_flow_kg_s(&self) -> f64;
    fn pressure_bar(&self) -> f64;
    fn temperature_k(&self) -> f64;
    fn phase_split(&self) -> PhaseSplit;
    fn enthalpy_gas_j_kg(&self) -> f64;
    fn enthalpy_liquid_j_kg(&self) -> f64;
}

/// Outlet stream collaborator (spec.md §6: produced).
pub trait OutletStream {
    fn set_pressure_pa(&mut self, pressure_pa: f64);
    fn set_temperature_k(&mut self, temperature_k: f64);
    fn set_mass_flow_kg_s(&mut self, mass_flow_kg_s: f64);
}

/// Fixed-value inlet used for tests and scenarios that don't wire a real
/// process-framework stream object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedInletStream {
    pub mass_flow_kg_s: f64,
    pub pressure_bar: f64,
    pub temperature_k: f64,
    pub phase_split: PhaseSplit,
    pub enthalpy_gas_j_kg: f64,
    pub enthalpy_liquid_j_kg: f64,
}

impl InletStream for FixedInletStream {
    fn mass_flow_kg_s(&self) -> f64 {
        self.mass_flow_kg_s
    }

    fn pressure_bar(&self) -> f64 {
        self.pressure_bar
    }

    fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    fn phase_split(&self) -> PhaseSplit {
        self.phase_split
    }

    fn enthalpy_gas_j_kg(&self) -> f64 {
        self.enthalpy_gas_j_kg
    }

    fn enthalpy_liquid_j_kg(&self) -> f64 {
        self.enthalpy_liquid_j_kg
    }
}

/// Recorder outlet used by tests and scenarios (spec.md §6: "Outlet
/// receives P_pa/1e5, T_k, ṁ_kg_per_s").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordingOutletStream {
    pub pressure_pa: f64,
    pub temperature_k: f64,
    pub mass_flow_kg_s: f64,
}

impl OutletStream for RecordingOutletStream {
    fn set_pressure_pa(&mut self, pressure_pa: f64) {
        self.pressure_pa = pressure_pa;
    }

    fn set_temperature_k(&mut self, temperature_k: f64) {
        self.temperature_k = temperature_k;
    }

    fn set_mass_flow_kg_s(&mut self, mass_flow_kg_s: f64) {
        self.mass_flow_kg_s = mass_flow_kg_s;
    }
}
