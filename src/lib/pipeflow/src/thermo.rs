//! Thermodynamic property lookups behind a narrow trait boundary
//! (spec.md §4.10).
//!
//! Grounded on `kyleas-thermoflow`'s `FluidModel` collaborator pattern in
//! `line_volume.rs`: a small trait the solver depends on, implemented by a
//! concrete adapter, so the flash/property backend can be swapped without
//! touching the solver loop.

use crate::error::ThermoFailureKind;

/// Phase properties returned by a flash (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseProperties {
    pub rho_g: f64,
    pub rho_l: f64,
    pub mu_g: f64,
    pub mu_l: f64,
    pub h_g: f64,
    pub h_l: f64,
    pub cp_mixture: f64,
    pub sigma: f64,
    pub c_g: f64,
    pub c_l: f64,
    pub mu_jt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoError {
    pub kind: ThermoFailureKind,
}

pub type ThermoResult<T> = Result<T, ThermoError>;

/// Collaborator boundary the solver depends on instead of a concrete
/// equation-of-state implementation (spec.md §4.10).
pub trait ThermoAdapter {
    /// Flash at (pressure, temperature), returning equilibrium phase
    /// properties for the given overall composition.
    fn flash_pt(&self, pressure_pa: f64, temperature_k: f64) -> ThermoResult<PhaseProperties>;

    /// Flash at (pressure, enthalpy) — used when the energy equation
    /// advances enthalpy directly rather than temperature.
    fn flash_ph(&self, pressure_pa: f64, enthalpy_j_kg: f64) -> ThermoResult<PhaseProperties>;
}

/// Deterministic analytic stand-in adapter (spec.md §4.10, Non-goals:
/// "does not implement a real equation-of-state / flash library").
/// Gas density follows ideal-gas scaling with pressure/temperature; liquid
/// properties are pressure/temperature-insensitive constants with a small
/// thermal-expansion correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockThermoAdapter {
    pub molar_mass_g_kg_mol: f64,
    pub rho_l_ref: f64,
    pub mu_g_ref: f64,
    pub mu_l_ref: f64,
    pub sigma_ref: f64,
    pub cp_mixture: f64,
    pub mu_jt: f64,
}

impl Default for MockThermoAdapter {
    fn default() -> Self {
        MockThermoAdapter {
            molar_mass_g_kg_mol: 0.018,
            rho_l_ref: 1000.0,
            mu_g_ref: 1.2e-5,
            mu_l_ref: 1.0e-3,
            sigma_ref: 0.072,
            cp_mixture: 4186.0,
            mu_jt: 2.0e-6,
        }
    }
}

const GAS_CONSTANT: f64 = 8.314462618;

impl ThermoAdapter for MockThermoAdapter {
    fn flash_pt(&self, pressure_pa: f64, temperature_k: f64) -> ThermoResult<PhaseProperties> {
        if !pressure_pa.is_finite() || !temperature_k.is_finite() || pressure_pa <= 0.0 {
            return Err(ThermoError {
                kind: ThermoFailureKind::OutOfRange,
            });
        }
        if temperature_k < 100.0 || temperature_k > 500.0 {
            return Err(ThermoError {
                kind: ThermoFailureKind::OutOfRange,
            });
        }

        let rho_g = pressure_pa * self.molar_mass_g_kg_mol / (GAS_CONSTANT * temperature_k);
        let rho_l = self.rho_l_ref * (1.0 - 2.0e-4 * (temperature_k - 288.15));

        Ok(PhaseProperties {
            rho_g: rho_g.max(1e-3),
            rho_l: rho_l.max(1.0),
            mu_g: self.mu_g_ref,
            mu_l: self.mu_l_ref,
            h_g: 1000.0 * temperature_k,
            h_l: 4186.0 * (temperature_k - 273.15),
            cp_mixture: self.cp_mixture,
            sigma: self.sigma_ref,
            c_g: (1.4 * GAS_CONSTANT * temperature_k / self.molar_mass_g_kg_mol)
                .max(0.0)
                .sqrt(),
            c_l: 1480.0,
            mu_jt: self.mu_jt,
        })
    }

    fn flash_ph(&self, pressure_pa: f64, enthalpy_j_kg: f64) -> ThermoResult<PhaseProperties> {
        if !enthalpy_j_kg.is_finite() {
            return Err(ThermoError {
                kind: ThermoFailureKind::OutOfRange,
            });
        }
        // Invert the linear h_g(T) relation used by flash_pt to recover an
        // approximate temperature, then reuse flash_pt. A real adapter
        // would iterate; this closed-form inversion is exact for the mock
        // property model.
        let temperature_k = enthalpy_j_kg / 1000.0;
        self.flash_pt(pressure_pa, temperature_k)
            .map_err(|_| ThermoError {
                kind: ThermoFailureKind::ConvergenceFailed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_pt_rejects_out_of_range_temperature() {
        let adapter = MockThermoAdapter::default();
        let result = adapter.flash_pt(1.0e6, 900.0);
        assert_eq!(result.unwrap_err().kind, ThermoFailureKind::OutOfRange);
    }

    #[test]
    fn flash_pt_gas_density_scales_with_pressure() {
        let adapter = MockThermoAdapter::default();
        let low = adapter.flash_pt(1.0e5, 300.0).unwrap();
        let high = adapter.flash_pt(1.0e6, 300.0).unwrap();
        assert!(high.rho_g > low.rho_g);
    }

    #[test]
    fn flash_ph_round_trips_through_flash_pt() {
        let adapter = MockThermoAdapter::default();
        let direct = adapter.flash_pt(5.0e5, 320.0).unwrap();
        let via_enthalpy = adapter.flash_ph(5.0e5, direct.h_g).unwrap();
        assert!((via_enthalpy.rho_g - direct.rho_g).abs() < 1e-9);
    }
}
