//! Fatal and recoverable error kinds.
//!
//! Mirrors the teacher's "validate eagerly, return a descriptive error"
//! shape (`Well::validate`), but with matchable variants instead of a bare
//! `String` so the driver can distinguish fatal conditions from ones it
//! recovers from locally (spec.md §7).

use thiserror::Error;

/// Failures that halt the simulation. The caller receives this and the last
/// consistent snapshot remains queryable on the driver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("geometry out of range: {0}")]
    GeometryOutOfRange(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("numerical instability persisted for {consecutive_steps} consecutive steps: {detail}")]
    NumericalInstability {
        consecutive_steps: u32,
        detail: String,
    },
}

/// Thermo collaborator failure kind (spec.md §6).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThermoFailureKind {
    #[error("pressure or temperature out of range for flash")]
    OutOfRange,
    #[error("flash failed to converge")]
    ConvergenceFailed,
}

/// Non-fatal conditions recovered locally and surfaced as warning counters
/// (spec.md §7). The driver collects these; they never propagate to the
/// caller as an `Err`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimWarning {
    #[error("thermo failure at cell {cell_index}: {kind}")]
    ThermoFailure {
        cell_index: usize,
        kind: ThermoFailureKind,
    },

    #[error("slug {slug_id} invariant violated: {detail}")]
    SlugInvariantViolated { slug_id: u64, detail: String },

    #[error("boundary unsatisfiable: requested {requested_pa} Pa, clamped to {clamped_pa} Pa")]
    BoundaryUnsatisfiable { requested_pa: f64, clamped_pa: f64 },

    #[error("numerical instability recovered at dt_min (step reverted {reverted_cells} cells)")]
    NumericalInstabilityRecovered { reverted_cells: usize },
}

/// Running tally of warnings by kind, plus the most recent one. The teacher
/// keeps a single `last_solver_warning: String` that later warnings
/// overwrite; spec.md §7 asks for counters, so we keep counts per kind and
/// the last occurrence.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WarningCounters {
    pub thermo_failures: u64,
    pub slug_invariant_violations: u64,
    pub boundary_unsatisfiable: u64,
    pub numerical_instability_recovered: u64,
    last: Option<SimWarning>,
}

impl WarningCounters {
    pub fn record(&mut self, warning: SimWarning) {
        match &warning {
            SimWarning::ThermoFailure { .. } => self.thermo_failures += 1,
            SimWarning::SlugInvariantViolated { .. } => self.slug_invariant_violations += 1,
            SimWarning::BoundaryUnsatisfiable { .. } => self.boundary_unsatisfiable += 1,
            SimWarning::NumericalInstabilityRecovered { .. } => {
                self.numerical_instability_recovered += 1
            }
        }
        tracing::warn!(%warning, "recovered simulation warning");
        self.last = Some(warning);
    }

    pub fn last(&self) -> Option<&SimWarning> {
        self.last.as_ref()
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_tally_by_kind_and_keep_last() {
        let mut counters = WarningCounters::default();
        counters.record(SimWarning::ThermoFailure {
            cell_index: 3,
            kind: ThermoFailureKind::OutOfRange,
        });
        counters.record(SimWarning::ThermoFailure {
            cell_index: 4,
            kind: ThermoFailureKind::ConvergenceFailed,
        });
        counters.record(SimWarning::SlugInvariantViolated {
            slug_id: 1,
            detail: "L_s < L_min".into(),
        });
        assert_eq!(counters.thermo_failures, 2);
        assert_eq!(counters.slug_invariant_violations, 1);
        assert!(matches!(
            counters.last(),
            Some(SimWarning::SlugInvariantViolated { .. })
        ));
    }
}
