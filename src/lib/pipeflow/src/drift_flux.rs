//! Drift-flux closure: regime-dependent C₀/v_d, holdup/phase-velocity
//! solve, pressure gradient, energy equation (spec.md §4.3).
//!
//! Small single-purpose closure functions on plain data, the same shape
//! as the teacher's `total_mobility`/`frac_flow_water`/
//! `transmissibility_upstream` methods: each takes the minimal inputs it
//! needs, returns a clamped `f64` (or small struct), never panics.

use crate::cell::Cell;
use crate::friction::{friction_gradient, FrictionContext};
use crate::regime::{solve_stratified_level, FlowRegime, RegimeInputs};

const GRAVITY: f64 = 9.80665;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftFluxError {
    /// spec.md §4.3: "Fails with DegenerateMixture when U_M<1e−10 and
    /// U_SG>0 (assigns α_G=1)."
    DegenerateMixture,
}

/// Distribution coefficient and drift velocity for a regime (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct DistributionParams {
    pub c0: f64,
    pub v_d: f64,
}

fn harmathy_drift(rho_l: f64, rho_g: f64, sigma: f64, theta_rad: f64) -> f64 {
    let delta_rho = (rho_l - rho_g).max(0.0);
    let v_bubble = 1.53 * (GRAVITY * sigma * delta_rho / (rho_l * rho_l)).max(0.0).powf(0.25);
    if theta_rad.abs() < 0.01 {
        0.1 * v_bubble
    } else {
        v_bubble * theta_rad.sin().abs()
    }
}

fn bendiksen_params(u_m: f64, d: f64, rho_l: f64, rho_g: f64, theta_rad: f64) -> DistributionParams {
    let fr_m = u_m / (GRAVITY * d).max(1e-9).sqrt();
    let c0 = if fr_m > 3.5 { 1.2 } else { 1.05 + 0.15 * theta_rad.sin() };

    let delta_rho = (rho_l - rho_g).max(0.0);
    let horizontal = 0.54 * (GRAVITY * d * delta_rho / rho_l.max(1e-9)).max(0.0).sqrt();
    let vertical = 0.35 * (GRAVITY * d * delta_rho / rho_l.max(1e-9)).max(0.0).sqrt();

    let abs_theta = theta_rad.abs();
    let lo = std::f64::consts::PI / 6.0;
    let hi = std::f64::consts::PI / 3.0;
    let v_d = if abs_theta <= lo {
        horizontal
    } else if abs_theta >= hi {
        vertical
    } else {
        let t = (abs_theta - lo) / (hi - lo);
        horizontal + t * (vertical - horizontal)
    };

    DistributionParams { c0, v_d }
}

/// Regime-dependent C₀/v_d (spec.md §4.3). The stratified branch also
/// returns the effective holdup it derives on the way, since stratified
/// C₀ is back-computed from the momentum-balance solve rather than from a
/// closed-form correlation.
pub fn distribution_params(cell: &Cell, mu_g: f64, roughness: f64) -> DistributionParams {
    let rho_l = cell.rho_l;
    let rho_g = cell.rho_g;
    let theta = cell.inclination_rad;
    let u_m = cell.u_m;

    match cell.regime {
        FlowRegime::Bubble | FlowRegime::DispersedBubble => DistributionParams {
            c0: 1.2,
            v_d: harmathy_drift(rho_l, rho_g, cell.sigma, theta),
        },
        FlowRegime::Slug => bendiksen_params(u_m, cell.diameter_m, rho_l, rho_g, theta),
        FlowRegime::Annular | FlowRegime::Churn | FlowRegime::Mist => {
            let delta_rho = (rho_l - rho_g).max(0.0);
            DistributionParams {
                c0: 1.0,
                v_d: 0.2 * (GRAVITY * cell.diameter_m * delta_rho / rho_l.max(1e-9))
                    .max(0.0)
                    .sqrt()
                    * theta.sin(),
            }
        }
        FlowRegime::StratifiedSmooth | FlowRegime::StratifiedWavy => {
            let inputs = RegimeInputs {
                u_sl: cell.u_sl,
                u_sg: cell.u_sg,
                d: cell.diameter_m,
                theta_rad: theta,
                rho_l,
                rho_g,
                mu_l: cell.mu_l,
                sigma: cell.sigma,
            };
            let solve = solve_stratified_level(&inputs, mu_g, roughness);
            let c0 = if u_m.abs() > 1e-9 {
                solve.u_g / u_m
            } else {
                1.0
            };
            DistributionParams { c0, v_d: 0.0 }
        }
        FlowRegime::SinglePhaseGas | FlowRegime::SinglePhaseLiquid => {
            DistributionParams { c0: 1.0, v_d: 0.0 }
        }
    }
}

/// Result of the holdup/phase-velocity solve (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct HoldupSolution {
    pub alpha_g: f64,
    pub alpha_l: f64,
    pub u_g: f64,
    pub u_l: f64,
    pub slip: f64,
}

/// Solve holdup and phase velocities from superficial velocities given a
/// distribution closure (spec.md §4.3).
pub fn solve_holdup(
    u_sg: f64,
    u_sl: f64,
    params: &DistributionParams,
) -> Result<HoldupSolution, DriftFluxError> {
    let u_m = u_sg + u_sl;
    if u_m.abs() < 1e-10 {
        if u_sg > 0.0 {
            return Err(DriftFluxError::DegenerateMixture);
        }
        return Ok(HoldupSolution {
            alpha_g: 0.5,
            alpha_l: 0.5,
            u_g: 0.0,
            u_l: 0.0,
            slip: 1.0,
        });
    }

    let denom = params.c0 * u_m + params.v_d;
    let alpha_g = if denom.abs() > 1e-12 {
        (u_sg / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let alpha_l = 1.0 - alpha_g;

    let u_g = if alpha_g > 1e-9 { u_sg / alpha_g } else { 0.0 };
    let u_l = if alpha_l > 1e-9 { u_sl / alpha_l } else { 0.0 };
    let slip = if u_l.abs() > 1e-9 { u_g / u_l } else { 1.0 };

    Ok(HoldupSolution {
        alpha_g,
        alpha_l,
        u_g,
        u_l,
        slip,
    })
}

/// Diagnostic slip used by `regime::detect_regime_minimum_slip`: assume the
/// candidate regime, get its distribution params from simple correlations
/// (not the cell's actual current regime), and report the resulting slip.
pub fn diagnostic_slip(candidate: FlowRegime, inputs: &RegimeInputs) -> f64 {
    let theta = inputs.theta_rad;
    let u_m = inputs.u_sl + inputs.u_sg;
    let params = match candidate {
        FlowRegime::Bubble | FlowRegime::DispersedBubble => DistributionParams {
            c0: 1.2,
            v_d: harmathy_drift(inputs.rho_l, inputs.rho_g, inputs.sigma, theta),
        },
        FlowRegime::Slug => bendiksen_params(u_m, inputs.d, inputs.rho_l, inputs.rho_g, theta),
        FlowRegime::Annular | FlowRegime::Churn | FlowRegime::Mist => {
            let delta_rho = (inputs.rho_l - inputs.rho_g).max(0.0);
            DistributionParams {
                c0: 1.0,
                v_d: 0.2
                    * (GRAVITY * inputs.d * delta_rho / inputs.rho_l.max(1e-9))
                        .max(0.0)
                        .sqrt()
                    * theta.sin(),
            }
        }
        FlowRegime::StratifiedSmooth
        | FlowRegime::StratifiedWavy
        | FlowRegime::SinglePhaseGas
        | FlowRegime::SinglePhaseLiquid => DistributionParams { c0: 1.0, v_d: 0.0 },
    };
    match solve_holdup(inputs.u_sg, inputs.u_sl, &params) {
        Ok(solution) => solution.slip,
        Err(_) => 1.0,
    }
}

/// Total pressure gradient dP/dx [Pa/m] (spec.md §4.3): gravity + friction,
/// stored separately on the cell. The acceleration term is treated as
/// negligible per spec.md.
pub fn pressure_gradient(cell: &mut Cell, mu_g: f64, roughness: f64) -> f64 {
    let gravity_gradient = -cell.rho_m * GRAVITY * cell.inclination_rad.sin();

    let params = distribution_params(cell, mu_g, roughness);
    let solution = solve_holdup(cell.u_sg, cell.u_sl, &params);
    let (mixture_density, mixture_viscosity) = match solution {
        Ok(sol) => (
            sol.alpha_g * cell.rho_g + sol.alpha_l * cell.rho_l,
            cell.alpha_g * cell.mu_g + cell.alpha_l * cell.mu_l,
        ),
        Err(_) => (cell.rho_g, cell.mu_g),
    };

    let ctx = FrictionContext {
        u_m: cell.u_m,
        mixture_density,
        mixture_viscosity,
    };
    let friction = friction_gradient(cell, &ctx);

    cell.gravity_gradient_pa_m = gravity_gradient;
    cell.friction_gradient_pa_m = friction;

    gravity_gradient + friction
}

/// Wall heat transfer contribution to ΔT (spec.md §4.3 (i)):
/// Q̇ = U·πD·Δx·(T_amb − T), ΔT = Q̇ / (ṁ·Cp) handled by the caller; here we
/// return the raw heat rate [W] for a cell of the given length.
pub fn wall_heat_term(u_overall: f64, diameter_m: f64, length_m: f64, t_ambient_k: f64, t_k: f64) -> f64 {
    u_overall * std::f64::consts::PI * diameter_m * length_m * (t_ambient_k - t_k)
}

/// Joule–Thomson cooling contribution to ΔT (spec.md §4.3 (ii)):
/// −μ_JT·α_G·(−dP/dx·Δx), scaled by gas fraction.
pub fn joule_thomson_term(mu_jt: f64, alpha_g: f64, dp_dx_pa_m: f64, length_m: f64) -> f64 {
    -mu_jt * alpha_g * (-dp_dx_pa_m * length_m)
}

/// Friction heating contribution to ΔT (spec.md §4.3 (iii)):
/// |dP_f/dx|·Q_vol, where Q_vol [m³/s] is the local volumetric flow.
pub fn friction_heating_term(friction_gradient_pa_m: f64, q_vol_m3_s: f64) -> f64 {
    friction_gradient_pa_m.abs() * q_vol_m3_s
}

/// Elevation work contribution to ΔT (spec.md §4.3 (iv)): −g·sinθ·Δx/C_p.
pub fn elevation_term(theta_rad: f64, length_m: f64, cp: f64) -> f64 {
    -GRAVITY * theta_rad.sin() * length_m / cp.max(1.0)
}

/// Combine the four energy-equation contributions into a clamped ΔT
/// [K] (spec.md §4.3: total clamped to ±10 K per step, T clamped to
/// [100,500] K — the temperature clamp itself lives in
/// `Cell::enforce_invariants`).
pub fn energy_delta_t(
    cell: &Cell,
    u_overall: f64,
    t_ambient_k: f64,
    mu_jt: f64,
    mass_flow_kg_s: f64,
) -> f64 {
    let q_dot = wall_heat_term(
        u_overall,
        cell.diameter_m,
        cell.length_m,
        t_ambient_k,
        cell.temperature_k,
    );
    let heat_capacity_flow = (mass_flow_kg_s.abs() * cell.cp_mixture).max(1e-6);
    let wall_term = q_dot / heat_capacity_flow;

    let jt_term = joule_thomson_term(
        mu_jt,
        cell.alpha_g,
        cell.friction_gradient_pa_m,
        cell.length_m,
    ) / cell.cp_mixture.max(1e-6);

    let q_vol = (cell.u_m.abs() * cell.area_m2).max(0.0);
    let friction_term =
        friction_heating_term(cell.friction_gradient_pa_m, q_vol) / heat_capacity_flow;

    let elevation = elevation_term(cell.inclination_rad, cell.length_m, cell.cp_mixture);

    (wall_term + jt_term + friction_term + elevation).clamp(-10.0, 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    #[test]
    fn degenerate_mixture_errors_when_gas_present() {
        let params = DistributionParams { c0: 1.2, v_d: 0.0 };
        let result = solve_holdup(1.0, 0.0, &params);
        assert_eq!(result.unwrap_err(), DriftFluxError::DegenerateMixture);
    }

    #[test]
    fn zero_flow_no_gas_is_not_degenerate() {
        let params = DistributionParams { c0: 1.2, v_d: 0.0 };
        let result = solve_holdup(0.0, 0.0, &params);
        assert!(result.is_ok());
    }

    #[test]
    fn bubble_c0_is_point_two() {
        let mut cell = Cell::new(0.0, 10.0, 0.2, 0.0, 0.0, 1e-4);
        cell.regime = FlowRegime::Bubble;
        let params = distribution_params(&cell, 1.2e-5, 1e-4);
        assert!((params.c0 - 1.2).abs() < 1e-12);
    }

    #[test]
    fn slug_high_froude_uses_point_two_c0() {
        let mut cell = Cell::new(0.0, 10.0, 0.2, 0.0, 0.0, 1e-4);
        cell.regime = FlowRegime::Slug;
        cell.u_m = 20.0;
        let params = distribution_params(&cell, 1.2e-5, 1e-4);
        assert!((params.c0 - 1.2).abs() < 1e-9);
    }

    #[test]
    fn holdup_solve_respects_bounds() {
        let params = DistributionParams { c0: 1.2, v_d: 0.3 };
        let solution = solve_holdup(2.0, 0.5, &params).unwrap();
        assert!((0.0..=1.0).contains(&solution.alpha_g));
        assert!((0.0..=1.0).contains(&solution.alpha_l));
    }

    #[test]
    fn wall_heat_cools_when_ambient_below_cell() {
        let q = wall_heat_term(10.0, 0.1, 10.0, 280.0, 340.0);
        assert!(q < 0.0);
    }
}
