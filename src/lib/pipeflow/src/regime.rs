//! Mechanistic flow-regime map (spec.md §4.4).
//!
//! The regime is a sealed tagged variant (spec.md §3, §9: "regime as
//! tagged variant, not inheritance") dispatched on with plain `match` at
//! every closure call site, mirroring how the teacher dispatches on a
//! `char` dimension tag (`'x' | 'y' | 'z'`) in `transmissibility`/
//! `geometric_transmissibility` rather than through a trait object.

use serde::{Deserialize, Serialize};

use crate::geometry::geometry_from_level;

const GRAVITY: f64 = 9.80665;
const TEN_DEGREES_RAD: f64 = 10.0 * std::f64::consts::PI / 180.0;

/// Sealed set of flow regimes (spec.md §2, §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FlowRegime {
    StratifiedSmooth,
    StratifiedWavy,
    Slug,
    Bubble,
    DispersedBubble,
    Churn,
    Annular,
    Mist,
    SinglePhaseGas,
    SinglePhaseLiquid,
}

/// Default surface tensions [N/m] when none is supplied by the thermo
/// collaborator (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTensionPair {
    GasOil,
    GasWater,
    OilWater,
}

pub fn default_surface_tension(pair: SurfaceTensionPair) -> f64 {
    match pair {
        SurfaceTensionPair::GasOil => 0.020,
        SurfaceTensionPair::GasWater => 0.072,
        SurfaceTensionPair::OilWater => 0.030,
    }
}

/// Inputs to the regime map, gathered in one struct so call sites aren't
/// eight-argument tuples (spec.md §4.4 lists these as the function's inputs).
#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    pub u_sl: f64,
    pub u_sg: f64,
    pub d: f64,
    pub theta_rad: f64,
    pub rho_l: f64,
    pub rho_g: f64,
    pub mu_l: f64,
    pub sigma: f64,
}

fn harmathy_bubble_rise(rho_l: f64, rho_g: f64, sigma: f64) -> f64 {
    let delta_rho = (rho_l - rho_g).max(0.0);
    1.53 * (GRAVITY * sigma * delta_rho / (rho_l * rho_l)).max(0.0).powf(0.25)
}

/// Result of the 20-iteration momentum-balance stratified-level solve,
/// shared between the regime map's Kelvin–Helmholtz test and
/// `drift_flux`'s stratified branch (spec.md §4.3, §4.4 both call for the
/// same 20-iteration momentum balance).
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSolve {
    pub h_l: f64,
    pub alpha_l: f64,
    pub alpha_g: f64,
    pub a_l: f64,
    pub a_g: f64,
    pub s_l: f64,
    pub s_g: f64,
    pub s_i: f64,
    pub u_l: f64,
    pub u_g: f64,
}

/// Darcy friction factor (spec.md §4.2), duplicated signature-only here to
/// avoid a dependency cycle; the canonical implementation lives in
/// `friction::darcy_friction_factor` and this module calls it.
fn darcy_factor(re: f64, roughness: f64, d: f64) -> f64 {
    crate::friction::darcy_friction_factor(re, roughness, d)
}

/// Momentum-balance iteration for the stratified liquid level (spec.md
/// §4.3/§4.4: "≤20 iters, step 0.05·D·(τ_ratio−1−gravity_term)").
pub fn solve_stratified_level(
    inputs: &RegimeInputs,
    mu_g: f64,
    roughness: f64,
) -> StratifiedSolve {
    let d = inputs.d;
    let mut h = 0.5 * d;

    let eval = |h: f64| -> (f64, StratifiedSolve) {
        let geom = geometry_from_level(h, d);
        let alpha_l = geom.alpha_l.clamp(1e-6, 1.0 - 1e-6);
        let alpha_g = 1.0 - alpha_l;
        let a_l = geom.a_l.max(1e-9);
        let a_g = geom.a_g.max(1e-9);
        let u_l = inputs.u_sl / alpha_l;
        let u_g = inputs.u_sg / alpha_g;

        let re_l = (inputs.rho_l * u_l.abs() * geom.d_hl / inputs.mu_l.max(1e-9)).max(1.0);
        let re_g = (inputs.rho_g * u_g.abs() * geom.d_hg / mu_g.max(1e-9)).max(1.0);
        let f_l = darcy_factor(re_l, roughness, geom.d_hl.max(1e-6));
        let f_g = darcy_factor(re_g, roughness, geom.d_hg.max(1e-6));
        let f_i = f_g; // stratified default, see DESIGN.md open question #2

        let tau_l = f_l / 8.0 * inputs.rho_l * u_l * u_l.abs();
        let tau_g = f_g / 8.0 * inputs.rho_g * u_g * u_g.abs();
        let rel = u_g - u_l;
        let tau_i = f_i / 8.0 * inputs.rho_g * rel * rel.abs();

        let gas_term = tau_g * geom.s_g / a_g + tau_i * geom.s_i / a_g;
        let liq_term = tau_l * geom.s_l / a_l + tau_i * geom.s_i / a_l;
        let tau_ratio = gas_term / (liq_term.abs() + 1e-9);
        let gravity_term = (inputs.rho_l - inputs.rho_g) * GRAVITY * inputs.theta_rad.sin()
            / (liq_term.abs() + 1.0);

        let residual = tau_ratio - 1.0 - gravity_term;
        (
            residual,
            StratifiedSolve {
                h_l: h,
                alpha_l,
                alpha_g,
                a_l,
                a_g,
                s_l: geom.s_l,
                s_g: geom.s_g,
                s_i: geom.s_i,
                u_l,
                u_g,
            },
        )
    };

    let mut last = eval(h).1;
    for _ in 0..20 {
        let (residual, solve) = eval(h);
        last = solve;
        if residual.abs() < 1e-6 {
            break;
        }
        let step = 0.05 * d * residual;
        h = (h + step).clamp(1e-10, d - 1e-10);
    }
    last
}

/// Kelvin–Helmholtz critical gas velocity (spec.md §4.4):
/// U_G_crit = √(Δρ·g·h_G·A_G / (ρ_G·S_i)).
fn kh_critical_velocity(solve: &StratifiedSolve, d: f64, rho_l: f64, rho_g: f64) -> f64 {
    let delta_rho = (rho_l - rho_g).max(0.0);
    let h_g = (d - solve.h_l).max(0.0);
    if solve.s_i < 1e-9 || rho_g <= 0.0 {
        return f64::INFINITY;
    }
    (delta_rho * GRAVITY * h_g * solve.a_g / (rho_g * solve.s_i))
        .max(0.0)
        .sqrt()
}

/// Jeffreys sheltering critical gas velocity for smooth/wavy transition
/// (spec.md §4.4): U_G_crit = √(4·μ_L·Δρ·g / (s·ρ_G²)), s=0.01.
fn sheltering_critical_velocity(mu_l: f64, rho_l: f64, rho_g: f64) -> f64 {
    const S: f64 = 0.01;
    let delta_rho = (rho_l - rho_g).max(0.0);
    if rho_g <= 0.0 {
        return f64::INFINITY;
    }
    (4.0 * mu_l * delta_rho * GRAVITY / (S * rho_g * rho_g))
        .max(0.0)
        .sqrt()
}

/// Taitel sweep-out velocity (spec.md §4.7): minimum gas superficial
/// velocity needed to sweep accumulated liquid out of a downhill low
/// point, reusing the same √(gDΔρ/ρ_L) functional family as the
/// annular-transition and Bendiksen drift-velocity correlations, scaled
/// by the local inclination.
pub fn taitel_sweep_velocity(d: f64, theta_rad: f64, rho_l: f64, rho_g: f64) -> f64 {
    if rho_g <= 0.0 {
        return f64::INFINITY;
    }
    let delta_rho = (rho_l - rho_g).max(0.0);
    let base = (GRAVITY * d * delta_rho / rho_l.max(1e-9)).max(0.0).sqrt();
    0.5 * base * theta_rad.sin().abs().max(0.05)
}

fn dispersed_bubble_test(inputs: &RegimeInputs) -> bool {
    let u_m = inputs.u_sl + inputs.u_sg;
    if u_m <= 0.0 || inputs.sigma <= 0.0 {
        return false;
    }
    let we = inputs.rho_l * u_m * u_m * inputs.d / inputs.sigma;
    let froude_like_limit = 0.725 + 4.15 * inputs.u_sg.max(0.0).sqrt();
    we > 20.0 && u_m > froude_like_limit && (inputs.u_sg / u_m) < 0.52
}

fn annular_test(inputs: &RegimeInputs) -> bool {
    if inputs.rho_g <= 0.0 || inputs.sigma <= 0.0 {
        return false;
    }
    let delta_rho = (inputs.rho_l - inputs.rho_g).max(0.0);
    let crit = 3.1 * (inputs.sigma * GRAVITY * delta_rho / (inputs.rho_g * inputs.rho_g))
        .max(0.0)
        .powf(0.25);
    inputs.u_sg > crit
}

/// Mechanistic Taitel–Dukler map for near-horizontal pipe (|θ| ≤ 10°),
/// spec.md §4.4 steps 1–4.
fn taitel_dukler(inputs: &RegimeInputs, mu_g: f64, roughness: f64) -> FlowRegime {
    if dispersed_bubble_test(inputs) {
        return FlowRegime::DispersedBubble;
    }
    if annular_test(inputs) {
        return FlowRegime::Annular;
    }

    let solve = solve_stratified_level(inputs, mu_g, roughness);
    let u_g_crit = kh_critical_velocity(&solve, inputs.d, inputs.rho_l, inputs.rho_g);
    if solve.u_g > u_g_crit {
        return FlowRegime::Slug;
    }

    let sheltering_crit = sheltering_critical_velocity(inputs.mu_l, inputs.rho_l, inputs.rho_g);
    if solve.u_g > sheltering_crit {
        FlowRegime::StratifiedWavy
    } else {
        FlowRegime::StratifiedSmooth
    }
}

/// Barnea map for inclined pipe (|θ| > 10°), spec.md §4.4.
fn barnea(inputs: &RegimeInputs, mu_g: f64, roughness: f64) -> FlowRegime {
    if dispersed_bubble_test(inputs) {
        return FlowRegime::DispersedBubble;
    }
    if annular_test(inputs) {
        return FlowRegime::Annular;
    }

    if inputs.theta_rad > 0.0 {
        // Upward: bubble/slug split on α_G crit = 0.25, bubble rise velocity
        // from Harmathy.
        let u_m = inputs.u_sl + inputs.u_sg;
        let u_bubble = harmathy_bubble_rise(inputs.rho_l, inputs.rho_g, inputs.sigma);
        let alpha_g_estimate = if u_m + u_bubble > 1e-9 {
            (inputs.u_sg / (u_m + u_bubble)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if alpha_g_estimate < 0.25 {
            FlowRegime::Bubble
        } else {
            FlowRegime::Slug
        }
    } else {
        // Downward: KH or sheltering selects slug vs. stratified.
        let solve = solve_stratified_level(inputs, mu_g, roughness);
        let u_g_crit = kh_critical_velocity(&solve, inputs.d, inputs.rho_l, inputs.rho_g);
        if solve.u_g > u_g_crit {
            return FlowRegime::Slug;
        }
        let sheltering_crit =
            sheltering_critical_velocity(inputs.mu_l, inputs.rho_l, inputs.rho_g);
        if solve.u_g > sheltering_crit {
            FlowRegime::StratifiedWavy
        } else {
            FlowRegime::StratifiedSmooth
        }
    }
}

/// Mechanistic regime classification (spec.md §4.4). `mu_g` and
/// `roughness` feed the stratified momentum-balance sub-solve.
pub fn detect_regime(inputs: &RegimeInputs, mu_g: f64, roughness: f64) -> FlowRegime {
    if inputs.u_sl < 1e-6 {
        return FlowRegime::SinglePhaseGas;
    }
    if inputs.u_sg < 1e-6 {
        return FlowRegime::SinglePhaseLiquid;
    }

    if inputs.theta_rad.abs() <= TEN_DEGREES_RAD {
        taitel_dukler(inputs, mu_g, roughness)
    } else {
        barnea(inputs, mu_g, roughness)
    }
}

/// Secondary "minimum slip" regime selector used as a diagnostic / map
/// generator (spec.md §4.4): evaluate drift-flux slip for each candidate
/// regime and pick the one closest to unity.
pub fn detect_regime_minimum_slip(inputs: &RegimeInputs, mu_g: f64, roughness: f64) -> FlowRegime {
    if inputs.u_sl < 1e-6 {
        return FlowRegime::SinglePhaseGas;
    }
    if inputs.u_sg < 1e-6 {
        return FlowRegime::SinglePhaseLiquid;
    }

    let candidates = [
        FlowRegime::Bubble,
        FlowRegime::DispersedBubble,
        FlowRegime::Slug,
        FlowRegime::Churn,
        FlowRegime::Annular,
    ];

    candidates
        .into_iter()
        .map(|regime| {
            let slip = crate::drift_flux::diagnostic_slip(regime, inputs);
            (regime, (slip - 1.0).abs())
        })
        .fold(None, |best: Option<(FlowRegime, f64)>, (regime, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((regime, dist)),
        })
        .map(|(regime, _)| regime)
        .unwrap_or_else(|| detect_regime(inputs, mu_g, roughness))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_air_inputs(u_sl: f64, u_sg: f64, theta: f64) -> RegimeInputs {
        RegimeInputs {
            u_sl,
            u_sg,
            d: 0.15,
            theta_rad: theta,
            rho_l: 1000.0,
            rho_g: 1.2,
            mu_l: 1.0e-3,
            sigma: 0.072,
        }
    }

    #[test]
    fn zero_liquid_is_single_phase_gas() {
        let inputs = water_air_inputs(0.0, 5.0, 0.0);
        assert_eq!(
            detect_regime(&inputs, 1.8e-5, 1e-5),
            FlowRegime::SinglePhaseGas
        );
    }

    #[test]
    fn zero_gas_is_single_phase_liquid() {
        let inputs = water_air_inputs(1.0, 0.0, 0.0);
        assert_eq!(
            detect_regime(&inputs, 1.8e-5, 1e-5),
            FlowRegime::SinglePhaseLiquid
        );
    }

    #[test]
    fn high_gas_velocity_horizontal_is_annular_or_dispersed() {
        let inputs = water_air_inputs(0.05, 25.0, 0.0);
        let regime = detect_regime(&inputs, 1.8e-5, 1e-5);
        assert!(matches!(
            regime,
            FlowRegime::Annular | FlowRegime::DispersedBubble | FlowRegime::Mist
        ));
    }

    #[test]
    fn low_velocities_horizontal_are_stratified() {
        let inputs = water_air_inputs(0.01, 0.2, 0.0);
        let regime = detect_regime(&inputs, 1.8e-5, 1e-5);
        assert!(matches!(
            regime,
            FlowRegime::StratifiedSmooth | FlowRegime::StratifiedWavy
        ));
    }

    #[test]
    fn upward_high_gas_fraction_is_slug_or_bubble() {
        let inputs = water_air_inputs(0.5, 1.0, std::f64::consts::FRAC_PI_2);
        let regime = detect_regime(&inputs, 1.8e-5, 1e-5);
        assert!(matches!(regime, FlowRegime::Bubble | FlowRegime::Slug));
    }

    #[test]
    fn sweep_velocity_is_finite_for_inclined_pipe() {
        let v = taitel_sweep_velocity(0.3, 0.2, 900.0, 1.0);
        assert!(v.is_finite() && v > 0.0);
    }

    #[test]
    fn default_surface_tensions_match_spec() {
        assert_eq!(default_surface_tension(SurfaceTensionPair::GasOil), 0.020);
        assert_eq!(
            default_surface_tension(SurfaceTensionPair::GasWater),
            0.072
        );
        assert_eq!(
            default_surface_tension(SurfaceTensionPair::OilWater),
            0.030
        );
    }
}
