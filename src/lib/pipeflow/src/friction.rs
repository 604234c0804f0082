//! Single-phase and two-phase wall friction, interfacial friction
//! (spec.md §4.2).
//!
//! `friction_gradient` dispatches on `FlowRegime` with a plain `match`, the
//! same pattern the teacher uses in `transmissibility`/
//! `geometric_transmissibility` (dispatch on a dimension tag, not a trait
//! object).

use crate::cell::Cell;
use crate::geometry::{annular_film_thickness, geometry_from_holdup};
use crate::regime::FlowRegime;

const FRICTION_GRADIENT_CLAMP_PA_M: f64 = 1000.0;

/// Darcy (Moody) friction factor (spec.md §4.2): laminar below Re=2300,
/// Haaland above, with the teacher's style of explicit regime cutoffs
/// (`friction.rs`'s Re<10/Re<2300/else structure mirrors
/// `ReservoirSimulator::transmissibility`'s explicit branch-per-case shape).
pub fn darcy_friction_factor(re: f64, roughness: f64, d: f64) -> f64 {
    if re < 10.0 {
        return 6.4;
    }
    if re < 2300.0 {
        return 64.0 / re;
    }
    let rel_roughness = roughness / d.max(1e-9);
    let inner = (rel_roughness / 3.7).powf(1.11) + 6.9 / re;
    let f = (-1.8 * inner.log10()).powi(-2);
    f.max(0.001)
}

fn darcy_weisbach_gradient(f: f64, rho: f64, u: f64, d: f64) -> f64 {
    // dP/dx = -f/D * rho * u|u| / 2, negative in the flow direction.
    -(f / d.max(1e-9)) * rho * u * u.abs() / 2.0
}

/// Interfacial friction factor for annular/stratified regimes (spec.md
/// §4.2).
pub fn interfacial_friction_factor(regime: FlowRegime, f_g: f64, delta: f64, d: f64) -> f64 {
    match regime {
        FlowRegime::Annular | FlowRegime::Mist => f_g * (1.0 + 300.0 * delta / d.max(1e-9)),
        FlowRegime::StratifiedSmooth | FlowRegime::StratifiedWavy => f_g,
        _ => f_g,
    }
}

/// Parameters from the drift-flux closure needed for the friction
/// dispatch (cached per call so `friction_gradient` doesn't re-run the
/// stratified momentum balance itself — that's `drift_flux`'s job).
#[derive(Debug, Clone, Copy)]
pub struct FrictionContext {
    pub u_m: f64,
    pub mixture_density: f64,
    pub mixture_viscosity: f64,
}

/// Regime-dispatched friction pressure gradient dP/dx [Pa/m], negative in
/// flow direction, clamped to ±1000 Pa/m (spec.md §4.2).
pub fn friction_gradient(cell: &Cell, ctx: &FrictionContext) -> f64 {
    let d = cell.diameter_m;
    let gradient = match cell.regime {
        FlowRegime::SinglePhaseGas => {
            let re = (cell.rho_g * cell.u_g.abs() * d / cell.mu_g.max(1e-9)).max(1.0);
            let f = darcy_friction_factor(re, cell.roughness_m, d);
            darcy_weisbach_gradient(f, cell.rho_g, cell.u_g, d)
        }
        FlowRegime::SinglePhaseLiquid => {
            let re = (cell.rho_l * cell.u_l.abs() * d / cell.mu_l.max(1e-9)).max(1.0);
            let f = darcy_friction_factor(re, cell.roughness_m, d);
            darcy_weisbach_gradient(f, cell.rho_l, cell.u_l, d)
        }
        FlowRegime::StratifiedSmooth | FlowRegime::StratifiedWavy => {
            let geom = geometry_from_holdup(cell.alpha_l, d);
            let u_l_eff = if geom.alpha_l > 1e-6 {
                cell.u_sl / geom.alpha_l
            } else {
                0.0
            };
            let u_g_eff = if geom.alpha_l < 1.0 - 1e-6 {
                cell.u_sg / (1.0 - geom.alpha_l)
            } else {
                0.0
            };
            let re_l = (cell.rho_l * u_l_eff.abs() * geom.d_hl / cell.mu_l.max(1e-9)).max(1.0);
            let re_g = (cell.rho_g * u_g_eff.abs() * geom.d_hg / cell.mu_g.max(1e-9)).max(1.0);
            let f_l = darcy_friction_factor(re_l, cell.roughness_m, geom.d_hl.max(1e-6));
            let f_g = darcy_friction_factor(re_g, cell.roughness_m, geom.d_hg.max(1e-6));

            let tau_l = f_l / 8.0 * cell.rho_l * u_l_eff * u_l_eff.abs();
            let tau_g = f_g / 8.0 * cell.rho_g * u_g_eff * u_g_eff.abs();

            // Combined wall shear force per unit length over total area
            // [N/m / m²] = [Pa/m].
            let area_total = (geom.a_l + geom.a_g).max(1e-9);
            -(tau_l * geom.s_l + tau_g * geom.s_g) / area_total
        }
        FlowRegime::Annular | FlowRegime::Mist => {
            let delta = annular_film_thickness(cell.alpha_l, d);
            let k_eff = cell.roughness_m + 0.5 * delta;
            let u_core = if (1.0 - cell.alpha_l) > 1e-6 {
                cell.u_sg / (1.0 - cell.alpha_l)
            } else {
                0.0
            };
            let re_g = (cell.rho_g * u_core.abs() * d / cell.mu_g.max(1e-9)).max(1.0);
            let f_g = darcy_friction_factor(re_g, k_eff, d);
            darcy_weisbach_gradient(f_g, cell.rho_g, u_core, d)
        }
        FlowRegime::Bubble
        | FlowRegime::DispersedBubble
        | FlowRegime::Slug
        | FlowRegime::Churn => {
            let re = (ctx.mixture_density * ctx.u_m.abs() * d / ctx.mixture_viscosity.max(1e-9))
                .max(1.0);
            let f = darcy_friction_factor(re, cell.roughness_m, d);
            darcy_weisbach_gradient(f, ctx.mixture_density, ctx.u_m, d)
        }
    };
    gradient.clamp(-FRICTION_GRADIENT_CLAMP_PA_M, FRICTION_GRADIENT_CLAMP_PA_M)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    #[test]
    fn laminar_matches_poiseuille() {
        // Horizontal pipe, constant mu/rho, laminar: dp = 32*mu*U*L/D^2.
        let d = 0.05;
        let mu = 1.0e-3;
        let rho = 1000.0;
        let u = 0.1;
        let re = rho * u * d / mu;
        assert!(re < 2300.0);
        let f = darcy_friction_factor(re, 1e-6, d);
        assert!((f - 64.0 / re).abs() < 1e-12);

        let gradient = darcy_weisbach_gradient(f, rho, u, d);
        let expected = -32.0 * mu * u / (d * d);
        assert!((gradient - expected).abs() / expected.abs() < 1e-3);
    }

    #[test]
    fn re_below_ten_returns_flat_value() {
        assert_eq!(darcy_friction_factor(5.0, 1e-5, 0.1), 6.4);
    }

    #[test]
    fn turbulent_haaland_has_floor() {
        let f = darcy_friction_factor(1.0e8, 1e-8, 1.0);
        assert!(f >= 0.001);
    }

    #[test]
    fn friction_gradient_is_clamped() {
        let mut cell = Cell::new(0.0, 10.0, 0.1, 0.0, 0.0, 1e-4);
        cell.regime = FlowRegime::SinglePhaseGas;
        cell.u_g = 300.0;
        cell.rho_g = 80.0;
        let ctx = FrictionContext {
            u_m: cell.u_g,
            mixture_density: cell.rho_g,
            mixture_viscosity: cell.mu_g,
        };
        let gradient = friction_gradient(&cell, &ctx);
        assert!(gradient.abs() <= FRICTION_GRADIENT_CLAMP_PA_M);
    }

    #[test]
    fn interfacial_friction_annular_scales_with_film() {
        let f_g = 0.02;
        let thin = interfacial_friction_factor(FlowRegime::Annular, f_g, 0.0001, 0.1);
        let thick = interfacial_friction_factor(FlowRegime::Annular, f_g, 0.01, 0.1);
        assert!(thick > thin);
    }
}
