//! Stratified circular-segment geometry (spec.md §4.1).
//!
//! Small struct + closed-form methods, the same shape as the teacher's
//! `RockFluidProps`/`CapillaryPressure`: a plain data-bearing return type
//! with clamped, NaN-free closed-form formulas.

const MIN_H_FRACTION: f64 = 1e-10;

/// Stratified two-phase cross-section geometry at a given liquid level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratifiedGeometry {
    /// Liquid cross-sectional area [m²]
    pub a_l: f64,
    /// Gas cross-sectional area [m²]
    pub a_g: f64,
    /// Liquid-wetted perimeter [m]
    pub s_l: f64,
    /// Gas-wetted perimeter [m]
    pub s_g: f64,
    /// Gas-liquid interface width [m]
    pub s_i: f64,
    /// Liquid hydraulic diameter [m]
    pub d_hl: f64,
    /// Gas hydraulic diameter [m]
    pub d_hg: f64,
    /// Half subtended angle [rad]
    pub half_beta: f64,
    /// Liquid level [m]
    pub h: f64,
    /// Liquid holdup [-]
    pub alpha_l: f64,
}

fn clamp_h(h: f64, d: f64) -> f64 {
    h.clamp(MIN_H_FRACTION, d - MIN_H_FRACTION)
}

/// Geometry from a given liquid level `h` [m] in a pipe of diameter `d` [m]
/// (spec.md §4.1: β = 2·acos(1 − 2h/D)).
pub fn geometry_from_level(h: f64, d: f64) -> StratifiedGeometry {
    let h = clamp_h(h, d);
    let r = d / 2.0;
    let cos_arg = (1.0 - 2.0 * h / d).clamp(-1.0, 1.0);
    let beta = 2.0 * cos_arg.acos();
    let half_beta = beta / 2.0;

    let a_l = r * r * (beta - beta.sin()) / 2.0;
    let a_total = std::f64::consts::PI * r * r;
    let a_g = (a_total - a_l).max(0.0);

    let s_l = r * beta;
    let s_g = r * (2.0 * std::f64::consts::PI - beta);
    let s_i = 2.0 * r * half_beta.sin();

    let d_hl = if s_l > 1e-12 { 4.0 * a_l / s_l } else { 0.0 };
    let d_hg = if (s_g + s_i) > 1e-12 {
        4.0 * a_g / (s_g + s_i)
    } else {
        0.0
    };

    let alpha_l = (a_l / a_total).clamp(0.0, 1.0);

    StratifiedGeometry {
        a_l,
        a_g,
        s_l,
        s_g,
        s_i,
        d_hl,
        d_hg,
        half_beta,
        h,
        alpha_l,
    }
}

/// Rate of change of liquid area with level, dA/dh = S_i (spec.md §4.1,
/// used directly by the Kelvin–Helmholtz stability check).
pub fn d_a_dh(geometry: &StratifiedGeometry) -> f64 {
    geometry.s_i
}

/// Annular film thickness δ = R·(1 − √(1 − α_L)) (spec.md §4.1).
pub fn annular_film_thickness(alpha_l: f64, d: f64) -> f64 {
    let r = d / 2.0;
    let alpha_l = alpha_l.clamp(0.0, 1.0);
    r * (1.0 - (1.0 - alpha_l).sqrt())
}

/// Geometry from a target liquid holdup `alpha_l` via Newton iteration
/// seeded at `h = D·α_L`, falling back to bisection when the Newton
/// derivative degenerates (`|sin β| < 1e-10`), per spec.md §4.1.
pub fn geometry_from_holdup(alpha_l: f64, d: f64) -> StratifiedGeometry {
    let alpha_l = alpha_l.clamp(0.0, 1.0);
    let target_a_l = alpha_l * std::f64::consts::PI * (d / 2.0) * (d / 2.0);

    let mut h = clamp_h(alpha_l * d, d);
    let mut converged = false;

    for _ in 0..50 {
        let g = geometry_from_level(h, d);
        let residual = g.a_l - target_a_l;
        if residual.abs() < 1e-12 * (d * d).max(1.0) {
            converged = true;
            break;
        }
        let derivative = d_a_dh(&g);
        let beta_sin = (2.0 * g.half_beta).sin();
        if beta_sin.abs() < 1e-10 || derivative.abs() < 1e-12 {
            // Newton degenerate; fall through to bisection below.
            break;
        }
        let step = residual / derivative;
        h = clamp_h(h - step, d);
        if (residual / derivative).abs() < 1e-14 {
            converged = true;
            break;
        }
    }

    if !converged {
        // Bisection fallback.
        let mut lo = MIN_H_FRACTION;
        let mut hi = d - MIN_H_FRACTION;
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            let g = geometry_from_level(mid, d);
            if g.a_l < target_a_l {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        h = 0.5 * (lo + hi);
    }

    geometry_from_level(h, d)
}
