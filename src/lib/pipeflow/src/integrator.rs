//! CFL-adaptive `stable_dt` and the four explicit time-stepping schemes
//! on the semi-discrete RHS (spec.md §4.6).
//!
//! The scheme dispatch mirrors the teacher's `step_internal`'s bounded
//! retry shape: compute a candidate, check it, step at a smaller dt if
//! unstable, rather than trusting a single estimate.

use crate::cell::{Cell, ConservativeState};
use crate::config::IntegrationScheme;

/// CFL-limited stable time step (spec.md §4.6): `cfl * min(dx / maxwave)`
/// over all cells, with per-cell wave speed `max(|u_G±c|, |u_L±c|)`, sound
/// speed clamped to [10,1000] m/s, and a fallback to `dt_min` when ≥25% of
/// cells produce a non-finite wave speed.
pub fn stable_dt(cells: &[Cell], cfl: f64, dt_min: f64, dt_max: f64) -> f64 {
    if cells.is_empty() {
        return dt_min;
    }

    let mut nan_count = 0usize;
    let mut min_dt = f64::INFINITY;

    for cell in cells {
        let c_g = cell.c_g.clamp(10.0, 1000.0);
        let c_l = cell.c_l.clamp(10.0, 1000.0);
        let wave_speed = [
            (cell.u_g + c_g).abs(),
            (cell.u_g - c_g).abs(),
            (cell.u_l + c_l).abs(),
            (cell.u_l - c_l).abs(),
        ]
        .into_iter()
        .fold(0.0_f64, f64::max);

        if !wave_speed.is_finite() || wave_speed <= 0.0 {
            nan_count += 1;
            continue;
        }

        let local_dt = cfl * cell.length_m / wave_speed;
        if local_dt.is_finite() {
            min_dt = min_dt.min(local_dt);
        }
    }

    if nan_count * 4 >= cells.len() {
        return dt_min;
    }
    if !min_dt.is_finite() {
        return dt_min;
    }

    min_dt.clamp(dt_min, dt_max)
}

fn add_scaled(base: &[ConservativeState], delta: &[ConservativeState], factor: f64) -> Vec<ConservativeState> {
    base.iter()
        .zip(delta.iter())
        .map(|(b, d)| ConservativeState {
            gas_mass: b.gas_mass + factor * d.gas_mass,
            liquid_mass: b.liquid_mass + factor * d.liquid_mass,
            momentum: b.momentum + factor * d.momentum,
            energy: b.energy + factor * d.energy,
        })
        .collect()
}

fn combine(terms: &[(&[ConservativeState], f64)]) -> Vec<ConservativeState> {
    let len = terms[0].0.len();
    (0..len)
        .map(|i| {
            let mut acc = ConservativeState {
                gas_mass: 0.0,
                liquid_mass: 0.0,
                momentum: 0.0,
                energy: 0.0,
            };
            for (slice, weight) in terms {
                let s = slice[i];
                acc.gas_mass += weight * s.gas_mass;
                acc.liquid_mass += weight * s.liquid_mass;
                acc.momentum += weight * s.momentum;
                acc.energy += weight * s.energy;
            }
            acc
        })
        .collect()
}

/// Forward Euler (1st order): `U^{n+1} = U^n + dt * R(U^n)`.
pub fn step_euler(state: &[ConservativeState], rhs: impl Fn(&[ConservativeState]) -> Vec<ConservativeState>, dt: f64) -> Vec<ConservativeState> {
    let r0 = rhs(state);
    add_scaled(state, &r0, dt)
}

/// RK2 Heun's method (spec.md §4.6).
pub fn step_rk2_heun(state: &[ConservativeState], rhs: impl Fn(&[ConservativeState]) -> Vec<ConservativeState>, dt: f64) -> Vec<ConservativeState> {
    let k1 = rhs(state);
    let predictor = add_scaled(state, &k1, dt);
    let k2 = rhs(&predictor);
    combine(&[(state, 1.0), (&k1, dt / 2.0), (&k2, dt / 2.0)])
}

/// Classical 4-stage Runge-Kutta (spec.md §4.6).
pub fn step_rk4(state: &[ConservativeState], rhs: impl Fn(&[ConservativeState]) -> Vec<ConservativeState>, dt: f64) -> Vec<ConservativeState> {
    let k1 = rhs(state);
    let y2 = add_scaled(state, &k1, dt / 2.0);
    let k2 = rhs(&y2);
    let y3 = add_scaled(state, &k2, dt / 2.0);
    let k3 = rhs(&y3);
    let y4 = add_scaled(state, &k3, dt);
    let k4 = rhs(&y4);
    combine(&[
        (state, 1.0),
        (&k1, dt / 6.0),
        (&k2, dt / 3.0),
        (&k3, dt / 3.0),
        (&k4, dt / 6.0),
    ])
}

/// SSP-RK3 Shu-Osher form (spec.md §4.6):
/// u1 = u + dt*R(u); u2 = 3/4 u + 1/4 u1 + 1/4 dt*R(u1);
/// u3 = 1/3 u + 2/3 u2 + 2/3 dt*R(u2).
pub fn step_ssp_rk3(state: &[ConservativeState], rhs: impl Fn(&[ConservativeState]) -> Vec<ConservativeState>, dt: f64) -> Vec<ConservativeState> {
    let r0 = rhs(state);
    let u1 = add_scaled(state, &r0, dt);

    let r1 = rhs(&u1);
    let u2 = combine(&[(state, 0.75), (&u1, 0.25), (&r1, dt * 0.25)]);

    let r2 = rhs(&u2);
    combine(&[(state, 1.0 / 3.0), (&u2, 2.0 / 3.0), (&r2, dt * 2.0 / 3.0)])
}

/// Dispatch by configured scheme (spec.md §4.6).
pub fn step(
    scheme: IntegrationScheme,
    state: &[ConservativeState],
    rhs: impl Fn(&[ConservativeState]) -> Vec<ConservativeState>,
    dt: f64,
) -> Vec<ConservativeState> {
    match scheme {
        IntegrationScheme::Euler => step_euler(state, rhs, dt),
        IntegrationScheme::Rk2 => step_rk2_heun(state, rhs, dt),
        IntegrationScheme::Rk4 => step_rk4(state, rhs, dt),
        IntegrationScheme::SspRk3 => step_ssp_rk3(state, rhs, dt),
    }
}
