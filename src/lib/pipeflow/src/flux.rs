//! AUSM+ numerical flux at cell faces, boundary-face assembly per BC kind
//! (spec.md §4.5).
//!
//! Grounded on the teacher's `transmissibility_upstream` /
//! `transmissibility_with_prev_pressure`: small pure functions taking a
//! left/right pair (or a cell + BC value) and returning a flux-like
//! number, called once per face per step from the driver.

use crate::cell::Cell;
use crate::config::{BoundaryConfig, BoundaryKind};

/// Conservative flux vector across one face (spec.md §4.5): gas mass,
/// liquid mass, momentum, energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFlux {
    pub gas_mass_flux: f64,
    pub liquid_mass_flux: f64,
    pub momentum_flux: f64,
    pub energy_flux: f64,
}

impl FaceFlux {
    const ZERO: FaceFlux = FaceFlux {
        gas_mass_flux: 0.0,
        liquid_mass_flux: 0.0,
        momentum_flux: 0.0,
        energy_flux: 0.0,
    };
}

fn mach_split_subsonic(m: f64) -> (f64, f64) {
    let plus = 0.25 * (m + 1.0) * (m + 1.0);
    let minus = -0.25 * (m - 1.0) * (m - 1.0);
    (plus, minus)
}

fn pressure_split_subsonic(m: f64) -> (f64, f64) {
    let plus = 0.25 * (m + 1.0) * (m + 1.0) * (2.0 - m);
    let minus = 0.25 * (m - 1.0) * (m - 1.0) * (2.0 + m);
    (plus, minus)
}

/// AUSM+ Mach splitting (spec.md §4.5): |M|≤1 uses the quadratic
/// polynomial split; |M|>1 uses the sign-based split.
fn mach_split(m: f64) -> (f64, f64) {
    if m.abs() <= 1.0 {
        mach_split_subsonic(m)
    } else {
        (0.5 * (m + m.abs()), 0.5 * (m - m.abs()))
    }
}

/// AUSM+ pressure splitting (spec.md §4.5).
fn pressure_split(m: f64) -> (f64, f64) {
    if m.abs() <= 1.0 {
        pressure_split_subsonic(m)
    } else {
        (0.5 * (1.0 + m.signum()), 0.5 * (1.0 - m.signum()))
    }
}

struct PhaseFaceState {
    rho_alpha: f64,
    u: f64,
    h: f64,
}

fn gas_state(cell: &Cell) -> PhaseFaceState {
    PhaseFaceState {
        rho_alpha: cell.rho_g * cell.alpha_g,
        u: cell.u_g,
        h: cell.h_g,
    }
}

fn liquid_state(cell: &Cell) -> PhaseFaceState {
    PhaseFaceState {
        rho_alpha: cell.rho_l * cell.alpha_l,
        u: cell.u_l,
        h: cell.h_l,
    }
}

/// AUSM+ interior face flux between left `l` and right `r` cells (spec.md
/// §4.5).
pub fn ausm_plus_face_flux(l: &Cell, r: &Cell) -> FaceFlux {
    let c_face = 0.5 * (l.c_g.max(l.c_l) + r.c_g.max(r.c_l)).max(10.0);

    let gas_l = gas_state(l);
    let gas_r = gas_state(r);
    let liq_l = liquid_state(l);
    let liq_r = liquid_state(r);

    let gas_flux = phase_mass_flux(&gas_l, &gas_r, c_face);
    let liq_flux = phase_mass_flux(&liq_l, &liq_r, c_face);

    let m_mix_l = l.u_m / c_face;
    let m_mix_r = r.u_m / c_face;
    let (p_plus, _) = pressure_split(m_mix_l);
    let (_, p_minus) = pressure_split(m_mix_r);
    let p_face = p_plus * l.pressure_pa + p_minus * r.pressure_pa;

    let gas_momentum = gas_flux.mass_flux * gas_flux.upwind_u;
    let liq_momentum = liq_flux.mass_flux * liq_flux.upwind_u;
    let momentum_flux = gas_momentum + liq_momentum + p_face;

    let u_mix_upwind = if gas_flux.mass_flux + liq_flux.mass_flux >= 0.0 {
        l.u_m
    } else {
        r.u_m
    };
    let gas_energy = gas_flux.mass_flux * (gas_flux.upwind_h + 0.5 * gas_flux.upwind_u * gas_flux.upwind_u);
    let liq_energy = liq_flux.mass_flux * (liq_flux.upwind_h + 0.5 * liq_flux.upwind_u * liq_flux.upwind_u);
    let energy_flux = gas_energy + liq_energy + p_face * u_mix_upwind;

    FaceFlux {
        gas_mass_flux: gas_flux.mass_flux,
        liquid_mass_flux: liq_flux.mass_flux,
        momentum_flux,
        energy_flux,
    }
}

struct PhaseFluxResult {
    mass_flux: f64,
    upwind_u: f64,
    upwind_h: f64,
}

fn phase_mass_flux(left: &PhaseFaceState, right: &PhaseFaceState, c_face: f64) -> PhaseFluxResult {
    let m_l = left.u / c_face;
    let m_r = right.u / c_face;
    let (m_plus, _) = mach_split(m_l);
    let (_, m_minus) = mach_split(m_r);
    let m_face = m_plus + m_minus;

    let (mass_flux, upwind_u, upwind_h) = if m_face > 0.0 {
        (m_face * c_face * left.rho_alpha, left.u, left.h)
    } else {
        (m_face * c_face * right.rho_alpha, right.u, right.h)
    };

    PhaseFluxResult {
        mass_flux,
        upwind_u,
        upwind_h,
    }
}

/// Boundary-face flux dispatch (spec.md §4.5). `stream_holdup_gas`/
/// `stream_enthalpy_gas`/`stream_enthalpy_liquid` come from the inlet or
/// outlet stream collaborator, not the adjacent cell, for constant-flow
/// boundaries.
pub struct StreamFaceData {
    pub mass_flow_kg_s: f64,
    pub holdup_gas: f64,
    pub enthalpy_gas_j_kg: f64,
    pub enthalpy_liquid_j_kg: f64,
}

/// Inlet boundary face: constant-flow splits the inlet ṁ by the inlet
/// stream's phase holdups, not the first cell's; constant-pressure calls
/// AUSM+ with L=R=boundary cell after clamping pressure; closed emits zero
/// mass/energy flux with pressure-only momentum.
pub fn inlet_boundary_flux(
    config: &BoundaryConfig,
    first_cell: &Cell,
    stream: Option<&StreamFaceData>,
) -> FaceFlux {
    match config.inlet {
        BoundaryKind::ConstantFlow | BoundaryKind::TransientFlow => {
            let Some(stream) = stream else {
                return closed_face_flux(first_cell);
            };
            let gas_mass_flux = stream.mass_flow_kg_s * stream.holdup_gas;
            let liquid_mass_flux = stream.mass_flow_kg_s * (1.0 - stream.holdup_gas);
            let u_inlet = if first_cell.area_m2 > 1e-12 {
                stream.mass_flow_kg_s / (first_cell.rho_m.max(1e-6) * first_cell.area_m2)
            } else {
                0.0
            };
            FaceFlux {
                gas_mass_flux,
                liquid_mass_flux,
                momentum_flux: stream.mass_flow_kg_s * u_inlet + first_cell.pressure_pa,
                energy_flux: gas_mass_flux * stream.enthalpy_gas_j_kg
                    + liquid_mass_flux * stream.enthalpy_liquid_j_kg
                    + 0.5 * stream.mass_flow_kg_s * u_inlet * u_inlet,
            }
        }
        BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
            let mut clamped = first_cell.clone();
            clamped.pressure_pa = config.inlet_pressure_pa.clamp(1e5, 5e7);
            ausm_plus_face_flux(&clamped, first_cell)
        }
        BoundaryKind::Closed => closed_face_flux(first_cell),
    }
}

/// Outlet boundary face: mirror of the inlet using outlet ṁ/properties.
pub fn outlet_boundary_flux(
    config: &BoundaryConfig,
    last_cell: &Cell,
    stream: Option<&StreamFaceData>,
) -> FaceFlux {
    match config.outlet {
        BoundaryKind::ConstantFlow | BoundaryKind::TransientFlow => {
            let Some(stream) = stream else {
                return closed_face_flux(last_cell);
            };
            let gas_mass_flux = stream.mass_flow_kg_s * stream.holdup_gas;
            let liquid_mass_flux = stream.mass_flow_kg_s * (1.0 - stream.holdup_gas);
            let u_outlet = if last_cell.area_m2 > 1e-12 {
                stream.mass_flow_kg_s / (last_cell.rho_m.max(1e-6) * last_cell.area_m2)
            } else {
                0.0
            };
            FaceFlux {
                gas_mass_flux,
                liquid_mass_flux,
                momentum_flux: stream.mass_flow_kg_s * u_outlet + last_cell.pressure_pa,
                energy_flux: gas_mass_flux * stream.enthalpy_gas_j_kg
                    + liquid_mass_flux * stream.enthalpy_liquid_j_kg
                    + 0.5 * stream.mass_flow_kg_s * u_outlet * u_outlet,
            }
        }
        BoundaryKind::ConstantPressure | BoundaryKind::TransientPressure => {
            let mut clamped = last_cell.clone();
            clamped.pressure_pa = config.outlet_pressure_pa.clamp(1e5, 5e7);
            ausm_plus_face_flux(last_cell, &clamped)
        }
        BoundaryKind::Closed => closed_face_flux(last_cell),
    }
}

/// Closed boundary: zero mass/energy flux, momentum flux from cell
/// pressure only (spec.md §4.5).
fn closed_face_flux(cell: &Cell) -> FaceFlux {
    FaceFlux {
        momentum_flux: cell.pressure_pa,
        ..FaceFlux::ZERO
    }
}
