//! Eulerian low-point liquid-accumulation tracker (spec.md §4.7).
//!
//! Identified once at `initialize_pipe`, mutated every step. Shaped after
//! the teacher's `Well` struct: a plain data record created once, looked
//! up by index, and mutated in place by the driver's step loop rather than
//! holding its own borrow across steps.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::config::SlugConfig;
use crate::error::{SimWarning, WarningCounters};
use crate::regime::{taitel_sweep_velocity, RegimeInputs};

/// Minimum fraction of the gas phase's superficial velocity above which a
/// low point is considered swept clean (spec.md §4.7, Taitel sweep test).
const GAP_GROUP_FRACTION_OF_D: f64 = 0.1;

/// A terrain low point (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccumulationZone {
    pub id: u64,
    pub centre_cell_index: usize,
    pub cell_indices: Vec<usize>,
    pub depth_m: f64,
    pub accumulated_liquid_volume_m3: f64,
    pub overflow_threshold_m3: f64,
    pub last_release_time_s: f64,
}

impl AccumulationZone {
    fn new(id: u64, centre_cell_index: usize, cell_indices: Vec<usize>, depth_m: f64, overflow_threshold_m3: f64) -> Self {
        AccumulationZone {
            id,
            centre_cell_index,
            cell_indices,
            depth_m,
            accumulated_liquid_volume_m3: 0.0,
            overflow_threshold_m3,
            last_release_time_s: f64::NEG_INFINITY,
        }
    }
}

/// A terrain slug seed emitted by a zone release (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlugCharacteristics {
    pub front_position_m: f64,
    pub tail_position_m: f64,
    pub length_m: f64,
    pub velocity_ms: f64,
    pub holdup: f64,
    pub volume_m3: f64,
}

/// Identify terrain low points once from the cell elevation profile
/// (spec.md §4.7): a local minimum at cell `i` with `elev[i] < elev[i-1]`
/// and `elev[i] < elev[i+1]`, neighbouring cells grouped in if their
/// elevation is within `0.1*D` of the minimum.
pub fn identify_low_points(cells: &[Cell]) -> Vec<AccumulationZone> {
    let mut zones = Vec::new();
    let mut next_id = 0u64;

    for i in 1..cells.len().saturating_sub(1) {
        let elev = cells[i].elevation_m;
        if elev < cells[i - 1].elevation_m && elev < cells[i + 1].elevation_m {
            let d = cells[i].diameter_m;
            let band = GAP_GROUP_FRACTION_OF_D * d;

            let mut lo = i;
            while lo > 0 && (cells[lo - 1].elevation_m - elev).abs() <= band {
                lo -= 1;
            }
            let mut hi = i;
            while hi + 1 < cells.len() && (cells[hi + 1].elevation_m - elev).abs() <= band {
                hi += 1;
            }

            let cell_indices: Vec<usize> = (lo..=hi).collect();
            let depth_m = cell_indices
                .iter()
                .map(|&idx| cells[idx].elevation_m)
                .fold(f64::NEG_INFINITY, f64::max)
                - elev;

            let overflow_threshold_m3: f64 = cell_indices
                .iter()
                .map(|&idx| cells[idx].area_m2 * cells[idx].length_m * 0.3)
                .sum();

            zones.push(AccumulationZone::new(
                next_id,
                i,
                cell_indices,
                depth_m.max(0.0),
                overflow_threshold_m3.max(1e-9),
            ));
            next_id += 1;
        }
    }

    zones
}

/// Per-step update of a single zone (spec.md §4.7): integrate
/// `(α_L − α_L_equilibrium)·A·Δx` over the zone cells with a
/// positive-only contribution, decayed by outflow when the local liquid
/// velocity exceeds a flush threshold.
fn update_zone_volume(zone: &mut AccumulationZone, cells: &[Cell], alpha_l_equilibrium: f64, dt_s: f64) {
    let flush_velocity_ms = 1.0;
    let mut inflow = 0.0;
    let mut decay = 0.0;

    for &idx in &zone.cell_indices {
        let cell = &cells[idx];
        let excess = (cell.alpha_l - alpha_l_equilibrium).max(0.0);
        inflow += excess * cell.area_m2 * cell.length_m;

        if cell.u_l.abs() > flush_velocity_ms {
            decay += zone.accumulated_liquid_volume_m3 * 0.05 * dt_s;
        }
    }

    zone.accumulated_liquid_volume_m3 =
        (zone.accumulated_liquid_volume_m3 + inflow * dt_s * 0.1 - decay).max(0.0);
}

/// Release condition (spec.md §4.7): accumulated volume at/over
/// threshold, gas superficial velocity at the downhill boundary exceeds
/// the Taitel sweep velocity, and the debounce window has elapsed. At
/// most one release per zone per step.
fn check_release(
    zone: &mut AccumulationZone,
    cells: &[Cell],
    t_s: f64,
    debounce_s: f64,
) -> Option<SlugCharacteristics> {
    if zone.accumulated_liquid_volume_m3 < zone.overflow_threshold_m3 {
        return None;
    }
    if t_s - zone.last_release_time_s < debounce_s {
        return None;
    }

    let downhill = *zone.cell_indices.last()?;
    let cell = &cells[downhill];
    let sweep_velocity = taitel_sweep_velocity(cell.diameter_m, cell.inclination_rad, cell.rho_l, cell.rho_g);
    if cell.u_sg <= sweep_velocity {
        return None;
    }

    let volume = zone.accumulated_liquid_volume_m3;
    let length_m = (volume / (cell.area_m2 * 0.6)).max(cell.length_m);
    let front_position_m = cell.position_m + length_m;
    let tail_position_m = cell.position_m;

    zone.accumulated_liquid_volume_m3 = 0.0;
    zone.last_release_time_s = t_s;

    Some(SlugCharacteristics {
        front_position_m,
        tail_position_m,
        length_m,
        velocity_ms: cell.u_m,
        holdup: (1.0 / (1.0 + (cell.u_m.abs() / 8.66).powf(1.39))).clamp(0.5, 0.98),
        volume_m3: volume,
    })
}

/// Drive all zones forward by one step, returning any terrain slug seeds
/// released this step.
pub fn advance(
    zones: &mut [AccumulationZone],
    cells: &[Cell],
    alpha_l_equilibrium: f64,
    t_s: f64,
    dt_s: f64,
    config: &SlugConfig,
    warnings: &mut WarningCounters,
) -> Vec<SlugCharacteristics> {
    let debounce_s = 10.0;
    let mut released = Vec::new();

    for zone in zones.iter_mut() {
        update_zone_volume(zone, cells, alpha_l_equilibrium, dt_s);

        if !config.enable_terrain {
            continue;
        }

        if let Some(seed) = check_release(zone, cells, t_s, debounce_s) {
            if seed.length_m <= 0.0 || !seed.length_m.is_finite() {
                warnings.record(SimWarning::SlugInvariantViolated {
                    slug_id: zone.id,
                    detail: "terrain release produced non-finite length".into(),
                });
                continue;
            }
            released.push(seed);
        }
    }

    released
}

/// Build `RegimeInputs` for the downhill boundary of a zone (helper used
/// by callers that want to re-evaluate the regime there).
pub fn downhill_regime_inputs(zone: &AccumulationZone, cells: &[Cell]) -> Option<RegimeInputs> {
    let idx = *zone.cell_indices.last()?;
    let cell = &cells[idx];
    Some(RegimeInputs {
        u_sl: cell.u_sl,
        u_sg: cell.u_sg,
        d: cell.diameter_m,
        theta_rad: cell.inclination_rad,
        rho_l: cell.rho_l,
        rho_g: cell.rho_g,
        mu_l: cell.mu_l,
        sigma: cell.sigma,
    })
}
