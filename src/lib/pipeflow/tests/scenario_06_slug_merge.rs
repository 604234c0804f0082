//! Scenario 6: slug merge and dissipation (spec.md §8.6).
//!
//! `SlugTracker` is driven directly here rather than through
//! `TransientDriver`, since the scenario seeds two specific slugs at a
//! fixed 0.5 m gap rather than letting the inlet/terrain seeders decide
//! when and where slugs appear.

use pipeflow::cell::Cell;
use pipeflow::config::SlugConfig;
use pipeflow::error::WarningCounters;
use pipeflow::regime::FlowRegime;
use pipeflow::rng::SimRng;
use pipeflow::slug::{SlugSource, SlugTracker, SlugUnit};

fn make_slug_flow_cells(n: usize, dx: f64, diameter_m: f64) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(n);
    for i in 0..n {
        let mut cell = Cell::new((i as f64 + 0.5) * dx, dx, diameter_m, 0.0, 0.0, 1e-4);
        cell.alpha_g = 0.6;
        cell.alpha_l = 0.4;
        cell.rho_g = 50.0;
        cell.rho_l = 900.0;
        cell.mu_g = 1.2e-5;
        cell.mu_l = 1.0e-3;
        cell.sigma = 0.02;
        cell.u_g = 2.5;
        cell.u_l = 1.5;
        cell.regime = FlowRegime::Slug;
        cell.enforce_invariants();
        cells.push(cell);
    }
    cells
}

#[test]
fn two_close_slugs_merge_exactly_once_and_conserve_mass() {
    let diameter_m = 0.15;
    let mut cells = make_slug_flow_cells(40, 10.0, diameter_m);

    let mut tracker = SlugTracker::new();
    let reference = cells[9].clone();
    let leading = seed_unit(0, SlugSource::Terrain, 100.0, 10.0, &reference);
    let trailing = seed_unit(1, SlugSource::Terrain, 89.5, 10.0, &reference);

    let original_total_mass_kg = leading.slug_liquid_mass_kg + trailing.slug_liquid_mass_kg;
    let original_total_length_m = leading.slug_length_m + trailing.slug_length_m;

    tracker.mass_ledger.total_borrowed_kg = original_total_mass_kg;
    tracker.slugs.push(leading);
    tracker.slugs.push(trailing);

    let config = SlugConfig {
        enable_inlet: false,
        enable_stochastic: false,
        ..SlugConfig::default()
    };
    let mut rng = SimRng::from_seed(7);
    let mut warnings = WarningCounters::default();

    let mut merge_events = 0usize;
    let dt_s = 1.0;
    for step in 0..10 {
        let before = tracker.slugs.len();
        tracker.step(
            &mut cells,
            Vec::new(),
            &config,
            step as f64 * dt_s,
            dt_s,
            1.2e-5,
            1e-4,
            400.0,
            &mut rng,
            &mut warnings,
        );
        let after = tracker.slugs.len();
        if after < before {
            merge_events += before - after;
        }
    }

    println!(
        "slug count went from 2 to {} over 10s, {} merge-driven removals",
        tracker.slugs.len(),
        merge_events
    );
    assert_eq!(merge_events, 1, "expected exactly one merger event");
    assert_eq!(tracker.slugs.len(), 1, "expected exactly one surviving slug");

    let survivor = &tracker.slugs[0];
    assert!(
        survivor.front_position_m > survivor.tail_position_m,
        "survivor front must stay ahead of its tail"
    );
    println!(
        "survivor length = {:.2} m (originals summed to {:.2} m)",
        survivor.slug_length_m, original_total_length_m
    );
    assert!(
        survivor.slug_length_m > 0.3 * original_total_length_m,
        "merged survivor should retain a substantial fraction of the combined length"
    );

    // The ledger only tracks mass at spawn/exit/dissipation; a manually
    // seeded pair (bypassing the private spawn path) starts with borrowed
    // mass pinned to the two original slugs, so the residual here tracks
    // in-flight pickup/shedding drift rather than the stricter spawn-to-exit
    // residual the driver sees over a full run.
    let residual_kg = tracker.mass_residual_kg();
    let relative_residual = residual_kg.abs() / original_total_mass_kg.max(1e-9);
    println!(
        "mass residual = {:.6} kg ({:.4}% of original combined mass)",
        residual_kg,
        relative_residual * 100.0
    );
    assert!(
        relative_residual < 0.05,
        "merged slug mass drifted too far from the two originals: {:.4}%",
        relative_residual * 100.0
    );

    println!("scenario 6 PASSED (single merge event, mass approximately conserved)");
}

fn seed_unit(id: u64, source: SlugSource, front_position_m: f64, length_m: f64, cell: &Cell) -> SlugUnit {
    let tail_position_m = front_position_m - length_m;
    let slug_holdup = (1.0 / (1.0 + (cell.u_m.abs() / 8.66).powf(1.39))).clamp(0.5, 0.98);
    let slug_liquid_volume_m3 = slug_holdup * cell.area_m2 * length_m;
    SlugUnit {
        id,
        source,
        front_position_m,
        tail_position_m,
        slug_length_m: length_m,
        bubble_length_m: 0.0,
        diameter_m: cell.diameter_m,
        area_m2: cell.area_m2,
        inclination_rad: cell.inclination_rad,
        front_velocity_ms: cell.u_m,
        tail_velocity_ms: cell.u_m,
        bubble_nose_velocity_ms: cell.u_m,
        slug_liquid_velocity_ms: cell.u_l,
        film_velocity_ms: cell.u_l,
        slug_holdup,
        film_holdup: cell.alpha_l,
        slug_liquid_volume_m3,
        film_liquid_volume_m3: 0.0,
        slug_liquid_mass_kg: slug_liquid_volume_m3 * cell.rho_l,
        pickup_rate_kg_s: 0.0,
        shedding_rate_kg_s: 0.0,
        net_mass_rate_kg_s: 0.0,
        growing: true,
        decaying: false,
        terrain_induced: matches!(source, SlugSource::Terrain),
        has_exited: false,
        age_s: 0.0,
        distance_travelled_m: 0.0,
        wake_coefficient: 1.0,
        distance_to_preceding_m: f64::INFINITY,
    }
}
