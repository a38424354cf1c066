//! One-shot world initialization: partition the fleet, place the
//! airports, build the shared state.

use std::sync::Arc;

use anyhow::{bail, Result};
use rand::Rng;
use tracing::info;

use tcas_core::placement::{fleet_partition, generate_airport_sites};
use tcas_core::{Aircraft, TcasCapability};

use crate::airport::Airport;
use crate::config::Config;
use crate::state::SimulationState;

/// Build the simulation world for a fleet of `plane_count` aircraft.
///
/// The fleet is partitioned into airports by the tiered draw, every
/// airport gets a runway budget in [1, 3], and each aircraft draws its
/// TCAS capability at creation. Fails if the placement sampler cannot
/// separate all airports.
pub fn initialize_world(
    plane_count: usize,
    config: &Config,
    rng: &mut impl Rng,
) -> Result<SimulationState> {
    if plane_count < 2 {
        bail!("a simulation needs at least 2 planes, got {plane_count}");
    }

    let mut allotments = Vec::new();
    let mut assigned = 0;
    while assigned < plane_count {
        let allotment = fleet_partition(plane_count, assigned, rng);
        allotments.push(allotment);
        assigned += allotment;
    }

    let sites = generate_airport_sites(allotments.len(), rng);
    if sites.len() < allotments.len() {
        bail!(
            "could not place {} airports with the required separation (placed {})",
            allotments.len(),
            sites.len()
        );
    }

    let mut airports = Vec::with_capacity(allotments.len());
    let mut plane_counter = 0;
    for (index, (allotment, site)) in allotments.iter().zip(sites).enumerate() {
        let mut parked = Vec::with_capacity(*allotment);
        for _ in 0..*allotment {
            plane_counter += 1;
            let tcas = if rng.gen::<f64>() < config.rules.faulty_tcas_ratio {
                TcasCapability::Faulty
            } else {
                TcasCapability::Perfect
            };
            parked.push(Aircraft::new(
                plane_counter,
                config.rules.cruise_speed_mps,
                tcas,
            ));
        }
        airports.push(Arc::new(Airport::new(
            index + 1,
            site,
            rng.gen_range(1..=3),
            parked,
        )));
    }

    info!(
        "Initialized: {} airports, {} planes distributed among airports.",
        airports.len(),
        plane_count
    );

    Ok(SimulationState::new(airports, config.different_altitudes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn fleet_totals_match_and_serials_are_unique() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(17);
        let state = initialize_world(37, &config, &mut rng).expect("init should succeed");

        let mut serials = HashSet::new();
        let mut total = 0;
        for airport in state.airports() {
            assert!((1..=3).contains(&airport.runway_budget));
            assert_eq!(airport.runways_in_use(), 0);
            for plane in airport.parked_snapshot() {
                assert!(!plane.in_flight);
                assert!(plane.flight_log.is_empty());
                assert!(serials.insert(plane.serial.clone()), "duplicate serial");
                total += 1;
            }
            assert_eq!(airport.plane_allotment, airport.parked_count());
        }
        assert_eq!(total, 37);
        assert_eq!(state.flying_count(), 0);
    }

    #[test]
    fn small_fleets_are_rejected() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(initialize_world(1, &config, &mut rng).is_err());
    }

    #[test]
    fn airports_are_separated_and_distinct() {
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(23);
        let state = initialize_world(120, &config, &mut rng).expect("init should succeed");

        let airports = state.airports();
        assert!(airports.len() >= 2);
        let mut serials = HashSet::new();
        for (i, a) in airports.iter().enumerate() {
            assert!(serials.insert(a.serial.clone()));
            for b in &airports[i + 1..] {
                assert!(a.location.distance(b.location) >= 50.0);
            }
        }
    }
}
