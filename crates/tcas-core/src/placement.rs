//! One-shot map seeding: airport placement and fleet partitioning.

use rand::Rng;
use tracing::warn;

use crate::spatial::Coordinate;

/// Minimum distance between any two airports, in simulation units.
pub const MIN_AIRPORT_SEPARATION: f64 = 50.0;

// Rejection-sampling cap per site before giving up on the map.
const MAX_ATTEMPTS_PER_SITE: usize = 5000;

/// Generate ground-level sites for `count` airports.
///
/// The first site lands near the origin. Sites 2–4 are sampled 50–100
/// units from a randomly chosen existing site to form a compact initial
/// cluster; later sites are sampled 50–150 units from the site farthest
/// from the origin so the map spreads instead of clumping. Every accepted
/// site is at least [`MIN_AIRPORT_SEPARATION`] from all others.
///
/// May return fewer than `count` sites if rejection sampling exhausts its
/// attempt budget; a warning is logged when that happens.
pub fn generate_airport_sites(count: usize, rng: &mut impl Rng) -> Vec<Coordinate> {
    let mut sites: Vec<Coordinate> = Vec::with_capacity(count);

    for index in 0..count {
        let mut placed = false;

        for _ in 0..MAX_ATTEMPTS_PER_SITE {
            let candidate = if sites.is_empty() {
                Coordinate::new(rng.gen::<f64>() * 10.0 - 5.0, rng.gen::<f64>() * 10.0 - 5.0, 0.0)
            } else {
                let reference = if sites.len() < 4 {
                    sites[rng.gen_range(0..sites.len())]
                } else {
                    farthest_from_origin(&sites)
                };
                let max_reach = if sites.len() < 4 { 100.0 } else { 150.0 };
                let angle = rng.gen::<f64>() * std::f64::consts::TAU;
                let reach =
                    rng.gen::<f64>() * (max_reach - MIN_AIRPORT_SEPARATION) + MIN_AIRPORT_SEPARATION;
                Coordinate::new(
                    reference.x + reach * angle.cos(),
                    reference.y + reach * angle.sin(),
                    0.0,
                )
            };

            if sites
                .iter()
                .all(|existing| existing.distance(candidate) >= MIN_AIRPORT_SEPARATION)
            {
                sites.push(candidate);
                placed = true;
                break;
            }
        }

        if !placed {
            warn!(
                "could not find a valid coordinate after {} attempts for airport site {}; stopping map generation",
                MAX_ATTEMPTS_PER_SITE,
                index + 1
            );
            break;
        }
    }

    sites
}

fn farthest_from_origin(sites: &[Coordinate]) -> Coordinate {
    let origin = Coordinate::default();
    sites
        .iter()
        .copied()
        .max_by(|a, b| {
            a.distance(origin)
                .partial_cmp(&b.distance(origin))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(origin)
}

/// How many aircraft the next airport should be allotted.
///
/// The draw is tiered by fleet size, and the final airport absorbs the
/// exact remainder so the totals always match.
pub fn fleet_partition(total_planes: usize, already_created: usize, rng: &mut impl Rng) -> usize {
    let remaining = total_planes.saturating_sub(already_created);
    if total_planes < 20 {
        if remaining <= 3 {
            remaining
        } else {
            rng.gen_range(1..=2)
        }
    } else if total_planes < 100 {
        if remaining <= 6 {
            remaining
        } else {
            rng.gen_range(1..=5)
        }
    } else if remaining <= 30 {
        remaining
    } else {
        rng.gen_range(10..=29)
    }
}
