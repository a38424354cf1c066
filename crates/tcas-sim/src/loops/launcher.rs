//! Per-airport launch task.
//!
//! Each airport runs one of these: sleep a random launch delay, pick the
//! head of the parked list, attempt a takeoff, repeat until cancelled.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tcas_core::SimulationRules;

use crate::airport::{Airport, TakeoffError};
use crate::state::SimulationState;
use crate::timing::sleep_unless_cancelled;

pub async fn run_launcher(
    airport: Arc<Airport>,
    state: Arc<SimulationState>,
    rules: SimulationRules,
    cancel: CancellationToken,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let min_ms = rules.launch_interval_min.as_millis() as u64;
    let max_ms = (rules.launch_interval_max.as_millis() as u64).max(min_ms);

    loop {
        if cancel.is_cancelled() || !state.is_running() {
            break;
        }

        let delay = Duration::from_millis(rng.gen_range(min_ms..=max_ms));
        if !sleep_unless_cancelled(delay, &cancel).await {
            break;
        }

        let Some(serial) = airport.next_departure_serial() else {
            continue;
        };

        match airport
            .take_off(&serial, &state, &rules, &cancel, &mut rng)
            .await
        {
            Ok(_) => {}
            Err(TakeoffError::Cancelled { .. }) => break,
            Err(err) => warn!("error taking off from {}: {}", airport.serial, err),
        }
    }

    debug!("airport {} launch operations stopped", airport.serial);
}
