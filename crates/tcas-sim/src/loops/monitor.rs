//! The flight monitor: landings and TCAS advisories.
//!
//! One task polls the in-flight list on a fixed period. Each tick it
//! snapshots the due work under the state lock, drops the lock, then
//! lands aircraft and fires advisories. Deferred resolutions (the crash /
//! averted outcome one advisory lead after the warning) live on an
//! explicit min-heap consumed by the same task, so nothing escapes the
//! run's cancellation scope.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tcas_core::{Engagement, SimulationRules};

use crate::airport::LandingError;
use crate::state::SimulationState;

/// A fired advisory waiting for its outcome instant.
#[derive(Debug, PartialEq, Eq)]
struct ScheduledResolution {
    due: DateTime<Utc>,
    engagement: Engagement,
}

impl Ord for ScheduledResolution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.engagement.id.cmp(&other.engagement.id))
    }
}

impl PartialOrd for ScheduledResolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub async fn run_monitor(
    state: Arc<SimulationState>,
    rules: SimulationRules,
    cancel: CancellationToken,
) {
    let mut ticker = interval(rules.monitor_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let advisory_lead = Duration::milliseconds(rules.advisory_lead.as_millis() as i64);
    let mut scheduled: BinaryHeap<Reverse<ScheduledResolution>> = BinaryHeap::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if !state.is_running() {
            break;
        }
        if !tick(&state, &rules, &cancel, advisory_lead, &mut scheduled).await {
            break;
        }
        fire_due_resolutions(&state, &cancel, &mut scheduled);
    }

    drain_scheduled(&state, &cancel, &mut scheduled).await;
    info!("Flight monitor stopped.");
}

/// One monitor pass. Returns false when cancellation interrupted the work.
async fn tick(
    state: &SimulationState,
    rules: &SimulationRules,
    cancel: &CancellationToken,
    advisory_lead: Duration,
    scheduled: &mut BinaryHeap<Reverse<ScheduledResolution>>,
) -> bool {
    let snapshot = state.monitor_snapshot(Utc::now(), advisory_lead);

    for plane in &snapshot.due_to_land {
        if cancel.is_cancelled() {
            return false;
        }
        let Some(flight) = plane.current_flight() else {
            continue;
        };

        match state.airport_at(flight.path.destination) {
            None => {
                error!(
                    "Monitor error: destination airport not found for plane {} (arrival coord: {})",
                    plane.serial, flight.path.destination
                );
            }
            Some(airport) => {
                let airport = airport.clone();
                match airport.land(plane, state, rules, cancel).await {
                    Ok(()) => {}
                    Err(LandingError::Cancelled { .. }) => return false,
                    // The aircraft already left the list (raced with an
                    // earlier attempt); drop it and move on.
                    Err(err @ LandingError::NotInFlight { .. }) => {
                        debug!("landing discarded: {}", err)
                    }
                    // Anything else is retried on a later tick.
                    Err(err) => warn!("landing failed, will retry: {}", err),
                }
            }
        }
    }

    for (plane, engagement) in &snapshot.due_to_warn {
        if cancel.is_cancelled() {
            return false;
        }
        if state.find_flying(&engagement.other_serial).is_none() {
            // The other participant already landed; nothing to warn about.
            continue;
        }

        state.record_engagement_history(engagement);
        warn!(
            target: "tcas",
            "TCAS: CRASH IMMINENT! Plane {} and Plane {} about to collide! ENGAGE EVASIVE MANEUVER NOW!!!",
            plane.serial, engagement.other_serial
        );
        scheduled.push(Reverse(ScheduledResolution {
            due: engagement.time_of_engagement,
            engagement: engagement.clone(),
        }));
        state.mark_warning_triggered(engagement);
    }

    true
}

fn fire_due_resolutions(
    state: &SimulationState,
    cancel: &CancellationToken,
    scheduled: &mut BinaryHeap<Reverse<ScheduledResolution>>,
) {
    let now = Utc::now();
    while scheduled
        .peek()
        .is_some_and(|Reverse(next)| next.due <= now)
    {
        if let Some(Reverse(resolution)) = scheduled.pop() {
            resolve(state, cancel, &resolution.engagement);
        }
    }
}

/// The outcome instant of a fired advisory has arrived.
fn resolve(state: &SimulationState, cancel: &CancellationToken, engagement: &Engagement) {
    if engagement.will_crash {
        error!(
            target: "tcas",
            "DISASTER OCCURRED!: Plane {} and Plane {} CRASHED",
            engagement.aircraft_serial, engagement.other_serial
        );
        if state.is_running() {
            state.set_running(false);
            cancel.cancel();
        } else {
            debug!("crash resolution after shutdown; stop already in progress");
        }
    } else {
        warn!(
            target: "tcas",
            "DISASTER AVERTED! Plane {} and Plane {} SUCCESSFULLY ENGAGED EVASIVE MANEUVER",
            engagement.aircraft_serial, engagement.other_serial
        );
    }
}

/// Flush advisories whose outcome has not fired yet. Each entry is at
/// most one advisory lead in the future, so the drain is bounded.
async fn drain_scheduled(
    state: &SimulationState,
    cancel: &CancellationToken,
    scheduled: &mut BinaryHeap<Reverse<ScheduledResolution>>,
) {
    while let Some(Reverse(next)) = scheduled.pop() {
        let now = Utc::now();
        if next.due > now {
            if let Ok(wait) = (next.due - now).to_std() {
                sleep(wait).await;
            }
        }
        resolve(state, cancel, &next.engagement);
    }
}
