//! Shared simulation state.
//!
//! One master lock guards the in-flight list and the global run flags;
//! each airport carries its own lock for its parked list and runway state.
//! The two are never held at the same time: callers snapshot under one
//! lock, drop it, then operate under the other. Aircraft leave this store
//! by value; persistent mutations re-locate the canonical entry by serial.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tcas_core::{Aircraft, Coordinate, Engagement};

use crate::airport::Airport;

#[derive(Default)]
struct Shared {
    planes_in_flight: Vec<Aircraft>,
    sim_running: bool,
    sim_ended: Option<DateTime<Utc>>,
    different_altitudes: bool,
}

/// The single shared object owning all airports and all airborne aircraft.
pub struct SimulationState {
    airports: Vec<Arc<Airport>>,
    shared: Mutex<Shared>,
}

/// Work items the monitor extracted from one pass over the in-flight list.
#[derive(Default)]
pub struct MonitorSnapshot {
    /// Aircraft whose active flight is due (scheduled arrival ≤ now).
    pub due_to_land: Vec<Aircraft>,
    /// Unfired engagements whose advisory instant has been reached,
    /// paired with their owning aircraft.
    pub due_to_warn: Vec<(Aircraft, Engagement)>,
}

impl SimulationState {
    pub fn new(airports: Vec<Arc<Airport>>, different_altitudes: bool) -> Self {
        Self {
            airports,
            shared: Mutex::new(Shared {
                different_altitudes,
                ..Shared::default()
            }),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn airports(&self) -> &[Arc<Airport>] {
        &self.airports
    }

    /// Find the airport whose pad matches `location` within the
    /// coordinate epsilon.
    pub fn airport_at(&self, location: Coordinate) -> Option<&Arc<Airport>> {
        self.airports
            .iter()
            .find(|airport| airport.location.approx_eq(location))
    }

    pub fn is_running(&self) -> bool {
        self.shared().sim_running
    }

    pub fn set_running(&self, running: bool) {
        self.shared().sim_running = running;
    }

    /// Mark the start of a run: running, with no end timestamp.
    pub fn begin_run(&self) {
        let mut shared = self.shared();
        shared.sim_running = true;
        shared.sim_ended = None;
    }

    /// Mark the end of a run and stamp when it happened.
    pub fn finish_run(&self) {
        let mut shared = self.shared();
        shared.sim_running = false;
        shared.sim_ended = Some(Utc::now());
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.shared().sim_ended
    }

    pub fn different_altitudes(&self) -> bool {
        self.shared().different_altitudes
    }

    pub fn flying_count(&self) -> usize {
        self.shared().planes_in_flight.len()
    }

    /// Value snapshot of every airborne aircraft.
    pub fn flying_snapshot(&self) -> Vec<Aircraft> {
        self.shared().planes_in_flight.clone()
    }

    pub fn push_flying(&self, aircraft: Aircraft) {
        self.shared().planes_in_flight.push(aircraft);
    }

    /// Remove and return the canonical in-flight entry for `serial`.
    pub fn take_flying(&self, serial: &str) -> Option<Aircraft> {
        let mut shared = self.shared();
        let index = shared
            .planes_in_flight
            .iter()
            .position(|plane| plane.serial == serial)?;
        Some(shared.planes_in_flight.remove(index))
    }

    pub fn find_flying(&self, serial: &str) -> Option<Aircraft> {
        self.shared()
            .planes_in_flight
            .iter()
            .find(|plane| plane.serial == serial)
            .cloned()
    }

    /// Apply a mutation to the canonical in-flight entry for `serial`.
    /// Returns false if the aircraft is no longer airborne.
    pub fn update_flying(&self, serial: &str, mutate: impl FnOnce(&mut Aircraft)) -> bool {
        let mut shared = self.shared();
        match shared
            .planes_in_flight
            .iter_mut()
            .find(|plane| plane.serial == serial)
        {
            Some(plane) => {
                mutate(plane);
                true
            }
            None => false,
        }
    }

    /// One-lock sweep of the in-flight list for the monitor: aircraft due
    /// to land, and engagements whose advisory instant (`time_of_engagement
    /// − advisory_lead`) has been reached but whose warning has not fired.
    pub fn monitor_snapshot(&self, now: DateTime<Utc>, advisory_lead: Duration) -> MonitorSnapshot {
        let shared = self.shared();
        let mut snapshot = MonitorSnapshot::default();

        for plane in &shared.planes_in_flight {
            if let Some(flight) = plane.current_flight() {
                if flight.scheduled_arrival_time <= now {
                    snapshot.due_to_land.push(plane.clone());
                }
            }
            for engagement in &plane.pending_engagements {
                if !engagement.warning_triggered
                    && engagement.time_of_engagement - advisory_lead <= now
                {
                    snapshot
                        .due_to_warn
                        .push((plane.clone(), engagement.clone()));
                }
            }
        }

        // Advisories fire in ascending engagement time within a tick.
        snapshot
            .due_to_warn
            .sort_by_key(|(_, engagement)| engagement.time_of_engagement);

        snapshot
    }

    /// Copy a fired engagement into the history of both participants.
    pub fn record_engagement_history(&self, engagement: &Engagement) {
        let mut shared = self.shared();
        for plane in &mut shared.planes_in_flight {
            if plane.serial == engagement.aircraft_serial
                || plane.serial == engagement.other_serial
            {
                plane.engagement_history.push(engagement.clone());
            }
        }
    }

    /// Latch the warning on the canonical copy of an engagement so later
    /// monitor ticks do not re-fire it.
    pub fn mark_warning_triggered(&self, engagement: &Engagement) {
        let mut shared = self.shared();
        if let Some(plane) = shared
            .planes_in_flight
            .iter_mut()
            .find(|plane| plane.serial == engagement.aircraft_serial)
        {
            if let Some(pending) = plane
                .pending_engagements
                .iter_mut()
                .find(|pending| pending.id == engagement.id)
            {
                pending.warning_triggered = true;
            }
        }
    }
}
