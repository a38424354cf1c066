//! Airports and the runway arbitration protocol.
//!
//! Each airport serializes its own takeoffs and landings through one lock
//! over `{parked, runways_in_use, receiving_plane}`. Landings have
//! priority: a pending takeoff re-checks the receiving flag on every
//! retry, while a landing waits for the runway count to reach zero before
//! claiming. Physical durations are slept without holding the lock so the
//! remaining runways stay independently usable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tcas_core::conflict::AssessmentOutcome;
use tcas_core::rules::{SimulationRules, CRUISING_ALTITUDES_M};
use tcas_core::serial::{serial_number, SerialKind};
use tcas_core::spatial::Coordinate;
use tcas_core::{predict_engagements, Aircraft, ConflictScan, Flight, FlightPath, FlightStatus};

use crate::state::SimulationState;
use crate::timing::sleep_unless_cancelled;

#[derive(Debug, Error)]
pub enum TakeoffError {
    #[error("takeoff of plane {serial} abandoned: simulation shutting down")]
    Cancelled { serial: String },
    #[error("plane {serial} not found at airport {airport} to initiate takeoff")]
    PlaneMissing { serial: String, airport: String },
    #[error("plane {serial} has an invalid cruise speed ({speed:.2}), cannot calculate flight duration")]
    InvalidCruiseSpeed { serial: String, speed: f64 },
    #[error("no other airports available to serve as a destination")]
    NoDestination,
}

#[derive(Debug, Error)]
pub enum LandingError {
    #[error("landing of plane {serial} abandoned: simulation shutting down")]
    Cancelled { serial: String },
    #[error("plane {serial} has no flight history; cannot initiate landing")]
    NoFlightHistory { serial: String },
    #[error("plane {serial} attempting to land at airport {airport} {location}, but its destination for flight {flight_id} is {destination}")]
    WrongAirport {
        serial: String,
        airport: String,
        location: Coordinate,
        flight_id: String,
        destination: Coordinate,
    },
    #[error("plane {serial} not found in the in-flight list; cannot complete landing at airport {airport}")]
    NotInFlight { serial: String, airport: String },
}

struct Apron {
    parked: Vec<Aircraft>,
    runways_in_use: usize,
    receiving_plane: bool,
}

/// An airport: a pad location, a runway budget and the aircraft parked on
/// its apron.
pub struct Airport {
    pub serial: String,
    pub location: Coordinate,
    /// Number of aircraft allotted at initialization.
    pub plane_allotment: usize,
    /// How many runways may be in use at once, in [1, 3].
    pub runway_budget: usize,
    apron: Mutex<Apron>,
}

impl Airport {
    /// Create the `count`-th airport (1-based) with its initial fleet.
    pub fn new(
        count: usize,
        location: Coordinate,
        runway_budget: usize,
        parked: Vec<Aircraft>,
    ) -> Self {
        Self {
            serial: serial_number(count, SerialKind::Airport),
            location,
            plane_allotment: parked.len(),
            runway_budget,
            apron: Mutex::new(Apron {
                parked,
                runways_in_use: 0,
                receiving_plane: false,
            }),
        }
    }

    fn apron(&self) -> MutexGuard<'_, Apron> {
        self.apron.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn parked_snapshot(&self) -> Vec<Aircraft> {
        self.apron().parked.clone()
    }

    pub fn parked_count(&self) -> usize {
        self.apron().parked.len()
    }

    pub fn runways_in_use(&self) -> usize {
        self.apron().runways_in_use
    }

    pub fn is_receiving(&self) -> bool {
        self.apron().receiving_plane
    }

    /// Serial of the next aircraft in line for departure, if any.
    pub fn next_departure_serial(&self) -> Option<String> {
        self.apron().parked.first().map(|plane| plane.serial.clone())
    }

    /// Launch the parked aircraft `serial` toward a random destination.
    ///
    /// Waits out any inbound landing, claims a runway (backing off one
    /// takeoff duration while the budget is exhausted), runs the physical
    /// takeoff, then commits the departure: the aircraft leaves the parked
    /// list, a flight is built, the TCAS predictor scans the airborne
    /// snapshot, and the aircraft joins the in-flight list.
    pub async fn take_off<R: Rng>(
        &self,
        serial: &str,
        state: &SimulationState,
        rules: &SimulationRules,
        cancel: &CancellationToken,
        rng: &mut R,
    ) -> Result<Flight, TakeoffError> {
        info!(
            "Plane {} is attempting to takeoff from Airport {} {}",
            serial, self.serial, self.location
        );

        // An inbound landing has priority; check the flag again after
        // every wait.
        while self.is_receiving() && state.is_running() {
            info!(
                "airport {} is currently receiving a landing plane; plane {} cannot takeoff until all landing operations are over",
                self.serial, serial
            );
            if !sleep_unless_cancelled(rules.landing_duration, cancel).await {
                return Err(TakeoffError::Cancelled {
                    serial: serial.to_string(),
                });
            }
        }

        // Claim a runway, backing off while the budget is exhausted.
        loop {
            if !state.is_running() || cancel.is_cancelled() {
                return Err(TakeoffError::Cancelled {
                    serial: serial.to_string(),
                });
            }
            let in_use = {
                let mut apron = self.apron();
                if apron.runways_in_use < self.runway_budget {
                    apron.runways_in_use += 1;
                    break;
                }
                apron.runways_in_use
            };
            info!(
                "airport {} has no available runways for takeoff (all {} of {} runway(s) in use)",
                self.serial, in_use, self.runway_budget
            );
            if !sleep_unless_cancelled(rules.takeoff_duration, cancel).await {
                return Err(TakeoffError::Cancelled {
                    serial: serial.to_string(),
                });
            }
        }

        info!(
            "Plane {} is taking off from Airport {} {}",
            serial, self.serial, self.location
        );

        // Physical takeoff. The lock is not held, so other runways stay
        // usable; once started the operation runs to completion.
        sleep(rules.takeoff_duration).await;

        {
            let mut apron = self.apron();
            apron.runways_in_use -= 1;
        }

        let destination = self.pick_destination(state.airports(), rng)?;

        let mut plane = {
            let mut apron = self.apron();
            let index = apron
                .parked
                .iter()
                .position(|plane| plane.serial == serial)
                .ok_or_else(|| TakeoffError::PlaneMissing {
                    serial: serial.to_string(),
                    airport: self.serial.clone(),
                })?;
            if apron.parked[index].cruise_speed_mps <= 0.0 {
                return Err(TakeoffError::InvalidCruiseSpeed {
                    serial: serial.to_string(),
                    speed: apron.parked[index].cruise_speed_mps,
                });
            }
            apron.parked.remove(index)
        };

        let distance = self.location.distance(destination.location);
        let flight_time = Duration::milliseconds((distance / plane.cruise_speed_mps * 1000.0) as i64);
        let takeoff_time = Utc::now();

        let cruising_altitude_m = if state.different_altitudes() {
            CRUISING_ALTITUDES_M[rng.gen_range(0..CRUISING_ALTITUDES_M.len())]
        } else {
            CRUISING_ALTITUDES_M[0]
        };

        let flight = Flight {
            id: plane.next_flight_id(),
            path: FlightPath {
                departure: self.location,
                destination: destination.location,
            },
            takeoff_time,
            scheduled_arrival_time: takeoff_time + flight_time,
            actual_landing_time: None,
            cruising_altitude_m,
            departure_airport: self.serial.clone(),
            arrival_airport: destination.serial.clone(),
            status: FlightStatus::InTransit,
        };

        plane.in_flight = true;
        plane.flight_log.push(flight.clone());

        // Predict conflicts against the traffic airborne right now; the
        // new flight itself is appended afterwards.
        let airborne = state.flying_snapshot();
        let scan = predict_engagements(
            &flight,
            &plane,
            &airborne,
            rules.collision_threshold_m,
            rng,
        );
        log_conflict_scan(&plane, &scan);
        plane.pending_engagements = scan.engagements;

        state.push_flying(plane);

        info!(
            "Plane {} took off from Airport {} {}, heading to Airport {} {}. Estimated landing at {}.",
            serial,
            self.serial,
            self.location,
            destination.serial,
            destination.location,
            flight.scheduled_arrival_time.format("%H:%M:%S")
        );

        Ok(flight)
    }

    fn pick_destination<'a, R: Rng>(
        &self,
        airports: &'a [Arc<Airport>],
        rng: &mut R,
    ) -> Result<&'a Arc<Airport>, TakeoffError> {
        let eligible: Vec<&Arc<Airport>> = airports
            .iter()
            .filter(|airport| airport.serial != self.serial)
            .collect();
        if eligible.is_empty() {
            return Err(TakeoffError::NoDestination);
        }
        Ok(eligible[rng.gen_range(0..eligible.len())])
    }

    /// Land an airborne aircraft here.
    ///
    /// A takeoff must clear the airspace first: the landing waits for the
    /// runway count to reach zero, then claims a runway and raises the
    /// receiving flag for the duration of the physical landing. On
    /// success the aircraft leaves the in-flight list, its flight is
    /// stamped and it joins this airport's apron.
    pub async fn land(
        &self,
        aircraft: &Aircraft,
        state: &SimulationState,
        rules: &SimulationRules,
        cancel: &CancellationToken,
    ) -> Result<(), LandingError> {
        info!(
            "Plane {} is attempting to land at Airport {} ({}).",
            aircraft.serial, self.serial, self.location
        );

        let current = aircraft
            .current_flight()
            .ok_or_else(|| LandingError::NoFlightHistory {
                serial: aircraft.serial.clone(),
            })?;
        if !self.location.approx_eq(current.path.destination) {
            return Err(LandingError::WrongAirport {
                serial: aircraft.serial.clone(),
                airport: self.serial.clone(),
                location: self.location,
                flight_id: current.id.clone(),
                destination: current.path.destination,
            });
        }

        // Wait for the airspace: no landing begins while a takeoff holds
        // a runway.
        loop {
            let in_use = self.runways_in_use();
            if in_use == 0 || !state.is_running() {
                break;
            }
            info!(
                "airport {} has {} runway(s) currently in use; plane {} cannot land until all runways are free",
                self.serial, in_use, aircraft.serial
            );
            if !sleep_unless_cancelled(rules.takeoff_duration, cancel).await {
                return Err(LandingError::Cancelled {
                    serial: aircraft.serial.clone(),
                });
            }
        }
        if !state.is_running() || cancel.is_cancelled() {
            return Err(LandingError::Cancelled {
                serial: aircraft.serial.clone(),
            });
        }

        {
            let mut apron = self.apron();
            apron.runways_in_use += 1;
            apron.receiving_plane = true;
        }

        // The approach is committed; reflect it on the canonical entry so
        // takeoff-time conflict scans see the aircraft as about to land.
        state.update_flying(&aircraft.serial, |plane| {
            if let Some(flight) = plane.current_flight_mut() {
                flight.status = FlightStatus::AboutToLand;
            }
        });

        info!(
            "Plane {} is now landing at Airport {} ({}).",
            aircraft.serial, self.serial, self.location
        );
        sleep(rules.landing_duration).await;

        let Some(mut plane) = state.take_flying(&aircraft.serial) else {
            // Raced with another landing of the same aircraft; release the
            // claim and report.
            let mut apron = self.apron();
            apron.runways_in_use -= 1;
            apron.receiving_plane = false;
            return Err(LandingError::NotInFlight {
                serial: aircraft.serial.clone(),
                airport: self.serial.clone(),
            });
        };

        plane.in_flight = false;
        if let Some(flight) = plane.current_flight_mut() {
            flight.status = FlightStatus::Landed;
            flight.actual_landing_time = Some(Utc::now());
        }
        // Engagements that never fired lapse into the history once the
        // aircraft is on the ground; fired ones are already there.
        let pending = std::mem::take(&mut plane.pending_engagements);
        plane
            .engagement_history
            .extend(pending.into_iter().filter(|e| !e.warning_triggered));

        {
            let mut apron = self.apron();
            apron.runways_in_use -= 1;
            apron.receiving_plane = false;
            apron.parked.push(plane);
        }

        info!(
            "Plane {} successfully landed at Airport {} ({}). It is now parked.",
            aircraft.serial, self.serial, self.location
        );

        Ok(())
    }
}

fn log_conflict_scan(plane: &Aircraft, scan: &ConflictScan) {
    info!(
        target: "tcas",
        "TCAS: Plane {} ({}) is checking for conflicts before takeoff.",
        plane.serial,
        plane.tcas.describe()
    );
    for assessment in &scan.assessments {
        match &assessment.outcome {
            AssessmentOutcome::Cleared(reason) => {
                info!(
                    target: "tcas",
                    "TCAS: Plane {} and Plane {} (flight {}) have closest approach {:.2} units at {}, but no worries: {}.",
                    plane.serial,
                    assessment.other_serial,
                    assessment.other_flight_id,
                    assessment.distance_m,
                    assessment.closest_time.format("%H:%M:%S"),
                    reason.describe()
                );
            }
            AssessmentOutcome::Engaged { will_crash } => {
                info!(
                    target: "tcas",
                    "TCAS ALERT: Potential collision detected between Plane {} and Plane {}. Closest approach: {:.2} units at {}.",
                    plane.serial,
                    assessment.other_serial,
                    assessment.distance_m,
                    assessment.closest_time.format("%H:%M:%S")
                );
                if !will_crash {
                    info!(
                        target: "tcas",
                        "TCAS: Collision between {} and {} will be averted by evasive maneuver.",
                        plane.serial, assessment.other_serial
                    );
                }
            }
        }
    }
}
