//! Conflict prediction for departing flights.
//!
//! Runs once per takeoff against a snapshot of the airborne traffic and
//! produces the engagements the new flight is predicted to have. The scan
//! is pure: the random source is injected so outcomes are reproducible,
//! and the per-pair assessments are returned for the caller to log.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::{Aircraft, Engagement, Flight, FlightStatus, TcasCapability};
use crate::serial::{serial_number, SerialKind};

/// Maximum closest-approach distance (meters) at which two flights are
/// considered to be on a collision course.
pub const COLLISION_THRESHOLD_M: f64 = 5.0;

/// Probability that a predicted encounter ends in a crash, keyed to the
/// two aircraft's TCAS capabilities.
pub fn crash_probability(a: TcasCapability, b: TcasCapability) -> f64 {
    match (a, b) {
        (TcasCapability::Perfect, TcasCapability::Perfect) => 0.0,
        (TcasCapability::Faulty, TcasCapability::Faulty) => 0.5,
        _ => 0.25,
    }
}

/// What the other aircraft is doing at the predicted closest-approach
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficDisposition {
    /// Past its scheduled arrival by then.
    LandedOrLanding,
    /// Mid-flight but already cleared to land.
    AboutToLand,
    InTransit,
}

/// Classify a flight's disposition at a point in time.
pub fn disposition_at(flight: &Flight, when: DateTime<Utc>) -> TrafficDisposition {
    if when > flight.scheduled_arrival_time {
        return TrafficDisposition::LandedOrLanding;
    }
    if when > flight.takeoff_time
        && when < flight.scheduled_arrival_time
        && flight.status == FlightStatus::AboutToLand
    {
        return TrafficDisposition::AboutToLand;
    }
    TrafficDisposition::InTransit
}

/// Why a pair was cleared without an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    OtherLandedOrLanding,
    OtherAboutToLand,
    DifferentAltitude,
    SeparationHeld,
}

impl ClearReason {
    pub fn describe(self) -> &'static str {
        match self {
            ClearReason::OtherLandedOrLanding => "other plane landed or still landing",
            ClearReason::OtherAboutToLand => "other plane about to land",
            ClearReason::DifferentAltitude => "different cruising altitudes",
            ClearReason::SeparationHeld => "separation above the collision threshold",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    Cleared(ClearReason),
    Engaged { will_crash: bool },
}

/// One airborne aircraft checked against the departing flight.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub other_serial: String,
    pub other_flight_id: String,
    pub closest_time: DateTime<Utc>,
    pub distance_m: f64,
    pub outcome: AssessmentOutcome,
}

/// Result of a takeoff-time conflict scan.
#[derive(Debug, Clone, Default)]
pub struct ConflictScan {
    /// Every pair that was examined, in snapshot order.
    pub assessments: Vec<Assessment>,
    /// Engagements to watch, ascending by time of engagement.
    pub engagements: Vec<Engagement>,
}

/// Scan the airborne snapshot for predicted conflicts with `flight`.
///
/// `flight` is the departing aircraft's new flight, not yet appended to
/// the in-flight list; `own` is the departing aircraft itself. Each
/// predicted encounter below `collision_threshold_m` draws its outcome
/// once from `rng`.
pub fn predict_engagements(
    flight: &Flight,
    own: &Aircraft,
    airborne: &[Aircraft],
    collision_threshold_m: f64,
    rng: &mut impl Rng,
) -> ConflictScan {
    let mut scan = ConflictScan::default();

    for other in airborne {
        if other.serial == own.serial || !other.in_flight {
            continue;
        }
        let Some(other_flight) = other.current_flight() else {
            continue;
        };

        let (closest_time, distance_m) = flight.closest_approach(other_flight);
        let disposition = disposition_at(other_flight, closest_time);

        let cleared = match disposition {
            TrafficDisposition::LandedOrLanding => Some(ClearReason::OtherLandedOrLanding),
            TrafficDisposition::AboutToLand => Some(ClearReason::OtherAboutToLand),
            TrafficDisposition::InTransit => {
                if other_flight.cruising_altitude_m != flight.cruising_altitude_m {
                    Some(ClearReason::DifferentAltitude)
                } else if distance_m >= collision_threshold_m {
                    Some(ClearReason::SeparationHeld)
                } else {
                    None
                }
            }
        };

        if let Some(reason) = cleared {
            scan.assessments.push(Assessment {
                other_serial: other.serial.clone(),
                other_flight_id: other_flight.id.clone(),
                closest_time,
                distance_m,
                outcome: AssessmentOutcome::Cleared(reason),
            });
            continue;
        }

        let probability = crash_probability(own.tcas, other.tcas);
        let will_crash = probability > 0.0 && rng.gen::<f64>() < probability;

        // Advance the suffix per emission; the engagement history alone
        // would hand two conflicts from one scan the same ID.
        let count = own.engagement_history.len() + scan.engagements.len() + 1;
        scan.engagements.push(Engagement {
            id: format!("{}{}", own.serial, serial_number(count, SerialKind::Engagement)),
            flight_id: flight.id.clone(),
            aircraft_serial: own.serial.clone(),
            other_serial: other.serial.clone(),
            time_of_engagement: closest_time,
            will_crash,
            warning_triggered: false,
        });
        scan.assessments.push(Assessment {
            other_serial: other.serial.clone(),
            other_flight_id: other_flight.id.clone(),
            closest_time,
            distance_m,
            outcome: AssessmentOutcome::Engaged { will_crash },
        });
    }

    scan.engagements.sort_by_key(|e| e.time_of_engagement);
    scan
}
