//! Entity model: aircraft, flights and TCAS engagements.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serial::{serial_number, SerialKind};
use crate::spatial::{closest_points_between_segments, Coordinate};

/// Whether an aircraft's collision-avoidance equipment works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TcasCapability {
    /// Equipment resolves every predicted encounter.
    Perfect,
    /// Equipment may fail to resolve an encounter.
    Faulty,
}

impl TcasCapability {
    /// Human-readable label used by the state reports.
    pub fn describe(self) -> &'static str {
        match self {
            TcasCapability::Perfect => "Working Perfectly",
            TcasCapability::Faulty => "Faulty",
        }
    }
}

/// Lifecycle of a single flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    InTransit,
    AboutToLand,
    Landed,
}

/// Straight-line route from a departure pad to a destination pad.
///
/// Both endpoints sit at ground level; the cruising altitude is carried
/// separately on the flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightPath {
    pub departure: Coordinate,
    pub destination: Coordinate,
}

impl FlightPath {
    pub fn length_m(&self) -> f64 {
        self.departure.distance(self.destination)
    }
}

/// A single flight from one airport to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub path: FlightPath,
    pub takeoff_time: DateTime<Utc>,
    pub scheduled_arrival_time: DateTime<Utc>,
    /// Set once the aircraft has actually landed.
    pub actual_landing_time: Option<DateTime<Utc>>,
    pub cruising_altitude_m: f64,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub status: FlightStatus,
}

/// Queried time falls outside the flight's takeoff..landing window.
#[derive(Debug, Error)]
#[error("time {time} is outside flight {flight_id} duration")]
pub struct OutsideFlightWindow {
    pub flight_id: String,
    pub time: DateTime<Utc>,
}

impl Flight {
    /// Closest approach between this flight's path and another's.
    ///
    /// Returns the time at which this flight reaches its closest-approach
    /// point, and the distance between the two closest points. The time is
    /// expressed on *this* flight's timeline only; callers filter by the
    /// other aircraft's status at that instant.
    pub fn closest_approach(&self, other: &Flight) -> (DateTime<Utc>, f64) {
        let (own_closest, other_closest) = closest_points_between_segments(
            self.path.departure,
            self.path.destination,
            other.path.departure,
            other.path.destination,
        );

        let total_distance = self.path.length_m();
        let fraction = if total_distance > 0.0 {
            self.path.departure.distance(own_closest) / total_distance
        } else {
            0.0
        };

        let total = self.scheduled_arrival_time - self.takeoff_time;
        let offset = Duration::milliseconds((total.num_milliseconds() as f64 * fraction) as i64);

        (self.takeoff_time + offset, own_closest.distance(other_closest))
    }

    /// Interpolated position along the path at cruising altitude.
    pub fn position_at(&self, time: DateTime<Utc>) -> Result<Coordinate, OutsideFlightWindow> {
        if time < self.takeoff_time || time > self.scheduled_arrival_time {
            return Err(OutsideFlightWindow {
                flight_id: self.id.clone(),
                time,
            });
        }

        let total = (self.scheduled_arrival_time - self.takeoff_time).num_milliseconds();
        let progress = if total > 0 {
            (time - self.takeoff_time).num_milliseconds() as f64 / total as f64
        } else {
            0.0
        };

        let along = self.path.departure + (self.path.destination - self.path.departure) * progress;
        Ok(Coordinate::new(along.x, along.y, self.cruising_altitude_m))
    }

    /// Human-readable completion figure for the state reports.
    pub fn progress(&self, sim_time: DateTime<Utc>) -> String {
        if sim_time > self.scheduled_arrival_time && self.status == FlightStatus::Landed {
            return "100% (Landed)".to_string();
        }
        if sim_time > self.scheduled_arrival_time && self.status == FlightStatus::AboutToLand {
            return "100% (About to land)".to_string();
        }
        if sim_time > self.takeoff_time && sim_time < self.scheduled_arrival_time {
            let total = (self.scheduled_arrival_time - self.takeoff_time).num_milliseconds();
            if total <= 0 {
                return "0% (Invalid flight duration)".to_string();
            }
            let elapsed = (sim_time - self.takeoff_time).num_milliseconds();
            let percent = elapsed as f64 / total as f64 * 100.0;
            return format!("{:.2}% (As at {})", percent, sim_time.format("%H:%M:%S"));
        }
        "0% (Plane about to take off or still taking off)".to_string()
    }
}

/// A recorded prediction that two flights will come within the collision
/// threshold of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: String,
    /// Flight of the engaging aircraft that produced the prediction.
    pub flight_id: String,
    pub aircraft_serial: String,
    pub other_serial: String,
    /// Predicted closest-approach time on the engaging flight's timeline.
    pub time_of_engagement: DateTime<Utc>,
    /// Outcome decided by a single draw when the prediction was made.
    pub will_crash: bool,
    /// Latched once the advisory has fired so it never fires twice.
    pub warning_triggered: bool,
}

/// An aircraft and its accumulated history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub serial: String,
    pub cruise_speed_mps: f64,
    pub in_flight: bool,
    pub tcas: TcasCapability,
    /// Every flight this aircraft has flown, newest last.
    pub flight_log: Vec<Flight>,
    /// Engagements predicted for the current flight, not yet resolved.
    pub pending_engagements: Vec<Engagement>,
    /// Engagements whose advisory fired, or that lapsed when the aircraft
    /// landed.
    pub engagement_history: Vec<Engagement>,
}

impl Aircraft {
    /// Create the `count`-th aircraft of the fleet (1-based).
    pub fn new(count: usize, cruise_speed_mps: f64, tcas: TcasCapability) -> Self {
        Self {
            serial: serial_number(count, SerialKind::Aircraft),
            cruise_speed_mps,
            in_flight: false,
            tcas,
            flight_log: Vec::new(),
            pending_engagements: Vec::new(),
            engagement_history: Vec::new(),
        }
    }

    /// The flight currently underway, while `in_flight` is set the last
    /// log entry.
    pub fn current_flight(&self) -> Option<&Flight> {
        self.flight_log.last()
    }

    pub fn current_flight_mut(&mut self) -> Option<&mut Flight> {
        self.flight_log.last_mut()
    }

    /// ID for this aircraft's next flight.
    pub fn next_flight_id(&self) -> String {
        format!(
            "{}{}",
            self.serial,
            serial_number(self.flight_log.len() + 1, SerialKind::Flight)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 19, 10, 0, 0).unwrap()
    }

    fn flight(
        dep: Coordinate,
        dst: Coordinate,
        takeoff: DateTime<Utc>,
        arrival: DateTime<Utc>,
    ) -> Flight {
        Flight {
            id: "P_A001F_A001".to_string(),
            path: FlightPath {
                departure: dep,
                destination: dst,
            },
            takeoff_time: takeoff,
            scheduled_arrival_time: arrival,
            actual_landing_time: None,
            cruising_altitude_m: 10_000.0,
            departure_airport: "AP_A001".to_string(),
            arrival_airport: "AP_A002".to_string(),
            status: FlightStatus::InTransit,
        }
    }

    #[test]
    fn closest_approach_direct_intersection() {
        let t0 = base_time();
        let f1 = flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 0.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );
        let f2 = flight(
            Coordinate::new(50.0, -50.0, 0.0),
            Coordinate::new(50.0, 50.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );

        let (when, dist) = f1.closest_approach(&f2);
        assert_eq!(when, t0 + Duration::minutes(5));
        assert!(dist.abs() < 1e-9);
    }

    #[test]
    fn closest_approach_parallel_paths() {
        let t0 = base_time();
        let f1 = flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 0.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );
        let f2 = flight(
            Coordinate::new(0.0, 10.0, 0.0),
            Coordinate::new(100.0, 10.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );

        let (when, dist) = f1.closest_approach(&f2);
        assert_eq!(when, t0);
        assert!((dist - 10.0).abs() < 1e-9);
    }

    #[test]
    fn position_interpolates_toward_the_destination() {
        // A historical revision interpolated away from the destination;
        // pin the corrected direction at the midpoint and endpoints.
        let t0 = base_time();
        let f = flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 40.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );

        let mid = f.position_at(t0 + Duration::minutes(5)).unwrap();
        assert!((mid.x - 50.0).abs() < 1e-9);
        assert!((mid.y - 20.0).abs() < 1e-9);
        assert!((mid.z - 10_000.0).abs() < 1e-9);

        let start = f.position_at(t0).unwrap();
        assert!((start.x - 0.0).abs() < 1e-9);
        let end = f.position_at(t0 + Duration::minutes(10)).unwrap();
        assert!((end.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn position_outside_window_is_an_error() {
        let t0 = base_time();
        let f = flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 0.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );
        assert!(f.position_at(t0 - Duration::seconds(1)).is_err());
        assert!(f.position_at(t0 + Duration::minutes(11)).is_err());
    }

    #[test]
    fn progress_reporting() {
        let t0 = base_time();
        let mut f = flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 0.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        );

        assert_eq!(
            f.progress(t0 - Duration::seconds(5)),
            "0% (Plane about to take off or still taking off)"
        );
        assert!(f
            .progress(t0 + Duration::minutes(5))
            .starts_with("50.00%"));

        f.status = FlightStatus::Landed;
        assert_eq!(f.progress(t0 + Duration::minutes(11)), "100% (Landed)");
        f.status = FlightStatus::AboutToLand;
        assert_eq!(
            f.progress(t0 + Duration::minutes(11)),
            "100% (About to land)"
        );
    }

    #[test]
    fn flight_ids_extend_the_aircraft_serial() {
        let mut plane = Aircraft::new(1, 0.1, TcasCapability::Perfect);
        assert_eq!(plane.serial, "P_A001");
        assert_eq!(plane.next_flight_id(), "P_A001F_A001");

        let t0 = base_time();
        plane.flight_log.push(flight(
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(100.0, 0.0, 0.0),
            t0,
            t0 + Duration::minutes(10),
        ));
        assert_eq!(plane.next_flight_id(), "P_A001F_A002");
    }
}
