//! End-to-end concurrency scenarios.
//!
//! These run the real protocol and supervisor with millisecond physics:
//! the rules are configuration, so a takeoff lasting 50 ms exercises the
//! same arbitration as one lasting 5 s.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use tcas_core::{
    Aircraft, Coordinate, Engagement, Flight, FlightPath, FlightStatus, SimulationRules,
    TcasCapability,
};
use tcas_sim::airport::Airport;
use tcas_sim::state::SimulationState;
use tcas_sim::supervisor::SimulationRun;

fn quick_rules() -> SimulationRules {
    SimulationRules {
        takeoff_duration: Duration::from_millis(50),
        landing_duration: Duration::from_millis(70),
        launch_interval_min: Duration::from_millis(10),
        launch_interval_max: Duration::from_millis(20),
        monitor_interval: Duration::from_millis(15),
        advisory_lead: Duration::from_millis(100),
        cruise_speed_mps: 1_000.0,
        ..SimulationRules::default()
    }
}

fn fast_plane(count: usize, tcas: TcasCapability) -> Aircraft {
    Aircraft::new(count, 1_000.0, tcas)
}

fn airport_pair(parked_at_origin: Vec<Aircraft>) -> (Arc<Airport>, Arc<Airport>) {
    let origin = Arc::new(Airport::new(
        1,
        Coordinate::new(0.0, 0.0, 0.0),
        1,
        parked_at_origin,
    ));
    let destination = Arc::new(Airport::new(
        2,
        Coordinate::new(100.0, 0.0, 0.0),
        1,
        Vec::new(),
    ));
    (origin, destination)
}

/// Flight from `from` to `to`, airborne now, arriving `secs` from now.
fn active_flight(plane: &Aircraft, from: &Airport, to: &Airport, secs: i64) -> Flight {
    let now = Utc::now();
    Flight {
        id: plane.next_flight_id(),
        path: FlightPath {
            departure: from.location,
            destination: to.location,
        },
        takeoff_time: now,
        scheduled_arrival_time: now + ChronoDuration::seconds(secs),
        actual_landing_time: None,
        cruising_altitude_m: 10_000.0,
        departure_airport: from.serial.clone(),
        arrival_airport: to.serial.clone(),
        status: FlightStatus::InTransit,
    }
}

/// Invariant: every aircraft is in exactly one place — some airport's
/// parked list or the in-flight list, never both, never neither.
fn assert_everywhere_exactly_once(state: &SimulationState, fleet_size: usize) {
    let mut seen = std::collections::HashSet::new();
    for airport in state.airports() {
        for plane in airport.parked_snapshot() {
            assert!(!plane.in_flight, "parked plane {} flagged in flight", plane.serial);
            assert!(seen.insert(plane.serial.clone()), "{} parked twice", plane.serial);
        }
    }
    for plane in state.flying_snapshot() {
        assert!(plane.in_flight, "airborne plane {} not flagged in flight", plane.serial);
        assert!(seen.insert(plane.serial.clone()), "{} both parked and airborne", plane.serial);
    }
    assert_eq!(seen.len(), fleet_size, "aircraft lost or duplicated");
}

#[tokio::test]
async fn one_runway_serializes_concurrent_takeoffs() {
    let rules = quick_rules();
    let (origin, destination) = airport_pair(vec![
        fast_plane(1, TcasCapability::Perfect),
        fast_plane(2, TcasCapability::Perfect),
    ]);
    let state = Arc::new(SimulationState::new(
        vec![origin.clone(), destination],
        false,
    ));
    state.set_running(true);

    let started = Instant::now();
    let mut attempts = Vec::new();
    for (serial, seed) in [("P_A001", 1u64), ("P_A002", 2u64)] {
        let airport = origin.clone();
        let state = state.clone();
        let rules = rules.clone();
        attempts.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let result = airport
                .take_off(serial, &state, &rules, &cancel, &mut rng)
                .await;
            (result, started.elapsed())
        }));
    }

    let mut elapsed = Vec::new();
    for attempt in attempts {
        let (result, took) = attempt.await.expect("takeoff task panicked");
        result.expect("takeoff should succeed");
        elapsed.push(took);
    }
    elapsed.sort();

    // The winner only pays its own physical takeoff; the loser observes a
    // busy wait of at least one takeoff duration first.
    assert!(
        elapsed[0] < Duration::from_millis(95),
        "first takeoff took {:?}",
        elapsed[0]
    );
    assert!(
        elapsed[1] >= Duration::from_millis(95),
        "second takeoff was not serialized: {:?}",
        elapsed[1]
    );

    assert_eq!(state.flying_count(), 2);
    assert_eq!(origin.parked_count(), 0);
    assert_eq!(origin.runways_in_use(), 0);
    assert_everywhere_exactly_once(&state, 2);
}

#[tokio::test]
async fn emergency_stop_drains_within_bound_and_is_idempotent() {
    let rules = quick_rules();
    let (origin, destination) = airport_pair(vec![
        fast_plane(1, TcasCapability::Perfect),
        fast_plane(2, TcasCapability::Perfect),
        fast_plane(3, TcasCapability::Perfect),
    ]);
    let state = Arc::new(SimulationState::new(
        vec![origin, destination],
        false,
    ));

    let mut run = SimulationRun::start(state.clone(), rules, Duration::from_secs(600));
    assert!(state.is_running());
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Bound: one takeoff + one landing + the advisory lead, with slack.
    timeout(Duration::from_secs(2), run.emergency_stop(&state))
        .await
        .expect("emergency stop did not drain in time");

    assert!(run.is_finished());
    assert!(!state.is_running());
    assert!(state.ended_at().is_some());
    assert_everywhere_exactly_once(&state, 3);

    // A second stop is a no-op leaving identical state.
    let ended = state.ended_at();
    timeout(Duration::from_secs(1), run.emergency_stop(&state))
        .await
        .expect("repeated emergency stop must return immediately");
    assert!(!state.is_running());
    assert_eq!(state.ended_at(), ended);
    assert_everywhere_exactly_once(&state, 3);
}

#[tokio::test]
async fn scheduled_crash_stops_the_whole_simulation() {
    let rules = SimulationRules {
        launch_interval_min: Duration::from_secs(10),
        launch_interval_max: Duration::from_secs(20),
        ..quick_rules()
    };
    let (origin, destination) = airport_pair(Vec::new());

    // Two faulty aircraft mid-air on opposing routes, with a crash
    // engagement injected 300 ms out (the advisory fires 100 ms before).
    let mut first = fast_plane(1, TcasCapability::Faulty);
    first.in_flight = true;
    first
        .flight_log
        .push(active_flight(&first, &origin, &destination, 60));
    let mut second = fast_plane(2, TcasCapability::Faulty);
    second.in_flight = true;
    second
        .flight_log
        .push(active_flight(&second, &destination, &origin, 60));

    let engagement = Engagement {
        id: "P_A001E_A001".to_string(),
        flight_id: first.flight_log[0].id.clone(),
        aircraft_serial: first.serial.clone(),
        other_serial: second.serial.clone(),
        time_of_engagement: Utc::now() + ChronoDuration::milliseconds(300),
        will_crash: true,
        warning_triggered: false,
    };
    first.pending_engagements.push(engagement.clone());

    let state = Arc::new(SimulationState::new(
        vec![origin, destination],
        false,
    ));
    state.push_flying(first);
    state.push_flying(second);

    let mut run = SimulationRun::start(state.clone(), rules, Duration::from_secs(600));
    timeout(Duration::from_secs(3), run.wait())
        .await
        .expect("the crash did not bring the simulation down");

    assert!(!state.is_running());
    assert!(state.ended_at().is_some());

    // The advisory fired exactly once and reached both histories.
    let first = state.find_flying("P_A001").expect("still airborne");
    assert_eq!(first.engagement_history.len(), 1);
    assert!(first.pending_engagements[0].warning_triggered);
    let second = state.find_flying("P_A002").expect("still airborne");
    assert_eq!(second.engagement_history.len(), 1);
    assert_eq!(second.engagement_history[0].id, engagement.id);
}

#[tokio::test]
async fn uneventful_flights_land_where_they_were_headed() {
    let rules = SimulationRules {
        takeoff_duration: Duration::from_millis(30),
        landing_duration: Duration::from_millis(40),
        ..quick_rules()
    };
    let (origin, destination) = airport_pair(vec![fast_plane(1, TcasCapability::Perfect)]);
    let state = Arc::new(SimulationState::new(
        vec![origin, destination],
        false,
    ));

    let mut run = SimulationRun::start(state.clone(), rules, Duration::from_secs(2));
    timeout(Duration::from_secs(6), run.wait())
        .await
        .expect("the run did not finish after its deadline");

    assert!(!state.is_running());
    assert_everywhere_exactly_once(&state, 1);

    // With a 100 m hop at 1000 m/s, at least one full rotation completed.
    let mut landed_flights = 0;
    for airport in state.airports() {
        for plane in airport.parked_snapshot() {
            let last = plane
                .current_flight()
                .expect("a parked plane with history must have flown");
            assert_eq!(last.status, FlightStatus::Landed);
            assert_eq!(
                last.arrival_airport, airport.serial,
                "plane parked at an airport its flight was not bound for"
            );
            let landed_at = last.actual_landing_time.expect("landed without a stamp");
            assert!(landed_at >= last.scheduled_arrival_time);
            landed_flights += plane
                .flight_log
                .iter()
                .filter(|flight| flight.status == FlightStatus::Landed)
                .count();
        }
    }
    for plane in state.flying_snapshot() {
        landed_flights += plane
            .flight_log
            .iter()
            .filter(|flight| flight.status == FlightStatus::Landed)
            .count();
    }
    assert!(landed_flights >= 1, "no flight completed a full rotation");

    // Every landed flight satisfies the schedule law.
    for airport in state.airports() {
        for plane in airport.parked_snapshot() {
            for flight in &plane.flight_log {
                if flight.status == FlightStatus::Landed {
                    let expected =
                        flight.path.length_m() / plane.cruise_speed_mps * 1000.0;
                    let scheduled =
                        (flight.scheduled_arrival_time - flight.takeoff_time).num_milliseconds();
                    assert!((scheduled as f64 - expected).abs() <= 1.0 + expected * 1e-6);
                }
            }
        }
    }
}
