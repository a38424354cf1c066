//! State reporting: the `get` and `log` commands, and the detail files.
//!
//! `get` renders to the console; `log` appends the same selection of
//! fields to the per-entity detail files under the log directory. The
//! detail files are append-only; `--reset` deletes them but leaves the
//! console and TCAS logs alone.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use tcas_core::{Aircraft, Engagement, Flight};

use crate::config::Config;
use crate::state::SimulationState;

const USAGE: &str = "usage: {} <option>, options: airports, airplanes, flights, all";

/// The reference time for progress figures: now while running, the end
/// of the last run otherwise.
fn sim_time(state: &SimulationState) -> DateTime<Utc> {
    if state.is_running() {
        Utc::now()
    } else {
        state.ended_at().unwrap_or_else(Utc::now)
    }
}

/// Every aircraft in the system, parked or airborne, sorted by serial.
fn collect_planes(state: &SimulationState) -> Vec<Aircraft> {
    let mut planes = Vec::new();
    for airport in state.airports() {
        planes.extend(airport.parked_snapshot());
    }
    planes.extend(state.flying_snapshot());
    planes.sort_by(|a, b| a.serial.cmp(&b.serial));
    planes
}

/// Every recorded flight across all aircraft, sorted by flight ID.
fn collect_flights(state: &SimulationState) -> Vec<Flight> {
    let mut flights = Vec::new();
    for plane in collect_planes(state) {
        flights.extend(plane.flight_log);
    }
    flights.sort_by(|a, b| a.id.cmp(&b.id));
    flights
}

/// Handle `get <option>`.
pub fn print_details(state: &SimulationState, option: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    match option {
        "airports" => write_airports(&mut out, state)?,
        "airplanes" => write_airplanes(&mut out, state)?,
        "flights" => write_flights(&mut out, state)?,
        "all" => {
            write_airports(&mut out, state)?;
            write_airplanes(&mut out, state)?;
            write_flights(&mut out, state)?;
        }
        _ => writeln!(out, "{}", USAGE.replace("{}", "get"))?,
    }
    Ok(())
}

/// Handle `log <option>`: append the selection to its detail file.
pub fn log_details(state: &SimulationState, config: &Config, option: &str) -> Result<()> {
    match option {
        "airports" => {
            append_to(&config.airport_details_path(), |f| write_airports(f, state))?;
            println!("Successfully logged airports");
        }
        "airplanes" => {
            append_to(&config.airplane_details_path(), |f| write_airplanes(f, state))?;
            println!("Successfully logged airplanes");
        }
        "flights" => {
            append_to(&config.flight_details_path(), |f| write_flights(f, state))?;
            println!("Successfully logged all flights");
        }
        "all" => {
            log_details(state, config, "airports")?;
            log_details(state, config, "airplanes")?;
            log_details(state, config, "flights")?;
        }
        _ => println!("{}", USAGE.replace("{}", "log")),
    }
    Ok(())
}

/// Delete the three entity detail files; the console and TCAS logs are
/// kept.
pub fn reset_detail_logs(config: &Config) -> Result<()> {
    for path in [
        config.airport_details_path(),
        config.airplane_details_path(),
        config.flight_details_path(),
    ] {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }
    Ok(())
}

fn append_to(path: &Path, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    write(&mut file).with_context(|| format!("failed to write {}", path.display()))
}

fn write_airports(out: &mut dyn Write, state: &SimulationState) -> io::Result<()> {
    writeln!(out, "\n--- Selected fields for each airport ---")?;
    for (index, airport) in state.airports().iter().enumerate() {
        writeln!(out, "Airport {} (Serial: {}):", index + 1, airport.serial)?;
        writeln!(out, "  Location: {}", airport.location)?;
        writeln!(
            out,
            "  Runways: {} ({} in use)",
            airport.runway_budget,
            airport.runways_in_use()
        )?;
        writeln!(out, "  Planes:")?;
        let parked = airport.parked_snapshot();
        if parked.is_empty() {
            writeln!(out, "    No planes currently.")?;
        } else {
            for (slot, plane) in parked.iter().enumerate() {
                writeln!(out, "    {}. Serial: {}", slot + 1, plane.serial)?;
            }
        }
        writeln!(out, "-------------------------------------------")?;
    }
    Ok(())
}

fn write_airplanes(out: &mut dyn Write, state: &SimulationState) -> io::Result<()> {
    let now = sim_time(state);
    writeln!(out, "\n--- Selected fields for each plane ---")?;
    for (index, plane) in collect_planes(state).iter().enumerate() {
        writeln!(out, "Plane {} (Serial: {}):", index + 1, plane.serial)?;
        writeln!(out, "  In Flight: {}", plane.in_flight)?;
        writeln!(out, "  Cruise Speed: {:.2} m/s", plane.cruise_speed_mps)?;
        writeln!(out, "  TCAS Capability: {}", plane.tcas.describe())?;
        writeln!(out, "  Flight Log:")?;
        if plane.flight_log.is_empty() {
            writeln!(out, "    No flights recorded for this plane.")?;
        } else {
            for flight in &plane.flight_log {
                write_flight(out, flight, now)?;
            }
        }
        if plane.engagement_history.is_empty() {
            writeln!(out, "    No past TCAS engagement recorded for this plane.")?;
        } else {
            for engagement in &plane.engagement_history {
                write_engagement(out, engagement)?;
            }
        }
        if plane.pending_engagements.is_empty() {
            writeln!(out, "    No current TCAS engagement recorded for this plane.")?;
        } else {
            for engagement in &plane.pending_engagements {
                write_engagement(out, engagement)?;
            }
        }
        writeln!(out, "-------------------------------------------")?;
    }
    Ok(())
}

fn write_flights(out: &mut dyn Write, state: &SimulationState) -> io::Result<()> {
    let now = sim_time(state);
    let flights = collect_flights(state);
    if flights.is_empty() {
        writeln!(out, "\n--- No flight recorded currently ---")?;
        return Ok(());
    }
    writeln!(out, "\n--- All recorded flights ---")?;
    for (index, flight) in flights.iter().enumerate() {
        writeln!(out, "\nflight {index}:")?;
        write_flight(out, flight, now)?;
    }
    Ok(())
}

fn write_flight(out: &mut dyn Write, flight: &Flight, now: DateTime<Utc>) -> io::Result<()> {
    writeln!(out, "    --- Flight Details ---")?;
    writeln!(out, "    Flight ID: {}", flight.id)?;
    writeln!(out, "    Takeoff Time: {}", flight.takeoff_time.format("%H:%M:%S"))?;
    writeln!(
        out,
        "    Destination Arrival Time: {}",
        flight.scheduled_arrival_time.format("%H:%M:%S")
    )?;
    writeln!(out, "    Cruising Altitude: {:.2} meters", flight.cruising_altitude_m)?;
    writeln!(out, "    Departure Airport: {}", flight.departure_airport)?;
    writeln!(out, "    Destination Airport: {}", flight.arrival_airport)?;
    match flight.actual_landing_time {
        Some(landed) => writeln!(out, "    Actual Landing Time: {}", landed.format("%H:%M:%S"))?,
        None => writeln!(out, "    Actual Landing Time: Plane is yet to land")?,
    }
    writeln!(out, "    Progress: {}", flight.progress(now))?;
    writeln!(out, "    ---------------------------------------")
}

fn write_engagement(out: &mut dyn Write, engagement: &Engagement) -> io::Result<()> {
    writeln!(out, "    --- Engagement Details ---")?;
    writeln!(out, "    Engagement ID: {}", engagement.id)?;
    writeln!(out, "    Flight ID: {}", engagement.flight_id)?;
    writeln!(out, "    Plane Serial: {}", engagement.aircraft_serial)?;
    writeln!(out, "    Other Plane Serial: {}", engagement.other_serial)?;
    writeln!(
        out,
        "    Time Of Engagement: {}",
        engagement.time_of_engagement.format("%H:%M:%S")
    )?;
    writeln!(
        out,
        "    Will Crash: {}",
        if engagement.will_crash { "yes" } else { "no" }
    )
}
