//! The interactive command shell.
//!
//! One command per line; the command word is case-insensitive and an
//! optional second token is the argument. `start` spawns the supervisor
//! so the prompt stays responsive and `q` can stop a run mid-flight.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::config::Config;
use crate::init::initialize_world;
use crate::report;
use crate::state::SimulationState;
use crate::supervisor::SimulationRun;

/// Why the session loop returned.
pub enum SessionOutcome {
    /// `--reset`: rebuild the world and run a fresh session.
    Reset,
    /// `exit` or end of input.
    Exit,
}

/// Run one shell session: prompt for the fleet, build the world, then
/// dispatch commands until reset or exit.
pub async fn run_session(config: &Config, preset_planes: Option<usize>) -> Result<SessionOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Welcome to TCAS-simulator");
    let plane_count = match preset_planes {
        Some(count) if count >= 2 => count,
        Some(count) => {
            println!("--planes must be at least 2 (got {count})");
            match prompt_plane_count(&mut lines).await? {
                Some(count) => count,
                None => return Ok(SessionOutcome::Exit),
            }
        }
        None => match prompt_plane_count(&mut lines).await? {
            Some(count) => count,
            None => return Ok(SessionOutcome::Exit),
        },
    };

    let mut rng = StdRng::from_entropy();
    let state = Arc::new(initialize_world(plane_count, config, &mut rng)?);
    let mut active_run: Option<SimulationRun> = None;

    loop {
        print!("TCAS-simulator > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(SessionOutcome::Exit);
        };

        let words = clean_input(&line);
        let Some(command) = words.first() else {
            continue;
        };
        let argument = words.get(1).map(String::as_str).unwrap_or("");

        match command.as_str() {
            "help" => print_help(),
            "start" => handle_start(&state, config, argument, &mut active_run),
            "q" => handle_emergency_stop(&state, &mut active_run).await,
            "get" => report::print_details(&state, argument)?,
            "log" => report::log_details(&state, config, argument)?,
            "--reset" => {
                if let Some(mut run) = active_run.take() {
                    if !run.is_finished() {
                        run.emergency_stop(&state).await;
                    }
                }
                report::reset_detail_logs(config)?;
                return Ok(SessionOutcome::Reset);
            }
            "exit" => std::process::exit(0),
            _ => println!("Unknown command, type <help> for usage"),
        }
        println!();
    }
}

/// Split a raw line into lowercased words.
fn clean_input(line: &str) -> Vec<String> {
    line.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

async fn prompt_plane_count(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<usize>> {
    loop {
        print!("Input the number of planes for the simulation > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let Some(token) = line.split_whitespace().next() else {
            println!("Please input a valid integer");
            continue;
        };
        match token.parse::<usize>() {
            Err(_) => println!("Please input a valid integer"),
            Ok(count) if count < 2 => println!("Please input a valid integer greater than 1"),
            Ok(count) => return Ok(Some(count)),
        }
    }
}

fn handle_start(
    state: &Arc<SimulationState>,
    config: &Config,
    argument: &str,
    active_run: &mut Option<SimulationRun>,
) {
    let minutes: i64 = match argument.parse() {
        Ok(minutes) => minutes,
        Err(_) => {
            println!("usage: start <integer> (integer represents time in minute(s))");
            return;
        }
    };
    if minutes < 1 {
        println!("Please input a valid integer greater than 0");
        return;
    }
    if active_run.as_ref().is_some_and(|run| !run.is_finished()) {
        println!("A simulation is already running; stop it with 'q' first");
        return;
    }

    println!("To initiate an emergency stop, type 'q' and press Enter.");
    println!(
        "TCAS logs can be found in {}.",
        config.tcas_log_path().display()
    );
    *active_run = Some(SimulationRun::start(
        state.clone(),
        config.rules.clone(),
        Duration::from_secs(minutes as u64 * 60),
    ));
}

async fn handle_emergency_stop(state: &SimulationState, active_run: &mut Option<SimulationRun>) {
    match active_run.take() {
        Some(mut run) if !run.is_finished() => run.emergency_stop(state).await,
        _ => println!("EmergencyStop: Simulation not running"),
    }
}

fn print_help() {
    println!("Welcome to TCAS-simulator!");
    println!("Usage:");
    println!();
    println!("help: lists all available commands");
    println!("start <minutes>: begins a simulation run of that many minutes");
    println!("q: emergency stop of the active run");
    println!("get <airports|airplanes|flights|all>: renders current state to the console");
    println!("log <airports|airplanes|flights|all>: appends current state to the log files");
    println!("--reset: clears the detail logs and restarts the session");
    println!("exit: terminates the simulator");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_lowercased_and_split() {
        assert_eq!(clean_input("  START 5  "), vec!["start", "5"]);
        assert_eq!(clean_input("GET Airports"), vec!["get", "airports"]);
        assert!(clean_input("   ").is_empty());
    }
}
