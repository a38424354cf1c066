//! The per-run supervisor.
//!
//! Starting a simulation produces a [`SimulationRun`] owned by the shell
//! session: it carries the run's cancellation token and a close-only
//! completion channel. Emergency stop is a method on the run, so there is
//! no process-wide cancel handle and a finished run cannot be re-stopped
//! into a bad state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tcas_core::SimulationRules;

use crate::loops::launcher::run_launcher;
use crate::loops::monitor::run_monitor;
use crate::state::SimulationState;

/// Handle to an in-progress (or finished) simulation run.
pub struct SimulationRun {
    cancel: CancellationToken,
    completed: watch::Receiver<bool>,
}

impl SimulationRun {
    /// Start a run: mark the state as running, arm the deadline and spawn
    /// one launcher per airport plus the flight monitor under a join
    /// barrier.
    pub fn start(
        state: Arc<SimulationState>,
        rules: SimulationRules,
        duration: Duration,
    ) -> SimulationRun {
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);

        state.begin_run();
        tokio::spawn(supervise(state, rules, duration, cancel.clone(), done_tx));

        SimulationRun {
            cancel,
            completed: done_rx,
        }
    }

    /// Whether the supervisor has finished draining.
    pub fn is_finished(&self) -> bool {
        *self.completed.borrow()
    }

    /// Block until the completion channel closes.
    pub async fn wait(&mut self) {
        // An error means the supervisor is gone, which also means done.
        let _ = self.completed.wait_for(|done| *done).await;
    }

    /// Stop the run now and block until every task has quiesced.
    ///
    /// Safe to call more than once; the second call finds the completion
    /// channel already closed and returns immediately.
    pub async fn emergency_stop(&mut self, state: &SimulationState) {
        warn!("--- EMERGENCY STOP ACTIVATED! Signaling all tasks to stop... ---");
        self.cancel.cancel();
        state.set_running(false);
        self.wait().await;
    }
}

async fn supervise(
    state: Arc<SimulationState>,
    rules: SimulationRules,
    duration: Duration,
    cancel: CancellationToken,
    done: watch::Sender<bool>,
) {
    info!("--- TCAS Simulation Started for {:?} ---", duration);

    // Deadline: fires the cancellation when the duration elapses, and
    // stands down silently if something else cancelled first.
    {
        let deadline_state = state.clone();
        let trigger = cancel.clone();
        let observer = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(duration) => {
                    if deadline_state.is_running() {
                        info!(
                            "--- Simulation duration ({:?}) reached. Initiating shutdown... ---",
                            duration
                        );
                    }
                    trigger.cancel();
                }
                _ = observer.cancelled() => {}
            }
        });
    }

    info!("--- Starting Airport Launch Operations ---");
    let mut tasks = JoinSet::new();
    let seed_base: u64 = rand::random();
    for (index, airport) in state.airports().iter().enumerate() {
        tasks.spawn(run_launcher(
            airport.clone(),
            state.clone(),
            rules.clone(),
            cancel.clone(),
            seed_base.wrapping_add(index as u64),
        ));
    }

    info!("--- Starting Flight Landing and TCAS Monitor ---");
    tasks.spawn(run_monitor(state.clone(), rules.clone(), cancel.clone()));

    // Join barrier: when this returns, no launcher or monitor code is
    // still executing.
    while tasks.join_next().await.is_some() {}

    state.finish_run();

    info!("--- All simulation tasks have stopped. ---");
    info!("Final Simulation State Summary:");
    info!("  Planes currently in flight: {}", state.flying_count());
    for airport in state.airports() {
        info!(
            "  Airport {} has {} planes parked.",
            airport.serial,
            airport.parked_count()
        );
    }
    info!("--- TCAS Simulation Ended ---");

    let _ = done.send(true);
}
