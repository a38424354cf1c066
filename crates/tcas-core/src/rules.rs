//! Simulation parameters and thresholds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conflict::COLLISION_THRESHOLD_M;

/// Cruising-altitude tiers in meters. The first tier is the canonical
/// altitude used when the different-altitudes policy is off.
pub const CRUISING_ALTITUDES_M: [f64; 3] = [10_000.0, 10_200.0, 10_400.0];

/// Tunable parameters for a simulation run.
///
/// The defaults reproduce the canonical behavior; the integration tests
/// shrink the durations to millisecond physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRules {
    /// How long a takeoff physically occupies a runway.
    pub takeoff_duration: Duration,
    /// How long a landing physically occupies a runway.
    pub landing_duration: Duration,
    /// Minimum random delay before an airport tries to launch a plane.
    pub launch_interval_min: Duration,
    /// Maximum random delay before an airport tries to launch a plane.
    pub launch_interval_max: Duration,
    /// Polling period of the flight monitor.
    pub monitor_interval: Duration,
    /// How far ahead of a predicted engagement the advisory fires.
    pub advisory_lead: Duration,
    /// Closest-approach distance below which two flights engage.
    pub collision_threshold_m: f64,
    /// Cruise speed assigned to every aircraft, meters per second.
    pub cruise_speed_mps: f64,
    /// Probability that a newly built aircraft has faulty TCAS equipment.
    pub faulty_tcas_ratio: f64,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            takeoff_duration: Duration::from_secs(5),
            landing_duration: Duration::from_secs(7),
            launch_interval_min: Duration::from_secs(5),
            launch_interval_max: Duration::from_secs(60),
            monitor_interval: Duration::from_millis(500),
            advisory_lead: Duration::from_secs(3),
            collision_threshold_m: COLLISION_THRESHOLD_M,
            cruise_speed_mps: 0.1,
            faulty_tcas_ratio: 0.25,
        }
    }
}
