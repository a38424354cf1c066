//! Runtime configuration.

use std::path::PathBuf;

use tcas_core::SimulationRules;

/// Everything the process needs to run a session: where the logs live,
/// the simulation rules, and the cruising-altitude policy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding every log file; created on demand.
    pub log_dir: PathBuf,
    pub rules: SimulationRules,
    /// When set, flights spread across the three altitude tiers instead
    /// of all cruising at the canonical altitude.
    pub different_altitudes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            rules: SimulationRules::default(),
            different_altitudes: false,
        }
    }
}

impl Config {
    pub fn console_log_path(&self) -> PathBuf {
        self.log_dir.join("console_log.txt")
    }

    pub fn tcas_log_path(&self) -> PathBuf {
        self.log_dir.join("tcasLog.txt")
    }

    pub fn airport_details_path(&self) -> PathBuf {
        self.log_dir.join("airportDetails.txt")
    }

    pub fn airplane_details_path(&self) -> PathBuf {
        self.log_dir.join("airplaneDetails.txt")
    }

    pub fn flight_details_path(&self) -> PathBuf {
        self.log_dir.join("flightDetails.txt")
    }
}
