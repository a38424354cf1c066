//! Pure domain logic for the TCAS flight simulation.
//!
//! This crate holds the geometry kernel, the entity model, the serial
//! allocator, the takeoff-time conflict predictor and the map seeding
//! routines, with no async runtime or I/O dependencies.

pub mod conflict;
pub mod models;
pub mod placement;
pub mod rules;
pub mod serial;
pub mod spatial;

pub use conflict::{
    crash_probability, predict_engagements, Assessment, AssessmentOutcome, ClearReason,
    ConflictScan, COLLISION_THRESHOLD_M,
};
pub use models::{Aircraft, Engagement, Flight, FlightPath, FlightStatus, TcasCapability};
pub use rules::{SimulationRules, CRUISING_ALTITUDES_M};
pub use serial::{serial_number, SerialKind};
pub use spatial::{closest_points_between_segments, Coordinate, COORD_EPSILON_M};
