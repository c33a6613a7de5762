//! Standalone intersection simulation
//!
//! Vehicle kinematics, car-following, the signal phase state machine and the
//! spawn/exit lifecycle for a single signalized intersection. Nothing in here
//! renders, persists or talks to the network; it consumes a [`SimConfig`] and
//! hands back [`WorldSnapshot`]s.

mod config;
mod driver;
mod error;
mod following;
mod lanes;
mod signal;
mod snapshot;
mod spawner;
mod stats;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
pub use config::{Geometry, SimConfig, MAX_LANES_PER_DIRECTION};
pub use driver::{Command, DriverHandle, SimClock, SimDriver, DEFAULT_FRAME_MS, PHASE_TICK_MS};
pub use error::ConfigurationError;
pub use following::{resolve, sweep_lanes, Constraint, LaneSweep, Leader};
pub use lanes::LaneIndex;
pub use signal::{conflict_graph, LightState, Phase, SignalController, SignalMode, SignalPlan};
pub use snapshot::{VehicleView, WorldSnapshot};
pub use spawner::{Spawner, ENTRY_POSITION};
pub use stats::SimulationStats;
pub use types::{
    braking_distance, reachable_distance, stopping_distance, Dimensions, Direction, LaneId,
    LightColor, MotionState, Position, SimId, VehicleClass, VehicleId, ACCELERATION, BRAKING,
    EXIT_MARGIN, LANE_WIDTH, LINE_TOLERANCE, STOPPED_EPSILON,
};
pub use vehicle::{SimVehicle, VehicleUpdateResult};
pub use world::SimWorld;
