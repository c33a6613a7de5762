//! Errors surfaced to whoever drives the simulation

use thiserror::Error;

use super::types::Direction;

/// Rejected configuration or operator request.
///
/// Whenever one of these is returned the simulation state is exactly what it
/// was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{field} must be at least 1 second")]
    DurationTooShort { field: &'static str },
    #[error("spawn rate {0} must be between 0.0 and 1.0")]
    SpawnRateOutOfRange(f32),
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("speed jitter {0} must be in [0.0, 1.0)")]
    SpeedJitterOutOfRange(f32),
    #[error("lanes per direction must be between 1 and {max}, got {actual}")]
    LaneCountOutOfRange { actual: u8, max: u8 },
    #[error("vehicle cap {field} must be non-zero")]
    ZeroCapacity { field: &'static str },
    #[error("signal plan must contain at least one direction group")]
    EmptyPlan,
    #[error("signal plan group {0} is empty")]
    EmptyGroup(usize),
    #[error("direction {0} appears in more than one signal group")]
    DuplicateDirection(Direction),
    #[error("signal group {group} puts conflicting directions {a} and {b} on green together")]
    ConflictingGroup {
        group: usize,
        a: Direction,
        b: Direction,
    },
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    #[error("direction {0} is not served by the signal plan")]
    DirectionNotInPlan(Direction),
    #[error("manual signal requests need manual mode")]
    ManualModeRequired,
}
