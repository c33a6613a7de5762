//! Tunable parameters for the simulation
//!
//! The core only ever reads a [`SimConfig`]; persisting or editing it is
//! someone else's job. Files are plain camelCase JSON with every field
//! optional.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;
use super::signal::SignalPlan;
use super::types::{VehicleClass, EXIT_MARGIN};

/// Upper bound on lanes per approach
pub const MAX_LANES_PER_DIRECTION: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimConfig {
    /// Seconds a group stays green
    pub green_duration: u32,
    /// Seconds a group stays yellow
    pub yellow_duration: u32,
    /// All-red clearance between groups, in seconds. Zero skips the clearance.
    pub red_duration: u32,
    /// Free-flow speed, distance per tick
    pub vehicle_speed: f32,
    /// Fractional spread applied to each vehicle's target speed at spawn
    pub speed_jitter: f32,
    /// Spawn probability per lane per second
    pub spawn_rate: f32,
    /// Minimum bumper-to-bumper clearance
    pub min_gap: f32,
    /// Side length of the intersection box
    pub intersection_size: f32,
    /// Distance from the lane entry to the stop line
    pub approach_length: f32,
    pub lanes_per_direction: u8,
    pub max_vehicles_per_lane: Option<usize>,
    pub max_vehicles: Option<usize>,
    /// Spawn only this class instead of the weighted mix
    pub vehicle_class: Option<VehicleClass>,
    pub signal_plan: SignalPlan,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            green_duration: 30,
            yellow_duration: 3,
            red_duration: 2,
            vehicle_speed: 0.5,
            speed_jitter: 0.2,
            spawn_rate: 0.3,
            min_gap: 10.0,
            intersection_size: 30.0,
            approach_length: 150.0,
            lanes_per_direction: 1,
            max_vehicles_per_lane: Some(8),
            max_vehicles: Some(32),
            vehicle_class: None,
            signal_plan: SignalPlan::two_way(),
        }
    }
}

impl SimConfig {
    /// Check every field, reporting the first offending one
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.green_duration == 0 {
            return Err(ConfigurationError::DurationTooShort {
                field: "greenDuration",
            });
        }
        if self.yellow_duration == 0 {
            return Err(ConfigurationError::DurationTooShort {
                field: "yellowDuration",
            });
        }
        if !(0.0..=1.0).contains(&self.spawn_rate) {
            return Err(ConfigurationError::SpawnRateOutOfRange(self.spawn_rate));
        }
        if !(0.0..1.0).contains(&self.speed_jitter) {
            return Err(ConfigurationError::SpeedJitterOutOfRange(self.speed_jitter));
        }

        let positive = [
            ("vehicleSpeed", self.vehicle_speed),
            ("minGap", self.min_gap),
            ("intersectionSize", self.intersection_size),
            ("approachLength", self.approach_length),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::NotPositive { field, value });
            }
        }

        if self.lanes_per_direction == 0 || self.lanes_per_direction > MAX_LANES_PER_DIRECTION {
            return Err(ConfigurationError::LaneCountOutOfRange {
                actual: self.lanes_per_direction,
                max: MAX_LANES_PER_DIRECTION,
            });
        }
        if self.max_vehicles_per_lane == Some(0) {
            return Err(ConfigurationError::ZeroCapacity {
                field: "maxVehiclesPerLane",
            });
        }
        if self.max_vehicles == Some(0) {
            return Err(ConfigurationError::ZeroCapacity {
                field: "maxVehicles",
            });
        }

        self.signal_plan.validate()
    }

    /// Parse a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig =
            serde_json::from_str(json).context("Failed to parse simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn geometry(&self) -> Geometry {
        let stop_line = self.approach_length;
        let far_edge = stop_line + self.intersection_size;
        Geometry {
            stop_line,
            far_edge,
            exit: far_edge + self.approach_length + EXIT_MARGIN,
            centre: stop_line + self.intersection_size / 2.0,
        }
    }
}

/// Lane coordinates derived from the config, measured along the direction of travel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Where the intersection box begins
    pub stop_line: f32,
    /// Where the intersection box ends
    pub far_edge: f32,
    /// Vehicles whose centre passes this are removed
    pub exit: f32,
    /// Progress value at the centre of the box
    pub centre: f32,
}
