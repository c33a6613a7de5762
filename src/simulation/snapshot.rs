//! Read-only views handed to a display layer

use serde::Serialize;

use super::config::Geometry;
use super::signal::{LightState, SignalMode};
use super::types::{Dimensions, Direction, LaneId, MotionState, Position, VehicleClass, VehicleId};
use super::vehicle::SimVehicle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleView {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub lane: LaneId,
    pub direction: Direction,
    pub position: f32,
    pub world_position: Position,
    pub dimensions: Dimensions,
    pub speed: f32,
    pub motion_state: MotionState,
    pub crossed_intersection: bool,
}

impl VehicleView {
    pub fn new(vehicle: &SimVehicle, geometry: &Geometry) -> Self {
        Self {
            id: vehicle.id,
            class: vehicle.class,
            lane: vehicle.lane,
            direction: vehicle.lane.direction,
            position: vehicle.position,
            world_position: vehicle.world_position(geometry),
            dimensions: vehicle.dimensions(),
            speed: vehicle.speed,
            motion_state: vehicle.motion_state(),
            crossed_intersection: vehicle.crossed_intersection,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub frame: u64,
    pub elapsed_time: f32,
    pub vehicles: Vec<VehicleView>,
    pub lights: LightState,
    pub phase: String,
    pub mode: SignalMode,
    /// Seconds until the next automatic transition; null while in manual mode
    pub countdown: Option<u32>,
    pub throughput: u64,
}
