//! Vehicle state and the per-tick kinematics update
//!
//! A vehicle only knows its own lane progress. What it is allowed to do in a
//! tick is decided by the resolver in `following` and handed in as a
//! [`Constraint`].

use serde::Serialize;

use super::config::Geometry;
use super::following::Constraint;
use super::types::{
    Dimensions, LaneId, MotionState, Position, VehicleClass, VehicleId, ACCELERATION, BRAKING,
    LANE_WIDTH, STOPPED_EPSILON,
};

/// What happened to a vehicle during its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue,
    /// Leading edge left the intersection box this tick
    Crossed,
    /// Past the end of the simulated area. `crossed` is set when the
    /// boundary was also passed during this same tick.
    Exited { crossed: bool },
}

/// A vehicle in the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimVehicle {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub lane: LaneId,
    /// Progress of the vehicle centre along its lane
    pub position: f32,
    pub speed: f32,
    /// Free-flow speed, fixed at spawn
    pub target_speed: f32,
    pub crossed_intersection: bool,
}

impl SimVehicle {
    pub fn new(id: VehicleId, class: VehicleClass, lane: LaneId, position: f32, target_speed: f32) -> Self {
        Self {
            id,
            class,
            lane,
            position,
            speed: 0.0,
            target_speed,
            crossed_intersection: false,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.class.dimensions()
    }

    pub fn half_length(&self) -> f32 {
        self.class.dimensions().length / 2.0
    }

    pub fn front(&self) -> f32 {
        self.position + self.half_length()
    }

    pub fn rear(&self) -> f32 {
        self.position - self.half_length()
    }

    pub fn motion_state(&self) -> MotionState {
        if self.speed < STOPPED_EPSILON {
            MotionState::Stopped
        } else {
            MotionState::Moving
        }
    }

    /// Signed distance from the front bumper to the stop line; negative once over it
    pub fn distance_to_line(&self, geometry: &Geometry) -> f32 {
        geometry.stop_line - self.front()
    }

    /// Apply one tick: new speed from the constraint, then move, then check
    /// the intersection boundary and the exit.
    pub fn update(&mut self, constraint: &Constraint, geometry: &Geometry) -> VehicleUpdateResult {
        let target = self.target_speed.min(constraint.soft_target);

        let mut speed = if constraint.stop_required {
            (self.speed - BRAKING).max(0.0)
        } else if self.speed > target {
            (self.speed - BRAKING).max(target)
        } else {
            (self.speed + ACCELERATION).min(target)
        };
        speed = speed.min(constraint.ceiling).min(self.target_speed).max(0.0);

        self.speed = speed;
        self.position += speed;

        let crossed = !self.crossed_intersection && self.front() > geometry.far_edge;
        if crossed {
            self.crossed_intersection = true;
        }

        if self.position > geometry.exit {
            VehicleUpdateResult::Exited { crossed }
        } else if crossed {
            VehicleUpdateResult::Crossed
        } else {
            VehicleUpdateResult::Continue
        }
    }

    /// Planar coordinates for a renderer, origin at the box centre, driving on the right
    pub fn world_position(&self, geometry: &Geometry) -> Position {
        let (ux, uy) = self.lane.direction.unit();
        let along = self.position - geometry.centre;
        let lateral = LANE_WIDTH * (f32::from(self.lane.index) + 0.5);
        // right-hand normal of (ux, uy) is (uy, -ux)
        Position::new(ux * along + uy * lateral, uy * along - ux * lateral)
    }
}
