//! Running statistics for a simulation

use log::info;
use serde::Serialize;

use super::types::{Direction, LaneId, MotionState, VehicleId};
use super::vehicle::SimVehicle;

/// Counters accumulated since the last reset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub frames: u64,
    pub elapsed_time: f32,
    pub total_spawned: u64,
    pub total_exited: u64,
    /// Vehicles that fully crossed the intersection box
    pub throughput: u64,
    /// Throughput split by direction of travel, indexed by [`Direction::index`]
    pub throughput_by_direction: [u64; 4],
    pub phase_transitions: u64,
    pub active_vehicles: usize,
    pub stopped_vehicles: usize,
    pub average_speed: f32,
}

impl SimulationStats {
    /// Fold one physics frame into the counters
    pub fn record_frame(
        &mut self,
        dt_secs: f32,
        spawned: usize,
        crossed: &[(VehicleId, LaneId)],
        exited: usize,
        vehicles: &[SimVehicle],
    ) {
        self.frames += 1;
        self.elapsed_time += dt_secs;
        self.total_spawned += spawned as u64;
        self.total_exited += exited as u64;
        for (_, lane) in crossed {
            self.throughput += 1;
            self.throughput_by_direction[lane.direction.index()] += 1;
        }

        self.active_vehicles = vehicles.len();
        self.stopped_vehicles = vehicles
            .iter()
            .filter(|v| v.motion_state() == MotionState::Stopped)
            .count();
        self.average_speed = if vehicles.is_empty() {
            0.0
        } else {
            vehicles.iter().map(|v| v.speed).sum::<f32>() / vehicles.len() as f32
        };
    }

    pub fn throughput_for(&self, direction: Direction) -> u64 {
        self.throughput_by_direction[direction.index()]
    }

    /// Write the totals to the log
    pub fn log_summary(&self) {
        info!("Elapsed time: {:.2}s", self.elapsed_time);
        info!("Frames: {}", self.frames);
        info!("Total vehicles spawned: {}", self.total_spawned);
        info!("Total vehicles exited: {}", self.total_exited);
        info!("Throughput: {}", self.throughput);
        for direction in Direction::ALL {
            info!("  {}: {}", direction, self.throughput_for(direction));
        }
        info!("Phase transitions: {}", self.phase_transitions);
        info!("Active vehicles: {}", self.active_vehicles);
        info!("Stopped vehicles: {}", self.stopped_vehicles);
        info!("Average speed: {:.3}", self.average_speed);
    }
}
