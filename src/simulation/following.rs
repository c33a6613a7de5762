//! Car-following and stop-line resolution
//!
//! For every lane the vehicles are swept from the front of the queue to the
//! back. Each vehicle sees its leader *after* the leader has moved this tick,
//! and its speed is capped so the bumper gap never drops under `min_gap`.
//! Overlap is therefore impossible rather than merely discouraged.
//!
//! On yellow a vehicle near the line stops only when fixed-rate braking gets
//! it to rest before the line and it could not clear the box while the
//! yellow is certain to last; otherwise it keeps going. Only red caps speed
//! at the line itself.

use log::debug;

use super::config::Geometry;
use super::lanes::LaneIndex;
use super::signal::LightState;
use super::types::{
    braking_distance, reachable_distance, stopping_distance, LaneId, LightColor, VehicleId,
    LINE_TOLERANCE,
};
use super::vehicle::{SimVehicle, VehicleUpdateResult};

/// What a vehicle is allowed to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    /// Brake by the fixed decrement
    pub stop_required: bool,
    /// Reduced target speed from soft following
    pub soft_target: f32,
    /// Hard cap on the distance covered this tick
    pub ceiling: f32,
}

impl Constraint {
    pub fn free() -> Self {
        Self {
            stop_required: false,
            soft_target: f32::INFINITY,
            ceiling: f32::INFINITY,
        }
    }
}

/// The vehicle directly ahead in the same lane, already updated this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leader {
    pub rear: f32,
}

/// What the stop line asks of a vehicle this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRule {
    Free,
    /// Brake by the fixed decrement; it is known to stop short of the line
    Brake,
    /// Never pass the line; `brake` when it has to start slowing now
    Hold { brake: bool },
}

fn line_rule(
    vehicle: &SimVehicle,
    light: LightColor,
    yellow_ticks: f32,
    geometry: &Geometry,
) -> LineRule {
    if vehicle.crossed_intersection {
        return LineRule::Free;
    }
    let to_line = vehicle.distance_to_line(geometry);
    if to_line < -LINE_TOLERANCE {
        // already over the line, clear the box
        return LineRule::Free;
    }

    match light {
        LightColor::Green => LineRule::Free,
        LightColor::Red => LineRule::Hold {
            brake: to_line <= braking_distance(vehicle.speed),
        },
        LightColor::Yellow => {
            if to_line > braking_distance(vehicle.target_speed) {
                return LineRule::Free;
            }
            let can_stop = stopping_distance(vehicle.speed) <= to_line;
            let to_clear = geometry.far_edge - vehicle.front();
            let can_clear =
                reachable_distance(vehicle.speed, vehicle.target_speed, yellow_ticks) > to_clear;
            if can_stop && !can_clear {
                LineRule::Brake
            } else {
                LineRule::Free
            }
        }
    }
}

/// Work out the constraint on `vehicle` from its leader and its light.
///
/// `yellow_ticks` is how many more ticks a yellow light is certain to last.
pub fn resolve(
    vehicle: &SimVehicle,
    leader: Option<Leader>,
    light: LightColor,
    yellow_ticks: f32,
    geometry: &Geometry,
    min_gap: f32,
) -> Constraint {
    let mut constraint = Constraint::free();

    if let Some(leader) = leader {
        let gap = leader.rear - vehicle.front();
        let spare = gap - min_gap;
        constraint.ceiling = spare.max(0.0);
        if spare < 0.0 {
            constraint.stop_required = true;
        } else if spare < min_gap {
            // linear ramp over a buffer as long as the gap itself
            constraint.soft_target = vehicle.target_speed * spare / min_gap;
        }
    }

    match line_rule(vehicle, light, yellow_ticks, geometry) {
        LineRule::Free => {}
        LineRule::Brake => constraint.stop_required = true,
        LineRule::Hold { brake } => {
            let to_line = vehicle.distance_to_line(geometry).max(0.0);
            constraint.ceiling = constraint.ceiling.min(to_line);
            constraint.stop_required |= brake;
        }
    }

    constraint
}

/// Outcome of moving every vehicle one tick
#[derive(Debug, Default)]
pub struct LaneSweep {
    pub vehicles: Vec<SimVehicle>,
    /// Vehicles whose leading edge left the box this tick
    pub crossed: Vec<(VehicleId, LaneId)>,
    pub exited: Vec<VehicleId>,
}

/// Advance all vehicles by one tick, producing the next vehicle list.
pub fn sweep_lanes(
    vehicles: &[SimVehicle],
    lights: &LightState,
    yellow_ticks: f32,
    geometry: &Geometry,
    min_gap: f32,
) -> LaneSweep {
    let index = LaneIndex::build(vehicles);
    let mut next = vehicles.to_vec();
    let mut sweep = LaneSweep::default();
    let mut keep = vec![true; next.len()];

    for lane in index.lanes() {
        let light = lights.get(lane.direction);
        let mut leader = None;

        for i in index.front_to_back(lane) {
            let vehicle = &mut next[i];
            let constraint = resolve(vehicle, leader, light, yellow_ticks, geometry, min_gap);
            let result = vehicle.update(&constraint, geometry);
            leader = Some(Leader {
                rear: vehicle.rear(),
            });

            match result {
                VehicleUpdateResult::Continue => {}
                VehicleUpdateResult::Crossed => {
                    debug!("Vehicle {:?} cleared the intersection ({lane})", vehicle.id.0);
                    sweep.crossed.push((vehicle.id, lane));
                }
                VehicleUpdateResult::Exited { crossed } => {
                    if crossed {
                        sweep.crossed.push((vehicle.id, lane));
                    }
                    debug!("Vehicle {:?} left the simulation ({lane})", vehicle.id.0);
                    sweep.exited.push(vehicle.id);
                    keep[i] = false;
                }
            }
        }
    }

    sweep.vehicles = next
        .into_iter()
        .zip(keep)
        .filter_map(|(vehicle, keep)| keep.then_some(vehicle))
        .collect();
    sweep
}
