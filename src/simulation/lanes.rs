//! Per-lane ordering of vehicles
//!
//! Rebuilt from the vehicle list at the start of every tick. Kinematics only
//! asks it for "front to back in this lane" and "who is last", so the backing
//! structure can change without touching the car-following code.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;

use super::types::{LaneId, VehicleId};
use super::vehicle::SimVehicle;

/// Entry in a lane, ordered by progress then ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LaneSlot {
    position: OrderedFloat<f32>,
    id: VehicleId,
    /// Index into the vehicle list the index was built from
    index: usize,
}

#[derive(Default)]
pub struct LaneIndex {
    lanes: BTreeMap<LaneId, SortedVec<LaneSlot>>,
}

impl LaneIndex {
    pub fn build(vehicles: &[SimVehicle]) -> Self {
        let mut lanes: BTreeMap<LaneId, SortedVec<LaneSlot>> = BTreeMap::new();
        for (index, vehicle) in vehicles.iter().enumerate() {
            lanes.entry(vehicle.lane).or_insert_with(SortedVec::new).insert(LaneSlot {
                position: OrderedFloat(vehicle.position),
                id: vehicle.id,
                index,
            });
        }
        Self { lanes }
    }

    /// Occupied lanes in a stable order
    pub fn lanes(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes.keys().copied()
    }

    /// Vehicle indices in `lane`, leading vehicle first
    pub fn front_to_back(&self, lane: LaneId) -> impl Iterator<Item = usize> + '_ {
        self.lanes
            .get(&lane)
            .into_iter()
            .flat_map(|slots| slots.iter().rev().map(|slot| slot.index))
    }

    /// Index of the vehicle closest to the lane entry
    pub fn rearmost(&self, lane: LaneId) -> Option<usize> {
        self.lanes
            .get(&lane)
            .and_then(|slots| slots.first())
            .map(|slot| slot.index)
    }

    pub fn count(&self, lane: LaneId) -> usize {
        self.lanes.get(&lane).map_or(0, |slots| slots.len())
    }
}
