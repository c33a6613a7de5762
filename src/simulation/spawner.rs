//! Vehicle spawning at the lane entries
//!
//! Every lane gets one Bernoulli draw per tick. A successful draw only turns
//! into a vehicle when the entry zone is clear and no cap is hit; skipped
//! spawns are not queued.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::config::SimConfig;
use super::lanes::LaneIndex;
use super::types::{Direction, LaneId, SimId, VehicleClass, VehicleId};
use super::vehicle::SimVehicle;

/// Where a new vehicle's centre is placed on its lane
pub const ENTRY_POSITION: f32 = 0.0;

pub struct Spawner {
    /// Seed the RNG was built from, kept so a reset replays the same run
    seed: Option<u64>,
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl Spawner {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            rng: seed.map(StdRng::seed_from_u64),
        }
    }

    /// Rewind the RNG to its seed
    pub fn reset(&mut self) {
        self.rng = self.seed.map(StdRng::seed_from_u64);
    }

    /// Bernoulli trial, using seeded RNG if available
    fn random_bool(&mut self, p: f64) -> bool {
        if p.is_nan() || p <= 0.0 {
            return false;
        }
        let p = p.min(1.0);
        match &mut self.rng {
            Some(rng) => rng.random_bool(p),
            None => rand::rng().random_bool(p),
        }
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::RangeInclusive<f32>) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn choose_class(&mut self, config: &SimConfig) -> VehicleClass {
        if let Some(class) = config.vehicle_class {
            return class;
        }
        let classes = VehicleClass::ALL;
        let chosen = match &mut self.rng {
            Some(rng) => classes.choose_weighted(rng, |c| c.spawn_weight()).ok().copied(),
            None => classes
                .choose_weighted(&mut rand::rng(), |c| c.spawn_weight())
                .ok()
                .copied(),
        };
        chosen.unwrap_or(VehicleClass::Car)
    }

    fn target_speed(&mut self, config: &SimConfig) -> f32 {
        if config.speed_jitter > 0.0 {
            let jitter = config.speed_jitter;
            config.vehicle_speed * self.random_range(1.0 - jitter..=1.0 + jitter)
        } else {
            config.vehicle_speed
        }
    }

    /// Try one spawn per lane. Returns the new vehicles; `next_id` is advanced
    /// for each one.
    pub fn spawn(
        &mut self,
        vehicles: &[SimVehicle],
        config: &SimConfig,
        dt_secs: f32,
        next_id: &mut usize,
    ) -> Vec<SimVehicle> {
        let index = LaneIndex::build(vehicles);
        let probability = f64::from(config.spawn_rate * dt_secs.max(0.0));
        let mut total = vehicles.len();
        let mut spawned = Vec::new();

        for direction in Direction::ALL {
            for lane_index in 0..config.lanes_per_direction {
                if config.max_vehicles.is_some_and(|max| total >= max) {
                    return spawned;
                }
                if !self.random_bool(probability) {
                    continue;
                }

                let lane = LaneId::new(direction, lane_index);
                if config
                    .max_vehicles_per_lane
                    .is_some_and(|max| index.count(lane) >= max)
                {
                    continue;
                }

                let class = self.choose_class(config);
                let front = ENTRY_POSITION + class.dimensions().length / 2.0;
                let clear = index
                    .rearmost(lane)
                    .map_or(true, |i| vehicles[i].rear() - front >= config.min_gap);
                if !clear {
                    continue;
                }

                let target_speed = self.target_speed(config);
                let id = VehicleId(SimId(*next_id));
                *next_id += 1;
                debug!("Spawned {class:?} {:?} in {lane} at target speed {target_speed:.3}", id.0);
                spawned.push(SimVehicle::new(id, class, lane, ENTRY_POSITION, target_speed));
                total += 1;
            }
        }

        spawned
    }
}
