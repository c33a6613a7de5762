//! Main simulation world that ties everything together
//!
//! [`SimWorld`] is the single owner of the vehicle set and the signal
//! controller. Every mutation goes through one of its methods, and each
//! physics tick replaces the vehicle list with a freshly computed one.

use anyhow::Result;
use log::{debug, info};

use super::config::{Geometry, SimConfig};
use super::error::ConfigurationError;
use super::following::sweep_lanes;
use super::signal::{LightState, Phase, SignalController, SignalMode};
use super::snapshot::{VehicleView, WorldSnapshot};
use super::spawner::Spawner;
use super::stats::SimulationStats;
use super::types::{Direction, LaneId, LightColor, SimId, VehicleClass, VehicleId, LANE_WIDTH};
use super::vehicle::SimVehicle;

/// The simulated intersection
pub struct SimWorld {
    config: SimConfig,
    geometry: Geometry,
    signal: SignalController,
    spawner: Spawner,

    /// Active vehicles, in ID order
    vehicles: Vec<SimVehicle>,

    /// Next ID to assign
    next_id: usize,

    stats: SimulationStats,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new_internal(SimConfig::default(), None)
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, seed: Option<u64>) -> Self {
        Self {
            geometry: config.geometry(),
            signal: SignalController::new(&config),
            spawner: Spawner::new(seed),
            config,
            vehicles: Vec::new(),
            next_id: 0,
            stats: SimulationStats::default(),
        }
    }

    pub fn new(config: SimConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::new_internal(config, None))
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: SimConfig, seed: u64) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::new_internal(config, Some(seed)))
    }

    /// Replace the tunable parameters. Vehicles are kept.
    ///
    /// New durations take effect at the next phase transition. A different
    /// signal plan restarts the cycle from its first group.
    pub fn configure(&mut self, config: SimConfig) -> Result<(), ConfigurationError> {
        config.validate()?;

        if config.signal_plan != self.config.signal_plan {
            info!("Signal plan changed, restarting the cycle");
            self.signal = SignalController::new(&config);
        } else {
            self.signal.set_timings(&config);
        }
        self.geometry = config.geometry();
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Advance the vehicles by one frame of `dt_ms` milliseconds.
    ///
    /// Spawning happens first, then every lane is swept front to back
    /// against the current lights. The signal clock is not touched.
    pub fn tick(&mut self, dt_ms: f32) {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        let dt_secs = dt_ms / 1000.0;

        let spawned = self
            .spawner
            .spawn(&self.vehicles, &self.config, dt_secs, &mut self.next_id);
        let spawned_count = spawned.len();

        let mut current = std::mem::take(&mut self.vehicles);
        current.extend(spawned);

        let lights = self.signal.lights();
        let yellow_ticks = match self.signal.certain_seconds() {
            None => f32::INFINITY,
            Some(secs) if dt_ms > 0.0 => secs as f32 * 1000.0 / dt_ms,
            Some(_) => 0.0,
        };
        let sweep = sweep_lanes(
            &current,
            &lights,
            yellow_ticks,
            &self.geometry,
            self.config.min_gap,
        );
        self.vehicles = sweep.vehicles;

        self.stats.record_frame(
            dt_secs,
            spawned_count,
            &sweep.crossed,
            sweep.exited.len(),
            &self.vehicles,
        );
    }

    /// Age the signal countdown by whole seconds.
    /// Returns how many phase transitions happened.
    pub fn advance_phase_clock(&mut self, elapsed_seconds: u32) -> u32 {
        let transitions = self.signal.advance(elapsed_seconds);
        self.stats.phase_transitions += u64::from(transitions);
        transitions
    }

    /// Operator request: green for the group serving `direction`
    pub fn set_manual_phase(&mut self, direction: Direction) -> Result<(), ConfigurationError> {
        self.signal.request_green(direction)
    }

    /// Same as [`Self::set_manual_phase`] with a direction given as text, e.g. `"E"`
    pub fn set_manual_phase_by_name(&mut self, direction: &str) -> Result<(), ConfigurationError> {
        let direction: Direction = direction.parse()?;
        self.set_manual_phase(direction)
    }

    /// Operator request: all approaches red
    pub fn set_manual_all_red(&mut self) -> Result<(), ConfigurationError> {
        self.signal.request_all_red()
    }

    pub fn set_auto_mode(&mut self, automatic: bool) {
        self.signal.set_auto_mode(automatic);
    }

    /// Drop every vehicle and counter and put the signal back to its initial state
    pub fn reset(&mut self) {
        info!("Resetting simulation");
        self.vehicles.clear();
        self.next_id = 0;
        self.stats = SimulationStats::default();
        self.signal.reset();
        self.spawner.reset();
    }

    /// Place a vehicle directly, bypassing the spawner.
    ///
    /// Fails if it would overlap another vehicle in the lane or the lane is
    /// not part of the current layout.
    pub fn add_vehicle(
        &mut self,
        lane: LaneId,
        class: VehicleClass,
        position: f32,
        target_speed: f32,
    ) -> Result<VehicleId> {
        if lane.index >= self.config.lanes_per_direction {
            anyhow::bail!("{lane} does not exist");
        }
        if !target_speed.is_finite() || target_speed < 0.0 {
            anyhow::bail!("Target speed must be finite and non-negative, got {target_speed}");
        }

        let id = VehicleId(SimId(self.next_id));
        let vehicle = SimVehicle::new(id, class, lane, position, target_speed);
        let overlaps = self
            .vehicles
            .iter()
            .filter(|other| other.lane == lane)
            .any(|other| vehicle.front() > other.rear() && other.front() > vehicle.rear());
        if overlaps {
            anyhow::bail!("Vehicle at {position} would overlap another vehicle in {lane}");
        }

        self.next_id += 1;
        debug!("Added {class:?} {:?} in {lane} at {position}", id.0);
        self.vehicles.push(vehicle);
        Ok(id)
    }

    pub fn vehicles(&self) -> &[SimVehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn lights(&self) -> LightState {
        self.signal.lights()
    }

    pub fn light(&self, direction: Direction) -> LightColor {
        self.signal.color(direction)
    }

    pub fn signal(&self) -> &SignalController {
        &self.signal
    }

    pub fn phase(&self) -> Phase {
        self.signal.phase()
    }

    pub fn signal_mode(&self) -> SignalMode {
        self.signal.mode()
    }

    /// Seconds until the next automatic transition; `None` in manual mode
    pub fn countdown(&self) -> Option<u32> {
        self.signal.countdown()
    }

    /// Vehicles that have fully crossed the intersection since the last reset
    pub fn throughput(&self) -> u64 {
        self.stats.throughput
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            frame: self.stats.frames,
            elapsed_time: self.stats.elapsed_time,
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleView::new(v, &self.geometry))
                .collect(),
            lights: self.signal.lights(),
            phase: self.signal.phase_label(),
            mode: self.signal.mode(),
            countdown: self.signal.countdown(),
            throughput: self.stats.throughput,
        }
    }

    fn countdown_label(&self) -> String {
        match self.countdown() {
            Some(secs) => format!("{secs}s"),
            None => "held".to_string(),
        }
    }

    /// Log a short status report
    pub fn print_summary(&self) {
        let lights: Vec<String> = self
            .lights()
            .iter()
            .map(|(d, c)| format!("{}={:?}", d.short_name(), c))
            .collect();
        info!(
            "Phase {} ({:?}, {} left) lights [{}]",
            self.signal.phase_label(),
            self.signal.mode(),
            self.countdown_label(),
            lights.join(" ")
        );
        info!(
            "Vehicles: {} active, {} stopped, throughput {}",
            self.stats.active_vehicles, self.stats.stopped_vehicles, self.stats.throughput
        );
    }

    /// Draw the intersection as text, north up
    pub fn draw_map(&self) -> String {
        const CELLS: usize = 41;
        let half_extent = self.geometry.stop_line + self.config.intersection_size / 2.0;
        let cell = 2.0 * half_extent / CELLS as f32;
        let lanes_width = f32::from(self.config.lanes_per_direction) * LANE_WIDTH;
        let road_half_width = (self.config.intersection_size / 2.0).max(lanes_width);

        let to_grid = |x: f32, y: f32| -> Option<(usize, usize)> {
            let col = ((x + half_extent) / cell).floor();
            let row = ((half_extent - y) / cell).floor();
            if col < 0.0 || row < 0.0 || col >= CELLS as f32 || row >= CELLS as f32 {
                None
            } else {
                Some((row as usize, col as usize))
            }
        };

        let mut grid = vec![vec![' '; CELLS]; CELLS];
        for (row, line) in grid.iter_mut().enumerate() {
            for (col, ch) in line.iter_mut().enumerate() {
                let x = (col as f32 + 0.5) * cell - half_extent;
                let y = half_extent - (row as f32 + 0.5) * cell;
                let on_ns = x.abs() <= road_half_width;
                let on_ew = y.abs() <= road_half_width;
                *ch = match (on_ns, on_ew) {
                    (true, true) => '+',
                    (true, false) => '|',
                    (false, true) => '-',
                    (false, false) => ' ',
                };
            }
        }

        for vehicle in &self.vehicles {
            let pos = vehicle.world_position(&self.geometry);
            if let Some((row, col)) = to_grid(pos.x, pos.y) {
                grid[row][col] = match vehicle.lane.direction {
                    Direction::North => '^',
                    Direction::South => 'v',
                    Direction::East => '>',
                    Direction::West => '<',
                };
            }
        }

        let lights: Vec<String> = self
            .lights()
            .iter()
            .map(|(d, c)| {
                let symbol = match c {
                    LightColor::Green => 'G',
                    LightColor::Yellow => 'Y',
                    LightColor::Red => 'R',
                };
                format!("{}:{}", d.short_name(), symbol)
            })
            .collect();

        let mut out = String::new();
        out.push_str("=== Intersection ===\n");
        out.push_str(&format!(
            "Lights {}  phase {}  {}\n",
            lights.join(" "),
            self.signal.phase_label(),
            self.countdown_label()
        ));
        for line in &grid {
            out.extend(line.iter());
            out.push('\n');
        }
        out
    }
}
