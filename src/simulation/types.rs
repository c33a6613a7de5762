//! Core types for the intersection simulation
//!
//! Plain value types shared by the signal controller, the kinematics and the
//! spawner. Nothing here knows about rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs, assigned monotonically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub SimId);

/// Direction of travel (not the compass label of the road the vehicle is on)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Index into per-direction arrays
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Two directions cross each other's path when they are perpendicular.
    /// Opposing through-movements share no conflict point since nobody turns.
    pub fn conflicts_with(self, other: Direction) -> bool {
        self != other && self.opposite() != other
    }

    /// Unit vector of travel in planar coordinates (y grows northwards)
    pub fn unit(self) -> (f32, f32) {
        match self {
            Direction::North => (0.0, 1.0),
            Direction::South => (0.0, -1.0),
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
        }
    }

    pub fn short_name(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'E',
            Direction::West => 'W',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "e" | "east" => Ok(Direction::East),
            "w" | "west" => Ok(Direction::West),
            _ => Err(ConfigurationError::UnknownDirection(s.to_string())),
        }
    }
}

/// A lane: direction of travel plus lane index (0 = kerbside)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LaneId {
    pub direction: Direction,
    pub index: u8,
}

impl LaneId {
    pub fn new(direction: Direction, index: u8) -> Self {
        Self { direction, index }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lane {}", self.direction, self.index + 1)
    }
}

/// Type of vehicle; only affects its footprint and how often it spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Truck,
    Bus,
    Taxi,
    Sedan,
    Suv,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 6] = [
        VehicleClass::Car,
        VehicleClass::Sedan,
        VehicleClass::Suv,
        VehicleClass::Taxi,
        VehicleClass::Truck,
        VehicleClass::Bus,
    ];

    /// Length and width in world units
    pub fn dimensions(self) -> Dimensions {
        let (length, width) = match self {
            VehicleClass::Car | VehicleClass::Sedan | VehicleClass::Taxi => (7.0, 3.5),
            VehicleClass::Suv => (8.0, 3.8),
            VehicleClass::Truck => (12.0, 4.2),
            VehicleClass::Bus => (14.0, 4.2),
        };
        Dimensions { length, width }
    }

    /// Relative spawn weight; heavy vehicles stay a minority
    pub fn spawn_weight(self) -> u32 {
        match self {
            VehicleClass::Car => 30,
            VehicleClass::Sedan => 25,
            VehicleClass::Suv => 18,
            VehicleClass::Taxi => 15,
            VehicleClass::Truck => 6,
            VehicleClass::Bus => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub length: f32,
    pub width: f32,
}

/// Color shown to one approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

/// Whether a vehicle is currently rolling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Moving,
    Stopped,
}

/// A 2D position in the simulation, origin at the centre of the intersection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Speed gained per tick when nothing is in the way
pub const ACCELERATION: f32 = 0.02;

/// Speed shed per tick when a stop is required
pub const BRAKING: f32 = 0.05;

/// Below this speed a vehicle counts as stopped
pub const STOPPED_EPSILON: f32 = 0.01;

/// How far past the stop line a front bumper must be before the vehicle is committed
pub const LINE_TOLERANCE: f32 = 1e-3;

/// Extra distance past the far side of the simulated area before a vehicle is removed
pub const EXIT_MARGIN: f32 = 20.0;

/// Lateral distance between adjacent lane centres
pub const LANE_WIDTH: f32 = 5.0;

/// Distance needed to come to rest from `speed`, including one tick of reaction.
pub fn braking_distance(speed: f32) -> f32 {
    let speed = speed.max(0.0);
    speed * speed / (2.0 * BRAKING) + speed
}

/// Distance actually covered when braking by [`BRAKING`] every tick from `speed` to rest.
pub fn stopping_distance(speed: f32) -> f32 {
    let speed = speed.max(0.0);
    let steps = (speed / BRAKING).floor();
    steps * speed - BRAKING * steps * (steps + 1.0) / 2.0
}

/// Distance covered in `ticks` ticks when accelerating from `speed` towards
/// `target_speed` by [`ACCELERATION`] per tick.
pub fn reachable_distance(speed: f32, target_speed: f32, ticks: f32) -> f32 {
    if ticks <= 0.0 {
        return 0.0;
    }
    if ticks.is_infinite() {
        return f32::INFINITY;
    }
    let ramp = ((target_speed - speed).max(0.0) / ACCELERATION).ceil().min(ticks);
    let ramp_distance = ramp * speed + ACCELERATION * ramp * (ramp + 1.0) / 2.0;
    ramp_distance.min(ramp * target_speed) + (ticks - ramp) * target_speed
}
