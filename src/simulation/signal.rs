//! Signal phase state machine
//!
//! A [`SignalPlan`] lists mutually exclusive direction groups in cycle order,
//! so a two-way intersection and a four-phase one are just different plans
//! driven by the same [`SignalController`]. The light of every approach is
//! always recomputed from the current [`Phase`]; nothing ever flips a single
//! light on its own, which is what keeps conflicting greens unreachable.

use log::{debug, info, warn};
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize, Serializer};

use super::config::SimConfig;
use super::error::ConfigurationError;
use super::types::{Direction, LightColor};

/// Groups of directions that may be green together, in the order they are served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPlan {
    groups: Vec<Vec<Direction>>,
}

impl Default for SignalPlan {
    fn default() -> Self {
        Self::two_way()
    }
}

impl SignalPlan {
    pub fn new(groups: Vec<Vec<Direction>>) -> Result<Self, ConfigurationError> {
        let plan = Self { groups };
        plan.validate()?;
        Ok(plan)
    }

    /// North/South against East/West
    pub fn two_way() -> Self {
        Self {
            groups: vec![
                vec![Direction::North, Direction::South],
                vec![Direction::East, Direction::West],
            ],
        }
    }

    /// One approach at a time: N, S, E, W
    pub fn four_phase() -> Self {
        Self {
            groups: Direction::ALL.iter().map(|d| vec![*d]).collect(),
        }
    }

    pub fn groups(&self) -> &[Vec<Direction>] {
        &self.groups
    }

    /// The group serving `direction`, if any
    pub fn group_of(&self, direction: Direction) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&direction))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.groups.is_empty() {
            return Err(ConfigurationError::EmptyPlan);
        }

        let conflicts = conflict_graph();
        let mut seen = [false; 4];
        for (idx, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                return Err(ConfigurationError::EmptyGroup(idx));
            }
            for (i, &a) in group.iter().enumerate() {
                if seen[a.index()] {
                    return Err(ConfigurationError::DuplicateDirection(a));
                }
                seen[a.index()] = true;
                if let Some(&b) = group[i + 1..].iter().find(|&&b| conflicts.contains_edge(a, b)) {
                    return Err(ConfigurationError::ConflictingGroup { group: idx, a, b });
                }
            }
        }
        Ok(())
    }

    /// Label like "NS" used in phase names
    fn group_label(&self, group: usize) -> String {
        self.groups[group].iter().map(|d| d.short_name()).collect()
    }
}

/// Pairs of directions whose paths cross inside the box
pub fn conflict_graph() -> UnGraphMap<Direction, ()> {
    let mut graph: UnGraphMap<Direction, ()> = UnGraphMap::new();
    for a in Direction::ALL {
        graph.add_node(a);
        for b in Direction::ALL {
            if a < b && a.conflicts_with(b) {
                graph.add_edge(a, b, ());
            }
        }
    }
    graph
}

/// Color of every approach at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    colors: [LightColor; 4],
}

impl LightState {
    pub fn all_red() -> Self {
        Self {
            colors: [LightColor::Red; 4],
        }
    }

    /// Every direction of `group` shows `color`, everything else red
    fn for_group(plan: &SignalPlan, group: usize, color: LightColor) -> Self {
        let mut lights = Self::all_red();
        for direction in &plan.groups[group] {
            lights.colors[direction.index()] = color;
        }
        lights
    }

    pub fn get(&self, direction: Direction) -> LightColor {
        self.colors[direction.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, LightColor)> + '_ {
        Direction::ALL.iter().map(|d| (*d, self.get(*d)))
    }

    /// First pair of conflicting directions that are both green, if any
    pub fn conflicting_greens(
        &self,
        conflicts: &UnGraphMap<Direction, ()>,
    ) -> Option<(Direction, Direction)> {
        conflicts
            .all_edges()
            .find(|(a, b, _)| {
                self.get(*a) == LightColor::Green && self.get(*b) == LightColor::Green
            })
            .map(|(a, b, _)| (a, b))
    }
}

impl Serialize for LightState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// State of the cycle; the group index refers into the active plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Green(usize),
    Yellow(usize),
    AllRed { next: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    Automatic,
    Manual,
}

/// Timings captured from the config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timings {
    green: u32,
    yellow: u32,
    clearance: u32,
}

impl Timings {
    fn from_config(config: &SimConfig) -> Self {
        Self {
            green: config.green_duration,
            yellow: config.yellow_duration,
            clearance: config.red_duration,
        }
    }
}

/// Drives the plan through GREEN -> YELLOW -> [ALL_RED] -> next GREEN
pub struct SignalController {
    plan: SignalPlan,
    conflicts: UnGraphMap<Direction, ()>,
    timings: Timings,
    phase: Phase,
    /// Whole seconds until the next automatic transition
    remaining: u32,
    mode: SignalMode,
}

impl SignalController {
    /// Build a controller in its initial state. The config must already be validated.
    pub fn new(config: &SimConfig) -> Self {
        let timings = Timings::from_config(config);
        Self {
            plan: config.signal_plan.clone(),
            conflicts: conflict_graph(),
            timings,
            phase: Phase::Green(0),
            remaining: timings.green,
            mode: SignalMode::Automatic,
        }
    }

    /// Pick up new durations; the running countdown is left alone and the
    /// new values apply from the next transition.
    pub fn set_timings(&mut self, config: &SimConfig) {
        self.timings = Timings::from_config(config);
    }

    /// Back to the first group, green, automatic
    pub fn reset(&mut self) {
        self.phase = Phase::Green(0);
        self.remaining = self.timings.green;
        self.mode = SignalMode::Automatic;
    }

    pub fn plan(&self) -> &SignalPlan {
        &self.plan
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Seconds until the next automatic transition, or `None` while the
    /// operator holds the signal and nothing is counting down.
    pub fn countdown(&self) -> Option<u32> {
        match self.mode {
            SignalMode::Automatic => Some(self.remaining),
            SignalMode::Manual => None,
        }
    }

    /// Whole seconds the current phase is certain to last. The second in
    /// progress may already be nearly used up, so it is not counted.
    pub fn certain_seconds(&self) -> Option<u32> {
        self.countdown().map(|secs| secs.saturating_sub(1))
    }

    pub fn lights(&self) -> LightState {
        let lights = match self.phase {
            Phase::Green(group) => LightState::for_group(&self.plan, group, LightColor::Green),
            Phase::Yellow(group) => LightState::for_group(&self.plan, group, LightColor::Yellow),
            Phase::AllRed { .. } => LightState::all_red(),
        };
        debug_assert!(lights.conflicting_greens(&self.conflicts).is_none());
        lights
    }

    pub fn color(&self, direction: Direction) -> LightColor {
        self.lights().get(direction)
    }

    /// Whether any two conflicting approaches are green right now
    pub fn conflicting_greens(&self) -> Option<(Direction, Direction)> {
        self.lights().conflicting_greens(&self.conflicts)
    }

    /// Name of the current phase, e.g. `NS_GREEN` or `ALL_RED`
    pub fn phase_label(&self) -> String {
        match self.phase {
            Phase::Green(group) => format!("{}_GREEN", self.plan.group_label(group)),
            Phase::Yellow(group) => format!("{}_YELLOW", self.plan.group_label(group)),
            Phase::AllRed { .. } => "ALL_RED".to_string(),
        }
    }

    /// Age the countdown by whole seconds. Returns the number of transitions made.
    /// Does nothing in manual mode.
    pub fn advance(&mut self, elapsed_seconds: u32) -> u32 {
        if self.mode == SignalMode::Manual {
            return 0;
        }

        let mut transitions = 0;
        for _ in 0..elapsed_seconds {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.transition();
                transitions += 1;
            }
        }
        transitions
    }

    fn next_group(&self, group: usize) -> usize {
        (group + 1) % self.plan.groups.len()
    }

    fn transition(&mut self) {
        let (phase, remaining) = match self.phase {
            Phase::Green(group) => (Phase::Yellow(group), self.timings.yellow),
            Phase::Yellow(group) => {
                let next = self.next_group(group);
                if self.timings.clearance > 0 {
                    (Phase::AllRed { next }, self.timings.clearance)
                } else {
                    (Phase::Green(next), self.timings.green)
                }
            }
            Phase::AllRed { next } => (Phase::Green(next), self.timings.green),
        };
        self.phase = phase;
        self.remaining = remaining;
        info!("Signal phase -> {} ({}s)", self.phase_label(), self.remaining);
    }

    /// Switch between automatic cycling and operator control.
    ///
    /// Leaving manual mode restarts the countdown of whatever phase the
    /// operator left in place.
    pub fn set_auto_mode(&mut self, automatic: bool) {
        let mode = if automatic {
            SignalMode::Automatic
        } else {
            SignalMode::Manual
        };
        if mode == self.mode {
            return;
        }
        self.mode = mode;

        if automatic {
            match self.phase {
                Phase::Green(_) => self.remaining = self.timings.green,
                Phase::Yellow(_) => self.remaining = self.timings.yellow,
                Phase::AllRed { next } if self.timings.clearance == 0 => {
                    self.phase = Phase::Green(next);
                    self.remaining = self.timings.green;
                }
                Phase::AllRed { .. } => self.remaining = self.timings.clearance,
            }
        }
        info!(
            "Signal mode -> {:?}, phase {} ({}s)",
            self.mode,
            self.phase_label(),
            self.remaining
        );
    }

    /// Give right of way to the group serving `direction`; every other
    /// approach goes red in the same step.
    pub fn request_green(&mut self, direction: Direction) -> Result<(), ConfigurationError> {
        if self.mode != SignalMode::Manual {
            warn!("Ignoring manual request for {direction}: signal is automatic");
            return Err(ConfigurationError::ManualModeRequired);
        }
        let group = self
            .plan
            .group_of(direction)
            .ok_or(ConfigurationError::DirectionNotInPlan(direction))?;

        self.phase = Phase::Green(group);
        debug!("Manual request for {direction} -> {}", self.phase_label());
        Ok(())
    }

    /// Operator stop: every approach red
    pub fn request_all_red(&mut self) -> Result<(), ConfigurationError> {
        if self.mode != SignalMode::Manual {
            warn!("Ignoring manual all-red request: signal is automatic");
            return Err(ConfigurationError::ManualModeRequired);
        }
        let next = match self.phase {
            Phase::Green(group) | Phase::Yellow(group) => self.next_group(group),
            Phase::AllRed { next } => next,
        };
        self.phase = Phase::AllRed { next };
        debug!("Manual request -> ALL_RED");
        Ok(())
    }
}
