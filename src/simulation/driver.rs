//! Single scheduler for the simulation
//!
//! Physics runs every frame; the signal clock is a second logical clock fed
//! from the same frame times, so both only ever mutate the world from one
//! place. Operator commands queue up on a channel and are applied between
//! frames, never in the middle of one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use super::config::SimConfig;
use super::types::Direction;
use super::world::SimWorld;

/// Length of one signal clock tick
pub const PHASE_TICK_MS: f64 = 1000.0;

/// Default physics frame length
pub const DEFAULT_FRAME_MS: f32 = 33.0;

/// Turns frame times into whole signal-clock seconds
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    accumulated_ms: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one physics frame, then age the signal by every whole second that
    /// has built up. Returns the number of phase transitions.
    pub fn frame(&mut self, world: &mut SimWorld, dt_ms: f32) -> u32 {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        world.tick(dt_ms);

        self.accumulated_ms += f64::from(dt_ms);
        let whole_seconds = (self.accumulated_ms / PHASE_TICK_MS).floor();
        if whole_seconds < 1.0 {
            return 0;
        }
        self.accumulated_ms -= whole_seconds * PHASE_TICK_MS;
        world.advance_phase_clock(whole_seconds as u32)
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
    }
}

/// Operator input, applied between frames
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Configure(SimConfig),
    SetManualPhase(Direction),
    AllRed,
    SetAutoMode(bool),
    Reset,
}

/// Cloneable handle for talking to a running [`SimDriver`]
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: Sender<Command>,
    stop: Arc<AtomicBool>,
}

impl DriverHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .context("Simulation driver has shut down")
    }

    /// Ask the driver to stop. No frame starts after this returns.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Owns the world and runs it frame by frame
pub struct SimDriver {
    world: SimWorld,
    clock: SimClock,
    frame_ms: f32,
    commands: Receiver<Command>,
    stop: Arc<AtomicBool>,
}

impl SimDriver {
    pub fn new(world: SimWorld, frame_ms: f32) -> (Self, DriverHandle) {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = DriverHandle {
            commands: sender,
            stop: stop.clone(),
        };
        let driver = Self {
            world,
            clock: SimClock::new(),
            frame_ms,
            commands: receiver,
            stop,
        };
        (driver, handle)
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn into_world(self) -> SimWorld {
        self.world
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn apply(&mut self, command: Command) {
        let outcome = match command {
            Command::Configure(config) => self.world.configure(config),
            Command::SetManualPhase(direction) => self.world.set_manual_phase(direction),
            Command::AllRed => self.world.set_manual_all_red(),
            Command::SetAutoMode(automatic) => {
                self.world.set_auto_mode(automatic);
                Ok(())
            }
            Command::Reset => {
                self.world.reset();
                self.clock.reset();
                Ok(())
            }
        };
        if let Err(err) = outcome {
            warn!("Rejected operator command: {err}");
        }
    }

    /// Apply everything queued so far
    fn apply_pending(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Run a single frame unless stopped. Returns whether a frame ran.
    pub fn step(&mut self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.apply_pending();
        self.clock.frame(&mut self.world, self.frame_ms);
        true
    }

    /// Run until stopped or `max_frames` have run, calling `on_frame` after
    /// each one. With `realtime` set each frame is paced to `frame_ms` of
    /// wall time. Returns the number of frames run.
    pub fn run<F>(&mut self, max_frames: Option<u64>, realtime: bool, mut on_frame: F) -> u64
    where
        F: FnMut(&SimWorld, u64),
    {
        let pace = Duration::from_secs_f32(self.frame_ms.max(0.0) / 1000.0);
        let mut frames = 0;

        while max_frames.map_or(true, |max| frames < max) {
            if !self.step() {
                break;
            }
            frames += 1;
            on_frame(&self.world, frames);
            if realtime {
                std::thread::sleep(pace);
            }
        }

        info!("Driver finished after {frames} frames");
        frames
    }
}
