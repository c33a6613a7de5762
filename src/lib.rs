//! Intersection Simulation Library
//!
//! A signalized four-way intersection simulator that runs headless and emits
//! plain snapshots for whatever display layer sits on top.

pub mod simulation;
