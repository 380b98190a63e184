//! Randomized register-level regression suite for the NV1 graphics engine.
//!
//! Scenarios are grouped the way the engine is: register scans, state
//! round trips, methods common to every object, single-value context
//! methods, vertex methods and raster operations. Every iteration loads a
//! random engine state, applies one stimulus and compares the dumped card
//! against the oracle's prediction.

pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenarios;

pub use hwtest_core::TestOutcome;

pub use config::{Backend, Config, DEFAULT_SEED};
pub use error::{HwtestError, Result};
pub use report::{FailureReport, Report, ScenarioReport};
pub use runner::{iteration_seed, prepare, run, run_scenario, select};
pub use scenarios::{GROUPS, Group, Scenario, Step, StepOutcome, Stimulus};
