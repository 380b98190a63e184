//! Run configuration.
//!
//! A run is configured from an optional JSON file, then from command-line
//! flags, which override whatever the file set.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HwtestError, Result};

/// Seed used when neither the file nor the command line gives one.
pub const DEFAULT_SEED: u64 = 0x4e56_0001;

/// What the scenarios drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// The software card running the oracle. A dry run: every scenario
    /// should pass, so failures point at the suite rather than silicon.
    #[default]
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub seed: u64,
    /// Multiplier on every scenario's iteration count. Each scenario still
    /// runs at least once.
    pub scale: f64,
    /// Groups to run; empty runs all of them.
    pub groups: Vec<String>,
    /// Scenarios to run; empty runs every scenario of the selected groups.
    pub scenarios: Vec<String>,
    /// Replay a single iteration of each selected scenario.
    pub iteration: Option<u32>,
    pub backend: Backend,
    pub report: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            scale: 1.0,
            groups: Vec::new(),
            scenarios: Vec::new(),
            iteration: None,
            backend: Backend::Simulated,
            report: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| HwtestError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| HwtestError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Iterations to run for a scenario declared with `base` iterations.
    #[must_use]
    pub fn scaled_iterations(&self, base: u32) -> u32 {
        let scaled = (f64::from(base) * self.scale).round();
        if scaled.is_finite() && scaled >= 1.0 {
            scaled.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }
}
