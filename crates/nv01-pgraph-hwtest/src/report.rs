//! Machine-readable run report.

use std::fs;
use std::path::Path;

use hwtest_core::TestOutcome;
use nvidia_nv01_pgraph::FieldMismatch;
use serde::Serialize;

use crate::error::{HwtestError, Result};
use crate::scenarios::Stimulus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub seed: u64,
    pub outcome: TestOutcome,
    pub scenarios: Vec<ScenarioReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub group: &'static str,
    pub name: &'static str,
    pub outcome: TestOutcome,
    /// Iterations actually run, including skipped ones.
    pub iterations: u32,
    pub skipped: u32,
    pub failure: Option<FailureReport>,
}

/// Everything needed to replay and diagnose the first failing iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub iteration: u32,
    /// Seed of the iteration's own random stream.
    pub seed: u64,
    pub stimulus: Option<Stimulus>,
    pub message: String,
    pub diff: Vec<FieldMismatch>,
}

impl Report {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            outcome: TestOutcome::NotApplicable,
            scenarios: Vec::new(),
        }
    }

    pub fn push(&mut self, scenario: ScenarioReport) {
        self.outcome = if self.scenarios.is_empty() {
            scenario.outcome
        } else {
            self.outcome.merge(scenario.outcome)
        };
        self.scenarios.push(scenario);
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|s| s.outcome.is_failure())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| HwtestError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}
