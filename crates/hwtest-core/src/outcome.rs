//! Scenario and group results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of running a scenario, a group, or a prerequisite check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Every iteration matched the model.
    Pass,
    /// At least one iteration diverged.
    Fail,
    /// The card is not the hardware the test targets.
    NotApplicable,
    /// The card is present but not initialised enough to test.
    Unprepared,
}

impl TestOutcome {
    /// Combine two outcomes: any failure wins, then unprepared, then n/a.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        use TestOutcome::{Fail, NotApplicable, Pass, Unprepared};
        match (self, other) {
            (Fail, _) | (_, Fail) => Fail,
            (Unprepared, _) | (_, Unprepared) => Unprepared,
            (NotApplicable, NotApplicable) => NotApplicable,
            _ => Pass,
        }
    }

    #[must_use]
    pub fn is_failure(self) -> bool {
        self == TestOutcome::Fail
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestOutcome::Pass => "passed",
            TestOutcome::Fail => "FAILED",
            TestOutcome::NotApplicable => "n/a",
            TestOutcome::Unprepared => "unprepared",
        };
        f.write_str(s)
    }
}
