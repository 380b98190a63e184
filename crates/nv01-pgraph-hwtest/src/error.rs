use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HwtestError>;

/// Errors that stop a run before or after it executes. A card that does not
/// match the model is a failed scenario, not an error.
#[derive(Debug, Error)]
pub enum HwtestError {
    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown group {0:?}")]
    UnknownGroup(String),

    #[error("unknown scenario {0:?}")]
    UnknownScenario(String),

    #[error("iteration {iteration} is out of range for {scenario} ({iterations} iterations)")]
    IterationOutOfRange {
        scenario: String,
        iteration: u32,
        iterations: u32,
    },

    #[error("cannot write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode report: {0}")]
    ReportEncode(#[from] serde_json::Error),
}
