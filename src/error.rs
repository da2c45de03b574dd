/// Error types.
///
/// Only two things can actually fail: reading the scenario document at
/// startup (fatal) and writing the clear flags (logged and ignored).
/// Everything that goes wrong *during* play is absorbed by the engine
/// and turned into an ending.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("could not read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document parsed but is not `protagonist → block → [line]`.
    #[error("malformed scenario: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
