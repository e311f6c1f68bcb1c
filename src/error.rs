//! Error type shared by every layer of the engine.

use thiserror::Error;

/// All failures the engine can report.
///
/// Logical dead ends (unreachable node, no connector found) are not errors;
/// they surface as empty traversal results.
#[derive(Debug, Error)]
pub enum WireGraphError {
    /// A dataset required to build the indexes was not supplied.
    #[error("missing dataset: {0}")]
    MissingDataset(&'static str),

    /// A single request was malformed (for example, no start node).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A query arrived before the indexes were built.
    #[error("indexes have not been built")]
    IndexNotBuilt,

    /// Configuration failed validation.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The batch was cancelled before this item ran.
    #[error("cancelled before processing")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WireGraphError>;
