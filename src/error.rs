//! The crate-wide error type. Every fallible operation in the core returns
//! [`Result`]; the CLI boundary is the only place these are rendered to
//! the user.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing file, malformed document, or failed semantic validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Parse failure loading the runtime state file, or a write failure.
    #[error("state error: {0}")]
    State(String),

    /// Transport failure on connect, or a response timeout.
    #[error("server unavailable: {0}")]
    ServerUnavailable(String),

    /// The server returned an error envelope for a request.
    #[error("server error {code}: {message}")]
    ServerError { code: i64, message: String },

    /// Layout id not found, focused cell empty, too few windows for a
    /// split adjustment, etc. Reported back to the caller; no state
    /// mutation persists.
    #[error("{0}")]
    MissingEntity(String),

    /// A directional focus/send command had no target and wrap was not
    /// requested. Non-fatal; callers should surface this as a no-op.
    #[error("no window in that direction")]
    NoDirectionalTarget,

    /// Every placement in an `apply` batch failed.
    #[error("all {0} window placements failed")]
    AllPlacementsFailed(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
