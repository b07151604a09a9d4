//! Error taxonomy for readeval.

use std::path::PathBuf;

/// Errors produced while validating a run configuration or a run result.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid executable {value:?}: expected at least one word character")]
    InvalidExecutable { value: String },

    #[error("error threshold {value} out of range: must be in [0, 1)")]
    ErrorThresholdOutOfRange { value: f64 },

    #[error("thread count must be at least 1, got {value}")]
    InvalidThreads { value: u32 },

    #[error("{field} does not exist on disk: {}", .path.display())]
    MissingInput { field: &'static str, path: PathBuf },

    #[error("{field} has to be greater or equal to 0, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("accuracy of read {read} out of range: {value}")]
    AccuracyOutOfRange { read: String, value: f64 },
}

/// Errors produced by an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("config validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("could not find reference on the disk: {}", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("failed to spawn {executable}: {source}")]
    ProcessSpawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{executable} exited with {}", describe_exit(.exit_code))]
    ToolFailed {
        executable: String,
        exit_code: Option<i32>,
    },

    #[error("run timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },

    #[error("alignment failed: {0}")]
    Alignment(String),

    #[error("could not read alignment records from {}: {source}", .path.display())]
    AlignmentRead {
        path: PathBuf,
        #[source]
        source: rust_htslib::errors::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Result type for readeval operations.
pub type Result<T> = std::result::Result<T, EvalError>;
