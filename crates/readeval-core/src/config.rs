//! Corrector run configuration.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

fn executable_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Validated, immutable description of one corrector invocation.
///
/// Construct through [`RunConfig::new`] or [`RunConfig::from_json_file`];
/// deserialization runs the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RunConfigFields")]
pub struct RunConfig {
    executable: String,
    threads: u32,
    window_length: u32,
    error_threshold: f64,
    reads_path: PathBuf,
    overlaps_path: PathBuf,
}

/// Raw, unvalidated config fields as they appear in the JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfigFields {
    #[serde(alias = "exe")]
    pub executable: String,
    pub threads: u32,
    #[serde(alias = "window_length")]
    pub window_length: u32,
    #[serde(alias = "error_threshold")]
    pub error_threshold: f64,
    #[serde(alias = "reads_path")]
    pub reads_path: PathBuf,
    #[serde(alias = "overlaps_path")]
    pub overlaps_path: PathBuf,
}

impl RunConfig {
    /// Validate `fields` and build a config.
    ///
    /// Fails when the executable has no word character, the error threshold
    /// is outside `[0, 1)`, the thread count is zero, or an input file is
    /// missing.
    pub fn new(fields: RunConfigFields) -> std::result::Result<Self, ValidationError> {
        if !executable_token().is_match(&fields.executable) {
            return Err(ValidationError::InvalidExecutable {
                value: fields.executable,
            });
        }

        if !(0.0..1.0).contains(&fields.error_threshold) {
            return Err(ValidationError::ErrorThresholdOutOfRange {
                value: fields.error_threshold,
            });
        }

        if fields.threads == 0 {
            return Err(ValidationError::InvalidThreads {
                value: fields.threads,
            });
        }

        check_exists("reads_path", &fields.reads_path)?;
        check_exists("overlaps_path", &fields.overlaps_path)?;

        Ok(Self {
            executable: fields.executable,
            threads: fields.threads,
            window_length: fields.window_length,
            error_threshold: fields.error_threshold,
            reads_path: fields.reads_path,
            overlaps_path: fields.overlaps_path,
        })
    }

    /// Load and validate a UTF-8 JSON config file.
    ///
    /// Validation failures surface as [`EvalError::Validation`](crate::EvalError::Validation),
    /// malformed JSON as [`EvalError::Serialization`](crate::EvalError::Serialization).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fields: RunConfigFields = serde_json::from_str(&content)?;
        Ok(Self::new(fields)?)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn window_length(&self) -> u32 {
        self.window_length
    }

    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    pub fn reads_path(&self) -> &Path {
        &self.reads_path
    }

    pub fn overlaps_path(&self) -> &Path {
        &self.overlaps_path
    }
}

impl TryFrom<RunConfigFields> for RunConfig {
    type Error = ValidationError;

    fn try_from(fields: RunConfigFields) -> std::result::Result<Self, Self::Error> {
        Self::new(fields)
    }
}

fn check_exists(field: &'static str, path: &Path) -> std::result::Result<(), ValidationError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ValidationError::MissingInput {
            field,
            path: path.to_path_buf(),
        })
    }
}
