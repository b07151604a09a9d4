//! Run results and the persisted evaluation report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::accuracy::Accuracies;
use crate::config::RunConfig;
use crate::error::{Result, ValidationError};

/// Name of the report file inside the output directory.
pub const REPORT_FILE: &str = "info.json";

/// Validated, immutable outcome of one monitored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RunResultFields")]
pub struct RunResult {
    peak_memory_mib: f64,
    runtime_s: f64,
    reads: PathBuf,
    accuracies: Accuracies,
}

/// Raw run result fields, as read back from a report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResultFields {
    #[serde(alias = "peak_memory_mib")]
    pub peak_memory_mib: f64,
    #[serde(alias = "runtime_s")]
    pub runtime_s: f64,
    pub reads: PathBuf,
    #[serde(default)]
    pub accuracies: Accuracies,
}

impl RunResult {
    /// Validate and build a result.
    ///
    /// Memory and runtime must be non-negative and are rounded to two
    /// decimals; every accuracy must lie in `[0, 1]`.
    pub fn new(
        peak_memory_mib: f64,
        runtime_s: f64,
        reads: PathBuf,
        accuracies: Accuracies,
    ) -> std::result::Result<Self, ValidationError> {
        let peak_memory_mib = non_negative("peak_memory_mib", peak_memory_mib)?;
        let runtime_s = non_negative("runtime_s", runtime_s)?;

        if let Some((read, &value)) = accuracies
            .iter()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(ValidationError::AccuracyOutOfRange {
                read: read.clone(),
                value,
            });
        }

        Ok(Self {
            peak_memory_mib: round2(peak_memory_mib),
            runtime_s: round2(runtime_s),
            reads,
            accuracies,
        })
    }

    pub fn peak_memory_mib(&self) -> f64 {
        self.peak_memory_mib
    }

    pub fn runtime_s(&self) -> f64 {
        self.runtime_s
    }

    pub fn reads(&self) -> &Path {
        &self.reads
    }

    pub fn accuracies(&self) -> &Accuracies {
        &self.accuracies
    }

    /// Mean accuracy over all reads, `None` when nothing aligned.
    pub fn mean_accuracy(&self) -> Option<f64> {
        if self.accuracies.is_empty() {
            return None;
        }
        Some(self.accuracies.values().sum::<f64>() / self.accuracies.len() as f64)
    }
}

impl TryFrom<RunResultFields> for RunResult {
    type Error = ValidationError;

    fn try_from(fields: RunResultFields) -> std::result::Result<Self, Self::Error> {
        Self::new(
            fields.peak_memory_mib,
            fields.runtime_s,
            fields.reads,
            fields.accuracies,
        )
    }
}

fn non_negative(field: &'static str, value: f64) -> std::result::Result<f64, ValidationError> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NegativeValue { field, value })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A run configuration paired with its result; written as `info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub task_config: RunConfig,
    pub task_run: RunResult,
}

impl EvaluationReport {
    pub fn new(task_config: RunConfig, task_run: RunResult) -> Self {
        Self {
            task_config,
            task_run,
        }
    }
}

/// Write `report` as pretty JSON.
pub fn write_report(path: &Path, report: &EvaluationReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Read a report back, re-running validation.
pub fn read_report(path: &Path) -> Result<EvaluationReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
