//! readeval core library
//!
//! Evaluates a long-read correction tool:
//! - runs the corrector as a child process ([`runner`])
//! - samples its peak resident memory and runtime while it runs ([`monitor`])
//! - aligns the corrected reads against a reference ([`align`])
//! - scores every read from its CIGAR operations ([`accuracy`])
//! - ties it together and writes `info.json` ([`orchestrator`], [`report`])

pub mod accuracy;
pub mod align;
pub mod config;
pub mod error;
pub mod monitor;
pub mod obs;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use accuracy::{reduce_alignment_file, reduce_with_stats, Accuracies, CigarStats, ReductionStats};
pub use align::{Aligner, Minimap2, ALIGNMENT_FILE};
pub use config::{RunConfig, RunConfigFields};
pub use error::{EvalError, Result, ValidationError};
pub use monitor::{
    MemoryProbe, MonitorConfig, MonitorState, ProcStatusProbe, ResourceMonitor, ResourceUsage,
};
pub use orchestrator::{EvalSettings, Evaluation, READS_FILE};
pub use report::{read_report, write_report, EvaluationReport, RunResult, REPORT_FILE};
pub use runner::{spawn_args, ToolRunner};
pub use telemetry::init_tracing;

/// readeval version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
