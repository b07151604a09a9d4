//! Structured lifecycle events for an evaluation run.
//!
//! Every event carries a stable `event` field, so runs can be
//! followed in plain or JSON logs (`--json`).

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::monitor::MonitorState;

/// Span tagged with the corrector and output directory of one run.
///
/// Attach it to the run future with `tracing::Instrument` so the fields
/// follow the run across await points:
///
/// ```ignore
/// evaluate(..).instrument(eval_span("racon", Path::new("out"))).await
/// ```
pub fn eval_span(executable: &str, output_dir: &Path) -> tracing::Span {
    tracing::info_span!(
        "readeval.run",
        executable = %executable,
        output_dir = %output_dir.display(),
    )
}

/// Emit event: evaluation started.
pub fn emit_eval_started(executable: &str, reference: &Path, threads: u32) {
    info!(
        event = "eval.started",
        executable = %executable,
        reference = %reference.display(),
        threads = threads,
    );
}

/// Emit event: the corrector process was spawned.
pub fn emit_tool_spawned(pid: Option<u32>, reads: &Path) {
    info!(event = "tool.spawned", pid = ?pid, reads = %reads.display());
}

/// Emit event: the resource monitor changed state.
pub fn emit_monitor_state(state: MonitorState) {
    tracing::debug!(event = "monitor.state", state = ?state);
}

/// Emit event: the corrector exited.
pub fn emit_tool_exited(exit_code: Option<i32>, peak_rss_bytes: u64, runtime: Duration) {
    info!(
        event = "tool.exited",
        exit_code = ?exit_code,
        peak_rss_bytes = peak_rss_bytes,
        runtime_ms = runtime.as_millis() as u64,
    );
}

/// Emit event: the aligner produced an alignment file.
pub fn emit_alignment_finished(sam: &Path, duration: Duration) {
    info!(
        event = "alignment.finished",
        sam = %sam.display(),
        duration_ms = duration.as_millis() as u64,
    );
}

/// Emit event: alignment records were reduced to per-read accuracies.
pub fn emit_accuracy_reduced(records: u64, unmapped: u64, duplicates: u64, reads: usize) {
    info!(
        event = "accuracy.reduced",
        records = records,
        unmapped = unmapped,
        duplicates = duplicates,
        reads = reads,
    );
}

/// Emit event: evaluation finished with its headline numbers.
pub fn emit_eval_finished(peak_memory_mib: f64, runtime_s: f64, reads: usize) {
    info!(
        event = "eval.finished",
        peak_memory_mib = peak_memory_mib,
        runtime_s = runtime_s,
        reads = reads,
    );
}

/// Emit event: evaluation aborted (warning level).
pub fn emit_eval_failed(error: &dyn std::fmt::Display) {
    tracing::warn!(event = "eval.failed", error = %error);
}
