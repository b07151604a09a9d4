//! One monitored evaluation run, end to end.

use std::path::{Path, PathBuf};

use tracing::Instrument;

use crate::accuracy::reduce_alignment_file;
use crate::align::Aligner;
use crate::config::RunConfig;
use crate::error::{EvalError, Result};
use crate::monitor::{MemoryProbe, MonitorConfig, ProcStatusProbe, ResourceMonitor};
use crate::obs;
use crate::report::{write_report, EvaluationReport, RunResult, REPORT_FILE};
use crate::runner::ToolRunner;

/// Name of the corrected reads file inside the output directory.
pub const READS_FILE: &str = "reads.fa";

/// Where and how to evaluate a corrector.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    /// Directory receiving `reads.fa`, `alignment.sam` and `info.json`.
    /// Must not be shared with a concurrent run.
    pub output_dir: PathBuf,

    /// Reference the corrected reads are aligned against.
    pub reference: PathBuf,

    /// Aligner thread count.
    pub threads: u32,

    /// Monitor polling and deadline.
    pub monitor: MonitorConfig,
}

impl EvalSettings {
    pub fn new(output_dir: impl Into<PathBuf>, reference: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            reference: reference.into(),
            threads: 1,
            monitor: MonitorConfig::default(),
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn reads_path(&self) -> PathBuf {
        self.output_dir.join(READS_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }
}

/// Evaluation orchestrator.
pub struct Evaluation;

impl Evaluation {
    /// Run the corrector under the procfs memory monitor, align its output
    /// and score every read.
    pub async fn run(
        config: &RunConfig,
        settings: &EvalSettings,
        aligner: &dyn Aligner,
    ) -> Result<RunResult> {
        Self::run_with_probe(config, settings, aligner, ProcStatusProbe).await
    }

    /// [`Evaluation::run`] with a custom memory probe.
    ///
    /// Steps, none retried, the first failure aborts:
    /// 1. check the reference exists (before anything touches disk)
    /// 2. spawn the corrector with stdout into `reads.fa`
    /// 3. monitor it until exit; a non-zero exit fails the run
    /// 4. align `reads.fa` against the reference
    /// 5. reduce the alignment file to per-read accuracies
    pub async fn run_with_probe<P: MemoryProbe>(
        config: &RunConfig,
        settings: &EvalSettings,
        aligner: &dyn Aligner,
        probe: P,
    ) -> Result<RunResult> {
        let span = obs::eval_span(config.executable(), &settings.output_dir);
        let result = Self::execute(config, settings, aligner, probe)
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            let _entered = span.enter();
            obs::emit_eval_failed(e);
        }
        result
    }

    /// Run the evaluation and persist `info.json`. Nothing is written on failure.
    pub async fn run_and_report(
        config: RunConfig,
        settings: &EvalSettings,
        aligner: &dyn Aligner,
    ) -> Result<EvaluationReport> {
        let task_run = Self::run(&config, settings, aligner).await?;
        let report = EvaluationReport::new(config, task_run);
        write_report(&settings.report_path(), &report)?;
        tracing::info!(report = %settings.report_path().display(), "report written");
        Ok(report)
    }

    async fn execute<P: MemoryProbe>(
        config: &RunConfig,
        settings: &EvalSettings,
        aligner: &dyn Aligner,
        probe: P,
    ) -> Result<RunResult> {
        if !settings.reference.exists() {
            return Err(EvalError::ReferenceNotFound(settings.reference.clone()));
        }

        obs::emit_eval_started(config.executable(), &settings.reference, settings.threads);
        ensure_output_dir(&settings.output_dir)?;

        let reads_path = settings.reads_path();
        let mut child = ToolRunner::spawn(config, &reads_path)?;
        obs::emit_tool_spawned(child.id(), &reads_path);

        let mut monitor = ResourceMonitor::with_probe(settings.monitor, probe);
        let usage = monitor.observe(&mut child).await?;
        obs::emit_tool_exited(usage.exit_status.code(), usage.peak_rss_bytes, usage.runtime);

        if !usage.exit_status.success() {
            return Err(EvalError::ToolFailed {
                executable: config.executable().to_string(),
                exit_code: usage.exit_status.code(),
            });
        }

        let sam_path = aligner
            .align(
                &settings.reference,
                &reads_path,
                settings.threads,
                &settings.output_dir,
            )
            .await?;

        let accuracies = reduce_alignment_file(&sam_path)?;
        let result = RunResult::new(
            usage.peak_memory_mib(),
            usage.runtime_secs(),
            reads_path,
            accuracies,
        )?;

        obs::emit_eval_finished(
            result.peak_memory_mib(),
            result.runtime_s(),
            result.accuracies().len(),
        );
        Ok(result)
    }
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        tracing::info!(output_dir = %dir.display(), "creating output dir");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
