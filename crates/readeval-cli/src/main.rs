//! readeval - evaluate a read correction tool
//!
//! Runs the corrector described by a JSON config while sampling its memory,
//! aligns the corrected reads against a reference with minimap2 and writes
//! `info.json` with runtime, peak memory and per-read accuracies to the
//! output directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use readeval_core::{EvalSettings, Evaluation, Minimap2, MonitorConfig, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "readeval")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "evaluate read correction tool", long_about = None)]
struct Cli {
    /// utf-8 json file with tool configuration
    config: PathBuf,

    /// Reference reads
    #[arg(short, long)]
    reference: PathBuf,

    /// Output folder receiving reads.fa, alignment.sam and info.json
    #[arg(short, long)]
    output: PathBuf,

    /// Number of threads used by the aligner
    #[arg(short, long, default_value_t = 1)]
    threads: u32,

    /// minimap2 binary
    #[arg(long, env = "READEVAL_ALIGNER", default_value = "minimap2")]
    aligner: PathBuf,

    /// Delay between memory samples, in milliseconds
    #[arg(long, env = "READEVAL_POLL_INTERVAL_MS", default_value_t = 10)]
    poll_interval_ms: u64,

    /// Kill the corrector and fail after this many seconds
    #[arg(long, env = "READEVAL_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn monitor_config(&self) -> MonitorConfig {
        let config =
            MonitorConfig::default().with_poll_interval(Duration::from_millis(self.poll_interval_ms));
        match self.timeout_secs {
            Some(secs) => config.with_deadline(Duration::from_secs(secs)),
            None => config,
        }
    }

    fn settings(&self) -> EvalSettings {
        EvalSettings::new(&self.output, &self.reference)
            .with_threads(self.threads)
            .with_monitor(self.monitor_config())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    readeval_core::init_tracing(cli.json, level);

    if let Err(e) = run(&cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = RunConfig::from_json_file(&cli.config)
        .with_context(|| format!("invalid tool configuration {:?}", cli.config))?;

    let settings = cli.settings();
    let aligner = Minimap2::new(&cli.aligner);

    let report = Evaluation::run_and_report(config, &settings, &aligner)
        .await
        .context("evaluation failed")?;

    let run = &report.task_run;
    println!("Report: {}", settings.report_path().display());
    println!("Peak memory: {:.2} MiB", run.peak_memory_mib());
    println!("Runtime: {:.2} s", run.runtime_s());
    println!("Reads scored: {}", run.accuracies().len());
    if let Some(mean) = run.mean_accuracy() {
        println!("Mean accuracy: {:.4}", mean);
    }
    Ok(())
}
