//! Corrector process launch.

use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::RunConfig;
use crate::error::{EvalError, Result};

/// Build the corrector's argument list, executable first.
///
/// The reads path appears twice: once as the read set the overlaps refer to
/// and once as the correction target.
pub fn spawn_args(config: &RunConfig) -> Vec<String> {
    let reads = config.reads_path().display().to_string();
    vec![
        config.executable().to_string(),
        "--threads".to_string(),
        config.threads().to_string(),
        "--window-length".to_string(),
        config.window_length().to_string(),
        "--error-threshold".to_string(),
        config.error_threshold().to_string(),
        reads.clone(),
        config.overlaps_path().display().to_string(),
        reads,
        "-f".to_string(),
    ]
}

/// Launches the corrector with stdout redirected to a file.
pub struct ToolRunner;

impl ToolRunner {
    /// Spawn the corrector described by `config`.
    ///
    /// `stdout_path` is created or truncated and receives the corrected reads.
    /// Stderr is inherited. The child is killed if the handle is dropped
    /// before it is awaited, so an aborted run never leaves it behind.
    pub fn spawn(config: &RunConfig, stdout_path: &Path) -> Result<Child> {
        let args = spawn_args(config);
        let exe = config.executable();

        let stdout = File::create(stdout_path)?;

        tracing::debug!(command = ?args, stdout = %stdout_path.display(), "spawning corrector");

        Command::new(exe)
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EvalError::ProcessSpawn {
                executable: exe.to_string(),
                source,
            })
    }
}
