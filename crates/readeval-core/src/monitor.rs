//! Resource monitoring for a running corrector.
//!
//! [`ResourceMonitor::observe`] drives a single poll loop on the calling task:
//! each iteration checks whether the child has exited, samples its resident
//! memory through a [`MemoryProbe`], enforces the optional deadline and then
//! sleeps for the poll interval. No extra threads are spawned.
//!
//! State transitions: `Spawned -> Monitoring -> Exited`, or `-> Failed` when
//! the deadline expires or waiting on the child errors.

use std::process::ExitStatus;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Child;

use crate::error::{EvalError, Result};
use crate::obs;

/// Default delay between two memory samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

const BYTES_PER_MIB: f64 = (1u64 << 20) as f64;

/// Polling behaviour of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between two polls.
    pub poll_interval: Duration,

    /// Wall-clock limit after which the child is killed. `None` waits forever.
    pub deadline: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

impl MonitorConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Lifecycle of one monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Spawned,
    Monitoring,
    Exited,
    Failed,
}

/// Source of resident-memory samples for a process.
pub trait MemoryProbe: Send + Sync {
    /// Current resident set size of `pid`, in bytes.
    fn resident_bytes(&self, pid: u32) -> std::io::Result<u64>;
}

/// Reads `VmRSS` from `/proc/<pid>/status`.
///
/// Without procfs every sample fails and the peak stays at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcStatusProbe;

impl MemoryProbe for ProcStatusProbe {
    fn resident_bytes(&self, pid: u32) -> std::io::Result<u64> {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status"))?;
        parse_vm_rss(&status).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("no VmRSS entry for pid {pid}"),
            )
        })
    }
}

/// Extract `VmRSS` (reported in kB) from a procfs status file, in bytes.
///
/// Zombies and kernel threads have no `VmRSS` line.
pub fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line["VmRSS:".len()..].split_whitespace().next()?.parse().ok()?;
    Some(kib * 1024)
}

/// Metrics observed over the lifetime of one process.
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    /// Largest resident-memory sample, in bytes (0 if no sample succeeded).
    pub peak_rss_bytes: u64,

    /// Time from monitoring start to the last poll that saw the process alive.
    pub runtime: Duration,

    /// Number of successful memory samples.
    pub samples: u64,

    /// How the process ended.
    pub exit_status: ExitStatus,
}

impl ResourceUsage {
    pub fn peak_memory_mib(&self) -> f64 {
        self.peak_rss_bytes as f64 / BYTES_PER_MIB
    }

    pub fn runtime_secs(&self) -> f64 {
        self.runtime.as_secs_f64()
    }
}

/// Samples a child's memory until it exits.
pub struct ResourceMonitor<P = ProcStatusProbe> {
    config: MonitorConfig,
    probe: P,
    state: MonitorState,
}

impl ResourceMonitor<ProcStatusProbe> {
    /// Monitor backed by procfs.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_probe(config, ProcStatusProbe)
    }
}

impl<P: MemoryProbe> ResourceMonitor<P> {
    /// Monitor backed by a custom probe.
    pub fn with_probe(config: MonitorConfig, probe: P) -> Self {
        Self {
            config,
            probe,
            state: MonitorState::Spawned,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn transition(&mut self, state: MonitorState) {
        self.state = state;
        obs::emit_monitor_state(state);
    }

    /// Poll `child` until it exits, tracking peak memory and runtime.
    ///
    /// A failed sample is skipped. When the deadline passes, the child is
    /// killed and [`EvalError::Timeout`] is returned. The exit status is
    /// reported as-is; judging it is up to the caller.
    pub async fn observe(&mut self, child: &mut Child) -> Result<ResourceUsage> {
        let time_begin = Instant::now();
        let mut time_end = Duration::ZERO;
        let mut peak_rss_bytes = 0u64;
        let mut samples = 0u64;

        self.transition(MonitorState::Monitoring);

        loop {
            match child.try_wait() {
                Ok(Some(exit_status)) => {
                    self.transition(MonitorState::Exited);
                    return Ok(ResourceUsage {
                        peak_rss_bytes,
                        runtime: time_end,
                        samples,
                        exit_status,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    self.transition(MonitorState::Failed);
                    return Err(EvalError::Io(e));
                }
            }

            time_end = time_begin.elapsed();

            if let Some(pid) = child.id() {
                match self.probe.resident_bytes(pid) {
                    Ok(bytes) => {
                        samples += 1;
                        peak_rss_bytes = peak_rss_bytes.max(bytes);
                    }
                    Err(e) => tracing::trace!(pid, error = %e, "skipping memory sample"),
                }
            }

            if let Some(deadline) = self.config.deadline {
                if time_end >= deadline {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill timed out process");
                    }
                    self.transition(MonitorState::Failed);
                    return Err(EvalError::Timeout {
                        elapsed_ms: time_end.as_millis() as u64,
                        limit_ms: deadline.as_millis() as u64,
                    });
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::process::Command;

    /// Replays a fixed list of samples, then fails every later poll.
    struct ScriptedProbe {
        samples: Vec<Option<u64>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(samples: Vec<Option<u64>>) -> Self {
            Self {
                samples,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn resident_bytes(&self, _pid: u32) -> std::io::Result<u64> {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            match self.samples.get(n).copied().flatten() {
                Some(bytes) => Ok(bytes),
                None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
            }
        }
    }

    struct FailingProbe;

    impl MemoryProbe for FailingProbe {
        fn resident_bytes(&self, _pid: u32) -> std::io::Result<u64> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
        }
    }

    fn sleeper(secs: &str) -> Child {
        Command::new("sleep")
            .arg(secs)
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sleep")
    }

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tracon\nVmPeak:\t  9000 kB\nVmRSS:\t    1234 kB\nThreads:\t4\n";
        assert_eq!(parse_vm_rss(status), Some(1234 * 1024));
    }

    #[test]
    fn test_parse_vm_rss_missing() {
        assert_eq!(parse_vm_rss("Name:\tzombie\nState:\tZ (zombie)\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tgarbage kB\n"), None);
    }

    #[test]
    fn test_monitor_config_default() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(cfg.deadline.is_none());

        let cfg = cfg
            .with_poll_interval(Duration::from_millis(50))
            .with_deadline(Duration::from_secs(5));
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
        assert_eq!(cfg.deadline, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_peak_memory_mib() {
        let usage = ResourceUsage {
            peak_rss_bytes: 3 * 1024 * 1024 / 2,
            runtime: Duration::from_millis(1500),
            samples: 1,
            exit_status: std::process::Command::new("true").status().unwrap(),
        };
        assert_eq!(usage.peak_memory_mib(), 1.5);
        assert_eq!(usage.runtime_secs(), 1.5);
    }

    #[tokio::test]
    async fn test_monitor_tracks_maximum_and_skips_failed_samples() {
        let mut child = sleeper("0.3");
        let probe = ScriptedProbe::new(vec![None, Some(5), Some(10), None, Some(7)]);
        let mut monitor = ResourceMonitor::with_probe(MonitorConfig::default(), probe);
        assert_eq!(monitor.state(), MonitorState::Spawned);

        let usage = monitor.observe(&mut child).await.expect("observe");
        assert_eq!(monitor.state(), MonitorState::Exited);
        assert_eq!(usage.peak_rss_bytes, 10);
        assert_eq!(usage.samples, 3);
        assert!(usage.exit_status.success());
        assert!(usage.runtime >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_monitor_without_samples_reports_zero_peak() {
        let mut child = sleeper("0.05");
        let mut monitor = ResourceMonitor::with_probe(MonitorConfig::default(), FailingProbe);
        let usage = monitor.observe(&mut child).await.expect("observe");
        assert_eq!(usage.peak_rss_bytes, 0);
        assert_eq!(usage.samples, 0);
        assert_eq!(usage.peak_memory_mib(), 0.0);
    }

    #[tokio::test]
    async fn test_monitor_reports_failing_exit_status() {
        let mut child = Command::new("false").spawn().expect("spawn false");
        let mut monitor = ResourceMonitor::with_probe(MonitorConfig::default(), FailingProbe);
        let usage = monitor.observe(&mut child).await.expect("observe");
        assert!(!usage.exit_status.success());
        assert_eq!(monitor.state(), MonitorState::Exited);
    }

    #[tokio::test]
    async fn test_monitor_deadline_kills_child() {
        let mut child = sleeper("30");
        let config = MonitorConfig::default().with_deadline(Duration::from_millis(200));
        let mut monitor = ResourceMonitor::with_probe(config, FailingProbe);

        let started = Instant::now();
        let err = monitor.observe(&mut child).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            EvalError::Timeout { limit_ms, elapsed_ms } => {
                assert_eq!(limit_ms, 200);
                assert!(elapsed_ms >= 200);
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert_eq!(monitor.state(), MonitorState::Failed);
        assert!(child.try_wait().expect("try_wait").is_some());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_procfs_probe_samples_live_process() {
        let mut child = sleeper("0.3");
        let mut monitor = ResourceMonitor::new(MonitorConfig::default());
        let usage = monitor.observe(&mut child).await.expect("observe");
        assert!(usage.samples > 0);
        assert!(usage.peak_rss_bytes > 0);
    }
}
