//! Shared fixtures for readeval integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use readeval_core::{Aligner, EvalError, RunConfig, RunConfigFields, ALIGNMENT_FILE};

/// Reads emitted by the fake corrector.
pub const READS: &[(&str, &str)] = &[
    ("read1", "ACGTACGTACGTACGTACGT"),
    ("read2", "GGGGCCCCAATTGGCCAATT"),
    ("read3", "TTTTAAAACCCCGGGGTTAA"),
];

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Corrector that prints [`READS`] as FASTA on stdout.
pub fn fasta_corrector(dir: &Path) -> PathBuf {
    let fasta: String = READS
        .iter()
        .map(|(name, seq)| format!(">{name}\\n{seq}\\n"))
        .collect();
    write_script(dir, "fake-corrector", &format!("printf '{fasta}'"))
}

/// minimap2 stand-in: maps every FASTA record of its query (4th argument)
/// perfectly onto `ref`.
pub fn perfect_minimap2(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-minimap2",
        r#"awk 'BEGIN { print "@HD\tVN:1.6\tSO:unsorted"; print "@SQ\tSN:ref\tLN:1000" }
/^>/ { name = substr($0, 2); next }
{ printf "%s\t0\tref\t1\t60\t%dM\t*\t0\t0\t%s\t*\n", name, length($0), $0 }' "$4""#,
    )
}

/// Config for `executable` with empty reads/overlaps inputs under `dir`.
pub fn run_config(dir: &Path, executable: &Path) -> RunConfig {
    let reads_path = dir.join("input.fastq");
    let overlaps_path = dir.join("overlaps.paf");
    std::fs::write(&reads_path, "").unwrap();
    std::fs::write(&overlaps_path, "").unwrap();
    RunConfig::new(RunConfigFields {
        executable: executable.display().to_string(),
        threads: 2,
        window_length: 500,
        error_threshold: 0.3,
        reads_path,
        overlaps_path,
    })
    .expect("valid config")
}

pub fn reference(dir: &Path) -> PathBuf {
    let path = dir.join("ref.fa");
    std::fs::write(&path, ">ref\nACGT\n").unwrap();
    path
}

/// Aligner that turns every FASTA record into a perfect `<len>M` SAM record
/// and counts its invocations.
#[derive(Default)]
pub struct PerfectAligner {
    pub calls: AtomicUsize,
}

impl PerfectAligner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Aligner for PerfectAligner {
    async fn align(
        &self,
        reference: &Path,
        reads: &Path,
        _threads: u32,
        output_dir: &Path,
    ) -> readeval_core::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(reference.exists());

        let fasta = std::fs::read_to_string(reads)?;
        let mut sam = String::from("@HD\tVN:1.6\tSO:unsorted\n@SQ\tSN:ref\tLN:1000\n");
        let mut name = "";
        for line in fasta.lines() {
            if let Some(n) = line.strip_prefix('>') {
                name = n;
            } else if !line.is_empty() {
                sam.push_str(&format!(
                    "{name}\t0\tref\t1\t60\t{}M\t*\t0\t0\t{line}\t*\n",
                    line.len()
                ));
            }
        }

        let path = output_dir.join(ALIGNMENT_FILE);
        std::fs::write(&path, sam)?;
        Ok(path)
    }
}

/// Aligner that always fails.
pub struct BrokenAligner;

#[async_trait]
impl Aligner for BrokenAligner {
    async fn align(
        &self,
        _reference: &Path,
        _reads: &Path,
        _threads: u32,
        _output_dir: &Path,
    ) -> readeval_core::Result<PathBuf> {
        Err(EvalError::Alignment("minimap2 exited with code 1".to_string()))
    }
}
