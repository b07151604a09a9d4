//! Per-read accuracy from alignment CIGAR statistics.
//!
//! Every record of the alignment file, unmapped ones included, contributes
//! one entry: `M / (M + I + D + N)` over the summed operation lengths, or
//! exactly `0.0` when that sum is zero. Secondary and supplementary records
//! share their primary's query name; the last record read wins.

use std::collections::BTreeMap;
use std::path::Path;

use rust_htslib::bam::record::Cigar;
use rust_htslib::bam::{self, Read};

use crate::error::{EvalError, Result};
use crate::obs;

/// Read name to accuracy in `[0, 1]`.
pub type Accuracies = BTreeMap<String, f64>;

/// Summed lengths of the first four CIGAR operation kinds of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CigarStats {
    pub matches: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub skips: u64,
}

impl CigarStats {
    pub fn new(matches: u64, insertions: u64, deletions: u64, skips: u64) -> Self {
        Self {
            matches,
            insertions,
            deletions,
            skips,
        }
    }

    /// Accumulate `M`, `I`, `D` and `N` lengths; other operations are ignored.
    pub fn from_cigar<'a>(ops: impl IntoIterator<Item = &'a Cigar>) -> Self {
        let mut stats = Self::default();
        for op in ops {
            match *op {
                Cigar::Match(len) => stats.matches += u64::from(len),
                Cigar::Ins(len) => stats.insertions += u64::from(len),
                Cigar::Del(len) => stats.deletions += u64::from(len),
                Cigar::RefSkip(len) => stats.skips += u64::from(len),
                _ => {}
            }
        }
        stats
    }

    pub fn total(&self) -> u64 {
        self.matches + self.insertions + self.deletions + self.skips
    }

    /// Fraction of matched bases, `0.0` for an empty alignment.
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.matches as f64 / total as f64,
        }
    }
}

/// Counters gathered while reducing an alignment file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    pub records: u64,
    pub unmapped: u64,
    /// Records whose query name had already been seen.
    pub duplicates: u64,
}

/// Compute per-read accuracies from a SAM/BAM file.
pub fn reduce_alignment_file(path: &Path) -> Result<Accuracies> {
    reduce_with_stats(path).map(|(accuracies, _)| accuracies)
}

/// Like [`reduce_alignment_file`], also returning record counters.
pub fn reduce_with_stats(path: &Path) -> Result<(Accuracies, ReductionStats)> {
    let read_error = |source: rust_htslib::errors::Error| EvalError::AlignmentRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = bam::Reader::from_path(path).map_err(read_error)?;
    let mut accuracies = Accuracies::new();
    let mut stats = ReductionStats::default();

    for result in reader.records() {
        let record = result.map_err(read_error)?;
        stats.records += 1;
        if record.is_unmapped() {
            stats.unmapped += 1;
        }

        let qname = String::from_utf8_lossy(record.qname()).into_owned();
        let accuracy = CigarStats::from_cigar(record.cigar().iter()).accuracy();
        if accuracies.insert(qname, accuracy).is_some() {
            stats.duplicates += 1;
        }
    }

    obs::emit_accuracy_reduced(
        stats.records,
        stats.unmapped,
        stats.duplicates,
        accuracies.len(),
    );
    Ok((accuracies, stats))
}
