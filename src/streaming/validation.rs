//! Sort validation for diff streams.
//!
//! The scan state machine consumes events in ascending coordinate order.
//! Validation checks that:
//! 1. All records for a chromosome are contiguous (no interleaving)
//! 2. Within a chromosome, start positions are non-decreasing

use crate::diff::{DiffError, DiffReader};
use std::collections::HashSet;
use std::path::Path;

/// Verify that a diff file is sorted by chromosome and position.
pub fn verify_sorted<P: AsRef<Path>>(path: P) -> Result<(), DiffError> {
    let reader = DiffReader::from_path(path)?;
    let mut validator = SortValidator::new();
    for result in reader.events() {
        let ev = result?;
        validator.validate(&ev.chrom, ev.start)?;
    }
    Ok(())
}

/// Inline sort validator for use within streaming loops.
#[derive(Debug, Default)]
pub struct SortValidator {
    prev_chrom: Option<String>,
    prev_start: u64,
    seen_chroms: HashSet<String>,
    record_count: usize,
}

impl SortValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that the given record maintains sort order.
    #[inline]
    pub fn validate(&mut self, chrom: &str, start: u64) -> Result<(), DiffError> {
        self.record_count += 1;

        if let Some(ref pc) = self.prev_chrom {
            if chrom != pc {
                if self.seen_chroms.contains(chrom) {
                    return Err(DiffError::InvalidFormat(format!(
                        "Diff stream not sorted: chromosome '{}' at record {} was seen earlier (chromosomes must be contiguous)",
                        chrom, self.record_count
                    )));
                }
                self.seen_chroms.insert(pc.clone());
            } else if start < self.prev_start {
                return Err(DiffError::InvalidFormat(format!(
                    "Diff stream not sorted: position {} at record {} comes after {} on {}",
                    start, self.record_count, self.prev_start, chrom
                )));
            }
        }

        if self.prev_chrom.as_deref() != Some(chrom) {
            self.prev_chrom = Some(chrom.to_string());
        }
        self.prev_start = start;

        Ok(())
    }

    /// Get the number of records validated.
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sorted_stream_passes() {
        let mut v = SortValidator::new();
        assert!(v.validate("chr1", 0).is_ok());
        assert!(v.validate("chr1", 10).is_ok());
        assert!(v.validate("chr1", 10).is_ok());
        assert!(v.validate("chr2", 0).is_ok());
        assert_eq!(v.record_count(), 4);
    }

    #[test]
    fn test_position_regression_fails() {
        let mut v = SortValidator::new();
        v.validate("chr1", 50).unwrap();
        let err = v.validate("chr1", 40).unwrap_err();
        assert!(err.to_string().contains("comes after 50"));
    }

    #[test]
    fn test_interleaved_chrom_fails() {
        let mut v = SortValidator::new();
        v.validate("chr1", 0).unwrap();
        v.validate("chr2", 0).unwrap();
        assert!(v.validate("chr1", 100).is_err());
    }

    #[test]
    fn test_verify_sorted_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tCGI\tREF\t1\t10").unwrap();
        writeln!(file, "chr1\tCGI\tSNP\t11\t11\t.\t+\t.\talleles A/C;ref_allele C").unwrap();
        writeln!(file, "chr1\tCGI\tREF\t5\t9").unwrap();
        file.flush().unwrap();

        assert!(verify_sorted(file.path()).is_err());
    }
}
