//! Reference chromosome buffers loaded from FASTA.
//!
//! Each FASTA record becomes one contiguous, read-only byte buffer addressable
//! by 0-based offset. Buffers are shared by reference across path workers.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::diff::{DiffError, Result};
use crate::streaming::parsing::{open_input, trim_newline};

/// A contiguous reference sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromBuffer {
    name: String,
    seq: Vec<u8>,
}

impl ChromBuffer {
    pub fn new(name: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            seq: seq.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.seq.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Borrow `[start, end)`, or None if the range runs past the buffer.
    #[inline]
    pub fn slice(&self, start: u64, end: u64) -> Option<&[u8]> {
        if start > end || end > self.len() {
            return None;
        }
        Some(&self.seq[start as usize..end as usize])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.seq
    }
}

/// All reference sequences of a FASTA file, in file order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGenome {
    chroms: HashMap<String, ChromBuffer>,
    order: Vec<String>,
}

impl ReferenceGenome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a (optionally gzipped) FASTA file.
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(open_input(path)?)
    }

    /// Parse FASTA from any buffered reader.
    ///
    /// Record names are the first whitespace-delimited token of the header.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut genome = Self::new();
        let mut line = Vec::new();
        let mut current: Option<ChromBuffer> = None;
        let mut line_num = 0;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_num += 1;
            let l = trim_newline(&line);
            if l.is_empty() {
                continue;
            }

            if l[0] == b'>' {
                if let Some(done) = current.take() {
                    genome.insert(done);
                }
                let header = String::from_utf8_lossy(&l[1..]);
                let name = header.split_whitespace().next().unwrap_or("").to_string();
                current = Some(ChromBuffer::new(name, Vec::new()));
                continue;
            }

            match current.as_mut() {
                Some(chrom) => chrom
                    .seq
                    .extend(l.iter().filter(|b| !b.is_ascii_whitespace())),
                None => {
                    return Err(DiffError::Parse {
                        line: line_num,
                        message: "Sequence data before first FASTA header".to_string(),
                    })
                }
            }
        }

        if let Some(done) = current.take() {
            genome.insert(done);
        }

        if genome.is_empty() {
            return Err(DiffError::InvalidFormat(
                "FASTA input contains no records".to_string(),
            ));
        }
        Ok(genome)
    }

    /// Insert a sequence (appends to order if new).
    pub fn insert(&mut self, chrom: ChromBuffer) {
        if !self.chroms.contains_key(chrom.name()) {
            self.order.push(chrom.name().to_string());
        }
        self.chroms.insert(chrom.name().to_string(), chrom);
    }

    /// Look up a chromosome; a single-record FASTA answers for any name.
    pub fn get(&self, chrom: &str) -> Option<&ChromBuffer> {
        self.chroms.get(chrom).or_else(|| {
            if self.order.len() == 1 {
                self.chroms.get(&self.order[0])
            } else {
                None
            }
        })
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.chroms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }
}
