//! FastJ tile records.
//!
//! A FastJ file is a sequence of records, each a `>` line carrying a one-line
//! JSON header followed by the tile sequence wrapped over several lines:
//!
//! ```text
//! > {"tileID":"2c5.0.0000.000","md5sum":"...","locus":[{"build":"hg19 chr13 0-24 19020000+24"}],"n":274,...}
//! ACGTACGTAC...
//!
//! ```
//!
//! The same format serves as the reference tile library (input) and the tile
//! output stream.

use crate::diff::{DiffError, Result};
use crate::streaming::buffers::DEFAULT_LINE_BUFFER;
use crate::streaming::parsing::{open_input, trim_newline};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

/// One entry of the `locus` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locus {
    pub build: String,
}

/// The JSON header of a FastJ record, in output field order.
///
/// Missing fields deserialize to their defaults so that sparse library
/// headers are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FastjHeader {
    #[serde(rename = "tileID")]
    pub tile_id: String,
    #[serde(rename = "md5sum")]
    pub md5sum: String,
    pub locus: Vec<Locus>,
    pub n: u64,
    pub seed_tile_length: u32,
    pub start_tile: bool,
    pub end_tile: bool,
    pub start_seq: String,
    pub end_seq: String,
    pub start_tag: String,
    pub end_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nocall_count: Option<u64>,
    pub notes: Vec<String>,
}

impl FastjHeader {
    /// The first locus build string, if any.
    pub fn build_locus(&self) -> Option<&str> {
        self.locus.first().map(|l| l.build.as_str())
    }
}

/// A header together with its unwrapped sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastjRecord {
    pub header: FastjHeader,
    pub seq: Vec<u8>,
}

/// A streaming FastJ record reader.
pub struct FastjReader<R: BufRead> {
    reader: R,
    line_number: usize,
    buffer: Vec<u8>,
    pending_header: Option<(usize, Vec<u8>)>,
}

impl FastjReader<Box<dyn BufRead + Send>> {
    /// Open a FastJ file (plain or gzip) from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> FastjReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: Vec::with_capacity(DEFAULT_LINE_BUFFER),
            pending_header: None,
        }
    }

    /// Returns false at end of input.
    fn next_line(&mut self) -> Result<bool> {
        self.buffer.clear();
        let n = self.reader.read_until(b'\n', &mut self.buffer)?;
        if n > 0 {
            self.line_number += 1;
        }
        Ok(n > 0)
    }

    /// Read the next record.
    pub fn read_record(&mut self) -> Result<Option<FastjRecord>> {
        let (header_line, header_bytes) = match self.pending_header.take() {
            Some(pending) => pending,
            None => loop {
                if !self.next_line()? {
                    return Ok(None);
                }
                let line = trim_newline(&self.buffer);
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }
                if line[0] != b'>' {
                    return Err(DiffError::Parse {
                        line: self.line_number,
                        message: "Sequence data before first FastJ header".to_string(),
                    });
                }
                break (self.line_number, line[1..].to_vec());
            },
        };

        let header: FastjHeader =
            serde_json::from_slice(&header_bytes).map_err(|e| DiffError::Parse {
                line: header_line,
                message: format!("Invalid FastJ header: {}", e),
            })?;

        let mut seq = Vec::with_capacity(header.n as usize);
        while self.next_line()? {
            let line = trim_newline(&self.buffer);
            if line.first() == Some(&b'>') {
                self.pending_header = Some((self.line_number, line[1..].to_vec()));
                break;
            }
            seq.extend(line.iter().filter(|b| !b.is_ascii_whitespace()));
        }

        Ok(Some(FastjRecord { header, seq }))
    }

    /// Get an iterator over all records.
    pub fn records(self) -> FastjRecordIter<R> {
        FastjRecordIter { reader: self }
    }
}

/// Iterator over FastJ records.
pub struct FastjRecordIter<R: BufRead> {
    reader: FastjReader<R>,
}

impl<R: BufRead> Iterator for FastjRecordIter<R> {
    type Item = Result<FastjRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Read every record of a FastJ file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<FastjRecord>> {
    FastjReader::from_path(path)?.records().collect()
}

/// Parse records from a string (useful for testing).
pub fn parse_records(content: &str) -> Result<Vec<FastjRecord>> {
    FastjReader::new(content.as_bytes()).records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TILES: &str = "\
> {\"tileID\":\"2c5.0.0000.000\",\"locus\":[{\"build\":\"hg19 chr13 0 30+5\"}],\"n\":35,\"startTag\":\"\",\"endTag\":\"ACGTA\"}
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
ACGTA

> {\"tileID\":\"2c5.0.0001.000\",\"locus\":[{\"build\":\"hg19 chr13 30-5 60\"}],\"n\":35}
ACGTAcccccccccccccccccccccccccccccc
";

    #[test]
    fn test_parse_records() {
        let records = parse_records(TWO_TILES).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].header.tile_id, "2c5.0.0000.000");
        assert_eq!(records[0].header.end_tag, "ACGTA");
        assert_eq!(records[0].seq.len(), 35);
        assert_eq!(records[1].header.build_locus(), Some("hg19 chr13 30-5 60"));
        assert!(records[1].seq.starts_with(b"ACGTAccc"));
        assert_eq!(records[1].header.seed_tile_length, 0);
    }

    #[test]
    fn test_header_serializes_in_field_order() {
        let header = FastjHeader {
            tile_id: "1.0.0002.001".to_string(),
            md5sum: "abc".to_string(),
            locus: vec![Locus {
                build: "hg19 chr1 10-2 20+2".to_string(),
            }],
            n: 14,
            seed_tile_length: 1,
            nocall_count: Some(0),
            notes: vec!["Phase (REPORTED) B".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_string(&header).unwrap();
        assert!(json.starts_with("{\"tileID\":\"1.0.0002.001\",\"md5sum\":\"abc\",\"locus\""));
        assert!(json.contains("\"seedTileLength\":1,\"startTile\":false,\"endTile\":false"));
        assert!(json.contains("\"nocallCount\":0,\"notes\""));

        let without = FastjHeader::default();
        assert!(!serde_json::to_string(&without).unwrap().contains("nocallCount"));
    }

    #[test]
    fn test_bad_header_reports_line() {
        let err = parse_records("\n> {not json}\nACGT\n").unwrap_err();
        assert!(matches!(err, DiffError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_sequence_before_header() {
        assert!(parse_records("ACGT\n").is_err());
    }
}
