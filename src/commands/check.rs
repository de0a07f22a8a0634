//! FastJ tile verification.
//!
//! Re-reads a tile stream and checks every record against its own header
//! and against the previous tile of the same stream.

use crate::commands::tile::TileError;
use crate::config::DEFAULT_TAG_LEN;
use crate::diff::DiffError;
use crate::fastj::{FastjReader, FastjRecord};
use crate::index::TileId;
use crate::scan::ScanError;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CheckCommand {
    /// Expected length of canonical tags on interior tiles.
    pub tag_len: u64,
}

impl Default for CheckCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckCommand {
    pub fn new() -> Self {
        Self {
            tag_len: DEFAULT_TAG_LEN,
        }
    }

    pub fn with_tag_len(mut self, tag_len: u64) -> Self {
        self.tag_len = tag_len;
        self
    }

    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<CheckStats, TileError> {
        self.run_reader(FastjReader::from_path(path)?)
    }

    /// Verify every record; the first violation is returned as an error.
    pub fn run_reader<R: BufRead>(&self, reader: FastjReader<R>) -> Result<CheckStats, TileError> {
        let mut stats = CheckStats::default();
        // Last endSeq per (path, variant) stream.
        let mut previous: HashMap<(u32, u32), String> = HashMap::new();

        for result in reader.records() {
            let record = result?;
            self.check_record(&record)?;

            let id: TileId = record
                .header
                .tile_id
                .parse()
                .map_err(DiffError::InvalidFormat)?;
            let stream = (id.path, id.copy);
            if !record.header.start_tile {
                if let Some(prev) = previous.get(&stream) {
                    if !prev.eq_ignore_ascii_case(&record.header.start_seq) {
                        return Err(malformed(
                            &record,
                            format!(
                                "startSeq {} does not continue previous endSeq {}",
                                record.header.start_seq, prev
                            ),
                        ));
                    }
                }
            }
            if previous.insert(stream, record.header.end_seq.clone()).is_none() {
                stats.streams += 1;
            }
            stats.records += 1;
            stats.bases += record.seq.len() as u64;
        }

        log::debug!("Checked {}", stats);
        Ok(stats)
    }

    /// Checks that need only the record itself.
    pub fn check_record(&self, record: &FastjRecord) -> Result<(), TileError> {
        let header = &record.header;
        let seq = &record.seq;

        if header.n != seq.len() as u64 {
            return Err(malformed(
                record,
                format!("n is {} but sequence has {} bases", header.n, seq.len()),
            ));
        }

        if let Some(expected) = header.nocall_count {
            let actual = seq.iter().filter(|b| matches!(b, b'n' | b'N')).count() as u64;
            if expected != actual {
                return Err(malformed(
                    record,
                    format!("nocallCount is {} but sequence has {}", expected, actual),
                ));
            }
        }

        for (name, tag, is_edge) in [
            ("startTag", &header.start_tag, header.start_tile),
            ("endTag", &header.end_tag, header.end_tile),
        ] {
            let expected = if is_edge { 0 } else { self.tag_len as usize };
            if tag.len() != expected {
                return Err(malformed(
                    record,
                    format!("{} has length {}, expected {}", name, tag.len(), expected),
                ));
            }
        }

        if !seq.starts_with(header.start_seq.as_bytes()) {
            return Err(malformed(record, "startSeq is not a prefix of the sequence".to_string()));
        }
        if !seq.ends_with(header.end_seq.as_bytes()) {
            return Err(malformed(record, "endSeq is not a suffix of the sequence".to_string()));
        }

        let digest = format!("{:x}", Md5::digest(seq));
        if digest != header.md5sum {
            return Err(malformed(
                record,
                format!("md5sum is {} but sequence hashes to {}", header.md5sum, digest),
            ));
        }
        Ok(())
    }
}

fn malformed(record: &FastjRecord, reason: String) -> TileError {
    TileError::Scan(ScanError::MalformedTile {
        tile_id: record.header.tile_id.clone(),
        reason,
    })
}

/// Statistics from a check run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckStats {
    pub records: usize,
    pub streams: usize,
    pub bases: u64,
}

impl std::fmt::Display for CheckStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Records: {}, Streams: {}, Bases: {}",
            self.records, self.streams, self.bases
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastj::FastjHeader;
    use crate::streaming::FastjWriter;

    fn record(id: &str, seq: &[u8], start_seq: &str, end_seq: &str, edges: (bool, bool)) -> FastjRecord {
        FastjRecord {
            header: FastjHeader {
                tile_id: id.to_string(),
                md5sum: format!("{:x}", Md5::digest(seq)),
                n: seq.len() as u64,
                seed_tile_length: 1,
                start_tile: edges.0,
                end_tile: edges.1,
                start_seq: start_seq.to_string(),
                end_seq: end_seq.to_string(),
                start_tag: if edges.0 { String::new() } else { start_seq.to_uppercase() },
                end_tag: if edges.1 { String::new() } else { end_seq.to_uppercase() },
                nocall_count: Some(seq.iter().filter(|b| matches!(b, b'n' | b'N')).count() as u64),
                ..Default::default()
            },
            seq: seq.to_vec(),
        }
    }

    fn write(records: &[FastjRecord]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut w = FastjWriter::new(&mut out);
            for r in records {
                w.write_record(&r.header, &r.seq).unwrap();
            }
            w.flush().unwrap();
        }
        out
    }

    fn check(records: &[FastjRecord]) -> Result<CheckStats, TileError> {
        let bytes = write(records);
        CheckCommand::new()
            .with_tag_len(3)
            .run_reader(FastjReader::new(&bytes[..]))
    }

    fn good() -> Vec<FastjRecord> {
        vec![
            record("001.00.0000.000", b"aannaaCCG", "", "CCG", (true, false)),
            record("001.00.0000.001", b"aaaaaaCCG", "", "CCG", (true, false)),
            record("001.00.0001.000", b"CCGttt", "CCG", "", (false, true)),
            record("001.00.0001.001", b"CCGtta", "CCG", "", (false, true)),
        ]
    }

    #[test]
    fn test_valid_stream() {
        let stats = check(&good()).unwrap();
        assert_eq!(stats.records, 4);
        assert_eq!(stats.streams, 2);
        assert_eq!(stats.bases, 30);
    }

    #[test]
    fn test_detects_bad_md5() {
        let mut recs = good();
        recs[1].header.md5sum = "0".repeat(32);
        let err = check(&recs).unwrap_err();
        assert!(err.to_string().contains("001.00.0000.001"));
        assert!(err.to_string().contains("md5sum"));
    }

    #[test]
    fn test_detects_nocall_mismatch() {
        let mut recs = good();
        recs[0].header.nocall_count = Some(1);
        assert!(check(&recs).unwrap_err().to_string().contains("nocallCount"));
    }

    #[test]
    fn test_detects_broken_continuity() {
        let mut recs = good();
        let seq = b"GGCtta".to_vec();
        recs[3] = record("001.00.0001.001", &seq, "GGC", "", (false, true));
        let err = check(&recs).unwrap_err();
        assert!(err.to_string().contains("does not continue"));
    }

    #[test]
    fn test_detects_tag_length() {
        let mut recs = good();
        recs[2].header.start_tag = "CCGA".to_string();
        assert!(check(&recs).unwrap_err().to_string().contains("startTag"));
    }
}
