//! Streaming diff-record parser.
//!
//! A diff stream is a GFF-like, tab-separated file with one record per line:
//!
//! ```text
//! chrom  source  kind  start  end  score  strand  phase  annotation
//! chr1   CGI     SNP   82162  82162  .    +       .      alleles A/C;db_xref dbsnp.92:rs1815132;ref_allele C
//! ```
//!
//! Coordinates are 1-based and end-inclusive on disk; they are converted to
//! 0-based, half-open ranges on ingestion. Insertions are written with
//! `end == start - 1` and become zero-length events.

use crate::streaming::buffers::DEFAULT_LINE_BUFFER;
use crate::streaming::parsing::{
    open_input, parse_u64_fast, should_skip_line, split_tabs, trim_newline,
};
use crate::variant::{AlleleCall, DiffEvent, Variant, VariantKind};
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading any of the input formats.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown variant kind '{kind}' at line {line}")]
    UnknownKind { line: usize, kind: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, DiffError>;

const MIN_FIELDS: usize = 5;
const ANNOTATION_FIELD: usize = 8;

/// A streaming diff-record reader.
pub struct DiffReader<R: BufRead> {
    reader: R,
    line_number: usize,
    buffer: Vec<u8>,
    last_chrom: String,
}

impl DiffReader<Box<dyn BufRead + Send>> {
    /// Open a diff file (plain or gzip) from a path; `-` reads stdin.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> DiffReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: Vec::with_capacity(DEFAULT_LINE_BUFFER),
            last_chrom: String::new(),
        }
    }

    /// Read the next diff event.
    pub fn read_event(&mut self) -> Result<Option<DiffEvent>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = trim_newline(&self.buffer);
            if should_skip_line(line) {
                continue;
            }

            let chrom_end = memchr::memchr(b'\t', line).unwrap_or(line.len());
            self.last_chrom.clear();
            self.last_chrom
                .push_str(&String::from_utf8_lossy(&line[..chrom_end]));

            return parse_diff_line(line, self.line_number).map(Some);
        }
    }

    /// Chromosome of the most recently read line, including a line that
    /// failed to parse.
    pub fn last_chrom(&self) -> &str {
        &self.last_chrom
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Get an iterator over all events.
    pub fn events(self) -> DiffEventIter<R> {
        DiffEventIter { reader: self }
    }
}

/// Iterator over diff events.
pub struct DiffEventIter<R: BufRead> {
    reader: DiffReader<R>,
}

impl<R: BufRead> Iterator for DiffEventIter<R> {
    type Item = Result<DiffEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_event().transpose()
    }
}

/// Parse one non-comment diff line.
pub fn parse_diff_line(line: &[u8], line_no: usize) -> Result<DiffEvent> {
    let parse_err = |message: String| DiffError::Parse {
        line: line_no,
        message,
    };

    let mut fields = [&b""[..]; 9];
    let n = split_tabs(line, &mut fields);
    if n < MIN_FIELDS {
        return Err(parse_err(format!(
            "Expected at least {} fields, got {}",
            MIN_FIELDS, n
        )));
    }

    let chrom = utf8_field(fields[0], "chrom", line_no)?;
    let kind_str = utf8_field(fields[2], "kind", line_no)?;
    let kind: VariantKind = kind_str.parse().map_err(|kind| DiffError::UnknownKind {
        line: line_no,
        kind,
    })?;

    let start1 = parse_u64_fast(fields[3])
        .ok_or_else(|| parse_err(format!("Invalid start position: '{}'", lossy(fields[3]))))?;
    let end1 = parse_u64_fast(fields[4])
        .ok_or_else(|| parse_err(format!("Invalid end position: '{}'", lossy(fields[4]))))?;

    if start1 == 0 {
        return Err(parse_err("Start position must be 1-based".to_string()));
    }
    if end1 + 1 < start1 {
        return Err(parse_err(format!("Start ({}) > end ({}) + 1", start1, end1)));
    }

    let start = start1 - 1;
    let end = end1;

    let annotation = if n > ANNOTATION_FIELD {
        utf8_field(fields[ANNOTATION_FIELD], "annotation", line_no)?
    } else {
        ""
    };

    let variant = match kind {
        VariantKind::Ref => Variant::Ref { len: end - start },
        _ => {
            let call = parse_allele_call(annotation).map_err(parse_err)?;
            if call.ref_len() != end - start {
                return Err(parse_err(format!(
                    "ref_allele length {} does not match record span {}",
                    call.ref_len(),
                    end - start
                )));
            }
            match kind {
                VariantKind::Snp => Variant::Snp(call),
                VariantKind::Sub => Variant::Sub(call),
                _ => Variant::Indel(call),
            }
        }
    };

    let condensed = annotation.split_whitespace().collect::<Vec<_>>().join(" ");
    let provenance = format!(
        "gffsrc: {} {} {} {} {}",
        chrom,
        start,
        end1 as i64 - 1,
        kind,
        condensed
    );

    Ok(DiffEvent::new(chrom, start, end, variant).with_provenance(provenance))
}

/// Parse the `alleles X/Y;...;ref_allele R` annotation column.
///
/// A single allele (`alleles T`) is a homozygous call. `-` is the empty allele.
pub fn parse_allele_call(annotation: &str) -> std::result::Result<AlleleCall, String> {
    let mut alleles: Option<&str> = None;
    let mut reference: Option<&str> = None;

    for part in annotation.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("alleles ") {
            alleles = Some(rest.trim());
        } else if let Some(rest) = part.strip_prefix("ref_allele ") {
            reference = Some(rest.trim());
        }
    }

    let alleles = alleles.ok_or_else(|| "Missing 'alleles' annotation".to_string())?;
    let reference = reference.ok_or_else(|| "Missing 'ref_allele' annotation".to_string())?;

    let (a0, a1) = match alleles.split_once('/') {
        Some((a0, a1)) => (a0, a1),
        None => (alleles, alleles),
    };
    if a0.is_empty() || a1.is_empty() || reference.is_empty() {
        return Err(format!("Malformed allele annotation '{}'", annotation));
    }

    Ok(AlleleCall::new(
        dash_to_empty(a0),
        dash_to_empty(a1),
        dash_to_empty(reference),
    ))
}

#[inline]
fn dash_to_empty(s: &str) -> &str {
    if s == "-" {
        ""
    } else {
        s
    }
}

fn utf8_field<'a>(bytes: &'a [u8], name: &str, line_no: usize) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|_| DiffError::Parse {
        line: line_no,
        message: format!("Field '{}' is not valid UTF-8", name),
    })
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read all events from a diff file.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<DiffEvent>> {
    DiffReader::from_path(path)?.events().collect()
}

/// Parse events from a string (useful for testing).
pub fn parse_events(content: &str) -> Result<Vec<DiffEvent>> {
    DiffReader::new(content.as_bytes()).events().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ref_run() {
        let events = parse_events("chr1\tCGI\tREF\t1\t100\t.\t+\t.\t.\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, 0);
        assert_eq!(events[0].end, 100);
        assert_eq!(events[0].variant, Variant::Ref { len: 100 });
    }

    #[test]
    fn test_parse_het_snp() {
        let line = "chr1\tCGI\tSNP\t82162\t82162\t.\t+\t.\talleles A/C;db_xref dbsnp.92:rs1815132;ref_allele C\n";
        let events = parse_events(line).unwrap();
        let ev = &events[0];
        assert_eq!(ev.start, 82161);
        assert_eq!(ev.end, 82162);
        assert_eq!(ev.variant, Variant::Snp(AlleleCall::new("A", "C", "C")));
        assert_eq!(
            ev.provenance,
            "gffsrc: chr1 82161 82161 SNP alleles A/C;db_xref dbsnp.92:rs1815132;ref_allele C"
        );
    }

    #[test]
    fn test_parse_homozygous_and_dash() {
        let line = "chr1\tCGI\tINDEL\t567240\t567240\t.\t+\t.\talleles -;ref_allele G\n";
        let ev = &parse_events(line).unwrap()[0];
        assert_eq!(ev.variant, Variant::Indel(AlleleCall::new("", "", "G")));
    }

    #[test]
    fn test_parse_insertion_is_zero_length() {
        let line = "chr1\tCGI\tINDEL\t101\t100\t.\t+\t.\talleles AGT/-;ref_allele -\n";
        let ev = &parse_events(line).unwrap()[0];
        assert_eq!(ev.start, 100);
        assert_eq!(ev.end, 100);
        assert_eq!(ev.variant, Variant::Indel(AlleleCall::new("AGT", "", "")));
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let err = parse_events("chr1\tCGI\tMNP\t1\t2\t.\t+\t.\talleles AA;ref_allele CC\n")
            .unwrap_err();
        assert!(matches!(err, DiffError::UnknownKind { line: 1, ref kind } if kind == "MNP"));
    }

    #[test]
    fn test_missing_ref_allele_is_error() {
        let err = parse_events("chr1\tCGI\tSNP\t5\t5\t.\t+\t.\talleles A/C\n").unwrap_err();
        assert!(matches!(err, DiffError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_span_mismatch_is_error() {
        let err = parse_events("chr1\tCGI\tSUB\t5\t6\t.\t+\t.\talleles AAA;ref_allele CCC\n")
            .unwrap_err();
        assert!(matches!(err, DiffError::Parse { .. }));
    }

    #[test]
    fn test_skip_comments_and_track_chrom() {
        let content = "# header\n\nchr2\tCGI\tREF\t1\t10\n";
        let mut reader = DiffReader::new(content.as_bytes());
        let ev = reader.read_event().unwrap().unwrap();
        assert_eq!(ev.chrom, "chr2");
        assert_eq!(reader.last_chrom(), "chr2");
        assert_eq!(reader.line_number(), 3);
        assert!(reader.read_event().unwrap().is_none());
    }

    #[test]
    fn test_too_few_fields() {
        assert!(parse_events("chr1\tCGI\tREF\t1\n").is_err());
    }
}
