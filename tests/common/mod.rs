//! Shared fixtures: reference sequences, tile libraries and diff streams.

#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use tempfile::NamedTempFile;
use tilescan::commands::{TileCommand, TileStats};
use tilescan::config::ScanConfig;
use tilescan::diff::parse_events;
use tilescan::fastj::{parse_records, FastjRecord};
use tilescan::genome::{ChromBuffer, ReferenceGenome};
use tilescan::library::TileLibrary;

pub const CHROM: &str = "chr1";

pub fn random_reference(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..len).map(|_| b"acgt"[rng.gen_range(0..4)]).collect()
}

/// Reference tile library text for one path tiled at `starts`.
pub fn library_fastj(reference: &[u8], path: u32, starts: &[u64], sentinel: u64, tag_len: u64) -> String {
    let tag = |s: u64| {
        String::from_utf8(reference[s as usize..(s + tag_len) as usize].to_ascii_uppercase()).unwrap()
    };
    let mut out = String::new();
    for (i, &start) in starts.iter().enumerate() {
        let last = i + 1 == starts.len();
        let end = if last { sentinel } else { starts[i + 1] + tag_len };
        let start_tag = if i == 0 { String::new() } else { tag(start) };
        let end_tag = if last { String::new() } else { tag(starts[i + 1]) };
        out.push_str(&format!(
            "> {{\"tileID\":\"{:03x}.00.{:04x}.000\",\"locus\":[{{\"build\":\"hg19 {} {} {}\"}}],\"startTag\":\"{}\",\"endTag\":\"{}\"}}\n",
            path, i, CHROM, start, end, start_tag, end_tag
        ));
        out.push_str(std::str::from_utf8(&reference[start as usize..end as usize]).unwrap());
        out.push_str("\n\n");
    }
    out
}

pub fn fasta(reference: &[u8]) -> String {
    let mut out = format!(">{}\n", CHROM);
    for line in reference.chunks(60) {
        out.push_str(std::str::from_utf8(line).unwrap());
        out.push('\n');
    }
    out
}

fn allele(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Writes a diff stream and the sequence each reported allele stream should carry.
pub struct DiffBuilder<'r> {
    reference: &'r [u8],
    pub text: String,
    cursor: u64,
    /// Expected stream A and stream B sequences under the reported policy.
    pub expected: [Vec<u8>; 2],
}

impl<'r> DiffBuilder<'r> {
    pub fn new(reference: &'r [u8]) -> Self {
        Self {
            reference,
            text: String::new(),
            cursor: 0,
            expected: [Vec::new(), Vec::new()],
        }
    }

    pub fn reference_to(&mut self, end: u64) -> &mut Self {
        if end > self.cursor {
            self.text.push_str(&format!(
                "{}\tCGI\tREF\t{}\t{}\t.\t+\t.\t.\n",
                CHROM,
                self.cursor + 1,
                end
            ));
            let bases = &self.reference[self.cursor as usize..end as usize];
            self.expected[0].extend_from_slice(bases);
            self.expected[1].extend_from_slice(bases);
            self.cursor = end;
        }
        self
    }

    /// A call over `[start, start + ref_len)`; empty alleles are written as `-`.
    pub fn variant(&mut self, kind: &str, start: u64, ref_len: u64, a0: &str, a1: &str) -> &mut Self {
        self.reference_to(start);
        let reference =
            std::str::from_utf8(&self.reference[start as usize..(start + ref_len) as usize]).unwrap();
        self.text.push_str(&format!(
            "{}\tCGI\t{}\t{}\t{}\t.\t+\t.\talleles {}/{};ref_allele {}\n",
            CHROM,
            kind,
            start + 1,
            start + ref_len,
            allele(a0),
            allele(a1),
            allele(reference)
        ));
        self.expected[0].extend_from_slice(a0.as_bytes());
        self.expected[1].extend_from_slice(a1.as_bytes());
        self.cursor = start + ref_len;
        self
    }

    pub fn reference_at(&self, start: u64, len: u64) -> String {
        String::from_utf8(self.reference[start as usize..(start + len) as usize].to_vec()).unwrap()
    }
}

/// Heterozygous SNPs, substitutions, insertions and deletions scattered over
/// `[0, end)`, with reference runs in between.
pub fn random_diff(reference: &[u8], end: u64, seed: u64) -> DiffBuilder<'_> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut diff = DiffBuilder::new(reference);
    let mut pos = 0u64;
    loop {
        pos += rng.gen_range(2..30);
        if pos + 8 >= end {
            break;
        }
        let swap = rng.gen_bool(0.5);
        let (kind, ref_len, alt) = match rng.gen_range(0..4) {
            0 => {
                let r = reference[pos as usize];
                let alt = loop {
                    let b = b"acgt"[rng.gen_range(0..4)];
                    if b != r {
                        break b;
                    }
                };
                ("SNP", 1, String::from_utf8(vec![alt]).unwrap())
            }
            1 => ("SUB", 3, "tta".to_string()),
            2 => ("INDEL", 0, "gat".to_string()),
            _ => ("INDEL", rng.gen_range(1..6), String::new()),
        };
        let same = diff.reference_at(pos, ref_len);
        let (a0, a1) = if swap { (alt, same) } else { (same, alt) };
        diff.variant(kind, pos, ref_len, &a0, &a1);
        pos += ref_len;
    }
    diff.reference_to(end);
    diff
}

/// Run the tile command in memory.
pub fn tile(config: ScanConfig, library: &str, reference: &[u8], diff: &str) -> (TileStats, Vec<FastjRecord>) {
    let tag_len = config.tag_len;
    let library = TileLibrary::from_records(&parse_records(library).unwrap(), "hg19", tag_len).unwrap();
    let mut genome = ReferenceGenome::new();
    genome.insert(ChromBuffer::new(CHROM, reference.to_vec()));
    let events = parse_events(diff).unwrap();

    let mut out = Vec::new();
    let stats = TileCommand::new(config)
        .tile(&library, &genome, events, &mut out)
        .unwrap();
    (stats, parse_records(std::str::from_utf8(&out).unwrap()).unwrap())
}

/// Records of one output stream (`"000"` or `"001"`), in output order.
pub fn stream<'a>(records: &'a [FastjRecord], variant: &str) -> Vec<&'a FastjRecord> {
    records
        .iter()
        .filter(|r| r.header.tile_id.ends_with(variant))
        .collect()
}

/// Concatenate tiles, dropping each left tag already emitted as the previous right tag.
pub fn reconstruct(records: &[&FastjRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, r) in records.iter().enumerate() {
        let skip = if i == 0 { 0 } else { r.header.start_seq.len() };
        out.extend_from_slice(&r.seq[skip..]);
    }
    out.to_ascii_lowercase()
}

pub fn temp_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}
