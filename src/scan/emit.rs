//! Tile record assembly.
//!
//! On commit the pending sequence is case-normalised (tags upper case, body
//! lower case), checksummed, scanned for no-call runs and frozen into a
//! [`TileRecord`].

use super::{ScanError, Stream};
use crate::fastj::{FastjHeader, Locus};
use crate::index::BoundaryIndex;
use crate::policy::VariantPolicy;
use md5::{Digest, Md5};

/// An emitted tile. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub tile_id: String,
    pub locus: String,
    pub seq: Vec<u8>,
    /// Observed left tag content.
    pub start_seq: String,
    /// Observed right tag content.
    pub end_seq: String,
    /// Canonical tags from the reference library.
    pub start_tag: String,
    pub end_tag: String,
    pub md5sum: String,
    pub seed_tile_length: u32,
    pub start_tile: bool,
    pub end_tile: bool,
    /// `(offset, length)` of each no-call run, when no-calls are reported.
    pub nocall_runs: Option<Vec<(usize, usize)>>,
    pub notes: Vec<String>,
}

impl TileRecord {
    pub fn nocall_count(&self) -> Option<u64> {
        self.nocall_runs
            .as_ref()
            .map(|runs| runs.iter().map(|&(_, len)| len as u64).sum())
    }

    pub fn to_header(&self) -> FastjHeader {
        let mut notes = self.notes.clone();
        if let Some(runs) = &self.nocall_runs {
            notes.extend(runs.iter().map(|(s, len)| format!("nocall {} {}", s, len)));
        }
        FastjHeader {
            tile_id: self.tile_id.clone(),
            md5sum: self.md5sum.clone(),
            locus: vec![Locus {
                build: self.locus.clone(),
            }],
            n: self.seq.len() as u64,
            seed_tile_length: self.seed_tile_length,
            start_tile: self.start_tile,
            end_tile: self.end_tile,
            start_seq: self.start_seq.clone(),
            end_seq: self.end_seq.clone(),
            start_tag: self.start_tag.clone(),
            end_tag: self.end_tag.clone(),
            nocall_count: self.nocall_count(),
            notes,
        }
    }
}

/// Everything the emitter needs from the scanner at commit time.
pub(crate) struct PendingTile<'s> {
    pub seq: &'s [u8],
    pub left_tag: &'s [u8],
    pub right_tag: &'s [u8],
    pub first_tile: usize,
    pub last_tile: usize,
    pub seed_tile_length: u32,
    pub notes: &'s [String],
    pub end_tile: bool,
}

pub(crate) fn build_record(
    pending: PendingTile<'_>,
    index: &BoundaryIndex,
    stream: Stream,
    policy: VariantPolicy,
    report_nocalls: bool,
) -> Result<TileRecord, ScanError> {
    let first = index.tile(pending.first_tile);
    let last = index.tile(pending.last_tile);
    let (Some(first), Some(last)) = (first, last) else {
        return Err(ScanError::MalformedTile {
            tile_id: format!("{:x}:{}", index.path(), pending.first_tile),
            reason: format!(
                "tile range {}..={} outside library of {} tiles",
                pending.first_tile,
                pending.last_tile,
                index.tile_count()
            ),
        });
    };
    let tile_id = first.tile_id.with_variant(stream.variant_id());

    let malformed = |reason: String| ScanError::MalformedTile {
        tile_id: tile_id.clone(),
        reason,
    };
    if !pending.seq.starts_with(pending.left_tag) {
        return Err(malformed("left tag is not a prefix of the sequence".to_string()));
    }
    if !pending.seq.ends_with(pending.right_tag) {
        return Err(malformed("right tag is not a suffix of the sequence".to_string()));
    }

    let mut seq = pending.seq.to_vec();
    let (left, right) = (pending.left_tag.len(), pending.right_tag.len());
    normalize_case(&mut seq, left, right);

    let n = seq.len();
    let start_seq = String::from_utf8_lossy(&seq[..left]).into_owned();
    let end_seq = String::from_utf8_lossy(&seq[n - right..]).into_owned();
    let md5sum = format!("{:x}", Md5::digest(&seq));

    let mut notes = pending.notes.to_vec();
    notes.push(phase_note(policy, stream));

    Ok(TileRecord {
        tile_id,
        locus: first.locus.clone(),
        nocall_runs: report_nocalls.then(|| nocall_runs(&seq)),
        seq,
        start_seq,
        end_seq,
        start_tag: first.start_tag.clone(),
        end_tag: last.end_tag.clone(),
        md5sum,
        seed_tile_length: pending.seed_tile_length,
        start_tile: pending.first_tile == 0,
        end_tile: pending.end_tile,
        notes,
    })
}

/// `Phase (<POLICY>) <stream>` for phased output, `unphased (<POLICY>)` for
/// the single regex stream.
pub fn phase_note(policy: VariantPolicy, stream: Stream) -> String {
    if policy.stream_count() == 1 {
        format!("unphased ({})", policy.label())
    } else {
        format!("Phase ({}) {}", policy.label(), stream)
    }
}

/// Upper-case the tag bases, lower-case the body.
///
/// Sequences shorter than both tags together are left as they are. Only
/// nucleotide and no-call letters change case.
pub fn normalize_case(seq: &mut [u8], left: usize, right: usize) {
    let n = seq.len();
    if n < left + right {
        return;
    }
    for (i, b) in seq.iter_mut().enumerate() {
        let on_tag = i < left || i >= n - right;
        if !matches!(b.to_ascii_lowercase(), b'a' | b'c' | b'g' | b't' | b'n') {
            continue;
        }
        if on_tag {
            b.make_ascii_uppercase();
        } else {
            b.make_ascii_lowercase();
        }
    }
}

/// `(offset, length)` of each maximal run of `n`/`N`.
pub fn nocall_runs(seq: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < seq.len() {
        if matches!(seq[i], b'n' | b'N') {
            let start = i;
            while i < seq.len() && matches!(seq[i], b'n' | b'N') {
                i += 1;
            }
            runs.push((start, i - start));
        } else {
            i += 1;
        }
    }
    runs
}
