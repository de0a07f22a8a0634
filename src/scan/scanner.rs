//! The tile scan state machine.
//!
//! Every mutating operation reduces to one or more [`Edit`]s: a reference
//! span together with what replaces it. An edit is applied piece by piece,
//! split at commit points. A commit point is `next_boundary + tag_len`, the
//! end of the current tile's right tag. Reaching it triggers a single
//! reconciliation which either emits the tile or, when a variant sits on the
//! tag and that is not allowed, folds the next reference tile into the same
//! output (`seedTileLength` grows by one).
//!
//! Bytes produced from the reference window `[next_boundary, commit_point)`
//! are mirrored into the right tag, so the right tag is always a suffix of
//! the pending sequence and becomes the next tile's left tag verbatim.

use super::emit::{build_record, PendingTile, TileRecord};
use super::state::{Phase, ScanState};
use super::{Result, ScanError, Stream};
use crate::config::{GapFill, ScanConfig};
use crate::genome::ChromBuffer;
use crate::index::BoundaryIndex;
use crate::variant::{GenomicOffset, VariantKind};

/// Outcome of [`TileScanner::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// The cursor has not reached the commit point.
    Pending,
    Committed,
    Deferred,
}

#[derive(Debug, Clone, Copy)]
enum Payload<'p> {
    Reference,
    NoCall,
    /// Replacement bases, one per reference base.
    Bases(&'p [u8]),
    /// Bases added before the edit's start; consumes no reference.
    Inserted(&'p [u8]),
    Deleted,
    /// Regex token standing in for the whole span.
    Token(&'p [u8]),
}

impl Payload<'_> {
    fn is_variant(&self) -> bool {
        !matches!(self, Payload::Reference | Payload::NoCall)
    }

    /// Output is written once, with the first piece, rather than per base.
    fn is_lumped(&self) -> bool {
        matches!(self, Payload::Inserted(_) | Payload::Token(_))
    }
}

struct Edit<'p> {
    start: u64,
    len: u64,
    payload: Payload<'p>,
    /// Notes carried into the next tile if the edit reaches the right tag.
    tag_notes: Vec<String>,
}

/// Scans one allele stream of one path.
pub struct TileScanner<'a> {
    reference: &'a ChromBuffer,
    index: &'a BoundaryIndex,
    config: &'a ScanConfig,
    stream: Stream,
    state: ScanState,
    emitted: Vec<TileRecord>,
    last_right_tag: Option<Vec<u8>>,
    deferred_commits: usize,
}

impl<'a> TileScanner<'a> {
    pub fn new(
        reference: &'a ChromBuffer,
        index: &'a BoundaryIndex,
        config: &'a ScanConfig,
        stream: Stream,
    ) -> Self {
        Self {
            reference,
            index,
            config,
            stream,
            state: ScanState::new(index, config.note.as_deref()),
            emitted: Vec::new(),
            last_right_tag: None,
            deferred_commits: 0,
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn cursor(&self) -> u64 {
        self.state.cursor()
    }

    /// The cursor as a path offset.
    pub fn offset(&self) -> GenomicOffset {
        GenomicOffset::new(self.index.path(), self.state.cursor())
    }

    /// Number of commits folded into a following tile so far.
    pub fn deferred_commits(&self) -> usize {
        self.deferred_commits
    }

    /// Hand out every tile committed since the last drain, in order.
    pub fn drain_records(&mut self) -> std::vec::Drain<'_, TileRecord> {
        self.emitted.drain(..)
    }

    /// Consume reference bases `[pos, pos + len)`.
    ///
    /// Bases already consumed are skipped and the run is clamped at the end
    /// of the path.
    pub fn process_ref(&mut self, pos: u64, len: u64) -> Result<()> {
        self.ensure_open()?;
        let end = pos.saturating_add(len).min(self.index.end());
        let start = pos.max(self.state.cursor());
        if start >= end {
            return Ok(());
        }
        self.fill_gap(start)?;
        self.apply(Edit {
            start,
            len: end - start,
            payload: Payload::Reference,
            tag_notes: Vec::new(),
        })
    }

    /// Replace `variant_seq.len()` reference bases at `pos` with `variant_seq`.
    pub fn process_sub(
        &mut self,
        pos: u64,
        variant_seq: &[u8],
        kind: VariantKind,
        record_note: Option<&str>,
    ) -> Result<()> {
        let len = variant_seq.len() as u64;
        self.admit(pos, len)?;
        self.fill_gap(pos)?;
        let note = format!(
            "{} {} {} {} {} {} {} {}",
            self.config.build,
            self.index.chrom(),
            pos,
            end_inclusive(pos, len),
            kind,
            display_allele(variant_seq),
            self.state.seq.len(),
            len
        );
        let tag_notes = self.record_notes(record_note, note);
        self.apply(Edit {
            start: pos,
            len,
            payload: Payload::Bases(variant_seq),
            tag_notes,
        })
    }

    /// Insert `inserted` before reference position `pos`.
    pub fn process_ins(&mut self, pos: u64, inserted: &[u8], record_note: Option<&str>) -> Result<()> {
        self.process_indel(pos, inserted, &[], record_note)
    }

    /// Delete `len` reference bases at `pos`.
    pub fn process_del(&mut self, pos: u64, len: u64, record_note: Option<&str>) -> Result<()> {
        let deleted = self.reference_slice(pos, pos.saturating_add(len))?;
        self.process_indel(pos, &[], deleted, record_note)
    }

    /// Replace `deleted` (the reference at `pos`) with `inserted`.
    ///
    /// With `m = min(len(inserted), len(deleted))` this is a substitution of
    /// the first `m` bases followed by an insertion or a deletion of the
    /// remainder. The record is annotated once, as an indel.
    pub fn process_indel(
        &mut self,
        pos: u64,
        inserted: &[u8],
        deleted: &[u8],
        record_note: Option<&str>,
    ) -> Result<()> {
        let len = deleted.len() as u64;
        self.admit(pos, len)?;
        self.fill_gap(pos)?;
        let note = format!(
            "{} {} {} {} INDEL {} {} => {}",
            self.config.build,
            self.index.chrom(),
            pos,
            end_inclusive(pos, len),
            self.state.seq.len(),
            display_allele(deleted),
            display_allele(inserted)
        );
        let tag_notes = self.record_notes(record_note, note);

        let m = inserted.len().min(deleted.len());
        if m > 0 {
            self.apply(Edit {
                start: pos,
                len: m as u64,
                payload: Payload::Bases(&inserted[..m]),
                tag_notes: tag_notes.clone(),
            })?;
        }
        let rest = pos + m as u64;
        if inserted.len() > m {
            self.apply(Edit {
                start: rest,
                len: 0,
                payload: Payload::Inserted(&inserted[m..]),
                tag_notes,
            })
        } else if deleted.len() > m {
            self.apply(Edit {
                start: rest,
                len: (deleted.len() - m) as u64,
                payload: Payload::Deleted,
                tag_notes,
            })
        } else {
            Ok(())
        }
    }

    /// Unphased single-base call, written as one token such as `[ac]`.
    pub fn process_regex_snp(
        &mut self,
        pos: u64,
        token: &str,
        reference: &[u8],
        record_note: Option<&str>,
    ) -> Result<()> {
        self.process_regex_alteration(pos, token, reference, VariantKind::Snp, record_note)
    }

    /// Unphased call over `reference`, written as one token such as `(|aa)`.
    pub fn process_regex_alteration(
        &mut self,
        pos: u64,
        token: &str,
        reference: &[u8],
        kind: VariantKind,
        record_note: Option<&str>,
    ) -> Result<()> {
        let len = reference.len() as u64;
        self.admit(pos, len)?;
        self.fill_gap(pos)?;
        let note = format!(
            "{} {} {} {} {} {} {} => {}",
            self.config.build,
            self.index.chrom(),
            pos,
            end_inclusive(pos, len),
            kind,
            self.state.seq.len(),
            display_allele(reference),
            token
        );
        let tag_notes = self.record_notes(record_note, note);
        self.apply(Edit {
            start: pos,
            len,
            payload: Payload::Token(token.as_bytes()),
            tag_notes,
        })
    }

    /// Settle the pending tile once the cursor reaches the commit point.
    ///
    /// Commits, or defers the commit when a variant sits on the right tag and
    /// variants on tags are not allowed. Fails if the actual and virtual
    /// cursors disagree.
    pub fn reconcile(&mut self) -> Result<Reconcile> {
        let actual_end = self.state.actual_end();
        let virtual_end = self.state.virtual_end();
        if actual_end != virtual_end {
            return Err(ScanError::CursorDivergence {
                actual_end,
                virtual_end,
            });
        }

        let Some((boundary, commit_point)) = self.commit_point() else {
            return Ok(Reconcile::Pending);
        };
        if virtual_end < commit_point {
            return Ok(Reconcile::Pending);
        }
        let tag_ref_len = commit_point - boundary;

        if self.state.variant_on_tag && !self.config.allow_variant_on_tag {
            log::trace!(
                "Stream {}: variant on tag at {}, deferring commit (seed {})",
                self.stream,
                GenomicOffset::new(self.index.path(), boundary),
                self.state.seed_tile_length + 1
            );
            self.state.defer_commit(boundary, tag_ref_len);
            self.deferred_commits += 1;
            return Ok(Reconcile::Deferred);
        }

        self.commit(false)?;
        self.state
            .begin_tile(boundary, tag_ref_len, self.config.note.as_deref());
        Ok(Reconcile::Committed)
    }

    /// Fill to the end of the path and flush the final tile.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.fill_gap(self.index.end())?;
        self.commit(true)?;
        self.state.phase = Phase::EndOfBand;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.phase == Phase::EndOfBand {
            return Err(ScanError::BandFinished);
        }
        Ok(())
    }

    fn admit(&self, pos: u64, ref_len: u64) -> Result<()> {
        self.ensure_open()?;
        let cursor = self.state.cursor();
        if pos < cursor {
            return Err(ScanError::OutOfOrder { pos, cursor });
        }
        let end = self.index.end();
        if pos.saturating_add(ref_len) > end {
            return Err(ScanError::OutOfBand { pos, end });
        }
        Ok(())
    }

    /// `(next boundary, commit point)`, or None when the next boundary is the sentinel.
    fn commit_point(&self) -> Option<(u64, u64)> {
        let boundaries = self.index.boundaries();
        let pos = self.state.boundary_pos;
        if pos + 1 < boundaries.len() {
            let boundary = boundaries[pos];
            Some((boundary, boundary + self.index.tag_len()))
        } else {
            None
        }
    }

    fn reference_slice(&self, start: u64, end: u64) -> Result<&'a [u8]> {
        let reference: &'a ChromBuffer = self.reference;
        reference
            .slice(start, end)
            .ok_or(ScanError::ReferenceOutOfRange {
                start,
                end,
                len: reference.len(),
            })
    }

    /// Record the source note and the formatted note; return their `ltag:` forms.
    fn record_notes(&mut self, record_note: Option<&str>, note: String) -> Vec<String> {
        let mut carried = Vec::with_capacity(2);
        if let Some(record) = record_note {
            self.state.notes.push(record.to_string());
            carried.push(format!("ltag: {}", record));
        }
        carried.push(format!("ltag: {}", note));
        self.state.notes.push(note);
        carried
    }

    /// Fill `[cursor, to)` with no-calls or reference, annotated as a gap.
    fn fill_gap(&mut self, to: u64) -> Result<()> {
        let from = self.state.cursor();
        if to <= from {
            return Ok(());
        }
        let config = self.config;
        let chrom = self.index.chrom();
        let len = to - from;
        self.state.notes.push(format!(
            "{} {} {} {} GAP {} {}",
            config.build,
            chrom,
            from,
            to - 1,
            self.state.seq.len(),
            len
        ));
        let carried = format!(
            "gapOnTag {} {} {} {} GAP - {}",
            config.build,
            chrom,
            from,
            to - 1,
            len
        );
        let payload = match config.gap_fill {
            GapFill::NoCall => Payload::NoCall,
            GapFill::Reference => Payload::Reference,
        };
        self.apply(Edit {
            start: from,
            len,
            payload,
            tag_notes: vec![carried],
        })
    }

    fn apply(&mut self, edit: Edit<'_>) -> Result<()> {
        let cursor = self.state.cursor();
        if edit.start != cursor {
            return Err(ScanError::OutOfOrder {
                pos: edit.start,
                cursor,
            });
        }

        let end = edit.start + edit.len;
        let mut pos = edit.start;
        let mut lumped_pending = true;
        loop {
            let window = self.commit_point();
            let piece_end = match window {
                Some((_, commit_point)) if end >= commit_point => commit_point,
                _ => end,
            };
            self.append_piece(&edit, pos, piece_end, window, &mut lumped_pending)?;
            pos = piece_end;

            if let Some((_, commit_point)) = window {
                if pos == commit_point {
                    self.reconcile()?;
                }
            }
            if pos >= end {
                return Ok(());
            }
        }
    }

    /// Append the output for reference span `[a, b)` of `edit`, where `b`
    /// never passes the current commit point.
    fn append_piece(
        &mut self,
        edit: &Edit<'_>,
        a: u64,
        b: u64,
        window: Option<(u64, u64)>,
        lumped_pending: &mut bool,
    ) -> Result<()> {
        let before = self.state.seq.len();
        match edit.payload {
            Payload::Reference => {
                let bases = self.reference_slice(a, b)?;
                self.state.seq.extend_from_slice(bases);
            }
            Payload::NoCall => {
                self.state.seq.resize(before + (b - a) as usize, b'n');
            }
            Payload::Bases(bases) => {
                let offset = (a - edit.start) as usize;
                self.state
                    .seq
                    .extend_from_slice(&bases[offset..offset + (b - a) as usize]);
            }
            Payload::Inserted(bytes) | Payload::Token(bytes) => {
                if *lumped_pending {
                    self.state.seq.extend_from_slice(bytes);
                    *lumped_pending = false;
                }
            }
            Payload::Deleted => {}
        }

        if let Some((boundary, _)) = window {
            if b > boundary {
                let appended = &self.state.seq[before..];
                let skip = if edit.payload.is_lumped() {
                    0
                } else {
                    (boundary.saturating_sub(a) as usize).min(appended.len())
                };
                self.state.right_tag.extend_from_slice(&appended[skip..]);
                if edit.payload.is_variant() {
                    self.state.variant_on_tag = true;
                }
                for note in &edit.tag_notes {
                    self.state.carry(note);
                }
            }
        }

        self.state.advance(b - a);
        Ok(())
    }

    fn commit(&mut self, end_tile: bool) -> Result<()> {
        if let Some(prev) = &self.last_right_tag {
            if *prev != self.state.left_tag_actual {
                let tile_id = self
                    .index
                    .tile(self.state.first_tile)
                    .map(|t| t.tile_id.with_variant(self.stream.variant_id()))
                    .unwrap_or_default();
                return Err(ScanError::MalformedTile {
                    tile_id,
                    reason: "left tag does not continue the previous right tag".to_string(),
                });
            }
        }

        let record = build_record(
            PendingTile {
                seq: &self.state.seq,
                left_tag: &self.state.left_tag_actual,
                right_tag: &self.state.right_tag,
                first_tile: self.state.first_tile,
                last_tile: self.state.boundary_pos - 1,
                seed_tile_length: self.state.seed_tile_length,
                notes: &self.state.notes,
                end_tile,
            },
            self.index,
            self.stream,
            self.config.policy,
            self.config.reports_nocalls(),
        )?;
        log::trace!(
            "{} stream {}: committed {} ({} bp, seed {})",
            self.index.chrom(),
            self.stream,
            record.tile_id,
            record.seq.len(),
            record.seed_tile_length
        );
        self.last_right_tag = Some(self.state.right_tag.clone());
        self.emitted.push(record);
        Ok(())
    }
}

#[inline]
fn end_inclusive(pos: u64, len: u64) -> i64 {
    pos as i64 + len as i64 - 1
}

fn display_allele(bases: &[u8]) -> String {
    if bases.is_empty() {
        "-".to_string()
    } else {
        String::from_utf8_lossy(bases).into_owned()
    }
}
