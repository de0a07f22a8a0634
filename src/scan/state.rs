//! Per-stream scan state.

use crate::index::BoundaryIndex;
use crate::streaming::buffers::DEFAULT_TILE_BUFFER;

/// Scan life cycle: `Running -> CommitPending -> Committed -> Running`,
/// terminal `EndOfBand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// A commit was deferred because a variant sits on the tag.
    CommitPending,
    /// A tile was just emitted; nothing appended since.
    Committed,
    EndOfBand,
}

/// Cursor and buffer state of one allele stream.
///
/// The actual cursor marks where the tile being built starts; the virtual
/// cursor marks the reference tile currently being consumed. They share an
/// end position. They differ in start only while commits are deferred.
#[derive(Debug, Clone)]
pub struct ScanState {
    pub(crate) actual_start: u64,
    pub(crate) actual_len: u64,
    pub(crate) virtual_start: u64,
    pub(crate) virtual_len: u64,

    pub(crate) seq: Vec<u8>,
    pub(crate) left_tag_actual: Vec<u8>,
    pub(crate) left_tag_virtual: Vec<u8>,
    pub(crate) right_tag: Vec<u8>,

    pub(crate) variant_on_tag: bool,
    pub(crate) seed_tile_length: u32,

    pub(crate) notes: Vec<String>,
    pub(crate) carry_over: Vec<String>,

    /// Index into the boundary list of the next (uncommitted) boundary.
    pub(crate) boundary_pos: usize,
    /// Index of the reference tile the pending output starts at.
    pub(crate) first_tile: usize,

    pub(crate) phase: Phase,
}

impl ScanState {
    pub fn new(index: &BoundaryIndex, base_note: Option<&str>) -> Self {
        let start = index.start();
        Self {
            actual_start: start,
            actual_len: 0,
            virtual_start: start,
            virtual_len: 0,
            seq: Vec::with_capacity(DEFAULT_TILE_BUFFER),
            left_tag_actual: Vec::new(),
            left_tag_virtual: Vec::new(),
            right_tag: Vec::new(),
            variant_on_tag: false,
            seed_tile_length: 1,
            notes: base_note.map(str::to_string).into_iter().collect(),
            carry_over: Vec::new(),
            boundary_pos: 1,
            first_tile: 0,
            phase: Phase::Running,
        }
    }

    #[inline]
    pub fn actual_end(&self) -> u64 {
        self.actual_start + self.actual_len
    }

    #[inline]
    pub fn virtual_end(&self) -> u64 {
        self.virtual_start + self.virtual_len
    }

    /// Next reference position to be consumed.
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.virtual_end()
    }

    /// Consume `n` reference bases on both cursors.
    #[inline]
    pub(crate) fn advance(&mut self, n: u64) {
        self.actual_len += n;
        self.virtual_len += n;
        if self.phase == Phase::Committed {
            self.phase = Phase::Running;
        }
    }

    pub(crate) fn carry(&mut self, note: &str) {
        if !self.carry_over.iter().any(|n| n == note) {
            self.carry_over.push(note.to_string());
        }
    }

    /// Start the next tile on `tag`, which covers `[tile_start, tile_start + tag_ref_len)`.
    pub(crate) fn begin_tile(&mut self, tile_start: u64, tag_ref_len: u64, base_note: Option<&str>) {
        let tag = std::mem::take(&mut self.right_tag);
        self.seq.clear();
        self.seq.extend_from_slice(&tag);
        self.left_tag_virtual.clone_from(&tag);
        self.left_tag_actual = tag;

        self.actual_start = tile_start;
        self.actual_len = tag_ref_len;
        self.virtual_start = tile_start;
        self.virtual_len = tag_ref_len;

        let mut notes: Vec<String> = base_note.map(str::to_string).into_iter().collect();
        notes.append(&mut self.carry_over);
        self.notes = notes;

        self.first_tile = self.boundary_pos;
        self.boundary_pos += 1;
        self.seed_tile_length = 1;
        self.variant_on_tag = false;
        self.phase = Phase::Committed;
    }

    /// Fold the next reference tile into the pending output.
    pub(crate) fn defer_commit(&mut self, boundary: u64, tag_ref_len: u64) {
        self.seed_tile_length += 1;
        self.virtual_start = boundary;
        self.virtual_len = tag_ref_len;
        self.left_tag_virtual = std::mem::take(&mut self.right_tag);
        self.variant_on_tag = false;
        self.carry_over.clear();
        self.notes.push("VariantOnTag".to_string());
        self.boundary_pos += 1;
        self.phase = Phase::CommitPending;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seed_tile_length(&self) -> u32 {
        self.seed_tile_length
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn left_tag(&self) -> &[u8] {
        &self.left_tag_actual
    }

    pub fn right_tag(&self) -> &[u8] {
        &self.right_tag
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn carry_over(&self) -> &[String] {
        &self.carry_over
    }

    pub fn variant_on_tag(&self) -> bool {
        self.variant_on_tag
    }

    pub fn boundary_position(&self) -> usize {
        self.boundary_pos
    }
}
