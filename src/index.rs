//! Per-path tile boundary index.
//!
//! A path is tiled by a strictly increasing list of tile-start offsets
//! followed by an end-of-path sentinel. Tile `i` spans the reference range
//! `[b[i], b[i+1] + tag_len)`: its right tag is the first `tag_len` bases of
//! tile `i + 1`. The final tile ends at the sentinel and has no right tag.

use crate::diff::{DiffError, Result};
use std::fmt;
use std::str::FromStr;

/// A reference tile id, `path.rev.step.copy` with hex components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileId {
    pub path: u32,
    pub rev: u32,
    pub step: u32,
    pub copy: u32,
    text: [String; 3],
}

impl TileId {
    pub fn new(path: u32, rev: u32, step: u32, copy: u32) -> Self {
        Self {
            path,
            rev,
            step,
            copy,
            text: [
                format!("{:03x}", path),
                format!("{:02x}", rev),
                format!("{:04x}", step),
            ],
        }
    }

    /// Id of a tile derived from this one, keeping the textual path, revision
    /// and step of the reference id and replacing the copy with `variant`.
    pub fn with_variant(&self, variant: u32) -> String {
        format!(
            "{}.{}.{:0>4}.{:03x}",
            self.text[0], self.text[1], self.text[2], variant
        )
    }
}

impl FromStr for TileId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 4 {
            return Err(format!("Invalid tile id '{}'", s));
        }
        let hex = |p: &str| {
            u32::from_str_radix(p, 16).map_err(|_| format!("Invalid tile id '{}'", s))
        };
        Ok(Self {
            path: hex(parts[0])?,
            rev: hex(parts[1])?,
            step: hex(parts[2])?,
            copy: hex(parts[3])?,
            text: [
                parts[0].to_string(),
                parts[1].to_string(),
                parts[2].to_string(),
            ],
        })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{:03x}",
            self.text[0], self.text[1], self.text[2], self.copy
        )
    }
}

/// One reference tile as seen by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBoundary {
    pub start: u64,
    pub tile_id: TileId,
    /// Canonical start tag (empty for the first tile of a path).
    pub start_tag: String,
    /// Canonical end tag (empty for the last tile of a path).
    pub end_tag: String,
    /// Locus build string copied onto emitted tiles.
    pub locus: String,
}

/// Ordered tile starts of one path plus the end-of-path sentinel.
#[derive(Debug, Clone)]
pub struct BoundaryIndex {
    path: u32,
    chrom: String,
    tiles: Vec<TileBoundary>,
    boundaries: Vec<u64>,
    tag_len: u64,
}

impl BoundaryIndex {
    /// Build an index, validating the boundary algebra.
    ///
    /// Tiles must be sorted, strictly increasing, spaced at least `tag_len`
    /// apart, and the sentinel must lie at least `tag_len` past the last start.
    pub fn new(
        path: u32,
        chrom: impl Into<String>,
        tiles: Vec<TileBoundary>,
        sentinel: u64,
        tag_len: u64,
    ) -> Result<Self> {
        if tiles.is_empty() {
            return Err(DiffError::InvalidFormat(format!(
                "Path {:x} has no reference tiles",
                path
            )));
        }

        for pair in tiles.windows(2) {
            if pair[1].start < pair[0].start + tag_len.max(1) {
                return Err(DiffError::InvalidFormat(format!(
                    "Path {:x}: tile {} starts at {}, less than {} past tile {} at {}",
                    path, pair[1].tile_id, pair[1].start, tag_len, pair[0].tile_id, pair[0].start
                )));
            }
        }

        let last = tiles[tiles.len() - 1].start;
        if sentinel < last + tag_len.max(1) {
            return Err(DiffError::InvalidFormat(format!(
                "Path {:x}: end {} is less than {} past the last tile start {}",
                path, sentinel, tag_len, last
            )));
        }

        let mut boundaries: Vec<u64> = tiles.iter().map(|t| t.start).collect();
        boundaries.push(sentinel);

        Ok(Self {
            path,
            chrom: chrom.into(),
            tiles,
            boundaries,
            tag_len,
        })
    }

    pub fn path(&self) -> u32 {
        self.path
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    #[inline]
    pub fn tag_len(&self) -> u64 {
        self.tag_len
    }

    /// Tile starts followed by the sentinel.
    #[inline]
    pub fn boundaries(&self) -> &[u64] {
        &self.boundaries
    }

    /// Number of reference tiles.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn tile(&self, idx: usize) -> Option<&TileBoundary> {
        self.tiles.get(idx)
    }

    /// First tile start.
    #[inline]
    pub fn start(&self) -> u64 {
        self.boundaries[0]
    }

    /// End-of-path sentinel.
    #[inline]
    pub fn end(&self) -> u64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// The boundary after `idx`, or None past the sentinel.
    #[inline]
    pub fn next(&self, idx: usize) -> Option<u64> {
        self.boundaries.get(idx + 1).copied()
    }

    /// Id of the tile starting exactly at `offset`.
    pub fn tile_id_at(&self, offset: u64) -> Option<&TileId> {
        self.tiles
            .binary_search_by_key(&offset, |t| t.start)
            .ok()
            .map(|i| &self.tiles[i].tile_id)
    }

    /// Index of the tile whose start is the greatest one `<= pos`.
    pub fn locate(&self, pos: u64) -> Option<usize> {
        if pos < self.start() || pos >= self.end() {
            return None;
        }
        Some(self.boundaries.partition_point(|&b| b <= pos) - 1)
    }

    /// The range `[start, end)` lies entirely inside the path.
    #[inline]
    pub fn covers(&self, start: u64, end: u64) -> bool {
        start >= self.start() && end <= self.end()
    }

    /// The range `[start, end)` shares at least one base with the path.
    #[inline]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end() && end > self.start()
    }
}
