//! Reference tile library.
//!
//! The library is a FastJ file of reference tiles. Each tile's locus string
//! `<build> <chrom> <start>[-overhang] <end>[+overhang]` places it on the
//! reference; the tile starts at `<start>` and the largest `<end>` of a path
//! becomes that path's sentinel. Only copy `000` tiles define boundaries.

use crate::diff::{DiffError, Result};
use crate::fastj::{FastjReader, FastjRecord};
use crate::index::{BoundaryIndex, TileBoundary, TileId};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

/// A parsed locus string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusRange {
    pub build: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl LocusRange {
    /// Parse `<build> <chrom> <start>[-o] <end>[+o]`, requiring `build` to match.
    pub fn parse(locus: &str, build: &str) -> Option<Self> {
        let mut fields = locus.split_whitespace();
        if fields.next()? != build {
            return None;
        }
        let chrom = fields.next()?;
        let start = leading_number(fields.next()?, '-')?;
        let end = leading_number(fields.next()?, '+')?;
        Some(Self {
            build: build.to_string(),
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

/// `123` or `123<sep>45`, returning 123.
fn leading_number(field: &str, overhang_sep: char) -> Option<u64> {
    let head = match field.split_once(overhang_sep) {
        Some((head, tail)) => {
            if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            head
        }
        None => field,
    };
    if head.is_empty() || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// All paths of a reference tile library, keyed by path id.
#[derive(Debug, Clone, Default)]
pub struct TileLibrary {
    paths: BTreeMap<u32, BoundaryIndex>,
}

impl TileLibrary {
    /// Load a (optionally gzipped) library FastJ file.
    pub fn from_path<P: AsRef<Path>>(path: P, build: &str, tag_len: u64) -> Result<Self> {
        Self::from_reader(FastjReader::from_path(path)?, build, tag_len)
    }

    pub fn from_reader<R: BufRead>(reader: FastjReader<R>, build: &str, tag_len: u64) -> Result<Self> {
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }
        Self::from_records(&records, build, tag_len)
    }

    /// Build per-path boundary indexes from reference tile records.
    pub fn from_records(records: &[FastjRecord], build: &str, tag_len: u64) -> Result<Self> {
        struct PathTiles {
            chrom: String,
            sentinel: u64,
            tiles: Vec<TileBoundary>,
        }

        let mut grouped: BTreeMap<u32, PathTiles> = BTreeMap::new();

        for record in records {
            let header = &record.header;
            let tile_id: TileId = header
                .tile_id
                .parse()
                .map_err(DiffError::InvalidFormat)?;
            if tile_id.copy != 0 {
                continue;
            }

            let located = header
                .locus
                .iter()
                .find_map(|l| LocusRange::parse(&l.build, build).map(|r| (r, l.build.clone())));
            let Some((range, locus)) = located else {
                log::warn!(
                    "Skipping reference tile {}: no '{}' locus",
                    header.tile_id,
                    build
                );
                continue;
            };

            let entry = grouped.entry(tile_id.path).or_insert_with(|| PathTiles {
                chrom: range.chrom.clone(),
                sentinel: range.end,
                tiles: Vec::new(),
            });
            if entry.chrom != range.chrom {
                return Err(DiffError::InvalidFormat(format!(
                    "Path {:x} spans chromosomes {} and {}",
                    tile_id.path, entry.chrom, range.chrom
                )));
            }
            entry.sentinel = entry.sentinel.max(range.end);
            entry.tiles.push(TileBoundary {
                start: range.start,
                tile_id,
                start_tag: header.start_tag.clone(),
                end_tag: header.end_tag.clone(),
                locus,
            });
        }

        let mut paths = BTreeMap::new();
        for (path, mut group) in grouped {
            group.tiles.sort_by_key(|t| t.start);
            let index = BoundaryIndex::new(path, group.chrom, group.tiles, group.sentinel, tag_len)?;
            log::debug!(
                "Path {:x}: {} tiles on {} [{}, {})",
                path,
                index.tile_count(),
                index.chrom(),
                index.start(),
                index.end()
            );
            paths.insert(path, index);
        }

        if paths.is_empty() {
            return Err(DiffError::InvalidFormat(format!(
                "Tile library holds no '{}' reference tiles",
                build
            )));
        }

        Ok(Self { paths })
    }

    pub fn get(&self, path: u32) -> Option<&BoundaryIndex> {
        self.paths.get(&path)
    }

    /// Paths in ascending id order.
    pub fn paths(&self) -> impl Iterator<Item = &BoundaryIndex> {
        self.paths.values()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
