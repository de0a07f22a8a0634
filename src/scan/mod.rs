//! Tile-boundary scan.
//!
//! A [`TileScanner`] walks one allele stream of one path, consuming diff
//! events in coordinate order and cutting the resulting sequence into tiles
//! at the reference library's boundaries. Each committed tile is handed out
//! as an immutable [`TileRecord`].

pub mod emit;
pub mod scanner;
pub mod state;

pub use emit::TileRecord;
pub use scanner::{Reconcile, TileScanner};
pub use state::{Phase, ScanState};

use std::fmt;
use thiserror::Error;

/// Errors raised by the scan state machine. All are fatal for the path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Cursor divergence: actual end {actual_end} != virtual end {virtual_end}")]
    CursorDivergence { actual_end: u64, virtual_end: u64 },

    #[error("Event at {pos} precedes scan cursor {cursor}")]
    OutOfOrder { pos: u64, cursor: u64 },

    #[error("Event at {pos} lies outside the path (end {end})")]
    OutOfBand { pos: u64, end: u64 },

    #[error("Scan already reached end of band")]
    BandFinished,

    #[error("Reference range [{start}, {end}) out of bounds (length {len})")]
    ReferenceOutOfRange { start: u64, end: u64, len: u64 },

    #[error("Malformed tile {tile_id}: {reason}")]
    MalformedTile { tile_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Which allele stream a scanner produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    A,
    B,
}

impl Stream {
    /// Variant component of emitted tile ids.
    pub fn variant_id(&self) -> u32 {
        match self {
            Stream::A => 0,
            Stream::B => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stream::A => "A",
            Stream::B => "B",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
