//! Command implementations for tilescan.

pub mod check;
pub mod tile;

pub use crate::streaming::{verify_sorted, SortValidator};
pub use check::{CheckCommand, CheckStats};
pub use tile::{DiffInput, PathOutput, TileCommand, TileError, TileStats};
