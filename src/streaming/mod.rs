//! Shared streaming utilities.
//!
//! This module provides the pieces every reader and command share:
//! - Zero-allocation line parsing and gzip-aware input opening
//! - Sort validation of diff streams
//! - Buffered FastJ output

pub mod buffers;
pub mod output;
pub mod parsing;
pub mod validation;

pub use output::{open_output, FastjWriter};
pub use parsing::{open_input, parse_u64_fast, should_skip_line};
pub use validation::{verify_sorted, SortValidator};
