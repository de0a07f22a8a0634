// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]

//! tilescan: tile an individual genome.
//!
//! Converts a stream of reference-anchored variant calls into a sequence of
//! tag-bounded tiles, aligned to the boundaries of a reference tile library,
//! and writes them as FastJ records.
//!
//! # Features
//!
//! - **Parallel processing**: one Rayon task per tiled path
//! - **Streaming I/O**: gzip-aware readers, buffered FastJ output
//! - **Deterministic**: seeded allele orientation, independent of thread count
//!
//! # Example
//!
//! ```rust,no_run
//! use tilescan::{commands::TileCommand, config::ScanConfig, policy::VariantPolicy};
//!
//! let config = ScanConfig::new().with_policy(VariantPolicy::HetFirstAllele);
//! let stats = TileCommand::new(config)
//!     .run("library.fj", "hg19.fa", "sample.gff", std::io::stdout())
//!     .unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod commands;
pub mod config;
pub mod diff;
pub mod fastj;
pub mod genome;
pub mod index;
pub mod library;
pub mod parallel;
pub mod policy;
pub mod scan;
pub mod streaming;
pub mod variant;

// Re-export commonly used types
pub use diff::{read_events, DiffError, DiffReader};
pub use index::BoundaryIndex;
pub use scan::{ScanError, TileRecord, TileScanner};
pub use variant::{AlleleCall, DiffEvent, Variant, VariantKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{CheckCommand, TileCommand, TileStats};
    pub use crate::config::{GapFill, ScanConfig};
    pub use crate::diff::{read_events, DiffReader};
    pub use crate::fastj::{FastjHeader, FastjReader, FastjRecord};
    pub use crate::genome::{ChromBuffer, ReferenceGenome};
    pub use crate::index::BoundaryIndex;
    pub use crate::library::TileLibrary;
    pub use crate::policy::VariantPolicy;
    pub use crate::scan::{Stream, TileRecord, TileScanner};
    pub use crate::variant::{DiffEvent, Variant, VariantKind};
}
