//! Buffer size constants for streaming operations.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default line buffer capacity (1 KB).
/// Sufficient for most diff lines; annotation columns can run longer.
pub const DEFAULT_LINE_BUFFER: usize = 1024;

/// Initial capacity of a tile sequence buffer.
/// Reference tiles are ~250bp plus two tags; merged tiles grow past this.
pub const DEFAULT_TILE_BUFFER: usize = 512;

/// Column width of the wrapped FastJ sequence body.
pub const FASTJ_LINE_WIDTH: usize = 50;
