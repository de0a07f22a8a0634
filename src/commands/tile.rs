//! Tile an individual genome.
//!
//! Loads the reference tile library, the reference FASTA and a sorted diff
//! stream, then scans every path of the library in parallel and writes the
//! resulting tiles as FastJ in path order.
//!
//! # Streams
//!
//! Phased policies run two scanners per path (stream A, stream B). After
//! each diff event the tiles committed by A are written before those of B.
//! The unphased regex policy runs stream A only.
//!
//! # Failures
//!
//! A scan error aborts its path only. The failure is logged, counted in
//! [`TileStats::paths_failed`], and the remaining paths are still written.
//! A malformed diff record or unknown variant kind fails every path on that
//! record's chromosome in the same way.

use crate::config::ScanConfig;
use crate::diff::{DiffError, DiffReader};
use crate::genome::{ChromBuffer, ReferenceGenome};
use crate::index::BoundaryIndex;
use crate::library::TileLibrary;
use crate::parallel::{group_by_path, process_paths, ParallelStats};
use crate::policy::{PolicyResolver, Resolution, StreamCall};
use crate::scan::{ScanError, Stream, TileRecord, TileScanner};
use crate::streaming::{FastjWriter, SortValidator};
use crate::variant::{AlleleCall, DiffEvent, Variant, VariantKind};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileError {
    #[error(transparent)]
    Input(#[from] DiffError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No reference sequence for chromosome '{0}'")]
    MissingReference(String),
}

/// A diff stream read for tiling.
#[derive(Debug, Default, Clone)]
pub struct DiffInput {
    pub events: Vec<DiffEvent>,
    /// Chromosomes with a malformed record, and the first error seen on each.
    pub rejected: BTreeMap<String, String>,
}

/// Tiles produced for one path.
#[derive(Debug, Default, Clone)]
pub struct PathOutput {
    pub records: Vec<TileRecord>,
    pub deferred_commits: usize,
}

/// Tile command configuration.
#[derive(Debug, Clone, Default)]
pub struct TileCommand {
    pub config: ScanConfig,
    /// Skip sort validation of the diff stream.
    pub assume_sorted: bool,
}

impl TileCommand {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            assume_sorted: false,
        }
    }

    pub fn with_assume_sorted(mut self, assume_sorted: bool) -> Self {
        self.assume_sorted = assume_sorted;
        self
    }

    /// Load all inputs from disk and tile them into `output`.
    pub fn run<P1, P2, P3, W>(
        &self,
        library_path: P1,
        reference_path: P2,
        diff_path: P3,
        output: W,
    ) -> Result<TileStats, TileError>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
        P3: AsRef<Path>,
        W: Write,
    {
        let started = Instant::now();
        let library =
            TileLibrary::from_path(&library_path, &self.config.build, self.config.tag_len)?;
        let genome = ReferenceGenome::from_fasta(&reference_path)?;
        let input = self.read_events(DiffReader::from_path(&diff_path)?)?;
        log::info!(
            "Loaded {} paths, {} reference sequences, {} diff events in {:.2?}",
            library.len(),
            genome.len(),
            input.events.len(),
            started.elapsed()
        );
        self.tile_input(&library, &genome, input, output)
    }

    /// Read and (unless `assume_sorted`) validate the whole diff stream.
    ///
    /// A malformed record or unknown variant kind rejects its chromosome
    /// only; reading continues. I/O and sort-order errors are fatal.
    pub fn read_events<R: BufRead>(&self, mut reader: DiffReader<R>) -> Result<DiffInput, TileError> {
        let mut validator = SortValidator::new();
        let mut input = DiffInput::default();
        loop {
            let event = match reader.read_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e @ (DiffError::Parse { .. } | DiffError::UnknownKind { .. })) => {
                    let chrom = reader.last_chrom().to_string();
                    log::error!("Rejecting diff stream for {}: {}", chrom, e);
                    input.rejected.entry(chrom).or_insert_with(|| e.to_string());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !self.assume_sorted {
                validator.validate(&event.chrom, event.start)?;
            }
            input.events.push(event);
        }
        Ok(input)
    }

    /// Tile every path of `library` and write the records to `output`.
    pub fn tile<W: Write>(
        &self,
        library: &TileLibrary,
        genome: &ReferenceGenome,
        events: Vec<DiffEvent>,
        output: W,
    ) -> Result<TileStats, TileError> {
        let input = DiffInput {
            events,
            ..Default::default()
        };
        self.tile_input(library, genome, input, output)
    }

    /// Like [`TileCommand::tile`], failing the paths of every rejected chromosome.
    pub fn tile_input<W: Write>(
        &self,
        library: &TileLibrary,
        genome: &ReferenceGenome,
        input: DiffInput,
        output: W,
    ) -> Result<TileStats, TileError> {
        let DiffInput { events, rejected } = input;
        let mut stats = TileStats {
            paths: library.len(),
            events_read: events.len(),
            ..Default::default()
        };

        let groups = group_by_path(events, library);
        stats.events_dropped = groups.dropped;
        let distribution = ParallelStats::from_groups(&groups);
        log::debug!(
            "{} events routed to {} of {} paths",
            distribution.total_events,
            distribution.num_paths,
            library.len()
        );

        let results = process_paths(library, &groups, |index, events| {
            let started = Instant::now();
            let result = if let Some(reason) = rejected.get(index.chrom()) {
                Err(TileError::Input(DiffError::InvalidFormat(format!(
                    "diff stream for {} was rejected: {}",
                    index.chrom(),
                    reason
                ))))
            } else {
                match genome.get(index.chrom()) {
                    Some(reference) => self.tile_path(index, reference, events),
                    None => Err(TileError::MissingReference(index.chrom().to_string())),
                }
            };
            if self.config.profile {
                log::info!(
                    "Path {:x}: {} events in {:.2?}",
                    index.path(),
                    events.len(),
                    started.elapsed()
                );
            }
            result
        });

        let mut writer = FastjWriter::new(output);
        for (path, result) in results {
            match result {
                Ok(out) => {
                    log::debug!("Path {:x}: {} tiles", path, out.records.len());
                    stats.deferred_commits += out.deferred_commits;
                    for record in &out.records {
                        writer.write_record(&record.to_header(), &record.seq)?;
                    }
                    stats.tiles_emitted += out.records.len();
                }
                Err(e) => {
                    log::error!("Path {:x} failed: {}", path, e);
                    stats.paths_failed += 1;
                }
            }
        }
        writer.flush()?;

        if self.config.profile {
            log::info!("{}", stats);
        }
        Ok(stats)
    }

    /// Scan one path.
    ///
    /// `events` must be sorted and routed to this path.
    pub fn tile_path(
        &self,
        index: &BoundaryIndex,
        reference: &ChromBuffer,
        events: &[DiffEvent],
    ) -> Result<PathOutput, TileError> {
        let config = &self.config;
        let mut resolver = PolicyResolver::new(config.policy, config.seed ^ index.path() as u64);
        let mut stream_a = TileScanner::new(reference, index, config, Stream::A);
        let mut stream_b = (config.policy.stream_count() > 1)
            .then(|| TileScanner::new(reference, index, config, Stream::B));

        let mut records = Vec::new();
        for event in events {
            match &event.variant {
                Variant::Ref { .. } => {
                    stream_a.process_ref(event.start, event.len())?;
                    if let Some(b) = stream_b.as_mut() {
                        b.process_ref(event.start, event.len())?;
                    }
                }
                Variant::Snp(call) | Variant::Sub(call) | Variant::Indel(call) => {
                    let provenance = Some(event.provenance.as_str()).filter(|p| !p.is_empty());
                    match resolver.resolve(event.kind(), call) {
                        Resolution::Phased { a, b } => {
                            apply_call(&mut stream_a, event, call, &a, provenance)?;
                            if let Some(scanner) = stream_b.as_mut() {
                                apply_call(scanner, event, call, &b, provenance)?;
                            }
                        }
                        Resolution::Unified(token) => {
                            apply_token(&mut stream_a, event, call, &token, provenance)?;
                        }
                    }
                }
            }
            records.extend(stream_a.drain_records());
            if let Some(b) = stream_b.as_mut() {
                records.extend(b.drain_records());
            }
        }

        log::debug!(
            "Path {:x}: events consumed up to {}",
            index.path(),
            stream_a.offset()
        );
        stream_a.finish()?;
        records.extend(stream_a.drain_records());
        let mut deferred_commits = stream_a.deferred_commits();
        if let Some(mut b) = stream_b {
            b.finish()?;
            records.extend(b.drain_records());
            deferred_commits += b.deferred_commits();
        }

        Ok(PathOutput {
            records,
            deferred_commits,
        })
    }
}

/// Feed one stream's call for a phased record.
fn apply_call(
    scanner: &mut TileScanner<'_>,
    event: &DiffEvent,
    call: &AlleleCall,
    stream_call: &StreamCall,
    provenance: Option<&str>,
) -> Result<(), ScanError> {
    let alt = match stream_call {
        StreamCall::Reference => return scanner.process_ref(event.start, event.len()),
        StreamCall::Alt(alt) => alt,
    };
    let kind = event.kind();
    if matches!(kind, VariantKind::Snp | VariantKind::Sub) && alt.len() as u64 == event.len() {
        scanner.process_sub(event.start, alt.as_bytes(), kind, provenance)
    } else {
        scanner.process_indel(
            event.start,
            alt.as_bytes(),
            call.reference.as_bytes(),
            provenance,
        )
    }
}

/// Feed the unified stream for an unphased record.
fn apply_token(
    scanner: &mut TileScanner<'_>,
    event: &DiffEvent,
    call: &AlleleCall,
    token: &StreamCall,
    provenance: Option<&str>,
) -> Result<(), ScanError> {
    let token = match token {
        StreamCall::Reference => return scanner.process_ref(event.start, event.len()),
        StreamCall::Alt(token) => token,
    };
    let reference = call.reference.as_bytes();
    match event.kind() {
        VariantKind::Snp if event.len() == 1 => {
            scanner.process_regex_snp(event.start, token, reference, provenance)
        }
        kind => scanner.process_regex_alteration(event.start, token, reference, kind, provenance),
    }
}

/// Statistics from a tile run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TileStats {
    pub paths: usize,
    pub paths_failed: usize,
    pub events_read: usize,
    /// Events outside every path.
    pub events_dropped: usize,
    pub tiles_emitted: usize,
    pub deferred_commits: usize,
}

impl std::fmt::Display for TileStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Paths: {} ({} failed), Events: {} ({} dropped), Tiles: {}, Deferred commits: {}",
            self.paths,
            self.paths_failed,
            self.events_read,
            self.events_dropped,
            self.tiles_emitted,
            self.deferred_commits
        )
    }
}
