//! Parallel processing utilities using Rayon.
//!
//! Work is distributed one path per task. Every path is independent: a
//! worker owns its scanners and its policy RNG, so results depend only on
//! the input and the seed, never on the thread count.

use crate::index::BoundaryIndex;
use crate::library::TileLibrary;
use crate::variant::{DiffEvent, VariantKind};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Diff events grouped by the path they belong to.
#[derive(Debug, Default, Clone)]
pub struct PathGroups {
    pub groups: BTreeMap<u32, Vec<DiffEvent>>,
    /// Events that fell outside every path.
    pub dropped: usize,
}

impl PathGroups {
    pub fn events(&self, path: u32) -> &[DiffEvent] {
        self.groups.get(&path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Maps events to the paths of a library, per chromosome.
pub struct PathRouter<'a> {
    by_chrom: HashMap<&'a str, Vec<&'a BoundaryIndex>>,
}

impl<'a> PathRouter<'a> {
    pub fn new(library: &'a TileLibrary) -> Self {
        let mut by_chrom: HashMap<&str, Vec<&BoundaryIndex>> = HashMap::new();
        for index in library.paths() {
            by_chrom.entry(index.chrom()).or_default().push(index);
        }
        for paths in by_chrom.values_mut() {
            paths.sort_by_key(|p| p.start());
        }
        Self { by_chrom }
    }

    /// Paths that should see `event`.
    ///
    /// Reference runs go to every path they overlap and are clipped by the
    /// scanner. Variant events must lie inside a path; an event inside the
    /// tag shared by two adjacent paths goes to both.
    pub fn route(&self, event: &DiffEvent) -> Vec<u32> {
        let is_ref = event.kind() == VariantKind::Ref;
        let Some(paths) = self.by_chrom.get(event.chrom.as_str()) else {
            return Vec::new();
        };
        paths
            .iter()
            .filter(|index| {
                if is_ref {
                    index.overlaps(event.start, event.end)
                } else {
                    index.covers(event.start, event.end)
                }
            })
            .map(|index| index.path())
            .collect()
    }
}

/// Group events by path, dropping (and counting) those no path accepts.
pub fn group_by_path(events: Vec<DiffEvent>, library: &TileLibrary) -> PathGroups {
    let router = PathRouter::new(library);
    let mut out = PathGroups::default();

    for event in events {
        let targets = router.route(&event);
        match targets.as_slice() {
            [] => {
                if event.kind() != VariantKind::Ref {
                    log::warn!(
                        "Dropping {} event at {}:{}-{}: no path covers it",
                        event.kind(),
                        event.chrom,
                        event.start,
                        event.end
                    );
                }
                out.dropped += 1;
            }
            [path] => out.groups.entry(*path).or_default().push(event),
            [rest @ .., last] => {
                for path in rest {
                    out.groups.entry(*path).or_default().push(event.clone());
                }
                out.groups.entry(*last).or_default().push(event);
            }
        }
    }
    out
}

/// Run `f` over every path of the library in parallel.
///
/// Results come back in path order.
pub fn process_paths<F, T>(library: &TileLibrary, groups: &PathGroups, f: F) -> Vec<(u32, T)>
where
    F: Fn(&BoundaryIndex, &[DiffEvent]) -> T + Sync + Send,
    T: Send,
{
    let paths: Vec<&BoundaryIndex> = library.paths().collect();
    paths
        .par_iter()
        .map(|index| (index.path(), f(index, groups.events(index.path()))))
        .collect()
}

/// Work distribution summary.
#[derive(Debug, Clone)]
pub struct ParallelStats {
    pub total_events: usize,
    pub num_paths: usize,
    pub events_per_path: Vec<(u32, usize)>,
}

impl ParallelStats {
    pub fn from_groups(groups: &PathGroups) -> Self {
        let mut events_per_path: Vec<(u32, usize)> = groups
            .groups
            .iter()
            .map(|(path, events)| (*path, events.len()))
            .collect();
        events_per_path.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            total_events: groups.groups.values().map(|v| v.len()).sum(),
            num_paths: groups.groups.len(),
            events_per_path,
        }
    }
}
