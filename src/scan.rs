//! Source scanning.
//!
//! The scanner walks a root directory once and builds a [`LayerIndex`]
//! mapping layer names to file locators. It never opens a dataset and never
//! fails: unreadable entries are recorded as [`ScanWarning`]s and skipped.
//!
//! Each call is independent of previous calls, so a reload simply scans
//! again and swaps in the new index.
//!
//! # Collisions
//!
//! Two files in different directories can derive the same name (for example
//! `a/lake.shp` and `b/lake.shp`). The file visited later replaces the earlier
//! one and a [`ScanWarning::Collision`] is recorded. Traversal is sorted by
//! file name within each directory, so the winner is stable between scans.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ProviderConfig;
use crate::error::ScanWarning;
use crate::name::{IndexEntry, Locator, Name};

// =============================================================================
// Suffix Mask
// =============================================================================

/// Case-insensitive set of accepted file extensions (without the dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixMask {
    suffixes: Vec<String>,
}

impl SuffixMask {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Check whether a file's extension is in the mask.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

// =============================================================================
// Layer Selection
// =============================================================================

/// Include/exclude/"load all" policy applied to local layer names.
///
/// - Excluded names are never indexed.
/// - A non-empty include list restricts the index to exactly those names.
/// - Otherwise every name is indexed iff `load_all` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSelection {
    include: HashSet<String>,
    exclude: HashSet<String>,
    load_all: bool,
}

impl LayerSelection {
    /// Select every layer.
    pub fn all() -> Self {
        Self {
            load_all: true,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            include: config.include.iter().cloned().collect(),
            exclude: config.exclude.iter().cloned().collect(),
            load_all: config.load_all,
        }
    }

    pub fn admits(&self, local: &str) -> bool {
        if self.exclude.contains(local) {
            return false;
        }
        if !self.include.is_empty() {
            return self.include.contains(local);
        }
        self.load_all
    }
}

// =============================================================================
// Layer Index
// =============================================================================

/// Name to locator index held by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    entries: HashMap<Name, Locator>,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the locator it replaced.
    pub fn insert(&mut self, entry: IndexEntry) -> Option<Locator> {
        self.entries.insert(entry.name, entry.locator)
    }

    pub fn get(&self, name: &Name) -> Option<&Locator> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.entries.iter().map(|(name, locator)| IndexEntry {
            name: name.clone(),
            locator: locator.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Result of one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub index: LayerIndex,
    pub warnings: Vec<ScanWarning>,
    /// Files whose suffix matched the mask
    pub matched: usize,
    /// Matching files rejected by the layer selection
    pub filtered: usize,
}

/// Builds a layer index for one root directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceScanner;

impl SourceScanner {
    /// Walk `root` recursively and index every admitted file matching `mask`.
    ///
    /// `namespace` is the already-resolved namespace stamped on every name.
    pub fn scan(
        root: &Path,
        mask: &SuffixMask,
        namespace: Option<&str>,
        selection: &LayerSelection,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    record(
                        &mut report,
                        ScanWarning::Unreadable {
                            path,
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() || !mask.matches(entry.path()) {
                continue;
            }
            report.matched += 1;

            let Some(local) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                record(
                    &mut report,
                    ScanWarning::Unreadable {
                        path: entry.path().to_path_buf(),
                        reason: "file name is not valid UTF-8".to_string(),
                    },
                );
                continue;
            };

            if !selection.admits(local) {
                report.filtered += 1;
                continue;
            }

            let name = Name::new(namespace, local);
            let locator = Locator::new(entry.path());
            let replaced = report.index.insert(IndexEntry {
                name: name.clone(),
                locator: locator.clone(),
            });

            if let Some(previous) = replaced {
                record(
                    &mut report,
                    ScanWarning::Collision {
                        name,
                        kept: locator.path().to_path_buf(),
                        replaced: previous.path().to_path_buf(),
                    },
                );
            }
        }

        debug!(
            root = %root.display(),
            layers = report.index.len(),
            matched = report.matched,
            filtered = report.filtered,
            warnings = report.warnings.len(),
            "Scan complete"
        );

        report
    }
}

fn record(report: &mut ScanReport, warning: ScanWarning) {
    warn!("{}", warning);
    report.warnings.push(warning);
}

// =============================================================================
// Tests
// =============================================================================
