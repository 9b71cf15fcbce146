//! Path filter policy.
//!
//! Decides, for each directory entry met during a scan, whether it is
//! included in the snapshot, skipped, or whether its whole subtree is
//! pruned. The rules are applied in a fixed order:
//!
//! 1. Hidden entries are skipped/pruned unless `index_hidden` is set
//! 2. Entries deeper than `max_depth` are pruned
//! 3. Name filters are exclusion globs matched against the base name
//! 4. Mime filters are inclusion patterns; an entry is included only if
//!    its classification matches at least one pattern
//!
//! Note that an empty mime-filter list matches nothing: callers must
//! supply sane defaults (see [`FilterPolicy::default`]).

use crate::error::{LanternError, Result};
use crate::types::EntryKind;

/// Default name filters (exclusion globs)
pub const DEFAULT_NAME_FILTERS: &[&str] = &[".DS_Store"];

/// Default mime filters (inclusion patterns)
pub const DEFAULT_MIME_FILTERS: &[&str] = &["inode/directory", "application/*"];

/// Default maximum traversal depth (0 = root only)
pub const DEFAULT_MAX_DEPTH: u32 = 100;

/// Default rescan interval in seconds (0 disables the timer)
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 15;

/// The policy's decision for a single directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Emit the entry; descend if it is a directory
    Include,
    /// Omit the entry but continue with its siblings
    Skip,
    /// Omit the entry and do not descend into it
    Prune,
}

/// A directory entry as seen by the policy, before it becomes an `Entry`.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Base name of the entry
    pub name: &'a str,

    /// File, directory, or other
    pub kind: EntryKind,

    /// Whether the entry is hidden
    pub hidden: bool,

    /// Whether the entry is a symbolic link
    pub symlink: bool,

    /// Depth from the scan root (root's children are depth 1)
    pub depth: u32,

    /// Mime classification of the entry
    pub mime: &'a str,
}

/// Per-root filter configuration and the predicate logic over it.
///
/// Name patterns are compiled eagerly so an invalid glob surfaces at
/// configuration time, not mid-scan. The original pattern strings are
/// retained for persistence round-trips.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    name_filters: Vec<String>,
    name_patterns: Vec<glob::Pattern>,
    mime_filters: Vec<String>,

    /// Include hidden entries
    pub index_hidden: bool,

    /// Descend into symlinked directories
    pub follow_symlinks: bool,

    /// Maximum traversal depth (0 = root only)
    pub max_depth: u32,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        // Defaults are all valid literals, compilation cannot fail
        FilterPolicy::new(
            DEFAULT_NAME_FILTERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_MIME_FILTERS.iter().map(|s| s.to_string()).collect(),
            false,
            false,
            DEFAULT_MAX_DEPTH,
        )
        .unwrap_or_else(|_| FilterPolicy {
            name_filters: Vec::new(),
            name_patterns: Vec::new(),
            mime_filters: DEFAULT_MIME_FILTERS.iter().map(|s| s.to_string()).collect(),
            index_hidden: false,
            follow_symlinks: false,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }
}

impl FilterPolicy {
    /// Build a policy, compiling the name filter globs.
    pub fn new(
        name_filters: Vec<String>,
        mime_filters: Vec<String>,
        index_hidden: bool,
        follow_symlinks: bool,
        max_depth: u32,
    ) -> Result<Self> {
        let name_patterns = name_filters
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| LanternError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FilterPolicy {
            name_filters,
            name_patterns,
            mime_filters,
            index_hidden,
            follow_symlinks,
            max_depth,
        })
    }

    /// The configured name filters (exclusion globs), in order.
    pub fn name_filters(&self) -> &[String] {
        &self.name_filters
    }

    /// The configured mime filters (inclusion patterns), in order.
    pub fn mime_filters(&self) -> &[String] {
        &self.mime_filters
    }

    /// Decide what to do with one directory entry.
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Verdict {
        let is_dir = candidate.kind == EntryKind::Dir;

        if candidate.hidden && !self.index_hidden {
            return if is_dir { Verdict::Prune } else { Verdict::Skip };
        }

        if candidate.depth > self.max_depth {
            return Verdict::Prune;
        }

        for pattern in &self.name_patterns {
            if pattern.matches(candidate.name) {
                return if is_dir { Verdict::Prune } else { Verdict::Skip };
            }
        }

        if !self.mime_matches(candidate.mime) {
            // A skipped directory is still descended into so matching
            // files below it are found
            return Verdict::Skip;
        }

        Verdict::Include
    }

    /// Whether the traversal should descend into a directory entry.
    ///
    /// Pruned directories are never descended into. Symlinked directories
    /// are treated as leaves unless `follow_symlinks` is set, even when
    /// the entry itself is listed.
    pub fn should_descend(&self, candidate: &Candidate<'_>) -> bool {
        if candidate.kind != EntryKind::Dir {
            return false;
        }
        if candidate.symlink && !self.follow_symlinks {
            return false;
        }
        // Descending one level deeper must stay within max_depth
        if candidate.depth >= self.max_depth {
            return false;
        }
        !matches!(self.evaluate(candidate), Verdict::Prune)
    }

    /// Match a mime classification against the inclusion patterns.
    ///
    /// Supports trailing-wildcard prefix matching (`application/*`) and
    /// exact matches. An empty pattern list matches nothing.
    fn mime_matches(&self, mime: &str) -> bool {
        self.mime_filters.iter().any(|pattern| {
            if let Some(prefix) = pattern.strip_suffix('*') {
                mime.starts_with(prefix)
            } else {
                mime == pattern
            }
        })
    }
}
