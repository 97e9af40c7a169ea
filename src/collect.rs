//! File enumeration and the multi-predicate filter chain.
//!
//! Enumerates candidate files under a root directory and applies, in
//! order: gitignore exclusion, extension inclusion, directory exclusion,
//! test-project exclusion, size limit, binary exclusion, and glob-pattern
//! exclusion. Predicate order is cheap-first but never changes the final
//! set. Survivors carry cached size/mtime so downstream stages do not
//! stat again, and the result is sorted lexically by relative path for
//! deterministic output.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use log::{debug, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::binary;
use crate::cancel::CancelToken;
use crate::gitignore::IgnoreRule;
use crate::patterns::{PatternError, PatternMatcher};

/// Extension sentinel meaning "include every file".
pub const ALL_FILES: &str = "*";

/// Directory-name suffixes that mark any kind of test project.
const TEST_SUFFIXES: &[&str] = &[
    "test",
    "tests",
    "testing",
    "unittest",
    "unittests",
    "integrationtest",
    "integrationtests",
    "e2e",
    "e2etest",
    "e2etests",
    "benchmark",
    "benchmarks",
    "bench",
    "benches",
    "performancetest",
    "performancetests",
    "spec",
    "specs",
];

/// Suffixes that mark specifically non-unit test projects. Used to keep
/// integration/e2e/benchmark directories when only unit tests are
/// excluded.
const NON_UNIT_SUFFIXES: &[&str] = &[
    "integrationtest",
    "integrationtests",
    "e2e",
    "e2etest",
    "e2etests",
    "benchmark",
    "benchmarks",
    "bench",
    "benches",
    "performancetest",
    "performancetests",
];

const UNIT_TEST_SUFFIXES: &[&str] = &["unittest", "unittests", "test", "tests"];

/// Errors that can occur during collection.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("source path not found: {0}")]
    NotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Read-only configuration for one collection run.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Lowercase extensions without the dot; `*` includes everything.
    pub extensions: BTreeSet<String>,
    /// Directory names excluded wherever they appear as a path segment.
    pub exclude_dirs: BTreeSet<String>,
    /// Glob patterns matched against file names (or the relative path
    /// when the pattern contains `/`).
    pub exclude_patterns: Vec<String>,
    /// 0 means unlimited.
    pub max_file_size_bytes: u64,
    pub ignore_binary: bool,
    pub exclude_all_test_projects: bool,
    pub exclude_unit_test_projects_only: bool,
    pub recursive: bool,
    pub respect_gitignore: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            extensions: BTreeSet::from([ALL_FILES.to_string()]),
            exclude_dirs: BTreeSet::new(),
            exclude_patterns: Vec::new(),
            max_file_size_bytes: 0,
            ignore_binary: true,
            exclude_all_test_projects: false,
            exclude_unit_test_projects_only: false,
            recursive: true,
            respect_gitignore: true,
        }
    }
}

/// A file that survived the filter chain, with cached metadata.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub full_path: PathBuf,
    pub relative_path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

struct ExcludePattern {
    matcher: PatternMatcher,
    /// Patterns containing `/` match the relative path; others the name.
    match_relative: bool,
}

/// Enumerate and filter files under `root`.
pub fn collect(
    root: &Path,
    config: &CollectionConfig,
    ignore_rules: &[IgnoreRule],
    cancel: &CancelToken,
) -> Result<Vec<CandidateFile>, CollectError> {
    if !root.exists() {
        return Err(CollectError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CollectError::NotADirectory(root.to_path_buf()));
    }

    let exclude_patterns = config
        .exclude_patterns
        .iter()
        .map(|raw| {
            Ok(ExcludePattern {
                matcher: PatternMatcher::new(raw)?,
                match_relative: raw.contains('/'),
            })
        })
        .collect::<Result<Vec<_>, PatternError>>()?;

    let extensions: BTreeSet<String> = config
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();
    let all_files = extensions.contains(ALL_FILES);
    let exclude_dirs: BTreeSet<String> =
        config.exclude_dirs.iter().map(|d| d.to_lowercase()).collect();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != std::ffi::OsStr::new(".git"));
    if !config.recursive {
        builder.max_depth(Some(1));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in builder.build() {
        if cancel.is_cancelled() {
            debug!("collection cancelled during enumeration");
            break;
        }
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    paths.push(entry.into_path());
                }
            }
            Err(e) => warn!("error walking {}: {}", root.display(), e),
        }
    }
    debug!("enumerated {} files under {}", paths.len(), root.display());

    let mut files: Vec<CandidateFile> = paths
        .par_iter()
        .filter_map(|path| {
            evaluate(
                path,
                root,
                config,
                ignore_rules,
                &exclude_patterns,
                &extensions,
                all_files,
                &exclude_dirs,
            )
        })
        .collect();

    files.par_sort_unstable_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    path: &Path,
    root: &Path,
    config: &CollectionConfig,
    ignore_rules: &[IgnoreRule],
    exclude_patterns: &[ExcludePattern],
    extensions: &BTreeSet<String>,
    all_files: bool,
    exclude_dirs: &BTreeSet<String>,
) -> Option<CandidateFile> {
    let relative = path.strip_prefix(root).ok()?.to_path_buf();

    // 1. Gitignore exclusion, matched against the absolute path.
    if config.respect_gitignore && ignore_rules.iter().any(|rule| rule.matches(path)) {
        debug!("excluded by gitignore: {}", relative.display());
        return None;
    }

    // 2. Extension inclusion.
    if !all_files {
        let ext = relative
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !extensions.contains(&ext) {
            return None;
        }
    }

    // 3/4. Directory-segment predicates apply to the parent path only.
    for component in relative.parent().unwrap_or(Path::new("")).components() {
        let Component::Normal(segment) = component else {
            continue;
        };
        let segment = segment.to_string_lossy().to_lowercase();
        if exclude_dirs.contains(&segment) {
            debug!("excluded by directory filter: {}", relative.display());
            return None;
        }
        if config.exclude_all_test_projects && is_test_segment(&segment) {
            debug!("excluded as test project: {}", relative.display());
            return None;
        }
        if config.exclude_unit_test_projects_only && is_unit_test_segment(&segment) {
            debug!("excluded as unit test project: {}", relative.display());
            return None;
        }
    }

    // 5/6 need metadata; a file that vanished mid-scan is dropped.
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("skipping {}: {}", path.display(), e);
            return None;
        }
    };
    if config.max_file_size_bytes > 0 && meta.len() > config.max_file_size_bytes {
        debug!(
            "excluded by size limit ({} bytes): {}",
            meta.len(),
            relative.display()
        );
        return None;
    }
    if config.ignore_binary {
        match binary::is_binary(path) {
            Ok(true) => {
                debug!("excluded as binary: {}", relative.display());
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                return None;
            }
        }
    }

    // 7. Glob-pattern exclusion.
    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let relative_str = relative.to_string_lossy();
    for pattern in exclude_patterns {
        let target: &str = if pattern.match_relative {
            &relative_str
        } else {
            &name
        };
        if pattern.matcher.matches(target) {
            debug!("excluded by pattern filter: {}", relative.display());
            return None;
        }
    }

    Some(CandidateFile {
        full_path: path.to_path_buf(),
        relative_path: relative,
        size_bytes: meta.len(),
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    })
}

fn is_test_segment(segment: &str) -> bool {
    TEST_SUFFIXES.iter().any(|suffix| segment.ends_with(suffix))
}

fn is_unit_test_segment(segment: &str) -> bool {
    if NON_UNIT_SUFFIXES.iter().any(|suffix| segment.ends_with(suffix)) {
        return false;
    }
    UNIT_TEST_SUFFIXES.iter().any(|suffix| segment.ends_with(suffix))
}
