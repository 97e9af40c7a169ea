//! Ancestor-directory `.gitignore` resolution.
//!
//! Walks from a start directory up toward the repository root, collecting
//! per-directory ignore lines and anchoring each to the directory that
//! declared it, so a rule from a subdirectory never matches outside its
//! own subtree. Matching is "any rule matches, the path is excluded":
//! negated `!` patterns and full gitignore `**` semantics are out of
//! scope and such lines are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::patterns::{normalize, PatternMatcher};

/// A single anchored ignore rule.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    /// Anchored pattern text, e.g. `/repo/src/bin/**`.
    pub pattern: String,
    /// Directory whose `.gitignore` declared the rule.
    pub origin: PathBuf,
    matcher: PatternMatcher,
    /// The same pattern extended with `/**`, so a rule naming a bare
    /// path also excludes everything beneath it.
    descendants: PatternMatcher,
}

impl IgnoreRule {
    fn from_line(line: &str, origin: &Path) -> Option<Self> {
        let anchored = format!("{}/{}", normalize(&origin.to_string_lossy()), line);
        let matcher = match PatternMatcher::new(&anchored) {
            Ok(m) => m,
            Err(e) => {
                warn!("skipping unparseable ignore rule: {}", e);
                return None;
            }
        };
        let subtree = format!("{}/**", anchored.trim_end_matches('/'));
        let descendants = match PatternMatcher::new(&subtree) {
            Ok(m) => m,
            Err(e) => {
                warn!("skipping unparseable ignore rule: {}", e);
                return None;
            }
        };
        Some(Self {
            pattern: matcher.as_str().to_string(),
            origin: origin.to_path_buf(),
            matcher,
            descendants,
        })
    }

    /// Whether an absolute path is excluded by this rule.
    pub fn matches(&self, absolute: &Path) -> bool {
        self.matcher.matches_path(absolute) || self.descendants.matches_path(absolute)
    }
}

/// Collect ignore rules for `start` and its ancestors.
///
/// Ascent stops once a directory whose parent holds a `.git` marker has
/// been processed (the parent, as repository root, is still read), or at
/// the filesystem root. Unreadable `.gitignore` files are skipped; this
/// is best-effort enrichment, never a hard failure.
pub fn resolve(start: &Path) -> Vec<IgnoreRule> {
    let mut rules = Vec::new();
    let mut dir = start.to_path_buf();
    loop {
        read_rules_from(&dir, &mut rules);
        if dir.join(".git").exists() {
            break;
        }
        match dir.parent() {
            Some(parent) => {
                if parent.join(".git").exists() {
                    read_rules_from(parent, &mut rules);
                    break;
                }
                dir = parent.to_path_buf();
            }
            None => break,
        }
    }
    debug!(
        "resolved {} ignore rules starting at {}",
        rules.len(),
        start.display()
    );
    rules
}

fn read_rules_from(dir: &Path, rules: &mut Vec<IgnoreRule>) {
    let path = dir.join(".gitignore");
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => return,
    };
    debug!("reading ignore rules from {}", path.display());
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            debug!("negated ignore patterns are unsupported, skipping \"{line}\"");
            continue;
        }
        if let Some(rule) = IgnoreRule::from_line(line, dir) {
            rules.push(rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_blank_comment_and_negated_lines_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(
            dir.path().join(".gitignore"),
            "# comment\n\n*.log\n!keep.log\n",
        )
        .unwrap();

        let rules = resolve(dir.path());
        assert_eq!(rules.len(), 1);
        assert!(rules[0].pattern.ends_with("*.log"));
    }

    #[test]
    fn test_rules_anchored_to_declaring_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/.gitignore"), "generated\n").unwrap();

        let rules = resolve(&dir.path().join("a"));
        assert_eq!(rules.len(), 1);

        // Matches inside the declaring subtree only.
        assert!(rules[0].matches(&dir.path().join("a/generated")));
        assert!(rules[0].matches(&dir.path().join("a/generated/out.txt")));
        assert!(!rules[0].matches(&dir.path().join("b/generated")));
    }

    #[test]
    fn test_directory_rule_excludes_contents_not_siblings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "bin/\n").unwrap();

        let rules = resolve(dir.path());
        assert_eq!(rules.len(), 1);
        assert!(rules[0].matches(&dir.path().join("bin/Debug/app.txt")));
        assert!(!rules[0].matches(&dir.path().join("src/bin_helper.txt")));
    }

    #[test]
    fn test_ancestor_rules_collected() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join(".gitignore"), "*.tmp\n").unwrap();
        fs::write(dir.path().join("src/.gitignore"), "*.bak\n").unwrap();

        let rules = resolve(&dir.path().join("src/nested"));
        let patterns: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
        assert!(patterns.iter().any(|p| p.ends_with("*.bak")));
        assert!(patterns.iter().any(|p| p.ends_with("*.tmp")));
    }

    #[test]
    fn test_ascent_stops_at_repository_root() {
        let dir = TempDir::new().unwrap();
        // outer/.gitignore must not be read: repo (containing .git) is the root.
        fs::write(dir.path().join(".gitignore"), "*.outer\n").unwrap();
        let repo = dir.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(repo.join("src")).unwrap();
        fs::write(repo.join(".gitignore"), "*.root\n").unwrap();
        fs::write(repo.join("src/.gitignore"), "*.sub\n").unwrap();

        let rules = resolve(&repo.join("src"));
        let patterns: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
        assert!(patterns.iter().any(|p| p.ends_with("*.sub")));
        assert!(patterns.iter().any(|p| p.ends_with("*.root")));
        assert!(!patterns.iter().any(|p| p.ends_with("*.outer")));
    }

    #[test]
    fn test_missing_gitignore_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(resolve(dir.path()).is_empty());
    }
}
