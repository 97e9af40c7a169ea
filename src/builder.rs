//! Fluent builder API for fuse.
//!
//! Ties the pipeline stages together: gitignore resolution, collection,
//! transformation, token accounting, and assembly.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::assemble::{assemble, AssembleOptions, RunReport};
use crate::cancel::CancelToken;
use crate::collect::{collect, CollectionConfig};
use crate::errors::FuseError;
use crate::gitignore;
use crate::templates::Template;
use crate::tokens::{Encoding, TokenCounter};
use crate::transform;

/// Builder for one fuse run.
///
/// # Examples
///
/// ```no_run
/// use fuse::builder::Fuse;
/// use fuse::templates::Template;
///
/// let report = Fuse::new("./project")
///     .template(Template::Rust)
///     .output_dir("./context")
///     .base_name("project")
///     .split_tokens(Some(800_000))
///     .run()
///     .unwrap();
///
/// println!("{} parts, {} tokens", report.parts.len(), report.total_tokens);
/// ```
pub struct Fuse {
    root: PathBuf,
    template: Template,
    extensions: Option<BTreeSet<String>>,
    extra_exclude_dirs: Vec<String>,
    extra_exclude_patterns: Vec<String>,
    max_file_size_bytes: u64,
    ignore_binary: bool,
    exclude_all_test_projects: bool,
    exclude_unit_test_projects_only: bool,
    recursive: bool,
    respect_gitignore: bool,
    include_metadata: bool,
    split_threshold: Option<usize>,
    global_cap: Option<usize>,
    output_dir: PathBuf,
    base_name: Option<String>,
    extension: String,
    overwrite: bool,
    encoding: Encoding,
    cancel: CancelToken,
}

impl Fuse {
    /// Create a new builder for the given source root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            template: Template::All,
            extensions: None,
            extra_exclude_dirs: Vec::new(),
            extra_exclude_patterns: Vec::new(),
            max_file_size_bytes: 0,
            ignore_binary: true,
            exclude_all_test_projects: false,
            exclude_unit_test_projects_only: false,
            recursive: true,
            respect_gitignore: true,
            include_metadata: true,
            split_threshold: None,
            global_cap: None,
            output_dir: PathBuf::from("."),
            base_name: None,
            extension: "txt".to_string(),
            overwrite: false,
            encoding: Encoding::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Use a language template's extension and exclusion defaults.
    pub fn template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Replace the template's extension set entirely.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Exclude additional directory names (appends to the template's).
    pub fn exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_exclude_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Exclude additional glob patterns (appends to the template's).
    pub fn exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Skip files larger than this many bytes (0 = unlimited).
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    /// Keep files the binary heuristic would exclude.
    pub fn keep_binary(mut self, keep: bool) -> Self {
        self.ignore_binary = !keep;
        self
    }

    /// Exclude every kind of test project directory.
    pub fn exclude_tests(mut self, exclude: bool) -> Self {
        self.exclude_all_test_projects = exclude;
        self
    }

    /// Exclude unit-test projects only, keeping integration tests and
    /// benchmarks.
    pub fn exclude_unit_tests(mut self, exclude: bool) -> Self {
        self.exclude_unit_test_projects_only = exclude;
        self
    }

    /// Scan only the top level of the source root.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Honor `.gitignore` rules from the root and its ancestors.
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Emit per-file size/mtime lines in the output.
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// Rotate to a new part past this many tokens (`None` disables).
    pub fn split_tokens(mut self, threshold: Option<usize>) -> Self {
        self.split_threshold = threshold;
        self
    }

    /// Stop writing once this many tokens have been consumed.
    pub fn max_tokens(mut self, cap: Option<usize>) -> Self {
        self.global_cap = cap;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Output base name; auto-generated from the root name and the
    /// current time when unset.
    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = Some(name.into());
        self
    }

    /// Output file extension, without the dot.
    pub fn output_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve, collect, and assemble.
    pub fn run(self) -> Result<RunReport, FuseError> {
        let config = self.collection_config();
        let options = self.assemble_options();

        // Ignore-rule ascent and anchoring need the real ancestor chain,
        // which a relative root like `.` does not expose.
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());

        let ignore_rules = if config.respect_gitignore {
            gitignore::resolve(&root)
        } else {
            Vec::new()
        };

        let files = collect(&root, &config, &ignore_rules, &self.cancel)?;
        info!("collected {} files from {}", files.len(), root.display());

        let counter = TokenCounter::new(self.encoding);
        let report = assemble(
            &root,
            files,
            transform::transform,
            move |text| counter.estimate(text),
            &options,
            &self.cancel,
        )?;
        Ok(report)
    }

    /// The collection config this builder resolves to.
    pub fn collection_config(&self) -> CollectionConfig {
        let extensions: BTreeSet<String> = match &self.extensions {
            Some(set) => set.clone(),
            None => self
                .template
                .extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        };
        let mut exclude_dirs: BTreeSet<String> = self
            .template
            .exclude_dirs()
            .iter()
            .map(|d| d.to_string())
            .collect();
        exclude_dirs.extend(self.extra_exclude_dirs.iter().cloned());
        let mut exclude_patterns: Vec<String> = self
            .template
            .exclude_patterns()
            .iter()
            .map(|p| p.to_string())
            .collect();
        exclude_patterns.extend(self.extra_exclude_patterns.iter().cloned());

        CollectionConfig {
            extensions,
            exclude_dirs,
            exclude_patterns,
            max_file_size_bytes: self.max_file_size_bytes,
            ignore_binary: self.ignore_binary,
            exclude_all_test_projects: self.exclude_all_test_projects,
            exclude_unit_test_projects_only: self.exclude_unit_test_projects_only,
            recursive: self.recursive,
            respect_gitignore: self.respect_gitignore,
        }
    }

    fn assemble_options(&self) -> AssembleOptions {
        let base_name = self
            .base_name
            .clone()
            .unwrap_or_else(|| auto_base_name(&self.root));
        AssembleOptions {
            output_dir: self.output_dir.clone(),
            base_name,
            extension: self.extension.clone(),
            split_threshold: self.split_threshold,
            global_cap: self.global_cap,
            include_metadata: self.include_metadata,
            overwrite: self.overwrite,
        }
    }
}

fn auto_base_name(root: &Path) -> String {
    let dir_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "source".to_string());
    format!("{}_context_{}", dir_name, Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_template_defaults_merge_under_overrides() {
        let builder = Fuse::new(".")
            .template(Template::DotNet)
            .exclude_dirs(["generated"])
            .exclude_patterns(["*.snap"]);
        let config = builder.collection_config();

        assert!(config.extensions.contains("cs"));
        assert!(config.exclude_dirs.contains("obj"));
        assert!(config.exclude_dirs.contains("generated"));
        assert!(config.exclude_patterns.iter().any(|p| p == "*.Designer.cs"));
        assert!(config.exclude_patterns.iter().any(|p| p == "*.snap"));
    }

    #[test]
    fn test_explicit_extensions_replace_template_set() {
        let config = Fuse::new(".")
            .template(Template::DotNet)
            .extensions(["rs"])
            .collection_config();
        assert_eq!(config.extensions, BTreeSet::from(["rs".to_string()]));
    }

    #[test]
    fn test_end_to_end_run_writes_framed_output() {
        let src = TempDir::new().unwrap();
        fs::create_dir(src.path().join(".git")).unwrap();
        fs::write(src.path().join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(src.path().join("ignored.bin"), vec![0xFFu8; 256]).unwrap();
        let out = TempDir::new().unwrap();

        let report = Fuse::new(src.path())
            .output_dir(out.path())
            .base_name("ctx")
            .run()
            .unwrap();

        assert_eq!(report.files_written, 1);
        let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
        assert!(text.contains("<|main.rs|>"));
        assert!(text.contains("fn main() {}"));
    }

    #[test]
    fn test_missing_root_surfaces_collect_error() {
        let out = TempDir::new().unwrap();
        let err = Fuse::new("/nonexistent/fuse-root")
            .output_dir(out.path())
            .base_name("ctx")
            .run()
            .unwrap_err();
        assert_eq!(crate::errors::exit_code(&err), 3);
    }

    #[test]
    fn test_auto_base_name_uses_directory_name() {
        let src = TempDir::new().unwrap();
        let name = auto_base_name(src.path());
        let dir_name = src
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with(&format!("{}_context_", dir_name)));
    }
}
