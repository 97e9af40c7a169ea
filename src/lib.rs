//! Fuse - Assemble a source tree into token-bounded context files for LLMs.
//!
//! Fuse scans a directory, filters files through gitignore rules, extension
//! and directory sets, size and binary heuristics, minifies what survives,
//! and writes the result as framed blocks into one or more output parts
//! under a token budget.
//!
//! # Quick Start
//!
//! ```no_run
//! use fuse::builder::Fuse;
//! use fuse::templates::Template;
//!
//! let report = Fuse::new("./my-project")
//!     .template(Template::DotNet)
//!     .output_dir("./context")
//!     .base_name("my-project")
//!     .split_tokens(Some(800_000))
//!     .run()
//!     .unwrap();
//!
//! println!(
//!     "{} files into {} part(s), {} tokens",
//!     report.files_written,
//!     report.parts.len(),
//!     report.total_tokens
//! );
//! ```
//!
//! # Modules
//!
//! - [`patterns`] - Glob pattern compilation and path normalization
//! - [`gitignore`] - Ancestor `.gitignore` resolution into anchored rules
//! - [`binary`] - Content-sampling binary detection
//! - [`collect`] - File enumeration and the filter chain
//! - [`transform`] - Comment stripping and whitespace minification
//! - [`tokens`] - Token counting for context budgets
//! - [`assemble`] - Framed output with split rotation and a hard cap
//! - [`templates`] - Per-language collection defaults
//! - [`cancel`] - Cooperative cancellation
//! - [`builder`] - Fluent API tying the pipeline together

pub mod assemble;
pub mod binary;
pub mod builder;
pub mod cancel;
pub mod collect;
pub mod errors;
pub mod gitignore;
pub mod patterns;
pub mod templates;
pub mod tokens;
pub mod transform;

// Re-export key types at crate root for convenience
pub use assemble::{AssembleError, AssembleOptions, OutputPart, RunReport};
pub use builder::Fuse;
pub use cancel::CancelToken;
pub use collect::{CandidateFile, CollectError, CollectionConfig};
pub use errors::FuseError;
pub use gitignore::IgnoreRule;
pub use patterns::{PatternError, PatternMatcher};
pub use templates::Template;
pub use tokens::{Encoding, TokenCounter};
