//! Error types for fuse.

use std::path::PathBuf;

use crate::assemble::AssembleError;
use crate::collect::CollectError;
use crate::patterns::PatternError;

/// Top-level error type for fuse operations.
#[derive(Debug, thiserror::Error)]
pub enum FuseError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("collect error: {0}")]
    Collect(#[from] CollectError),

    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("assemble error: {0}")]
    Assemble(#[from] AssembleError),
}

/// Map an error to its exit code.
pub fn exit_code(error: &FuseError) -> i32 {
    match error {
        FuseError::PathNotFound(_) => 3,
        FuseError::Io(_) => 1,
        FuseError::Collect(CollectError::NotFound(_)) => 3,
        FuseError::Collect(CollectError::NotADirectory(_)) => 2,
        FuseError::Collect(CollectError::Pattern(_)) => 2,
        FuseError::Pattern(_) => 2,
        FuseError::Assemble(AssembleError::OutputExists(_)) => 4,
        FuseError::Assemble(_) => 1,
    }
}
