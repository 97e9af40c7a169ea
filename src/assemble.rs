//! Token-bounded output assembly.
//!
//! Consumes the ordered candidate set, transforms each file, frames it
//! between delimiters, and writes one or more output parts under a token
//! budget: rotation at a split threshold, a hard global cap, and
//! skipping of semantically-empty content.
//!
//! Reading and transforming runs on a producer thread feeding a bounded
//! channel; all token accounting and writing happens sequentially on the
//! caller's thread, so split decisions see a strict cumulative state and
//! exactly one part is open at any time. A file's framed block is atomic
//! with respect to cancellation: it is either fully written before the
//! check, or not started.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::collect::CandidateFile;
use crate::patterns::normalize;

/// Fixed per-file token overhead charged for the open/close delimiters
/// and the path line. An approximation that does not vary by path
/// length; part headers are not counted at all.
pub const FRAME_OVERHEAD_TOKENS: usize = 16;

/// Self-closing markup shorter than this counts as empty content.
const TRIVIAL_TAG_MAX_LEN: usize = 32;

/// Prepared files buffered between the reader thread and the
/// accounting/write phase.
const PIPELINE_DEPTH: usize = 8;

const FRAME_CLOSE: &str = "<|/|>";

/// Errors that can occur during assembly.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("output file already exists: {0} (enable overwrite to replace it)")]
    OutputExists(PathBuf),

    #[error("could not create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options for one assembly run.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub output_dir: PathBuf,
    pub base_name: String,
    /// Output file extension, without the dot.
    pub extension: String,
    /// Rotate to a new part when a file would push past this count.
    pub split_threshold: Option<usize>,
    /// Hard stop: no file is written once it would push past this count.
    pub global_cap: Option<usize>,
    /// Emit the `[Size: .. | Modified: ..]` line per file.
    pub include_metadata: bool,
    pub overwrite: bool,
}

impl AssembleOptions {
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
            extension: "txt".to_string(),
            split_threshold: None,
            global_cap: None,
            include_metadata: true,
            overwrite: false,
        }
    }
}

/// A finalized (or currently open) output file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPart {
    /// 1-based part number.
    pub index: usize,
    pub path: PathBuf,
    pub tokens_written: usize,
    pub files_written: usize,
}

/// Cross-part token accounting. The global counter never resets; the
/// per-part counter lives on [`OutputPart`] and resets on rotation.
#[derive(Debug, Clone, Default)]
struct RunBudget {
    global_cap: Option<usize>,
    global_consumed: usize,
}

impl RunBudget {
    fn would_exceed_cap(&self, file_tokens: usize) -> bool {
        self.global_cap
            .is_some_and(|cap| self.global_consumed + file_tokens > cap)
    }

    fn charge(&mut self, file_tokens: usize) {
        self.global_consumed += file_tokens;
    }
}

/// Outcome of an assembly run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub parts: Vec<OutputPart>,
    /// Sum of every part's accounted content+framing tokens.
    pub total_tokens: usize,
    pub files_written: usize,
    /// Files skipped for trivial (semantically empty) content.
    pub files_skipped: usize,
    /// True when the run ended on the token cap or a cancellation
    /// request rather than exhausting the file set.
    pub stopped_early: bool,
}

struct PreparedFile {
    relative_path: PathBuf,
    content: String,
    size_bytes: u64,
    modified: SystemTime,
}

struct PartWriter {
    writer: BufWriter<File>,
    part: OutputPart,
}

/// Assemble the candidate set into one or more output parts.
///
/// Generic over the content transformer and token estimator so tests and
/// alternative pipelines can substitute their own; production code wires
/// in [`crate::transform::transform`] and [`crate::tokens::TokenCounter`].
pub fn assemble<T, E>(
    root: &Path,
    files: Vec<CandidateFile>,
    transform: T,
    estimate: E,
    options: &AssembleOptions,
    cancel: &CancelToken,
) -> Result<RunReport, AssembleError>
where
    T: Fn(&Path, &str) -> String + Send + 'static,
    E: Fn(&str) -> usize,
{
    fs::create_dir_all(&options.output_dir).map_err(|source| AssembleError::CreateDir {
        path: options.output_dir.clone(),
        source,
    })?;

    let splitting = options.split_threshold.is_some();
    let root_label = root.display().to_string();
    let mut budget = RunBudget {
        global_cap: options.global_cap,
        global_consumed: 0,
    };
    let mut report = RunReport::default();

    let (tx, rx) = mpsc::sync_channel::<PreparedFile>(PIPELINE_DEPTH);
    let producer_cancel = cancel.clone();
    let reader = thread::spawn(move || produce(files, transform, tx, producer_cancel));

    let mut finished: Vec<OutputPart> = Vec::new();
    let mut current = open_part(&root_label, options, 1, splitting)?;

    for prepared in rx.iter() {
        if cancel.is_cancelled() {
            report.stopped_early = true;
            break;
        }
        if is_trivial(&prepared.content) {
            debug!(
                "skipping trivial content: {}",
                prepared.relative_path.display()
            );
            report.files_skipped += 1;
            continue;
        }

        let file_tokens = estimate(&prepared.content) + FRAME_OVERHEAD_TOKENS;

        // Hard cap: the triggering file is withheld entirely, never
        // truncated mid-block.
        if budget.would_exceed_cap(file_tokens) {
            info!(
                "token cap reached ({} consumed); withholding {} and stopping",
                budget.global_consumed,
                prepared.relative_path.display()
            );
            report.stopped_early = true;
            cancel.cancel();
            break;
        }

        // Split only between files, and never on a still-empty part, so
        // a single oversized file still lands whole in its own part.
        if let Some(threshold) = options.split_threshold {
            if current.part.tokens_written > 0
                && current.part.tokens_written + file_tokens > threshold
            {
                finished.push(finalize_part(current)?);
                current = open_part(&root_label, options, finished.len() + 1, splitting)?;
            }
        }

        write_block(&mut current, &prepared, options)?;
        current.part.tokens_written += file_tokens;
        current.part.files_written += 1;
        budget.charge(file_tokens);
        report.files_written += 1;
    }
    drop(rx);
    if reader.join().is_err() {
        warn!("reader thread panicked; output parts are still valid");
    }
    if cancel.is_cancelled() {
        report.stopped_early = true;
    }

    finished.push(finalize_part(current)?);
    report.total_tokens = budget.global_consumed;
    report.parts = finished;

    info!(
        "assembled {} files into {} part(s), {} tokens",
        report.files_written,
        report.parts.len(),
        report.total_tokens
    );
    Ok(report)
}

/// Reader side of the pipeline: read and transform in collection order,
/// stopping at cancellation or when the consumer hangs up.
fn produce<T>(files: Vec<CandidateFile>, transform: T, tx: SyncSender<PreparedFile>, cancel: CancelToken)
where
    T: Fn(&Path, &str) -> String,
{
    for file in files {
        if cancel.is_cancelled() {
            break;
        }
        let raw = match fs::read_to_string(&file.full_path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping {}: {}", file.full_path.display(), e);
                continue;
            }
        };
        let prepared = PreparedFile {
            content: transform(&file.full_path, &raw),
            relative_path: file.relative_path,
            size_bytes: file.size_bytes,
            modified: file.modified,
        };
        if tx.send(prepared).is_err() {
            break;
        }
    }
}

fn part_path(options: &AssembleOptions, index: usize, splitting: bool) -> PathBuf {
    let file_name = if splitting {
        format!("{}_part{}.{}", options.base_name, index, options.extension)
    } else {
        format!("{}.{}", options.base_name, options.extension)
    };
    options.output_dir.join(file_name)
}

fn open_part(
    root_label: &str,
    options: &AssembleOptions,
    index: usize,
    splitting: bool,
) -> Result<PartWriter, AssembleError> {
    let path = part_path(options, index, splitting);
    if path.exists() && !options.overwrite {
        return Err(AssembleError::OutputExists(path));
    }
    let file = File::create(&path).map_err(|source| AssembleError::Write {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let mut header = String::new();
    header.push_str("# FUSE CONTEXT\n");
    header.push_str(&format!("# Source: {}\n", root_label));
    if splitting {
        header.push_str(&format!("# Part: {}\n", index));
    }
    header.push_str("# Format: <|relative/path|> ... <|/|> framed file blocks\n\n");
    writer
        .write_all(header.as_bytes())
        .map_err(|source| AssembleError::Write {
            path: path.clone(),
            source,
        })?;

    debug!("opened part {}: {}", index, path.display());
    Ok(PartWriter {
        writer,
        part: OutputPart {
            index,
            path,
            tokens_written: 0,
            files_written: 0,
        },
    })
}

fn write_block(
    current: &mut PartWriter,
    prepared: &PreparedFile,
    options: &AssembleOptions,
) -> Result<(), AssembleError> {
    let path = current.part.path.clone();
    write_block_io(current, prepared, options)
        .map_err(|source| AssembleError::Write { path, source })
}

fn write_block_io(
    current: &mut PartWriter,
    prepared: &PreparedFile,
    options: &AssembleOptions,
) -> io::Result<()> {
    let relative = normalize(&prepared.relative_path.to_string_lossy());
    writeln!(current.writer, "<|{}|>", relative)?;
    if options.include_metadata {
        writeln!(
            current.writer,
            "[Size: {} bytes | Modified: {}]",
            prepared.size_bytes,
            format_modified(prepared.modified)
        )?;
    }
    current.writer.write_all(prepared.content.as_bytes())?;
    if !prepared.content.ends_with('\n') {
        current.writer.write_all(b"\n")?;
    }
    writeln!(current.writer, "{}", FRAME_CLOSE)?;
    writeln!(current.writer)?;
    Ok(())
}

fn finalize_part(mut current: PartWriter) -> Result<OutputPart, AssembleError> {
    current
        .writer
        .flush()
        .map_err(|source| AssembleError::Write {
            path: current.part.path.clone(),
            source,
        })?;
    debug!(
        "finalized part {}: {} files, {} tokens",
        current.part.index, current.part.files_written, current.part.tokens_written
    );
    Ok(current.part)
}

fn format_modified(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Structurally-empty content that would waste budget on framing alone.
fn is_trivial(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed == "{}" || trimmed == "[]" {
        return true;
    }
    trimmed.len() < TRIVIAL_TAG_MAX_LEN
        && !trimmed.contains('\n')
        && trimmed.starts_with('<')
        && trimmed.ends_with("/>")
}
