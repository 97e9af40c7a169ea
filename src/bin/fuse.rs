//! Fuse CLI - Assemble a source tree into token-bounded context files.

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, Shell};
use fuse::builder::Fuse;
use fuse::errors::{exit_code, FuseError};
use fuse::templates::Template;
use fuse::tokens::Encoding;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "fuse")]
#[command(about = "Assemble a source tree into token-bounded context files for LLMs")]
#[command(version)]
struct Cli {
    /// Source directory to scan
    #[arg(default_value = ".")]
    source: PathBuf,

    /// Directory for the generated output files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output base name (default: <source dir>_context_<timestamp>)
    #[arg(short, long)]
    name: Option<String>,

    /// Output file extension
    #[arg(long, default_value = "txt")]
    output_ext: String,

    /// Language template providing extension and exclusion defaults
    #[arg(short, long, default_value = "all")]
    template: TemplateArg,

    /// Extensions to include, replacing the template's set
    #[arg(long, value_delimiter = ',')]
    include_ext: Vec<String>,

    /// Directory name to exclude (appends to the template's)
    #[arg(long)]
    exclude_dir: Vec<String>,

    /// Glob pattern to exclude (appends to the template's)
    #[arg(long)]
    exclude_pattern: Vec<String>,

    /// Scan only the top level of the source directory
    #[arg(long)]
    no_recursive: bool,

    /// Skip files larger than this many kilobytes
    #[arg(long)]
    max_file_size_kb: Option<u64>,

    /// Keep files the binary heuristic would exclude
    #[arg(long)]
    keep_binary: bool,

    /// Exclude all test project directories
    #[arg(long)]
    exclude_tests: bool,

    /// Exclude unit test projects only (keeps integration tests and benchmarks)
    #[arg(long, conflicts_with = "exclude_tests")]
    exclude_unit_tests: bool,

    /// Ignore .gitignore rules
    #[arg(long)]
    no_gitignore: bool,

    /// Omit per-file size and modification lines
    #[arg(long)]
    no_metadata: bool,

    /// Stop writing once this many tokens have been consumed
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Split output into parts of roughly this many tokens (0 disables)
    #[arg(long, default_value_t = 800_000)]
    split_tokens: usize,

    /// Replace pre-existing output files
    #[arg(long)]
    overwrite: bool,

    /// Token encoding for budget accounting
    #[arg(long, default_value = "cl100k")]
    encoding: EncodingArg,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Suppress all log output
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Generate shell completions and exit
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateArg {
    Dotnet,
    Rust,
    Python,
    Node,
    Go,
    Java,
    Web,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Cl100k,
    O200k,
}

impl From<TemplateArg> for Template {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Dotnet => Template::DotNet,
            TemplateArg::Rust => Template::Rust,
            TemplateArg::Python => Template::Python,
            TemplateArg::Node => Template::Node,
            TemplateArg::Go => Template::Go,
            TemplateArg::Java => Template::Java,
            TemplateArg::Web => Template::Web,
            TemplateArg::All => Template::All,
        }
    }
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Cl100k => Encoding::Cl100kBase,
            EncodingArg::O200k => Encoding::O200kBase,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "fuse", &mut io::stdout());
        return;
    }

    init_logging(cli.quiet, cli.verbose);

    let json_output = cli.json;
    if let Err(e) = run(cli) {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };
            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let filter = if quiet {
        "off"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), FuseError> {
    let mut builder = Fuse::new(&cli.source)
        .template(cli.template.into())
        .exclude_dirs(cli.exclude_dir)
        .exclude_patterns(cli.exclude_pattern)
        .keep_binary(cli.keep_binary)
        .exclude_tests(cli.exclude_tests)
        .exclude_unit_tests(cli.exclude_unit_tests)
        .recursive(!cli.no_recursive)
        .respect_gitignore(!cli.no_gitignore)
        .include_metadata(!cli.no_metadata)
        .max_tokens(cli.max_tokens)
        .split_tokens((cli.split_tokens > 0).then_some(cli.split_tokens))
        .output_dir(cli.output_dir)
        .output_extension(cli.output_ext)
        .overwrite(cli.overwrite)
        .encoding(cli.encoding.into());
    if !cli.include_ext.is_empty() {
        builder = builder.extensions(cli.include_ext);
    }
    if let Some(kb) = cli.max_file_size_kb {
        builder = builder.max_file_size_bytes(kb * 1024);
    }
    if let Some(name) = cli.name {
        builder = builder.base_name(name);
    }

    let report = builder.run()?;

    if cli.json {
        #[derive(Serialize)]
        struct Output<'a> {
            source: String,
            #[serde(flatten)]
            report: &'a fuse::RunReport,
        }
        let output = Output {
            source: cli.source.display().to_string(),
            report: &report,
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| FuseError::Io(io::Error::other(e.to_string())))?;
        println!("{json}");
    } else {
        for part in &report.parts {
            println!(
                "{}: {} files, {} tokens",
                part.path.display(),
                part.files_written,
                part.tokens_written
            );
        }
        println!(
            "Total: {} files in {} part(s), {} tokens ({} skipped)",
            report.files_written,
            report.parts.len(),
            report.total_tokens,
            report.files_skipped
        );
        if report.stopped_early {
            println!("Stopped early: token budget exhausted or cancelled.");
        }
    }

    Ok(())
}
