//! Command-line interface for dsptree.
//!
//! Parses a Visual C++ 6 project description, or scans a directory, and
//! prints the resulting tree as an ASCII tree, JSON, or a list of paths.

use clap::{Args, Parser, Subcommand, ValueEnum};
use dsptree::output::{self, OutputFormat as RenderFormat};
use dsptree::{DspTreeError, Outcome, ScanBuilder, ScanOptions, TextEncoding};
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// dsptree: browse Visual C++ 6 projects and directories as file trees
#[derive(Parser)]
#[command(name = "dsptree", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a .dsp project description
    Parse {
        /// Project description file
        file: PathBuf,

        #[command(flatten)]
        common: Common,
    },
    /// Build a tree from a directory on disk
    Scan {
        /// Root directory (default current dir)
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Extensions to include, e.g. `cpp` or `.h` (can be repeated)
        #[arg(short = 'e', long = "ext")]
        extensions: Vec<String>,

        /// Include every file and keep empty folders
        #[arg(long)]
        all: bool,

        /// Skip hidden files
        #[arg(long)]
        no_hidden: bool,

        /// Honour .gitignore files
        #[arg(long)]
        gitignore: bool,

        /// Do not descend into symlinked directories
        #[arg(long)]
        no_follow_links: bool,

        /// Max depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Ignore patterns (can be repeated)
        #[arg(short = 'I', long = "ignore")]
        ignore_patterns: Vec<String>,

        #[command(flatten)]
        common: Common,
    },
}

impl Command {
    fn common(&self) -> &Common {
        match self {
            Command::Parse { common, .. } | Command::Scan { common, .. } => common,
        }
    }
}

#[derive(Args)]
struct Common {
    /// Encoding of names in the project file and on disk
    #[arg(long, env = "DSPTREE_ENCODING", default_value = "utf8", value_parser = parse_encoding)]
    encoding: TextEncoding,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// Pretty output (indented JSON)
    #[arg(short, long)]
    pretty: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exit with status 2 if anything had to be skipped or left unconverted
    #[arg(long)]
    strict: bool,

    /// Log verbosity (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Tree,
    Paths,
}

impl From<OutputFormat> for RenderFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => RenderFormat::Json,
            OutputFormat::Tree => RenderFormat::Tree,
            OutputFormat::Paths => RenderFormat::Paths,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Parse string into TextEncoding.
fn parse_encoding(s: &str) -> Result<TextEncoding, String> {
    s.parse().map_err(|e: DspTreeError| e.to_string())
}

fn setup_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    let common = cli.command.common();
    setup_tracing(common.log_level);

    let result = match &cli.command {
        Command::Parse { file, common } => run_parse(file, common),
        Command::Scan {
            dir,
            extensions,
            all,
            no_hidden,
            gitignore,
            no_follow_links,
            max_depth,
            ignore_patterns,
            common,
        } => {
            let mut builder = ScanBuilder::new(dir)
                .extensions(extensions)
                .show_all_files(*all)
                .encoding(common.encoding)
                .include_hidden(!*no_hidden)
                .respect_gitignore(*gitignore)
                .follow_links(!*no_follow_links)
                .ignore_patterns(ignore_patterns.clone());

            builder = if let Some(depth) = max_depth {
                builder.max_depth(*depth)
            } else {
                builder.no_limit_depth()
            };

            run_scan(&builder.build(), common)
        }
    };

    match result {
        Ok(degraded) if degraded && common.strict => exit(2),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    }
}

fn run_parse(file: &Path, common: &Common) -> Result<bool, DspTreeError> {
    debug!(file = %file.display(), encoding = %common.encoding, "parse requested");
    let outcome = dsptree::parse_project_file(file, common.encoding);
    let degraded = report(&outcome);
    let content = output::format_project(outcome.value(), common.format.into(), common.pretty)?;
    emit(&content, common)?;
    Ok(degraded)
}

fn run_scan(options: &ScanOptions, common: &Common) -> Result<bool, DspTreeError> {
    debug!(?options, "scan requested");
    let outcome = dsptree::scan(options);
    let degraded = report(&outcome);
    let content = output::format_nodes(outcome.value(), common.format.into(), common.pretty)?;
    emit(&content, common)?;
    Ok(degraded)
}

fn report<T>(outcome: &Outcome<T>) -> bool {
    for diagnostic in &outcome.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    outcome.is_degraded()
}

fn emit(content: &str, common: &Common) -> Result<(), DspTreeError> {
    match &common.output {
        Some(path) => output::write_to_file(content, path),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
