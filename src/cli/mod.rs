//! CLI layer: argument parsing, logging setup and command dispatch.

pub mod args;
mod log;
mod patch;

pub use args::*;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use diffsearch::CancelFlag;

// ─── CLI ─────────────────────────────────────────────────────────────

/// Search commit history by message and diff content, and inspect patches
#[derive(Parser, Debug)]
#[command(name = "diffsearch", version, about, after_help = "\
Run 'diffsearch <COMMAND> --help' for detailed options and examples.\n\
Output is JSON on stdout; diagnostics go to stderr.")]
pub(crate) struct Cli {
    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Write log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Search commit messages and diffs across branches
    Log(LogArgs),

    /// Paginate the file diffs of a patch
    FileDiffs(FileDiffsArgs),

    /// Apply one file diff of a patch to an original file
    Apply(ApplyArgs),

    /// Diff stats of one or more patches, with a total
    Stat(StatArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let result = match cli.command {
        Commands::Log(args) => log::cmd_log(args, &cancel),
        Commands::FileDiffs(args) => patch::cmd_file_diffs(args, &cancel),
        Commands::Apply(args) => patch::cmd_apply(args),
        Commands::Stat(args) => patch::cmd_stat(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(log_level: &str, json: bool) {
    let level = match log_level {
        "error" => tracing::Level::ERROR,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
