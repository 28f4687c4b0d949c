//! # Wordshape CLI (`wordshape`)
//!
//! ## Usage
//!
//! ```bash
//! wordshape --config ./config/wordshape.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wordshape init` | Load the dictionary from cache or download it |
//! | `wordshape refresh` | Discard the cache and download again |
//! | `wordshape clear-cache` | Remove the cached dictionary |
//! | `wordshape has <word>...` | Check dictionary membership |
//! | `wordshape filter <letters:len>...` | Find words matching segments |
//! | `wordshape validate <letters:len>...` | Check segments without filtering |
//! | `wordshape stats` | Show cache status |
//!
//! Progress goes to stderr; results go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wordshape::config;
use wordshape::filter::{self, FilterOptions};
use wordshape::load_cmd;
use wordshape::progress::ProgressMode;
use wordshape::stats;
use wordshape_core::segment::Segment;

/// Wordshape: find dictionary words built from letter-pool segments.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/wordshape.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "wordshape",
    about = "Find every dictionary word that can be built from a sequence of letter-pool segments",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/wordshape.toml`. Built-in defaults are used if
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/wordshape.toml")]
    config: PathBuf,

    /// Progress output on stderr: `off`, `human`, or `json`.
    /// Defaults to `human` when stderr is a terminal.
    #[arg(long, global = true)]
    progress: Option<String>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make the dictionary available.
    ///
    /// Uses the cache when it is fresh and intact, otherwise downloads,
    /// validates, and caches the configured word list.
    Init,

    /// Clear the cache and download the dictionary again.
    Refresh,

    /// Remove the cached dictionary.
    ClearCache,

    /// Check whether words are in the dictionary.
    ///
    /// Exits non-zero if any word is missing.
    Has {
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Find words matching a sequence of segments.
    ///
    /// Each segment is `letters:length`: the next `length` letters of the
    /// word must be drawn from `letters`, each letter used at most as many
    /// times as it appears. Example: `wordshape filter caat:3 dgoo:3`.
    Filter {
        #[arg(required = true)]
        segments: Vec<Segment>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Show how each match splits across the segments.
        #[arg(long)]
        explain: bool,

        /// Filter a local word list instead of the managed dictionary.
        #[arg(long)]
        words_file: Option<PathBuf>,
    },

    /// Check segments for structural problems without filtering.
    ///
    /// Exits non-zero if any problem is found.
    Validate {
        segments: Vec<Segment>,

        #[arg(long)]
        json: bool,
    },

    /// Show dictionary and cache status.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "wordshape=debug" } else { "wordshape=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let progress = match cli.progress.as_deref() {
        Some(mode) => ProgressMode::parse(mode)?,
        None => ProgressMode::default_for_tty(),
    };

    let ok = match cli.command {
        // Validation needs no configuration or storage.
        Commands::Validate { segments, json } => filter::run_validate(&segments, json)?,
        command => {
            let cfg = config::load_or_default(&cli.config)?;
            run(command, &cfg, progress).await?
        }
    };

    Ok(exit(ok))
}

async fn run(
    command: Commands,
    cfg: &config::Config,
    progress: ProgressMode,
) -> anyhow::Result<bool> {
    let ok = match command {
        Commands::Init => {
            load_cmd::run_init(cfg, progress).await?;
            true
        }
        Commands::Refresh => {
            load_cmd::run_refresh(cfg, progress).await?;
            true
        }
        Commands::ClearCache => {
            load_cmd::run_clear_cache(cfg).await?;
            true
        }
        Commands::Has { words } => load_cmd::run_has(cfg, &words, progress).await?,
        Commands::Filter {
            segments,
            json,
            explain,
            words_file,
        } => {
            let opts = FilterOptions {
                json,
                explain,
                words_file,
            };
            filter::run_filter(cfg, segments, &opts, progress).await?
        }
        Commands::Validate { segments, json } => filter::run_validate(&segments, json)?,
        Commands::Stats { json } => {
            stats::run_stats(cfg, json).await?;
            true
        }
    };
    Ok(ok)
}

fn exit(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
