//! pooldl: download an e621 pool and keep a local copy in sync.
//!
//! # Usage
//!
//! ```text
//! pooldl https://e621.net/pools/1234
//! pooldl 1234
//! pooldl "./My Pool"
//! pooldl                  # asks for one of the above
//! ```

mod console;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::ProgressDrawTarget;

use console::ConsoleReporter;
use pooldl_core::{config, Config, PoolTarget};
use pooldl_sync::{run_with_config, RunOptions, RunOutcome};

const APP_NAME: &str = "e621 Pool Downloader";

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pooldl",
    version,
    about = "Download an e621 pool and keep a local copy in sync",
    long_about = None,
)]
struct Cli {
    /// Pool URL, pool id, or path to a previously downloaded pool.
    input: Option<String>,

    /// Config file to use instead of ~/.pooldl/config.yaml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Resolve posts one at a time instead of in batches.
    #[arg(long)]
    no_prefetch: bool,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => config::load().context("failed to load config")?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let started = Instant::now();

    println!("{APP_NAME} (v{})\n", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;

    let input = match cli.input {
        Some(input) => input,
        None => prompt::ask_for_input(io::stdin().lock(), io::stdout())?,
    };
    let target = PoolTarget::parse(&input)?;
    let pool_id = target.pool_id()?;
    println!("Pool ID: {pool_id}\n");

    let options = RunOptions {
        target,
        work_dir: std::env::current_dir().context("could not determine current directory")?,
        prefetch: config.prefetch && !cli.no_prefetch,
    };

    let mut console = ConsoleReporter::new(io::stdout(), ProgressDrawTarget::stdout);
    let outcome = run_with_config(&config, &options, &mut console)
        .with_context(|| format!("failed to sync pool {pool_id}"))?;
    if let RunOutcome::Synced(summary) = &outcome {
        console.summary(summary);
    }

    println!("Finished in {:.3} seconds.", started.elapsed().as_secs_f64());
    Ok(())
}
