//! Headless wave defense runner.
//!
//! This binary runs matches without a UI, controlled via JSON on stdin/stdout.
//! Designed for agents, balance runs and CI.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p td_headless
//!
//! # Play one match to the end and print a JSON summary
//! cargo run -p td_headless -- simulate --config crates/td_headless/configs/default.ron
//!
//! # Run a batch of seeds for balance testing
//! cargo run -p td_headless -- batch --config crates/td_headless/configs/default.ron --count 1000 --output results/
//!
//! # Check a config file
//! cargo run -p td_headless -- validate --config crates/td_headless/configs/default.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use td_core::config::GameConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use td_headless::{
    batch::{run_batch, BatchConfig},
    config_loader::load_or_default,
    runner::{HeadlessConfig, HeadlessRunner},
};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless wave defense runner for agents, balance runs and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a match interactively over the JSON protocol
    Protocol {
        /// Match config (RON); built-in default if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,
    },

    /// Play one match to the end with the configured layout
    Simulate {
        /// Match config (RON); built-in default if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the config's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Give up after this many ticks
        #[arg(long, default_value = "72000")]
        max_ticks: u64,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Match config (RON); built-in default if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of matches to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Give up on a match after this many ticks
        #[arg(long, default_value = "72000")]
        max_ticks: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Load and validate a config file
    Validate {
        /// Config file to check
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Protocol { config, auto_state }) => {
            cmd_protocol(config.as_deref(), auto_state);
        }
        Some(Commands::Simulate {
            config,
            seed,
            max_ticks,
        }) => {
            cmd_simulate(config.as_deref(), seed, max_ticks);
        }
        Some(Commands::Batch {
            config,
            count,
            parallel,
            seed,
            max_ticks,
            output,
        }) => {
            cmd_batch(config.as_deref(), count, parallel, seed, max_ticks, &output);
        }
        Some(Commands::Validate { config }) => {
            cmd_validate(&config);
        }
        None => {
            // Default: interactive mode
            cmd_protocol(None, false);
        }
    }
}

/// Load a config or exit with a message.
fn load_or_exit(path: Option<&Path>) -> GameConfig {
    match load_or_default(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Drive a match over stdin/stdout
fn cmd_protocol(config: Option<&Path>, auto_state: bool) {
    tracing::info!("Starting interactive session");

    let game = load_or_exit(config);
    let runner_config = HeadlessConfig {
        auto_state_output: auto_state,
    };

    let mut runner = match HeadlessRunner::with_config(game, runner_config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: Cannot start match: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = runner.run_stdio() {
        tracing::error!(error = %e, "Protocol stream failed");
        std::process::exit(1);
    }
}

/// Play one match and print its summary
fn cmd_simulate(config: Option<&Path>, seed: Option<u64>, max_ticks: u64) {
    let mut game = load_or_exit(config);
    if let Some(seed) = seed {
        game.seed = seed;
    }

    tracing::info!(seed = game.seed, max_ticks, "Simulating match");

    let summary = match td_headless::simulate_match(game, max_ticks) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "Match aborted");
            eprintln!("FATAL: Match aborted: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("FATAL: Cannot serialize summary: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a batch of seeds for balance testing
fn cmd_batch(
    config: Option<&Path>,
    count: u32,
    parallel: u32,
    seed: u64,
    max_ticks: u64,
    output: &Path,
) {
    let game = load_or_exit(config);

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        count = count,
        parallel = parallel,
        seed = seed,
        max_ticks = max_ticks,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let batch = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        max_ticks,
    };
    let results = run_batch(&game, batch);

    // Save results
    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    // Print summary
    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", summary.total_games);
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Victories: {} ({:.1}%)",
        summary.victories,
        summary.victory_rate * 100.0
    );
    eprintln!("Defeats: {}", summary.defeats);
    if summary.unfinished > 0 {
        eprintln!("Unfinished: {}", summary.unfinished);
    }
    eprintln!("Average ticks: {:.0}", summary.average_ticks);
    eprintln!("Average health left: {:.1}", summary.average_health);

    // Report errors if any
    if !results.errors.is_empty() {
        eprintln!("\nMATCH FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Match {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Validate a config file
fn cmd_validate(path: &Path) {
    let game = load_or_exit(Some(path));
    eprintln!(
        "OK: {}x{} board, {} waves, {} enemies, {} layout placements",
        game.board.width,
        game.board.height,
        game.scenario.total_waves(),
        game.scenario.total_spawns(),
        game.layout.len()
    );
}
