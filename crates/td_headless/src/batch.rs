//! Batch match runner for balance testing.
//!
//! Plays the same config under many seeds in parallel using rayon and
//! aggregates the outcomes.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use td_core::config::GameConfig;
use td_core::game::MatchOutcome;
use tracing::{debug, info, warn};

use crate::runner::{simulate_match, MatchSummary};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Tick limit per match
    pub max_ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: 72_000, // one hour at 20 tps
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` matches
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Aggregate over every finished match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches that ran without error
    pub total_games: u32,
    /// Matches won
    pub victories: u32,
    /// Matches lost
    pub defeats: u32,
    /// Matches that hit the tick limit
    pub unfinished: u32,
    /// Share of matches won
    pub victory_rate: f64,
    /// Mean ticks per match
    pub average_ticks: f64,
    /// Mean health left at the end
    pub average_health: f64,
    /// Mean enemies killed by defenses
    pub average_kills: f64,
}

impl BatchSummary {
    /// Aggregate `games`.
    pub fn from_games(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = |outcome: Option<MatchOutcome>| {
            games
                .iter()
                .filter(|game| game.outcome == outcome)
                .count() as u32
        };
        let total = games.len() as f64;
        let mean = |value: fn(&MatchSummary) -> f64| games.iter().map(value).sum::<f64>() / total;

        let victories = count(Some(MatchOutcome::Victory));
        Self {
            total_games: games.len() as u32,
            victories,
            defeats: count(Some(MatchOutcome::Defeat)),
            unfinished: count(None),
            victory_rate: victories as f64 / total,
            average_ticks: mean(|game| game.ticks as f64),
            average_health: mean(|game| game.health as f64),
            average_kills: mean(|game| game.stats.enemies_killed as f64),
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match summaries, in seed order
    pub games: Vec<MatchSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run a batch of matches
pub fn run_batch(game: &GameConfig, config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        games = config.game_count,
        seed_start = config.seed_start,
        waves = game.scenario.total_waves(),
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<MatchSummary, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let mut match_config = game.clone();
            match_config.seed = seed;

            match simulate_match(match_config, config.max_ticks) {
                Ok(summary) => {
                    debug!(seed, outcome = ?summary.outcome, ticks = summary.ticks, "Match finished");
                    Ok(summary)
                }
                Err(e) => {
                    warn!("Match {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} matches in {:.1}s ({} victories, {} defeats)",
        games.len(),
        duration_seconds,
        summary.victories,
        summary.defeats
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Play the same seed `runs` times and check the final hashes agree.
pub fn verify_determinism(game: &GameConfig, max_ticks: u64, runs: u32) -> bool {
    let hashes: Vec<Option<u64>> = (0..runs)
        .map(|_| {
            simulate_match(game.clone(), max_ticks)
                .ok()
                .map(|summary| summary.hash)
        })
        .collect();
    hashes.windows(2).all(|pair| pair[0] == pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::error::GameError;

    fn quick_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.prepare_seconds = td_core::math::Fixed::ZERO;
        config
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500).with_seed(12345).with_max_ticks(100);
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.max_ticks, 100);
        assert_eq!(config.parallel_games, 0);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(&quick_config(), BatchConfig::new(6));

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|game| game.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(results.summary.total_games, 6);
        assert_eq!(results.summary.victories, 6);
        assert_eq!(results.summary.victory_rate, 1.0);
        assert_eq!(results.summary.average_health, 5.0);
    }

    #[test]
    fn test_tick_limit_leaves_matches_unfinished() {
        let results = run_batch(&quick_config(), BatchConfig::new(2).with_max_ticks(10));
        assert_eq!(results.summary.unfinished, 2);
        assert_eq!(results.summary.victory_rate, 0.0);
    }

    #[test]
    fn test_failed_matches_collected_as_errors() {
        let mut config = quick_config();
        config.board.width = 2;
        let results = run_batch(&config, BatchConfig::new(3));

        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 3);
        let expected = GameError::BoardDimensionOutOfRange {
            axis: "width",
            value: 2,
            min: 10,
            max: 100,
        }
        .to_string();
        assert!(results.errors.iter().all(|error| error.message == expected));
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&quick_config(), 2_000, 3));
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(&quick_config(), BatchConfig::new(2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config, results.config);
    }
}
