//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical
//! results given an identical config, seed and command sequence.
//!
//! # Testing Strategy
//!
//! Headless batch runs and balance tuning rely on replaying a match from its
//! config alone. Sources of non-determinism include:
//!
//! - **Floating-point math**: configs are authored as decimals but converted
//!   once to [`td_core::math::Fixed`]; the simulation never sees a float.
//!
//! - **Collection order**: entity collections keep insertion order, and
//!   removals happen after each pass.
//!
//! - **System randomness**: spawn selection uses the board's seeded
//!   generator, reseeded by every new game.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: scenario and preparation timing
//! 2. **Property tests**: random scenarios still replay identically
//! 3. **Integration tests**: full matches are reproducible
//! 4. **Parallel tests**: matches run on several threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use td_core::config::GameConfig;

use crate::fixtures::MatchFixture;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the match was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance by one tick
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Start a match from `config`, run it `ticks` times and hash the result.
#[must_use]
pub fn run_match_hash(config: &GameConfig, ticks: u64) -> u64 {
    let mut fixture = MatchFixture::new(config.clone());
    fixture.start();
    for _ in 0..ticks {
        fixture.controller.tick();
    }
    fixture.controller.state_hash()
}

/// Run the same match on `runs` threads and collect the final hashes.
///
/// Each thread builds its own controller; nothing is shared.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn run_parallel_matches(config: &GameConfig, runs: usize, ticks: u64) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| s.spawn(|| run_match_hash(config, ticks)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("match thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Compare two runs of `config` tick by tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` if they diverge at that tick.
#[must_use]
pub fn find_first_divergence(config: &GameConfig, ticks: u64) -> Option<u64> {
    let mut first = MatchFixture::new(config.clone());
    let mut second = MatchFixture::new(config.clone());
    first.start();
    second.start();

    if first.controller.state_hash() != second.controller.state_hash() {
        return Some(0);
    }

    for tick in 1..=ticks {
        first.controller.tick();
        second.controller.tick();

        if first.controller.state_hash() != second.controller.state_hash() {
            tracing::debug!(tick, "Match runs diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for match testing.
pub mod strategies {
    use proptest::prelude::*;
    use td_core::enemy::EnemyKind;
    use td_core::math::Fixed;
    use td_core::scenario::{ScenarioConfig, SpawnSequenceConfig, WaveConfig};

    /// Any enemy kind.
    pub fn arb_enemy_kind() -> impl Strategy<Value = EnemyKind> {
        prop_oneof![
            Just(EnemyKind::Small),
            Just(EnemyKind::Medium),
            Just(EnemyKind::Large),
        ]
    }

    /// Cooldown in quarter seconds, 0 to 3.
    pub fn arb_cooldown() -> impl Strategy<Value = Fixed> {
        (0i32..=12).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
    }

    /// A spawn sequence of 1 to 5 enemies.
    pub fn arb_sequence() -> impl Strategy<Value = SpawnSequenceConfig> {
        (arb_enemy_kind(), 1u32..=5, arb_cooldown()).prop_map(|(enemy, amount, cooldown)| {
            SpawnSequenceConfig {
                enemy,
                amount,
                cooldown,
            }
        })
    }

    /// A valid scenario of 1 to 4 waves, each of 1 to 3 sequences, played
    /// for 1 or 2 cycles.
    pub fn arb_scenario() -> impl Strategy<Value = ScenarioConfig> {
        (
            proptest::collection::vec(
                proptest::collection::vec(arb_sequence(), 1..=3)
                    .prop_map(|sequences| WaveConfig { sequences }),
                1..=4,
            ),
            1u32..=2,
            0i32..=2,
        )
            .prop_map(|(waves, cycles, speed_up)| ScenarioConfig {
                waves,
                cycles,
                cycle_speed_up: Fixed::from_num(speed_up) / Fixed::from_num(2),
            })
    }

    /// Simulated frame length between 10 and 100 ms.
    pub fn arb_frame() -> impl Strategy<Value = Fixed> {
        (10i32..=100).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
    }

    /// Starting health values (1-50).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..=50
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::three_wave_config;

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.hashes, vec![20, 20, 20]);
    }

    #[test]
    fn test_match_replays_identically() {
        let config = three_wave_config();
        assert_eq!(find_first_divergence(&config, 200), None);
        run_parallel_matches(&config, 4, 200).assert_deterministic();
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, 2u32)), compute_hash(&(1u32, 2u32)));
    }
}
