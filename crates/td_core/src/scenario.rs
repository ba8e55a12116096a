//! Wave scenarios and their progression.
//!
//! A scenario is an ordered list of waves; a wave is an ordered list of
//! spawn sequences. A sequence fires its first spawn as soon as it starts,
//! then one spawn per cooldown. After its last spawn it waits one more
//! cooldown and hands the leftover time to the next sequence, which leaves
//! a breather between sequences and between waves.
//!
//! # States
//!
//! ```text
//! NotStarted --begin()--> Active --final spawn fired--> Exhausted
//! ```
//!
//! `progress` returning `false` only means no further spawns will happen.
//! Enemies already in play may still be alive.

use serde::{Deserialize, Serialize};

use crate::enemy::EnemyKind;
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};

/// One run of identical spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnSequenceConfig {
    /// Kind of enemy to spawn.
    pub enemy: EnemyKind,
    /// Number of spawns (at least one).
    pub amount: u32,
    /// Seconds between spawns.
    #[serde(with = "fixed_decimal")]
    pub cooldown: Fixed,
}

/// A batch of spawn sequences played back to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Sequences in play order.
    pub sequences: Vec<SpawnSequenceConfig>,
}

/// The combat content of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Waves in play order.
    pub waves: Vec<WaveConfig>,
    /// How many times the waves are played (at least one).
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    /// Added to the scenario time scale at the start of every repeat cycle.
    #[serde(default, with = "fixed_decimal")]
    pub cycle_speed_up: Fixed,
}

fn default_cycles() -> u32 {
    1
}

impl ScenarioConfig {
    /// Check that the scenario can be played to exhaustion.
    pub fn validate(&self) -> Result<()> {
        if self.waves.is_empty() {
            return Err(GameError::InvalidScenario("no waves".to_string()));
        }
        if self.cycles == 0 {
            return Err(GameError::InvalidScenario(
                "cycles must be at least 1".to_string(),
            ));
        }
        if self.cycle_speed_up < Fixed::ZERO {
            return Err(GameError::InvalidScenario(
                "cycle_speed_up must not be negative".to_string(),
            ));
        }
        for (wave_index, wave) in self.waves.iter().enumerate() {
            if wave.sequences.is_empty() {
                return Err(GameError::InvalidScenario(format!(
                    "wave {wave_index} has no spawn sequences"
                )));
            }
            for sequence in &wave.sequences {
                if sequence.amount == 0 {
                    return Err(GameError::InvalidScenario(format!(
                        "wave {wave_index} has a sequence with amount 0"
                    )));
                }
                if sequence.cooldown < Fixed::ZERO {
                    return Err(GameError::InvalidScenario(format!(
                        "wave {wave_index} has a negative cooldown"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Total waves across all cycles.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        (self.waves.len() as u32).saturating_mul(self.cycles)
    }

    /// Total spawn events across all cycles.
    #[must_use]
    pub fn total_spawns(&self) -> u32 {
        let per_cycle: u32 = self
            .waves
            .iter()
            .flat_map(|wave| wave.sequences.iter())
            .map(|sequence| sequence.amount)
            .sum();
        per_cycle.saturating_mul(self.cycles)
    }
}

/// A spawn the match controller should carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Enemy kind to spawn.
    pub kind: EnemyKind,
    /// Wave index (across cycles) the spawn belongs to.
    pub wave: u32,
}

/// Read-only wave counter for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSnapshot {
    /// Current wave index, 0-based, counted across cycles.
    pub current: u32,
    /// Total number of waves.
    pub total: u32,
}

/// Lifecycle of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPhase {
    /// Waiting for `begin`.
    NotStarted,
    /// Spawning.
    Active,
    /// Every spawn event has fired.
    Exhausted,
}

/// Progress through a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    config: ScenarioConfig,
    phase: ScenarioPhase,
    cycle: u32,
    wave: usize,
    sequence: usize,
    fired: u32,
    clock: Fixed,
    time_scale: Fixed,
}

impl ScenarioState {
    /// Prepare a scenario for play.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phase: ScenarioPhase::NotStarted,
            cycle: 0,
            wave: 0,
            sequence: 0,
            fired: 0,
            clock: Fixed::ZERO,
            time_scale: Fixed::ONE,
        })
    }

    /// Start the first wave.
    pub fn begin(&mut self) -> Result<()> {
        if self.phase != ScenarioPhase::NotStarted {
            return Err(GameError::InvalidState(format!(
                "scenario already started ({:?})",
                self.phase
            )));
        }
        self.phase = ScenarioPhase::Active;
        self.cycle = 0;
        self.wave = 0;
        self.sequence = 0;
        self.fired = 0;
        self.time_scale = Fixed::ONE;
        // A fresh sequence fires on its first progress call.
        self.clock = self.current_sequence().cooldown;
        tracing::debug!(total_waves = self.config.total_waves(), "Scenario started");
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn phase(&self) -> ScenarioPhase {
        self.phase
    }

    /// Scenario time multiplier (grows with each repeat cycle).
    #[must_use]
    pub const fn time_scale(&self) -> Fixed {
        self.time_scale
    }

    /// Wave counter snapshot. Never mutates.
    #[must_use]
    pub fn waves(&self) -> WaveSnapshot {
        WaveSnapshot {
            current: self.wave_index(),
            total: self.config.total_waves(),
        }
    }

    /// Advance the spawn clock by `dt` and push every spawn that falls due.
    ///
    /// Returns `true` while spawn events remain, `false` from the call that
    /// fires the final spawn onward. Outside the active state nothing happens.
    pub fn progress(&mut self, dt: Fixed, requests: &mut Vec<SpawnRequest>) -> bool {
        if self.phase != ScenarioPhase::Active {
            return false;
        }

        let mut budget = dt.saturating_mul(self.time_scale);
        loop {
            let sequence = *self.current_sequence();
            self.clock = self.clock.saturating_add(budget);

            while self.fired < sequence.amount && self.clock >= sequence.cooldown {
                self.clock -= sequence.cooldown;
                self.fired += 1;
                requests.push(SpawnRequest {
                    kind: sequence.enemy,
                    wave: self.wave_index(),
                });
                if self.is_final_spawn() {
                    self.phase = ScenarioPhase::Exhausted;
                    tracing::debug!(wave = self.wave_index(), "Scenario exhausted");
                    return false;
                }
            }

            if self.fired < sequence.amount || self.clock < sequence.cooldown {
                return true;
            }
            budget = self.clock - sequence.cooldown;
            self.advance_sequence();
        }
    }

    fn current_sequence(&self) -> &SpawnSequenceConfig {
        &self.config.waves[self.wave].sequences[self.sequence]
    }

    fn wave_index(&self) -> u32 {
        self.cycle
            .saturating_mul(self.config.waves.len() as u32)
            .saturating_add(self.wave as u32)
    }

    fn is_final_spawn(&self) -> bool {
        let waves = &self.config.waves;
        self.cycle + 1 == self.config.cycles
            && self.wave + 1 == waves.len()
            && self.sequence + 1 == waves[self.wave].sequences.len()
            && self.fired == self.current_sequence().amount
    }

    fn advance_sequence(&mut self) {
        self.sequence += 1;
        if self.sequence >= self.config.waves[self.wave].sequences.len() {
            self.sequence = 0;
            self.wave += 1;
            if self.wave >= self.config.waves.len() {
                self.wave = 0;
                self.cycle += 1;
                self.time_scale = self.time_scale.saturating_add(self.config.cycle_speed_up);
                tracing::debug!(cycle = self.cycle, "Scenario cycle repeated");
            }
            tracing::debug!(wave = self.wave_index(), "Wave started");
        }
        self.fired = 0;
        self.clock = self.current_sequence().cooldown;
    }
}
