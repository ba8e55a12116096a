//! Match configuration.
//!
//! Authored in RON. Decimal values (seconds, speeds, ranges) are converted
//! to fixed point once at load time.

use serde::{Deserialize, Serialize};

use crate::board::{BoardConfig, MortarSettings, Placement};
use crate::enemy::{EnemyKind, EnemyProfiles};
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};
use crate::scenario::{ScenarioConfig, SpawnSequenceConfig, WaveConfig};

/// Highest supported simulation rate.
pub const MAX_TICK_RATE: u32 = 240;

/// Requested board size, validated into a [`BoardConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSettings {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

/// Scene names used by the exit-to-menu sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSettings {
    /// Scene holding the match.
    pub match_scene: String,
    /// Scene loaded on exit.
    pub menu_scene: String,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            match_scene: "match".to_string(),
            menu_scene: "menu".to_string(),
        }
    }
}

/// Everything needed to run matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board size.
    pub board: BoardSettings,
    /// Player health at the start of each match.
    pub starting_health: u32,
    /// Length of the preparation countdown in seconds.
    #[serde(with = "fixed_decimal")]
    pub prepare_seconds: Fixed,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Seed for spawn point selection.
    #[serde(default)]
    pub seed: u64,
    /// Waves to play.
    pub scenario: ScenarioConfig,
    /// Enemy stats.
    #[serde(default)]
    pub enemies: EnemyProfiles,
    /// Mortar tower tuning.
    #[serde(default)]
    pub mortar: MortarSettings,
    /// Defenses placed at the start of each match by automated runs.
    #[serde(default)]
    pub layout: Vec<Placement>,
    /// Scene names.
    #[serde(default)]
    pub scenes: SceneSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        let sequence = |enemy, amount, cooldown: f64| SpawnSequenceConfig {
            enemy,
            amount,
            cooldown: Fixed::from_num(cooldown),
        };
        Self {
            board: BoardSettings {
                width: 10,
                height: 10,
            },
            starting_health: 20,
            prepare_seconds: Fixed::from_num(3),
            tick_rate: 20,
            seed: 0,
            scenario: ScenarioConfig {
                waves: vec![
                    WaveConfig {
                        sequences: vec![sequence(EnemyKind::Small, 5, 1.0)],
                    },
                    WaveConfig {
                        sequences: vec![
                            sequence(EnemyKind::Small, 5, 0.5),
                            sequence(EnemyKind::Medium, 3, 1.5),
                        ],
                    },
                    WaveConfig {
                        sequences: vec![sequence(EnemyKind::Large, 2, 3.0)],
                    },
                ],
                cycles: 1,
                cycle_speed_up: Fixed::ZERO,
            },
            enemies: EnemyProfiles::default(),
            mortar: MortarSettings::default(),
            layout: Vec::new(),
            scenes: SceneSettings::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(source).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidConfig(e.to_string()))
    }

    /// Reject anything a match could not run with.
    pub fn validate(&self) -> Result<()> {
        self.board_config()?;
        if self.starting_health == 0 {
            return Err(GameError::InvalidConfig(
                "starting_health must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_TICK_RATE).contains(&self.tick_rate) {
            return Err(GameError::InvalidConfig(format!(
                "tick_rate {} out of range (1..={MAX_TICK_RATE})",
                self.tick_rate
            )));
        }
        if self.prepare_seconds < Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "prepare_seconds must not be negative".to_string(),
            ));
        }
        self.scenario.validate()?;
        self.enemies.validate()?;
        self.mortar.validate()?;
        Ok(())
    }

    /// Validated board dimensions.
    pub fn board_config(&self) -> Result<BoardConfig> {
        BoardConfig::new(self.board.width, self.board.height)
    }

    /// Seconds per tick.
    #[must_use]
    pub fn time_step(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }
}
