//! JSON protocol for headless match control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller (a script or an agent)
//! **Output (stdout):** Match state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs state after each `tick` command (or on `query`)
//! 4. When a match ends, outputs `{"type":"game_over","result":"victory"|"defeat",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"new_game"}
//! <- {"type":"ack","cmd":"new_game"}
//! -> {"cmd":"tick"}
//! <- {"type":"state","tick":1,"phase":"preparing",...}
//! -> {"cmd":"place","x":4,"y":1,"content":"mortar"}
//! <- {"type":"ack","cmd":"place"}
//! -> {"cmd":"skip_preparation"}
//! <- {"type":"ack","cmd":"skip_preparation"}
//! -> {"cmd":"tick","count":600}
//! <- {"type":"game_over","result":"victory","tick":412,...}
//! <- {"type":"state","tick":412,"phase":{"ended":"victory"},...}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use td_core::board::TileContent;
use td_core::enemy::EnemyKind;
use td_core::game::{MatchOutcome, MatchPhase, MatchStats};
use td_core::scenario::WaveSnapshot;

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the match by N ticks (default: 1). Stops early when a match ends.
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query the current state without advancing time.
    Query,

    /// Start a new game (cancels whatever is running).
    NewGame,

    /// Pause the match.
    Pause,

    /// Resume the match.
    Resume,

    /// Change a board tile. Only accepted while building is enabled.
    Place {
        x: u32,
        y: u32,
        content: TileContent,
    },

    /// End the preparation countdown early and start the waves.
    SkipPreparation,

    /// Abandon the preparation without starting the waves.
    DeclinePreparation,

    /// Answer the result dialog with "play again".
    PlayAgain,

    /// Answer the result dialog with "exit to menu".
    Exit,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current match state.
    State(StateSnapshot),

    /// A match has ended.
    GameOver {
        result: MatchOutcome,
        tick: u64,
        stats: MatchStats,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Everything a controller can observe about the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub phase: MatchPhase,
    pub paused: bool,
    pub health: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waves: Option<WaveSnapshot>,
    /// Seconds left on the preparation countdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation_remaining: Option<f64>,
    pub building_enabled: bool,
    pub enemies: Vec<EnemyState>,
    pub effects: usize,
    pub hash: u64,
}

/// State of a single enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: f64,
    pub y: f64,
    pub health: f64,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::NewGame => "new_game",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Place { .. } => "place",
            Self::SkipPreparation => "skip_preparation",
            Self::DeclinePreparation => "decline_preparation",
            Self::PlayAgain => "play_again",
            Self::Exit => "exit",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let json = r#"{"cmd":"tick","count":60}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(cmd, Command::Tick { count: 60 });
    }

    #[test]
    fn test_default_tick_count() {
        let json = r#"{"cmd":"tick"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(cmd, Command::Tick { count: 1 });
    }

    #[test]
    fn test_parse_place_command() {
        let json = r#"{"cmd":"place","x":4,"y":1,"content":"mortar"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(
            cmd,
            Command::Place {
                x: 4,
                y: 1,
                content: TileContent::Mortar
            }
        );
        assert_eq!(cmd.name(), "place");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"spawn","unit_type":"tank"}"#).is_err());
    }

    #[test]
    fn test_serialize_state_response() {
        let resp = Response::State(StateSnapshot {
            tick: 100,
            phase: MatchPhase::InProgress,
            paused: false,
            health: 18,
            waves: Some(WaveSnapshot {
                current: 1,
                total: 3,
            }),
            preparation_remaining: None,
            building_enabled: true,
            enemies: vec![],
            effects: 0,
            hash: 12345,
        });
        let json = resp.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""tick":100"#));
        assert!(json.contains(r#""phase":"in_progress""#));
        assert!(!json.contains("preparation_remaining"));
    }

    #[test]
    fn test_serialize_game_over() {
        let resp = Response::GameOver {
            result: MatchOutcome::Defeat,
            tick: 42,
            stats: MatchStats::default(),
        };
        let json = resp.to_json_line();
        assert!(json.contains(r#""type":"game_over""#));
        assert!(json.contains(r#""result":"defeat""#));
        assert!(json.contains(r#""tick":42"#));
    }
}
