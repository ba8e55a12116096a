//! Error types for the match core.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all match core errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Board dimension outside the supported range.
    #[error("Board {axis} {value} out of range ({min}..={max})")]
    BoardDimensionOutOfRange {
        /// Which dimension was rejected ("width" or "height").
        axis: &'static str,
        /// Requested size.
        value: u32,
        /// Smallest supported size.
        min: u32,
        /// Largest supported size.
        max: u32,
    },

    /// The board has no spawn point to place an enemy on.
    #[error("No spawn point available on the board")]
    NoSpawnPoint,

    /// The spawn point has no path to a destination.
    #[error("No route from spawn point ({x}, {y}) to a destination")]
    RouteUnavailable {
        /// Spawn tile column.
        x: u32,
        /// Spawn tile row.
        y: u32,
    },

    /// Tile coordinate outside the board.
    #[error("Tile ({x}, {y}) is outside the board")]
    TileOutOfBounds {
        /// Tile column.
        x: u32,
        /// Tile row.
        y: u32,
    },

    /// Placement was refused by the board.
    #[error("Placement rejected at ({x}, {y}): {reason}")]
    PlacementRejected {
        /// Tile column.
        x: u32,
        /// Tile row.
        y: u32,
        /// Why the board refused.
        reason: String,
    },

    /// Placement attempted while the builder is disabled.
    #[error("Placement is locked outside of setup")]
    PlacementLocked,

    /// Scenario definition is unusable.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    /// Configuration value is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not valid in the current state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
