//! # TD Core
//!
//! Deterministic match core for the wave defense game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (spawn selection uses a seeded generator)
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and batch balancing
//! - Reproducible matches from a config and a seed
//! - Testing every phase transition without a UI
//!
//! ## Crate Structure
//!
//! - [`game`] - Match loop controller and phases
//! - [`collection`] - Per-tick entity collections
//! - [`scenario`] - Wave progression
//! - [`preparation`] - Cancellable pre-combat countdown
//! - [`board`] - Board interface and the grid reference board
//! - [`pause`] - Pause broadcast
//! - [`collaborators`] - Interfaces to UI and scene loading
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod board;
pub mod collaborators;
pub mod collection;
pub mod command;
pub mod config;
pub mod effects;
pub mod enemy;
pub mod error;
pub mod game;
pub mod health;
pub mod math;
pub mod pause;
pub mod preparation;
pub mod scenario;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behavior::{GameBehavior, TickContext, UpdateStatus};
    pub use crate::board::{Board, BoardConfig, GridBoard, Placement, TileContent, TileCoord};
    pub use crate::collaborators::{
        Builder, Collaborators, HealthDisplay, ResultPresenter, SceneLoader, Unattended,
        WaveDisplay,
    };
    pub use crate::collection::{EntityCollection, EntityId, UpdateSummary};
    pub use crate::command::{MatchCommand, MatchHandle, ResultChoices};
    pub use crate::config::GameConfig;
    pub use crate::enemy::{Enemy, EnemyFactory, EnemyKind};
    pub use crate::error::{GameError, Result};
    pub use crate::game::{MatchController, MatchOutcome, MatchPhase, MatchStats, TickReport};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::pause::PauseCoordinator;
    pub use crate::preparation::{CancelToken, Cancelled};
    pub use crate::scenario::{ScenarioConfig, WaveSnapshot};
}
