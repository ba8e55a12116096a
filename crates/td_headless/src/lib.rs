//! Headless match runner for automated play and CI verification.
//!
//! This crate drives the match core without a UI. It can be controlled via
//! JSON commands on stdin, with match state output on stdout. This enables:
//!
//! - **Agent play**: a script or agent places defenses and answers dialogs
//! - **Balance runs**: many seeds of one config played in parallel
//! - **CI verification**: configs validated and matches replayed for determinism
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, place, new_game, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command and response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"new_game"}' | cargo run -p td_headless
//!
//! # Play one match with a config
//! cargo run -p td_headless -- simulate --config crates/td_headless/configs/default.ron
//!
//! # Balance run over 500 seeds
//! cargo run -p td_headless -- batch --config crates/td_headless/configs/default.ron --count 500
//! ```

pub mod batch;
pub mod config_loader;
pub mod hud;
pub mod protocol;
pub mod runner;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use config_loader::{load_config, ConfigError};
pub use hud::{Hud, HudState};
pub use protocol::{Command, Response, StateSnapshot};
pub use runner::{simulate_match, HeadlessConfig, HeadlessRunner, MatchSummary};
