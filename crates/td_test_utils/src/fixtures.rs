//! Test fixtures and helpers.
//!
//! Pre-built configurations, boards and a wired-up match for consistent
//! testing.

use std::cell::RefCell;
use std::rc::Rc;

use td_core::behavior::TickContext;
use td_core::board::{Board, BoardConfig, GridBoard, Route, TileContent, TileCoord};
use td_core::config::GameConfig;
use td_core::enemy::EnemyKind;
use td_core::error::{GameError, Result};
use td_core::game::{MatchController, MatchPhase, TickReport};
use td_core::math::{Fixed, Vec2Fixed};
use td_core::pause::PauseCoordinator;
use td_core::scenario::{ScenarioConfig, SpawnSequenceConfig, WaveConfig};

use crate::recording::Recorder;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// One spawn sequence.
#[must_use]
pub fn sequence(enemy: EnemyKind, amount: u32, cooldown: f64) -> SpawnSequenceConfig {
    SpawnSequenceConfig {
        enemy,
        amount,
        cooldown: fixed_f(cooldown),
    }
}

/// One wave per entry of `sizes`, each a single run of small enemies.
#[must_use]
pub fn scenario_of(sizes: &[u32], cooldown: f64) -> ScenarioConfig {
    ScenarioConfig {
        waves: sizes
            .iter()
            .map(|&amount| WaveConfig {
                sequences: vec![sequence(EnemyKind::Small, amount, cooldown)],
            })
            .collect(),
        cycles: 1,
        cycle_speed_up: Fixed::ZERO,
    }
}

/// 10×10 board, 20 health, no preparation wait, one wave of one small enemy.
#[must_use]
pub fn one_enemy_config() -> GameConfig {
    GameConfig {
        starting_health: 20,
        prepare_seconds: Fixed::ZERO,
        tick_rate: 20,
        scenario: scenario_of(&[1], 1.0),
        ..GameConfig::default()
    }
}

/// Three waves of 2, 1 and 3 small enemies, one second apart.
#[must_use]
pub fn three_wave_config() -> GameConfig {
    GameConfig {
        prepare_seconds: Fixed::ZERO,
        scenario: scenario_of(&[2, 1, 3], 1.0),
        ..GameConfig::default()
    }
}

/// Board with no spawn points at all, for spawn failure paths.
#[derive(Debug, Default)]
pub struct BarrenBoard {
    size: Option<BoardConfig>,
}

impl Board for BarrenBoard {
    fn initialize(&mut self, config: BoardConfig) -> Result<()> {
        self.size = Some(config);
        Ok(())
    }

    fn random_spawn_point(&mut self) -> Option<TileCoord> {
        None
    }

    fn route_from(&self, _tile: TileCoord) -> Option<Route> {
        None
    }

    fn place(&mut self, tile: TileCoord, _content: TileContent) -> Result<()> {
        Err(GameError::PlacementRejected {
            x: tile.x,
            y: tile.y,
            reason: "barren board".to_string(),
        })
    }

    fn content(&self, tile: TileCoord) -> Option<TileContent> {
        let size = self.size?;
        (tile.x < size.width() && tile.y < size.height()).then_some(TileContent::Empty)
    }

    fn game_update(&mut self, _ctx: &mut TickContext<'_>) {}

    fn clear(&mut self) {}
}

/// Grid board that hands out a spawn point a limited number of times and
/// then reports none, for spawn failures in the middle of a wave.
#[derive(Debug)]
pub struct DwindlingBoard {
    inner: GridBoard,
    spawns_left: u32,
}

impl DwindlingBoard {
    /// Board for `config` that serves `spawns` spawn points in total.
    #[must_use]
    pub fn new(config: &GameConfig, spawns: u32) -> Self {
        Self {
            inner: GridBoard::new(config.mortar, config.seed),
            spawns_left: spawns,
        }
    }
}

impl Board for DwindlingBoard {
    fn initialize(&mut self, config: BoardConfig) -> Result<()> {
        self.inner.initialize(config)
    }

    fn random_spawn_point(&mut self) -> Option<TileCoord> {
        self.spawns_left = self.spawns_left.checked_sub(1)?;
        self.inner.random_spawn_point()
    }

    fn route_from(&self, tile: TileCoord) -> Option<Route> {
        self.inner.route_from(tile)
    }

    fn place(&mut self, tile: TileCoord, content: TileContent) -> Result<()> {
        self.inner.place(tile, content)
    }

    fn content(&self, tile: TileCoord) -> Option<TileContent> {
        self.inner.content(tile)
    }

    fn game_update(&mut self, ctx: &mut TickContext<'_>) {
        self.inner.game_update(ctx);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// One enemy as the board saw it during its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemySighting {
    /// Position at the time of the board update.
    pub position: Vec2Fixed,
    /// Health at the time of the board update.
    pub health: Fixed,
}

/// Sightings shared between a [`WatchingBoard`] and the test holding it,
/// one entry per board update.
pub type Sightings = Rc<RefCell<Vec<Vec<EnemySighting>>>>;

/// Grid board that records every enemy it can target each time it updates.
#[derive(Debug)]
pub struct WatchingBoard {
    inner: GridBoard,
    sightings: Sightings,
}

impl WatchingBoard {
    /// Board for `config`.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            inner: GridBoard::new(config.mortar, config.seed),
            sightings: Sightings::default(),
        }
    }

    /// Handle on the recorded sightings.
    #[must_use]
    pub fn sightings(&self) -> Sightings {
        Rc::clone(&self.sightings)
    }
}

impl Board for WatchingBoard {
    fn initialize(&mut self, config: BoardConfig) -> Result<()> {
        self.inner.initialize(config)
    }

    fn random_spawn_point(&mut self) -> Option<TileCoord> {
        self.inner.random_spawn_point()
    }

    fn route_from(&self, tile: TileCoord) -> Option<Route> {
        self.inner.route_from(tile)
    }

    fn place(&mut self, tile: TileCoord, content: TileContent) -> Result<()> {
        self.inner.place(tile, content)
    }

    fn content(&self, tile: TileCoord) -> Option<TileContent> {
        self.inner.content(tile)
    }

    fn game_update(&mut self, ctx: &mut TickContext<'_>) {
        let seen: Vec<EnemySighting> = ctx
            .targets()
            .map(|enemies| {
                enemies
                    .iter()
                    .map(|(_, enemy)| EnemySighting {
                        position: enemy.position(),
                        health: enemy.health(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.sightings.borrow_mut().push(seen);
        self.inner.game_update(ctx);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// A controller wired to a recorder and a pause coordinator.
#[derive(Debug)]
pub struct MatchFixture {
    /// The match.
    pub controller: MatchController,
    /// Pause owner the controller is registered with.
    pub pause: PauseCoordinator,
    /// Log of everything the collaborators saw.
    pub recorder: Recorder,
}

impl MatchFixture {
    /// Fixture on a [`GridBoard`] with instant scene loads.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let board = Box::new(GridBoard::new(config.mortar, config.seed));
        Self::with_board(config, board, Recorder::new())
    }

    /// Fixture on any board and recorder.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn with_board(config: GameConfig, board: Box<dyn Board>, recorder: Recorder) -> Self {
        let mut pause = PauseCoordinator::new();
        let controller =
            MatchController::new(config, board, recorder.collaborators(), &mut pause)
                .expect("fixture config must be valid");
        Self {
            controller,
            pause,
            recorder,
        }
    }

    /// Queue a new game and run the tick that handles it.
    pub fn start(&mut self) -> TickReport {
        self.controller.handle().new_game();
        self.controller.tick()
    }

    /// Tick until `done` accepts a report, at most `max_ticks` times.
    pub fn run_until(
        &mut self,
        max_ticks: u32,
        mut done: impl FnMut(&TickReport) -> bool,
    ) -> Option<TickReport> {
        for _ in 0..max_ticks {
            let report = self.controller.tick();
            if done(&report) {
                return Some(report);
            }
        }
        None
    }

    /// Tick until the match ends, at most `max_ticks` times.
    pub fn run_to_end(&mut self, max_ticks: u32) -> Option<TickReport> {
        self.run_until(max_ticks, |report| {
            matches!(report.phase, MatchPhase::Ended(_))
        })
    }
}
