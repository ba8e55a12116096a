//! The match loop controller.
//!
//! [`MatchController`] owns one match: the enemy and effect collections, the
//! board, the scenario, the preparation countdown and the player's health.
//! [`MatchController::tick`] advances everything by one fixed step in a
//! fixed order:
//!
//! 1. Pause changes are picked up and a pending exit to the menu is
//!    advanced. While paused nothing below runs.
//! 2. Queued [`MatchCommand`]s are handled, then the preparation countdown
//!    is resumed.
//! 3. While a scenario is in progress the wave counter is published and the
//!    match is checked for Defeat (health gone), then the scenario is
//!    progressed, due enemies are spawned and the match is checked for
//!    Victory (no spawns left and no enemies alive). Defeat is checked
//!    first.
//! 4. Enemies update, then the board, then effects. Effects spawned during
//!    these passes join the effect collection afterwards.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::mpsc::{channel, Receiver};
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::behavior::TickContext;
use crate::board::{Board, TileCoord, TileContent};
use crate::collaborators::{Builder, Collaborators, ResultPresenter, SceneLoader, WaveDisplay};
use crate::collection::{EntityCollection, EntityId, UpdateSummary};
use crate::command::{MatchCommand, MatchHandle, ResultChoices};
use crate::config::GameConfig;
use crate::effects::{Effect, EffectBuffer};
use crate::enemy::{Enemy, EnemyFactory, EnemyKind, ProfileFactory};
use crate::error::{GameError, Result};
use crate::health::PlayerHealth;
use crate::math::Fixed;
use crate::pause::{PauseCoordinator, PauseListener};
use crate::preparation::{CancelToken, Preparation, PreparationScope};
use crate::scenario::{ScenarioState, SpawnRequest, WaveSnapshot};

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Every spawn fired and every enemy is gone.
    Victory,
    /// The player ran out of health.
    Defeat,
}

/// Where the match is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No match running (fresh controller, declined or aborted setup).
    Idle,
    /// Preparation countdown running; placement allowed.
    Preparing,
    /// Scenario running.
    InProgress,
    /// Result reached and presented.
    Ended(MatchOutcome),
    /// Leaving for the menu.
    ExitingToMenu,
    /// The menu is loaded; the controller does nothing further.
    Exited,
}

/// Running tallies across every match this controller has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchStats {
    /// New game sequences started.
    pub matches_started: u32,
    /// Preparations cut short by cleanup.
    pub preparations_cancelled: u32,
    /// Preparations the player declined.
    pub preparations_declined: u32,
    /// Scenarios started after a completed preparation.
    pub scenarios_armed: u32,
    /// Enemies placed on the board.
    pub enemies_spawned: u32,
    /// Enemies destroyed by defenses.
    pub enemies_killed: u32,
    /// Enemies that reached a destination.
    pub enemies_arrived: u32,
    /// Matches won.
    pub victories: u32,
    /// Matches lost.
    pub defeats: u32,
    /// Matches aborted by a scenario error.
    pub aborted: u32,
}

/// What happened during one [`MatchController::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Simulation ticks run so far (paused ticks not counted).
    pub tick: u64,
    /// Phase after the tick.
    pub phase: MatchPhase,
    /// Whether the tick was skipped for pause.
    pub paused: bool,
    /// Outcome reached during this tick.
    pub outcome: Option<MatchOutcome>,
    /// Player health after the tick.
    pub health: u32,
    /// Enemies spawned this tick.
    pub spawned: u32,
    /// Enemy pass counts.
    pub enemies: UpdateSummary,
    /// Effect pass counts.
    pub effects: UpdateSummary,
    /// Scenario error that aborted the match this tick.
    pub error: Option<GameError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuStep {
    Unloading,
    Loading,
}

/// Owner and driver of a match.
pub struct MatchController {
    config: GameConfig,
    dt: Fixed,
    phase: MatchPhase,
    tick: u64,
    paused: bool,
    pause: PauseListener,
    board: Box<dyn Board>,
    factory: Box<dyn EnemyFactory>,
    health: PlayerHealth,
    wave_display: Box<dyn WaveDisplay>,
    results: Box<dyn ResultPresenter>,
    builder: Box<dyn Builder>,
    scenes: Box<dyn SceneLoader>,
    enemies: EntityCollection<Enemy>,
    effects: EntityCollection<Effect>,
    effect_buffer: EffectBuffer,
    scenario_template: ScenarioState,
    scenario: Option<ScenarioState>,
    spawn_requests: Vec<SpawnRequest>,
    preparation: PreparationScope,
    placement_enabled: bool,
    menu_step: MenuStep,
    commands: Receiver<MatchCommand>,
    handle: MatchHandle,
    stats: MatchStats,
}

impl MatchController {
    /// Validate `config`, initialize `board` and register with `pause`.
    ///
    /// The controller starts [`MatchPhase::Idle`]; queue a new game through
    /// its [`handle`](Self::handle) to begin.
    pub fn new(
        config: GameConfig,
        mut board: Box<dyn Board>,
        collaborators: Collaborators,
        pause: &mut PauseCoordinator,
    ) -> Result<Self> {
        config.validate()?;
        board.initialize(config.board_config()?)?;
        let scenario_template = ScenarioState::new(config.scenario.clone())?;

        let (sender, commands) = channel();
        let listener = pause.register();
        let paused = listener.is_paused();
        let mut enemies = EntityCollection::new();
        enemies.set_paused(paused);

        let Collaborators {
            health,
            waves,
            results,
            builder,
            scenes,
        } = collaborators;

        tracing::info!(
            width = config.board.width,
            height = config.board.height,
            waves = config.scenario.total_waves(),
            tick_rate = config.tick_rate,
            "Match controller created"
        );

        Ok(Self {
            dt: config.time_step(),
            factory: Box::new(ProfileFactory::new(config.enemies)),
            config,
            phase: MatchPhase::Idle,
            tick: 0,
            paused,
            pause: listener,
            board,
            health: PlayerHealth::new(health),
            wave_display: waves,
            results,
            builder,
            scenes,
            enemies,
            effects: EntityCollection::new(),
            effect_buffer: EffectBuffer::default(),
            scenario_template,
            scenario: None,
            spawn_requests: Vec::new(),
            preparation: PreparationScope::new(),
            placement_enabled: false,
            menu_step: MenuStep::Unloading,
            commands,
            handle: MatchHandle::new(sender),
            stats: MatchStats::default(),
        })
    }

    /// Replace the enemy factory.
    #[must_use]
    pub fn with_enemy_factory(mut self, factory: Box<dyn EnemyFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Advance the match by one fixed step.
    pub fn tick(&mut self) -> TickReport {
        if let Some(paused) = self.pause.poll() {
            self.set_paused(paused);
        }

        if self.phase == MatchPhase::ExitingToMenu {
            self.advance_menu_transition();
        }
        if self.phase == MatchPhase::Exited || self.paused {
            return self.report(None, 0, UpdateSummary::default(), UpdateSummary::default(), None);
        }

        self.tick += 1;
        self.process_commands();
        self.resume_preparation();

        let mut outcome = None;
        let mut spawned = 0;
        let mut error = None;
        if self.phase == MatchPhase::InProgress {
            match self.run_scenario() {
                Ok((count, reached)) => {
                    spawned = count;
                    outcome = reached;
                }
                Err((count, failure)) => {
                    spawned = count;
                    self.abort_match(&failure);
                    error = Some(failure);
                }
            }
        }

        let (enemies, effects) = self.update_entities();
        let report = self.report(outcome, spawned, enemies, effects, error);
        tracing::trace!(?report, "Tick");
        report
    }

    /// Scenario step: Defeat check, spawns, Victory check.
    ///
    /// Returns the spawn count and any outcome reached, or the spawn count
    /// and the error that stopped spawning.
    fn run_scenario(
        &mut self,
    ) -> std::result::Result<(u32, Option<MatchOutcome>), (u32, GameError)> {
        let Some(scenario) = self.scenario.as_mut() else {
            return Ok((0, None));
        };
        self.wave_display.waves_changed(scenario.waves());

        if self.health.is_depleted() {
            self.end_match(MatchOutcome::Defeat);
            return Ok((0, Some(MatchOutcome::Defeat)));
        }

        self.spawn_requests.clear();
        let remaining = scenario.progress(self.dt, &mut self.spawn_requests);

        let requests = std::mem::take(&mut self.spawn_requests);
        let mut spawned = 0;
        for request in &requests {
            if let Err(error) = self.spawn_enemy(request.kind) {
                self.spawn_requests = requests;
                return Err((spawned, error));
            }
            spawned += 1;
        }
        self.spawn_requests = requests;

        if !remaining && self.enemies.is_empty() {
            self.end_match(MatchOutcome::Victory);
            return Ok((spawned, Some(MatchOutcome::Victory)));
        }
        Ok((spawned, None))
    }

    fn update_entities(&mut self) -> (UpdateSummary, UpdateSummary) {
        let dt = self.dt;
        let enemies = {
            let mut ctx = TickContext::new(
                dt,
                &mut self.health,
                None,
                &mut self.effect_buffer,
                &mut self.stats,
            );
            self.enemies.game_update(&mut ctx)
        };

        let effects = {
            let mut ctx = TickContext::new(
                dt,
                &mut self.health,
                Some(&mut self.enemies),
                &mut self.effect_buffer,
                &mut self.stats,
            );
            self.board.game_update(&mut ctx);
            self.effects.game_update(&mut ctx)
        };

        self.effect_buffer.drain_into(&mut self.effects);
        (enemies, effects)
    }

    fn report(
        &self,
        outcome: Option<MatchOutcome>,
        spawned: u32,
        enemies: UpdateSummary,
        effects: UpdateSummary,
        error: Option<GameError>,
    ) -> TickReport {
        TickReport {
            tick: self.tick,
            phase: self.phase,
            paused: self.paused,
            outcome,
            health: self.health.current(),
            spawned,
            enemies,
            effects,
            error,
        }
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            tracing::debug!(?command, "Command received");
            match command {
                MatchCommand::NewGame => self.begin_new_game(),
                MatchCommand::ExitToMenu => self.go_to_menu(),
                MatchCommand::SkipPreparation => match self.preparation.active_mut() {
                    Some(preparation) => preparation.skip(),
                    None => tracing::debug!("No preparation to skip"),
                },
                MatchCommand::DeclinePreparation => match self.preparation.active_mut() {
                    Some(preparation) => preparation.decline(),
                    None => tracing::debug!("No preparation to decline"),
                },
            }
        }
    }

    fn resume_preparation(&mut self) {
        if self.phase != MatchPhase::Preparing {
            return;
        }
        match self.preparation.poll(self.dt) {
            Poll::Pending => {}
            Poll::Ready(Ok(true)) => self.start_scenario(),
            Poll::Ready(Ok(false)) => {
                self.stats.preparations_declined += 1;
                self.phase = MatchPhase::Idle;
                tracing::info!("Preparation declined, scenario not started");
            }
            Poll::Ready(Err(cancelled)) => {
                self.phase = MatchPhase::Idle;
                tracing::debug!(%cancelled, "Preparation ended without a scenario");
            }
        }
    }

    fn start_scenario(&mut self) {
        let mut scenario = self.scenario_template.clone();
        if let Err(error) = scenario.begin() {
            self.abort_match(&error);
            return;
        }
        self.scenario = Some(scenario);
        self.stats.scenarios_armed += 1;
        self.phase = MatchPhase::InProgress;
        tracing::info!(tick = self.tick, "Scenario started");
    }

    /// Drop everything belonging to the current match.
    fn cleanup(&mut self) {
        if let Some(cancelled) = self.preparation.cancel() {
            self.stats.preparations_cancelled += 1;
            tracing::debug!(%cancelled, "Outstanding preparation dropped");
        }
        self.enemies.clear();
        self.effects.clear();
        self.effect_buffer.clear();
        self.board.clear();
        self.scenario = None;
    }

    fn begin_new_game(&mut self) {
        if matches!(self.phase, MatchPhase::ExitingToMenu | MatchPhase::Exited) {
            tracing::debug!(phase = ?self.phase, "New game ignored while leaving");
            return;
        }
        self.cleanup();
        self.stats.matches_started += 1;
        self.placement_enabled = true;
        self.builder.enable();
        self.health.set(self.config.starting_health);
        self.preparation.begin(self.config.prepare_seconds);
        self.phase = MatchPhase::Preparing;
        tracing::info!(
            health = self.config.starting_health,
            prepare_seconds = %self.config.prepare_seconds,
            "New game"
        );
    }

    fn end_match(&mut self, outcome: MatchOutcome) {
        self.phase = MatchPhase::Ended(outcome);
        match outcome {
            MatchOutcome::Victory => self.stats.victories += 1,
            MatchOutcome::Defeat => self.stats.defeats += 1,
        }
        self.placement_enabled = false;
        self.builder.disable();
        tracing::info!(?outcome, tick = self.tick, "Match ended");
        self.results
            .present(outcome, ResultChoices::new(outcome, self.handle.clone()));
    }

    fn abort_match(&mut self, error: &GameError) {
        tracing::error!(%error, tick = self.tick, "Scenario failed, match aborted");
        self.stats.aborted += 1;
        self.cleanup();
        self.placement_enabled = false;
        self.builder.disable();
        self.phase = MatchPhase::Idle;
    }

    fn go_to_menu(&mut self) {
        if matches!(self.phase, MatchPhase::ExitingToMenu | MatchPhase::Exited) {
            return;
        }
        self.cleanup();
        self.placement_enabled = false;
        self.builder.disable();
        self.menu_step = MenuStep::Unloading;
        self.phase = MatchPhase::ExitingToMenu;
        tracing::info!("Leaving for the menu");
    }

    /// Unload the match scene, then load the menu. Neither step is cancelled.
    fn advance_menu_transition(&mut self) {
        if self.menu_step == MenuStep::Unloading {
            match self.scenes.poll_unload(&self.config.scenes.match_scene) {
                Poll::Pending => return,
                Poll::Ready(()) => {
                    tracing::debug!(scene = %self.config.scenes.match_scene, "Scene unloaded");
                    self.menu_step = MenuStep::Loading;
                }
            }
        }
        if let Poll::Ready(()) = self.scenes.poll_load(&self.config.scenes.menu_scene) {
            tracing::info!(scene = %self.config.scenes.menu_scene, "Menu loaded");
            self.phase = MatchPhase::Exited;
        }
    }

    /// Place an enemy of `kind` on a random spawn point.
    pub fn spawn_enemy(&mut self, kind: EnemyKind) -> Result<EntityId> {
        let spawn = self
            .board
            .random_spawn_point()
            .ok_or(GameError::NoSpawnPoint)?;
        let route = self
            .board
            .route_from(spawn)
            .ok_or(GameError::RouteUnavailable {
                x: spawn.x,
                y: spawn.y,
            })?;
        let mut enemy = self.factory.get(kind);
        enemy.spawn_on(route);
        let id = self.enemies.add(enemy);
        self.stats.enemies_spawned += 1;
        tracing::trace!(id, ?kind, x = spawn.x, y = spawn.y, "Enemy spawned");
        Ok(id)
    }

    /// Change a board tile. Only allowed while the builder is enabled.
    ///
    /// Enemies already walking pick up the board's new paths.
    pub fn place(&mut self, tile: TileCoord, content: TileContent) -> Result<()> {
        if !self.placement_enabled {
            return Err(GameError::PlacementLocked);
        }
        self.board.place(tile, content)?;
        let board = self.board.as_ref();
        for (id, enemy) in self.enemies.iter_mut() {
            if !enemy.reroute(board) {
                tracing::debug!(id, "No new route, enemy keeps its old one");
            }
        }
        Ok(())
    }

    /// Apply the configured layout, skipping placements the board refuses.
    /// Returns how many were applied.
    pub fn apply_layout(&mut self) -> usize {
        let layout = self.config.layout.clone();
        let mut applied = 0;
        for placement in layout {
            match self.place(placement.tile(), placement.content) {
                Ok(()) => applied += 1,
                Err(error) => tracing::warn!(%error, "Layout placement skipped"),
            }
        }
        applied
    }

    /// Suspend or resume the enemy collection and the tick.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.enemies.set_paused(paused);
        tracing::debug!(paused, "Match pause flag set");
    }

    /// Whether ticks are currently skipped.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Simulation ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Player health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health.current()
    }

    /// Live enemies.
    #[must_use]
    pub fn enemies(&self) -> &EntityCollection<Enemy> {
        &self.enemies
    }

    /// Live effects.
    #[must_use]
    pub fn effects(&self) -> &EntityCollection<Effect> {
        &self.effects
    }

    /// The board.
    #[must_use]
    pub fn board(&self) -> &dyn Board {
        self.board.as_ref()
    }

    /// Wave counter of the current scenario.
    #[must_use]
    pub fn waves(&self) -> Option<WaveSnapshot> {
        self.scenario.as_ref().map(ScenarioState::waves)
    }

    /// Seconds left on the preparation countdown.
    #[must_use]
    pub fn preparation_remaining(&self) -> Option<Fixed> {
        self.preparation.active().map(Preparation::remaining)
    }

    /// Cancellation token of the outstanding preparation.
    #[must_use]
    pub fn preparation_token(&self) -> Option<CancelToken> {
        self.preparation.token()
    }

    /// Whether the builder is enabled.
    #[must_use]
    pub const fn placement_enabled(&self) -> bool {
        self.placement_enabled
    }

    /// Running tallies.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Hash of the simulation state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.phase.hash(&mut hasher);
        self.health.current().hash(&mut hasher);
        self.stats.hash(&mut hasher);

        // Collections iterate in insertion order, which is deterministic.
        self.enemies.len().hash(&mut hasher);
        for (id, enemy) in self.enemies.iter() {
            id.hash(&mut hasher);
            enemy.position().x.to_bits().hash(&mut hasher);
            enemy.position().y.to_bits().hash(&mut hasher);
            enemy.health().to_bits().hash(&mut hasher);
        }

        self.effects.len().hash(&mut hasher);
        if let Some(waves) = self.waves() {
            waves.current.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Command sender for this match.
    #[must_use]
    pub fn handle(&self) -> MatchHandle {
        self.handle.clone()
    }
}

impl std::fmt::Debug for MatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchController")
            .field("phase", &self.phase)
            .field("tick", &self.tick)
            .field("paused", &self.paused)
            .field("health", &self.health.current())
            .field("enemies", &self.enemies.len())
            .field("effects", &self.effects.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GridBoard;
    use crate::scenario::{ScenarioConfig, SpawnSequenceConfig, WaveConfig};

    fn one_enemy_config() -> GameConfig {
        GameConfig {
            prepare_seconds: Fixed::ZERO,
            scenario: ScenarioConfig {
                waves: vec![WaveConfig {
                    sequences: vec![SpawnSequenceConfig {
                        enemy: EnemyKind::Small,
                        amount: 1,
                        cooldown: Fixed::ONE,
                    }],
                }],
                cycles: 1,
                cycle_speed_up: Fixed::ZERO,
            },
            ..GameConfig::default()
        }
    }

    fn controller(config: GameConfig) -> (MatchController, PauseCoordinator) {
        let mut pause = PauseCoordinator::new();
        let board = Box::new(GridBoard::new(config.mortar, config.seed));
        let controller =
            MatchController::new(config, board, Collaborators::default(), &mut pause).unwrap();
        (controller, pause)
    }

    #[test]
    fn test_starts_idle_and_waits_for_new_game() {
        let (mut controller, _pause) = controller(one_enemy_config());
        let report = controller.tick();
        assert_eq!(report.phase, MatchPhase::Idle);
        assert!(controller.enemies().is_empty());
        assert!(!controller.placement_enabled());
    }

    #[test]
    fn test_zero_preparation_spawns_on_first_tick() {
        let (mut controller, _pause) = controller(one_enemy_config());
        controller.handle().new_game();
        let report = controller.tick();
        assert_eq!(report.phase, MatchPhase::InProgress);
        assert_eq!(report.spawned, 1);
        assert_eq!(controller.enemies().len(), 1);
        assert_eq!(controller.health(), 20);
        assert_eq!(controller.waves(), Some(WaveSnapshot { current: 0, total: 1 }));
    }

    #[test]
    fn test_placement_locked_outside_match() {
        let (mut controller, _pause) = controller(one_enemy_config());
        assert_eq!(
            controller.place(TileCoord::new(3, 3), TileContent::Wall),
            Err(GameError::PlacementLocked)
        );
        controller.handle().new_game();
        controller.tick();
        assert!(controller.place(TileCoord::new(3, 3), TileContent::Wall).is_ok());
    }

    #[test]
    fn test_invalid_board_rejected_before_match_exists() {
        let mut config = one_enemy_config();
        config.board.height = 5;
        let mut pause = PauseCoordinator::new();
        let board = Box::new(GridBoard::new(config.mortar, 0));
        let result = MatchController::new(config, board, Collaborators::default(), &mut pause);
        assert!(matches!(
            result,
            Err(GameError::BoardDimensionOutOfRange { axis: "height", .. })
        ));
    }

    #[test]
    fn test_paused_tick_changes_nothing() {
        let (mut controller, mut pause) = controller(one_enemy_config());
        controller.handle().new_game();
        controller.tick();
        let before = controller.tick_count();

        pause.set_paused(true);
        let report = controller.tick();
        assert!(report.paused);
        assert!(controller.enemies().is_paused());
        assert_eq!(controller.tick_count(), before);

        pause.set_paused(false);
        assert!(!controller.tick().paused);
        assert_eq!(controller.tick_count(), before + 1);
    }
}
