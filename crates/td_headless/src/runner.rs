//! Headless match runner implementation.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use td_core::board::{GridBoard, TileCoord};
use td_core::config::GameConfig;
use td_core::error::GameError;
use td_core::game::{MatchController, MatchOutcome, MatchStats};
use td_core::pause::PauseCoordinator;

use crate::hud::Hud;
use crate::protocol::{Command, EnemyState, Response, StateSnapshot};

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessConfig {
    /// Output state after every simulated tick (vs once per `tick` command).
    pub auto_state_output: bool,
}

/// Headless runner for script- or agent-controlled matches.
#[derive(Debug)]
pub struct HeadlessRunner {
    controller: MatchController,
    pause: PauseCoordinator,
    hud: Hud,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a runner on a grid board with default runner settings.
    pub fn new(game: GameConfig) -> Result<Self, GameError> {
        Self::with_config(game, HeadlessConfig::default())
    }

    /// Create a runner with custom runner settings.
    pub fn with_config(game: GameConfig, config: HeadlessConfig) -> Result<Self, GameError> {
        let mut pause = PauseCoordinator::new();
        let hud = Hud::new();
        let board = Box::new(GridBoard::new(game.mortar, game.seed));
        let controller = MatchController::new(game, board, hud.collaborators(), &mut pause)?;
        Ok(Self {
            controller,
            pause,
            hud,
            config,
        })
    }

    /// The match being driven.
    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    /// What the player would see.
    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    /// Run the protocol loop until `quit` or end of input.
    ///
    /// Reads JSON commands from `input`, writes responses to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &Response::ready(self.controller.tick_count()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match Command::from_json(line) {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    write_response(&mut output, &Response::error(format!("Parse error: {e}"), None))?;
                    continue;
                }
            };

            let quit = command == Command::Quit;
            for response in self.execute(command) {
                write_response(&mut output, &response)?;
            }
            if quit {
                return Ok(());
            }
        }

        tracing::info!("Input closed, shutting down");
        write_response(&mut output, &Response::Bye)
    }

    /// Run the protocol loop on stdin and stdout.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Execute one command and return the responses it produces.
    pub fn execute(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        tracing::debug!(cmd = name, "Executing command");

        match command {
            Command::Tick { count } => self.advance(count),
            Command::Query => vec![Response::State(self.state())],
            Command::NewGame => {
                self.controller.handle().new_game();
                vec![Response::ack(name)]
            }
            Command::Pause => {
                self.pause.set_paused(true);
                vec![Response::ack(name)]
            }
            Command::Resume => {
                self.pause.set_paused(false);
                vec![Response::ack(name)]
            }
            Command::Place { x, y, content } => {
                match self.controller.place(TileCoord::new(x, y), content) {
                    Ok(()) => vec![Response::ack(name)],
                    Err(e) => vec![Response::error(e.to_string(), Some(name))],
                }
            }
            Command::SkipPreparation => {
                self.controller.handle().skip_preparation();
                vec![Response::ack(name)]
            }
            Command::DeclinePreparation => {
                self.controller.handle().decline_preparation();
                vec![Response::ack(name)]
            }
            Command::PlayAgain | Command::Exit => match self.hud.take_result() {
                Some(choices) => {
                    if command == Command::PlayAgain {
                        choices.play_again();
                    } else {
                        choices.exit();
                    }
                    vec![Response::ack(name)]
                }
                None => vec![Response::error("No result to answer", Some(name))],
            },
            Command::Quit => {
                tracing::info!(tick = self.controller.tick_count(), "Quit requested");
                vec![Response::Bye]
            }
        }
    }

    /// Advance up to `count` ticks, stopping when a match ends.
    fn advance(&mut self, count: u32) -> Vec<Response> {
        let mut responses = Vec::new();
        let mut ended = false;

        for _ in 0..count {
            let report = self.controller.tick();

            if let Some(error) = &report.error {
                responses.push(Response::error(error.to_string(), Some("tick")));
            }

            if let Some(result) = report.outcome {
                responses.push(Response::GameOver {
                    result,
                    tick: report.tick,
                    stats: *self.controller.stats(),
                });
                ended = true;
                break;
            }

            if self.config.auto_state_output {
                responses.push(Response::State(self.state()));
            }
        }

        if ended || !self.config.auto_state_output || count == 0 {
            responses.push(Response::State(self.state()));
        }
        responses
    }

    /// Snapshot of the match as a controller sees it.
    pub fn state(&self) -> StateSnapshot {
        let enemies = self
            .controller
            .enemies()
            .iter()
            .map(|(id, enemy)| EnemyState {
                id,
                kind: enemy.kind(),
                x: enemy.position().x.to_num(),
                y: enemy.position().y.to_num(),
                health: enemy.health().to_num(),
            })
            .collect();

        StateSnapshot {
            tick: self.controller.tick_count(),
            phase: self.controller.phase(),
            paused: self.pause.is_paused(),
            health: self.controller.health(),
            waves: self.controller.waves(),
            preparation_remaining: self
                .controller
                .preparation_remaining()
                .map(|remaining| remaining.to_num()),
            building_enabled: self.hud.building_enabled(),
            enemies,
            effects: self.controller.effects().len(),
            hash: self.controller.state_hash(),
        }
    }

    /// Play one match without outside input.
    ///
    /// Starts a new game, applies the configured layout while building is
    /// open, then lets the countdown and every wave run out. A paused
    /// runner is resumed first.
    pub fn simulate(&mut self, max_ticks: u64) -> Result<MatchSummary, GameError> {
        if self.pause.is_paused() {
            tracing::info!("Resuming paused runner for simulation");
            self.pause.set_paused(false);
        }
        self.controller.handle().new_game();
        let first = self.controller.tick();
        if let Some(error) = first.error {
            return Err(error);
        }
        let layout_applied = self.controller.apply_layout();

        let mut outcome = first.outcome;
        let mut budget = max_ticks;
        while outcome.is_none() && self.controller.tick_count() < max_ticks && budget > 0 {
            budget -= 1;
            let report = self.controller.tick();
            if let Some(error) = report.error {
                return Err(error);
            }
            outcome = report.outcome;
        }

        if outcome.is_none() {
            tracing::warn!(max_ticks, "Match did not finish within the tick limit");
        }

        Ok(MatchSummary {
            seed: self.controller.config().seed,
            outcome,
            ticks: self.controller.tick_count(),
            health: self.controller.health(),
            layout_applied,
            stats: *self.controller.stats(),
            hash: self.controller.state_hash(),
        })
    }
}

/// Result of one unattended match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Seed the board was built with.
    pub seed: u64,
    /// How the match ended, `None` if it hit the tick limit.
    pub outcome: Option<MatchOutcome>,
    /// Ticks simulated.
    pub ticks: u64,
    /// Player health at the end.
    pub health: u32,
    /// Layout placements the board accepted.
    pub layout_applied: usize,
    /// Match tallies.
    pub stats: MatchStats,
    /// Final state hash.
    pub hash: u64,
}

/// Build a runner for `config` and play one match.
pub fn simulate_match(config: GameConfig, max_ticks: u64) -> Result<MatchSummary, GameError> {
    HeadlessRunner::new(config)?.simulate(max_ticks)
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::board::TileContent;
    use td_core::game::MatchPhase;

    fn session(config: GameConfig, input: &str) -> Vec<serde_json::Value> {
        let mut runner = HeadlessRunner::new(config).unwrap();
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_ready_then_bye() {
        let lines = session(GameConfig::default(), "{\"cmd\":\"quit\"}\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[0]["version"], "1.0");
        assert_eq!(lines[1]["type"], "bye");
    }

    #[test]
    fn test_end_of_input_says_bye() {
        let lines = session(GameConfig::default(), "\n{\"cmd\":\"query\"}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["type"], "state");
        assert_eq!(lines[1]["phase"], "idle");
        assert_eq!(lines[2]["type"], "bye");
    }

    #[test]
    fn test_parse_error_keeps_running() {
        let lines = session(
            GameConfig::default(),
            "not json\n{\"cmd\":\"query\"}\n{\"cmd\":\"quit\"}\n",
        );
        assert_eq!(lines[1]["type"], "error");
        assert!(lines[1]["message"]
            .as_str()
            .unwrap()
            .starts_with("Parse error"));
        assert_eq!(lines[2]["type"], "state");
        assert_eq!(lines[3]["type"], "bye");
    }

    #[test]
    fn test_place_before_new_game_is_locked() {
        let mut runner = HeadlessRunner::new(GameConfig::default()).unwrap();
        let responses = runner.execute(Command::Place {
            x: 3,
            y: 3,
            content: TileContent::Mortar,
        });
        assert!(matches!(
            &responses[..],
            [Response::Error { cmd: Some(cmd), .. }] if cmd == "place"
        ));
    }

    #[test]
    fn test_new_game_opens_preparation() {
        let mut runner = HeadlessRunner::new(GameConfig::default()).unwrap();
        assert_eq!(runner.execute(Command::NewGame), vec![Response::ack("new_game")]);

        let responses = runner.execute(Command::Tick { count: 1 });
        let Some(Response::State(state)) = responses.last() else {
            panic!("tick should end with a state line");
        };
        assert_eq!(state.phase, MatchPhase::Preparing);
        assert!(state.building_enabled);
        assert!(state.preparation_remaining.is_some());
        assert_eq!(state.health, 20);
    }

    #[test]
    fn test_answer_without_result_is_an_error() {
        let mut runner = HeadlessRunner::new(GameConfig::default()).unwrap();
        for command in [Command::PlayAgain, Command::Exit] {
            let responses = runner.execute(command);
            assert!(matches!(&responses[..], [Response::Error { .. }]));
        }
    }

    #[test]
    fn test_pause_reported_in_state() {
        let mut runner = HeadlessRunner::new(GameConfig::default()).unwrap();
        runner.execute(Command::Pause);
        assert!(runner.state().paused);
        runner.execute(Command::Resume);
        assert!(!runner.state().paused);
    }

    #[test]
    fn test_auto_state_emits_every_tick() {
        let mut runner = HeadlessRunner::with_config(
            GameConfig::default(),
            HeadlessConfig {
                auto_state_output: true,
            },
        )
        .unwrap();
        let responses = runner.execute(Command::Tick { count: 3 });
        assert_eq!(responses.len(), 3);
        assert!(responses
            .iter()
            .all(|response| matches!(response, Response::State(_))));
    }

    #[test]
    fn test_simulate_resumes_a_paused_runner() {
        let mut runner = HeadlessRunner::new(GameConfig::default()).unwrap();
        runner.execute(Command::Pause);
        assert!(runner.state().paused);

        let summary = runner.simulate(20_000).unwrap();
        assert_eq!(summary.outcome, Some(MatchOutcome::Victory));
        assert_eq!(summary.health, 5);
        assert!(!runner.state().paused);
    }

    #[test]
    fn test_simulate_default_config_finishes() {
        // Fifteen undefended enemies against twenty health.
        let summary = simulate_match(GameConfig::default(), 20_000).unwrap();
        assert_eq!(summary.outcome, Some(MatchOutcome::Victory));
        assert_eq!(summary.layout_applied, 0);
        assert_eq!(summary.stats.enemies_spawned, 15);
        assert_eq!(summary.stats.enemies_arrived, 15);
        assert_eq!(summary.health, 5);
    }
}
