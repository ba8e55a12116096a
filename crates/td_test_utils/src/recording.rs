//! Collaborators that record every call for later assertions.
//!
//! All collaborators built from one [`Recorder`] share a single log, so a
//! test can hand them to a controller and still inspect what happened.

use std::cell::RefCell;
use std::rc::Rc;
use std::task::Poll;

use td_core::collaborators::{
    Builder, Collaborators, HealthDisplay, ResultPresenter, SceneLoader, WaveDisplay,
};
use td_core::command::ResultChoices;
use td_core::game::MatchOutcome;
use td_core::scenario::WaveSnapshot;

/// Scene loader call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCall {
    /// `poll_unload` returned pending.
    UnloadPending(String),
    /// `poll_unload` returned ready.
    Unloaded(String),
    /// `poll_load` returned pending.
    LoadPending(String),
    /// `poll_load` returned ready.
    Loaded(String),
}

/// Everything the collaborators were told.
#[derive(Debug, Default)]
pub struct Recorded {
    /// Every health assignment.
    pub health: Vec<u32>,
    /// Every wave snapshot.
    pub waves: Vec<WaveSnapshot>,
    /// Every presented outcome.
    pub outcomes: Vec<MatchOutcome>,
    /// Choices handed to the result dialog, latest last.
    pub choices: Vec<ResultChoices>,
    /// Builder state after the latest call.
    pub builder_enabled: bool,
    /// Number of `enable` calls.
    pub builder_enables: u32,
    /// Number of `disable` calls.
    pub builder_disables: u32,
    /// Scene loader calls.
    pub scenes: Vec<SceneCall>,
}

/// Shared log plus settings for the collaborators it builds.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Recorded>>,
    scene_delay: u32,
}

impl Recorder {
    /// Recorder whose scene loads finish on the first poll.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every scene unload and load take `polls` pending polls first.
    #[must_use]
    pub fn with_scene_delay(mut self, polls: u32) -> Self {
        self.scene_delay = polls;
        self
    }

    /// Collaborators that all write to this recorder.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            health: Box::new(self.clone()),
            waves: Box::new(self.clone()),
            results: Box::new(self.clone()),
            builder: Box::new(self.clone()),
            scenes: Box::new(RecordingScenes {
                log: Rc::clone(&self.log),
                delay: self.scene_delay,
                waited: 0,
            }),
        }
    }

    /// Read the log.
    ///
    /// # Panics
    ///
    /// Panics if the log is already mutably borrowed.
    pub fn with<R>(&self, read: impl FnOnce(&Recorded) -> R) -> R {
        read(&self.log.borrow())
    }

    /// Every health assignment so far.
    #[must_use]
    pub fn health(&self) -> Vec<u32> {
        self.with(|log| log.health.clone())
    }

    /// Every presented outcome so far.
    #[must_use]
    pub fn outcomes(&self) -> Vec<MatchOutcome> {
        self.with(|log| log.outcomes.clone())
    }

    /// The most recent result choices.
    #[must_use]
    pub fn last_choices(&self) -> Option<ResultChoices> {
        self.with(|log| log.choices.last().cloned())
    }

    /// Scene loader calls so far.
    #[must_use]
    pub fn scenes(&self) -> Vec<SceneCall> {
        self.with(|log| log.scenes.clone())
    }

    /// Builder state.
    #[must_use]
    pub fn builder_enabled(&self) -> bool {
        self.with(|log| log.builder_enabled)
    }
}

impl HealthDisplay for Recorder {
    fn health_changed(&mut self, health: u32) {
        self.log.borrow_mut().health.push(health);
    }
}

impl WaveDisplay for Recorder {
    fn waves_changed(&mut self, waves: WaveSnapshot) {
        self.log.borrow_mut().waves.push(waves);
    }
}

impl ResultPresenter for Recorder {
    fn present(&mut self, outcome: MatchOutcome, choices: ResultChoices) {
        let mut log = self.log.borrow_mut();
        log.outcomes.push(outcome);
        log.choices.push(choices);
    }
}

impl Builder for Recorder {
    fn enable(&mut self) {
        let mut log = self.log.borrow_mut();
        log.builder_enabled = true;
        log.builder_enables += 1;
    }

    fn disable(&mut self) {
        let mut log = self.log.borrow_mut();
        log.builder_enabled = false;
        log.builder_disables += 1;
    }
}

/// Scene loader that stays pending for a fixed number of polls per step.
struct RecordingScenes {
    log: Rc<RefCell<Recorded>>,
    delay: u32,
    waited: u32,
}

impl RecordingScenes {
    fn step(&mut self) -> Poll<()> {
        if self.waited < self.delay {
            self.waited += 1;
            Poll::Pending
        } else {
            self.waited = 0;
            Poll::Ready(())
        }
    }
}

impl SceneLoader for RecordingScenes {
    fn poll_unload(&mut self, scene: &str) -> Poll<()> {
        let poll = self.step();
        let call = if poll.is_ready() {
            SceneCall::Unloaded(scene.to_string())
        } else {
            SceneCall::UnloadPending(scene.to_string())
        };
        self.log.borrow_mut().scenes.push(call);
        poll
    }

    fn poll_load(&mut self, scene: &str) -> Poll<()> {
        let poll = self.step();
        let call = if poll.is_ready() {
            SceneCall::Loaded(scene.to_string())
        } else {
            SceneCall::LoadPending(scene.to_string())
        };
        self.log.borrow_mut().scenes.push(call);
        poll
    }
}
