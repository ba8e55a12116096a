//! Headless stand-ins for the match UI.
//!
//! The match talks to its UI through the collaborator traits. Headless, those
//! calls land in one shared [`HudState`] the runner reads back when it builds
//! protocol responses.

use std::cell::RefCell;
use std::rc::Rc;

use td_core::collaborators::{
    Builder, Collaborators, HealthDisplay, ResultPresenter, Unattended, WaveDisplay,
};
use td_core::command::ResultChoices;
use td_core::game::MatchOutcome;
use td_core::scenario::WaveSnapshot;

/// What a player would currently see on screen.
#[derive(Debug, Default)]
pub struct HudState {
    /// Health counter.
    pub health: Option<u32>,
    /// Wave counter.
    pub waves: Option<WaveSnapshot>,
    /// Result dialog, if one is open.
    pub result: Option<ResultChoices>,
    /// Outcomes presented so far, oldest first.
    pub outcomes: Vec<MatchOutcome>,
    /// Whether the build tools are usable.
    pub building_enabled: bool,
}

/// Shared handle to a [`HudState`].
#[derive(Debug, Clone, Default)]
pub struct Hud {
    state: Rc<RefCell<HudState>>,
}

impl Hud {
    /// Create an empty HUD.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collaborators writing to this HUD. Scene loads finish immediately.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            health: Box::new(self.clone()),
            waves: Box::new(self.clone()),
            results: Box::new(self.clone()),
            builder: Box::new(self.clone()),
            scenes: Box::new(Unattended),
        }
    }

    /// Close the result dialog, returning its choices.
    pub fn take_result(&self) -> Option<ResultChoices> {
        self.state.borrow_mut().result.take()
    }

    /// Whether a result dialog is open.
    pub fn has_result(&self) -> bool {
        self.state.borrow().result.is_some()
    }

    /// Outcomes presented so far.
    pub fn outcomes(&self) -> Vec<MatchOutcome> {
        self.state.borrow().outcomes.clone()
    }

    /// Current wave counter.
    pub fn waves(&self) -> Option<WaveSnapshot> {
        self.state.borrow().waves
    }

    /// Whether the build tools are usable.
    pub fn building_enabled(&self) -> bool {
        self.state.borrow().building_enabled
    }
}

impl HealthDisplay for Hud {
    fn health_changed(&mut self, health: u32) {
        self.state.borrow_mut().health = Some(health);
    }
}

impl WaveDisplay for Hud {
    fn waves_changed(&mut self, waves: WaveSnapshot) {
        self.state.borrow_mut().waves = Some(waves);
    }
}

impl ResultPresenter for Hud {
    fn present(&mut self, outcome: MatchOutcome, choices: ResultChoices) {
        let mut state = self.state.borrow_mut();
        state.outcomes.push(outcome);
        state.result = Some(choices);
    }
}

impl Builder for Hud {
    fn enable(&mut self) {
        self.state.borrow_mut().building_enabled = true;
    }

    fn disable(&mut self) {
        self.state.borrow_mut().building_enabled = false;
    }
}
