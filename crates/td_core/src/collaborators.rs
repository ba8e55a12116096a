//! Narrow interfaces to everything the match loop drives but does not own.
//!
//! HUD widgets, the result dialog, the placement UI and scene loading all
//! live outside the core. The match controller talks to them only through
//! these traits.

use std::task::Poll;

use crate::command::ResultChoices;
use crate::game::MatchOutcome;
use crate::scenario::WaveSnapshot;

/// Receives every player health assignment.
pub trait HealthDisplay {
    /// Health was assigned (possibly to the same value).
    fn health_changed(&mut self, health: u32);
}

/// Receives the wave counter while a scenario runs.
pub trait WaveDisplay {
    /// Current wave snapshot, published once per tick while in progress.
    fn waves_changed(&mut self, waves: WaveSnapshot);
}

/// Shows the end-of-match dialog.
pub trait ResultPresenter {
    /// Present the outcome. `choices` queues "play again" or "exit" back to
    /// the match when the player picks one.
    fn present(&mut self, outcome: MatchOutcome, choices: ResultChoices);
}

/// Placement / building UI.
pub trait Builder {
    /// Allow the player to place defenses.
    fn enable(&mut self);
    /// Lock placement.
    fn disable(&mut self);
}

/// Scene resource loading, driven by polling from the tick loop.
///
/// Each method is called once per tick until it returns `Poll::Ready`.
pub trait SceneLoader {
    /// Unload the named scene's resources.
    fn poll_unload(&mut self, scene: &str) -> Poll<()>;
    /// Load the named scene.
    fn poll_load(&mut self, scene: &str) -> Poll<()>;
}

/// Everything the match controller reports to.
pub struct Collaborators {
    /// Health widget.
    pub health: Box<dyn HealthDisplay>,
    /// Wave counter widget.
    pub waves: Box<dyn WaveDisplay>,
    /// Result dialog.
    pub results: Box<dyn ResultPresenter>,
    /// Placement UI.
    pub builder: Box<dyn Builder>,
    /// Scene loader used by the exit-to-menu sequence.
    pub scenes: Box<dyn SceneLoader>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            health: Box::new(Unattended),
            waves: Box::new(Unattended),
            results: Box::new(Unattended),
            builder: Box::new(Unattended),
            scenes: Box::new(Unattended),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Collaborator that nobody is watching: logs and completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl HealthDisplay for Unattended {
    fn health_changed(&mut self, health: u32) {
        tracing::trace!(health, "Health changed");
    }
}

impl WaveDisplay for Unattended {
    fn waves_changed(&mut self, waves: WaveSnapshot) {
        tracing::trace!(current = waves.current, total = waves.total, "Waves");
    }
}

impl ResultPresenter for Unattended {
    fn present(&mut self, outcome: MatchOutcome, _choices: ResultChoices) {
        tracing::debug!(?outcome, "Result presented with no one to choose");
    }
}

impl Builder for Unattended {
    fn enable(&mut self) {}

    fn disable(&mut self) {}
}

impl SceneLoader for Unattended {
    fn poll_unload(&mut self, _scene: &str) -> Poll<()> {
        Poll::Ready(())
    }

    fn poll_load(&mut self, _scene: &str) -> Poll<()> {
        Poll::Ready(())
    }
}
