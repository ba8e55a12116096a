//! Commands queued into the active match from outside the tick.
//!
//! Input handlers and the result dialog hold a [`MatchHandle`] instead of
//! reaching for a global match instance. Commands are drained at the start
//! of the next tick.

use std::sync::mpsc::Sender;

use crate::game::MatchOutcome;

/// Requests the match controller handles at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCommand {
    /// Run the new game sequence (restart key, "play again").
    NewGame,
    /// Leave the match for the menu.
    ExitToMenu,
    /// End the preparation countdown now and start combat.
    SkipPreparation,
    /// Abandon the preparation without starting combat.
    DeclinePreparation,
}

/// Cloneable sender of [`MatchCommand`]s to one match.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    sender: Sender<MatchCommand>,
}

impl MatchHandle {
    pub(crate) fn new(sender: Sender<MatchCommand>) -> Self {
        Self { sender }
    }

    /// Queue a command. Returns false if the match no longer exists.
    pub fn send(&self, command: MatchCommand) -> bool {
        if self.sender.send(command).is_err() {
            tracing::debug!(?command, "Match is gone, command dropped");
            return false;
        }
        true
    }

    /// Queue the new game sequence.
    pub fn new_game(&self) -> bool {
        self.send(MatchCommand::NewGame)
    }

    /// Queue the exit-to-menu sequence.
    pub fn exit_to_menu(&self) -> bool {
        self.send(MatchCommand::ExitToMenu)
    }

    /// Queue ending the preparation early.
    pub fn skip_preparation(&self) -> bool {
        self.send(MatchCommand::SkipPreparation)
    }

    /// Queue declining the preparation.
    pub fn decline_preparation(&self) -> bool {
        self.send(MatchCommand::DeclinePreparation)
    }
}

/// The two callbacks offered by the result dialog.
#[derive(Debug, Clone)]
pub struct ResultChoices {
    outcome: MatchOutcome,
    handle: MatchHandle,
}

impl ResultChoices {
    pub(crate) fn new(outcome: MatchOutcome, handle: MatchHandle) -> Self {
        Self { outcome, handle }
    }

    /// Outcome being presented.
    #[must_use]
    pub const fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    /// "Play again": run the new game sequence.
    pub fn play_again(&self) -> bool {
        self.handle.new_game()
    }

    /// "Exit": leave for the menu.
    pub fn exit(&self) -> bool {
        self.handle.exit_to_menu()
    }
}
