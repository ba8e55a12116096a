//! Global pause broadcast.
//!
//! The coordinator owns the paused flag and tells every registered listener
//! when it changes. Listeners drain their notifications at a tick boundary,
//! so a pause never lands in the middle of an update pass.

use std::sync::mpsc::{channel, Receiver, Sender};

/// Owner of the paused flag.
#[derive(Debug, Default)]
pub struct PauseCoordinator {
    paused: bool,
    listeners: Vec<Sender<bool>>,
}

impl PauseCoordinator {
    /// Unpaused coordinator with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for pause changes. The listener starts from the current state.
    pub fn register(&mut self) -> PauseListener {
        let (sender, receiver) = channel();
        self.listeners.push(sender);
        PauseListener {
            receiver,
            paused: self.paused,
        }
    }

    /// Whether the game is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the flag and notify every listener still alive.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        tracing::info!(paused, "Pause changed");
        self.listeners
            .retain(|listener| listener.send(paused).is_ok());
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Receiving end of the pause broadcast.
#[derive(Debug)]
pub struct PauseListener {
    receiver: Receiver<bool>,
    paused: bool,
}

impl PauseListener {
    /// Drain pending notifications. Returns the new state if it changed.
    pub fn poll(&mut self) -> Option<bool> {
        let before = self.paused;
        while let Ok(paused) = self.receiver.try_recv() {
            self.paused = paused;
        }
        (self.paused != before).then_some(self.paused)
    }

    /// Last state seen by [`poll`](Self::poll).
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_sees_latest_state() {
        let mut coordinator = PauseCoordinator::new();
        let mut listener = coordinator.register();
        assert_eq!(listener.poll(), None);

        coordinator.set_paused(true);
        assert_eq!(listener.poll(), Some(true));
        assert!(listener.is_paused());
        assert_eq!(listener.poll(), None);

        coordinator.set_paused(false);
        coordinator.set_paused(true);
        coordinator.set_paused(false);
        assert_eq!(listener.poll(), None);
        assert!(!listener.is_paused());
    }

    #[test]
    fn test_late_listener_starts_paused() {
        let mut coordinator = PauseCoordinator::new();
        coordinator.set_paused(true);
        let listener = coordinator.register();
        assert!(listener.is_paused());
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let mut coordinator = PauseCoordinator::new();
        let kept = coordinator.register();
        drop(coordinator.register());
        assert_eq!(coordinator.listener_count(), 2);

        coordinator.set_paused(true);
        assert_eq!(coordinator.listener_count(), 1);
        drop(kept);
    }
}
