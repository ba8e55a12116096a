//! Player health.

use crate::collaborators::HealthDisplay;

/// The player's remaining health.
///
/// Every assignment, including one clamped at zero, is reported to the
/// health display before the setter returns.
pub struct PlayerHealth {
    current: u32,
    display: Box<dyn HealthDisplay>,
}

impl PlayerHealth {
    /// Create health at zero bound to a display. Nothing is reported until
    /// the first assignment.
    #[must_use]
    pub fn new(display: Box<dyn HealthDisplay>) -> Self {
        Self {
            current: 0,
            display,
        }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// True once health has run out.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Assign health and notify the display.
    pub fn set(&mut self, value: u32) {
        self.current = value;
        self.display.health_changed(value);
    }

    /// Lose `amount` health, stopping at zero.
    pub fn decrement(&mut self, amount: u32) {
        self.set(self.current.saturating_sub(amount));
    }
}

impl std::fmt::Debug for PlayerHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHealth")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<u32>>>);

    impl HealthDisplay for Recorder {
        fn health_changed(&mut self, health: u32) {
            self.0.borrow_mut().push(health);
        }
    }

    #[test]
    fn test_decrement_clamps_and_still_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut health = PlayerHealth::new(Box::new(Recorder(Rc::clone(&seen))));

        health.set(2);
        health.decrement(1);
        health.decrement(1);
        health.decrement(1);

        assert_eq!(health.current(), 0);
        assert!(health.is_depleted());
        assert_eq!(*seen.borrow(), vec![2, 1, 0, 0]);
    }

    #[test]
    fn test_large_decrement_stops_at_zero() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut health = PlayerHealth::new(Box::new(Recorder(Rc::clone(&seen))));
        health.set(5);
        health.decrement(50);
        assert_eq!(health.current(), 0);
        assert_eq!(seen.borrow().last(), Some(&0));
    }
}
