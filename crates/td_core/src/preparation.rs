//! The cancellable preparation countdown before combat.
//!
//! A preparation is a small poll-based state machine resumed once per tick
//! with the simulated time that passed. It resolves three ways:
//!
//! - `Ready(Ok(true))`: the countdown ran out or the player skipped it,
//!   so the scenario should start.
//! - `Ready(Ok(false))`: the player declined, nothing starts.
//! - `Ready(Err(Cancelled))`: someone cancelled it (usually a new game
//!   replacing it). Callers treat this as a normal, silent outcome.
//!
//! [`PreparationScope`] keeps at most one preparation alive: starting a new
//! one cancels and drops the previous one in the same call.

use std::cell::Cell;
use std::rc::Rc;
use std::task::Poll;

use thiserror::Error;

use crate::math::Fixed;

/// The preparation was cancelled before it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("preparation cancelled")]
pub struct Cancelled;

/// Shared cancellation flag.
///
/// Clones observe the same flag. Cancelling more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// One preparation countdown.
#[derive(Debug)]
pub struct Preparation {
    duration: Fixed,
    elapsed: Fixed,
    token: CancelToken,
    decision: Option<bool>,
}

impl Preparation {
    /// Count down `duration` simulated seconds.
    #[must_use]
    pub fn new(duration: Fixed) -> Self {
        Self {
            duration,
            elapsed: Fixed::ZERO,
            token: CancelToken::new(),
            decision: None,
        }
    }

    /// Resume with `dt` more seconds elapsed.
    ///
    /// Cancellation wins over a pending decision, which wins over the clock.
    pub fn poll(&mut self, dt: Fixed) -> Poll<Result<bool, Cancelled>> {
        if self.token.is_cancelled() {
            return Poll::Ready(Err(Cancelled));
        }
        if let Some(start) = self.decision {
            return Poll::Ready(Ok(start));
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.duration {
            Poll::Ready(Ok(true))
        } else {
            Poll::Pending
        }
    }

    /// Finish early and start combat on the next poll.
    pub fn skip(&mut self) {
        self.decision.get_or_insert(true);
    }

    /// Finish without starting combat on the next poll.
    pub fn decline(&mut self) {
        self.decision.get_or_insert(false);
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub fn remaining(&self) -> Fixed {
        self.duration.saturating_sub(self.elapsed).max(Fixed::ZERO)
    }

    /// Token that cancels this preparation.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

/// Owner of the single outstanding preparation.
#[derive(Debug, Default)]
pub struct PreparationScope {
    active: Option<Preparation>,
}

impl PreparationScope {
    /// Create a scope with nothing outstanding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any outstanding preparation and start a new one.
    ///
    /// Returns `Some(Cancelled)` if a previous preparation was cut short.
    pub fn begin(&mut self, duration: Fixed) -> Option<Cancelled> {
        let replaced = self.cancel();
        self.active = Some(Preparation::new(duration));
        replaced
    }

    /// Cancel and drop the outstanding preparation, if any.
    pub fn cancel(&mut self) -> Option<Cancelled> {
        let previous = self.active.take()?;
        previous.token.cancel();
        Some(Cancelled)
    }

    /// Resume the outstanding preparation.
    ///
    /// `Pending` when nothing is outstanding. Once resolved the preparation
    /// is dropped.
    pub fn poll(&mut self, dt: Fixed) -> Poll<Result<bool, Cancelled>> {
        let Some(preparation) = self.active.as_mut() else {
            return Poll::Pending;
        };
        let outcome = preparation.poll(dt);
        if outcome.is_ready() {
            self.active = None;
        }
        outcome
    }

    /// Whether a preparation is outstanding.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The outstanding preparation.
    #[must_use]
    pub const fn active(&self) -> Option<&Preparation> {
        self.active.as_ref()
    }

    /// The outstanding preparation, for skipping or declining.
    pub fn active_mut(&mut self) -> Option<&mut Preparation> {
        self.active.as_mut()
    }

    /// Token of the outstanding preparation.
    #[must_use]
    pub fn token(&self) -> Option<CancelToken> {
        self.active.as_ref().map(Preparation::token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    #[test]
    fn test_countdown_completes_with_true() {
        let mut preparation = Preparation::new(secs(1.0));
        assert!(preparation.poll(secs(0.5)).is_pending());
        assert_eq!(preparation.remaining(), secs(0.5));
        assert_eq!(preparation.poll(secs(0.5)), Poll::Ready(Ok(true)));
    }

    #[test]
    fn test_zero_duration_completes_on_first_poll() {
        let mut preparation = Preparation::new(Fixed::ZERO);
        assert_eq!(preparation.poll(Fixed::ZERO), Poll::Ready(Ok(true)));
    }

    #[test]
    fn test_skip_and_decline() {
        let mut skipped = Preparation::new(secs(10.0));
        skipped.skip();
        skipped.decline();
        assert_eq!(skipped.poll(Fixed::ZERO), Poll::Ready(Ok(true)));

        let mut declined = Preparation::new(secs(10.0));
        declined.decline();
        assert_eq!(declined.poll(secs(20.0)), Poll::Ready(Ok(false)));
    }

    #[test]
    fn test_cancel_beats_everything_and_is_idempotent() {
        let mut preparation = Preparation::new(secs(1.0));
        preparation.skip();
        let token = preparation.token();
        token.cancel();
        token.cancel();
        assert_eq!(preparation.poll(secs(5.0)), Poll::Ready(Err(Cancelled)));
        assert_eq!(preparation.poll(secs(5.0)), Poll::Ready(Err(Cancelled)));
    }

    #[test]
    fn test_scope_begin_replaces_and_cancels_once() {
        let mut scope = PreparationScope::new();
        assert_eq!(scope.begin(secs(3.0)), None);
        let first = scope.token().unwrap();

        assert_eq!(scope.begin(secs(3.0)), Some(Cancelled));
        assert!(first.is_cancelled());
        assert!(!scope.token().unwrap().is_cancelled());
        assert!(scope.is_active());
    }

    #[test]
    fn test_scope_drops_resolved_preparation() {
        let mut scope = PreparationScope::new();
        assert!(scope.poll(secs(1.0)).is_pending());

        scope.begin(secs(0.5));
        assert_eq!(scope.poll(secs(1.0)), Poll::Ready(Ok(true)));
        assert!(!scope.is_active());
        assert_eq!(scope.cancel(), None);
    }
}
