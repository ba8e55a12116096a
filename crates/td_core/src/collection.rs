//! Entity collections updated once per tick.
//!
//! A collection owns its entities in insertion order. Each tick every live
//! entity is visited exactly once; entities that finish (or fail) during the
//! pass are recorded in a pending-removal buffer and compacted out in one
//! sweep after the pass, so removals never disturb the iteration.

use crate::behavior::{GameBehavior, TickContext, UpdateStatus};

/// Identifier assigned to an entity when it joins a collection.
pub type EntityId = u32;

/// Counts from one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Entities whose update ran.
    pub visited: u32,
    /// Entities that reported they were finished.
    pub finished: u32,
    /// Entities removed because their update failed.
    pub failed: u32,
}

/// Unordered group of per-tick entities with a shared pause flag.
#[derive(Debug, Clone)]
pub struct EntityCollection<T> {
    entities: Vec<(EntityId, T)>,
    next_id: EntityId,
    paused: bool,
    pending_removals: Vec<usize>,
}

impl<T> EntityCollection<T> {
    /// Create an empty, unpaused collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
            paused: false,
            pending_removals: Vec::new(),
        }
    }

    /// Add an entity and return the id it was given.
    ///
    /// No duplicate detection is performed.
    pub fn add(&mut self, entity: T) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.entities.push((id, entity));
        id
    }

    /// Drop every entity immediately, without finishing them.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_removals.clear();
    }

    /// True when no live entities remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Set or clear the pause flag. Entities are left untouched.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Whether updates are currently suppressed.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities
            .iter()
            .find(|(entity_id, _)| *entity_id == id)
            .map(|(_, entity)| entity)
    }

    /// Iterate over live entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    /// Iterate mutably over live entities in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter_mut().map(|(id, entity)| (*id, entity))
    }
}

impl<T: GameBehavior> EntityCollection<T> {
    /// Run one update pass.
    ///
    /// A paused collection returns at once without visiting anything.
    pub fn game_update(&mut self, ctx: &mut TickContext<'_>) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        if self.paused {
            return summary;
        }

        for (index, (id, entity)) in self.entities.iter_mut().enumerate() {
            summary.visited += 1;
            match entity.game_update(ctx) {
                Ok(UpdateStatus::Alive) => {}
                Ok(UpdateStatus::Finished) => {
                    summary.finished += 1;
                    self.pending_removals.push(index);
                }
                Err(error) => {
                    tracing::warn!(entity = *id, %error, "Entity update failed, removing it");
                    summary.failed += 1;
                    self.pending_removals.push(index);
                }
            }
        }

        if !self.pending_removals.is_empty() {
            // Indices were pushed in ascending order.
            let mut pending = self.pending_removals.iter().peekable();
            let mut index = 0;
            self.entities.retain(|_| {
                let removed = pending.next_if(|&&pending_index| pending_index == index).is_some();
                index += 1;
                !removed
            });
            self.pending_removals.clear();
        }

        summary
    }
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}
