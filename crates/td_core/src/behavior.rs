//! Per-tick behaviour shared by every simulated actor.
//!
//! Entities never reach the active match through a global. Each update is
//! handed a [`TickContext`] that borrows exactly the parts of the match the
//! entity group may touch this tick: the player's health, the effect spawn
//! buffer, the running tallies and, for groups updated after the enemies,
//! the enemy collection itself as a target set.

use crate::collection::EntityCollection;
use crate::effects::{EffectBuffer, Explosion, Shell};
use crate::enemy::Enemy;
use crate::error::Result;
use crate::game::MatchStats;
use crate::health::PlayerHealth;
use crate::math::{Fixed, Vec2Fixed};

/// Outcome of a single entity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Entity stays in its collection.
    Alive,
    /// Entity is done (destroyed, expired, arrived) and leaves its collection.
    Finished,
}

/// Anything that advances once per simulation tick.
pub trait GameBehavior {
    /// Advance this entity by one tick.
    ///
    /// Returning an error removes the entity without affecting the rest of
    /// its collection.
    fn game_update(&mut self, ctx: &mut TickContext<'_>) -> Result<UpdateStatus>;
}

/// Handle to the active match for the duration of one collection update.
pub struct TickContext<'a> {
    dt: Fixed,
    health: &'a mut PlayerHealth,
    targets: Option<&'a mut EntityCollection<Enemy>>,
    effects: &'a mut EffectBuffer,
    stats: &'a mut MatchStats,
}

impl<'a> TickContext<'a> {
    /// Create a context for one collection pass.
    pub fn new(
        dt: Fixed,
        health: &'a mut PlayerHealth,
        targets: Option<&'a mut EntityCollection<Enemy>>,
        effects: &'a mut EffectBuffer,
        stats: &'a mut MatchStats,
    ) -> Self {
        Self {
            dt,
            health,
            targets,
            effects,
            stats,
        }
    }

    /// Simulated seconds covered by this tick.
    #[must_use]
    pub fn dt(&self) -> Fixed {
        self.dt
    }

    /// Current player health.
    #[must_use]
    pub fn player_health(&self) -> u32 {
        self.health.current()
    }

    /// An enemy got through: the player loses one point of health.
    pub fn enemy_reached_destination(&mut self) {
        self.health.decrement(1);
        self.stats.enemies_arrived += 1;
    }

    /// An enemy was destroyed by the defenses.
    pub fn record_kill(&mut self) {
        self.stats.enemies_killed += 1;
    }

    /// Enemies visible to this pass, if the pass runs after the enemy update.
    #[must_use]
    pub fn targets(&self) -> Option<&EntityCollection<Enemy>> {
        self.targets.as_deref()
    }

    /// Mutable access to the enemies, for damage.
    pub fn targets_mut(&mut self) -> Option<&mut EntityCollection<Enemy>> {
        self.targets.as_deref_mut()
    }

    /// Obtain a fresh shell for the caller to aim.
    ///
    /// The shell joins the effect collection once the current pass is over.
    pub fn spawn_shell(&mut self) -> &mut Shell {
        self.effects.push_shell()
    }

    /// Detonate at `position`, damaging every target within `blast_radius`.
    ///
    /// Damage lands immediately; the explosion itself joins the effect
    /// collection once the current pass is over.
    pub fn spawn_explosion(
        &mut self,
        position: Vec2Fixed,
        blast_radius: Fixed,
        damage: Fixed,
    ) -> &mut Explosion {
        if let Some(targets) = self.targets.as_deref_mut() {
            let radius_sq = blast_radius.saturating_mul(blast_radius);
            for (_, enemy) in targets.iter_mut() {
                if enemy.position().distance_squared(position) <= radius_sq {
                    enemy.apply_damage(damage);
                }
            }
        }
        let explosion = self.effects.push_explosion();
        explosion.initialize(position, blast_radius);
        explosion
    }
}

impl std::fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickContext")
            .field("dt", &self.dt)
            .field("health", &self.health.current())
            .field("has_targets", &self.targets.is_some())
            .finish_non_exhaustive()
    }
}
