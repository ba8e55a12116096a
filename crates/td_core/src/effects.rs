//! Short-lived war effects: mortar shells and explosions.
//!
//! Effects requested during a collection pass are parked in an
//! [`EffectBuffer`] and join the effect collection after the pass, so a
//! spawn never invalidates an iteration in progress.

use crate::behavior::{GameBehavior, TickContext, UpdateStatus};
use crate::collection::EntityCollection;
use crate::error::Result;
use crate::math::{Fixed, Vec2Fixed};

/// How long an explosion stays visible, in seconds.
pub const EXPLOSION_DURATION: Fixed = Fixed::from_bits(1 << 31); // 0.5

/// Shells and explosions spawned during the current pass.
#[derive(Debug, Clone, Default)]
pub struct EffectBuffer {
    shells: Vec<Shell>,
    explosions: Vec<Explosion>,
}

impl EffectBuffer {
    /// Reserve a new shell and hand it out for aiming.
    pub fn push_shell(&mut self) -> &mut Shell {
        let index = self.shells.len();
        self.shells.push(Shell::default());
        &mut self.shells[index]
    }

    /// Reserve a new explosion and hand it out for initialization.
    pub fn push_explosion(&mut self) -> &mut Explosion {
        let index = self.explosions.len();
        self.explosions.push(Explosion::default());
        &mut self.explosions[index]
    }

    /// True when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shells.is_empty() && self.explosions.is_empty()
    }

    /// Drop everything waiting.
    pub fn clear(&mut self) {
        self.shells.clear();
        self.explosions.clear();
    }

    /// Move everything waiting into `effects`, shells first.
    pub fn drain_into(&mut self, effects: &mut EntityCollection<Effect>) {
        for shell in self.shells.drain(..) {
            effects.add(Effect::Shell(shell));
        }
        for explosion in self.explosions.drain(..) {
            effects.add(Effect::Explosion(explosion));
        }
    }
}

/// A mortar shell in flight. Detonates on arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shell {
    launch: Vec2Fixed,
    target: Vec2Fixed,
    flight_time: Fixed,
    age: Fixed,
    blast_radius: Fixed,
    damage: Fixed,
    position: Vec2Fixed,
    altitude: Fixed,
}

impl Shell {
    /// Aim the shell.
    pub fn launch(
        &mut self,
        from: Vec2Fixed,
        to: Vec2Fixed,
        flight_time: Fixed,
        blast_radius: Fixed,
        damage: Fixed,
    ) {
        self.launch = from;
        self.target = to;
        self.flight_time = flight_time;
        self.age = Fixed::ZERO;
        self.blast_radius = blast_radius;
        self.damage = damage;
        self.position = from;
        self.altitude = Fixed::ZERO;
    }

    /// Ground position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Where the shell will come down.
    #[must_use]
    pub const fn target(&self) -> Vec2Fixed {
        self.target
    }

    /// Height above ground, peaking at 1 halfway through the flight.
    #[must_use]
    pub const fn altitude(&self) -> Fixed {
        self.altitude
    }
}

impl GameBehavior for Shell {
    fn game_update(&mut self, ctx: &mut TickContext<'_>) -> Result<UpdateStatus> {
        self.age = self.age.saturating_add(ctx.dt());
        if self.flight_time <= Fixed::ZERO || self.age >= self.flight_time {
            self.position = self.target;
            self.altitude = Fixed::ZERO;
            ctx.spawn_explosion(self.target, self.blast_radius, self.damage);
            return Ok(UpdateStatus::Finished);
        }

        let t = self.age / self.flight_time;
        self.position = self.launch.lerp(self.target, t);
        self.altitude = Fixed::from_num(4) * t * (Fixed::ONE - t);
        Ok(UpdateStatus::Alive)
    }
}

/// Visual remains of a detonation. Damage is dealt when it is spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Explosion {
    position: Vec2Fixed,
    blast_radius: Fixed,
    age: Fixed,
}

impl Explosion {
    /// Place the explosion.
    pub fn initialize(&mut self, position: Vec2Fixed, blast_radius: Fixed) {
        self.position = position;
        self.blast_radius = blast_radius;
        self.age = Fixed::ZERO;
    }

    /// Centre of the blast.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Radius of the blast.
    #[must_use]
    pub const fn blast_radius(&self) -> Fixed {
        self.blast_radius
    }
}

impl GameBehavior for Explosion {
    fn game_update(&mut self, ctx: &mut TickContext<'_>) -> Result<UpdateStatus> {
        self.age = self.age.saturating_add(ctx.dt());
        if self.age >= EXPLOSION_DURATION {
            Ok(UpdateStatus::Finished)
        } else {
            Ok(UpdateStatus::Alive)
        }
    }
}

/// Any entry of the effect collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Shell in flight.
    Shell(Shell),
    /// Explosion fading out.
    Explosion(Explosion),
}

impl GameBehavior for Effect {
    fn game_update(&mut self, ctx: &mut TickContext<'_>) -> Result<UpdateStatus> {
        match self {
            Self::Shell(shell) => shell.game_update(ctx),
            Self::Explosion(explosion) => explosion.game_update(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Unattended;
    use crate::enemy::{Enemy, EnemyKind, EnemyProfile};
    use crate::game::MatchStats;
    use crate::health::PlayerHealth;

    fn at(x: u32, y: u32) -> Vec2Fixed {
        Vec2Fixed::tile_center(x, y)
    }

    #[test]
    fn test_shell_flies_then_detonates_on_targets() {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        let mut buffer = EffectBuffer::default();
        let mut stats = MatchStats::default();
        let mut enemies = EntityCollection::new();
        let profile = EnemyProfile {
            health: Fixed::from_num(10),
            speed: Fixed::ONE,
        };
        let near = enemies.add(Enemy::new(EnemyKind::Small, profile).placed_at(at(4, 0)));
        let far = enemies.add(Enemy::new(EnemyKind::Small, profile).placed_at(at(9, 9)));

        let mut shell = Shell::default();
        shell.launch(
            at(0, 0),
            at(4, 0),
            Fixed::ONE,
            Fixed::ONE,
            Fixed::from_num(4),
        );

        let half = Fixed::from_num(0.5);
        let mut ctx = TickContext::new(
            half,
            &mut health,
            Some(&mut enemies),
            &mut buffer,
            &mut stats,
        );
        assert_eq!(shell.game_update(&mut ctx).unwrap(), UpdateStatus::Alive);
        assert_eq!(shell.position(), at(2, 0));
        assert_eq!(shell.altitude(), Fixed::ONE);

        assert_eq!(shell.game_update(&mut ctx).unwrap(), UpdateStatus::Finished);
        drop(ctx);

        assert_eq!(enemies.get(near).unwrap().health(), Fixed::from_num(6));
        assert_eq!(enemies.get(far).unwrap().health(), Fixed::from_num(10));

        let mut effects = EntityCollection::new();
        buffer.drain_into(&mut effects);
        assert!(buffer.is_empty());
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects.iter().next(), Some((_, Effect::Explosion(_)))));
    }

    #[test]
    fn test_explosion_expires() {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        let mut buffer = EffectBuffer::default();
        let mut stats = MatchStats::default();
        let mut ctx = TickContext::new(
            Fixed::from_num(0.25),
            &mut health,
            None,
            &mut buffer,
            &mut stats,
        );

        let mut explosion = Explosion::default();
        explosion.initialize(at(1, 1), Fixed::ONE);
        assert_eq!(explosion.game_update(&mut ctx).unwrap(), UpdateStatus::Alive);
        assert_eq!(
            explosion.game_update(&mut ctx).unwrap(),
            UpdateStatus::Finished
        );
    }

    #[test]
    fn test_buffer_drains_shells_before_explosions() {
        let mut buffer = EffectBuffer::default();
        buffer.push_explosion().initialize(at(1, 1), Fixed::ONE);
        buffer
            .push_shell()
            .launch(at(0, 0), at(1, 1), Fixed::ONE, Fixed::ONE, Fixed::ONE);

        let mut effects = EntityCollection::new();
        buffer.drain_into(&mut effects);
        let kinds: Vec<bool> = effects
            .iter()
            .map(|(_, effect)| matches!(effect, Effect::Shell(_)))
            .collect();
        assert_eq!(kinds, vec![true, false]);
    }
}
