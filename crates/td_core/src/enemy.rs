//! Enemies and the factory that makes them.

use serde::{Deserialize, Serialize};

use crate::behavior::{GameBehavior, TickContext, UpdateStatus};
use crate::board::{Board, Route, TileCoord};
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed, Vec2Fixed};

/// Enemy archetypes a spawn sequence can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Fast and fragile.
    Small,
    /// Middle of the road.
    Medium,
    /// Slow and tough.
    Large,
}

/// Stats for one enemy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyProfile {
    /// Starting health.
    #[serde(with = "fixed_decimal")]
    pub health: Fixed,
    /// Tiles per second.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,
}

impl EnemyProfile {
    fn from_parts(health: i32, speed: Fixed) -> Self {
        Self {
            health: Fixed::from_num(health),
            speed,
        }
    }
}

/// Stats for every enemy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyProfiles {
    /// [`EnemyKind::Small`] stats.
    pub small: EnemyProfile,
    /// [`EnemyKind::Medium`] stats.
    pub medium: EnemyProfile,
    /// [`EnemyKind::Large`] stats.
    pub large: EnemyProfile,
}

impl EnemyProfiles {
    /// Stats for `kind`.
    #[must_use]
    pub const fn get(&self, kind: EnemyKind) -> EnemyProfile {
        match kind {
            EnemyKind::Small => self.small,
            EnemyKind::Medium => self.medium,
            EnemyKind::Large => self.large,
        }
    }

    /// Check every profile can move and be hurt.
    pub fn validate(&self) -> Result<()> {
        for kind in [EnemyKind::Small, EnemyKind::Medium, EnemyKind::Large] {
            let profile = self.get(kind);
            if profile.health <= Fixed::ZERO || profile.speed <= Fixed::ZERO {
                return Err(GameError::InvalidConfig(format!(
                    "{kind:?} enemies need positive health and speed"
                )));
            }
        }
        Ok(())
    }
}

impl Default for EnemyProfiles {
    fn default() -> Self {
        Self {
            small: EnemyProfile::from_parts(10, Fixed::from_num(1.5)),
            medium: EnemyProfile::from_parts(30, Fixed::ONE),
            large: EnemyProfile::from_parts(80, Fixed::from_num(0.6)),
        }
    }
}

/// Source of enemy instances.
pub trait EnemyFactory {
    /// A fresh enemy of `kind`, not yet on a route.
    fn get(&mut self, kind: EnemyKind) -> Enemy;
}

/// Factory building enemies from configured profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileFactory {
    profiles: EnemyProfiles,
}

impl ProfileFactory {
    /// Create a factory for the given profiles.
    #[must_use]
    pub const fn new(profiles: EnemyProfiles) -> Self {
        Self { profiles }
    }
}

impl EnemyFactory for ProfileFactory {
    fn get(&mut self, kind: EnemyKind) -> Enemy {
        Enemy::new(kind, self.profiles.get(kind))
    }
}

/// An enemy walking its route towards a destination.
///
/// Each route segment spans one tile; `progress` is the fraction of the
/// current segment already covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enemy {
    kind: EnemyKind,
    health: Fixed,
    speed: Fixed,
    route: Option<Route>,
    segment: usize,
    progress: Fixed,
    position: Vec2Fixed,
}

impl Enemy {
    /// A new enemy with full health and no route.
    #[must_use]
    pub fn new(kind: EnemyKind, profile: EnemyProfile) -> Self {
        Self {
            kind,
            health: profile.health,
            speed: profile.speed,
            route: None,
            segment: 0,
            progress: Fixed::ZERO,
            position: Vec2Fixed::ZERO,
        }
    }

    /// Same enemy standing at `position`, off any route.
    #[must_use]
    pub fn placed_at(mut self, position: Vec2Fixed) -> Self {
        self.position = position;
        self
    }

    /// Put the enemy at the start of `route`.
    pub fn spawn_on(&mut self, route: Route) {
        if let Some(start) = route.start() {
            self.position = start.center();
        }
        self.segment = 0;
        self.progress = Fixed::ZERO;
        self.route = Some(route);
    }

    /// Follow the board's current paths from where the enemy stands.
    ///
    /// The enemy keeps heading for the tile it is walking into while that
    /// tile still leads to a destination, and turns back otherwise. Returns
    /// false, leaving the old route alone, when neither tile has a route.
    pub fn reroute(&mut self, board: &dyn Board) -> bool {
        let Some(route) = &self.route else {
            return false;
        };
        let waypoints = route.waypoints();
        let (Some(&from), Some(&to)) = (waypoints.get(self.segment), waypoints.get(self.segment + 1))
        else {
            return false;
        };

        if let Some(ahead) = board.route_from(to) {
            let mut path = vec![from];
            path.extend_from_slice(ahead.waypoints());
            self.route = Some(Route::new(path));
            self.segment = 0;
            return true;
        }
        if let Some(back) = board.route_from(from) {
            let mut path = vec![to];
            path.extend_from_slice(back.waypoints());
            self.route = Some(Route::new(path));
            self.segment = 0;
            self.progress = Fixed::ONE - self.progress;
            return true;
        }
        false
    }

    /// Tiles left to walk, starting with the one the enemy last passed.
    #[must_use]
    pub fn remaining_route(&self) -> &[TileCoord] {
        self.route
            .as_ref()
            .and_then(|route| route.waypoints().get(self.segment..))
            .unwrap_or_default()
    }

    /// Enemy archetype.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.health
    }

    /// Current position in tile units.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// True once health has run out.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health <= Fixed::ZERO
    }

    /// Take damage. Death is handled on the enemy's next update.
    pub fn apply_damage(&mut self, damage: Fixed) {
        self.health = self.health.saturating_sub(damage);
    }
}

impl GameBehavior for Enemy {
    fn game_update(&mut self, ctx: &mut TickContext<'_>) -> Result<UpdateStatus> {
        if self.is_destroyed() {
            ctx.record_kill();
            return Ok(UpdateStatus::Finished);
        }

        let Some(route) = &self.route else {
            return Err(GameError::InvalidState("enemy has no route".to_string()));
        };
        let waypoints = route.waypoints();
        if self.segment + 1 >= waypoints.len() {
            ctx.enemy_reached_destination();
            return Ok(UpdateStatus::Finished);
        }

        self.progress = self
            .progress
            .saturating_add(self.speed.saturating_mul(ctx.dt()));
        while self.progress >= Fixed::ONE {
            self.progress -= Fixed::ONE;
            self.segment += 1;
            if self.segment + 1 >= waypoints.len() {
                self.position = waypoints[self.segment].center();
                ctx.enemy_reached_destination();
                return Ok(UpdateStatus::Finished);
            }
        }

        let from = waypoints[self.segment].center();
        let to = waypoints[self.segment + 1].center();
        self.position = from.lerp(to, self.progress);
        Ok(UpdateStatus::Alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardConfig, GridBoard, MortarSettings, TileContent};
    use crate::collaborators::Unattended;
    use crate::effects::EffectBuffer;
    use crate::game::MatchStats;
    use crate::health::PlayerHealth;

    fn straight_route(length: u32) -> Route {
        Route::new((0..length).map(|x| TileCoord::new(x, 0)).collect())
    }

    fn step(enemy: &mut Enemy, health: &mut PlayerHealth, stats: &mut MatchStats) -> UpdateStatus {
        let mut effects = EffectBuffer::default();
        let mut ctx = TickContext::new(Fixed::from_num(0.5), health, None, &mut effects, stats);
        enemy.game_update(&mut ctx).unwrap()
    }

    #[test]
    fn test_enemy_walks_route_and_costs_one_health() {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        health.set(5);
        let mut stats = MatchStats::default();
        let mut enemy = ProfileFactory::default().get(EnemyKind::Medium);
        enemy.spawn_on(straight_route(3));

        assert_eq!(step(&mut enemy, &mut health, &mut stats), UpdateStatus::Alive);
        assert_eq!(enemy.position(), Vec2Fixed::new(Fixed::from_num(0.5), Fixed::ZERO));
        assert_eq!(step(&mut enemy, &mut health, &mut stats), UpdateStatus::Alive);
        assert_eq!(step(&mut enemy, &mut health, &mut stats), UpdateStatus::Alive);
        assert_eq!(health.current(), 5);
        assert_eq!(step(&mut enemy, &mut health, &mut stats), UpdateStatus::Finished);
        assert_eq!(health.current(), 4);
        assert_eq!(stats.enemies_arrived, 1);
    }

    #[test]
    fn test_destroyed_enemy_is_removed_as_kill() {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        health.set(5);
        let mut stats = MatchStats::default();
        let mut enemy = ProfileFactory::default().get(EnemyKind::Small);
        enemy.spawn_on(straight_route(10));
        enemy.apply_damage(Fixed::from_num(100));

        assert!(enemy.is_destroyed());
        assert_eq!(step(&mut enemy, &mut health, &mut stats), UpdateStatus::Finished);
        assert_eq!(stats.enemies_killed, 1);
        assert_eq!(health.current(), 5);
    }

    #[test]
    fn test_enemy_without_route_fails() {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        let mut stats = MatchStats::default();
        let mut effects = EffectBuffer::default();
        let mut enemy = ProfileFactory::default().get(EnemyKind::Large);
        let mut ctx = TickContext::new(Fixed::ONE, &mut health, None, &mut effects, &mut stats);
        assert!(enemy.game_update(&mut ctx).is_err());
    }

    fn open_board() -> GridBoard {
        let mut board = GridBoard::new(MortarSettings::default(), 0);
        board.initialize(BoardConfig::new(10, 10).unwrap()).unwrap();
        board
    }

    fn halfway_along_top_row(board: &GridBoard) -> Enemy {
        let mut health = PlayerHealth::new(Box::new(Unattended));
        health.set(5);
        let mut stats = MatchStats::default();
        let mut enemy = ProfileFactory::default().get(EnemyKind::Medium);
        enemy.spawn_on(board.route_from(TileCoord::new(0, 0)).unwrap());
        step(&mut enemy, &mut health, &mut stats);
        assert_eq!(&enemy.remaining_route()[..2], &[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        enemy
    }

    #[test]
    fn test_reroute_avoids_wall_placed_ahead() {
        let mut board = open_board();
        let mut enemy = halfway_along_top_row(&board);
        let position = enemy.position();

        board.place(TileCoord::new(2, 0), TileContent::Wall).unwrap();
        assert!(enemy.reroute(&board));
        assert_eq!(enemy.position(), position);
        assert_eq!(
            &enemy.remaining_route()[..3],
            &[TileCoord::new(0, 0), TileCoord::new(1, 0), TileCoord::new(1, 1)]
        );
        assert!(!enemy.remaining_route().contains(&TileCoord::new(2, 0)));
    }

    #[test]
    fn test_reroute_turns_back_from_blocked_tile() {
        let mut board = open_board();
        let mut enemy = halfway_along_top_row(&board);

        board.place(TileCoord::new(1, 0), TileContent::Mortar).unwrap();
        assert!(enemy.reroute(&board));
        assert_eq!(
            &enemy.remaining_route()[..3],
            &[TileCoord::new(1, 0), TileCoord::new(0, 0), TileCoord::new(0, 1)]
        );

        let mut health = PlayerHealth::new(Box::new(Unattended));
        let mut stats = MatchStats::default();
        step(&mut enemy, &mut health, &mut stats);
        assert_eq!(enemy.position(), TileCoord::new(0, 0).center());
    }

    #[test]
    fn test_reroute_without_route_is_refused() {
        let board = open_board();
        let mut enemy = ProfileFactory::default().get(EnemyKind::Small);
        assert!(!enemy.reroute(&board));
        assert!(enemy.remaining_route().is_empty());
    }

    #[test]
    fn test_profiles_reject_zero_speed() {
        let mut profiles = EnemyProfiles::default();
        assert!(profiles.validate().is_ok());
        profiles.large.speed = Fixed::ZERO;
        assert!(profiles.validate().is_err());
    }

    #[test]
    fn test_kind_names_in_ron() {
        let kind: EnemyKind = ron::from_str("medium").unwrap();
        assert_eq!(kind, EnemyKind::Medium);
    }
}
