//! The game board: tile layout, enemy routes and the defenses on it.
//!
//! [`Board`] is the narrow interface the match controller drives.
//! [`GridBoard`] is the reference implementation: a rectangular grid with a
//! breadth-first distance field from the destinations, rebuilt whenever the
//! layout changes, and mortar towers that lob shells at the nearest enemy.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::behavior::TickContext;
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed, Vec2Fixed};

/// Validated board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    width: u32,
    height: u32,
}

impl BoardConfig {
    /// Smallest supported side length.
    pub const MIN_SIZE: u32 = 10;
    /// Largest supported side length.
    pub const MAX_SIZE: u32 = 100;

    /// Validate a board size. Both sides must lie in
    /// [`MIN_SIZE`](Self::MIN_SIZE)`..=`[`MAX_SIZE`](Self::MAX_SIZE).
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::check("width", width)?;
        Self::check("height", height)?;
        Ok(Self { width, height })
    }

    fn check(axis: &'static str, value: u32) -> Result<()> {
        if (Self::MIN_SIZE..=Self::MAX_SIZE).contains(&value) {
            Ok(())
        } else {
            Err(GameError::BoardDimensionOutOfRange {
                axis,
                value,
                min: Self::MIN_SIZE,
                max: Self::MAX_SIZE,
            })
        }
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of tiles.
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Column/row of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileCoord {
    /// Create a tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Centre of this tile in tile units.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        Vec2Fixed::tile_center(self.x, self.y)
    }
}

/// What occupies a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileContent {
    /// Open ground.
    #[default]
    Empty,
    /// Enemies enter here.
    SpawnPoint,
    /// Enemies leave here, costing the player health.
    Destination,
    /// Blocks movement.
    Wall,
    /// Mortar tower. Blocks movement.
    Mortar,
}

impl TileContent {
    /// Whether enemies can walk through.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall | Self::Mortar)
    }
}

/// A placement request, as authored in layouts and sent by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Content to put there.
    pub content: TileContent,
}

impl Placement {
    /// Target tile.
    #[must_use]
    pub const fn tile(&self) -> TileCoord {
        TileCoord::new(self.x, self.y)
    }
}

/// Walkable tiles from a spawn point to a destination, one step apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    waypoints: Vec<TileCoord>,
}

impl Route {
    /// Wrap an ordered list of adjacent tiles.
    #[must_use]
    pub fn new(waypoints: Vec<TileCoord>) -> Self {
        Self { waypoints }
    }

    /// Tiles in walking order.
    #[must_use]
    pub fn waypoints(&self) -> &[TileCoord] {
        &self.waypoints
    }

    /// First tile.
    #[must_use]
    pub fn start(&self) -> Option<TileCoord> {
        self.waypoints.first().copied()
    }

    /// Last tile.
    #[must_use]
    pub fn destination(&self) -> Option<TileCoord> {
        self.waypoints.last().copied()
    }

    /// Number of steps between start and destination.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }
}

/// Mortar tower tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortarSettings {
    /// Targeting range in tiles.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Seconds between shots.
    #[serde(with = "fixed_decimal")]
    pub reload: Fixed,
    /// Blast radius in tiles.
    #[serde(with = "fixed_decimal")]
    pub blast_radius: Fixed,
    /// Damage to each enemy caught in the blast.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// Seconds a shell is in the air.
    #[serde(with = "fixed_decimal")]
    pub flight_time: Fixed,
}

impl MortarSettings {
    /// Check the tower can fire.
    pub fn validate(&self) -> Result<()> {
        if self.reload <= Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "mortar reload must be positive".to_string(),
            ));
        }
        if self.range < Fixed::ZERO
            || self.blast_radius < Fixed::ZERO
            || self.damage < Fixed::ZERO
            || self.flight_time < Fixed::ZERO
        {
            return Err(GameError::InvalidConfig(
                "mortar settings must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MortarSettings {
    fn default() -> Self {
        Self {
            range: Fixed::from_num(3.5),
            reload: Fixed::ONE,
            blast_radius: Fixed::ONE,
            damage: Fixed::from_num(12),
            flight_time: Fixed::from_num(0.8),
        }
    }
}

/// The board as seen by the match controller.
pub trait Board {
    /// Size the board and lay out the initial tiles.
    fn initialize(&mut self, config: BoardConfig) -> Result<()>;

    /// A spawn point, chosen at random. `None` if the board has none.
    fn random_spawn_point(&mut self) -> Option<TileCoord>;

    /// Shortest walk from `tile` to a destination. `None` if unreachable.
    fn route_from(&self, tile: TileCoord) -> Option<Route>;

    /// Change a tile's content.
    fn place(&mut self, tile: TileCoord, content: TileContent) -> Result<()>;

    /// Content of a tile, `None` outside the board.
    fn content(&self, tile: TileCoord) -> Option<TileContent>;

    /// Per-tick update of everything on the board (towers).
    fn game_update(&mut self, ctx: &mut TickContext<'_>);

    /// Back to the initial layout.
    fn clear(&mut self);
}

/// Deterministic linear congruential generator for spawn selection.
#[derive(Debug, Clone)]
struct BoardRng {
    state: u64,
}

impl BoardRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next() % bound as u64) as usize
    }
}

#[derive(Debug, Clone)]
struct MortarTower {
    tile: TileCoord,
    charge: Fixed,
}

const UNREACHABLE: u32 = u32::MAX;

/// Grid board with a distance field and mortar towers.
#[derive(Debug, Clone)]
pub struct GridBoard {
    width: u32,
    height: u32,
    tiles: Vec<TileContent>,
    distances: Vec<u32>,
    spawn_points: Vec<TileCoord>,
    towers: Vec<MortarTower>,
    mortar: MortarSettings,
    seed: u64,
    rng: BoardRng,
}

impl GridBoard {
    /// An empty board. Call [`Board::initialize`] before use.
    #[must_use]
    pub fn new(mortar: MortarSettings, seed: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            distances: Vec::new(),
            spawn_points: Vec::new(),
            towers: Vec::new(),
            mortar,
            seed,
            rng: BoardRng::new(seed),
        }
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Spawn points in row-major order.
    #[must_use]
    pub fn spawn_points(&self) -> &[TileCoord] {
        &self.spawn_points
    }

    /// Number of mortar towers.
    #[must_use]
    pub fn tower_count(&self) -> usize {
        self.towers.len()
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        (tile.x < self.width && tile.y < self.height)
            .then(|| (tile.y as usize) * (self.width as usize) + (tile.x as usize))
    }

    fn count(&self, content: TileContent) -> usize {
        self.tiles.iter().filter(|&&tile| tile == content).count()
    }

    /// Orthogonal neighbours in a fixed order: north, east, south, west.
    fn neighbours(&self, tile: TileCoord) -> impl Iterator<Item = TileCoord> + '_ {
        let candidates = [
            tile.y.checked_sub(1).map(|y| TileCoord::new(tile.x, y)),
            Some(TileCoord::new(tile.x + 1, tile.y)),
            Some(TileCoord::new(tile.x, tile.y + 1)),
            tile.x.checked_sub(1).map(|x| TileCoord::new(x, tile.y)),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter(move |&next| next.x < self.width && next.y < self.height)
    }

    fn reset_layout(&mut self) {
        self.tiles = vec![TileContent::Empty; (self.width as usize) * (self.height as usize)];
        if let Some(first) = self.tiles.first_mut() {
            *first = TileContent::SpawnPoint;
        }
        if let Some(last) = self.tiles.last_mut() {
            *last = TileContent::Destination;
        }
        self.towers.clear();
        self.rng = BoardRng::new(self.seed);
        self.rebuild_paths();
    }

    /// Breadth-first distances from every destination, plus the spawn list.
    fn rebuild_paths(&mut self) {
        self.distances = vec![UNREACHABLE; self.tiles.len()];
        self.spawn_points.clear();

        let mut queue = VecDeque::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = TileCoord::new(x, y);
                let Some(index) = self.index(tile) else {
                    continue;
                };
                match self.tiles[index] {
                    TileContent::Destination => {
                        self.distances[index] = 0;
                        queue.push_back(tile);
                    }
                    TileContent::SpawnPoint => self.spawn_points.push(tile),
                    _ => {}
                }
            }
        }

        while let Some(tile) = queue.pop_front() {
            let Some(current) = self.index(tile) else {
                continue;
            };
            let next_distance = self.distances[current] + 1;
            let neighbours: Vec<TileCoord> = self.neighbours(tile).collect();
            for next in neighbours {
                let Some(index) = self.index(next) else {
                    continue;
                };
                if self.tiles[index].is_walkable() && self.distances[index] == UNREACHABLE {
                    self.distances[index] = next_distance;
                    queue.push_back(next);
                }
            }
        }
    }

    fn every_spawn_reachable(&self) -> bool {
        self.spawn_points.iter().all(|&spawn| {
            self.index(spawn)
                .is_some_and(|index| self.distances[index] != UNREACHABLE)
        })
    }

    fn reject(tile: TileCoord, reason: &str) -> GameError {
        GameError::PlacementRejected {
            x: tile.x,
            y: tile.y,
            reason: reason.to_string(),
        }
    }

    fn nearest_target(ctx: &TickContext<'_>, from: Vec2Fixed, range: Fixed) -> Option<Vec2Fixed> {
        let range_sq = range.saturating_mul(range);
        let mut best: Option<(Fixed, Vec2Fixed)> = None;
        for (_, enemy) in ctx.targets()?.iter() {
            if enemy.is_destroyed() {
                continue;
            }
            let distance = enemy.position().distance_squared(from);
            if distance > range_sq {
                continue;
            }
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, enemy.position()));
            }
        }
        best.map(|(_, position)| position)
    }
}

impl Board for GridBoard {
    fn initialize(&mut self, config: BoardConfig) -> Result<()> {
        self.width = config.width();
        self.height = config.height();
        self.reset_layout();
        tracing::debug!(width = self.width, height = self.height, "Board initialized");
        Ok(())
    }

    fn random_spawn_point(&mut self) -> Option<TileCoord> {
        if self.spawn_points.is_empty() {
            return None;
        }
        let pick = self.rng.below(self.spawn_points.len());
        self.spawn_points.get(pick).copied()
    }

    fn route_from(&self, tile: TileCoord) -> Option<Route> {
        let mut index = self.index(tile)?;
        if self.distances[index] == UNREACHABLE {
            return None;
        }

        let mut waypoints = vec![tile];
        let mut current = tile;
        while self.distances[index] > 0 {
            let wanted = self.distances[index] - 1;
            let next = self.neighbours(current).find(|&next| {
                self.index(next)
                    .is_some_and(|i| self.distances[i] == wanted)
            })?;
            index = self.index(next)?;
            current = next;
            waypoints.push(next);
        }
        Some(Route::new(waypoints))
    }

    fn place(&mut self, tile: TileCoord, content: TileContent) -> Result<()> {
        let index = self.index(tile).ok_or(GameError::TileOutOfBounds {
            x: tile.x,
            y: tile.y,
        })?;
        let previous = self.tiles[index];
        if previous == content {
            return Ok(());
        }
        if previous == TileContent::SpawnPoint && self.count(TileContent::SpawnPoint) == 1 {
            return Err(Self::reject(tile, "cannot remove the last spawn point"));
        }
        if previous == TileContent::Destination && self.count(TileContent::Destination) == 1 {
            return Err(Self::reject(tile, "cannot remove the last destination"));
        }

        self.tiles[index] = content;
        self.rebuild_paths();
        if !self.every_spawn_reachable() {
            self.tiles[index] = previous;
            self.rebuild_paths();
            tracing::warn!(x = tile.x, y = tile.y, ?content, "Placement would block a spawn point");
            return Err(Self::reject(tile, "would cut a spawn point off from every destination"));
        }

        if previous == TileContent::Mortar {
            self.towers.retain(|tower| tower.tile != tile);
        }
        if content == TileContent::Mortar {
            self.towers.push(MortarTower {
                tile,
                charge: Fixed::ZERO,
            });
        }
        tracing::debug!(x = tile.x, y = tile.y, ?content, "Tile placed");
        Ok(())
    }

    fn content(&self, tile: TileCoord) -> Option<TileContent> {
        self.index(tile).map(|index| self.tiles[index])
    }

    fn game_update(&mut self, ctx: &mut TickContext<'_>) {
        let settings = self.mortar;
        for tower in &mut self.towers {
            tower.charge = tower.charge.saturating_add(ctx.dt());
            let origin = tower.tile.center();
            while tower.charge >= settings.reload {
                let Some(target) = Self::nearest_target(ctx, origin, settings.range) else {
                    // Stay loaded until something walks into range.
                    tower.charge = settings.reload;
                    break;
                };
                tower.charge -= settings.reload;
                ctx.spawn_shell().launch(
                    origin,
                    target,
                    settings.flight_time,
                    settings.blast_radius,
                    settings.damage,
                );
            }
        }
    }

    fn clear(&mut self) {
        self.reset_layout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Unattended;
    use crate::collection::EntityCollection;
    use crate::effects::{Effect, EffectBuffer};
    use crate::enemy::{Enemy, EnemyKind, EnemyProfiles};
    use crate::game::MatchStats;
    use crate::health::PlayerHealth;

    fn board(width: u32, height: u32) -> GridBoard {
        let mut board = GridBoard::new(MortarSettings::default(), 7);
        board.initialize(BoardConfig::new(width, height).unwrap()).unwrap();
        board
    }

    #[test]
    fn test_dimensions_validated() {
        assert!(BoardConfig::new(10, 100).is_ok());
        assert_eq!(
            BoardConfig::new(9, 50),
            Err(GameError::BoardDimensionOutOfRange {
                axis: "width",
                value: 9,
                min: 10,
                max: 100
            })
        );
        assert!(matches!(
            BoardConfig::new(50, 101),
            Err(GameError::BoardDimensionOutOfRange { axis: "height", .. })
        ));
    }

    #[test]
    fn test_initial_layout_corners() {
        let mut board = board(10, 10);
        assert_eq!(board.content(TileCoord::new(0, 0)), Some(TileContent::SpawnPoint));
        assert_eq!(board.content(TileCoord::new(9, 9)), Some(TileContent::Destination));
        assert_eq!(board.content(TileCoord::new(4, 4)), Some(TileContent::Empty));
        assert_eq!(board.random_spawn_point(), Some(TileCoord::new(0, 0)));
    }

    #[test]
    fn test_route_is_shortest_and_adjacent() {
        let board = board(10, 10);
        let route = board.route_from(TileCoord::new(0, 0)).unwrap();
        assert_eq!(route.steps(), 18);
        assert_eq!(route.destination(), Some(TileCoord::new(9, 9)));
        for pair in route.waypoints().windows(2) {
            let dx = pair[0].x.abs_diff(pair[1].x);
            let dy = pair[0].y.abs_diff(pair[1].y);
            assert_eq!(dx + dy, 1);
        }
    }

    #[test]
    fn test_walls_reroute_but_cannot_seal_spawn() {
        let mut board = board(10, 10);
        board.place(TileCoord::new(1, 0), TileContent::Wall).unwrap();
        let route = board.route_from(TileCoord::new(0, 0)).unwrap();
        assert_eq!(route.waypoints()[1], TileCoord::new(0, 1));

        let sealed = board.place(TileCoord::new(0, 1), TileContent::Mortar);
        assert!(matches!(sealed, Err(GameError::PlacementRejected { .. })));
        assert_eq!(board.content(TileCoord::new(0, 1)), Some(TileContent::Empty));
        assert!(board.route_from(TileCoord::new(0, 0)).is_some());
        assert_eq!(board.tower_count(), 0);
    }

    #[test]
    fn test_last_spawn_and_destination_are_kept() {
        let mut board = board(10, 10);
        assert!(board.place(TileCoord::new(0, 0), TileContent::Empty).is_err());
        assert!(board.place(TileCoord::new(9, 9), TileContent::Wall).is_err());

        board.place(TileCoord::new(5, 0), TileContent::SpawnPoint).unwrap();
        board.place(TileCoord::new(0, 0), TileContent::Empty).unwrap();
        assert_eq!(board.spawn_points(), &[TileCoord::new(5, 0)]);
    }

    #[test]
    fn test_out_of_bounds_placement() {
        let mut board = board(10, 12);
        assert_eq!(
            board.place(TileCoord::new(10, 0), TileContent::Wall),
            Err(GameError::TileOutOfBounds { x: 10, y: 0 })
        );
        assert!(board.route_from(TileCoord::new(0, 12)).is_none());
    }

    #[test]
    fn test_clear_restores_initial_layout() {
        let mut board = board(10, 10);
        board.place(TileCoord::new(3, 3), TileContent::Mortar).unwrap();
        board.place(TileCoord::new(4, 4), TileContent::SpawnPoint).unwrap();
        board.clear();
        assert_eq!(board.tower_count(), 0);
        assert_eq!(board.content(TileCoord::new(3, 3)), Some(TileContent::Empty));
        assert_eq!(board.spawn_points(), &[TileCoord::new(0, 0)]);
    }

    #[test]
    fn test_mortar_fires_at_enemy_in_range_only() {
        let mut board = board(10, 10);
        board.place(TileCoord::new(5, 5), TileContent::Mortar).unwrap();

        let profile = EnemyProfiles::default().small;
        let mut enemies = EntityCollection::new();
        enemies.add(Enemy::new(EnemyKind::Small, profile).placed_at(TileCoord::new(0, 9).center()));

        let mut health = PlayerHealth::new(Box::new(Unattended));
        let mut buffer = EffectBuffer::default();
        let mut stats = MatchStats::default();
        {
            let mut ctx = TickContext::new(
                Fixed::from_num(2),
                &mut health,
                Some(&mut enemies),
                &mut buffer,
                &mut stats,
            );
            board.game_update(&mut ctx);
        }
        assert!(buffer.is_empty(), "target out of range");

        enemies.add(Enemy::new(EnemyKind::Small, profile).placed_at(TileCoord::new(6, 6).center()));
        {
            let mut ctx = TickContext::new(
                Fixed::from_num(0.1),
                &mut health,
                Some(&mut enemies),
                &mut buffer,
                &mut stats,
            );
            board.game_update(&mut ctx);
        }
        let mut effects = EntityCollection::new();
        buffer.drain_into(&mut effects);
        assert_eq!(effects.len(), 1, "a loaded tower fires once");
        let Some((_, Effect::Shell(shell))) = effects.iter().next() else {
            panic!("expected a shell");
        };
        assert_eq!(shell.target(), TileCoord::new(6, 6).center());
    }
}
