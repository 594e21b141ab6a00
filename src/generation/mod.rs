//! # Generation Module
//!
//! Procedural level generation. Generators produce a [`LevelDescription`],
//! the same boundary format hand-written levels are parsed into, so a
//! generated level can be printed, saved and loaded again.

pub mod dungeon;

pub use dungeon::*;

use crate::config::MAX_GRID_SIDE;
use crate::game::{GameConfig, LevelDescription, Position};
use crate::{GloamError, GloamResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    /// Minimum room size, walls included
    pub min_room_size: u32,
    /// Maximum room size, walls included
    pub max_room_size: u32,
    pub min_rooms: u32,
    pub max_rooms: u32,
    /// Probability of extra connections between rooms (0.0 to 1.0)
    pub extra_connection_chance: f64,
    /// Probability that a room opening gets a door
    pub door_chance: f64,
    /// Probability that a room is laid with grass
    pub grass_chance: f64,
    pub monster_count: u32,
    /// Probability that a room holds a chest or barrel
    pub prop_chance: f64,
    /// Place a raid base in the first room
    pub with_base: bool,
    pub dark: bool,
}

impl GenerationConfig {
    /// Creates a default generation configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert!(config.min_room_size >= 3);
    /// assert!(config.max_room_size >= config.min_room_size);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: crate::config::DEFAULT_DUNGEON_WIDTH,
            height: crate::config::DEFAULT_DUNGEON_HEIGHT,
            min_room_size: 5,
            max_room_size: 12,
            min_rooms: 5,
            max_rooms: 10,
            extra_connection_chance: 0.15,
            door_chance: 0.4,
            grass_chance: 0.2,
            monster_count: 6,
            prop_chance: 0.5,
            with_base: true,
            dark: false,
        }
    }

    /// Creates a configuration for testing with smaller, simpler levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            width: 40,
            height: 30,
            min_room_size: 5,
            max_room_size: 8,
            min_rooms: 3,
            max_rooms: 6,
            extra_connection_chance: 0.1,
            monster_count: 3,
            ..Self::new(seed)
        }
    }

    /// Takes the size, seed and monster count from the game settings.
    pub fn from_game_config(config: &GameConfig) -> Self {
        Self {
            width: config.dungeon_width,
            height: config.dungeon_height,
            monster_count: config.monster_count,
            dark: config.dark.unwrap_or(false),
            ..Self::new(config.seed)
        }
    }

    /// Checks that rooms of every allowed size fit the level.
    pub fn validate(&self) -> GloamResult<()> {
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(GloamError::GenerationFailed(format!(
                "{}x{} exceeds the {} cell limit",
                self.width, self.height, MAX_GRID_SIDE
            )));
        }
        if self.min_room_size < 3 || self.min_room_size > self.max_room_size {
            return Err(GloamError::GenerationFailed(format!(
                "bad room size range {}..={}",
                self.min_room_size, self.max_room_size
            )));
        }
        if self.max_room_size + 2 > self.width.min(self.height) {
            return Err(GloamError::GenerationFailed(format!(
                "rooms up to {} cells do not fit a {}x{} level",
                self.max_room_size, self.width, self.height
            )));
        }
        if self.min_rooms == 0 || self.min_rooms > self.max_rooms {
            return Err(GloamError::GenerationFailed(format!(
                "bad room count range {}..={}",
                self.min_rooms, self.max_rooms
            )));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// A rectangular room, walls included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    /// Top-left corner of the room
    pub top_left: Position,
    pub width: u32,
    pub height: u32,
    /// Rooms joined to this one by a corridor
    pub connections: Vec<u32>,
}

impl Room {
    /// Creates a new room with the given parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::{Position, Room};
    ///
    /// let room = Room::new(1, Position::new(5, 5), 10, 8);
    /// assert_eq!(room.center(), Position::new(10, 9));
    /// assert!(room.contains(Position::new(7, 7)));
    /// ```
    pub fn new(id: u32, top_left: Position, width: u32, height: u32) -> Self {
        Self {
            id,
            top_left,
            width,
            height,
            connections: Vec::new(),
        }
    }

    /// Gets the bottom-right corner of the room.
    pub fn bottom_right(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 - 1,
            self.top_left.y + self.height as i32 - 1,
        )
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 / 2,
            self.top_left.y + self.height as i32 / 2,
        )
    }

    /// Gets the inner area (excluding walls) of the room.
    pub fn inner_area(&self) -> u32 {
        self.width.saturating_sub(2) * self.height.saturating_sub(2)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.top_left.x
            && pos.y >= self.top_left.y
            && pos.x < self.top_left.x + self.width as i32
            && pos.y < self.top_left.y + self.height as i32
    }

    /// Checks if a position is on the border of this room.
    pub fn is_border(&self, pos: Position) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let corner = self.bottom_right();
        pos.x == self.top_left.x
            || pos.y == self.top_left.y
            || pos.x == corner.x
            || pos.y == corner.y
    }

    /// True if the rooms share any cell.
    pub fn overlaps(&self, other: &Room) -> bool {
        !(self.top_left.x > other.bottom_right().x
            || other.top_left.x > self.bottom_right().x
            || self.top_left.y > other.bottom_right().y
            || other.top_left.y > self.bottom_right().y)
    }

    /// Gets all floor positions within this room.
    pub fn floor_positions(&self) -> Vec<Position> {
        let corner = self.bottom_right();
        let mut positions = Vec::new();
        for y in (self.top_left.y + 1)..corner.y {
            for x in (self.top_left.x + 1)..corner.x {
                positions.push(Position::new(x, y));
            }
        }
        positions
    }

    /// Gets all wall positions of this room.
    pub fn wall_positions(&self) -> Vec<Position> {
        let corner = self.bottom_right();
        let mut positions = Vec::new();

        // Top and bottom walls
        for x in self.top_left.x..=corner.x {
            positions.push(Position::new(x, self.top_left.y));
            positions.push(Position::new(x, corner.y));
        }

        // Left and right walls (excluding corners already added)
        for y in (self.top_left.y + 1)..corner.y {
            positions.push(Position::new(self.top_left.x, y));
            positions.push(Position::new(corner.x, y));
        }

        positions
    }

    /// Adds a connection to another room.
    pub fn add_connection(&mut self, room_id: u32) {
        if !self.connections.contains(&room_id) {
            self.connections.push(room_id);
        }
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> GloamResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> GloamResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Creates a seeded random number generator from the config.
pub fn create_rng(config: &GenerationConfig) -> StdRng {
    StdRng::seed_from_u64(config.seed)
}

/// Checks that a description has walkable ground and a player.
pub fn validate_level(level: &LevelDescription) -> GloamResult<()> {
    let floor_count = level
        .terrain
        .iter()
        .filter(|terrain| !terrain.wall.blocks_movement())
        .count();
    if floor_count == 0 {
        return Err(GloamError::GenerationFailed(
            "Level has no floor tiles".to_string(),
        ));
    }
    if !level
        .actors
        .iter()
        .any(|spawn| spawn.kind == crate::game::ActorKind::Player)
    {
        return Err(GloamError::GenerationFailed(
            "Level has no player start".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert!(config.validate().is_ok());
        assert!(GenerationConfig::for_testing(1).validate().is_ok());
    }

    #[test]
    fn test_config_rejects_oversized_rooms() {
        let config = GenerationConfig {
            width: 10,
            height: 10,
            ..GenerationConfig::new(1)
        };
        assert!(matches!(config.validate(), Err(GloamError::GenerationFailed(_))));
    }

    #[test]
    fn test_config_from_game_settings() {
        let game = GameConfig {
            seed: 99,
            monster_count: 2,
            dark: Some(true),
            ..GameConfig::default()
        };
        let config = GenerationConfig::from_game_config(&game);
        assert_eq!(config.seed, 99);
        assert_eq!(config.monster_count, 2);
        assert!(config.dark);
    }

    #[test]
    fn test_room_geometry() {
        let room = Room::new(1, Position::new(5, 5), 10, 8);

        assert_eq!(room.bottom_right(), Position::new(14, 12));
        assert_eq!(room.center(), Position::new(10, 9));
        assert_eq!(room.inner_area(), 48); // (10-2) * (8-2)

        assert!(room.contains(Position::new(5, 5))); // Top-left corner
        assert!(room.contains(Position::new(14, 12))); // Bottom-right corner
        assert!(!room.contains(Position::new(15, 12))); // Outside right

        assert!(room.is_border(Position::new(10, 5))); // Top edge
        assert!(!room.is_border(Position::new(7, 7))); // Interior
    }

    #[test]
    fn test_room_overlap() {
        let room1 = Room::new(1, Position::new(5, 5), 10, 8);
        let room2 = Room::new(2, Position::new(10, 8), 6, 6); // Overlaps
        let touching = Room::new(3, Position::new(15, 5), 4, 4); // Abuts without sharing a cell
        let far = Room::new(4, Position::new(20, 20), 5, 5);

        assert!(room1.overlaps(&room2));
        assert!(!room1.overlaps(&touching));
        assert!(!room1.overlaps(&far));
        assert!(!far.overlaps(&room1));
    }

    #[test]
    fn test_room_positions() {
        let room = Room::new(1, Position::new(5, 5), 4, 4);

        let floor_positions = room.floor_positions();
        let wall_positions = room.wall_positions();

        // 4x4 room should have 2x2 = 4 floor tiles
        assert_eq!(floor_positions.len(), 4);
        // Should have 4*4 - 2*2 = 12 wall tiles
        assert_eq!(wall_positions.len(), 12);

        let floor_set: HashSet<_> = floor_positions.into_iter().collect();
        let wall_set: HashSet<_> = wall_positions.into_iter().collect();
        assert!(floor_set.is_disjoint(&wall_set));
    }

    #[test]
    fn test_room_connections() {
        let mut room = Room::new(1, Position::new(5, 5), 10, 8);
        room.add_connection(2);
        room.add_connection(3);
        room.add_connection(2);
        assert_eq!(room.connections, vec![2, 3]);
    }

    #[test]
    fn test_validate_level_needs_player() {
        let mut level = LevelDescription::open("empty", 4, 4);
        assert!(validate_level(&level).is_err());
        level.actors.push(crate::game::ActorSpawn {
            kind: crate::game::ActorKind::Player,
            position: Position::new(1, 1),
        });
        assert!(validate_level(&level).is_ok());
    }
}
