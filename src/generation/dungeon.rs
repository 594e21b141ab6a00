//! # Dungeon Generation
//!
//! Room-and-corridor layouts written out as a [`LevelDescription`].
//!
//! The generator:
//! 1. Places rooms randomly with collision detection
//! 2. Connects consecutive rooms with L-shaped corridors, plus a few extras
//! 3. Hangs doors in room openings
//! 4. Places the player, base, allies, monsters and props
//! 5. Checks that everything placed is reachable from the player

use crate::game::{ActorKind, ActorSpawn, LevelDescription, ObjectKind, ObjectSpawn, Position, Terrain};
use crate::generation::{create_rng, validate_level, GenerationConfig, Generator, Room};
use crate::{GloamError, GloamResult};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Primary dungeon generator using room-and-corridor algorithm.
#[derive(Debug, Clone)]
pub struct RoomCorridorGenerator {
    /// Maximum attempts to place a room before giving up
    pub max_placement_attempts: u32,
    /// Whether to reject levels with unreachable spawns
    pub ensure_connectivity: bool,
}

impl RoomCorridorGenerator {
    /// Creates a new dungeon generator with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::{create_rng, GenerationConfig, Generator, RoomCorridorGenerator};
    ///
    /// let config = GenerationConfig::for_testing(3);
    /// let level = RoomCorridorGenerator::new()
    ///     .generate(&config, &mut create_rng(&config))
    ///     .unwrap();
    /// assert_eq!((level.width, level.height), (40, 30));
    /// ```
    pub fn new() -> Self {
        Self {
            max_placement_attempts: 100,
            ensure_connectivity: true,
        }
    }

    /// Places rooms without overlap and carves their floors.
    fn place_rooms(
        &self,
        level: &mut LevelDescription,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> GloamResult<Vec<Room>> {
        let mut rooms: Vec<Room> = Vec::new();
        let room_count = rng.gen_range(config.min_rooms..=config.max_rooms);

        for room_id in 0..room_count {
            match self.try_place_room(level, config, rng, room_id, &rooms) {
                Some(room) => {
                    let terrain = if rng.gen_bool(config.grass_chance.clamp(0.0, 1.0)) {
                        Terrain::GRASS
                    } else {
                        Terrain::FLOOR
                    };
                    for pos in room.floor_positions() {
                        level.set_terrain(pos, terrain);
                    }
                    rooms.push(room);
                }
                None => debug!("Gave up placing room {}", room_id),
            }
        }

        if rooms.is_empty() {
            return Err(GloamError::GenerationFailed(
                "Failed to place any rooms".to_string(),
            ));
        }
        Ok(rooms)
    }

    fn try_place_room(
        &self,
        level: &LevelDescription,
        config: &GenerationConfig,
        rng: &mut StdRng,
        room_id: u32,
        existing_rooms: &[Room],
    ) -> Option<Room> {
        for _ in 0..self.max_placement_attempts {
            let width = rng.gen_range(config.min_room_size..=config.max_room_size);
            let height = rng.gen_range(config.min_room_size..=config.max_room_size);
            let x = rng.gen_range(1..=(level.width - width - 1) as i32);
            let y = rng.gen_range(1..=(level.height - height - 1) as i32);
            let room = Room::new(room_id, Position::new(x, y), width, height);

            if !existing_rooms.iter().any(|existing| room.overlaps(existing)) {
                return Some(room);
            }
        }
        None
    }

    /// Joins each room to the next, then adds a few random extra links.
    fn connect_rooms(
        &self,
        level: &mut LevelDescription,
        rooms: &mut [Room],
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) {
        for i in 1..rooms.len() {
            self.carve_l_corridor(level, rooms[i - 1].center(), rooms[i].center(), rng);
            let (a, b) = (rooms[i - 1].id, rooms[i].id);
            rooms[i - 1].add_connection(b);
            rooms[i].add_connection(a);
        }

        let extra_connections = (rooms.len() as f64 * config.extra_connection_chance) as usize;
        for _ in 0..extra_connections {
            let first = rng.gen_range(0..rooms.len());
            let second = rng.gen_range(0..rooms.len());
            if first == second {
                continue;
            }
            self.carve_l_corridor(level, rooms[first].center(), rooms[second].center(), rng);
            let (a, b) = (rooms[first].id, rooms[second].id);
            rooms[first].add_connection(b);
            rooms[second].add_connection(a);
        }
    }

    /// Carves an L-shaped corridor between two points.
    fn carve_l_corridor(
        &self,
        level: &mut LevelDescription,
        start: Position,
        end: Position,
        rng: &mut StdRng,
    ) {
        let corner = if rng.gen_bool(0.5) {
            Position::new(end.x, start.y)
        } else {
            Position::new(start.x, end.y)
        };
        for (from, to) in [(start, corner), (corner, end)] {
            for x in from.x.min(to.x)..=from.x.max(to.x) {
                for y in from.y.min(to.y)..=from.y.max(to.y) {
                    let pos = Position::new(x, y);
                    if level.terrain_at(pos).is_some_and(|t| t.wall.blocks_movement()) {
                        level.set_terrain(pos, Terrain::FLOOR);
                    }
                }
            }
        }
    }

    /// Hangs closed doors in openings a corridor punched through a room wall.
    fn add_doors(
        &self,
        level: &mut LevelDescription,
        rooms: &[Room],
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) {
        let mut placed = HashSet::new();
        for room in rooms {
            for pos in room.wall_positions() {
                if placed.contains(&pos) || !is_doorway(level, pos) {
                    continue;
                }
                if rng.gen_bool(config.door_chance.clamp(0.0, 1.0)) {
                    level.objects.push(ObjectSpawn {
                        kind: ObjectKind::Door { open: false },
                        position: pos,
                    });
                    placed.insert(pos);
                }
            }
        }
    }

    /// Places actors, the base and props.
    fn populate(
        &self,
        level: &mut LevelDescription,
        rooms: &[Room],
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) {
        let mut used: HashSet<Position> = level.objects.iter().map(|o| o.position).collect();
        let start = &rooms[0];

        let player = start.center();
        used.insert(player);
        level.actors.push(ActorSpawn {
            kind: ActorKind::Player,
            position: player,
        });

        if config.with_base {
            if let Some(base) = free_cell(level, start, &used, rng) {
                used.insert(base);
                level.base = Some(base);
            }
        }
        if let Some(pos) = free_cell(level, start, &used, rng) {
            used.insert(pos);
            level.actors.push(ActorSpawn {
                kind: ActorKind::Hero,
                position: pos,
            });
        }

        let lairs = if rooms.len() > 1 { &rooms[1..] } else { rooms };
        for _ in 0..config.monster_count {
            let Some(room) = lairs.choose(rng) else {
                break;
            };
            match free_cell(level, room, &used, rng) {
                Some(pos) => {
                    used.insert(pos);
                    level.actors.push(ActorSpawn {
                        kind: ActorKind::Monster,
                        position: pos,
                    });
                }
                None => warn!("No room left for a monster in room {}", room.id),
            }
        }

        if let Some(room) = lairs.choose(rng) {
            if let Some(pos) = free_cell(level, room, &used, rng) {
                used.insert(pos);
                level.actors.push(ActorSpawn {
                    kind: ActorKind::Mount,
                    position: pos,
                });
            }
        }

        for room in lairs {
            if !rng.gen_bool(config.prop_chance.clamp(0.0, 1.0)) {
                continue;
            }
            let Some(pos) = free_cell(level, room, &used, rng) else {
                continue;
            };
            let kind = if rng.gen_bool(0.5) {
                ObjectKind::Chest
            } else {
                ObjectKind::Barrel
            };
            level.objects.push(ObjectSpawn { kind, position: pos });
            if self.check_connectivity(level, rooms).is_err() {
                debug!("{:?} at {:?} would cut the level; dropped", kind, pos);
                level.objects.pop();
            } else {
                used.insert(pos);
            }
        }
    }

    /// Fails if a spawn, the base or any open room cell can't be reached
    /// from the player. Closed doors count as passable.
    fn check_connectivity(&self, level: &LevelDescription, rooms: &[Room]) -> GloamResult<()> {
        let Some(start) = level
            .actors
            .iter()
            .find(|spawn| spawn.kind == ActorKind::Player)
            .map(|spawn| spawn.position)
        else {
            return Err(GloamError::GenerationFailed("Level has no player start".to_string()));
        };

        let blocked = blocked_cells(level);
        let reached: HashSet<Position> = ::pathfinding::prelude::bfs_reach(start, |&pos| {
            pos.adjacent_positions()
                .into_iter()
                .filter(|next| is_open(level, *next) && !blocked.contains(next))
                .collect::<Vec<_>>()
        })
        .collect();

        let targets = level
            .actors
            .iter()
            .map(|spawn| spawn.position)
            .chain(level.base)
            .chain(
                rooms
                    .iter()
                    .flat_map(Room::floor_positions)
                    .filter(|pos| !blocked.contains(pos)),
            );
        for pos in targets {
            if !reached.contains(&pos) {
                return Err(GloamError::GenerationFailed(format!(
                    "{:?} is not reachable from the player at {:?}",
                    pos, start
                )));
            }
        }
        Ok(())
    }
}

fn is_open(level: &LevelDescription, pos: Position) -> bool {
    level
        .terrain_at(pos)
        .is_some_and(|terrain| !terrain.wall.blocks_movement())
}

/// Cells holding objects that can never be walked through.
fn blocked_cells(level: &LevelDescription) -> HashSet<Position> {
    level
        .objects
        .iter()
        .filter(|object| matches!(object.kind, ObjectKind::Chest | ObjectKind::Barrel))
        .map(|object| object.position)
        .collect()
}

/// An open cell flanked by walls on one axis and open on the other.
fn is_doorway(level: &LevelDescription, pos: Position) -> bool {
    if !is_open(level, pos) {
        return false;
    }
    let open = |dx, dy| is_open(level, pos.offset(dx, dy));
    let horizontal = open(-1, 0) && open(1, 0) && !open(0, -1) && !open(0, 1);
    let vertical = open(0, -1) && open(0, 1) && !open(-1, 0) && !open(1, 0);
    horizontal || vertical
}

/// A random open floor cell of `room` nobody has claimed.
fn free_cell(
    level: &LevelDescription,
    room: &Room,
    used: &HashSet<Position>,
    rng: &mut StdRng,
) -> Option<Position> {
    let candidates: Vec<Position> = room
        .floor_positions()
        .into_iter()
        .filter(|pos| is_open(level, *pos) && !used.contains(pos))
        .collect();
    candidates.choose(rng).copied()
}

impl Generator<LevelDescription> for RoomCorridorGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> GloamResult<LevelDescription> {
        config.validate()?;

        let mut level = LevelDescription::filled(
            format!("Depths {}", config.seed),
            config.width,
            config.height,
            Terrain::STONE_WALL,
        );
        level.dark = config.dark;

        let mut rooms = self.place_rooms(&mut level, config, rng)?;
        self.connect_rooms(&mut level, &mut rooms, config, rng);
        self.add_doors(&mut level, &rooms, config, rng);
        self.populate(&mut level, &rooms, config, rng);

        if self.ensure_connectivity {
            self.check_connectivity(&level, &rooms)?;
        }
        self.validate(&level, config)?;

        info!(
            "Generated '{}' with {} rooms, {} actors and {} objects",
            level.name,
            rooms.len(),
            level.actors.len(),
            level.objects.len()
        );
        Ok(level)
    }

    fn validate(&self, level: &LevelDescription, config: &GenerationConfig) -> GloamResult<()> {
        if (level.width, level.height) != (config.width, config.height) {
            return Err(GloamError::GenerationFailed(format!(
                "expected a {}x{} level, got {}x{}",
                config.width, config.height, level.width, level.height
            )));
        }
        validate_level(level)
    }

    fn generator_type(&self) -> &'static str {
        "RoomCorridorGenerator"
    }
}

impl Default for RoomCorridorGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a level from `config` with its own seeded generator.
pub fn generate_level(config: &GenerationConfig) -> GloamResult<LevelDescription> {
    RoomCorridorGenerator::new().generate(config, &mut create_rng(config))
}
