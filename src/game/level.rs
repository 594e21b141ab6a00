//! # Level Descriptions
//!
//! The textual format levels are loaded from and generated into.
//!
//! ```text
//! name = Old Crypt
//! dark = true
//! base = 4,2
//!
//! [terrain]
//! #######
//! #..,,.#
//! #..T..#
//! #######
//!
//! [entities]
//! .......
//! .@..m..
//! ....B..
//! .......
//! ```
//!
//! Header lines are `key = value`. The `[terrain]` layer has one character
//! per cell; the optional `[entities]` layer must have the same size. In the
//! entities layer `.` and spaces mean "nothing".

use crate::config::MAX_GRID_SIDE;
use crate::game::{ActorKind, FloorKind, Grid, ObjectKind, Position, WallKind};
use crate::{GloamError, GloamResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Floor and wall pair for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    pub floor: FloorKind,
    pub wall: WallKind,
}

impl Terrain {
    pub const FLOOR: Terrain = Terrain {
        floor: FloorKind::Stone,
        wall: WallKind::None,
    };
    pub const GRASS: Terrain = Terrain {
        floor: FloorKind::Grass,
        wall: WallKind::None,
    };
    pub const STONE_WALL: Terrain = Terrain {
        floor: FloorKind::Stone,
        wall: WallKind::Stone,
    };

    pub fn from_glyph(glyph: char) -> Option<Self> {
        let (floor, wall) = match glyph {
            '#' => (FloorKind::Stone, WallKind::Stone),
            '%' => (FloorKind::Stone, WallKind::Rubble),
            'T' => (FloorKind::Grass, WallKind::Tree),
            '~' => (FloorKind::Stone, WallKind::Hole),
            '.' => (FloorKind::Stone, WallKind::None),
            ',' => (FloorKind::Grass, WallKind::None),
            '=' => (FloorKind::Bridge, WallKind::None),
            _ => return None,
        };
        Some(Self { floor, wall })
    }

    pub fn glyph(self) -> char {
        match self.wall {
            WallKind::Stone => '#',
            WallKind::Rubble => '%',
            WallKind::Tree => 'T',
            WallKind::Hole => '~',
            WallKind::None => match self.floor {
                FloorKind::Stone => '.',
                FloorKind::Grass => ',',
                FloorKind::Bridge => '=',
            },
        }
    }
}

/// An actor to spawn when the level is instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpawn {
    pub kind: ActorKind,
    pub position: Position,
}

/// An object placed when the level is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpawn {
    pub kind: ObjectKind,
    pub position: Position,
}

/// A parsed level description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub name: String,
    pub dark: bool,
    /// Raid target; downhill maps flood from here
    pub base: Option<Position>,
    pub width: u32,
    pub height: u32,
    /// Row-major terrain
    pub terrain: Vec<Terrain>,
    pub actors: Vec<ActorSpawn>,
    pub objects: Vec<ObjectSpawn>,
}

/// A built level: the grid plus the actors waiting to be spawned.
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub base: Option<Position>,
    pub grid: Grid,
    pub spawns: Vec<ActorSpawn>,
}

#[derive(PartialEq)]
enum Section {
    Header,
    Terrain,
    Entities,
}

fn parse_error(line: usize, message: impl Into<String>) -> GloamError {
    GloamError::LevelParse {
        line,
        message: message.into(),
    }
}

fn parse_position(value: &str, line: usize) -> GloamResult<Position> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| parse_error(line, format!("expected x,y but found '{}'", value)))?;
    let x = x
        .trim()
        .parse()
        .map_err(|_| parse_error(line, format!("bad x coordinate '{}'", x.trim())))?;
    let y = y
        .trim()
        .parse()
        .map_err(|_| parse_error(line, format!("bad y coordinate '{}'", y.trim())))?;
    Ok(Position::new(x, y))
}

impl LevelDescription {
    /// A fully open level of the given size, mostly useful in tests.
    pub fn open(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::filled(name, width, height, Terrain::FLOOR)
    }

    /// A level where every cell has the same terrain.
    pub fn filled(name: impl Into<String>, width: u32, height: u32, terrain: Terrain) -> Self {
        Self {
            name: name.into(),
            dark: false,
            base: None,
            width,
            height,
            terrain: vec![terrain; (width * height) as usize],
            actors: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Overwrites one cell. Returns false when `pos` is outside the level.
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> bool {
        if self.terrain_at(pos).is_none() {
            return false;
        }
        let index = pos.y as usize * self.width as usize + pos.x as usize;
        self.terrain[index] = terrain;
        true
    }

    pub fn from_file(path: impl AsRef<Path>) -> GloamResult<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    pub fn terrain_at(&self, pos: Position) -> Option<Terrain> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        self.terrain
            .get(pos.y as usize * self.width as usize + pos.x as usize)
            .copied()
    }

    /// Builds the grid and places objects. Actors are spawned later by
    /// [`crate::GameState::from_level`].
    pub fn build(&self) -> GloamResult<Level> {
        let mut grid = Grid::new(self.width, self.height)?;
        for (pos, terrain) in grid.positions().collect::<Vec<_>>().into_iter().zip(&self.terrain) {
            grid.set_floor(pos, terrain.floor);
            grid.set_wall(pos, terrain.wall);
        }
        grid.set_dark(self.dark);
        for object in &self.objects {
            grid.set_object(object.position, object.kind)?;
        }

        log::info!(
            "Built level '{}' ({}x{}, {} actors, {} objects)",
            self.name,
            self.width,
            self.height,
            self.actors.len(),
            self.objects.len()
        );

        Ok(Level {
            name: self.name.clone(),
            base: self.base,
            grid,
            spawns: self.actors.clone(),
        })
    }
}

impl FromStr for LevelDescription {
    type Err = GloamError;

    fn from_str(text: &str) -> GloamResult<Self> {
        let mut name = String::from("unnamed");
        let mut dark = false;
        let mut base = None;
        let mut terrain_rows: Vec<(usize, &str)> = Vec::new();
        let mut entity_rows: Vec<(usize, &str)> = Vec::new();
        let mut section = Section::Header;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            match line.trim() {
                "[terrain]" => {
                    section = Section::Terrain;
                    continue;
                }
                "[entities]" => {
                    if terrain_rows.is_empty() {
                        return Err(parse_error(line_no, "[entities] before [terrain]"));
                    }
                    section = Section::Entities;
                    continue;
                }
                _ => {}
            }

            match section {
                Section::Header => {
                    if line.trim_start().starts_with("//") {
                        continue;
                    }
                    let (key, value) = line
                        .split_once('=')
                        .ok_or_else(|| parse_error(line_no, "expected 'key = value'"))?;
                    let value = value.trim();
                    match key.trim() {
                        "name" => name = value.to_string(),
                        "dark" => {
                            dark = value.parse().map_err(|_| {
                                parse_error(line_no, format!("dark must be true or false, not '{}'", value))
                            })?
                        }
                        "base" => base = Some(parse_position(value, line_no)?),
                        other => return Err(parse_error(line_no, format!("unknown key '{}'", other))),
                    }
                }
                Section::Terrain => terrain_rows.push((line_no, line)),
                Section::Entities => entity_rows.push((line_no, line)),
            }
        }

        let Some(&(first_line, first_row)) = terrain_rows.first() else {
            return Err(parse_error(text.lines().count().max(1), "missing [terrain] section"));
        };
        let width = first_row.chars().count() as u32;
        let height = terrain_rows.len() as u32;
        if width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
            return Err(parse_error(
                first_line,
                format!("level is {}x{}, larger than {}", width, height, MAX_GRID_SIDE),
            ));
        }

        let mut terrain = Vec::with_capacity((width * height) as usize);
        for &(line_no, row) in &terrain_rows {
            if row.chars().count() as u32 != width {
                return Err(parse_error(line_no, format!("terrain row is not {} cells wide", width)));
            }
            for glyph in row.chars() {
                let tile = Terrain::from_glyph(glyph)
                    .ok_or_else(|| parse_error(line_no, format!("unknown terrain '{}'", glyph)))?;
                terrain.push(tile);
            }
        }

        let mut description = LevelDescription {
            name,
            dark,
            base,
            width,
            height,
            terrain,
            actors: Vec::new(),
            objects: Vec::new(),
        };

        if !entity_rows.is_empty() && entity_rows.len() as u32 != height {
            return Err(parse_error(
                entity_rows[0].0,
                format!("entities layer has {} rows, terrain has {}", entity_rows.len(), height),
            ));
        }
        for (y, &(line_no, row)) in entity_rows.iter().enumerate() {
            if row.chars().count() as u32 > width {
                return Err(parse_error(line_no, format!("entities row is wider than {}", width)));
            }
            for (x, glyph) in row.chars().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                if glyph == '.' || glyph == ' ' {
                    continue;
                }
                let blocked = description
                    .terrain_at(pos)
                    .is_some_and(|t| t.wall.blocks_movement());
                if blocked {
                    return Err(parse_error(line_no, format!("'{}' placed on a wall at {:?}", glyph, pos)));
                }
                if glyph == 'B' {
                    description.base = Some(pos);
                } else if let Some(kind) = ActorKind::from_glyph(glyph) {
                    description.actors.push(ActorSpawn { kind, position: pos });
                } else if let Some(kind) = ObjectKind::from_glyph(glyph) {
                    description.objects.push(ObjectSpawn { kind, position: pos });
                } else {
                    return Err(parse_error(line_no, format!("unknown entity '{}'", glyph)));
                }
            }
        }

        if let Some(base) = description.base {
            if description.terrain_at(base).is_none() {
                return Err(parse_error(first_line, format!("base {:?} is outside the level", base)));
            }
        }

        Ok(description)
    }
}

impl fmt::Display for LevelDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name = {}", self.name)?;
        writeln!(f, "dark = {}", self.dark)?;
        if let Some(base) = self.base {
            writeln!(f, "base = {},{}", base.x, base.y)?;
        }
        writeln!(f)?;
        writeln!(f, "[terrain]")?;
        for row in self.terrain.chunks(self.width.max(1) as usize) {
            let line: String = row.iter().map(|t| t.glyph()).collect();
            writeln!(f, "{}", line)?;
        }

        if self.actors.is_empty() && self.objects.is_empty() {
            return Ok(());
        }
        let mut layer = vec!['.'; (self.width * self.height) as usize];
        let mut put = |pos: Position, glyph: char| {
            if let Some(slot) = layer.get_mut(pos.y as usize * self.width as usize + pos.x as usize) {
                *slot = glyph;
            }
        };
        for object in &self.objects {
            put(object.position, object.kind.glyph());
        }
        for actor in &self.actors {
            put(actor.position, actor.kind.glyph());
        }
        writeln!(f)?;
        writeln!(f, "[entities]")?;
        for row in layer.chunks(self.width.max(1) as usize) {
            let line: String = row.iter().collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
