//! # Grid
//!
//! The level's cell array: terrain, occupancy handles and discovery state.
//!
//! Every query fails closed. Anything outside the grid is a wall, blocks
//! light and holds nothing, so the simulation keeps running through
//! transient bad coordinates (for example during a level transition).

use crate::config::{MAX_GRID_SIDE, TREE_CLEAR_DISTANCE};
use crate::game::{ActorId, ActorKind, Object, ObjectId, ObjectKind, Position};
use crate::{GloamError, GloamResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Walkable ground. Purely cosmetic for the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FloorKind {
    #[default]
    Stone,
    Grass,
    Bridge,
}

/// Obstacle terrain layered over the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WallKind {
    /// Walkable
    #[default]
    None,
    Stone,
    Rubble,
    /// Blocks movement; blocks light only past [`TREE_CLEAR_DISTANCE`]
    Tree,
    /// Chasm: blocks movement, never blocks light
    Hole,
}

impl WallKind {
    pub fn blocks_movement(self) -> bool {
        self != WallKind::None
    }

    /// Whether this terrain stops light at `distance` rows from the viewer.
    pub fn blocks_light(self, distance: u32) -> bool {
        match self {
            WallKind::None | WallKind::Hole => false,
            WallKind::Tree => distance > TREE_CLEAR_DISTANCE,
            WallKind::Stone | WallKind::Rubble => true,
        }
    }
}

/// Non-owning reference from a cell to the actor standing on it.
///
/// The kind is copied in so movement rules can filter by kind without
/// reaching back into the actor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorHandle {
    pub id: ActorId,
    pub kind: ActorKind,
}

/// A single grid cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub floor: FloorKind,
    pub wall: WallKind,
    actor: Option<ActorHandle>,
    object: Option<ObjectId>,
    pub discovered: bool,
    /// Largest sight radius last cast from this cell; memoizes FOV.
    pub last_visibility_radius: u8,
}

impl Cell {
    pub fn actor(&self) -> Option<ActorHandle> {
        self.actor
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }
}

/// The 2D cell array for one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    objects: BTreeMap<ObjectId, Object>,
    next_object_id: u32,
    topology_revision: u64,
    dark: bool,
}

impl Grid {
    /// Creates an open grid: floor everywhere, no walls.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::{Grid, Position};
    ///
    /// let grid = Grid::new(10, 10).unwrap();
    /// assert!(!grid.is_wall(Position::new(3, 3), false));
    /// assert!(grid.is_wall(Position::new(-1, 3), false)); // out of bounds
    /// ```
    pub fn new(width: u32, height: u32) -> GloamResult<Self> {
        if width == 0 || height == 0 || width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
            return Err(GloamError::InvalidState(format!(
                "Grid size {}x{} outside 1..={}",
                width, height, MAX_GRID_SIDE
            )));
        }

        Ok(Self {
            width,
            height,
            cells: vec![Cell::default(); (width * height) as usize],
            objects: BTreeMap::new(),
            next_object_id: 1,
            topology_revision: 0,
            dark: false,
        })
    }

    /// Creates a grid filled with the given wall kind.
    pub fn filled(width: u32, height: u32, wall: WallKind) -> GloamResult<Self> {
        let mut grid = Self::new(width, height)?;
        for cell in &mut grid.cells {
            cell.wall = wall;
        }
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the level only shows what is currently lit.
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.dark = dark;
    }

    /// Bumped on every change to movement-blocking terrain.
    pub fn topology_revision(&self) -> u64 {
        self.topology_revision
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index(pos).map(move |i| &mut self.cells[i])
    }

    /// Iterates every in-bounds position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    pub fn wall_at(&self, pos: Position) -> Option<WallKind> {
        self.cell(pos).map(|cell| cell.wall)
    }

    pub fn floor_at(&self, pos: Position) -> Option<FloorKind> {
        self.cell(pos).map(|cell| cell.floor)
    }

    /// Replaces the terrain obstacle at `pos`. Returns false when out of bounds.
    pub fn set_wall(&mut self, pos: Position, wall: WallKind) -> bool {
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        let changed = cell.wall.blocks_movement() != wall.blocks_movement();
        cell.wall = wall;
        if changed {
            self.topology_revision += 1;
        }
        true
    }

    pub fn set_floor(&mut self, pos: Position, floor: FloorKind) -> bool {
        match self.cell_mut(pos) {
            Some(cell) => {
                cell.floor = floor;
                true
            }
            None => false,
        }
    }

    /// Movement test. Out of bounds counts as wall.
    ///
    /// With `check_occupying`, a cell holding an actor or an impassable
    /// object is also a wall even when the terrain is open.
    pub fn is_wall(&self, pos: Position, check_occupying: bool) -> bool {
        let Some(cell) = self.cell(pos) else {
            return true;
        };
        if cell.wall.blocks_movement() {
            return true;
        }
        if check_occupying {
            if cell.actor.is_some() {
                return true;
            }
            if let Some(object) = cell.object.and_then(|id| self.objects.get(&id)) {
                return !object.is_passable();
            }
        }
        false
    }

    /// Sight test for a cell `distance` rows from the viewer.
    pub fn is_light_blocked(&self, pos: Position, distance: u32) -> bool {
        let Some(cell) = self.cell(pos) else {
            return true;
        };
        if cell.wall.blocks_light(distance) {
            return true;
        }
        cell.object
            .and_then(|id| self.objects.get(&id))
            .is_some_and(Object::blocks_light)
    }

    pub fn actor_at(&self, pos: Position) -> Option<ActorId> {
        self.cell(pos).and_then(|cell| cell.actor).map(|handle| handle.id)
    }

    pub fn actor_kind_at(&self, pos: Position) -> Option<ActorKind> {
        self.cell(pos).and_then(|cell| cell.actor).map(|handle| handle.kind)
    }

    /// Writes an occupancy handle. Does not clear any previous cell.
    ///
    /// Only [`crate::GameState`] calls this so the actor's own position
    /// stays in step with the cell.
    pub(crate) fn set_actor(&mut self, pos: Position, handle: Option<ActorHandle>) -> bool {
        match self.cell_mut(pos) {
            Some(cell) => {
                cell.actor = handle;
                true
            }
            None => false,
        }
    }

    pub fn object_at(&self, pos: Position) -> Option<&Object> {
        self.cell(pos)
            .and_then(|cell| cell.object)
            .and_then(|id| self.objects.get(&id))
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// Places a new object. Fails if the cell is out of bounds or already
    /// holds an object.
    pub fn set_object(&mut self, pos: Position, kind: ObjectKind) -> GloamResult<ObjectId> {
        let id = ObjectId(self.next_object_id);
        let cell = self
            .cell_mut(pos)
            .ok_or_else(|| GloamError::InvalidAction(format!("Object outside grid at {:?}", pos)))?;
        if cell.object.is_some() {
            return Err(GloamError::InvalidAction(format!(
                "Cell {:?} already holds an object",
                pos
            )));
        }
        cell.object = Some(id);
        self.next_object_id += 1;
        self.objects.insert(id, Object::new(id, kind, pos));
        Ok(id)
    }

    /// Removes an object and frees its cell.
    pub fn erase_object(&mut self, id: ObjectId) -> Option<Object> {
        let object = self.objects.remove(&id)?;
        if let Some(cell) = self.cell_mut(object.position()) {
            if cell.object == Some(id) {
                cell.object = None;
            }
        }
        Some(object)
    }

    pub fn is_discovered(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(|cell| cell.discovered)
    }

    pub fn discovered_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.discovered).count()
    }

    /// Forgets everything seen, including FOV memos.
    pub fn reset_discovery(&mut self) {
        for cell in &mut self.cells {
            cell.discovered = false;
            cell.last_visibility_radius = 0;
        }
    }

    /// Clears every FOV memo, leaving discovery untouched.
    pub(crate) fn clear_visibility_memos(&mut self) {
        for cell in &mut self.cells {
            cell.last_visibility_radius = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u32, kind: ActorKind) -> Option<ActorHandle> {
        Some(ActorHandle {
            id: ActorId(id),
            kind,
        })
    }

    #[test]
    fn test_grid_size_limits() {
        assert!(Grid::new(0, 10).is_err());
        assert!(Grid::new(256, 10).is_err());
        assert!(Grid::new(255, 255).is_ok());
    }

    #[test]
    fn test_out_of_bounds_fails_closed() {
        let grid = Grid::new(5, 5).unwrap();
        for pos in [Position::new(-1, 0), Position::new(5, 0), Position::new(0, 5)] {
            assert!(grid.is_wall(pos, false));
            assert!(grid.is_light_blocked(pos, 1));
            assert!(grid.actor_at(pos).is_none());
            assert!(grid.object_at(pos).is_none());
            assert!(!grid.is_discovered(pos));
        }
    }

    #[test]
    fn test_occupancy_counts_as_wall_only_when_asked() {
        let mut grid = Grid::new(5, 5).unwrap();
        let pos = Position::new(2, 2);
        grid.set_actor(pos, handle(1, ActorKind::Monster));

        assert!(!grid.is_wall(pos, false));
        assert!(grid.is_wall(pos, true));
        assert_eq!(grid.actor_at(pos), Some(ActorId(1)));
        assert_eq!(grid.actor_kind_at(pos), Some(ActorKind::Monster));
    }

    #[test]
    fn test_impassable_objects_block_movement() {
        let mut grid = Grid::new(5, 5).unwrap();
        let barrel = Position::new(1, 1);
        let lever = Position::new(2, 1);
        grid.set_object(barrel, ObjectKind::Barrel).unwrap();
        grid.set_object(lever, ObjectKind::Lever { pulled: false }).unwrap();

        assert!(grid.is_wall(barrel, true));
        assert!(!grid.is_wall(barrel, false));
        assert!(!grid.is_wall(lever, true));
        assert!(grid.set_object(barrel, ObjectKind::Chest).is_err());
    }

    #[test]
    fn test_light_rules_per_terrain() {
        let mut grid = Grid::new(5, 5).unwrap();
        let hole = Position::new(1, 1);
        let tree = Position::new(2, 2);
        let stone = Position::new(3, 3);
        grid.set_wall(hole, WallKind::Hole);
        grid.set_wall(tree, WallKind::Tree);
        grid.set_wall(stone, WallKind::Stone);

        assert!(grid.is_wall(hole, false));
        assert!(!grid.is_light_blocked(hole, 4));

        assert!(!grid.is_light_blocked(tree, 1));
        assert!(grid.is_light_blocked(tree, 2));

        assert!(grid.is_light_blocked(stone, 1));
    }

    #[test]
    fn test_closed_door_blocks_light() {
        let mut grid = Grid::new(5, 5).unwrap();
        let pos = Position::new(2, 2);
        let id = grid.set_object(pos, ObjectKind::Door { open: false }).unwrap();
        assert!(grid.is_light_blocked(pos, 1));

        grid.object_mut(id).unwrap().interact();
        assert!(!grid.is_light_blocked(pos, 1));
    }

    #[test]
    fn test_erase_object_frees_cell() {
        let mut grid = Grid::new(5, 5).unwrap();
        let pos = Position::new(4, 4);
        let id = grid.set_object(pos, ObjectKind::Chest).unwrap();
        let erased = grid.erase_object(id).unwrap();
        assert_eq!(erased.position(), pos);
        assert!(grid.object_at(pos).is_none());
        assert!(grid.erase_object(id).is_none());
    }

    #[test]
    fn test_topology_revision_tracks_blocking_changes() {
        let mut grid = Grid::new(5, 5).unwrap();
        let pos = Position::new(1, 2);
        let start = grid.topology_revision();

        grid.set_wall(pos, WallKind::Stone);
        assert_eq!(grid.topology_revision(), start + 1);

        // Stone -> tree keeps the cell blocked, no topology change.
        grid.set_wall(pos, WallKind::Tree);
        assert_eq!(grid.topology_revision(), start + 1);

        grid.set_wall(pos, WallKind::None);
        assert_eq!(grid.topology_revision(), start + 2);
        assert!(!grid.set_wall(Position::new(9, 9), WallKind::Stone));
    }

    #[test]
    fn test_positions_row_major() {
        let grid = Grid::new(3, 2).unwrap();
        let all: Vec<_> = grid.positions().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], Position::new(0, 0));
        assert_eq!(all[3], Position::new(0, 1));
    }
}
