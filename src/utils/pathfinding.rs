//! # Pathfinding Algorithms
//!
//! A* search over the grid for player and monster movement.
//!
//! The search stops as soon as the goal is *generated* rather than when it
//! is popped from the open list. Movement code relies on the paths this
//! produces, so the early exit is kept as-is.

use crate::game::{ActorKind, Grid, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::SQRT_2;

/// Which neighbours a step may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Orthogonal steps only
    Four,
    /// Orthogonal and diagonal steps
    #[default]
    Eight,
}

impl Connectivity {
    /// Neighbour offsets with their step cost.
    fn steps(self) -> &'static [(i32, i32, f64)] {
        const EIGHT: [(i32, i32, f64); 8] = [
            (0, -1, 1.0),
            (-1, 0, 1.0),
            (1, 0, 1.0),
            (0, 1, 1.0),
            (-1, -1, SQRT_2),
            (1, -1, SQRT_2),
            (-1, 1, SQRT_2),
            (1, 1, SQRT_2),
        ];
        match self {
            Connectivity::Four => &EIGHT[..4],
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// Node for the A* working set.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub position: Position,
    /// Accumulated cost from the start
    pub g: f64,
    /// Euclidean estimate to the goal
    pub h: f64,
    pub f: f64,
    /// Index of the parent in the working set
    pub parent: Option<usize>,
    closed: bool,
}

impl PathNode {
    fn new(position: Position, g: f64, h: f64, parent: Option<usize>) -> Self {
        Self {
            position,
            g,
            h,
            f: g + h,
            parent,
            closed: false,
        }
    }
}

/// A found route, stored as a stack.
///
/// The goal sits at the bottom and the next step on top, so walking the
/// path is a sequence of [`Path::goto`] / [`Path::step`] calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    steps: Vec<Position>,
    cost: f64,
}

impl Path {
    /// Builds a path from steps in walking order.
    pub fn from_steps(walk: Vec<Position>, cost: f64) -> Self {
        let mut steps = walk;
        steps.reverse();
        Self { steps, cost }
    }

    /// Next cell to move into, without consuming it.
    pub fn goto(&self) -> Option<Position> {
        self.steps.last().copied()
    }

    /// Consumes the next cell.
    pub fn step(&mut self) -> Option<Position> {
        self.steps.pop()
    }

    /// Final cell of the path, without consuming anything.
    pub fn destination(&self) -> Option<Position> {
        self.steps.first().copied()
    }

    /// Summed step cost at the goal as found by the search.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Remaining steps in walking order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.steps.iter().rev().copied()
    }
}

/// Finds a path from `start` to `end`.
///
/// Neighbours are skipped when they are terrain walls, hold an actor of the
/// `blocking` kind, or hold an impassable object (the goal excepted). Returns
/// `None` when `end` is a wall, equals `start`, or cannot be reached.
///
/// # Examples
///
/// ```
/// use gloam::{find_path, Connectivity, Grid, Position};
///
/// let grid = Grid::new(10, 10).unwrap();
/// let path = find_path(&grid, Position::new(0, 0), Position::new(3, 3), None, Connectivity::Eight)
///     .unwrap();
/// assert_eq!(path.len(), 3);
/// assert!((path.cost() - 3.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
/// ```
pub fn find_path(
    grid: &Grid,
    start: Position,
    end: Position,
    blocking: Option<ActorKind>,
    connectivity: Connectivity,
) -> Option<Path> {
    if start == end || grid.is_wall(end, false) {
        return None;
    }

    let mut nodes = vec![PathNode::new(start, 0.0, start.euclidean_distance(end), None)];
    let mut index: HashMap<Position, usize> = HashMap::from([(start, 0)]);
    // Insertion-ordered so equal f values resolve to the earliest node.
    let mut open: Vec<usize> = vec![0];

    while !open.is_empty() {
        let mut best = 0;
        for (slot, &node) in open.iter().enumerate().skip(1) {
            if nodes[node].f < nodes[open[best]].f {
                best = slot;
            }
        }
        let current = open.remove(best);
        nodes[current].closed = true;
        let origin = nodes[current].position;

        for &(dx, dy, step_cost) in connectivity.steps() {
            let neighbor = origin.offset(dx, dy);
            if grid.is_wall(neighbor, false) {
                continue;
            }
            if blocking.is_some() && grid.actor_kind_at(neighbor) == blocking {
                continue;
            }
            if neighbor != end && grid.object_at(neighbor).is_some_and(|o| !o.is_passable()) {
                continue;
            }

            let g = nodes[current].g + step_cost;
            let slot = match index.get(&neighbor) {
                Some(&existing) if nodes[existing].closed => continue,
                Some(&existing) => {
                    let node = &mut nodes[existing];
                    if g < node.g {
                        node.g = g;
                        node.f = g + node.h;
                        node.parent = Some(current);
                    }
                    existing
                }
                None => {
                    nodes.push(PathNode::new(
                        neighbor,
                        g,
                        neighbor.euclidean_distance(end),
                        Some(current),
                    ));
                    let slot = nodes.len() - 1;
                    index.insert(neighbor, slot);
                    open.push(slot);
                    slot
                }
            };

            if neighbor == end {
                return Some(reconstruct(&nodes, slot));
            }
        }
    }

    None
}

fn reconstruct(nodes: &[PathNode], goal: usize) -> Path {
    // Goal first, start excluded: already in stack order.
    let mut steps = Vec::new();
    let mut cursor = Some(goal);
    while let Some(slot) = cursor {
        let node = &nodes[slot];
        if node.parent.is_none() {
            break;
        }
        steps.push(node.position);
        cursor = node.parent;
    }
    Path {
        steps,
        cost: nodes[goal].g,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActorHandle, ActorId, ObjectKind, WallKind};

    fn open_grid() -> Grid {
        Grid::new(10, 10).unwrap()
    }

    #[test]
    fn test_open_grid_diagonal_path() {
        let grid = open_grid();
        let mut path =
            find_path(&grid, Position::new(0, 0), Position::new(3, 3), None, Connectivity::Eight)
                .unwrap();
        assert_eq!(path.len(), 3);
        assert!((path.cost() - 4.2426).abs() < 1e-3);
        assert_eq!(path.destination(), Some(Position::new(3, 3)));
        assert_eq!(path.goto(), Some(Position::new(1, 1)));
        assert_eq!(path.step(), Some(Position::new(1, 1)));
        assert_eq!(path.step(), Some(Position::new(2, 2)));
        assert_eq!(path.step(), Some(Position::new(3, 3)));
        assert!(path.step().is_none());
    }

    #[test]
    fn test_returns_when_goal_is_first_generated() {
        // (1, 0) and (1, 1) tie on f; the earlier one is expanded and
        // generates the goal, ending the search before (1, 1) is popped.
        let grid = open_grid();
        let path =
            find_path(&grid, Position::new(0, 0), Position::new(2, 1), None, Connectivity::Eight)
                .unwrap();
        let route: Vec<_> = path.iter().collect();
        assert_eq!(route, vec![Position::new(1, 0), Position::new(2, 1)]);
        assert!((path.cost() - (1.0 + SQRT_2)).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_wall_goal_and_same_cell() {
        let mut grid = open_grid();
        grid.set_wall(Position::new(4, 4), WallKind::Stone);
        let start = Position::new(0, 0);
        assert!(find_path(&grid, start, Position::new(4, 4), None, Connectivity::Eight).is_none());
        assert!(find_path(&grid, start, start, None, Connectivity::Eight).is_none());
        assert!(find_path(&grid, start, Position::new(20, 0), None, Connectivity::Eight).is_none());
    }

    #[test]
    fn test_wall_with_gap() {
        let mut grid = open_grid();
        for y in 0..10 {
            if y != 6 {
                grid.set_wall(Position::new(5, y), WallKind::Stone);
            }
        }
        let path =
            find_path(&grid, Position::new(1, 1), Position::new(8, 1), None, Connectivity::Eight)
                .unwrap();
        let crossing: Vec<_> = path.iter().filter(|p| p.x == 5).collect();
        assert_eq!(crossing, vec![Position::new(5, 6)]);
    }

    #[test]
    fn test_unreachable_goal() {
        let mut grid = open_grid();
        for y in 0..10 {
            grid.set_wall(Position::new(5, y), WallKind::Stone);
        }
        assert!(
            find_path(&grid, Position::new(1, 1), Position::new(8, 1), None, Connectivity::Eight)
                .is_none()
        );
    }

    #[test]
    fn test_four_connectivity_uses_orthogonal_steps() {
        let grid = open_grid();
        let path =
            find_path(&grid, Position::new(0, 0), Position::new(3, 3), None, Connectivity::Four)
                .unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path.cost(), 6.0);
        let mut previous = Position::new(0, 0);
        for step in path.iter() {
            assert_eq!(previous.manhattan_distance(step), 1);
            previous = step;
        }
    }

    #[test]
    fn test_blocking_kind_is_routed_around() {
        let mut grid = open_grid();
        for y in 0..10 {
            if y != 4 {
                grid.set_wall(Position::new(5, y), WallKind::Stone);
            }
        }
        grid.set_actor(
            Position::new(5, 4),
            Some(ActorHandle {
                id: ActorId(9),
                kind: ActorKind::Monster,
            }),
        );

        let start = Position::new(1, 4);
        let end = Position::new(8, 4);
        assert!(find_path(&grid, start, end, None, Connectivity::Eight).is_some());
        assert!(find_path(&grid, start, end, Some(ActorKind::Hero), Connectivity::Eight).is_some());
        assert!(
            find_path(&grid, start, end, Some(ActorKind::Monster), Connectivity::Eight).is_none()
        );
    }

    #[test]
    fn test_impassable_object_blocks_except_at_goal() {
        let mut grid = open_grid();
        for y in 0..10 {
            if y != 4 {
                grid.set_wall(Position::new(5, y), WallKind::Stone);
            }
        }
        grid.set_object(Position::new(5, 4), ObjectKind::Door { open: false })
            .unwrap();
        let start = Position::new(1, 4);
        assert!(find_path(&grid, start, Position::new(8, 4), None, Connectivity::Eight).is_none());

        let to_door = find_path(&grid, start, Position::new(5, 4), None, Connectivity::Eight)
            .unwrap();
        assert_eq!(to_door.destination(), Some(Position::new(5, 4)));
    }
}
