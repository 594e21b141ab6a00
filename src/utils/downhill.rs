//! # Downhill Maps
//!
//! A distance field flooded outward from a single source cell. Actors that
//! share a destination, such as raiders heading for the base, step
//! "downhill" through it instead of running a search each turn.

use crate::game::{ActorKind, Grid, Position};
use ::pathfinding::prelude::dijkstra_all;
use serde::{Deserialize, Serialize};

/// Distances at or beyond this are treated as unreachable.
pub const UNREACHABLE_DISTANCE: u32 = 255;

/// Per-cell step counts to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownhillMap {
    width: u32,
    height: u32,
    source: Position,
    distances: Vec<Option<u8>>,
    revision: u64,
}

impl DownhillMap {
    /// Floods the grid from `source` with uniform 8-directional steps.
    ///
    /// Terrain walls and cells outside the grid are never expanded; actors
    /// and objects are ignored so the map only changes with terrain.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::{DownhillMap, Grid, Position};
    ///
    /// let grid = Grid::new(8, 8).unwrap();
    /// let map = DownhillMap::build(&grid, Position::new(0, 0));
    /// assert_eq!(map.distance(Position::new(0, 0)), Some(0));
    /// assert_eq!(map.distance(Position::new(3, 5)), Some(5));
    /// ```
    pub fn build(grid: &Grid, source: Position) -> Self {
        let width = grid.width();
        let height = grid.height();
        let mut distances = vec![None; (width * height) as usize];

        if grid.contains(source) {
            let reached = dijkstra_all(&source, |&pos: &Position| {
                pos.adjacent_positions()
                    .into_iter()
                    .filter(|&next| !grid.is_wall(next, false))
                    .map(|next| (next, 1u32))
                    .collect::<Vec<_>>()
            });

            distances[Self::slot(width, source)] = Some(0);
            for (pos, (_, cost)) in reached {
                if cost < UNREACHABLE_DISTANCE {
                    distances[Self::slot(width, pos)] = Some(cost as u8);
                }
            }
        }

        log::debug!(
            "Built downhill map from {:?} (topology revision {})",
            source,
            grid.topology_revision()
        );

        Self {
            width,
            height,
            source,
            distances,
            revision: grid.topology_revision(),
        }
    }

    fn slot(width: u32, pos: Position) -> usize {
        pos.y as usize * width as usize + pos.x as usize
    }

    pub fn source(&self) -> Position {
        self.source
    }

    /// Topology revision of the grid the map was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the grid's walls changed since the build.
    pub fn is_stale(&self, grid: &Grid) -> bool {
        self.revision != grid.topology_revision()
            || self.width != grid.width()
            || self.height != grid.height()
    }

    /// Steps to the source, or `None` when unreachable or out of bounds.
    pub fn distance(&self, pos: Position) -> Option<u8> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        self.distances[Self::slot(self.width, pos)]
    }

    /// Picks the next cell toward the source.
    ///
    /// Only neighbours strictly closer than `from` qualify, and neighbours
    /// holding an actor of the `avoid` kind are skipped. Among equally close
    /// neighbours one on the same row wins. Returns `from` when nothing is
    /// closer.
    pub fn downhill(&self, grid: &Grid, from: Position, avoid: Option<ActorKind>) -> Position {
        let Some(current) = self.distance(from) else {
            return from;
        };

        let mut best: Option<(Position, u8)> = None;
        for next in from.adjacent_positions() {
            let Some(distance) = self.distance(next) else {
                continue;
            };
            if distance >= current {
                continue;
            }
            if avoid.is_some() && grid.actor_kind_at(next) == avoid {
                continue;
            }
            best = match best {
                None => Some((next, distance)),
                Some((_, best_distance)) if distance < best_distance => Some((next, distance)),
                Some((chosen, best_distance))
                    if distance == best_distance && next.y == from.y && chosen.y != from.y =>
                {
                    Some((next, distance))
                }
                other => other,
            };
        }

        best.map(|(pos, _)| pos).unwrap_or(from)
    }
}
