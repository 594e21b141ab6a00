//! # Field of View
//!
//! Recursive shadowcasting over eight octants. One canonical octant scan is
//! mapped onto the others with a table of transform multipliers.

use crate::game::{Grid, Position};

/// Octant transforms: `xx`, `xy`, `yx`, `yy` rows, one column per octant.
const MULTIPLIERS: [[i32; 8]; 4] = [
    [1, 0, 0, -1, -1, 0, 0, 1],
    [0, 1, -1, 0, 0, -1, 1, 0],
    [0, 1, 1, 0, 0, -1, -1, 0],
    [1, 0, 0, 1, -1, 0, 0, -1],
];

/// Outcome of one [`compute_fov`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FovReport {
    /// Cells whose discovered flag flipped, in row-major order
    pub changed: Vec<Position>,
    /// The memo matched and nothing was recomputed
    pub skipped: bool,
}

struct Octant {
    xx: i32,
    xy: i32,
    yx: i32,
    yy: i32,
}

struct Caster<'a> {
    grid: &'a Grid,
    origin: Position,
    radius: i32,
    lit: Vec<bool>,
}

impl Caster<'_> {
    fn light(&mut self, pos: Position) {
        if self.grid.contains(pos) {
            let slot = pos.y as usize * self.grid.width() as usize + pos.x as usize;
            self.lit[slot] = true;
        }
    }

    fn cast(&mut self, row: i32, mut start: f64, end: f64, octant: &Octant) {
        if start < end {
            return;
        }
        let radius_squared = self.radius * self.radius;
        let mut next_start = start;

        for j in row..=self.radius {
            let mut dx = -j - 1;
            let dy = -j;
            let mut blocked = false;

            while dx <= 0 {
                dx += 1;
                let pos = Position::new(
                    self.origin.x + dx * octant.xx + dy * octant.xy,
                    self.origin.y + dx * octant.yx + dy * octant.yy,
                );
                let left_slope = (f64::from(dx) - 0.5) / (f64::from(dy) + 0.5);
                let right_slope = (f64::from(dx) + 0.5) / (f64::from(dy) - 0.5);

                if start < right_slope {
                    continue;
                }
                if end > left_slope {
                    break;
                }

                if dx * dx + dy * dy < radius_squared {
                    self.light(pos);
                }

                let opaque = self.grid.is_light_blocked(pos, j as u32);
                if blocked {
                    if opaque {
                        next_start = right_slope;
                        continue;
                    }
                    blocked = false;
                    start = next_start;
                } else if opaque && j < self.radius {
                    blocked = true;
                    self.cast(j + 1, start, left_slope, octant);
                    next_start = right_slope;
                }
            }

            if blocked {
                break;
            }
        }
    }
}

/// Marks cells visible from `origin` within `radius` as discovered.
///
/// Skipped entirely when `force` is false and the origin cell's memo
/// already covers `radius`. On dark grids, every cell not lit by this call
/// is forgotten and every memo except the origin's is cleared.
///
/// # Examples
///
/// ```
/// use gloam::{compute_fov, Grid, Position};
///
/// let mut grid = Grid::new(10, 10).unwrap();
/// let report = compute_fov(&mut grid, Position::new(5, 5), 3, false);
/// assert!(!report.skipped);
/// assert!(grid.is_discovered(Position::new(6, 6)));
///
/// let again = compute_fov(&mut grid, Position::new(5, 5), 2, false);
/// assert!(again.skipped);
/// ```
pub fn compute_fov(grid: &mut Grid, origin: Position, radius: u8, force: bool) -> FovReport {
    let Some(cell) = grid.cell(origin) else {
        return FovReport {
            changed: Vec::new(),
            skipped: true,
        };
    };
    if !force && cell.last_visibility_radius >= radius {
        return FovReport {
            changed: Vec::new(),
            skipped: true,
        };
    }

    let cell_count = (grid.width() * grid.height()) as usize;
    let lit = {
        let mut caster = Caster {
            grid: &*grid,
            origin,
            radius: i32::from(radius),
            lit: vec![false; cell_count],
        };
        caster.light(origin);
        for column in 0..8 {
            let octant = Octant {
                xx: MULTIPLIERS[0][column],
                xy: MULTIPLIERS[1][column],
                yx: MULTIPLIERS[2][column],
                yy: MULTIPLIERS[3][column],
            };
            caster.cast(1, 1.0, 0.0, &octant);
        }
        caster.lit
    };

    let dark = grid.is_dark();
    let positions: Vec<Position> = grid.positions().collect();
    let mut changed = Vec::new();
    for (pos, now_lit) in positions.into_iter().zip(lit) {
        let Some(cell) = grid.cell_mut(pos) else {
            continue;
        };
        let discovered = if dark { now_lit } else { cell.discovered || now_lit };
        if discovered != cell.discovered {
            cell.discovered = discovered;
            changed.push(pos);
        }
    }

    if dark {
        grid.clear_visibility_memos();
    }
    if let Some(cell) = grid.cell_mut(origin) {
        cell.last_visibility_radius = if dark {
            radius
        } else {
            cell.last_visibility_radius.max(radius)
        };
    }

    FovReport {
        changed,
        skipped: false,
    }
}

/// Bresenham sight line between two cells.
///
/// Only the cells strictly between the endpoints are tested, each at its
/// Chebyshev distance from `from`.
pub fn has_line_of_sight(grid: &Grid, from: Position, to: Position) -> bool {
    if !grid.contains(from) || !grid.contains(to) {
        return false;
    }

    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = from;

    while current != to {
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            current.x += sx;
        }
        if doubled <= dx {
            err += dx;
            current.y += sy;
        }
        if current != to && grid.is_light_blocked(current, from.chebyshev_distance(current)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ObjectKind, WallKind};

    #[test]
    fn test_origin_always_discovered() {
        let mut grid = Grid::filled(5, 5, WallKind::Stone).unwrap();
        compute_fov(&mut grid, Position::new(2, 2), 0, true);
        assert!(grid.is_discovered(Position::new(2, 2)));
        assert_eq!(grid.discovered_count(), 1);
    }

    #[test]
    fn test_radius_is_circular() {
        let mut grid = Grid::new(21, 21).unwrap();
        let origin = Position::new(10, 10);
        compute_fov(&mut grid, origin, 5, false);
        assert!(grid.is_discovered(Position::new(14, 10)));
        assert!(!grid.is_discovered(Position::new(15, 10)));
        // 4² + 3² = 25 is not inside 5².
        assert!(!grid.is_discovered(Position::new(14, 13)));
        assert!(grid.is_discovered(Position::new(13, 13)));
    }

    #[test]
    fn test_wall_casts_shadow() {
        let mut grid = Grid::new(15, 11).unwrap();
        for y in 0..11 {
            grid.set_wall(Position::new(7, y), WallKind::Stone);
        }
        compute_fov(&mut grid, Position::new(5, 5), 8, false);
        assert!(grid.is_discovered(Position::new(7, 5)));
        for y in 0..11 {
            for x in 8..15 {
                assert!(!grid.is_discovered(Position::new(x, y)), "saw ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_memo_skips_smaller_radius() {
        let mut grid = Grid::new(10, 10).unwrap();
        let origin = Position::new(5, 5);
        let first = compute_fov(&mut grid, origin, 3, false);
        assert!(!first.changed.is_empty());
        let before = grid.clone();

        let second = compute_fov(&mut grid, origin, 2, false);
        assert!(second.skipped);
        assert!(second.changed.is_empty());
        assert_eq!(grid.discovered_count(), before.discovered_count());

        let forced = compute_fov(&mut grid, origin, 2, true);
        assert!(!forced.skipped);
        assert!(forced.changed.is_empty());
        assert_eq!(grid.cell(origin).unwrap().last_visibility_radius, 3);
    }

    #[test]
    fn test_larger_radius_recomputes() {
        let mut grid = Grid::new(20, 20).unwrap();
        let origin = Position::new(10, 10);
        compute_fov(&mut grid, origin, 2, false);
        let report = compute_fov(&mut grid, origin, 5, false);
        assert!(!report.skipped);
        assert!(report.changed.contains(&Position::new(14, 10)));
    }

    #[test]
    fn test_dark_mode_forgets_unlit_cells() {
        let mut grid = Grid::new(20, 5).unwrap();
        grid.set_dark(true);
        compute_fov(&mut grid, Position::new(2, 2), 3, false);
        assert!(grid.is_discovered(Position::new(3, 2)));

        let report = compute_fov(&mut grid, Position::new(15, 2), 3, false);
        assert!(!grid.is_discovered(Position::new(3, 2)));
        assert!(grid.is_discovered(Position::new(16, 2)));
        assert!(report.changed.contains(&Position::new(3, 2)));
        assert!(report.changed.contains(&Position::new(16, 2)));
        assert_eq!(grid.cell(Position::new(2, 2)).unwrap().last_visibility_radius, 0);
        assert_eq!(grid.cell(Position::new(15, 2)).unwrap().last_visibility_radius, 3);
    }

    #[test]
    fn test_trees_block_only_past_clear_distance() {
        let mut grid = Grid::new(11, 3).unwrap();
        grid.set_wall(Position::new(1, 1), WallKind::Tree);
        grid.set_wall(Position::new(6, 1), WallKind::Tree);
        compute_fov(&mut grid, Position::new(0, 1), 10, false);
        assert!(grid.is_discovered(Position::new(4, 1)));
        assert!(grid.is_discovered(Position::new(6, 1)));
        assert!(!grid.is_discovered(Position::new(8, 1)));
    }

    #[test]
    fn test_holes_do_not_block_sight() {
        let mut grid = Grid::new(9, 3).unwrap();
        grid.set_wall(Position::new(3, 1), WallKind::Hole);
        compute_fov(&mut grid, Position::new(0, 1), 8, false);
        assert!(grid.is_discovered(Position::new(6, 1)));
    }

    #[test]
    fn test_out_of_bounds_origin_is_ignored() {
        let mut grid = Grid::new(5, 5).unwrap();
        let report = compute_fov(&mut grid, Position::new(9, 9), 3, true);
        assert!(report.skipped);
        assert_eq!(grid.discovered_count(), 0);
    }

    #[test]
    fn test_line_of_sight() {
        let mut grid = Grid::new(10, 10).unwrap();
        let from = Position::new(1, 1);
        assert!(has_line_of_sight(&grid, from, Position::new(8, 5)));

        let door = grid
            .set_object(Position::new(4, 1), ObjectKind::Door { open: false })
            .unwrap();
        assert!(!has_line_of_sight(&grid, from, Position::new(7, 1)));
        grid.object_mut(door).unwrap().interact();
        assert!(has_line_of_sight(&grid, from, Position::new(7, 1)));

        grid.set_wall(Position::new(7, 1), WallKind::Stone);
        assert!(has_line_of_sight(&grid, from, Position::new(7, 1)));
        assert!(!has_line_of_sight(&grid, from, Position::new(20, 1)));
    }
}
