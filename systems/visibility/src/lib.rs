#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Line-of-sight queries between two grid cells.
//!
//! Every query borrows the grid immutably and has no side effects, so agents
//! may evaluate them in any order within a tick. Only wall kinds block sight;
//! furniture, barricades and other agents never do.

use escape_core::{CellCoord, SightModel};
use escape_world::Grid;

/// Evaluates line of sight with the provided model.
#[must_use]
pub fn is_visible_with(
    model: SightModel,
    grid: &Grid,
    observer: CellCoord,
    target: CellCoord,
    max_radius: f32,
) -> bool {
    match model {
        SightModel::DualSweep => is_visible(grid, observer, target, max_radius),
        SightModel::Supercover => is_visible_supercover(grid, observer, target, max_radius),
    }
}

/// Dual-sweep line of sight.
///
/// A column-driven sweep interpolates the row of every intermediate column and
/// a row-driven sweep interpolates the column of every intermediate row. Each
/// interpolated cell is rounded half to even; any wall found by either sweep
/// blocks sight. Off the cardinal axes the two sweeps can disagree with the
/// sweeps run from the other endpoint, so the result is not guaranteed to be
/// symmetric.
#[must_use]
pub fn is_visible(grid: &Grid, observer: CellCoord, target: CellCoord, max_radius: f32) -> bool {
    if !within_radius(observer, target, max_radius) {
        return false;
    }

    let from = Point::from(observer);
    let to = Point::from(target);
    sweep_clear(grid, from, to, Axis::Column) && sweep_clear(grid, from, to, Axis::Row)
}

/// Supercover line of sight.
///
/// Walks every cell touched by the segment joining the two cell centres,
/// including both neighbours where the segment passes exactly through a grid
/// corner. The walk visits the same cells from either endpoint, so the result
/// is symmetric.
#[must_use]
pub fn is_visible_supercover(
    grid: &Grid,
    observer: CellCoord,
    target: CellCoord,
    max_radius: f32,
) -> bool {
    if !within_radius(observer, target, max_radius) {
        return false;
    }

    let from = Point::from(observer);
    let to = Point::from(target);
    let (dx, dy) = (to.column - from.column, to.row - from.row);
    let (nx, ny) = (dx.abs(), dy.abs());
    let (sx, sy) = (dx.signum(), dy.signum());

    let mut cursor = from;
    let (mut ix, mut iy) = (0_i64, 0_i64);
    while ix < nx || iy < ny {
        let decision = (1 + 2 * ix) * ny - (1 + 2 * iy) * nx;
        if decision == 0 {
            let beside = Point {
                row: cursor.row,
                column: cursor.column + sx,
            };
            let below = Point {
                row: cursor.row + sy,
                column: cursor.column,
            };
            if blocks(grid, beside, to) || blocks(grid, below, to) {
                return false;
            }
            cursor.column += sx;
            cursor.row += sy;
            ix += 1;
            iy += 1;
        } else if decision < 0 {
            cursor.column += sx;
            ix += 1;
        } else {
            cursor.row += sy;
            iy += 1;
        }

        if blocks(grid, cursor, to) {
            return false;
        }
    }
    true
}

/// Short-range wake-up check used by dormant agents.
///
/// Succeeds only when both cells share a row or a column, lie at most
/// `radius` cells apart, and no wall stands between them.
#[must_use]
pub fn is_visible_along_axis(
    grid: &Grid,
    observer: CellCoord,
    target: CellCoord,
    radius: u32,
) -> bool {
    let same_row = observer.row() == target.row();
    let same_column = observer.column() == target.column();
    if !(same_row || same_column) || observer.manhattan_distance(target) > radius {
        return false;
    }

    let from = Point::from(observer);
    let to = Point::from(target);
    let axis = if same_row { Axis::Column } else { Axis::Row };
    sweep_clear(grid, from, to, axis)
}

fn within_radius(observer: CellCoord, target: CellCoord, max_radius: f32) -> bool {
    observer.euclidean_distance(target) < max_radius
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Row,
    Column,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Point {
    row: i64,
    column: i64,
}

impl From<CellCoord> for Point {
    fn from(cell: CellCoord) -> Self {
        Self {
            row: i64::from(cell.row()),
            column: i64::from(cell.column()),
        }
    }
}

impl Point {
    fn cell(self) -> Option<CellCoord> {
        let row = u32::try_from(self.row).ok()?;
        let column = u32::try_from(self.column).ok()?;
        Some(CellCoord::new(row, column))
    }
}

/// Reports whether an intermediate cell of a walk holds a wall.
fn blocks(grid: &Grid, point: Point, goal: Point) -> bool {
    point != goal && point.cell().is_some_and(|cell| grid.is_wall(cell))
}

/// Runs one interpolating sweep; returns `false` on the first wall found.
fn sweep_clear(grid: &Grid, from: Point, to: Point, driving: Axis) -> bool {
    let (driving_delta, other_delta) = match driving {
        Axis::Column => (to.column - from.column, to.row - from.row),
        Axis::Row => (to.row - from.row, to.column - from.column),
    };
    if driving_delta == 0 {
        return true;
    }

    let slope = other_delta.abs() as f32 / driving_delta.abs() as f32;
    let (driving_sign, other_sign) = (driving_delta.signum(), other_delta.signum());
    for step in 1..driving_delta.abs() {
        let offset = (step as f32 * slope * other_sign as f32).round_ties_even() as i64;
        let point = match driving {
            Axis::Column => Point {
                row: from.row + offset,
                column: from.column + driving_sign * step,
            },
            Axis::Row => Point {
                row: from.row + driving_sign * step,
                column: from.column + offset,
            },
        };
        if point.cell().is_some_and(|cell| grid.is_wall(cell)) {
            return false;
        }
    }
    true
}
