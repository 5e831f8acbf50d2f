#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cost-aware A* search over the 4-connected grid.
//!
//! The Manhattan heuristic toward the goal is stored for every cell in a
//! [`HeuristicField`] that is rebuilt only when the goal cell changes, so all
//! agents chasing the same target share one refresh. Search bookkeeping lives
//! in a scratch arena owned by each call and indexed by dense cell index.

use std::{cmp::Reverse, collections::BinaryHeap};

use escape_core::{AgentId, CellCoord, OccupantKind};
use escape_world::Grid;

/// Manhattan distance from every cell to a single goal cell.
#[derive(Clone, Debug, Default)]
pub struct HeuristicField {
    goal: Option<CellCoord>,
    rows: u32,
    columns: u32,
    distances: Vec<u32>,
}

impl HeuristicField {
    /// Creates an empty field that has not been computed for any goal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Goal the field currently describes.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.goal
    }

    /// Recomputes the field when the goal or grid dimensions changed.
    ///
    /// Returns `true` if the field was rebuilt.
    pub fn refresh(&mut self, grid: &Grid, goal: CellCoord) -> bool {
        if self.goal == Some(goal) && self.rows == grid.rows() && self.columns == grid.columns() {
            return false;
        }

        self.goal = Some(goal);
        self.rows = grid.rows();
        self.columns = grid.columns();
        self.distances.clear();
        self.distances.extend(
            (0..grid.cell_count()).map(|index| grid.coord(index).manhattan_distance(goal)),
        );
        tracing::trace!("heuristic field rebuilt toward {:?}", goal);
        true
    }

    /// Heuristic value of the cell at the provided dense index.
    #[must_use]
    pub fn at(&self, index: usize) -> u32 {
        self.distances.get(index).copied().unwrap_or(u32::MAX)
    }
}

/// Reusable planner that amortises heuristic refreshes across searches.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    heuristic: HeuristicField,
    refreshes: u64,
}

impl Pathfinder {
    /// Creates a planner with an empty heuristic field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a path from `start` to `goal` on behalf of `mover`.
    ///
    /// Cells holding corporeal agents other than `mover` are never entered.
    /// The returned path runs from `start` to `goal` inclusive; an empty path
    /// means the goal is unreachable.
    pub fn plan(
        &mut self,
        grid: &Grid,
        start: CellCoord,
        goal: CellCoord,
        mover: Option<AgentId>,
    ) -> Vec<CellCoord> {
        if self.heuristic.refresh(grid, goal) {
            self.refreshes += 1;
        }
        let path = search(grid, &self.heuristic, start, goal, mover);
        tracing::trace!(
            "planned {:?} -> {:?} for {:?}: {} cells",
            start,
            goal,
            mover,
            path.len()
        );
        path
    }

    /// Number of times the heuristic field was rebuilt.
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Heuristic field used by the most recent search.
    #[must_use]
    pub fn heuristic(&self) -> &HeuristicField {
        &self.heuristic
    }
}

/// One-off search that builds its own heuristic field.
#[must_use]
pub fn find_path(
    grid: &Grid,
    start: CellCoord,
    goal: CellCoord,
    mover: Option<AgentId>,
) -> Vec<CellCoord> {
    let mut heuristic = HeuristicField::new();
    let _ = heuristic.refresh(grid, goal);
    search(grid, &heuristic, start, goal, mover)
}

/// Sum of the traversal costs of every cell entered along the path.
///
/// Returns `None` if the path leaves the grid or enters an impassable cell.
#[must_use]
pub fn path_cost(grid: &Grid, path: &[CellCoord]) -> Option<u64> {
    path.iter().skip(1).try_fold(0_u64, |total, cell| {
        let cost = grid.traversal_cost(*cell)?.finite()?;
        Some(total + u64::from(cost))
    })
}

#[derive(Clone, Copy, Debug)]
struct ScratchNode {
    g: u64,
    parent: Option<usize>,
    open: bool,
    closed: bool,
}

impl ScratchNode {
    const UNSEEN: Self = Self {
        g: u64::MAX,
        parent: None,
        open: false,
        closed: false,
    };
}

fn search(
    grid: &Grid,
    heuristic: &HeuristicField,
    start: CellCoord,
    goal: CellCoord,
    mover: Option<AgentId>,
) -> Vec<CellCoord> {
    let (Some(start_index), Some(goal_index)) = (grid.index(start), grid.index(goal)) else {
        return Vec::new();
    };
    if start_index == goal_index {
        return vec![start];
    }

    let h = |index: usize| u64::from(heuristic.at(index));
    let mut nodes = vec![ScratchNode::UNSEEN; grid.cell_count()];
    let mut open: BinaryHeap<Reverse<(u64, u64, usize)>> = BinaryHeap::new();
    let mut discovered = 0_u64;

    nodes[start_index].g = 0;
    nodes[start_index].open = true;
    open.push(Reverse((h(start_index), discovered, start_index)));

    while let Some(Reverse((f, _, current))) = open.pop() {
        let node = nodes[current];
        if node.closed || f != node.g + h(current) {
            continue;
        }
        nodes[current].closed = true;
        nodes[current].open = false;

        if current == goal_index {
            return reconstruct(grid, &nodes, goal_index);
        }

        for (_, neighbor) in grid.neighbors(grid.coord(current)) {
            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };
            if nodes[neighbor_index].closed
                || grid.holds_other_agent(neighbor, mover)
                || grid
                    .occupant_kind(neighbor)
                    .map_or(true, OccupantKind::blocks_search)
            {
                continue;
            }
            let Some(cost) = grid.traversal_cost(neighbor).and_then(|cost| cost.finite()) else {
                continue;
            };

            let tentative = node.g + u64::from(cost);
            let entry = &mut nodes[neighbor_index];
            if entry.open && tentative >= entry.g {
                continue;
            }

            entry.g = tentative;
            entry.parent = Some(current);
            entry.open = true;
            discovered += 1;
            open.push(Reverse((tentative + h(neighbor_index), discovered, neighbor_index)));
        }
    }

    Vec::new()
}

fn reconstruct(grid: &Grid, nodes: &[ScratchNode], goal_index: usize) -> Vec<CellCoord> {
    let mut path = vec![grid.coord(goal_index)];
    let mut cursor = nodes[goal_index].parent;
    while let Some(index) = cursor {
        path.push(grid.coord(index));
        cursor = nodes[index].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_equal_to_goal_yields_single_cell() {
        let grid = Grid::open(3, 3, 32.0);
        let cell = CellCoord::new(1, 1);
        assert_eq!(find_path(&grid, cell, cell, None), vec![cell]);
    }

    #[test]
    fn open_grid_path_follows_manhattan_distance() {
        let grid = Grid::open(5, 5, 32.0);
        let path = find_path(&grid, CellCoord::new(4, 4), CellCoord::new(0, 0), None);
        assert_eq!(path.len(), 9);
        assert_eq!(path.first(), Some(&CellCoord::new(4, 4)));
        assert_eq!(path.last(), Some(&CellCoord::new(0, 0)));
        assert_eq!(path_cost(&grid, &path), Some(8));
        for pair in path.windows(2) {
            assert!(pair[0].direction_to(pair[1]).is_some());
        }
    }

    #[test]
    fn enclosed_start_has_no_path() {
        let grid = Grid::from_layout(&["..-..", ".-.-.", "..-.."], 32.0).expect("layout");
        let path = find_path(&grid, CellCoord::new(1, 2), CellCoord::new(0, 0), None);
        assert!(path.is_empty());
    }

    #[test]
    fn costly_obstacles_are_avoided_when_possible() {
        let grid = Grid::from_layout(&[".L.", "...", "..."], 32.0).expect("layout");
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(0, 2), None);
        assert_eq!(path.len(), 5);
        assert!(!path.contains(&CellCoord::new(0, 1)));
        assert_eq!(path_cost(&grid, &path), Some(4));
    }

    #[test]
    fn costly_obstacles_are_crossed_when_unavoidable() {
        let grid = Grid::from_layout(&[".L.", "-|-"], 32.0).expect("layout");
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(0, 2), None);
        assert_eq!(
            path,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(0, 2)
            ]
        );
        assert_eq!(
            path_cost(&grid, &path),
            Some(u64::from(escape_core::OBSTACLE_COST) + 1)
        );
    }

    #[test]
    fn deployed_barricades_are_never_crossed() {
        let grid = Grid::from_layout(&["..#..", "-|-|-"], 32.0).expect("layout");
        let path = find_path(&grid, CellCoord::new(0, 4), CellCoord::new(0, 0), None);
        assert!(path.is_empty());

        let grid = Grid::from_layout(&[".#.", "..."], 32.0).expect("layout");
        let path = find_path(&grid, CellCoord::new(0, 2), CellCoord::new(0, 0), None);
        assert_eq!(path.len(), 5);
        assert!(!path.contains(&CellCoord::new(0, 1)));
    }

    #[test]
    fn other_agents_block_but_the_mover_does_not() {
        let mut grid = Grid::open(1, 4, 32.0);
        let mover = AgentId::new(1);
        let blocker = AgentId::new(2);
        assert!(grid.place_agent(CellCoord::new(0, 0), mover));
        let goal = CellCoord::new(0, 3);

        assert_eq!(find_path(&grid, CellCoord::new(0, 0), goal, Some(mover)).len(), 4);

        assert!(grid.place_agent(CellCoord::new(0, 2), blocker));
        assert!(find_path(&grid, CellCoord::new(0, 0), goal, Some(mover)).is_empty());
    }

    #[test]
    fn heuristic_refreshes_only_when_goal_moves() {
        let mut grid = Grid::open(4, 4, 32.0);
        let _ = grid.set_occupant_kind(CellCoord::new(1, 1), OccupantKind::Box);
        let mut planner = Pathfinder::new();
        let goal = CellCoord::new(0, 0);

        for start in [CellCoord::new(3, 3), CellCoord::new(2, 3), CellCoord::new(3, 0)] {
            let _ = planner.plan(&grid, start, goal, None);
        }
        assert_eq!(planner.refreshes(), 1);
        assert_eq!(planner.heuristic().goal(), Some(goal));

        let _ = planner.plan(&grid, CellCoord::new(3, 3), CellCoord::new(0, 1), None);
        assert_eq!(planner.refreshes(), 2);
        assert_eq!(planner.heuristic().at(0), 1);
    }

    #[test]
    fn out_of_bounds_queries_are_unreachable() {
        let grid = Grid::open(2, 2, 32.0);
        assert!(find_path(&grid, CellCoord::new(5, 5), CellCoord::new(0, 0), None).is_empty());
        assert!(find_path(&grid, CellCoord::new(0, 0), CellCoord::new(0, 9), None).is_empty());
    }
}
