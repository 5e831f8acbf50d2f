use escape_core::{CellCoord, OccupantKind};
use escape_system_pathfinding::{find_path, path_cost, Pathfinder};
use escape_world::Grid;

const KINDS: [OccupantKind; 6] = [
    OccupantKind::Empty,
    OccupantKind::Empty,
    OccupantKind::Empty,
    OccupantKind::VerticalWall,
    OccupantKind::Chair,
    OccupantKind::Box,
];

fn next_random(state: u64) -> u64 {
    state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407)
}

fn random_grid(seed: u64) -> Grid {
    let mut grid = Grid::open(4, 4, 32.0);
    let mut state = seed;
    for index in 0..grid.cell_count() {
        state = next_random(state);
        let kind = KINDS[((state >> 33) % KINDS.len() as u64) as usize];
        let _ = grid.set_occupant_kind(grid.coord(index), kind);
    }
    grid
}

/// Cheapest cost over every simple path, found by exhaustive depth-first search.
fn brute_force_cost(grid: &Grid, start: CellCoord, goal: CellCoord) -> Option<u64> {
    fn explore(
        grid: &Grid,
        cell: CellCoord,
        goal: CellCoord,
        cost: u64,
        visited: &mut Vec<bool>,
        best: &mut Option<u64>,
    ) {
        if cell == goal {
            *best = Some(best.map_or(cost, |current| current.min(cost)));
            return;
        }
        for (_, neighbor) in grid.neighbors(cell) {
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if visited[index] {
                continue;
            }
            let Some(step) = grid.traversal_cost(neighbor).and_then(|cost| cost.finite()) else {
                continue;
            };
            visited[index] = true;
            explore(grid, neighbor, goal, cost + u64::from(step), visited, best);
            visited[index] = false;
        }
    }

    let mut visited = vec![false; grid.cell_count()];
    visited[grid.index(start)?] = true;
    let mut best = None;
    explore(grid, start, goal, 0, &mut visited, &mut best);
    best
}

#[test]
fn paths_match_brute_force_optimum_on_small_grids() {
    for seed in 0..64_u64 {
        let grid = random_grid(seed);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(3, 3);
        if grid.is_wall(start) || grid.is_wall(goal) {
            continue;
        }

        let path = find_path(&grid, start, goal, None);
        let expected = brute_force_cost(&grid, start, goal);
        match expected {
            None => assert!(path.is_empty(), "seed {seed}: found a path to an unreachable goal"),
            Some(cost) => {
                assert_eq!(path.first(), Some(&start), "seed {seed}");
                assert_eq!(path.last(), Some(&goal), "seed {seed}");
                assert_eq!(path_cost(&grid, &path), Some(cost), "seed {seed}");
            }
        }
    }
}

#[test]
fn paths_never_cross_walls_and_costs_accumulate() {
    for seed in 100..164_u64 {
        let grid = random_grid(seed);
        let start = CellCoord::new(3, 0);
        let goal = CellCoord::new(0, 3);
        let path = find_path(&grid, start, goal, None);

        for cell in &path[..] {
            if *cell != start {
                assert!(!grid.is_wall(*cell), "seed {seed}: path enters a wall");
            }
        }

        let mut previous = 0;
        for prefix in 1..=path.len() {
            let cost = path_cost(&grid, &path[..prefix]).expect("passable prefix");
            assert!(cost >= previous, "seed {seed}: prefix cost decreased");
            previous = cost;
        }
    }
}

#[test]
fn open_five_by_five_scenario() {
    let grid = Grid::open(5, 5, 32.0);
    let path = find_path(&grid, CellCoord::new(4, 4), CellCoord::new(0, 0), None);
    assert_eq!(path.len(), 9);
    assert_eq!(path_cost(&grid, &path), Some(8));
}

#[test]
fn walling_the_only_corridor_separates_the_rooms() {
    let mut grid = Grid::from_layout(
        &[
            "..||..", //
            "..||..", //
            "......", //
            "..||..", //
            "..||..", //
        ],
        32.0,
    )
    .expect("layout");
    let west = CellCoord::new(0, 0);
    let east = CellCoord::new(4, 5);
    assert!(!find_path(&grid, west, east, None).is_empty());

    let _ = grid.set_occupant_kind(CellCoord::new(2, 2), OccupantKind::VerticalWall);
    let _ = grid.set_occupant_kind(CellCoord::new(2, 3), OccupantKind::VerticalWall);
    assert!(find_path(&grid, west, east, None).is_empty());
}

#[test]
fn shared_planner_matches_one_off_searches() {
    let mut planner = Pathfinder::new();
    for seed in 200..232_u64 {
        let grid = random_grid(seed);
        let goal = CellCoord::new(1, 2);
        for index in 0..grid.cell_count() {
            let start = grid.coord(index);
            let planned = planner.plan(&grid, start, goal, None);
            let one_off = find_path(&grid, start, goal, None);
            assert_eq!(planned, one_off, "seed {seed} start {start:?}");
        }
    }
    assert_eq!(planner.refreshes(), 1);
}
