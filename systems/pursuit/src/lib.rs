#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic agent controller that drives every monster once per tick.
//!
//! On each [`Event::TimeAdvanced`] the system walks the agents in identifier
//! order and, for each one, emits commands in a fixed sequence: the sighting
//! report, the freshly planned chase path, the steering step, the state
//! transition decided from that path, and finally the attack evaluation.
//! Dormant agents only check their wake-up axis and phantoms drift toward
//! random destinations chosen from a seeded generator.

use std::{collections::BTreeMap, time::Duration};

use escape_core::{
    AgentId, AgentKind, AgentSnapshot, AgentState, AgentView, CellCoord, Command, Direction,
    Event, SightModel, TargetSnapshot,
};
use escape_system_pathfinding::Pathfinder;
use escape_system_visibility::{is_visible_along_axis, is_visible_with};
use escape_world::Grid;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

const ORIGIN_TOLERANCE: f32 = 1e-3;

/// Pure system that reacts to ticks and emits agent behaviour commands.
#[derive(Debug)]
pub struct Pursuit {
    sight: SightModel,
    pathfinder: Pathfinder,
    rng: ChaCha8Rng,
    drifts: BTreeMap<AgentId, CellCoord>,
}

impl Pursuit {
    /// Creates a controller seeded for phantom drift and using the provided sight model.
    #[must_use]
    pub fn new(seed: u64, sight: SightModel) -> Self {
        Self {
            sight,
            pathfinder: Pathfinder::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            drifts: BTreeMap::new(),
        }
    }

    /// Consumes world events and immutable views to emit agent commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: &Grid,
        agents: &AgentView,
        target: &TargetSnapshot,
        out: &mut Vec<Command>,
    ) {
        let mut elapsed = None;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = Some(*dt),
                Event::AgentKilled { agent, .. } => {
                    let _ = self.drifts.remove(agent);
                }
                _ => {}
            }
        }

        let Some(dt) = elapsed else {
            return;
        };

        for agent in agents.iter() {
            if agent.kind == AgentKind::Phantom {
                self.drift(grid, agent, dt, out);
            } else if agent.state == AgentState::Dormant {
                watch(grid, agent, target, out);
            } else {
                self.hunt(grid, agent, target, dt, out);
            }

            out.push(Command::EngageTarget { agent: agent.id, dt });
        }
    }

    /// Number of times the shared heuristic field was rebuilt.
    #[must_use]
    pub fn heuristic_refreshes(&self) -> u64 {
        self.pathfinder.refreshes()
    }

    fn hunt(
        &mut self,
        grid: &Grid,
        agent: &AgentSnapshot,
        target: &TargetSnapshot,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let (sighted, path) = match target.cell {
            Some(goal) => (
                is_visible_with(
                    self.sight,
                    grid,
                    agent.cell,
                    goal,
                    agent.tunables.detection_radius,
                ),
                self.pathfinder.plan(grid, agent.cell, goal, Some(agent.id)),
            ),
            None => (false, Vec::new()),
        };

        out.push(Command::SetAgentSighted {
            agent: agent.id,
            sighted,
        });

        // A pursuer sharing the target's cell holds still.
        let direction = if agent.state == AgentState::Pursuing && !path.is_empty() {
            path.get(1).and_then(|next| agent.cell.direction_to(*next))
        } else {
            Some(patrol_heading(grid, agent))
        };
        let next_state = transition(
            agent.kind,
            agent.state,
            path.len(),
            agent.tunables.notice_threshold,
        );

        tracing::trace!(
            "agent {} planned {} cells toward {:?}",
            agent.id.get(),
            path.len(),
            target.cell
        );
        out.push(Command::AssignChasePath {
            agent: agent.id,
            path,
        });
        if let Some(direction) = direction {
            out.push(Command::SteerAgent {
                agent: agent.id,
                direction,
                dt,
            });
        }
        if next_state != agent.state {
            out.push(Command::SetAgentState {
                agent: agent.id,
                state: next_state,
            });
        }
    }

    fn drift(&mut self, grid: &Grid, agent: &AgentSnapshot, dt: Duration, out: &mut Vec<Command>) {
        let destination = match self.drifts.get(&agent.id) {
            Some(destination) if *destination != agent.cell => *destination,
            _ => {
                let Some(destination) = self.pick_destination(grid, agent.cell) else {
                    return;
                };
                tracing::debug!(
                    "phantom {} drifting from {:?} to {:?}",
                    agent.id.get(),
                    agent.cell,
                    destination
                );
                let _ = self.drifts.insert(agent.id, destination);
                destination
            }
        };

        if let Some(direction) = heading(agent.cell, destination) {
            out.push(Command::SteerAgent {
                agent: agent.id,
                direction,
                dt,
            });
        }
    }

    /// Picks a random cell strictly beyond `cell` along a random axis direction.
    fn pick_destination(&mut self, grid: &Grid, cell: CellCoord) -> Option<CellCoord> {
        let options: Vec<(Direction, u32)> = Direction::ALL
            .into_iter()
            .map(|direction| (direction, reach(grid, cell, direction)))
            .filter(|(_, cells)| *cells > 0)
            .collect();
        if options.is_empty() {
            return None;
        }

        let (direction, cells) = options[self.rng.gen_range(0..options.len())];
        let steps = self.rng.gen_range(1..=cells);
        let destination = match direction {
            Direction::North => CellCoord::new(cell.row() - steps, cell.column()),
            Direction::East => CellCoord::new(cell.row(), cell.column() + steps),
            Direction::South => CellCoord::new(cell.row() + steps, cell.column()),
            Direction::West => CellCoord::new(cell.row(), cell.column() - steps),
        };
        Some(destination)
    }
}

/// State an awake agent adopts after planning a chase path of `path_len` cells.
///
/// Reactive agents notice the target only when the path is shorter than
/// `notice_threshold` and give up once it grows past it. Latent agents pursue
/// whenever any path exists. Dormant agents and phantoms are left unchanged.
#[must_use]
pub fn transition(
    kind: AgentKind,
    state: AgentState,
    path_len: usize,
    notice_threshold: usize,
) -> AgentState {
    match (kind, state) {
        (AgentKind::Reactive, AgentState::Patrolling) => {
            if path_len > 0 && path_len < notice_threshold {
                AgentState::Pursuing
            } else {
                AgentState::Patrolling
            }
        }
        (AgentKind::Reactive, AgentState::Pursuing) => {
            if path_len == 0 || path_len > notice_threshold {
                AgentState::Patrolling
            } else {
                AgentState::Pursuing
            }
        }
        (AgentKind::Latent, AgentState::Patrolling | AgentState::Pursuing) => {
            if path_len > 0 {
                AgentState::Pursuing
            } else {
                AgentState::Patrolling
            }
        }
        _ => state,
    }
}

/// Wakes a dormant agent that sees the target along its row or column.
fn watch(grid: &Grid, agent: &AgentSnapshot, target: &TargetSnapshot, out: &mut Vec<Command>) {
    let Some(goal) = target.cell else {
        return;
    };
    if !is_visible_along_axis(grid, agent.cell, goal, agent.tunables.trigger_radius) {
        return;
    }

    tracing::debug!("agent {} woke up facing {:?}", agent.id.get(), goal);
    out.push(Command::SetAgentState {
        agent: agent.id,
        state: AgentState::Pursuing,
    });
}

/// Direction a wandering agent steers in.
///
/// The agent keeps its heading until it rests on its cell origin facing a
/// blocked cell, then turns clockwise until it faces an open one.
fn patrol_heading(grid: &Grid, agent: &AgentSnapshot) -> Direction {
    let at_origin = grid
        .bounds(agent.cell)
        .is_some_and(|bounds| bounds.origin().distance(agent.position) <= ORIGIN_TOLERANCE);
    if !at_origin {
        return agent.direction;
    }

    let mut direction = agent.direction;
    for _ in 0..Direction::ALL.len() {
        if !patrol_blocked(grid, agent, direction) {
            return direction;
        }
        direction = direction.clockwise();
    }
    agent.direction
}

fn patrol_blocked(grid: &Grid, agent: &AgentSnapshot, direction: Direction) -> bool {
    grid.adjacent(agent.cell, direction).map_or(true, |facing| {
        grid.occupant_kind(facing)
            .is_some_and(|kind| kind.blocks_walking())
            || grid.holds_other_agent(facing, Some(agent.id))
    })
}

/// Cells available between `cell` and the map edge in `direction`.
fn reach(grid: &Grid, cell: CellCoord, direction: Direction) -> u32 {
    match direction {
        Direction::North => cell.row(),
        Direction::East => grid.columns().saturating_sub(cell.column() + 1),
        Direction::South => grid.rows().saturating_sub(cell.row() + 1),
        Direction::West => cell.column(),
    }
}

/// Axis direction leading from `from` toward a destination on its row or column.
fn heading(from: CellCoord, to: CellCoord) -> Option<Direction> {
    if from.row() == to.row() {
        if to.column() > from.column() {
            Some(Direction::East)
        } else if to.column() < from.column() {
            Some(Direction::West)
        } else {
            None
        }
    } else if from.column() == to.column() {
        if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_world::{query, LevelConfig, World};

    const TICK: Duration = Duration::from_millis(50);

    fn world_from(level: &LevelConfig) -> World {
        World::from_level(level).expect("valid level")
    }

    fn snapshot(world: &World, id: u32) -> AgentSnapshot {
        query::agent_view(world)
            .get(AgentId::new(id))
            .cloned()
            .expect("agent exists")
    }

    #[test]
    fn reactive_agents_notice_short_paths_only() {
        let reactive = |state, len| transition(AgentKind::Reactive, state, len, 6);
        assert_eq!(reactive(AgentState::Patrolling, 5), AgentState::Pursuing);
        assert_eq!(reactive(AgentState::Patrolling, 6), AgentState::Patrolling);
        assert_eq!(reactive(AgentState::Patrolling, 0), AgentState::Patrolling);
        assert_eq!(reactive(AgentState::Pursuing, 6), AgentState::Pursuing);
        assert_eq!(reactive(AgentState::Pursuing, 7), AgentState::Patrolling);
        assert_eq!(reactive(AgentState::Pursuing, 0), AgentState::Patrolling);
    }

    #[test]
    fn latent_agents_pursue_any_reachable_target() {
        let latent = |state, len| transition(AgentKind::Latent, state, len, 0);
        assert_eq!(latent(AgentState::Patrolling, 40), AgentState::Pursuing);
        assert_eq!(latent(AgentState::Pursuing, 0), AgentState::Patrolling);
        assert_eq!(latent(AgentState::Dormant, 3), AgentState::Dormant);
        assert_eq!(
            transition(AgentKind::Phantom, AgentState::Patrolling, 3, 6),
            AgentState::Patrolling
        );
    }

    #[test]
    fn patrol_turns_clockwise_only_at_the_cell_origin() {
        let level = LevelConfig::open(1, 4, CellCoord::new(0, 3))
            .with_spawn(AgentKind::Reactive, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(0, 2));
        let world = world_from(&level);
        let grid = query::grid(&world);

        let cornered = snapshot(&world, 0);
        assert_eq!(cornered.direction, Direction::West);
        assert_eq!(patrol_heading(grid, &cornered), Direction::East);

        let mut drifting = cornered.clone();
        drifting.position.x += 5.0;
        assert_eq!(patrol_heading(grid, &drifting), Direction::West);

        let free = snapshot(&world, 1);
        assert_eq!(patrol_heading(grid, &free), Direction::West);
    }

    #[test]
    fn missing_target_cell_makes_pursuers_wander() {
        let level = LevelConfig::open(3, 3, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(2, 2));
        let world = world_from(&level);
        let mut target = query::target(&world);
        target.cell = None;

        let mut pursuit = Pursuit::new(7, SightModel::DualSweep);
        let mut commands = Vec::new();
        pursuit.handle(
            &[Event::TimeAdvanced { dt: TICK }],
            query::grid(&world),
            &query::agent_view(&world),
            &target,
            &mut commands,
        );

        let id = AgentId::new(0);
        assert_eq!(
            commands,
            vec![
                Command::SetAgentSighted {
                    agent: id,
                    sighted: false
                },
                Command::AssignChasePath {
                    agent: id,
                    path: Vec::new()
                },
                Command::SteerAgent {
                    agent: id,
                    direction: Direction::West,
                    dt: TICK
                },
                Command::SetAgentState {
                    agent: id,
                    state: AgentState::Patrolling
                },
                Command::EngageTarget { agent: id, dt: TICK },
            ]
        );
        assert_eq!(pursuit.heuristic_refreshes(), 0);
    }

    #[test]
    fn pursuers_step_along_their_fresh_path() {
        let level = LevelConfig::open(1, 5, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(0, 4));
        let world = world_from(&level);

        let mut pursuit = Pursuit::new(7, SightModel::DualSweep);
        let mut commands = Vec::new();
        pursuit.handle(
            &[Event::TimeAdvanced { dt: TICK }],
            query::grid(&world),
            &query::agent_view(&world),
            &query::target(&world),
            &mut commands,
        );

        let id = AgentId::new(0);
        let expected_path: Vec<CellCoord> = (0..5).rev().map(|column| CellCoord::new(0, column)).collect();
        assert_eq!(
            commands,
            vec![
                Command::SetAgentSighted {
                    agent: id,
                    sighted: true
                },
                Command::AssignChasePath {
                    agent: id,
                    path: expected_path
                },
                Command::SteerAgent {
                    agent: id,
                    direction: Direction::West,
                    dt: TICK
                },
                Command::EngageTarget { agent: id, dt: TICK },
            ]
        );
    }

    #[test]
    fn commands_are_only_emitted_on_ticks() {
        let level = LevelConfig::open(2, 2, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(1, 1));
        let world = world_from(&level);
        let mut pursuit = Pursuit::new(1, SightModel::Supercover);
        let mut commands = Vec::new();
        pursuit.handle(
            &[Event::TargetMoved {
                direction: Direction::East,
            }],
            query::grid(&world),
            &query::agent_view(&world),
            &query::target(&world),
            &mut commands,
        );
        assert!(commands.is_empty());
    }

    #[test]
    fn phantom_destinations_stay_on_the_current_axis() {
        let grid = Grid::open(6, 7, 32.0);
        let mut pursuit = Pursuit::new(42, SightModel::DualSweep);
        let origin = CellCoord::new(2, 3);
        for _ in 0..64 {
            let destination = pursuit
                .pick_destination(&grid, origin)
                .expect("open grid offers a destination");
            assert_ne!(destination, origin);
            assert!(grid.contains(destination));
            assert!(heading(origin, destination).is_some());
        }

        let single = Grid::open(1, 1, 32.0);
        assert!(pursuit.pick_destination(&single, CellCoord::new(0, 0)).is_none());
    }
}
