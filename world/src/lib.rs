#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Escape pursuit simulation.

mod grid;
mod level;

use std::time::Duration;

use escape_core::{
    AgentId, AgentKind, AgentState, AgentTunables, CellCoord, Command, Direction, Event,
    OccupantKind, ProjectileId, SightModel, AMMO_PER_GUN,
};
use glam::Vec2;

pub use grid::{CellBounds, Grid};
pub use level::{
    KindTunables, LevelConfig, LevelError, SpawnConfig, TargetConfig, TunablesConfig,
    MAX_TARGET_HEALTH,
};

const PROJECTILE_SPEED: f32 = 400.0;
const OPACITY_STEP: f32 = 0.08;
const PHANTOM_OPACITY: f32 = 0.5;

/// Represents the authoritative Escape world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    sight: SightModel,
    seed: u64,
    agents: Vec<Agent>,
    target: Target,
    projectiles: Vec<Projectile>,
    next_projectile: u32,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Builds a world from a level description, validating every placement.
    pub fn from_level(level: &LevelConfig) -> Result<Self, LevelError> {
        let mut grid = Grid::from_layout(level.layout.as_slice(), level.cell_length)?;

        validate_placement(&grid, level.target, "target")?;
        let player = level.player;
        if !(player.speed.is_finite() && player.speed > 0.0) {
            return Err(LevelError::InvalidTargetSpeed(player.speed));
        }

        if let Some(key) = level.key {
            validate_placement(&grid, key, "key")?;
            if grid.occupant_kind(key) == Some(OccupantKind::Empty) {
                let _ = grid.set_occupant_kind(key, OccupantKind::Key);
            } else {
                grid.set_conceals_key(key, true);
            }
        }

        let mut agents = Vec::with_capacity(level.spawns.len());
        for (index, spawn) in level.spawns.iter().enumerate() {
            validate_placement(&grid, spawn.cell, "spawn")?;
            let tunables = level.tunables.resolve(spawn.kind)?;
            let id = AgentId::new(index as u32);
            let position = origin_of(&grid, spawn.cell);
            if spawn.kind.is_corporeal() {
                let _ = grid.place_agent(spawn.cell, id);
            } else {
                grid.place_phantom(spawn.cell, id);
            }
            agents.push(Agent::spawn(id, spawn.kind, spawn.cell, position, tunables));
        }

        let target = Target {
            cell: Some(level.target),
            direction: Direction::South,
            position: origin_of(&grid, level.target),
            speed: player.speed,
            health: player.health.min(MAX_TARGET_HEALTH),
            ammo: player.ammo,
            score: 0,
            carries_key: false,
            barricades: 0,
        };

        tracing::debug!(
            "loaded {}x{} level with {} agents",
            grid.rows(),
            grid.columns(),
            agents.len()
        );

        Ok(Self {
            grid,
            sight: level.sight,
            seed: level.seed,
            agents,
            target,
            projectiles: Vec::new(),
            next_projectile: 0,
            tick_index: 0,
            elapsed: Duration::ZERO,
        })
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&agent, |entry| entry.id).ok()
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        let index = self.agent_index(agent)?;
        Some(&mut self.agents[index])
    }

    fn move_target(
        &mut self,
        direction: Direction,
        dt: Duration,
        exiting: bool,
        out_events: &mut Vec<Event>,
    ) {
        let Some(mut cell) = self.target.cell else {
            return;
        };
        self.target.direction = direction;

        let start = self.target.position;
        let max_step = self.grid.cell_length() * 0.5;
        let mut remaining = self.target.speed * dt.as_secs_f32();
        while remaining > 0.0 {
            let step = remaining.min(max_step);
            remaining -= step;

            let halt = !exiting
                && self.grid.adjacent(cell, direction).map_or(true, |facing| {
                    self.grid
                        .occupant_kind(facing)
                        .is_some_and(OccupantKind::blocks_walking)
                });
            self.target.position = stride(
                &self.grid,
                cell,
                self.target.position,
                direction,
                step,
                halt,
                !exiting,
            );

            if exiting && !footprint_on_map(&self.grid, self.target.position) {
                self.target.cell = None;
                tracing::info!("target escaped the map from {:?}", cell);
                out_events.push(Event::TargetMoved { direction });
                out_events.push(Event::TargetEscaped { from: cell });
                return;
            }

            if let Some(next) = crossed_into(&self.grid, cell, self.target.position, direction) {
                out_events.push(Event::TargetCellChanged {
                    from: cell,
                    to: next,
                });
                cell = next;
                self.target.cell = Some(next);
            }
        }

        if self.target.position != start {
            out_events.push(Event::TargetMoved { direction });
        }
    }

    fn fire_projectile(&mut self, out_events: &mut Vec<Event>) {
        let Some(cell) = self.target.cell else {
            return;
        };
        if self.target.ammo == 0 {
            return;
        }

        let direction = self.target.direction;
        if self
            .grid
            .adjacent(cell, direction)
            .is_some_and(|facing| self.grid.is_wall(facing))
        {
            return;
        }

        self.target.ammo -= 1;
        let id = ProjectileId::new(self.next_projectile);
        self.next_projectile = self.next_projectile.wrapping_add(1);
        let position = self.target.position + Vec2::splat(self.grid.cell_length() * 0.5);
        self.grid.place_projectile(cell, id);
        self.projectiles.push(Projectile {
            id,
            cell,
            direction,
            position,
        });
        out_events.push(Event::ProjectileFired {
            projectile: id,
            cell,
            direction,
        });
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let distance = PROJECTILE_SPEED * dt.as_secs_f32();
        let in_flight = std::mem::take(&mut self.projectiles);
        for mut projectile in in_flight {
            if self.fly(&mut projectile, distance, out_events) {
                self.projectiles.push(projectile);
            }
        }
    }

    /// Moves a projectile and returns whether it is still airborne.
    fn fly(&mut self, projectile: &mut Projectile, distance: f32, out_events: &mut Vec<Event>) -> bool {
        let max_step = self.grid.cell_length() * 0.5;
        let mut remaining = distance;
        loop {
            if let Some(agent) = self.struck_agent(projectile) {
                let _ = self.grid.remove_projectile(projectile.cell, projectile.id);
                self.wound_agent(agent, out_events);
                return false;
            }
            if remaining <= 0.0 {
                return true;
            }

            let step = remaining.min(max_step);
            remaining -= step;
            projectile.position += projectile.direction.unit() * step;

            let Some(cell) = self.grid.cell_at(projectile.position) else {
                let _ = self.grid.remove_projectile(projectile.cell, projectile.id);
                out_events.push(Event::ProjectileExpired {
                    projectile: projectile.id,
                });
                return false;
            };

            if cell != projectile.cell {
                let _ = self.grid.remove_projectile(projectile.cell, projectile.id);
                self.grid.place_projectile(cell, projectile.id);
                projectile.cell = cell;
            }

            if self.grid.is_wall(cell) {
                let _ = self.grid.remove_projectile(cell, projectile.id);
                out_events.push(Event::ProjectileExpired {
                    projectile: projectile.id,
                });
                return false;
            }
        }
    }

    fn struck_agent(&self, projectile: &Projectile) -> Option<AgentId> {
        let length = self.grid.cell_length();
        let ahead = self.grid.adjacent(projectile.cell, projectile.direction);
        std::iter::once(projectile.cell)
            .chain(ahead)
            .flat_map(|cell| self.grid.agents(cell).iter().copied())
            .find(|id| {
                self.agent_index(*id).is_some_and(|index| {
                    footprint_contains(self.agents[index].position, length, projectile.position)
                })
            })
    }

    fn wound_agent(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };

        let agent = &mut self.agents[index];
        agent.health = agent.health.saturating_sub(1);
        if agent.health > 0 {
            out_events.push(Event::AgentDamaged {
                agent: id,
                remaining: agent.health,
            });
            return;
        }

        let agent = self.agents.remove(index);
        if agent.kind.is_corporeal() {
            let _ = self.grid.remove_agent(agent.cell, id);
        } else {
            let _ = self.grid.remove_phantom(agent.cell, id);
        }
        let reward = agent.tunables.reward;
        self.target.score = self.target.score.saturating_add(reward);
        tracing::info!(
            "agent {} killed at {:?}, score now {}",
            id.get(),
            agent.cell,
            self.target.score
        );
        out_events.push(Event::AgentKilled {
            agent: id,
            cell: agent.cell,
            reward,
        });
    }

    fn collect_item(&mut self, out_events: &mut Vec<Event>) {
        let Some(cell) = self.target.cell else {
            return;
        };

        let holds_pickup = |cell: CellCoord| {
            self.grid
                .occupant_kind(cell)
                .is_some_and(OccupantKind::is_pickup)
        };
        let source = if holds_pickup(cell) {
            Some(cell)
        } else {
            self.grid
                .adjacent(cell, self.target.direction)
                .filter(|facing| holds_pickup(*facing))
        };
        let Some(source) = source else {
            return;
        };
        let Some(kind) = self.grid.occupant_kind(source) else {
            return;
        };

        match kind {
            OccupantKind::Gun => {
                self.target.ammo = self.target.ammo.saturating_add(AMMO_PER_GUN);
            }
            OccupantKind::Heart => {
                self.target.health = (self.target.health + 1).min(MAX_TARGET_HEALTH);
            }
            OccupantKind::Key => {
                self.target.carries_key = true;
                self.grid.set_conceals_key(source, false);
            }
            OccupantKind::FoldedBarricade => {
                self.target.barricades = self.target.barricades.saturating_add(1);
            }
            _ => return,
        }

        let stored = self.grid.set_occupant_kind(source, OccupantKind::Empty);
        out_events.push(Event::ItemCollected { cell: source, kind });
        if stored == Some(OccupantKind::Key) {
            out_events.push(Event::KeyRevealed { cell: source });
        }
    }

    fn deploy_barricade(&mut self, out_events: &mut Vec<Event>) {
        if self.target.barricades == 0 {
            return;
        }
        let Some(facing) = self
            .target
            .cell
            .and_then(|cell| self.grid.adjacent(cell, self.target.direction))
        else {
            return;
        };
        if self.grid.occupant_kind(facing) != Some(OccupantKind::Empty)
            || !self.grid.agents(facing).is_empty()
        {
            return;
        }

        self.target.barricades -= 1;
        let _ = self.grid.set_occupant_kind(facing, OccupantKind::Barricade);
        out_events.push(Event::BarricadeDeployed { cell: facing });
    }

    fn unlock_exit(&mut self, out_events: &mut Vec<Event>) {
        if !self.target.carries_key {
            return;
        }
        let Some(facing) = self
            .target
            .cell
            .and_then(|cell| self.grid.adjacent(cell, self.target.direction))
        else {
            return;
        };
        if self.grid.occupant_kind(facing) != Some(OccupantKind::Lock) {
            return;
        }

        self.target.carries_key = false;
        let stored = self.grid.set_occupant_kind(facing, OccupantKind::Empty);
        tracing::info!("exit at {:?} unlocked", facing);
        out_events.push(Event::ExitUnlocked { cell: facing });
        if stored == Some(OccupantKind::Key) {
            out_events.push(Event::KeyRevealed { cell: facing });
        }
    }

    fn steer_agent(
        &mut self,
        id: AgentId,
        direction: Direction,
        dt: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let World { grid, agents, .. } = self;
        let agent = &mut agents[index];
        if agent.state == AgentState::Dormant {
            return;
        }

        agent.direction = direction;
        let corporeal = agent.kind.is_corporeal();
        let max_step = grid.cell_length() * 0.5;
        let mut remaining = agent.tunables.speed * dt.as_secs_f32();
        while remaining > 0.0 {
            let step = remaining.min(max_step);
            remaining -= step;

            let halt = corporeal
                && grid.adjacent(agent.cell, direction).map_or(true, |facing| {
                    grid.occupant_kind(facing)
                        .map_or(true, OccupantKind::blocks_search)
                        || grid.holds_other_agent(facing, Some(id))
                });
            agent.position = stride(grid, agent.cell, agent.position, direction, step, halt, true);

            let Some(next) = crossed_into(grid, agent.cell, agent.position, direction) else {
                continue;
            };
            let from = agent.cell;
            if corporeal {
                let _ = grid.remove_agent(from, id);
                let _ = grid.place_agent(next, id);
            } else {
                let _ = grid.remove_phantom(from, id);
                grid.place_phantom(next, id);
            }
            agent.cell = next;
            if agent.chase_path.get(1) == Some(&next) {
                let _ = agent.chase_path.remove(0);
            }
            tracing::debug!("agent {} advanced from {:?} to {:?}", id.get(), from, next);
            out_events.push(Event::AgentAdvanced {
                agent: id,
                from,
                to: next,
            });
        }

        scavenge(grid, agent, out_events);
    }

    fn set_agent_state(&mut self, id: AgentId, state: AgentState, out_events: &mut Vec<Event>) {
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        if agent.kind == AgentKind::Phantom || agent.state == state || state == AgentState::Dormant
        {
            return;
        }

        let from = agent.state;
        agent.state = state;
        if from == AgentState::Dormant {
            agent.opacity = 1.0;
        }
        tracing::debug!("agent {} changed state {:?} -> {:?}", id.get(), from, state);
        out_events.push(Event::AgentStateChanged {
            agent: id,
            from,
            to: state,
        });
    }

    fn assign_chase_path(&mut self, id: AgentId, path: Vec<CellCoord>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let World { grid, agents, .. } = self;
        let agent = &mut agents[index];

        if let Some(first) = path.first() {
            let anchored = *first == agent.cell || agent.cell.direction_to(*first).is_some();
            let connected = path
                .windows(2)
                .all(|pair| pair[0].direction_to(pair[1]).is_some());
            if !anchored || !connected || !path.iter().all(|cell| grid.contains(*cell)) {
                tracing::debug!("agent {} rejected a disconnected chase path", id.get());
                return;
            }
        }

        tracing::trace!("agent {} received a chase path of {} cells", id.get(), path.len());
        agent.chase_path = path;
    }

    fn set_agent_sighted(&mut self, id: AgentId, sighted: bool) {
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        if agent.kind == AgentKind::Phantom || agent.state == AgentState::Dormant {
            return;
        }

        agent.opacity = if sighted {
            (agent.opacity + OPACITY_STEP).min(1.0)
        } else {
            (agent.opacity - OPACITY_STEP).max(0.0)
        };
    }

    fn engage_target(&mut self, id: AgentId, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let World {
            grid,
            agents,
            target,
            ..
        } = self;
        let agent = &mut agents[index];
        let full = agent.tunables.attack_cooldown;

        let in_reach = target.cell.is_some_and(|cell| {
            cell == agent.cell || grid.adjacent(agent.cell, agent.direction) == Some(cell)
        });
        if !in_reach || target.health == 0 {
            agent.cooldown = full;
            return;
        }

        agent.cooldown = agent.cooldown.saturating_sub(dt);
        if !agent.cooldown.is_zero() {
            return;
        }

        agent.cooldown = full;
        let amount = agent.tunables.damage;
        target.health = target.health.saturating_sub(amount);
        out_events.push(Event::TargetDamaged {
            agent: id,
            amount,
            remaining: target.health,
        });
        if target.health == 0 {
            tracing::info!("target defeated by agent {}", id.get());
            out_events.push(Event::TargetDefeated);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            world.advance_projectiles(dt, out_events);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::MoveTarget { direction, dt } => {
            world.move_target(direction, dt, false, out_events);
        }
        Command::ExitTarget { direction, dt } => {
            world.move_target(direction, dt, true, out_events);
        }
        Command::FireProjectile => world.fire_projectile(out_events),
        Command::CollectItem => world.collect_item(out_events),
        Command::DeployBarricade => world.deploy_barricade(out_events),
        Command::UnlockExit => world.unlock_exit(out_events),
        Command::SteerAgent {
            agent,
            direction,
            dt,
        } => world.steer_agent(agent, direction, dt, out_events),
        Command::SetAgentState { agent, state } => {
            world.set_agent_state(agent, state, out_events);
        }
        Command::AssignChasePath { agent, path } => world.assign_chase_path(agent, path),
        Command::SetAgentSighted { agent, sighted } => world.set_agent_sighted(agent, sighted),
        Command::EngageTarget { agent, dt } => world.engage_target(agent, dt, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use escape_core::{
        AgentSnapshot, AgentView, CellCoord, Direction, ProjectileId, SightModel, TargetSnapshot,
    };
    use glam::Vec2;

    use super::{Grid, World};

    /// Provides read-only access to the grid model.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Line-of-sight algorithm selected by the level.
    #[must_use]
    pub fn sight_model(world: &World) -> SightModel {
        world.sight
    }

    /// Seed the level was loaded with.
    #[must_use]
    pub fn seed(world: &World) -> u64 {
        world.seed
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Simulated time processed so far.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Captures a read-only view of the agents inhabiting the world.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                kind: agent.kind,
                state: agent.state,
                cell: agent.cell,
                direction: agent.direction,
                position: agent.position,
                health: agent.health,
                opacity: agent.opacity,
                chase_path: agent.chase_path.clone(),
                tunables: agent.tunables,
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Captures the state of the target.
    #[must_use]
    pub fn target(world: &World) -> TargetSnapshot {
        let target = &world.target;
        TargetSnapshot {
            cell: target.cell,
            direction: target.direction,
            position: target.position,
            health: target.health,
            ammo: target.ammo,
            score: target.score,
            carries_key: target.carries_key,
            barricades: target.barricades,
        }
    }

    /// Reports whether the target ran out of health.
    #[must_use]
    pub fn is_target_defeated(world: &World) -> bool {
        world.target.health == 0
    }

    /// Captures every projectile currently in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                id: projectile.id,
                cell: projectile.cell,
                direction: projectile.direction,
                position: projectile.position,
            })
            .collect()
    }

    /// Immutable representation of a projectile in flight.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Unique identifier of the projectile.
        pub id: ProjectileId,
        /// Cell containing the projectile tip.
        pub cell: CellCoord,
        /// Direction of flight.
        pub direction: Direction,
        /// Tip of the projectile in world units.
        pub position: Vec2,
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    kind: AgentKind,
    state: AgentState,
    cell: CellCoord,
    direction: Direction,
    position: Vec2,
    health: u32,
    opacity: f32,
    chase_path: Vec<CellCoord>,
    cooldown: Duration,
    tunables: AgentTunables,
}

impl Agent {
    fn spawn(
        id: AgentId,
        kind: AgentKind,
        cell: CellCoord,
        position: Vec2,
        tunables: AgentTunables,
    ) -> Self {
        let opacity = if kind == AgentKind::Phantom {
            PHANTOM_OPACITY
        } else {
            0.0
        };
        Self {
            id,
            kind,
            state: kind.initial_state(),
            cell,
            direction: Direction::West,
            position,
            health: tunables.health,
            opacity,
            chase_path: Vec::new(),
            cooldown: tunables.attack_cooldown,
            tunables,
        }
    }
}

#[derive(Clone, Debug)]
struct Target {
    cell: Option<CellCoord>,
    direction: Direction,
    position: Vec2,
    speed: f32,
    health: u32,
    ammo: u32,
    score: u32,
    carries_key: bool,
    barricades: u32,
}

#[derive(Clone, Debug)]
struct Projectile {
    id: ProjectileId,
    cell: CellCoord,
    direction: Direction,
    position: Vec2,
}

fn validate_placement(grid: &Grid, cell: CellCoord, role: &'static str) -> Result<(), LevelError> {
    if !grid.contains(cell) {
        return Err(LevelError::OutOfBounds {
            role,
            row: cell.row(),
            column: cell.column(),
            rows: grid.rows(),
            columns: grid.columns(),
        });
    }
    if grid.is_wall(cell) {
        return Err(LevelError::PlacedOnWall {
            role,
            row: cell.row(),
            column: cell.column(),
        });
    }
    Ok(())
}

fn origin_of(grid: &Grid, cell: CellCoord) -> Vec2 {
    grid.bounds(cell).map_or(Vec2::ZERO, |bounds| bounds.origin())
}

/// Advances a footprint along `direction`, keeping it aligned with its cell.
///
/// A halted footprint never moves past the origin of its current cell; a
/// confined footprint never leaves the map.
fn stride(
    grid: &Grid,
    cell: CellCoord,
    position: Vec2,
    direction: Direction,
    distance: f32,
    halt: bool,
    confined: bool,
) -> Vec2 {
    let origin = origin_of(grid, cell);
    let mut next = position + direction.unit() * distance;
    if direction.is_vertical() {
        next.x = origin.x;
    } else {
        next.y = origin.y;
    }

    if halt {
        match direction {
            Direction::North => next.y = next.y.max(origin.y.min(position.y)),
            Direction::South => next.y = next.y.min(origin.y.max(position.y)),
            Direction::West => next.x = next.x.max(origin.x.min(position.x)),
            Direction::East => next.x = next.x.min(origin.x.max(position.x)),
        }
    }

    if confined {
        let length = grid.cell_length();
        next.x = next.x.clamp(0.0, grid.width() - length);
        next.y = next.y.clamp(0.0, grid.height() - length);
    }
    next
}

/// Neighbouring cell in `direction` whose bounds now contain the footprint centre.
fn crossed_into(
    grid: &Grid,
    cell: CellCoord,
    position: Vec2,
    direction: Direction,
) -> Option<CellCoord> {
    let next = grid.adjacent(cell, direction)?;
    let center = position + Vec2::splat(grid.cell_length() * 0.5);
    grid.bounds(next)?.contains(center).then_some(next)
}

fn footprint_on_map(grid: &Grid, position: Vec2) -> bool {
    let length = grid.cell_length();
    position.x + length > 0.0
        && position.y + length > 0.0
        && position.x < grid.width()
        && position.y < grid.height()
}

fn footprint_contains(position: Vec2, length: f32, point: Vec2) -> bool {
    point.x >= position.x
        && point.y >= position.y
        && point.x <= position.x + length
        && point.y <= position.y + length
}

fn scavenge(grid: &mut Grid, agent: &mut Agent, out_events: &mut Vec<Event>) {
    let wanted = match agent.kind {
        AgentKind::Reactive => OccupantKind::Gun,
        AgentKind::Latent => OccupantKind::Heart,
        AgentKind::Phantom => return,
    };
    if grid.occupant_kind(agent.cell) != Some(wanted) {
        return;
    }

    let stored = grid.set_occupant_kind(agent.cell, OccupantKind::Empty);
    if wanted == OccupantKind::Heart {
        agent.health = agent.health.saturating_add(1);
    }
    out_events.push(Event::AgentScavenged {
        agent: agent.id,
        cell: agent.cell,
        kind: wanted,
    });
    if stored == Some(OccupantKind::Key) {
        out_events.push(Event::KeyRevealed { cell: agent.cell });
    }
}
