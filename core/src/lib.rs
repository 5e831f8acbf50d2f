#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Escape pursuit engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Side length of a square grid cell measured in world units.
pub const DEFAULT_CELL_LENGTH: f32 = 32.0;

/// Finite traversal cost assigned to obstacles the pathfinder should avoid.
pub const OBSTACLE_COST: u32 = 100_000;

/// Ammunition granted by a single gun pickup.
pub const AMMO_PER_GUN: u32 = 5;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock and moves projectiles.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Walks the target in the provided direction for one tick.
    MoveTarget {
        /// Direction the target faces and attempts to walk toward.
        direction: Direction,
        /// Duration of simulated time spent walking.
        dt: Duration,
    },
    /// Walks the target out of the map, ignoring obstacles.
    ExitTarget {
        /// Direction in which the target leaves the map.
        direction: Direction,
        /// Duration of simulated time spent walking.
        dt: Duration,
    },
    /// Fires a projectile from the target along its facing direction.
    FireProjectile,
    /// Picks up the item lying on or directly in front of the target.
    CollectItem,
    /// Unfolds a carried barricade onto the empty cell the target faces.
    DeployBarricade,
    /// Opens the lock the target faces using the carried key.
    UnlockExit,
    /// Moves an agent continuously toward the provided direction.
    SteerAgent {
        /// Identifier of the agent being moved.
        agent: AgentId,
        /// Direction of travel.
        direction: Direction,
        /// Duration of simulated time spent moving.
        dt: Duration,
    },
    /// Transitions an agent into a new behavioural state.
    SetAgentState {
        /// Identifier of the agent changing state.
        agent: AgentId,
        /// State the agent should adopt.
        state: AgentState,
    },
    /// Replaces the cached chase path of an agent.
    AssignChasePath {
        /// Identifier of the agent receiving the path.
        agent: AgentId,
        /// Ordered cells from the agent toward the target.
        path: Vec<CellCoord>,
    },
    /// Reports whether an agent currently has line of sight to the target.
    SetAgentSighted {
        /// Identifier of the agent whose opacity fades.
        agent: AgentId,
        /// Whether the agent sees the target this tick.
        sighted: bool,
    },
    /// Evaluates the agent's attack against the target for one tick.
    EngageTarget {
        /// Identifier of the attacking agent.
        agent: AgentId,
        /// Duration of simulated time accumulated toward the attack.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the target walked during the tick.
    TargetMoved {
        /// Direction the target faced while walking.
        direction: Direction,
    },
    /// Confirms that the target crossed into a neighbouring cell.
    TargetCellChanged {
        /// Cell the target occupied before moving.
        from: CellCoord,
        /// Cell the target occupies after moving.
        to: CellCoord,
    },
    /// Announces that the target left the map and no longer occupies a cell.
    TargetEscaped {
        /// Last cell the target occupied.
        from: CellCoord,
    },
    /// Reports that an agent struck the target.
    TargetDamaged {
        /// Identifier of the attacking agent.
        agent: AgentId,
        /// Health removed by the attack.
        amount: u32,
        /// Health the target retains after the attack.
        remaining: u32,
    },
    /// Announces that the target ran out of health.
    TargetDefeated,
    /// Confirms that the target picked up an item.
    ItemCollected {
        /// Cell the item was taken from.
        cell: CellCoord,
        /// Kind of item collected.
        kind: OccupantKind,
    },
    /// Confirms that the target unfolded a barricade.
    BarricadeDeployed {
        /// Cell now holding the barricade.
        cell: CellCoord,
    },
    /// Confirms that the target opened the lock.
    ExitUnlocked {
        /// Cell that held the lock.
        cell: CellCoord,
    },
    /// Reports that an agent consumed an item lying on its cell.
    AgentScavenged {
        /// Identifier of the agent.
        agent: AgentId,
        /// Cell the item was taken from.
        cell: CellCoord,
        /// Kind of item consumed.
        kind: OccupantKind,
    },
    /// Announces that clearing a cell uncovered the concealed key.
    KeyRevealed {
        /// Cell that now shows the key.
        cell: CellCoord,
    },
    /// Confirms that an agent moved between two cells.
    AgentAdvanced {
        /// Identifier of the agent that advanced.
        agent: AgentId,
        /// Cell the agent occupied before moving.
        from: CellCoord,
        /// Cell the agent occupies after moving.
        to: CellCoord,
    },
    /// Announces a behavioural state transition.
    AgentStateChanged {
        /// Identifier of the agent.
        agent: AgentId,
        /// State before the transition.
        from: AgentState,
        /// State after the transition.
        to: AgentState,
    },
    /// Confirms that the target fired a projectile.
    ProjectileFired {
        /// Identifier allocated to the projectile.
        projectile: ProjectileId,
        /// Cell the projectile starts in.
        cell: CellCoord,
        /// Direction of flight.
        direction: Direction,
    },
    /// Reports that a projectile left play without hitting an agent.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
    },
    /// Reports that a projectile wounded an agent.
    AgentDamaged {
        /// Identifier of the wounded agent.
        agent: AgentId,
        /// Health the agent retains.
        remaining: u32,
    },
    /// Announces that an agent died and left the world.
    AgentKilled {
        /// Identifier of the killed agent.
        agent: AgentId,
        /// Cell the agent occupied when it died.
        cell: CellCoord,
        /// Score awarded for the kill.
        reward: u32,
    },
}

/// Cardinal movement directions available to every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Direction obtained by a quarter turn clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Dense index usable for per-direction lookup tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Unit vector in world space; the y axis grows with the row index.
    #[must_use]
    pub fn unit(self) -> Vec2 {
        match self {
            Self::North => Vec2::new(0.0, -1.0),
            Self::East => Vec2::new(1.0, 0.0),
            Self::South => Vec2::new(0.0, 1.0),
            Self::West => Vec2::new(-1.0, 0.0),
        }
    }

    /// Reports whether travel happens along the row axis.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::North | Self::South)
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the straight-line distance between two cell coordinates.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let rows = self.row().abs_diff(other.row()) as f32;
        let columns = self.column().abs_diff(other.column()) as f32;
        rows.hypot(columns)
    }

    /// Direction of a single cardinal step from `self` to `other`, if they touch.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Option<Direction> {
        let column_diff = self.column().abs_diff(other.column());
        let row_diff = self.row().abs_diff(other.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if other.column() > self.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if other.row() > self.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Traversal cost class assigned to an occupant kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraversalCost {
    /// The cell can never be entered by a search.
    Impassable,
    /// Entering the cell adds the provided cost to a path.
    Finite(u32),
}

impl TraversalCost {
    /// Finite cost, or `None` for impassable cells.
    #[must_use]
    pub const fn finite(self) -> Option<u32> {
        match self {
            Self::Impassable => None,
            Self::Finite(cost) => Some(cost),
        }
    }
}

/// Terrain or item occupying a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantKind {
    /// Wall segment drawn vertically.
    VerticalWall,
    /// Wall segment drawn horizontally.
    HorizontalWall,
    /// Deployed barricade that blocks walking.
    Barricade,
    /// Folded barricade lying on the floor, ready to be picked up.
    FoldedBarricade,
    /// Chair furniture.
    Chair,
    /// Box furniture.
    Box,
    /// Gun pickup.
    Gun,
    /// Key pickup.
    Key,
    /// Locked exit.
    Lock,
    /// Heart pickup.
    Heart,
    /// Open floor.
    Empty,
}

impl OccupantKind {
    /// Reports whether the kind is one of the wall variants.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::VerticalWall | Self::HorizontalWall)
    }

    /// Reports whether walking entities stop in front of the kind.
    #[must_use]
    pub const fn blocks_walking(self) -> bool {
        matches!(
            self,
            Self::VerticalWall
                | Self::HorizontalWall
                | Self::Barricade
                | Self::Chair
                | Self::Box
                | Self::Lock
        )
    }

    /// Reports whether corporeal agents never plan through or step onto the kind.
    #[must_use]
    pub const fn blocks_search(self) -> bool {
        matches!(
            self,
            Self::VerticalWall | Self::HorizontalWall | Self::Barricade
        )
    }

    /// Reports whether the target may pick the kind up.
    #[must_use]
    pub const fn is_pickup(self) -> bool {
        matches!(
            self,
            Self::FoldedBarricade | Self::Gun | Self::Key | Self::Heart
        )
    }

    /// Fixed cost lookup used by the pathfinder.
    #[must_use]
    pub const fn traversal_cost(self) -> TraversalCost {
        match self {
            Self::VerticalWall | Self::HorizontalWall | Self::Barricade => {
                TraversalCost::Impassable
            }
            Self::Lock => TraversalCost::Finite(OBSTACLE_COST),
            Self::Box => TraversalCost::Finite(10),
            Self::Chair => TraversalCost::Finite(5),
            Self::FoldedBarricade | Self::Gun | Self::Key | Self::Heart | Self::Empty => {
                TraversalCost::Finite(1)
            }
        }
    }

    /// Single-character glyph used by level layouts.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::VerticalWall => '|',
            Self::HorizontalWall => '-',
            Self::Barricade => '#',
            Self::FoldedBarricade => '=',
            Self::Chair => 'h',
            Self::Box => 'b',
            Self::Gun => 'g',
            Self::Key => 'k',
            Self::Lock => 'L',
            Self::Heart => '+',
            Self::Empty => '.',
        }
    }

    /// Parses a layout glyph.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        let kind = match glyph {
            '|' => Self::VerticalWall,
            '-' => Self::HorizontalWall,
            '#' => Self::Barricade,
            '=' => Self::FoldedBarricade,
            'h' => Self::Chair,
            'b' => Self::Box,
            'g' => Self::Gun,
            'k' => Self::Key,
            'L' => Self::Lock,
            '+' => Self::Heart,
            '.' => Self::Empty,
            _ => return None,
        };
        Some(kind)
    }
}

/// Concrete agent kinds that differ only in behaviour wiring and tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Alternates between patrol and chase based on chase-path length.
    Reactive,
    /// Starts inert and activates on short-range line of sight.
    Latent,
    /// Drifts through terrain toward random destinations.
    Phantom,
}

impl AgentKind {
    /// Reports whether the kind takes part in cell occupancy and blocking.
    #[must_use]
    pub const fn is_corporeal(self) -> bool {
        !matches!(self, Self::Phantom)
    }

    /// State the kind adopts when it spawns.
    #[must_use]
    pub const fn initial_state(self) -> AgentState {
        match self {
            Self::Reactive => AgentState::Pursuing,
            Self::Latent => AgentState::Dormant,
            Self::Phantom => AgentState::Patrolling,
        }
    }
}

/// Behavioural states an agent cycles through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Invisible and inert until the target comes into short-range view.
    Dormant,
    /// Wandering while occasionally probing for a path to the target.
    Patrolling,
    /// Following a freshly recomputed path toward the target.
    Pursuing,
}

/// Line-of-sight algorithm used by agents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SightModel {
    /// Row-driven and column-driven interpolation sweeps.
    #[default]
    DualSweep,
    /// Walk of every cell the segment between cell centres touches.
    Supercover,
}

/// Per-kind tuning values supplied by the level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentTunables {
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Health the agent spawns with.
    pub health: u32,
    /// Health removed from the target per successful attack.
    pub damage: u32,
    /// Score awarded when the agent is killed.
    pub reward: u32,
    /// Euclidean radius, in cells, inside which the agent can see the target.
    pub detection_radius: f32,
    /// Chase paths shorter than this many cells make a patrolling agent pursue.
    pub notice_threshold: usize,
    /// Axis-aligned radius, in cells, that wakes a dormant agent.
    pub trigger_radius: u32,
    /// Time the target must stay in reach before an attack lands.
    pub attack_cooldown: Duration,
}

impl AgentTunables {
    /// Default tuning for the provided agent kind.
    #[must_use]
    pub const fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Reactive => Self {
                speed: 60.0,
                health: 3,
                damage: 2,
                reward: 20,
                detection_radius: 20.0,
                notice_threshold: 6,
                trigger_radius: 0,
                attack_cooldown: Duration::from_millis(500),
            },
            AgentKind::Latent => Self {
                speed: 80.0,
                health: 5,
                damage: 3,
                reward: 40,
                detection_radius: 20.0,
                notice_threshold: 0,
                trigger_radius: 4,
                attack_cooldown: Duration::from_millis(500),
            },
            AgentKind::Phantom => Self {
                speed: 60.0,
                health: 1,
                damage: 1,
                reward: 0,
                detection_radius: 0.0,
                notice_threshold: 0,
                trigger_radius: 0,
                attack_cooldown: Duration::from_millis(500),
            },
        }
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Behaviour wiring of the agent.
    pub kind: AgentKind,
    /// Current behavioural state.
    pub state: AgentState,
    /// Grid cell currently occupied by the agent.
    pub cell: CellCoord,
    /// Facing direction.
    pub direction: Direction,
    /// Upper-left corner of the agent's footprint in world units.
    pub position: Vec2,
    /// Remaining health.
    pub health: u32,
    /// Opacity used when fading the agent in and out.
    pub opacity: f32,
    /// Most recently assigned chase path.
    pub chase_path: Vec<CellCoord>,
    /// Tuning values of the agent.
    pub tunables: AgentTunables,
}

/// Read-only snapshot describing all agents within the world.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the target used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSnapshot {
    /// Cell occupied by the target, absent once it left the map.
    pub cell: Option<CellCoord>,
    /// Facing direction.
    pub direction: Direction,
    /// Upper-left corner of the target's footprint in world units.
    pub position: Vec2,
    /// Remaining health.
    pub health: u32,
    /// Projectiles the target can still fire.
    pub ammo: u32,
    /// Accumulated score.
    pub score: u32,
    /// Whether the target carries the key.
    pub carries_key: bool,
    /// Folded barricades the target carries.
    pub barricades: u32,
}
