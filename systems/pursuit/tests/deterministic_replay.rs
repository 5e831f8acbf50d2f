use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use escape_core::{AgentId, AgentKind, AgentState, CellCoord, Command, Direction, Event};
use escape_system_pursuit::Pursuit;
use escape_world::{self as world, query, LevelConfig, World};

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(&level(5), scripted_commands());
    let second = replay(&level(5), scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first
        .events
        .iter()
        .any(|record| matches!(record, EventRecord::AgentAdvanced { .. })));
}

fn level(seed: u64) -> LevelConfig {
    LevelConfig::new(
        [
            "..........", //
            ".|....b...", //
            ".|..h.....", //
            ".|....---.", //
            "......+..g", //
            "..........", //
        ],
        CellCoord::new(0, 0),
    )
    .with_seed(seed)
    .with_key(CellCoord::new(1, 6))
    .with_spawn(AgentKind::Reactive, CellCoord::new(5, 9))
    .with_spawn(AgentKind::Reactive, CellCoord::new(2, 2))
    .with_spawn(AgentKind::Latent, CellCoord::new(0, 4))
    .with_spawn(AgentKind::Phantom, CellCoord::new(4, 4))
}

fn replay(level: &LevelConfig, commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::from_level(level).expect("valid level");
    let mut pursuit = Pursuit::new(query::seed(&world), query::sight_model(&world));
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);
        record_events(&events, &mut log);
        process_pursuit(&mut world, &mut pursuit, events, &mut log);
    }

    let agents = query::agent_view(&world)
        .into_vec()
        .into_iter()
        .map(|agent| AgentRecord {
            id: agent.id,
            state: agent.state,
            cell: agent.cell,
            direction: agent.direction,
            position_bits: (agent.position.x.to_bits(), agent.position.y.to_bits()),
            health: agent.health,
        })
        .collect();

    ReplayOutcome {
        agents,
        target_health: query::target(&world).health,
        events: log,
    }
}

fn process_pursuit(
    world: &mut World,
    pursuit: &mut Pursuit,
    pending_events: Vec<Event>,
    log: &mut Vec<EventRecord>,
) {
    let mut events = pending_events;

    loop {
        if events.is_empty() {
            break;
        }

        let mut commands = Vec::new();
        pursuit.handle(
            &events,
            query::grid(world),
            &query::agent_view(world),
            &query::target(world),
            &mut commands,
        );

        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            let mut generated_events = Vec::new();
            world::apply(world, command, &mut generated_events);
            record_events(&generated_events, log);
            events.extend(generated_events);
        }
    }
}

fn record_events(events: &[Event], log: &mut Vec<EventRecord>) {
    log.extend(events.iter().filter_map(EventRecord::from_event));
}

fn scripted_commands() -> Vec<Command> {
    let tick = Command::Tick {
        dt: Duration::from_millis(50),
    };
    let walk = |direction| Command::MoveTarget {
        direction,
        dt: Duration::from_millis(50),
    };

    let mut commands = Vec::new();
    for step in 0..240 {
        let direction = match (step / 30) % 4 {
            0 => Direction::East,
            1 => Direction::South,
            2 => Direction::West,
            _ => Direction::North,
        };
        commands.push(walk(direction));
        commands.push(tick.clone());
    }
    commands
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    agents: Vec<AgentRecord>,
    target_health: u32,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AgentRecord {
    id: AgentId,
    state: AgentState,
    cell: CellCoord,
    direction: Direction,
    position_bits: (u32, u32),
    health: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    TimeAdvanced {
        dt_micros: u128,
    },
    TargetCellChanged {
        from: CellCoord,
        to: CellCoord,
    },
    TargetDamaged {
        agent: AgentId,
        remaining: u32,
    },
    AgentAdvanced {
        agent: AgentId,
        from: CellCoord,
        to: CellCoord,
    },
    AgentStateChanged {
        agent: AgentId,
        to: AgentState,
    },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        let record = match event {
            Event::TimeAdvanced { dt } => Self::TimeAdvanced {
                dt_micros: dt.as_micros(),
            },
            Event::TargetCellChanged { from, to } => Self::TargetCellChanged {
                from: *from,
                to: *to,
            },
            Event::TargetDamaged {
                agent, remaining, ..
            } => Self::TargetDamaged {
                agent: *agent,
                remaining: *remaining,
            },
            Event::AgentAdvanced { agent, from, to } => Self::AgentAdvanced {
                agent: *agent,
                from: *from,
                to: *to,
            },
            Event::AgentStateChanged { agent, to, .. } => Self::AgentStateChanged {
                agent: *agent,
                to: *to,
            },
            _ => return None,
        };
        Some(record)
    }
}
