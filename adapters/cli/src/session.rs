use std::{fmt, time::Duration};

use escape_core::{Command, Event};
use escape_system_pursuit::Pursuit;
use escape_world::{self as world, query, LevelConfig, LevelError, World, MAX_TARGET_HEALTH};

use crate::script::Action;

/// How a headless run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The target left the map.
    Escaped,
    /// The agents wore the target down.
    Defeated,
    /// The tick budget ran out with the target still inside.
    Survived,
}

/// Summary printed once a run ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) outcome: Outcome,
    pub(crate) ticks: u64,
    pub(crate) health: u32,
    pub(crate) ammo: u32,
    pub(crate) score: u32,
    pub(crate) agents: usize,
    pub(crate) kills: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Escaped => "escaped",
            Outcome::Defeated => "defeated",
            Outcome::Survived => "survived",
        };
        writeln!(f, "outcome: {outcome} after {} ticks", self.ticks)?;
        writeln!(
            f,
            "target: health {}/{MAX_TARGET_HEALTH}, ammo {}, score {}",
            self.health, self.ammo, self.score
        )?;
        write!(f, "agents: {} remaining, {} killed", self.agents, self.kills)
    }
}

/// World plus the controller driving its agents.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    pursuit: Pursuit,
    kills: usize,
}

impl Session {
    pub(crate) fn new(level: &LevelConfig) -> Result<Self, LevelError> {
        let world = World::from_level(level)?;
        let pursuit = Pursuit::new(query::seed(&world), query::sight_model(&world));
        Ok(Self {
            world,
            pursuit,
            kills: 0,
        })
    }

    /// Plays the script one action per tick until the run ends or `ticks` elapse.
    pub(crate) fn run(&mut self, ticks: u64, dt: Duration, script: &[Action]) -> Report {
        tracing::info!(
            "running {} ticks of {:?} with {} scripted actions",
            ticks,
            dt,
            script.len()
        );

        let mut played = 0;
        while played < ticks {
            if let Some(outcome) = self.outcome() {
                return self.report(outcome, played);
            }

            let action = usize::try_from(played)
                .ok()
                .and_then(|index| script.get(index).copied())
                .unwrap_or(Action::Wait);
            if let Some(command) = action.command(dt) {
                self.submit(command);
            }
            self.submit(Command::Tick { dt });
            played += 1;
        }

        let outcome = self.outcome().unwrap_or(Outcome::Survived);
        self.report(outcome, played)
    }

    fn outcome(&self) -> Option<Outcome> {
        if query::is_target_defeated(&self.world) {
            Some(Outcome::Defeated)
        } else if query::target(&self.world).cell.is_none() {
            Some(Outcome::Escaped)
        } else {
            None
        }
    }

    fn report(&self, outcome: Outcome, ticks: u64) -> Report {
        let target = query::target(&self.world);
        let report = Report {
            outcome,
            ticks,
            health: target.health,
            ammo: target.ammo,
            score: target.score,
            agents: query::agent_view(&self.world).len(),
            kills: self.kills,
        };
        tracing::info!("run ended: {:?} after {} ticks", outcome, ticks);
        report
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events);
    }

    fn pump(&mut self, pending: Vec<Event>) {
        let mut events = pending;
        loop {
            self.kills += events
                .iter()
                .filter(|event| matches!(event, Event::AgentKilled { .. }))
                .count();
            if events.is_empty() {
                break;
            }

            let mut commands = Vec::new();
            self.pursuit.handle(
                &events,
                query::grid(&self.world),
                &query::agent_view(&self.world),
                &query::target(&self.world),
                &mut commands,
            );
            if commands.is_empty() {
                break;
            }

            events.clear();
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;
    use escape_core::{AgentKind, CellCoord};

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn bundled_level_loads_and_runs() {
        let level = LevelConfig::from_toml(include_str!("../levels/warehouse.toml"))
            .expect("bundled level parses");
        let mut session = Session::new(&level).expect("bundled level is valid");
        let report = session.run(40, TICK, &[]);
        assert_eq!(report.outcome, Outcome::Survived);
        assert_eq!(report.ticks, 40);
        assert_eq!(report.agents, level.spawns.len());
    }

    #[test]
    fn walking_off_the_map_escapes() {
        let level = LevelConfig::open(1, 2, CellCoord::new(0, 1));
        let mut session = Session::new(&level).expect("valid level");
        let script = script::parse("E20").expect("valid script");
        let report = session.run(100, TICK, &script);
        assert_eq!(report.outcome, Outcome::Escaped);
        assert!(report.ticks < 20);
    }

    #[test]
    fn idle_target_is_defeated() {
        let level = LevelConfig::open(1, 4, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(0, 3));
        let mut session = Session::new(&level).expect("valid level");
        let report = session.run(1_000, TICK, &[]);
        assert_eq!(report.outcome, Outcome::Defeated);
        assert_eq!(report.health, 0);
        assert!(report.ticks < 1_000);
    }

    #[test]
    fn shooting_an_approaching_agent_scores() {
        let level = LevelConfig::open(1, 8, CellCoord::new(0, 0))
            .with_spawn(AgentKind::Reactive, CellCoord::new(0, 5))
            .with_ammo(3);
        let mut session = Session::new(&level).expect("valid level");
        let script = script::parse("e f f f").expect("valid script");
        let report = session.run(60, TICK, &script);
        assert_eq!(report.kills, 1);
        assert_eq!(report.score, 20);
        assert_eq!(report.agents, 0);
        assert_eq!(report.ammo, 0);
    }
}
