use std::time::Duration;

use escape_core::{AgentKind, AgentTunables, CellCoord, SightModel, DEFAULT_CELL_LENGTH};
use serde::Deserialize;
use thiserror::Error;

/// Health the target starts with and may never exceed.
pub const MAX_TARGET_HEALTH: u32 = 10;

const DEFAULT_TARGET_SPEED: f32 = 100.0;

/// Errors reported while turning a level description into a world.
#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    /// The layout contains no rows or no columns.
    #[error("level layout is empty")]
    EmptyLayout,
    /// A layout row differs in width from the first row.
    #[error("layout row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A layout glyph does not name any occupant kind.
    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        /// Unrecognised character.
        glyph: char,
        /// Row of the character.
        row: usize,
        /// Column of the character.
        column: usize,
    },
    /// The cell side length is not a positive finite number.
    #[error("cell length must be positive and finite, got {0}")]
    InvalidCellLength(f32),
    /// A referenced cell lies outside the grid.
    #[error("{role} cell ({row}, {column}) lies outside the {rows}x{columns} grid")]
    OutOfBounds {
        /// What the cell was used for.
        role: &'static str,
        /// Row of the cell.
        row: u32,
        /// Column of the cell.
        column: u32,
        /// Number of grid rows.
        rows: u32,
        /// Number of grid columns.
        columns: u32,
    },
    /// An entity was placed on a wall.
    #[error("{role} cell ({row}, {column}) is a wall")]
    PlacedOnWall {
        /// What the cell was used for.
        role: &'static str,
        /// Row of the cell.
        row: u32,
        /// Column of the cell.
        column: u32,
    },
    /// A tuning value is out of its valid range.
    #[error("invalid {field} for {kind:?} agents: {reason}")]
    InvalidTunable {
        /// Agent kind the value belongs to.
        kind: AgentKind,
        /// Name of the offending field.
        field: &'static str,
        /// Description of the violated constraint.
        reason: &'static str,
    },
    /// The target speed is not a positive finite number.
    #[error("target speed must be positive and finite, got {0}")]
    InvalidTargetSpeed(f32),
}

/// Declarative description of a level, usually read from a TOML file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LevelConfig {
    /// Seed driving every random decision made during the level.
    #[serde(default)]
    pub seed: u64,
    /// Side length of a cell in world units.
    #[serde(default = "default_cell_length")]
    pub cell_length: f32,
    /// Line-of-sight algorithm agents use.
    #[serde(default)]
    pub sight: SightModel,
    /// Glyph rows describing the occupant kind of every cell.
    pub layout: Vec<String>,
    /// Cell the target starts in.
    pub target: CellCoord,
    /// Cell hiding the key, if the level has one.
    #[serde(default)]
    pub key: Option<CellCoord>,
    /// Agents placed when the level loads.
    #[serde(default)]
    pub spawns: Vec<SpawnConfig>,
    /// Tuning of the target.
    #[serde(default)]
    pub player: TargetConfig,
    /// Per-kind tuning overrides.
    #[serde(default)]
    pub tunables: TunablesConfig,
}

/// Placement of a single agent.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpawnConfig {
    /// Behaviour wiring of the agent.
    pub kind: AgentKind,
    /// Cell the agent starts in.
    pub cell: CellCoord,
}

/// Tuning applied to the target.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Walking speed in world units per second.
    pub speed: f32,
    /// Health the target starts with.
    pub health: u32,
    /// Projectiles the target starts with.
    pub ammo: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_TARGET_SPEED,
            health: MAX_TARGET_HEALTH,
            ammo: 0,
        }
    }
}

/// Optional overrides for every agent kind.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TunablesConfig {
    /// Overrides for reactive agents.
    pub reactive: KindTunables,
    /// Overrides for latent agents.
    pub latent: KindTunables,
    /// Overrides for phantom agents.
    pub phantom: KindTunables,
}

impl TunablesConfig {
    /// Resolves the effective tunables of an agent kind.
    pub fn resolve(&self, kind: AgentKind) -> Result<AgentTunables, LevelError> {
        let overrides = match kind {
            AgentKind::Reactive => &self.reactive,
            AgentKind::Latent => &self.latent,
            AgentKind::Phantom => &self.phantom,
        };
        overrides.apply(kind)
    }
}

/// Per-kind overrides; absent fields keep the kind's defaults.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KindTunables {
    /// Movement speed in world units per second.
    pub speed: Option<f32>,
    /// Spawn health.
    pub health: Option<u32>,
    /// Damage dealt per attack.
    pub damage: Option<u32>,
    /// Score awarded on death.
    pub reward: Option<u32>,
    /// Visibility radius in cells.
    pub detection_radius: Option<f32>,
    /// Chase path length below which a patrolling agent pursues.
    pub notice_threshold: Option<usize>,
    /// Axis-aligned wake radius in cells.
    pub trigger_radius: Option<u32>,
    /// Attack cooldown in milliseconds.
    pub attack_cooldown_ms: Option<u64>,
}

impl KindTunables {
    fn apply(&self, kind: AgentKind) -> Result<AgentTunables, LevelError> {
        let mut tunables = AgentTunables::for_kind(kind);
        if let Some(speed) = self.speed {
            tunables.speed = speed;
        }
        if let Some(health) = self.health {
            tunables.health = health;
        }
        if let Some(damage) = self.damage {
            tunables.damage = damage;
        }
        if let Some(reward) = self.reward {
            tunables.reward = reward;
        }
        if let Some(radius) = self.detection_radius {
            tunables.detection_radius = radius;
        }
        if let Some(threshold) = self.notice_threshold {
            tunables.notice_threshold = threshold;
        }
        if let Some(radius) = self.trigger_radius {
            tunables.trigger_radius = radius;
        }
        if let Some(millis) = self.attack_cooldown_ms {
            tunables.attack_cooldown = Duration::from_millis(millis);
        }

        let invalid = |field, reason| LevelError::InvalidTunable {
            kind,
            field,
            reason,
        };
        if !(tunables.speed.is_finite() && tunables.speed > 0.0) {
            return Err(invalid("speed", "must be positive and finite"));
        }
        if tunables.health == 0 {
            return Err(invalid("health", "must be at least one"));
        }
        if !(tunables.detection_radius.is_finite() && tunables.detection_radius >= 0.0) {
            return Err(invalid("detection_radius", "must be non-negative and finite"));
        }
        if tunables.attack_cooldown.is_zero() {
            return Err(invalid("attack_cooldown_ms", "must be at least one millisecond"));
        }
        Ok(tunables)
    }
}

impl LevelConfig {
    /// Creates a level description with default tuning and no agents.
    #[must_use]
    pub fn new<S: Into<String>>(layout: impl IntoIterator<Item = S>, target: CellCoord) -> Self {
        Self {
            seed: 0,
            cell_length: DEFAULT_CELL_LENGTH,
            sight: SightModel::default(),
            layout: layout.into_iter().map(Into::into).collect(),
            target,
            key: None,
            spawns: Vec::new(),
            player: TargetConfig::default(),
            tunables: TunablesConfig::default(),
        }
    }

    /// Creates an open level of the provided dimensions.
    #[must_use]
    pub fn open(rows: u32, columns: u32, target: CellCoord) -> Self {
        let row = ".".repeat(columns as usize);
        Self::new((0..rows).map(|_| row.clone()), target)
    }

    /// Adds an agent placement.
    #[must_use]
    pub fn with_spawn(mut self, kind: AgentKind, cell: CellCoord) -> Self {
        self.spawns.push(SpawnConfig { kind, cell });
        self
    }

    /// Places the key.
    #[must_use]
    pub fn with_key(mut self, cell: CellCoord) -> Self {
        self.key = Some(cell);
        self
    }

    /// Replaces the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Selects the line-of-sight algorithm.
    #[must_use]
    pub fn with_sight(mut self, sight: SightModel) -> Self {
        self.sight = sight;
        self
    }

    /// Replaces the starting ammunition of the target.
    #[must_use]
    pub fn with_ammo(mut self, ammo: u32) -> Self {
        self.player.ammo = ammo;
        self
    }

    /// Parses a level description from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn default_cell_length() -> f32 {
    DEFAULT_CELL_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_levels_fill_in_defaults() {
        let level = LevelConfig::from_toml(
            r#"
            layout = ["...", ".|.", "..."]
            target = { row = 0, column = 0 }

            [[spawns]]
            kind = "latent"
            cell = { row = 2, column = 2 }

            [tunables.latent]
            speed = 40.0
            "#,
        )
        .expect("valid level");

        assert_eq!(level.seed, 0);
        assert_eq!(level.cell_length, DEFAULT_CELL_LENGTH);
        assert_eq!(level.sight, SightModel::DualSweep);
        assert_eq!(level.spawns.len(), 1);
        assert_eq!(level.spawns[0].kind, AgentKind::Latent);
        assert_eq!(level.player.health, MAX_TARGET_HEALTH);

        let latent = level
            .tunables
            .resolve(AgentKind::Latent)
            .expect("valid tunables");
        assert_eq!(latent.speed, 40.0);
        assert_eq!(latent.damage, 3);
        assert_eq!(latent.trigger_radius, 4);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = LevelConfig::from_toml(
            r#"
            layout = ["."]
            target = { row = 0, column = 0 }
            gravity = 9.8
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn invalid_overrides_are_reported() {
        let tunables = TunablesConfig {
            reactive: KindTunables {
                speed: Some(0.0),
                ..KindTunables::default()
            },
            ..TunablesConfig::default()
        };
        assert_eq!(
            tunables.resolve(AgentKind::Reactive),
            Err(LevelError::InvalidTunable {
                kind: AgentKind::Reactive,
                field: "speed",
                reason: "must be positive and finite",
            })
        );
        assert!(tunables.resolve(AgentKind::Latent).is_ok());
    }

    #[test]
    fn open_levels_have_uniform_rows() {
        let level = LevelConfig::open(3, 4, CellCoord::new(1, 1));
        assert_eq!(level.layout, vec!["....", "....", "...."]);
    }
}
