use std::time::Duration;

use anyhow::{bail, Result};
use escape_core::{Command, Direction};

/// Input the target performs during a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Stand still.
    Wait,
    /// Walk in a direction, stopping in front of obstacles.
    Walk(Direction),
    /// Walk out of the map in a direction.
    Exit(Direction),
    /// Shoot along the facing direction.
    Fire,
    /// Pick up the item underfoot or ahead.
    Collect,
    /// Unfold a carried barricade ahead.
    Barricade,
    /// Open the lock ahead.
    Unlock,
}

impl Action {
    fn from_glyph(glyph: char) -> Option<Self> {
        let action = match glyph {
            '.' => Self::Wait,
            'n' => Self::Walk(Direction::North),
            'e' => Self::Walk(Direction::East),
            's' => Self::Walk(Direction::South),
            'w' => Self::Walk(Direction::West),
            'N' => Self::Exit(Direction::North),
            'E' => Self::Exit(Direction::East),
            'S' => Self::Exit(Direction::South),
            'W' => Self::Exit(Direction::West),
            'f' => Self::Fire,
            'c' => Self::Collect,
            'b' => Self::Barricade,
            'u' => Self::Unlock,
            _ => return None,
        };
        Some(action)
    }

    /// World command performing the action over a tick of length `dt`.
    pub(crate) fn command(self, dt: Duration) -> Option<Command> {
        match self {
            Self::Wait => None,
            Self::Walk(direction) => Some(Command::MoveTarget { direction, dt }),
            Self::Exit(direction) => Some(Command::ExitTarget { direction, dt }),
            Self::Fire => Some(Command::FireProjectile),
            Self::Collect => Some(Command::CollectItem),
            Self::Barricade => Some(Command::DeployBarricade),
            Self::Unlock => Some(Command::UnlockExit),
        }
    }
}

/// Expands a script into one action per tick.
///
/// Every glyph names an action and may be followed by a repeat count, so
/// `"e4 f"` walks east for four ticks and then fires. Whitespace is ignored.
pub(crate) fn parse(script: &str) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    let mut chars = script.char_indices().peekable();
    while let Some((offset, glyph)) = chars.next() {
        if glyph.is_whitespace() {
            continue;
        }
        let Some(action) = Action::from_glyph(glyph) else {
            bail!("unknown script action {glyph:?} at offset {offset}");
        };

        let mut count: Option<usize> = None;
        while let Some(digit) = chars.peek().and_then(|(_, next)| next.to_digit(10)) {
            let _ = chars.next();
            let Some(next) = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|value| value.checked_add(digit as usize))
            else {
                bail!("repeat count after {glyph:?} at offset {offset} is too large");
            };
            count = Some(next);
        }

        match count {
            Some(0) => bail!("repeat count after {glyph:?} at offset {offset} must be positive"),
            Some(times) => actions.extend(std::iter::repeat(action).take(times)),
            None => actions.push(action),
        }
    }
    Ok(actions)
}
