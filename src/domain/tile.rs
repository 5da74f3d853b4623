/// Terrain walls and their shared damage contract.
/// Properties are queried via methods on the kind, not stored as flags,
/// so wall semantics are centralized here.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::grid::Cell;
use crate::error::GameError;

/// Hits a Hard wall absorbs before it is destroyed.
pub const HARD_WALL_HEALTH: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum WallKind {
    Unbreakable, // Map border + pillars, ignores damage
    Breakable,   // One hit, may drop a pickup
    Hard,        // Three hits
}

impl WallKind {
    /// Starting health. Unbreakable walls never consult it.
    pub fn initial_health(self) -> u8 {
        match self {
            WallKind::Unbreakable => u8::MAX,
            WallKind::Breakable => 1,
            WallKind::Hard => HARD_WALL_HEALTH,
        }
    }

    pub fn is_destructible(self) -> bool {
        !matches!(self, WallKind::Unbreakable)
    }

    /// Can a player holding the wall-pass ability walk through it?
    pub fn is_passable_with_wall_pass(self) -> bool {
        matches!(self, WallKind::Breakable)
    }

    /// Does destroying this wall roll for a pickup drop?
    pub fn drops_pickups(self) -> bool {
        matches!(self, WallKind::Breakable)
    }

    pub fn name(self) -> &'static str {
        match self {
            WallKind::Unbreakable => "unbreakable",
            WallKind::Breakable => "breakable",
            WallKind::Hard => "hard",
        }
    }
}

impl FromStr for WallKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unbreakable" => Ok(WallKind::Unbreakable),
            "breakable" => Ok(WallKind::Breakable),
            "hard" => Ok(WallKind::Hard),
            _ => Err(GameError::unrecognized("wall", s)),
        }
    }
}

/// Result of a single explosion hit on a wall.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hit {
    /// Unbreakable, or already destroyed.
    Ignored,
    /// Health went down but the wall stands.
    Weakened,
    Destroyed,
}

/// A wall occupying exactly one cell.
#[derive(Clone, Debug)]
pub struct Wall {
    pub cell: Cell,
    pub kind: WallKind,
    health: u8,
    destroyed: bool,
}

impl Wall {
    pub fn new(kind: WallKind, cell: Cell) -> Self {
        Wall { cell, kind, health: kind.initial_health(), destroyed: false }
    }

    /// Factory by variant name. Unknown names fail, never default.
    pub fn from_name(name: &str, cell: Cell) -> Result<Self, GameError> {
        Ok(Wall::new(name.parse()?, cell))
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn health(&self) -> u8 {
        self.health
    }

    /// Apply one explosion hit.
    pub fn take_hit(&mut self) -> Hit {
        if self.destroyed {
            return Hit::Ignored;
        }
        match self.kind {
            WallKind::Unbreakable => Hit::Ignored,
            WallKind::Breakable | WallKind::Hard => {
                self.health = self.health.saturating_sub(1);
                if self.health == 0 {
                    self.destroyed = true;
                    Hit::Destroyed
                } else {
                    Hit::Weakened
                }
            }
        }
    }

    /// Visual intensity 0.0..=1.0; Hard walls darken proportionally per hit.
    /// Cosmetic only.
    pub fn intensity(&self) -> f32 {
        match self.kind {
            WallKind::Hard => self.health as f32 / HARD_WALL_HEALTH as f32,
            _ if self.destroyed => 0.0,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(kind: WallKind) -> Wall {
        Wall::new(kind, Cell::new(1, 1))
    }

    #[test]
    fn breakable_dies_in_one_hit() {
        let mut w = wall(WallKind::Breakable);
        assert_eq!(w.take_hit(), Hit::Destroyed);
        assert!(w.is_destroyed());
        assert_eq!(w.take_hit(), Hit::Ignored);
    }

    #[test]
    fn hard_needs_exactly_three_hits() {
        let mut w = wall(WallKind::Hard);
        assert_eq!(w.take_hit(), Hit::Weakened);
        assert!((w.intensity() - 2.0 / 3.0).abs() < 0.01);
        assert_eq!(w.take_hit(), Hit::Weakened);
        assert!(!w.is_destroyed());
        assert_eq!(w.take_hit(), Hit::Destroyed);
        assert!(w.is_destroyed());
        assert_eq!(w.intensity(), 0.0);
    }

    #[test]
    fn unbreakable_never_destroyed() {
        let mut w = wall(WallKind::Unbreakable);
        for _ in 0..1000 {
            assert_eq!(w.take_hit(), Hit::Ignored);
        }
        assert!(!w.is_destroyed());
        assert_eq!(w.intensity(), 1.0);
    }

    #[test]
    fn factory_rejects_unknown_names() {
        assert_eq!(Wall::from_name("Hard", Cell::new(0, 0)).map(|w| w.kind).ok(), Some(WallKind::Hard));
        match Wall::from_name("glass", Cell::new(0, 0)) {
            Err(GameError::UnrecognizedVariant { family, name }) => {
                assert_eq!(family, "wall");
                assert_eq!(name, "glass");
            }
            other => panic!("expected UnrecognizedVariant, got {other:?}"),
        }
    }
}
