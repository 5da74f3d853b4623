/// Pickup kinds and the stat mutation each applies.
///
/// Effects are plain additive mutations on the player's stat fields and
/// stack: collecting two speed pickups adds two.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PowerUpKind {
    BombCount,
    BombPower,
    SpeedBoost,
    Skateboard, // double speed boost
    WallPass,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::BombCount,
        PowerUpKind::BombPower,
        PowerUpKind::SpeedBoost,
        PowerUpKind::Skateboard,
        PowerUpKind::WallPass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerUpKind::BombCount => "bomb_count",
            PowerUpKind::BombPower => "bomb_power",
            PowerUpKind::SpeedBoost => "speed_boost",
            PowerUpKind::Skateboard => "skateboard",
            PowerUpKind::WallPass => "wall_pass",
        }
    }

    /// One-letter map / HUD symbol.
    pub fn symbol(self) -> char {
        match self {
            PowerUpKind::BombCount => 'b',
            PowerUpKind::BombPower => 'p',
            PowerUpKind::SpeedBoost => 's',
            PowerUpKind::Skateboard => 'k',
            PowerUpKind::WallPass => 'w',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        PowerUpKind::ALL.into_iter().find(|k| k.symbol() == c)
    }

    pub fn apply(self, stats: &mut PlayerStats) {
        match self {
            PowerUpKind::BombCount => stats.max_bombs += 1,
            PowerUpKind::BombPower => stats.power += 1,
            PowerUpKind::SpeedBoost => stats.speed += 1,
            PowerUpKind::Skateboard => stats.speed += 2,
            PowerUpKind::WallPass => stats.wall_pass = true,
        }
    }
}

impl FromStr for PowerUpKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        PowerUpKind::ALL
            .into_iter()
            .find(|k| k.name() == key)
            .ok_or_else(|| GameError::unrecognized("pickup", s))
    }
}

/// The mutable stats block pickups act on.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Pixels per tick.
    pub speed: i32,
    /// Max simultaneous bombs.
    pub max_bombs: u32,
    /// Blast radius in cells.
    pub power: u32,
    pub wall_pass: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PlayerStats {
        PlayerStats { speed: 3, max_bombs: 1, power: 1, wall_pass: false }
    }

    #[test]
    fn effects_are_additive_and_stack() {
        let mut s = base();
        PowerUpKind::SpeedBoost.apply(&mut s);
        PowerUpKind::SpeedBoost.apply(&mut s);
        PowerUpKind::Skateboard.apply(&mut s);
        PowerUpKind::BombCount.apply(&mut s);
        PowerUpKind::BombPower.apply(&mut s);
        PowerUpKind::BombPower.apply(&mut s);
        assert_eq!(s.speed, 7);
        assert_eq!(s.max_bombs, 2);
        assert_eq!(s.power, 3);
        assert!(!s.wall_pass);
        PowerUpKind::WallPass.apply(&mut s);
        assert!(s.wall_pass);
    }

    #[test]
    fn names_round_trip_and_unknown_fails() {
        for k in PowerUpKind::ALL {
            assert_eq!(k.name().parse::<PowerUpKind>().ok(), Some(k));
            assert_eq!(PowerUpKind::from_symbol(k.symbol()), Some(k));
        }
        assert!(matches!(
            "invisibility".parse::<PowerUpKind>(),
            Err(GameError::UnrecognizedVariant { family: "pickup", .. })
        ));
    }
}
