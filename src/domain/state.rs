/// Player life-cycle state machine.
///
/// ```text
///            trigger             timer expiry
///   Normal ───────────▶ Invincible ─────────▶ Normal
///   Normal ───────────▶ Stunned    ─────────▶ Normal
///   Normal / Stunned ──damage──▶ Dead (terminal)
/// ```
///
/// | State      | movement | damage            |
/// |------------|----------|-------------------|
/// | Normal     | yes      | → Dead            |
/// | Invincible | yes      | absorbed          |
/// | Stunned    | no       | → Dead            |
/// | Dead       | no       | no-op             |
///
/// Timed states only leave through expiry; there is no external cancel.
/// `is_alive()` is the single predicate the simulation gates on.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum LifeState {
    #[default]
    Normal,
    Invincible { remaining_ms: u32 },
    Stunned { remaining_ms: u32 },
    Dead,
}

/// What a damage hit did to the state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Damage {
    Killed,
    Absorbed,
    /// Target was already dead.
    Ignored,
}

impl LifeState {
    pub fn is_alive(self) -> bool {
        !matches!(self, LifeState::Dead)
    }

    pub fn accepts_movement(self) -> bool {
        matches!(self, LifeState::Normal | LifeState::Invincible { .. })
    }

    pub fn name(self) -> &'static str {
        match self {
            LifeState::Normal => "normal",
            LifeState::Invincible { .. } => "invincible",
            LifeState::Stunned { .. } => "stunned",
            LifeState::Dead => "dead",
        }
    }

    /// Remaining time of a timed state, 0 otherwise.
    pub fn remaining_ms(self) -> u32 {
        match self {
            LifeState::Invincible { remaining_ms } | LifeState::Stunned { remaining_ms } => remaining_ms,
            _ => 0,
        }
    }

    pub fn take_damage(&mut self) -> Damage {
        match *self {
            LifeState::Invincible { .. } => Damage::Absorbed,
            LifeState::Dead => Damage::Ignored,
            LifeState::Normal | LifeState::Stunned { .. } => {
                *self = LifeState::Dead;
                Damage::Killed
            }
        }
    }

    /// External trigger (pickup / hazard). Only honoured from Normal.
    pub fn make_invincible(&mut self, duration_ms: u32) -> bool {
        self.enter_from_normal(LifeState::Invincible { remaining_ms: duration_ms })
    }

    /// External trigger. Only honoured from Normal.
    pub fn stun(&mut self, duration_ms: u32) -> bool {
        self.enter_from_normal(LifeState::Stunned { remaining_ms: duration_ms })
    }

    /// Kill regardless of current state (remote death, link loss).
    /// Returns true if the state actually changed.
    pub fn force_dead(&mut self) -> bool {
        let was_alive = self.is_alive();
        *self = LifeState::Dead;
        was_alive
    }

    /// Advance timers. Returns true if a timed state just expired to Normal.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        match self {
            LifeState::Invincible { remaining_ms } | LifeState::Stunned { remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(dt_ms);
                if *remaining_ms == 0 {
                    *self = LifeState::Normal;
                    return true;
                }
                false
            }
            LifeState::Normal | LifeState::Dead => false,
        }
    }

    fn enter_from_normal(&mut self, next: LifeState) -> bool {
        if *self != LifeState::Normal {
            return false;
        }
        *self = next;
        true
    }
}
