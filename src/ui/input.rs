/// Keyboard state tracker and per-player key bindings.
///
/// Movement is continuous while a key is held; bombs are edge-triggered
/// (one bomb per key press). Two players share one keyboard:
///
///   Player 1   arrows + Space / Enter
///   Player 2   W A S D + F / Q
///
/// Terminals without Release events fall back to timeout-based release.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use blastgrid::domain::entity::{FrameInput, MoveDir};

/// Without a Press/Repeat event for this long, a key counts as released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct KeyBindings {
    pub up: &'static [KeyCode],
    pub down: &'static [KeyCode],
    pub left: &'static [KeyCode],
    pub right: &'static [KeyCode],
    pub bomb: &'static [KeyCode],
}

pub const PLAYER_ONE: KeyBindings = KeyBindings {
    up: &[KeyCode::Up],
    down: &[KeyCode::Down],
    left: &[KeyCode::Left],
    right: &[KeyCode::Right],
    bomb: &[KeyCode::Char(' '), KeyCode::Enter],
};

pub const PLAYER_TWO: KeyBindings = KeyBindings {
    up: &[KeyCode::Char('w'), KeyCode::Char('W')],
    down: &[KeyCode::Char('s'), KeyCode::Char('S')],
    left: &[KeyCode::Char('a'), KeyCode::Char('A')],
    right: &[KeyCode::Char('d'), KeyCode::Char('D')],
    bomb: &[KeyCode::Char('f'), KeyCode::Char('F'), KeyCode::Char('q'), KeyCode::Char('Q')],
};

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    /// Honor Release events; only once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events. Call once per frame, before the tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.is_held_at(*c, now))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// This frame's input for one player. A key pressed and released
    /// within one frame still moves, since presses also count as held.
    pub fn frame_input(&self, keys: &KeyBindings) -> FrameInput {
        let dir = |codes: &[KeyCode]| self.any_held(codes) || self.any_pressed(codes);
        let movement = if dir(keys.up) {
            Some(MoveDir::Up)
        } else if dir(keys.down) {
            Some(MoveDir::Down)
        } else if dir(keys.left) {
            Some(MoveDir::Left)
        } else if dir(keys.right) {
            Some(MoveDir::Right)
        } else {
            None
        };
        FrameInput { movement, bomb: self.any_pressed(keys.bomb) }
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code).map(|t| now.duration_since(*t) < HOLD_TIMEOUT).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bomb_fires_once_per_press() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(press(KeyCode::Char(' ')), now);
        assert!(input.frame_input(&PLAYER_ONE).bomb);

        // key repeat while held is not a new press
        input.fresh_presses.clear();
        input.apply(press(KeyCode::Char(' ')), now);
        assert!(!input.frame_input(&PLAYER_ONE).bomb);
    }

    #[test]
    fn players_read_their_own_keys() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(press(KeyCode::Char('a')), now);
        input.apply(press(KeyCode::Up), now);
        assert_eq!(input.frame_input(&PLAYER_ONE).movement, Some(MoveDir::Up));
        assert_eq!(input.frame_input(&PLAYER_TWO).movement, Some(MoveDir::Left));
        assert!(!input.frame_input(&PLAYER_TWO).bomb);
    }

    #[test]
    fn release_clears_hold_when_honored() {
        let mut input = InputState::new();
        input.honor_release = true;
        let now = Instant::now();
        input.apply(press(KeyCode::Right), now);
        let mut up = press(KeyCode::Right);
        up.kind = KeyEventKind::Release;
        input.apply(up, now);
        assert!(!input.any_held(&[KeyCode::Right]));
    }
}
