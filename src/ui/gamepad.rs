/// Gamepad input tracker using gilrs. Drives player 1.
///
/// Button mapping comes from `[gamepad]` in config.toml.
/// Default mapping:
///   D-pad / Left Stick    →  Movement
///   A / B / R1            →  Bomb
///   Start                 →  Pause (restart once the match is over)
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use blastgrid::config::GamepadConfig;
use blastgrid::domain::entity::MoveDir;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,  // South
    B,  // East
    X,  // West
    Y,  // North
    L1, // LeftTrigger
    R1, // RightTrigger
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

struct ActionMap {
    bomb: Vec<Btn>,
    pause: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap { bomb: vec![Btn::A, Btn::B, Btn::R1], pause: vec![Btn::Start], quit: vec![Btn::Select] }
    }
}

/// Direction slots, in `MoveDir` priority order.
const DIRS: [MoveDir; 4] = [MoveDir::Up, MoveDir::Down, MoveDir::Left, MoveDir::Right];

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    /// Indexed like `DIRS`.
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::info!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Replace the default mapping with config entries. Unknown names are
    /// skipped; an action left with no valid button keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names
                .iter()
                .filter_map(|s| {
                    let b = Btn::from_name(s);
                    if b.is_none() {
                        log::warn!("unknown gamepad button {s:?} in config");
                    }
                    b
                })
                .collect()
        }
        let map = &mut self.action_map;
        for (slot, names) in [(&mut map.bomb, &cfg.bomb), (&mut map.pause, &cfg.pause), (&mut map.quit, &cfg.quit)] {
            let parsed = parse_list(names);
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // Stick → digital directions (y axis points up)
        let (x, y) = (self.stick_x, self.stick_y);
        self.stick[0].set(y > STICK_DEADZONE);
        self.stick[1].set(y < -STICK_DEADZONE);
        self.stick[2].set(x < -STICK_DEADZONE);
        self.stick[3].set(x > STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(0),
            Button::DPadDown => Some(1),
            Button::DPadLeft => Some(2),
            Button::DPadRight => Some(3),
            _ => None,
        };
        if let Some(i) = dpad {
            self.dpad[i].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn bomb_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.bomb)
    }
    pub fn pause_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.pause)
    }
    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    /// Held direction, first match in Up/Down/Left/Right order.
    pub fn movement(&self) -> Option<MoveDir> {
        (0..4).find(|&i| self.dpad[i].held || self.stick[i].held).map(|i| DIRS[i])
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(self.dpad.iter_mut()).chain(self.stick.iter_mut()) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [BtnState::default(); 4];
        self.stick = [BtnState::default(); 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_overrides_known_buttons_only() {
        let mut gp = GamepadState::new();
        gp.load_button_config(&GamepadConfig {
            bomb: vec!["x".into(), "turbo".into()],
            pause: vec!["nope".into()],
            quit: vec![],
        });
        assert_eq!(gp.action_map.bomb, vec![Btn::X]);
        assert_eq!(gp.action_map.pause, vec![Btn::Start]);
        assert_eq!(gp.action_map.quit, vec![Btn::Select]);
    }

    #[test]
    fn press_is_edge_triggered() {
        let mut s = BtnState::default();
        s.set(true);
        assert!(s.just_pressed && s.held);
        s.just_pressed = false;
        s.set(true);
        assert!(!s.just_pressed);
    }

    #[test]
    fn movement_prefers_vertical() {
        let mut gp = GamepadState::new();
        gp.dpad[3].held = true;
        gp.stick[0].held = true;
        assert_eq!(gp.movement(), Some(MoveDir::Up));
    }
}
