/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick up/down  →  Cursor
///   D-pad left                  →  Back one line
///   A / Start                   →  Confirm / Advance
///   B                           →  Back one line
///   Select / Y                  →  Menu

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::sim::stage::Action;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    Start,
    Select,
}

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

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    confirm: Vec<Btn>,
    back: Vec<Btn>,
    menu: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::A, Btn::Start],
            back: vec![Btn::B],
            menu: vec![Btn::Select, Btn::Y],
        }
    }
}

impl ActionMap {
    fn action_for(&self, btn: Btn) -> Option<Action> {
        if self.confirm.contains(&btn) {
            Some(Action::Confirm)
        } else if self.back.contains(&btn) {
            Some(Action::Back)
        } else if self.menu.contains(&btn) {
            Some(Action::Cancel)
        } else {
            None
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Actions produced since the last `update()`, in arrival order.
    pending: Vec<Action>,

    // Stick, tracked so a held stick fires once per push
    stick_up: bool,
    stick_down: bool,

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
                tracing::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            pending: Vec::with_capacity(4),
            stick_up: false,
            stick_down: false,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. An entry with no recognised
    /// button names keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let cf = parse_list(&cfg.confirm);
        if !cf.is_empty() { map.confirm = cf; }
        let bk = parse_list(&cfg.back);
        if !bk.is_empty() { map.back = bk; }
        let mn = parse_list(&cfg.menu);
        if !mn.is_empty() { map.menu = mn; }
    }

    /// Poll the pad. Call this once per frame, then read `actions()`.
    pub fn update(&mut self) {
        self.pending.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    pub fn actions(&self) -> &[Action] {
        &self.pending
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
                    self.press(btn);
                }
                EventType::AxisChanged(Axis::LeftStickY, value, _) => {
                    self.connected = true;
                    self.stick(value);
                }
                EventType::Connected => {
                    self.connected = true;
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.stick_up = false;
                    self.stick_down = false;
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn press(&mut self, gilrs_btn: Button) {
        let action = match gilrs_btn {
            Button::DPadUp => Some(Action::Up),
            Button::DPadDown => Some(Action::Down),
            Button::DPadLeft => Some(Action::Back),
            other => Btn::from_gilrs(other).and_then(|b| self.action_map.action_for(b)),
        };
        if let Some(a) = action {
            self.pending.push(a);
        }
    }

    /// Edge-detect the stick's vertical axis into Up / Down presses.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn stick(&mut self, y: f32) {
        let up = y > STICK_DEADZONE;
        let down = y < -STICK_DEADZONE;
        if up && !self.stick_up {
            self.pending.push(Action::Up);
        }
        if down && !self.stick_down {
            self.pending.push(Action::Down);
        }
        self.stick_up = up;
        self.stick_down = down;
    }
}
