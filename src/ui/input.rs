/// Keyboard input.
///
/// Everything in a visual novel is a one-shot action, so only fresh
/// presses are tracked. Repeats from a held key count as presses (holding
/// Enter skims through text); releases are ignored.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::sim::stage::Action;

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')];
const KEYS_CANCEL: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('m'), KeyCode::Char('M')];
const KEYS_BACK: &[KeyCode] = &[KeyCode::Backspace, KeyCode::Char('b'), KeyCode::Char('B'), KeyCode::Left];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char('k')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S'), KeyCode::Char('j')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Key events collected during the most recent `drain_events()`.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.raw_events.push(key);
                }
            }
        }
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// This frame's key presses as stage actions, in arrival order.
    pub fn actions(&self) -> Vec<Action> {
        self.raw_events.iter().filter_map(|k| action_for(k.code)).collect()
    }
}

pub fn action_for(code: KeyCode) -> Option<Action> {
    if KEYS_CONFIRM.contains(&code) {
        Some(Action::Confirm)
    } else if KEYS_CANCEL.contains(&code) {
        Some(Action::Cancel)
    } else if KEYS_BACK.contains(&code) {
        Some(Action::Back)
    } else if KEYS_UP.contains(&code) {
        Some(Action::Up)
    } else if KEYS_DOWN.contains(&code) {
        Some(Action::Down)
    } else if KEYS_QUIT.contains(&code) {
        Some(Action::Quit)
    } else if let KeyCode::Char(c @ '1'..='9') = code {
        Some(Action::Pick(c as usize - '1' as usize))
    } else {
        None
    }
}
