/// Stage: the screen flow wrapped around the traversal engine.
///
/// ## Screens
///   Title    → Select (protagonist list, hidden entry once unlocked)
///   Select   → Playing (starts a session)
///   Playing  → Ending (engine reached an ending) / Title (menu)
///   Ending   → Title
///
/// While playing, a confirm on a line that is still typing completes the
/// line instead of advancing. Back and taps are ignored while a choice is
/// on screen; the engine enforces that too.

use std::time::{Duration, Instant};

use crate::ui::typewriter::Typewriter;

use super::engine::{Engine, Frame};
use super::event::StoryEvent;
use super::save::KeyValueStore;

pub const MENU_ITEMS: [&str; 3] = ["Resume", "Back one line", "Return to title"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    Title,
    Select,
    Playing,
    Ending,
}

/// Input, already mapped from keys / buttons.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Confirm,
    Cancel,
    Back,
    Up,
    Down,
    /// Direct choice pick by number (0-based).
    Pick(usize),
    Quit,
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub quit: bool,
    pub events: Vec<StoryEvent>,
}

pub struct Stage<S: KeyValueStore> {
    pub engine: Engine<S>,
    pub screen: Screen,
    /// Cursor of the in-game menu, `Some` while it is open.
    pub menu: Option<usize>,
    pub select_cursor: usize,
    pub choice_cursor: usize,
    pub typewriter: Typewriter,
    pub hidden_unlocked: bool,
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
}

impl<S: KeyValueStore> Stage<S> {
    pub fn new(engine: Engine<S>, type_interval: Duration) -> Self {
        let hidden_unlocked = engine.hidden_unlocked();
        Stage {
            engine,
            screen: Screen::Title,
            menu: None,
            select_cursor: 0,
            choice_cursor: 0,
            typewriter: Typewriter::new(type_interval),
            hidden_unlocked,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
        }
    }

    /// Protagonists offered on the select screen.
    pub fn entries(&self) -> Vec<String> {
        let cast = self.engine.cast();
        let mut list = cast.protagonists.clone();
        if self.hidden_unlocked {
            list.push(cast.hidden_protagonist.clone());
        }
        list
    }

    pub fn set_message(&mut self, msg: &str, ticks: u32) {
        self.message = msg.to_string();
        self.message_timer = ticks;
    }

    /// Per-frame housekeeping. Returns the number of characters the
    /// typewriter revealed this tick.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
        if self.screen == Screen::Playing {
            self.typewriter.tick(now)
        } else {
            0
        }
    }

    pub fn handle(&mut self, action: Action, now: Instant) -> Outcome {
        let mut out = Outcome::default();

        match self.screen {
            Screen::Title => match action {
                Action::Confirm => {
                    self.screen = Screen::Select;
                    self.select_cursor = 0;
                }
                Action::Cancel | Action::Quit => out.quit = true,
                _ => {}
            },

            Screen::Select => {
                let total = self.entries().len();
                match action {
                    Action::Up => self.select_cursor = self.select_cursor.saturating_sub(1),
                    Action::Down => {
                        if self.select_cursor + 1 < total {
                            self.select_cursor += 1;
                        }
                    }
                    Action::Confirm => {
                        if let Some(protagonist) = self.entries().get(self.select_cursor).cloned() {
                            self.screen = Screen::Playing;
                            self.menu = None;
                            out.events = self.engine.start_session(&protagonist);
                            self.sync(now);
                        }
                    }
                    Action::Cancel | Action::Back => self.screen = Screen::Title,
                    _ => {}
                }
            }

            Screen::Playing => {
                if let Some(cursor) = self.menu {
                    self.handle_menu(action, cursor, now, &mut out);
                } else {
                    self.handle_play(action, now, &mut out);
                }
            }

            Screen::Ending => {
                if matches!(action, Action::Confirm | Action::Cancel) {
                    self.return_to_title();
                }
            }
        }

        out
    }

    fn handle_play(&mut self, action: Action, now: Instant, out: &mut Outcome) {
        let choice_len = match self.engine.frame() {
            Some(Frame::Choice { options }) => Some(options.len()),
            _ => None,
        };

        match (action, choice_len) {
            (Action::Cancel, _) => self.menu = Some(0),
            (Action::Up, Some(_)) => self.choice_cursor = self.choice_cursor.saturating_sub(1),
            (Action::Down, Some(len)) => {
                if self.choice_cursor + 1 < len {
                    self.choice_cursor += 1;
                }
            }
            (Action::Confirm, Some(_)) => {
                out.events = self.engine.select_option(self.choice_cursor);
            }
            (Action::Pick(n), Some(len)) if n < len => {
                out.events = self.engine.select_option(n);
            }
            (Action::Confirm, None) => {
                if self.typewriter.is_done() {
                    out.events = self.engine.advance();
                } else {
                    self.typewriter.finish();
                }
            }
            (Action::Back, None) => out.events = self.engine.go_back(),
            _ => {}
        }

        if !out.events.is_empty() {
            self.sync(now);
        }
    }

    fn handle_menu(&mut self, action: Action, cursor: usize, now: Instant, out: &mut Outcome) {
        match action {
            Action::Up => self.menu = Some(cursor.saturating_sub(1)),
            Action::Down => self.menu = Some((cursor + 1).min(MENU_ITEMS.len() - 1)),
            Action::Cancel => self.menu = None,
            Action::Confirm => {
                self.menu = None;
                match cursor {
                    1 => {
                        out.events = self.engine.go_back();
                        if out.events.is_empty() {
                            self.set_message("Can't go back from here", 40);
                        } else {
                            self.sync(now);
                        }
                    }
                    2 => self.return_to_title(),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Follow the engine's new frame: restart the typewriter, reset the
    /// choice cursor, or switch to the ending screen.
    fn sync(&mut self, now: Instant) {
        match self.engine.frame() {
            Some(Frame::Dialogue { text, .. }) => {
                let text = text.clone();
                self.typewriter.start(&text, now);
            }
            Some(Frame::Choice { .. }) => {
                self.typewriter.clear();
                self.choice_cursor = 0;
            }
            Some(Frame::Ending { .. }) => {
                self.typewriter.clear();
                self.menu = None;
                self.screen = Screen::Ending;
            }
            None => {}
        }
    }

    fn return_to_title(&mut self) {
        self.engine.return_to_title();
        self.typewriter.clear();
        self.menu = None;
        self.screen = Screen::Title;

        let unlocked = self.engine.hidden_unlocked();
        if unlocked && !self.hidden_unlocked {
            self.set_message("A secret scenario has been unlocked", 120);
        }
        self.hidden_unlocked = unlocked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cast::Cast;
    use crate::domain::scenario::Scenario;
    use crate::sim::engine::EndingCards;
    use crate::sim::save::{record_clear, MemoryStore};
    use serde_json::{json, Value};

    const STEP: Duration = Duration::from_millis(30);

    fn stage_with(doc: Value, store: MemoryStore) -> Stage<MemoryStore> {
        let engine = Engine::new(
            Scenario::from_value(doc).unwrap(),
            Cast::default(),
            EndingCards::default(),
            store,
        );
        Stage::new(engine, STEP)
    }

    fn story() -> Value {
        let route = json!({
            "act1": [
                {"character": "ショウ", "text": "おはよう"},
                {"type": "choice", "options": [
                    {"text": "true", "score": 6, "next_block": "ending_true"},
                    {"text": "bad", "score": 0, "next_block": "ending_bad"}
                ]}
            ],
            "ending_true": [{"text": "yay"}],
            "ending_bad": [{"text": "oh"}]
        });
        json!({ "ショウ編": route.clone(), "しょう編": route, "隠しシナリオ": { "main": [{"text": "?"}] } })
    }

    fn start_first(st: &mut Stage<MemoryStore>, now: Instant) {
        st.handle(Action::Confirm, now);
        assert_eq!(st.screen, Screen::Select);
        st.handle(Action::Confirm, now);
        assert_eq!(st.screen, Screen::Playing);
    }

    #[test]
    fn title_to_playing() {
        let now = Instant::now();
        let mut st = stage_with(story(), MemoryStore::default());
        assert_eq!(st.entries().len(), 2);
        start_first(&mut st, now);
        assert_eq!(st.engine.session().protagonist, "ショウ編");
        assert!(!st.typewriter.is_done());
    }

    #[test]
    fn confirm_completes_typing_before_advancing() {
        let now = Instant::now();
        let mut st = stage_with(story(), MemoryStore::default());
        start_first(&mut st, now);

        let out = st.handle(Action::Confirm, now);
        assert!(out.events.is_empty());
        assert!(st.typewriter.is_done());
        assert_eq!(st.engine.session().index, 1);

        let out = st.handle(Action::Confirm, now);
        assert!(out.events.contains(&StoryEvent::ChoiceShown { options: 2 }));
    }

    #[test]
    fn typing_finishes_with_time() {
        let now = Instant::now();
        let mut st = stage_with(story(), MemoryStore::default());
        start_first(&mut st, now);
        assert_eq!(st.tick(now + STEP * 2), 2);
        assert_eq!(st.typewriter.visible(), "おは");
        st.tick(now + STEP * 10);
        assert!(st.typewriter.is_done());
    }

    #[test]
    fn choice_cursor_and_pick() {
        let now = Instant::now();
        let mut st = stage_with(story(), MemoryStore::default());
        start_first(&mut st, now);
        st.typewriter.finish();
        st.handle(Action::Confirm, now);

        st.handle(Action::Down, now);
        st.handle(Action::Down, now);
        assert_eq!(st.choice_cursor, 1);
        st.handle(Action::Up, now);
        assert_eq!(st.choice_cursor, 0);

        assert!(st.handle(Action::Pick(7), now).events.is_empty());
        let out = st.handle(Action::Pick(1), now);
        assert!(out.events.contains(&StoryEvent::ChoiceMade { score_delta: 0, total_score: 0 }));
        assert_eq!(st.typewriter.visible(), "");
    }

    #[test]
    fn ending_then_title_unlocks_hidden() {
        let now = Instant::now();
        let mut store = MemoryStore::default();
        record_clear(&mut store, "しょう編").unwrap();
        let mut st = stage_with(story(), store);
        assert!(!st.hidden_unlocked);

        start_first(&mut st, now);
        st.typewriter.finish();
        st.handle(Action::Confirm, now);
        st.handle(Action::Confirm, now);
        st.typewriter.finish();
        st.handle(Action::Confirm, now);
        assert_eq!(st.screen, Screen::Ending);

        st.handle(Action::Confirm, now);
        assert_eq!(st.screen, Screen::Title);
        assert!(st.hidden_unlocked);
        assert!(!st.message.is_empty());
        assert_eq!(st.entries().last().map(String::as_str), Some("隠しシナリオ"));
    }

    #[test]
    fn menu_back_and_title() {
        let now = Instant::now();
        let lines: Vec<Value> = (0..4).map(|i| json!({"text": format!("l{i}")})).collect();
        let mut st = stage_with(json!({ "ショウ編": { "act1": lines } }), MemoryStore::default());
        start_first(&mut st, now);
        for _ in 0..2 {
            st.typewriter.finish();
            st.handle(Action::Confirm, now);
        }
        assert_eq!(st.engine.session().index, 3);

        st.handle(Action::Cancel, now);
        assert_eq!(st.menu, Some(0));
        st.handle(Action::Down, now);
        let out = st.handle(Action::Confirm, now);
        assert_eq!(out.events[0], StoryEvent::SteppedBack);
        assert_eq!(st.menu, None);
        assert_eq!(st.engine.session().index, 2);

        st.handle(Action::Cancel, now);
        st.handle(Action::Down, now);
        st.handle(Action::Down, now);
        st.handle(Action::Down, now);
        assert_eq!(st.menu, Some(2));
        st.handle(Action::Confirm, now);
        assert_eq!(st.screen, Screen::Title);
        assert!(!st.engine.session().is_playing);
    }

    #[test]
    fn back_key_steps_back() {
        let now = Instant::now();
        let lines: Vec<Value> = (0..4).map(|i| json!({"text": format!("l{i}")})).collect();
        let mut st = stage_with(json!({ "ショウ編": { "act1": lines } }), MemoryStore::default());
        start_first(&mut st, now);
        assert!(st.handle(Action::Back, now).events.is_empty());
        for _ in 0..2 {
            st.typewriter.finish();
            st.handle(Action::Confirm, now);
        }
        st.handle(Action::Back, now);
        assert!(matches!(st.engine.frame(), Some(Frame::Dialogue { text, .. }) if text == "l1"));
        assert!(!st.typewriter.is_done());
    }

    #[test]
    fn quit_only_from_title() {
        let now = Instant::now();
        let mut st = stage_with(story(), MemoryStore::default());
        assert!(st.handle(Action::Quit, now).quit);
        assert!(st.handle(Action::Cancel, now).quit);

        start_first(&mut st, now);
        assert!(!st.handle(Action::Quit, now).quit);
        assert_eq!(st.screen, Screen::Playing);
    }
}
