/// Traversal engine: moves a play session through the scenario.
///
/// Operations (one per player input):
///   `start_session`   seed a session at the protagonist's entry block, show line 0
///   `advance`         tap: bookmark, then show the next line
///   `select_option`   answer the pending choice: score, bookmark, maybe jump, show next
///   `go_back`         drop the newest bookmark, restore the one before it, show again
///   `return_to_title` abandon the session
///
/// ## Advance step
///   1. If the cursor is inside the block, show that line and move on.
///   2. Otherwise take the block's last line (nothing, if the block is
///      missing) and resolve its transition, in priority order:
///        next_block → next_act → branch_act3 → branch_ending → none
///   3. With no transition the session ends. Reaching an ending block or
///      an ending-marked line is a designed ending; anything else is a
///      fall-through, played the same way but logged as a warning so
///      missing transition data shows up.
///
/// Every operation returns the `StoryEvent`s it produced. The current
/// render instruction is kept in `frame()`.

use crate::domain::cast::Cast;
use crate::domain::line::{ChoiceOption, Line, LineKind, Transition};
use crate::domain::route::{self, EndingKind};
use crate::domain::scenario::Scenario;

use super::event::StoryEvent;
use super::save::{self, KeyValueStore};
use super::session::PlaySession;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndingReason {
    /// Ending block exhausted, or the last line carried an ending marker.
    Designed,
    /// No transition and not an ending block: the scenario data ran out.
    FellThrough,
}

/// Render instruction for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Dialogue {
        speaker: Option<String>,
        text: String,
        background: Option<String>,
        character_image: Option<String>,
    },
    Choice {
        options: Vec<OptionView>,
    },
    Ending {
        kind: EndingKind,
        reason: EndingReason,
        title: String,
        text: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionView {
    pub label: String,
    pub index: usize,
}

/// Ending screen titles and closing text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndingCards {
    pub true_title: String,
    pub normal_title: String,
    pub bad_title: String,
    pub hidden_title: String,
    pub text: String,
}

impl EndingCards {
    pub fn title(&self, kind: EndingKind) -> &str {
        match kind {
            EndingKind::True => &self.true_title,
            EndingKind::Normal => &self.normal_title,
            EndingKind::Bad => &self.bad_title,
            EndingKind::Hidden => &self.hidden_title,
        }
    }
}

impl Default for EndingCards {
    fn default() -> Self {
        EndingCards {
            true_title: "TRUE END".into(),
            normal_title: "NORMAL END".into(),
            bad_title: "BAD END".into(),
            hidden_title: "SECRET END".into(),
            text: "Thank you for playing.\n\n\
                   This story is a work of fiction. Any resemblance to real \
                   people or organizations is coincidental."
                .into(),
        }
    }
}

pub struct Engine<S: KeyValueStore> {
    scenario: Scenario,
    cast: Cast,
    cards: EndingCards,
    store: S,
    session: PlaySession,
    frame: Option<Frame>,
}

impl<S: KeyValueStore> Engine<S> {
    pub fn new(scenario: Scenario, cast: Cast, cards: EndingCards, store: S) -> Self {
        Engine {
            scenario,
            cast,
            cards,
            store,
            session: PlaySession::default(),
            frame: None,
        }
    }

    pub fn session(&self) -> &PlaySession {
        &self.session
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn cast(&self) -> &Cast {
        &self.cast
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hidden_unlocked(&self) -> bool {
        save::hidden_unlocked(&self.store, &self.cast)
    }

    /// There is an earlier position to return to.
    pub fn can_go_back(&self) -> bool {
        self.session.is_playing && !self.session.is_choice_scene && self.session.history.len() > 1
    }

    // ══════════════════════════════════════════════════════════════
    // Player operations
    // ══════════════════════════════════════════════════════════════

    pub fn start_session(&mut self, protagonist: &str) -> Vec<StoryEvent> {
        let entry = self.cast.entry_block_for(protagonist).to_string();
        if !self.scenario.has_protagonist(protagonist) {
            tracing::warn!(protagonist, "protagonist not in scenario");
        }
        tracing::info!(protagonist, block = %entry, "session started");

        self.session = PlaySession::new(protagonist, &entry);
        self.frame = None;

        let mut events = Vec::new();
        self.step(&mut events);
        events
    }

    pub fn advance(&mut self) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if !self.session.is_playing || self.session.is_choice_scene {
            return events;
        }
        self.session.remember();
        self.step(&mut events);
        events
    }

    pub fn select_option(&mut self, index: usize) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if !self.session.is_playing || !self.session.is_choice_scene {
            tracing::warn!(index, "option selected with no choice pending");
            return events;
        }
        let Some(option) = self.pending_option(index).cloned() else {
            tracing::warn!(index, "option index out of range");
            return events;
        };

        let s = &mut self.session;
        s.total_score = s.total_score.saturating_add(option.score_delta);
        s.last_choice_score = option.score_delta;
        s.is_choice_scene = false;
        s.remember();
        tracing::debug!(
            index,
            delta = option.score_delta,
            total = s.total_score,
            "choice resolved"
        );
        events.push(StoryEvent::ChoiceMade {
            score_delta: option.score_delta,
            total_score: s.total_score,
        });

        if let Some(block) = &option.next_block {
            s.enter_block(block);
            tracing::info!(block = %block, via = "option", "block entered");
            events.push(StoryEvent::BlockEntered {
                block: block.clone(),
                via: "option",
            });
        }

        self.step(&mut events);
        events
    }

    pub fn go_back(&mut self) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if !self.can_go_back() {
            return events;
        }

        let s = &mut self.session;
        s.history.pop();
        let Some(mark) = s.history.pop() else {
            return events;
        };
        s.restore(&mark);
        s.history.push(mark);
        tracing::debug!(block = %s.block, index = s.index, "stepped back");
        events.push(StoryEvent::SteppedBack);

        self.step(&mut events);
        events
    }

    pub fn return_to_title(&mut self) {
        if self.session.is_playing {
            tracing::info!(
                protagonist = %self.session.protagonist,
                block = %self.session.block,
                "session abandoned"
            );
        }
        self.session.is_playing = false;
        self.session.is_choice_scene = false;
        self.session.history.clear();
        self.frame = None;
    }

    // ══════════════════════════════════════════════════════════════
    // Traversal
    // ══════════════════════════════════════════════════════════════

    fn step(&mut self, events: &mut Vec<StoryEvent>) {
        if self.session.is_choice_scene {
            return;
        }

        loop {
            let lines = self
                .scenario
                .lookup(&self.session.protagonist, &self.session.block)
                .unwrap_or(&[]);

            if let Some(line) = lines.get(self.session.index) {
                let frame = render_line(&mut self.session, line);
                events.push(match &frame {
                    Frame::Choice { options } => StoryEvent::ChoiceShown {
                        options: options.len(),
                    },
                    _ => StoryEvent::LineShown {
                        block: self.session.block.clone(),
                        index: self.session.index,
                    },
                });
                tracing::debug!(block = %self.session.block, index = self.session.index, "line shown");
                self.session.index += 1;
                self.frame = Some(frame);
                return;
            }

            let terminal = lines.last();
            let marked_ending = terminal.is_some_and(Line::is_ending_marker);
            let next = match terminal.map_or(Transition::None, Line::transition) {
                Transition::Chapter(block) => Some((block.to_string(), "next_block")),
                Transition::Act(block) => Some((block.to_string(), "next_act")),
                Transition::ScoreBranch => Some((
                    route::act3_route(self.session.total_score).to_string(),
                    "branch_act3",
                )),
                Transition::EndingBranch => {
                    // Never bookmark the same spot twice in a row.
                    let here = self.session.bookmark();
                    if self.session.history.last() != Some(&here) {
                        self.session.history.push(here);
                    }
                    Some((
                        route::ending_route(
                            self.session.total_score,
                            self.session.last_choice_score,
                        )
                        .to_string(),
                        "branch_ending",
                    ))
                }
                Transition::None => None,
            };

            match next {
                Some((block, via)) => {
                    tracing::info!(from = %self.session.block, to = %block, via, "block entered");
                    events.push(StoryEvent::BlockEntered {
                        block: block.clone(),
                        via,
                    });
                    self.session.enter_block(&block);
                }
                None => {
                    let reason = if route::is_ending_block(&self.session.block) || marked_ending {
                        EndingReason::Designed
                    } else {
                        EndingReason::FellThrough
                    };
                    self.end_session(reason, events);
                    return;
                }
            }
        }
    }

    fn end_session(&mut self, reason: EndingReason, events: &mut Vec<StoryEvent>) {
        let s = &mut self.session;
        let kind = route::classify(&self.cast, &s.protagonist, s.total_score);

        match reason {
            EndingReason::Designed => tracing::info!(
                protagonist = %s.protagonist,
                kind = kind.as_str(),
                score = s.total_score,
                "ending reached"
            ),
            EndingReason::FellThrough => tracing::warn!(
                protagonist = %s.protagonist,
                block = %s.block,
                kind = kind.as_str(),
                score = s.total_score,
                "block ended with no transition, showing ending"
            ),
        }
        events.push(StoryEvent::EndingReached { kind, reason });

        if kind == EndingKind::True && !self.cast.is_hidden(&s.protagonist) {
            match save::record_clear(&mut self.store, &s.protagonist) {
                Ok(()) => {
                    tracing::info!(protagonist = %s.protagonist, "clear recorded");
                    events.push(StoryEvent::ClearRecorded {
                        protagonist: s.protagonist.clone(),
                    });
                }
                Err(e) => tracing::warn!("clear flag not saved: {e}"),
            }
        }

        s.is_playing = false;
        s.is_choice_scene = false;
        self.frame = Some(Frame::Ending {
            kind,
            reason,
            title: self.cards.title(kind).to_string(),
            text: self.cards.text.clone(),
        });
    }

    /// The option `index` of the choice line currently on screen.
    fn pending_option(&self, index: usize) -> Option<&ChoiceOption> {
        let lines = self
            .scenario
            .lookup(&self.session.protagonist, &self.session.block)?;
        lines.get(self.session.index.checked_sub(1)?)?.options.get(index)
    }
}

/// Build the render instruction for `line`, updating the session's
/// sticky visuals and choice flag on the way.
fn render_line(session: &mut PlaySession, line: &Line) -> Frame {
    if line.kind() == LineKind::Choice {
        session.is_choice_scene = true;
        return Frame::Choice {
            options: line
                .options
                .iter()
                .enumerate()
                .map(|(index, o)| OptionView {
                    label: o.label.clone(),
                    index,
                })
                .collect(),
        };
    }

    if let Some(bg) = &line.background {
        session.background = bg.clone();
    }
    if let Some(img) = &line.character_image {
        session.character_image = img.clone();
    }

    Frame::Dialogue {
        speaker: line.speaker_label().map(str::to_string),
        text: line.text().to_string(),
        background: non_empty(&session.background),
        character_image: non_empty(&session.character_image),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
