/// Events emitted by engine operations.
/// The presentation layer consumes these for sound; the engine logs them.

use crate::domain::route::EndingKind;

use super::engine::EndingReason;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoryEvent {
    LineShown { block: String, index: usize },
    ChoiceShown { options: usize },
    ChoiceMade { score_delta: i32, total_score: i32 },
    BlockEntered { block: String, via: &'static str },
    SteppedBack,
    EndingReached { kind: EndingKind, reason: EndingReason },
    ClearRecorded { protagonist: String },
}
