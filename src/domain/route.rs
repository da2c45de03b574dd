/// Score rules: which branch a score leads to, and which ending it earns.
///
/// All pure functions of the score values, no session access.
///
///   act 3 route     score >= 4 high, >= 1 mid, else low
///   ending route    score >= 6 true, >= 1 normal (split by last choice), else bad
///   ending kind     hidden protagonist always hidden, else same bands as the route

use super::cast::Cast;

pub const ACT3_HIGH_SCORE: i32 = 4;
pub const TRUE_END_SCORE: i32 = 6;
pub const NORMAL_END_SCORE: i32 = 1;

pub const ACT3_HIGH: &str = "act3_high";
pub const ACT3_MID: &str = "act3_mid";
pub const ACT3_LOW: &str = "act3_low";

pub const ENDING_TRUE: &str = "ending_true";
pub const ENDING_NORMAL: &str = "ending_normal";
pub const ENDING_NORMAL_FROM_TRUE: &str = "ending_normal_from_true";
pub const ENDING_NORMAL_FROM_BAD: &str = "ending_normal_from_bad";
pub const ENDING_BAD: &str = "ending_bad";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndingKind {
    True,
    Normal,
    Bad,
    Hidden,
}

impl EndingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndingKind::True => "true",
            EndingKind::Normal => "normal",
            EndingKind::Bad => "bad",
            EndingKind::Hidden => "hidden",
        }
    }
}

pub fn act3_route(score: i32) -> &'static str {
    if score >= ACT3_HIGH_SCORE {
        ACT3_HIGH
    } else if score >= NORMAL_END_SCORE {
        ACT3_MID
    } else {
        ACT3_LOW
    }
}

/// Normal-band scores are split by the last choice's delta so the ending
/// text can reflect whether the final decision leaned true or bad.
pub fn ending_route(score: i32, last_choice_score: i32) -> &'static str {
    if score >= TRUE_END_SCORE {
        ENDING_TRUE
    } else if score >= NORMAL_END_SCORE {
        match last_choice_score {
            2 => ENDING_NORMAL_FROM_TRUE,
            0 => ENDING_NORMAL_FROM_BAD,
            _ => ENDING_NORMAL,
        }
    } else {
        ENDING_BAD
    }
}

pub fn classify(cast: &Cast, protagonist: &str, score: i32) -> EndingKind {
    if cast.is_hidden(protagonist) {
        EndingKind::Hidden
    } else if score >= TRUE_END_SCORE {
        EndingKind::True
    } else if score >= NORMAL_END_SCORE {
        EndingKind::Normal
    } else {
        EndingKind::Bad
    }
}

pub fn is_ending_block(name: &str) -> bool {
    name == "ending" || name.contains("ending_")
}
