/// Line records: one unit of a scenario block.
///
/// Field names follow the authored JSON (`character`, `char_image`,
/// `next_block`, ...). Authored content is loose about types, so the
/// flag fields accept any JSON value and read it by truthiness, and the
/// pointer fields treat `""` the same as absent.
///
/// ## Sticky visuals
///   `background`     : only a non-empty value replaces the current one.
///   `char_image`     : any present value replaces it, `""` / `null` clear it.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Speaker names containing this marker are narration: no name label.
pub const NARRATION_MARKER: &str = "ナレーション";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Line {
    #[serde(rename = "type", default)]
    pub tag: Option<String>,
    #[serde(rename = "character", default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub background: Option<String>,
    #[serde(rename = "char_image", default, deserialize_with = "clearable")]
    pub character_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, deserialize_with = "non_empty")]
    pub next_block: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub next_act: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub branch_act3: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub branch_ending: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub ending: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ChoiceOption {
    #[serde(rename = "text", default)]
    pub label: String,
    #[serde(rename = "score", default)]
    pub score_delta: i32,
    #[serde(default, deserialize_with = "non_empty")]
    pub next_block: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Dialogue,
    Choice,
    EndingMarker,
}

/// Where the story goes when the cursor runs past a block whose last
/// line is this one. Variants are listed in priority order: a line that
/// carries several directives resolves to the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition<'a> {
    /// `next_block`: chapter jump.
    Chapter(&'a str),
    /// `next_act`: act jump. Same mechanics as `Chapter`.
    Act(&'a str),
    /// `branch_act3`: pick `act3_high` / `act3_mid` / `act3_low` by score.
    ScoreBranch,
    /// `branch_ending`: pick an ending route by score and last choice.
    EndingBranch,
    None,
}

impl Line {
    /// A line with options is a choice point; a choice tag without any
    /// options has nothing to pick, so it plays as dialogue.
    pub fn kind(&self) -> LineKind {
        if !self.options.is_empty() {
            LineKind::Choice
        } else if self.is_ending_marker() {
            LineKind::EndingMarker
        } else {
            LineKind::Dialogue
        }
    }

    pub fn is_ending_marker(&self) -> bool {
        self.ending || self.tag.as_deref() == Some("ending")
    }

    pub fn transition(&self) -> Transition<'_> {
        if let Some(block) = self.next_block.as_deref() {
            Transition::Chapter(block)
        } else if let Some(block) = self.next_act.as_deref() {
            Transition::Act(block)
        } else if self.branch_act3 {
            Transition::ScoreBranch
        } else if self.branch_ending {
            Transition::EndingBranch
        } else {
            Transition::None
        }
    }

    /// Name to show above the text box, or `None` for narration.
    pub fn speaker_label(&self) -> Option<&str> {
        let name = self.speaker.as_deref()?.trim();
        if name.is_empty() || name.contains(NARRATION_MARKER) {
            None
        } else {
            Some(name)
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

// ── Lenient field readers ──

fn non_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<String>::deserialize(d)?;
    Ok(v.filter(|s| !s.is_empty()))
}

fn clearable<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<String>::deserialize(d)?;
    Ok(Some(v.unwrap_or_default()))
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ChoiceOption>, D::Error> {
    let v = Option::<Vec<ChoiceOption>>::deserialize(d)?;
    Ok(v.unwrap_or_default())
}

fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
