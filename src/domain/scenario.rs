/// Scenario store: `protagonist → block name → ordered lines`.
///
/// Loaded once at startup from a JSON document and never mutated. A
/// failed load is fatal; a missing protagonist or block at play time is
/// not an error here, `lookup` just returns `None` and the engine
/// treats that as an exhausted block.
///
/// ## Document format:
///   ```json
///   {
///     "ショウ編": {
///       "act1": [
///         { "character": "ショウ", "text": "...", "background": "bg/gate.png" },
///         { "type": "choice", "options": [{ "text": "...", "score": 2 }] },
///         { "text": "...", "next_block": "act2" }
///       ]
///     }
///   }
///   ```

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use super::line::Line;
use crate::error::ScenarioError;

type Blocks = HashMap<String, Vec<Line>>;

#[derive(Clone, Debug, Default)]
pub struct Scenario {
    protagonists: HashMap<String, Blocks>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(doc)
    }

    pub fn from_value(doc: Value) -> Result<Self, ScenarioError> {
        if !doc.is_object() {
            return Err(ScenarioError::Shape(
                "top level must map protagonist names to blocks".into(),
            ));
        }
        let protagonists: HashMap<String, Blocks> =
            serde_json::from_value(doc).map_err(|e| ScenarioError::Shape(e.to_string()))?;
        if protagonists.is_empty() {
            return Err(ScenarioError::Shape("no protagonists defined".into()));
        }
        Ok(Scenario { protagonists })
    }

    pub fn lookup(&self, protagonist: &str, block: &str) -> Option<&[Line]> {
        self.protagonists
            .get(protagonist)?
            .get(block)
            .map(Vec::as_slice)
    }

    pub fn has_protagonist(&self, protagonist: &str) -> bool {
        self.protagonists.contains_key(protagonist)
    }

    pub fn block_count(&self) -> usize {
        self.protagonists.values().map(HashMap::len).sum()
    }
}
