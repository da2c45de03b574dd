/// The protagonists a scenario offers and where each one starts.
///
/// Normal protagonists all enter at `entry_block`. The hidden protagonist
/// enters at its own block, always gets the hidden ending, and is only
/// offered once every normal protagonist has been cleared.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cast {
    pub protagonists: Vec<String>,
    pub entry_block: String,
    pub hidden_protagonist: String,
    pub hidden_entry_block: String,
}

impl Cast {
    pub fn is_hidden(&self, protagonist: &str) -> bool {
        protagonist == self.hidden_protagonist
    }

    pub fn entry_block_for(&self, protagonist: &str) -> &str {
        if self.is_hidden(protagonist) {
            &self.hidden_entry_block
        } else {
            &self.entry_block
        }
    }
}

impl Default for Cast {
    fn default() -> Self {
        Cast {
            protagonists: vec!["ショウ編".into(), "しょう編".into()],
            entry_block: "act1".into(),
            hidden_protagonist: "隠しシナリオ".into(),
            hidden_entry_block: "main".into(),
        }
    }
}
