/// Play session: all mutable state of one playthrough.
///
/// ## Cursor
///   `index` points at the next line to show in `block`. It is always
///   `<= block length`; equal to the length means the block is exhausted
///   and the next advance resolves the block-end transition.
///
/// ## History
///   A bounded stack of bookmarks (oldest evicted first) used by "back".
///   A bookmark is taken on every tap and every resolved choice, never
///   before the first line of a session. Bookmarks also carry the sticky
///   visuals so stepping back repaints the same picture.

use std::collections::VecDeque;

pub const HISTORY_CAP: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bookmark {
    pub block: String,
    pub index: usize,
    pub total_score: i32,
    pub last_choice_score: i32,
    pub background: String,
    pub character_image: String,
}

#[derive(Clone, Debug, Default)]
pub struct History {
    entries: VecDeque<Bookmark>,
}

impl History {
    pub fn push(&mut self, mark: Bookmark) {
        self.entries.push_back(mark);
        if self.entries.len() > HISTORY_CAP {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<Bookmark> {
        self.entries.pop_back()
    }

    pub fn last(&self) -> Option<&Bookmark> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn oldest(&self) -> Option<&Bookmark> {
        self.entries.front()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlaySession {
    pub protagonist: String,
    pub block: String,
    pub index: usize,
    pub total_score: i32,
    pub last_choice_score: i32,
    pub is_playing: bool,
    /// A choice is on screen and unanswered. Taps and back are ignored.
    pub is_choice_scene: bool,
    pub background: String,
    pub character_image: String,
    pub history: History,
}

impl PlaySession {
    pub fn new(protagonist: &str, entry_block: &str) -> Self {
        PlaySession {
            protagonist: protagonist.to_string(),
            block: entry_block.to_string(),
            is_playing: true,
            ..Default::default()
        }
    }

    pub fn bookmark(&self) -> Bookmark {
        Bookmark {
            block: self.block.clone(),
            index: self.index,
            total_score: self.total_score,
            last_choice_score: self.last_choice_score,
            background: self.background.clone(),
            character_image: self.character_image.clone(),
        }
    }

    pub fn remember(&mut self) {
        let mark = self.bookmark();
        self.history.push(mark);
    }

    pub fn restore(&mut self, mark: &Bookmark) {
        self.block = mark.block.clone();
        self.index = mark.index;
        self.total_score = mark.total_score;
        self.last_choice_score = mark.last_choice_score;
        self.background = mark.background.clone();
        self.character_image = mark.character_image.clone();
    }

    pub fn enter_block(&mut self, block: &str) {
        self.block = block.to_string();
        self.index = 0;
    }
}
