/// Typewriter effect: reveals the current line one character at a time.
///
/// There is only ever one reveal in flight. `start` replaces whatever was
/// revealing, `finish` jumps to the end. Time is passed in by the caller
/// so the reveal is driven by the main loop's tick, not its own thread.

use std::time::{Duration, Instant};

pub struct Typewriter {
    text: String,
    total: usize,
    shown: usize,
    interval: Duration,
    last_step: Instant,
}

impl Typewriter {
    pub fn new(interval: Duration) -> Self {
        Typewriter {
            text: String::new(),
            total: 0,
            shown: 0,
            interval: interval.max(Duration::from_millis(1)),
            last_step: Instant::now(),
        }
    }

    /// Begin revealing `text`, cancelling any reveal in progress.
    pub fn start(&mut self, text: &str, now: Instant) {
        self.text = text.to_string();
        self.total = text.chars().count();
        self.shown = 0;
        self.last_step = now;
    }

    /// Drop the current text entirely (choice and ending screens).
    pub fn clear(&mut self) {
        self.text.clear();
        self.total = 0;
        self.shown = 0;
    }

    /// Reveal every character that is due. Returns how many were revealed.
    pub fn tick(&mut self, now: Instant) -> usize {
        let before = self.shown;
        while self.shown < self.total && now.duration_since(self.last_step) >= self.interval {
            self.shown += 1;
            self.last_step += self.interval;
        }
        self.shown - before
    }

    pub fn finish(&mut self) {
        self.shown = self.total;
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.total
    }

    pub fn visible(&self) -> &str {
        match self.text.char_indices().nth(self.shown) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}
