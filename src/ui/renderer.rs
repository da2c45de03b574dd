/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Scenario text is mostly Japanese, so every write goes through
/// `char_width` (East Asian width via unicode-width) and full-width
/// characters take two cells.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use unicode_width::UnicodeWidthChar;

use crate::domain::route::EndingKind;
use crate::sim::engine::{EndingReason, Frame};
use crate::sim::save::KeyValueStore;
use crate::sim::stage::{Screen, Stage, MENU_ITEMS};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    wide: bool, // true = this char occupies 2 terminal columns
    cont: bool, // true = right half of the previous wide char (skip render)
}

impl Cell {
    /// Explicit background for every "empty" cell, so the gaps between
    /// rows match the cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 16, b: 24 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        Cell {
            ch: c,
            fg,
            bg: Self::norm_bg(bg),
            wide: char_width(c) == 2,
            cont: false,
        }
    }

    fn continuation(bg: Color) -> Self {
        Cell {
            ch: ' ',
            fg: Color::White,
            bg: Self::norm_bg(bg),
            wide: false,
            cont: true,
        }
    }
}

/// Terminal columns taken by `c`. Control and combining characters
/// take none.
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Break `text` into rows no wider than `width` columns. Explicit
/// newlines always break; long runs break at the column limit.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut rows = Vec::new();
    for para in text.split('\n') {
        let mut row = String::new();
        let mut used = 0;
        for ch in para.chars() {
            let w = char_width(ch);
            if used + w > width {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(ch);
            used += w;
        }
        rows.push(row);
    }
    rows
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Wide characters take two columns; one
    /// that would straddle the right edge is dropped.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            let w = char_width(ch);
            if w == 0 {
                continue;
            }
            if cx + w > self.width {
                break;
            }
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            if w == 2 {
                self.set(cx + 1, y, Cell::continuation(bg));
            }
            cx += w;
        }
    }

    /// Write a string centered on row `y`.
    fn put_center(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(str_width(s)) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, Cell::from_char(' ', Color::White, bg));
            }
        }
    }

    fn frame_box(&mut self, x: usize, y: usize, w: usize, h: usize, fg: Color, bg: Color) {
        if w < 2 || h < 2 {
            return;
        }
        self.fill(x, y, w, h, bg);
        for col in x + 1..x + w - 1 {
            self.set(col, y, Cell::from_char('─', fg, bg));
            self.set(col, y + h - 1, Cell::from_char('─', fg, bg));
        }
        for row in y + 1..y + h - 1 {
            self.set(x, row, Cell::from_char('│', fg, bg));
            self.set(x + w - 1, row, Cell::from_char('│', fg, bg));
        }
        self.set(x, y, Cell::from_char('┌', fg, bg));
        self.set(x + w - 1, y, Cell::from_char('┐', fg, bg));
        self.set(x, y + h - 1, Cell::from_char('└', fg, bg));
        self.set(x + w - 1, y + h - 1, Cell::from_char('┘', fg, bg));
    }
}

// ── Palette ──

const GOLD: Color = Color::Rgb { r: 255, g: 205, b: 90 };
const PAPER: Color = Color::Rgb { r: 235, g: 228, b: 210 };
const INK_DIM: Color = Color::Rgb { r: 120, g: 115, b: 130 };
const ACCENT: Color = Color::Rgb { r: 120, g: 200, b: 255 };
const WINDOW_BG: Color = Color::Rgb { r: 30, g: 28, b: 44 };
const STAGE_BG: Color = Color::Rgb { r: 24, g: 34, b: 40 };
const MENU_BG: Color = Color::Rgb { r: 44, g: 40, b: 60 };

/// Rows of the dialogue window at the bottom of the screen.
const WINDOW_H: usize = 8;

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render<S: KeyValueStore>(&mut self, stage: &Stage<S>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized || self.last_screen != Some(stage.screen) {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(stage.screen);
        }

        self.front.clear();
        match stage.screen {
            Screen::Title => self.compose_title(stage),
            Screen::Select => self.compose_select(stage),
            Screen::Playing => {
                self.compose_playing(stage);
                if let Some(cursor) = stage.menu {
                    self.compose_menu_overlay(cursor);
                }
            }
            Screen::Ending => self.compose_ending(stage),
        }
        self.compose_message(stage);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev {
                        need_move = true;
                    }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Screens ──

    fn compose_title<S: KeyValueStore>(&mut self, stage: &Stage<S>) {
        let top = self.front.height.saturating_sub(14) / 2;

        self.front.put_center(top, "紙 芝 居", GOLD, Color::Reset);
        self.front.put_center(top + 2, "K A M I S H I B A I", PAPER, Color::Reset);
        self.front.put_center(top + 3, "── a branching story for the terminal ──", INK_DIM, Color::Reset);

        let blink = (stage.anim_tick / 30) % 2 == 0;
        if blink {
            self.front.put_center(top + 7, "▸ Press ENTER to begin ◂", ACCENT, Color::Reset);
        }
        self.front.put_center(top + 9, "Q / ESC  Quit", INK_DIM, Color::Reset);

        if stage.hidden_unlocked {
            self.front.put_center(top + 12, "★ A secret story has been unlocked ★", GOLD, Color::Reset);
        }
    }

    fn compose_select<S: KeyValueStore>(&mut self, stage: &Stage<S>) {
        let entries = stage.entries();
        let hidden = &stage.engine.cast().hidden_protagonist;
        let top = 3;

        self.front.put_center(1, "── Choose a story ──", GOLD, Color::Reset);

        let list_w = entries.iter().map(|e| str_width(e)).max().unwrap_or(0) + 6;
        let x = self.front.width.saturating_sub(list_w) / 2;
        for (i, name) in entries.iter().enumerate() {
            let selected = i == stage.select_cursor;
            let marker = if selected { "▶ " } else { "  " };
            let star = if name == hidden { " ★" } else { "" };
            let fg = if selected { ACCENT } else { PAPER };
            self.front.put_str(x, top + i * 2, &format!("{marker}{name}{star}"), fg, Color::Reset);
        }

        let help_y = top + entries.len() * 2 + 1;
        self.front.put_center(help_y, "↑↓ Choose   ENTER Start   ESC Back", INK_DIM, Color::Reset);
    }

    fn compose_playing<S: KeyValueStore>(&mut self, stage: &Stage<S>) {
        let w = self.front.width;
        let h = self.front.height;
        let session = stage.engine.session();

        // Header
        self.front.put_str(1, 0, &format!("◆ {}", session.protagonist), GOLD, Color::Reset);

        // Stage area: background and character captions stand in for art.
        let window_y = h.saturating_sub(WINDOW_H);
        let stage_h = window_y.saturating_sub(2);
        if stage_h >= 3 {
            self.front.frame_box(1, 1, w.saturating_sub(2), stage_h, INK_DIM, STAGE_BG);
            if !session.background.is_empty() {
                let caption = format!("[ {} ]", session.background);
                self.front.put_str(3, 2, &caption, INK_DIM, STAGE_BG);
            }
            if !session.character_image.is_empty() {
                let figure = format!("《 {} 》", session.character_image);
                self.front.put_center(1 + stage_h / 2, &figure, PAPER, STAGE_BG);
            }
        }

        // Dialogue window
        let win_w = w.saturating_sub(2);
        self.front.frame_box(1, window_y, win_w, WINDOW_H.min(h), ACCENT, WINDOW_BG);
        let text_w = win_w.saturating_sub(4);

        match stage.engine.frame() {
            Some(Frame::Dialogue { speaker, .. }) => {
                if let Some(name) = speaker {
                    self.front.put_str(3, window_y, &format!(" {name} "), GOLD, WINDOW_BG);
                }
                let rows = wrap(stage.typewriter.visible(), text_w);
                let max_rows = WINDOW_H.saturating_sub(3);
                let skip = rows.len().saturating_sub(max_rows);
                for (i, row) in rows.iter().skip(skip).enumerate() {
                    self.front.put_str(3, window_y + 1 + i, row, PAPER, WINDOW_BG);
                }
                if stage.typewriter.is_done() && (stage.anim_tick / 20) % 2 == 0 {
                    self.front.put_str(win_w.saturating_sub(2), window_y + WINDOW_H - 2, "▼", ACCENT, WINDOW_BG);
                }
            }
            Some(Frame::Choice { options }) => {
                self.front.put_str(3, window_y, " Choose ", GOLD, WINDOW_BG);
                for (row, opt) in options.iter().enumerate().take(WINDOW_H.saturating_sub(2)) {
                    let selected = opt.index == stage.choice_cursor;
                    let marker = if selected { "▶" } else { " " };
                    let fg = if selected { ACCENT } else { PAPER };
                    let label = format!("{marker} {}. {}", opt.index + 1, opt.label);
                    self.front.put_str(3, window_y + 1 + row, &label, fg, WINDOW_BG);
                }
            }
            _ => {}
        }

        // Footer
        let can_back = stage.engine.can_go_back();
        let footer_y = h.saturating_sub(1);
        self.front.put_str(2, footer_y, "ENTER Next", INK_DIM, Color::Reset);
        self.front.put_str(15, footer_y, "BS Back", if can_back { INK_DIM } else { WINDOW_BG }, Color::Reset);
        self.front.put_str(25, footer_y, "ESC Menu", INK_DIM, Color::Reset);
    }

    fn compose_menu_overlay(&mut self, cursor: usize) {
        let box_w = 28_usize.min(self.front.width);
        let box_h = MENU_ITEMS.len() + 4;
        let x = self.front.width.saturating_sub(box_w) / 2;
        let y = self.front.height.saturating_sub(box_h) / 2;

        self.front.frame_box(x, y, box_w, box_h, GOLD, MENU_BG);
        self.front.put_str(x + 2, y, " Menu ", GOLD, MENU_BG);
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let selected = i == cursor;
            let marker = if selected { "▶ " } else { "  " };
            let fg = if selected { ACCENT } else { PAPER };
            self.front.put_str(x + 2, y + 2 + i, &format!("{marker}{item}"), fg, MENU_BG);
        }
    }

    fn compose_ending<S: KeyValueStore>(&mut self, stage: &Stage<S>) {
        let Some(Frame::Ending { kind, reason, title, text }) = stage.engine.frame() else {
            return;
        };
        let title_fg = match kind {
            EndingKind::True => GOLD,
            EndingKind::Hidden => ACCENT,
            EndingKind::Normal => PAPER,
            EndingKind::Bad => Color::Rgb { r: 220, g: 90, b: 90 },
        };

        let rows = wrap(text, self.front.width.saturating_sub(8).min(60));
        let top = self.front.height.saturating_sub(rows.len() + 8) / 2;

        self.front.put_center(top, &format!("━━  {title}  ━━"), title_fg, Color::Reset);
        for (i, row) in rows.iter().enumerate() {
            self.front.put_center(top + 3 + i, row, PAPER, Color::Reset);
        }
        if *reason == EndingReason::FellThrough {
            self.front.put_center(top + rows.len() + 4, "(the story ended unexpectedly)", INK_DIM, Color::Reset);
        }
        self.front.put_center(top + rows.len() + 6, "ENTER  Back to title", ACCENT, Color::Reset);
    }

    /// Bottom message bar, shared by every screen.
    fn compose_message<S: KeyValueStore>(&mut self, stage: &Stage<S>) {
        if stage.message.is_empty() || self.front.height < 2 {
            return;
        }
        let row = self.front.height - 2;
        let bar = Color::Rgb { r: 200, g: 170, b: 60 };
        let w = self.front.width;
        self.front.fill(0, row, w, 1, bar);
        self.front.put_str(1, row, &format!("◈ {}", stage.message), Color::Black, bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('あ'), 2);
        assert_eq!(char_width('漢'), 2);
        assert_eq!(char_width('！'), 2);
        assert_eq!(str_width("ショウ編 1"), 10);
        assert_eq!(char_width('\u{0301}'), 0);
        assert_eq!(char_width('\u{7}'), 0);
    }

    #[test]
    fn wrap_respects_width_and_newlines() {
        let rows = wrap("あいうえお\nab", 4);
        assert_eq!(rows, vec!["あい", "うえ", "お", "ab"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn put_str_marks_continuations() {
        let mut fb = FrameBuffer::new(5, 1);
        fb.put_str(0, 0, "aあい", Color::White, Color::Reset);
        assert!(fb.get(1, 0).wide);
        assert!(fb.get(2, 0).cont);
        assert!(fb.get(3, 0).wide);
        assert!(fb.get(4, 0).cont);

        // Zero-width characters take no cell.
        let mut fb = FrameBuffer::new(3, 1);
        fb.put_str(0, 0, "e\u{0301}x", Color::White, Color::Reset);
        assert_eq!(fb.get(1, 0).ch, 'x');

        // Wide char straddling the edge is dropped.
        let mut fb = FrameBuffer::new(2, 1);
        fb.put_str(0, 0, "aあ", Color::White, Color::Reset);
        assert_eq!(fb.get(1, 0).ch, ' ');
    }
}
