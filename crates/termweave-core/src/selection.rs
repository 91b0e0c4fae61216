//! Text selection over the screen and its scrollback.
//!
//! Pure data layer for hosts that implement copy: positions address the
//! combined buffer, `0..scrollback_len()` for history (oldest first)
//! followed by the visible rows of the active grid. Extraction skips wide
//! continuations, trims trailing blanks, and joins soft-wrapped rows
//! without a newline.

use crate::cell::Cell;
use crate::screen::Screen;

/// A cell position in the combined buffer (scrollback then viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferPos {
    /// Line index in the combined buffer.
    pub line: u32,
    /// Column in viewport coordinates.
    pub col: u16,
}

impl BufferPos {
    pub const fn new(line: u32, col: u16) -> Self {
        Self { line, col }
    }

    /// A visible cell `(row, col)` as a combined-buffer position.
    pub fn from_viewport(screen: &Screen, row: u16, col: u16) -> Self {
        Self {
            line: screen.scrollback_len() as u32 + u32::from(row),
            col,
        }
    }
}

/// An inclusive selection between two buffer positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: BufferPos,
    pub end: BufferPos,
}

impl Selection {
    pub const fn new(start: BufferPos, end: BufferPos) -> Self {
        Self { start, end }
    }

    /// The selection with `start <= end` in reading order.
    pub fn normalized(self) -> Self {
        if (self.start.line, self.start.col) <= (self.end.line, self.end.col) {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }

    /// Select one character cell; a wide character covers both columns.
    pub fn cell_at(screen: &Screen, pos: BufferPos) -> Self {
        let col = pos.col.min(screen.width().saturating_sub(1));
        let lead = wide_lead(screen, pos.line, col);
        let end = wide_end(screen, pos.line, lead);
        Self::new(
            BufferPos::new(pos.line, lead),
            BufferPos::new(pos.line, end),
        )
    }

    /// Select a whole buffer line.
    pub fn line_at(screen: &Screen, line: u32) -> Self {
        let max_line = total_lines(screen).saturating_sub(1);
        let line = line.min(max_line);
        Self::new(
            BufferPos::new(line, 0),
            BufferPos::new(line, screen.width().saturating_sub(1)),
        )
    }

    /// Select the word under `pos`: a run of word characters, or a run of
    /// whitespace when the hit cell is blank.
    pub fn word_at(screen: &Screen, pos: BufferPos) -> Self {
        let line = pos.line.min(total_lines(screen).saturating_sub(1));
        let col = wide_lead(screen, line, pos.col.min(screen.width().saturating_sub(1)));
        let target = char_class(char_at(screen, line, col));

        let mut start = col;
        while start > 0 {
            let probe = wide_lead(screen, line, start - 1);
            if char_class(char_at(screen, line, probe)) != target {
                break;
            }
            start = probe;
        }

        let mut end = wide_end(screen, line, col);
        loop {
            let next = end.saturating_add(1);
            if next >= screen.width() {
                break;
            }
            if char_class(char_at(screen, line, next)) != target {
                break;
            }
            end = wide_end(screen, line, next);
        }

        Self::new(BufferPos::new(line, start), BufferPos::new(line, end))
    }

    /// The selected text. Rows whose successor is soft-wrapped join without
    /// a newline, so copied shell output re-assembles long lines.
    pub fn text(&self, screen: &Screen) -> String {
        let total = total_lines(screen);
        if total == 0 || screen.width() == 0 {
            return String::new();
        }
        let sel = self.normalized();
        let start_line = sel.start.line.min(total - 1);
        let end_line = sel.end.line.min(total - 1);
        let last_col = screen.width() - 1;

        let mut out = String::new();
        for line in start_line..=end_line {
            let sc = if line == start_line {
                sel.start.col.min(last_col)
            } else {
                0
            };
            let ec = if line == end_line {
                sel.end.col.min(last_col)
            } else {
                last_col
            };

            let mut text = String::new();
            for col in sc..=ec {
                match cell_at(screen, line, col) {
                    Some(cell) if cell.is_continuation() => {}
                    Some(cell) => text.push(cell.rune()),
                    None => text.push(' '),
                }
            }
            out.push_str(text.trim_end());

            if line != end_line && !line_is_wrapped(screen, line + 1) {
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Whitespace,
    Other,
}

/// Word characters cover identifiers plus path/URL punctuation, so a
/// double-click grabs `src/main.rs` or `user@host` whole.
fn char_class(ch: char) -> CharClass {
    if ch.is_whitespace() || ch == '\0' {
        CharClass::Whitespace
    } else if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | '\\' | ':' | '@') {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

fn total_lines(screen: &Screen) -> u32 {
    screen.scrollback_len() as u32 + u32::from(screen.height())
}

fn cell_at(screen: &Screen, line: u32, col: u16) -> Option<&Cell> {
    let history = screen.scrollback_len() as u32;
    let cells = if line < history {
        &screen.scrollback_line(line as usize)?.cells
    } else {
        &screen.line((line - history) as u16)?.cells
    };
    cells.get(col as usize)
}

fn char_at(screen: &Screen, line: u32, col: u16) -> char {
    cell_at(screen, line, col).map_or(' ', Cell::rune)
}

fn line_is_wrapped(screen: &Screen, line: u32) -> bool {
    let history = screen.scrollback_len() as u32;
    if line < history {
        screen
            .scrollback_line(line as usize)
            .is_some_and(|l| l.wrapped)
    } else {
        screen
            .line((line - history) as u16)
            .is_some_and(|l| l.wrapped)
    }
}

/// Step a position back onto the leading cell of a wide pair.
fn wide_lead(screen: &Screen, line: u32, col: u16) -> u16 {
    if col > 0
        && cell_at(screen, line, col).is_some_and(Cell::is_continuation)
    {
        col - 1
    } else {
        col
    }
}

/// The last column covered by the character starting at `col`.
fn wide_end(screen: &Screen, line: u32, col: u16) -> u16 {
    if cell_at(screen, line, col).is_some_and(Cell::is_wide) {
        col.saturating_add(1).min(screen.width().saturating_sub(1))
    } else {
        col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn screen_with(width: u16, rows: &[&str]) -> Screen {
        let mut screen = Screen::new(width, rows.len() as u16);
        for (row, text) in rows.iter().enumerate() {
            screen.move_to(row as u16, 0);
            for ch in text.chars() {
                screen.print(ch, Cell::display_width(ch));
            }
        }
        screen
    }

    #[test]
    fn extract_single_line_range() {
        let screen = screen_with(10, &["hello you"]);
        let sel = Selection::new(BufferPos::new(0, 0), BufferPos::new(0, 4));
        assert_eq!(sel.text(&screen), "hello");
    }

    #[test]
    fn extract_reversed_selection_normalizes() {
        let screen = screen_with(10, &["hello"]);
        let sel = Selection::new(BufferPos::new(0, 4), BufferPos::new(0, 0));
        assert_eq!(sel.text(&screen), "hello");
    }

    #[test]
    fn extract_multiline_inserts_newlines() {
        let screen = screen_with(10, &["aa", "bb"]);
        let sel = Selection::new(BufferPos::new(0, 0), BufferPos::new(1, 1));
        assert_eq!(sel.text(&screen), "aa\nbb");
    }

    #[test]
    fn soft_wrapped_rows_join_without_newline() {
        let mut screen = Screen::new(5, 3);
        for ch in "abcdefg".chars() {
            screen.print(ch, 1);
        }
        let sel = Selection::new(BufferPos::new(0, 0), BufferPos::new(1, 4));
        assert_eq!(sel.text(&screen), "abcdefg");
    }

    #[test]
    fn selection_spans_scrollback_into_viewport() {
        let mut screen = Screen::new(5, 2);
        for ch in "one".chars() {
            screen.print(ch, 1);
        }
        screen.carriage_return();
        screen.linefeed();
        for ch in "two".chars() {
            screen.print(ch, 1);
        }
        screen.carriage_return();
        screen.linefeed();
        for ch in "thr".chars() {
            screen.print(ch, 1);
        }
        assert_eq!(screen.scrollback_len(), 1);

        let sel = Selection::new(BufferPos::new(0, 0), BufferPos::new(2, 2));
        assert_eq!(sel.text(&screen), "one\ntwo\nthr");
    }

    #[test]
    fn word_selection_grabs_paths_whole() {
        let screen = screen_with(20, &["see src/main.rs now"]);
        let sel = Selection::word_at(&screen, BufferPos::new(0, 8));
        assert_eq!(sel.text(&screen), "src/main.rs");
    }

    #[test]
    fn word_selection_of_whitespace_run() {
        let screen = screen_with(20, &["a   b"]);
        let sel = Selection::word_at(&screen, BufferPos::new(0, 2));
        assert_eq!(sel.text(&screen), "");
    }

    #[test]
    fn cell_selection_covers_wide_pair() {
        let mut screen = Screen::new(10, 1);
        screen.print('中', 2);
        let sel = Selection::cell_at(&screen, BufferPos::new(0, 1));
        assert_eq!(sel.start.col, 0);
        assert_eq!(sel.end.col, 1);
        assert_eq!(sel.text(&screen), "中");
    }

    #[test]
    fn line_selection_clamps_to_buffer() {
        let screen = screen_with(10, &["only"]);
        let sel = Selection::line_at(&screen, 99);
        assert_eq!(sel.text(&screen), "only");
    }
}
