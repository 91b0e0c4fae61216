//! The mutable screen state machine.
//!
//! A [`Screen`] owns the primary and alternate grids, the cursor, scrolling
//! margins, modes, tab stops, charset state, and primary-grid scrollback.
//! The interpreter mutates it one parsed sequence at a time; the host
//! samples it through a mutex held by the shell.
//!
//! # Invariants
//!
//! - `cursor.row < height` always; `cursor.col <= width`, where positions
//!   past the right margin only occur while the pending-wrap latch is set.
//! - `margins.top < margins.bottom`, both within the grid.
//! - Both grids are exactly `height` lines of `width` cells; switching the
//!   active grid never resizes either.
//! - Only the primary grid scrolls into history; the alternate discards.

use std::collections::{BTreeSet, VecDeque};

use crate::cell::{Cell, LinkRegistry, Style};
use crate::charset::CharsetTable;
use crate::line::Line;
use crate::mode::{Modes, MouseEncoding, MouseMode};

/// Default cap on primary-grid scrollback lines.
pub const DEFAULT_SCROLLBACK: usize = 0xFFFF;

/// Cursor shape as set by DECSCUSR (`CSI Ps SP q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// Shape 0/1: blinking block (the power-on default).
    #[default]
    BlinkingBlock,
    /// Shape 2: steady block.
    SteadyBlock,
    /// Shape 3: blinking underline.
    BlinkingUnderline,
    /// Shape 4: steady underline.
    SteadyUnderline,
    /// Shape 5: blinking bar.
    BlinkingBar,
    /// Shape 6: steady bar.
    SteadyBar,
}

impl CursorShape {
    /// Map a DECSCUSR parameter to a shape; out-of-range values are the
    /// default.
    pub fn from_decscusr(value: u16) -> Self {
        match value {
            2 => Self::SteadyBlock,
            3 => Self::BlinkingUnderline,
            4 => Self::SteadyUnderline,
            5 => Self::BlinkingBar,
            6 => Self::SteadyBar,
            _ => Self::BlinkingBlock,
        }
    }

    /// The same shape with blinking forced on or off (DECSET 12).
    pub fn with_blink(self, blink: bool) -> Self {
        match (self, blink) {
            (Self::SteadyBlock, true) => Self::BlinkingBlock,
            (Self::SteadyUnderline, true) => Self::BlinkingUnderline,
            (Self::SteadyBar, true) => Self::BlinkingBar,
            (Self::BlinkingBlock, false) => Self::SteadyBlock,
            (Self::BlinkingUnderline, false) => Self::SteadyUnderline,
            (Self::BlinkingBar, false) => Self::SteadyBar,
            (shape, _) => shape,
        }
    }
}

/// Cursor position and printing attributes. Positions are raw 0-indexed
/// grid coordinates, never view- or origin-relative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    /// Attributes applied to printed cells.
    pub style: Style,
    pub shape: CursorShape,
}

/// State captured by DECSC and restored by DECRC, kept per grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedCursor {
    pub cursor: Cursor,
    pub charsets: CharsetTable,
    pub decom: bool,
    pub decawm: bool,
}

/// Scrolling region margins, all bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl Margins {
    fn full(width: u16, height: u16) -> Self {
        Self {
            top: 0,
            bottom: height.saturating_sub(1),
            left: 0,
            right: width.saturating_sub(1),
        }
    }
}

/// A captured sixel image: opaque payload anchored at the cursor position
/// where its DCS introducer arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SixelImage {
    pub row: u16,
    pub col: u16,
    pub data: Vec<u8>,
}

/// Which grid is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveGrid {
    #[default]
    Primary,
    Alternate,
}

/// The terminal screen: grids, cursor, margins, modes, and history.
#[derive(Debug)]
pub struct Screen {
    width: u16,
    height: u16,

    primary: Vec<Line>,
    alt: Vec<Line>,
    active: ActiveGrid,

    scrollback: VecDeque<Line>,
    max_scrollback: usize,

    pub cursor: Cursor,
    /// Pending-wrap latch: the last print ended at the right margin and the
    /// next one wraps first (when DECAWM is on).
    pub pending_wrap: bool,
    saved_primary: SavedCursor,
    saved_alt: SavedCursor,

    pub margins: Margins,
    pub modes: Modes,
    pub mouse_mode: MouseMode,
    pub mouse_encoding: MouseEncoding,

    tab_stops: BTreeSet<u16>,
    pub charsets: CharsetTable,

    pub links: LinkRegistry,
    /// When false, OSC 8 sequences are stripped instead of applied.
    pub osc8_enabled: bool,

    pub sixels: Vec<SixelImage>,

    /// Window title from OSC 0/2.
    pub title: String,

    /// Defaults reported by OSC 10/11/12 queries, as RGB triples.
    pub default_fg: (u8, u8, u8),
    pub default_bg: (u8, u8, u8),
    pub cursor_color: (u8, u8, u8),

    /// Last printed graphic rune, for REP.
    pub last_printed: Option<(char, u8)>,

    /// Set by any visible mutation; cleared by the host draw pass.
    redraw_needed: bool,
}

impl Screen {
    /// A blank screen of the given size, primary grid active.
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_scrollback(width, height, DEFAULT_SCROLLBACK)
    }

    /// A blank screen with an explicit scrollback cap.
    pub fn with_scrollback(width: u16, height: u16, max_scrollback: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            primary: blank_grid(width, height),
            alt: blank_grid(width, height),
            active: ActiveGrid::Primary,
            scrollback: VecDeque::new(),
            max_scrollback,
            cursor: Cursor::default(),
            pending_wrap: false,
            saved_primary: SavedCursor::default(),
            saved_alt: SavedCursor::default(),
            margins: Margins::full(width, height),
            modes: Modes::power_on(),
            mouse_mode: MouseMode::None,
            mouse_encoding: MouseEncoding::Default,
            tab_stops: default_tab_stops(width),
            charsets: CharsetTable::default(),
            links: LinkRegistry::new(),
            osc8_enabled: true,
            sixels: Vec::new(),
            title: String::new(),
            default_fg: (0xFF, 0xFF, 0xFF),
            default_bg: (0x00, 0x00, 0x00),
            cursor_color: (0xFF, 0xFF, 0xFF),
            last_printed: None,
            redraw_needed: false,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn active_grid(&self) -> ActiveGrid {
        self.active
    }

    pub fn is_alt(&self) -> bool {
        self.active == ActiveGrid::Alternate
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    /// A scrollback line by index, 0 = oldest.
    pub fn scrollback_line(&self, idx: usize) -> Option<&Line> {
        self.scrollback.get(idx)
    }

    /// A visible line of the active grid.
    pub fn line(&self, row: u16) -> Option<&Line> {
        self.grid().get(row as usize)
    }

    /// Whether the cursor is visible (DECTCEM).
    pub fn cursor_visible(&self) -> bool {
        self.modes.contains(Modes::DECTCEM)
    }

    /// Whether a redraw is pending since the last [`Screen::clear_dirty`].
    pub fn redraw_needed(&self) -> bool {
        self.redraw_needed
    }

    /// Mark the screen as needing a redraw.
    pub fn mark_dirty(&mut self) {
        self.redraw_needed = true;
    }

    /// Clear the redraw flag and every cell dirty bit. Called by the host
    /// after painting.
    pub fn clear_dirty(&mut self) {
        self.redraw_needed = false;
        let grid = match self.active {
            ActiveGrid::Primary => &mut self.primary,
            ActiveGrid::Alternate => &mut self.alt,
        };
        for line in grid {
            for cell in &mut line.cells {
                cell.dirty = false;
            }
        }
    }

    /// Active-grid text, rows joined by newlines, for debugging.
    pub fn text(&self) -> String {
        self.grid()
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text of a single visible row.
    pub fn row_text(&self, row: u16) -> String {
        self.line(row).map(Line::text).unwrap_or_default()
    }

    fn grid(&self) -> &[Line] {
        match self.active {
            ActiveGrid::Primary => &self.primary,
            ActiveGrid::Alternate => &self.alt,
        }
    }

    fn grid_mut(&mut self) -> &mut Vec<Line> {
        match self.active {
            ActiveGrid::Primary => &mut self.primary,
            ActiveGrid::Alternate => &mut self.alt,
        }
    }

    fn cell_mut(&mut self, row: u16, col: u16) -> Option<&mut Cell> {
        let grid = self.grid_mut();
        grid.get_mut(row as usize)?.cells.get_mut(col as usize)
    }

    // ── Cursor movement ─────────────────────────────────────────────

    /// Home position respecting origin mode.
    fn origin(&self) -> (u16, u16) {
        if self.modes.contains(Modes::DECOM) {
            (self.margins.top, self.margins.left)
        } else {
            (0, 0)
        }
    }

    /// Absolute cursor move from CUP/HVP/CHA/VPA coordinates (already
    /// 0-indexed). Origin mode offsets and clamps into the margins.
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.pending_wrap = false;
        let (row, col) = if self.modes.contains(Modes::DECOM) {
            (
                self.margins.top.saturating_add(row).min(self.margins.bottom),
                self.margins.left.saturating_add(col).min(self.margins.right),
            )
        } else {
            (
                row.min(self.height.saturating_sub(1)),
                col.min(self.width.saturating_sub(1)),
            )
        };
        self.cursor.row = row;
        self.cursor.col = col;
        self.mark_dirty();
    }

    /// Relative cursor move, stopping at the margins when the cursor starts
    /// inside them and at the screen edge otherwise.
    pub fn move_rel(&mut self, d_row: i32, d_col: i32) {
        self.pending_wrap = false;
        let row = i32::from(self.cursor.row) + d_row;
        let col = i32::from(self.cursor.col) + d_col;

        let top = if self.cursor.row >= self.margins.top {
            self.margins.top
        } else {
            0
        };
        let bottom = if self.cursor.row <= self.margins.bottom {
            self.margins.bottom
        } else {
            self.height.saturating_sub(1)
        };
        let left = if self.cursor.col >= self.margins.left {
            self.margins.left
        } else {
            0
        };
        let right = if self.cursor.col <= self.margins.right {
            self.margins.right
        } else {
            self.width.saturating_sub(1)
        };

        self.cursor.row = row.clamp(i32::from(top), i32::from(bottom)) as u16;
        self.cursor.col = col.clamp(i32::from(left), i32::from(right)) as u16;
        self.mark_dirty();
    }

    /// CHA: absolute column, origin-mode relative to the left margin.
    pub fn set_col(&mut self, col: u16) {
        self.pending_wrap = false;
        self.cursor.col = if self.modes.contains(Modes::DECOM) {
            self.margins.left.saturating_add(col).min(self.margins.right)
        } else {
            col.min(self.width.saturating_sub(1))
        };
        self.mark_dirty();
    }

    /// VPA: absolute row, origin-mode relative to the top margin.
    pub fn set_row(&mut self, row: u16) {
        self.pending_wrap = false;
        self.cursor.row = if self.modes.contains(Modes::DECOM) {
            self.margins.top.saturating_add(row).min(self.margins.bottom)
        } else {
            row.min(self.height.saturating_sub(1))
        };
        self.mark_dirty();
    }

    /// CR: return to the left margin.
    pub fn carriage_return(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = if self.cursor.col >= self.margins.left {
            self.margins.left
        } else {
            0
        };
        self.mark_dirty();
    }

    /// BS: one column left, or back onto the previous line when this line
    /// was soft-wrapped onto.
    pub fn backspace(&mut self) {
        self.pending_wrap = false;
        if self.cursor.col > self.margins.left {
            self.cursor.col -= 1;
        } else if self.cursor.row > self.margins.top
            && self
                .line(self.cursor.row)
                .is_some_and(|line| line.wrapped)
        {
            self.cursor.row -= 1;
            self.cursor.col = self.margins.right;
        }
        self.mark_dirty();
    }

    /// IND: one line down, scrolling when at the bottom margin.
    pub fn index(&mut self) {
        self.pending_wrap = false;
        if self.cursor.row == self.margins.bottom {
            self.scroll_up(1, true);
        } else if self.cursor.row < self.height.saturating_sub(1) {
            self.cursor.row += 1;
        }
        self.mark_dirty();
    }

    /// RI: one line up, scrolling when at the top margin.
    pub fn reverse_index(&mut self) {
        self.pending_wrap = false;
        if self.cursor.row == self.margins.top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
        self.mark_dirty();
    }

    /// NEL: index then return to the left margin.
    pub fn next_line(&mut self) {
        self.index();
        self.carriage_return();
    }

    /// LF/VT/FF: index; with LNM also carriage return.
    pub fn linefeed(&mut self) {
        self.index();
        if self.modes.contains(Modes::LNM) {
            self.carriage_return();
        }
    }

    // ── Tab stops ───────────────────────────────────────────────────

    /// HT: advance the cursor to the next tab stop, or the right margin.
    /// Moves the cursor only; no cells are written.
    pub fn tab(&mut self) {
        self.pending_wrap = false;
        let next = self
            .tab_stops
            .range(self.cursor.col.saturating_add(1)..)
            .next()
            .copied()
            .unwrap_or(self.margins.right);
        self.cursor.col = next.min(self.margins.right);
        self.mark_dirty();
    }

    /// CBT: move back `n` tab stops, stopping at the left margin.
    pub fn back_tab(&mut self, n: u16) {
        self.pending_wrap = false;
        for _ in 0..n {
            let prev = self
                .tab_stops
                .range(..self.cursor.col)
                .next_back()
                .copied()
                .unwrap_or(self.margins.left);
            self.cursor.col = prev.max(self.margins.left);
            if self.cursor.col == self.margins.left {
                break;
            }
        }
        self.mark_dirty();
    }

    /// HTS: set a tab stop at the cursor column.
    pub fn set_tab_stop(&mut self) {
        self.tab_stops.insert(self.cursor.col);
    }

    /// TBC 0: clear the tab stop at the cursor column.
    pub fn clear_tab_stop(&mut self) {
        self.tab_stops.remove(&self.cursor.col);
    }

    /// TBC 3: clear every tab stop.
    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.clear();
    }

    // ── Scrolling ───────────────────────────────────────────────────

    /// Shift the scroll region up by `n`, blanking the bottom. With
    /// `into_history`, evicted top rows go to scrollback (primary grid,
    /// full-screen region only); this is the index/linefeed path. Explicit SU and
    /// DL scroll without history.
    pub fn scroll_up(&mut self, n: u16, into_history: bool) {
        self.scroll_region_up(self.margins.top, n, into_history);
    }

    fn scroll_region_up(&mut self, top: u16, n: u16, into_history: bool) {
        let bottom = self.margins.bottom;
        if top > bottom || n == 0 {
            return;
        }
        let span = bottom - top + 1;
        let n = n.min(span);

        let keep_history = into_history
            && !self.is_alt()
            && self.margins.top == 0
            && self.margins.left == 0
            && self.margins.right == self.width.saturating_sub(1);
        if keep_history {
            for r in top..top + n {
                let line = self.primary[r as usize].clone();
                self.scrollback.push_back(line);
            }
            while self.scrollback.len() > self.max_scrollback {
                self.scrollback.pop_front();
            }
        }

        let bg = self.cursor.style.bg;
        let grid = self.grid_mut();
        let region = &mut grid[top as usize..=bottom as usize];
        region.rotate_left(n as usize);
        for line in &mut region[(span - n) as usize..] {
            line.erase(bg);
        }
        self.mark_dirty();
    }

    /// Shift the scroll region down by `n`, blanking the top.
    pub fn scroll_down(&mut self, n: u16) {
        self.scroll_region_down(self.margins.top, n);
    }

    fn scroll_region_down(&mut self, top: u16, n: u16) {
        let bottom = self.margins.bottom;
        if top > bottom || n == 0 {
            return;
        }
        let span = bottom - top + 1;
        let n = n.min(span);
        let bg = self.cursor.style.bg;
        let grid = self.grid_mut();
        let region = &mut grid[top as usize..=bottom as usize];
        region.rotate_right(n as usize);
        for line in &mut region[..n as usize] {
            line.erase(bg);
        }
        self.mark_dirty();
    }

    /// IL: insert `n` blank lines at the cursor row. No-op outside the
    /// scroll region.
    pub fn insert_lines(&mut self, n: u16) {
        if self.cursor.row < self.margins.top || self.cursor.row > self.margins.bottom {
            return;
        }
        self.pending_wrap = false;
        self.scroll_region_down(self.cursor.row, n);
    }

    /// DL: delete `n` lines at the cursor row. No-op outside the region.
    pub fn delete_lines(&mut self, n: u16) {
        if self.cursor.row < self.margins.top || self.cursor.row > self.margins.bottom {
            return;
        }
        self.pending_wrap = false;
        self.scroll_region_up(self.cursor.row, n, false);
    }

    // ── Margins ─────────────────────────────────────────────────────

    /// DECSTBM: set the top/bottom scrolling margins (0-indexed inclusive)
    /// and home the cursor. Invalid regions leave the margins unchanged but
    /// still home.
    pub fn set_margins(&mut self, top: u16, bottom: u16) {
        let bottom = bottom.min(self.height.saturating_sub(1));
        if top < bottom {
            self.margins.top = top;
            self.margins.bottom = bottom;
        }
        let (row, col) = self.origin();
        self.pending_wrap = false;
        self.cursor.row = row;
        self.cursor.col = col;
        self.mark_dirty();
    }

    // ── Printing ────────────────────────────────────────────────────

    /// Print one measured rune at the cursor, honoring charset translation,
    /// the pending-wrap latch, insert mode, and wide-character layout.
    pub fn print(&mut self, ch: char, width: u8) {
        let ch = self.charsets.resolve(ch);
        if width == 0 {
            // Zero-width marks are not stored; the grid is cell-based.
            return;
        }
        let autowrap = self.modes.contains(Modes::DECAWM);

        if self.pending_wrap {
            if autowrap {
                self.next_line();
                let row = self.cursor.row as usize;
                if let Some(line) = self.grid_mut().get_mut(row) {
                    line.wrapped = true;
                }
            }
            self.pending_wrap = false;
        }
        if self.cursor.col > self.margins.right {
            self.cursor.col = self.margins.right;
        }

        // A wide rune that cannot fit before the right margin wraps early
        // (or overwrites the last two columns when autowrap is off).
        if width == 2 && self.cursor.col + 1 > self.margins.right {
            if autowrap {
                self.next_line();
                let row = self.cursor.row as usize;
                if let Some(line) = self.grid_mut().get_mut(row) {
                    line.wrapped = true;
                }
            } else {
                self.cursor.col = self.margins.right.saturating_sub(1).max(self.margins.left);
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let style = self.cursor.style;

        if self.modes.contains(Modes::IRM) {
            self.shift_right(row, col, u16::from(width));
        }

        self.fixup_wide_overwrite(row, col, width);

        if let Some(cell) = self.cell_mut(row, col) {
            cell.write(ch, width, style);
        }
        if width == 2 && col + 1 <= self.margins.right {
            if let Some(cell) = self.cell_mut(row, col + 1) {
                cell.write_continuation(style);
            }
        }

        self.last_printed = Some((ch, width));

        let next = col.saturating_add(u16::from(width));
        if next > self.margins.right {
            if autowrap {
                self.pending_wrap = true;
                self.cursor.col = next.min(self.width);
            } else {
                self.cursor.col = self.margins.right;
            }
        } else {
            self.cursor.col = next;
        }
        self.mark_dirty();
    }

    /// REP: repeat the last printed graphic rune `n` times.
    pub fn repeat_last(&mut self, n: u16) {
        if let Some((ch, width)) = self.last_printed {
            for _ in 0..n {
                self.print(ch, width);
            }
        }
    }

    /// Blank orphaned halves of wide characters around an overwrite at
    /// `(row, col)`.
    fn fixup_wide_overwrite(&mut self, row: u16, col: u16, width: u8) {
        let bg = self.cursor.style.bg;
        // Overwriting a continuation orphans the head to its left.
        if col > 0 {
            let orphan = self
                .line(row)
                .and_then(|l| l.cells.get(col as usize))
                .is_some_and(Cell::is_continuation);
            if orphan {
                if let Some(head) = self.cell_mut(row, col - 1) {
                    head.erase(bg);
                }
            }
        }
        // Overwriting a wide head orphans its continuation.
        let end = col.saturating_add(u16::from(width.max(1)));
        let head_is_wide = self
            .line(row)
            .and_then(|l| l.cells.get(end as usize - 1))
            .is_some_and(Cell::is_wide);
        if head_is_wide {
            if let Some(cont) = self.cell_mut(row, end) {
                if cont.is_continuation() {
                    cont.erase(bg);
                }
            }
        }
    }

    /// IRM shift: move cells right by `n` within `[col, margin.right]`,
    /// dropping what falls off the margin.
    fn shift_right(&mut self, row: u16, col: u16, n: u16) {
        let right = self.margins.right;
        if col > right {
            return;
        }
        let Some(line) = self.grid_mut().get_mut(row as usize) else {
            return;
        };
        let span = &mut line.cells[col as usize..=right as usize];
        let n = (n as usize).min(span.len());
        span.rotate_right(n);
        for cell in &mut span[..n] {
            cell.reset();
        }
    }

    // ── Insert / delete / erase characters ──────────────────────────

    /// ICH: insert `n` blank cells at the cursor, shifting the tail right.
    pub fn insert_chars(&mut self, n: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col.min(self.margins.right);
        self.pending_wrap = false;
        let bg = self.cursor.style.bg;
        let right = self.margins.right;
        let Some(line) = self.grid_mut().get_mut(row as usize) else {
            return;
        };
        let span = &mut line.cells[col as usize..=right as usize];
        let n = (n as usize).min(span.len());
        span.rotate_right(n);
        for cell in &mut span[..n] {
            cell.erase(bg);
        }
        self.mark_dirty();
    }

    /// DCH: delete `n` cells at the cursor, pulling the tail left and
    /// blanking at the right margin.
    pub fn delete_chars(&mut self, n: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col.min(self.margins.right);
        self.pending_wrap = false;
        let bg = self.cursor.style.bg;
        let right = self.margins.right;
        let Some(line) = self.grid_mut().get_mut(row as usize) else {
            return;
        };
        let span = &mut line.cells[col as usize..=right as usize];
        let n = (n as usize).min(span.len());
        span.rotate_left(n);
        let tail = span.len() - n;
        for cell in &mut span[tail..] {
            cell.erase(bg);
        }
        self.mark_dirty();
    }

    /// ECH: blank `n` cells from the cursor without moving it.
    pub fn erase_chars(&mut self, n: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col.min(self.width.saturating_sub(1));
        let bg = self.cursor.style.bg;
        let end = col.saturating_add(n).min(self.width);
        let Some(line) = self.grid_mut().get_mut(row as usize) else {
            return;
        };
        for cell in &mut line.cells[col as usize..end as usize] {
            cell.erase(bg);
        }
        self.mark_dirty();
    }

    // ── Erase in line / display ─────────────────────────────────────

    /// EL: 0 = cursor to end, 1 = start through cursor, 2 = whole line.
    pub fn erase_line(&mut self, mode: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col.min(self.width.saturating_sub(1));
        let bg = self.cursor.style.bg;
        let width = self.width;
        let Some(line) = self.grid_mut().get_mut(row as usize) else {
            return;
        };
        let range = match mode {
            0 => col as usize..width as usize,
            1 => 0..(col as usize + 1),
            2 => 0..width as usize,
            _ => return,
        };
        for cell in &mut line.cells[range] {
            cell.erase(bg);
        }
        self.mark_dirty();
    }

    /// ED: 0 = cursor to end of screen, 1 = start through cursor, 2 =
    /// whole screen, 3 = whole screen plus scrollback.
    pub fn erase_display(&mut self, mode: u16) {
        let bg = self.cursor.style.bg;
        let row = self.cursor.row as usize;
        match mode {
            0 => {
                self.erase_line(0);
                let grid = self.grid_mut();
                for line in grid.iter_mut().skip(row + 1) {
                    line.erase(bg);
                }
            }
            1 => {
                let grid = self.grid_mut();
                for line in grid.iter_mut().take(row) {
                    line.erase(bg);
                }
                self.erase_line(1);
            }
            2 => {
                let grid = self.grid_mut();
                for line in grid.iter_mut() {
                    line.erase(bg);
                }
            }
            3 => {
                let grid = self.grid_mut();
                for line in grid.iter_mut() {
                    line.erase(bg);
                }
                self.scrollback.clear();
            }
            _ => return,
        }
        self.mark_dirty();
    }

    // ── Save / restore, grid switching ──────────────────────────────

    /// DECSC: capture cursor, style, charsets, DECOM and DECAWM for the
    /// active grid.
    pub fn save_cursor(&mut self) {
        let saved = SavedCursor {
            cursor: self.cursor,
            charsets: self.charsets,
            decom: self.modes.contains(Modes::DECOM),
            decawm: self.modes.contains(Modes::DECAWM),
        };
        match self.active {
            ActiveGrid::Primary => self.saved_primary = saved,
            ActiveGrid::Alternate => self.saved_alt = saved,
        }
    }

    /// DECRC: restore the state captured by the last DECSC on this grid.
    pub fn restore_cursor(&mut self) {
        let saved = match self.active {
            ActiveGrid::Primary => self.saved_primary,
            ActiveGrid::Alternate => self.saved_alt,
        };
        self.cursor = saved.cursor;
        self.cursor.row = self.cursor.row.min(self.height.saturating_sub(1));
        self.cursor.col = self.cursor.col.min(self.width.saturating_sub(1));
        self.charsets = saved.charsets;
        self.modes.set(Modes::DECOM, saved.decom);
        self.modes.set(Modes::DECAWM, saved.decawm);
        self.pending_wrap = false;
        self.mark_dirty();
    }

    /// Switch to the alternate grid. `clear` blanks it on entry (1049).
    pub fn enter_alt(&mut self, clear: bool) {
        if self.is_alt() {
            return;
        }
        self.active = ActiveGrid::Alternate;
        self.modes.insert(Modes::ALT_SCREEN);
        if clear {
            for line in &mut self.alt {
                line.reset();
            }
        }
        self.margins = Margins::full(self.width, self.height);
        self.pending_wrap = false;
        self.mark_dirty();
    }

    /// Switch back to the primary grid.
    pub fn exit_alt(&mut self) {
        if !self.is_alt() {
            return;
        }
        self.active = ActiveGrid::Primary;
        self.modes.remove(Modes::ALT_SCREEN);
        self.margins = Margins::full(self.width, self.height);
        self.pending_wrap = false;
        self.mark_dirty();
    }

    // ── Resets ──────────────────────────────────────────────────────

    /// DECSTR: restore modes, margins, charsets and SGR to defaults
    /// without touching grid contents.
    pub fn soft_reset(&mut self) {
        self.modes = Modes::power_on();
        self.modes.set(Modes::ALT_SCREEN, self.is_alt());
        self.margins = Margins::full(self.width, self.height);
        self.cursor.style = Style::default();
        self.cursor.shape = CursorShape::default();
        self.charsets.reset();
        self.pending_wrap = false;
        self.mark_dirty();
    }

    /// RIS: full reset. Both grids cleared, primary active, history
    /// dropped, every mode and table back to power-on.
    pub fn full_reset(&mut self) {
        self.primary = blank_grid(self.width, self.height);
        self.alt = blank_grid(self.width, self.height);
        self.active = ActiveGrid::Primary;
        self.scrollback.clear();
        self.cursor = Cursor::default();
        self.pending_wrap = false;
        self.saved_primary = SavedCursor::default();
        self.saved_alt = SavedCursor::default();
        self.margins = Margins::full(self.width, self.height);
        self.modes = Modes::power_on();
        self.mouse_mode = MouseMode::None;
        self.mouse_encoding = MouseEncoding::Default;
        self.tab_stops = default_tab_stops(self.width);
        self.charsets.reset();
        self.links.clear();
        self.sixels.clear();
        self.title.clear();
        self.last_printed = None;
        self.mark_dirty();
    }

    /// DECALN: fill the screen with 'E', reset margins, home the cursor.
    pub fn alignment_test(&mut self) {
        self.margins = Margins::full(self.width, self.height);
        let grid = match self.active {
            ActiveGrid::Primary => &mut self.primary,
            ActiveGrid::Alternate => &mut self.alt,
        };
        for line in grid {
            line.wrapped = false;
            for cell in &mut line.cells {
                cell.write('E', 1, Style::default());
            }
        }
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.pending_wrap = false;
        self.mark_dirty();
    }

    // ── Resize ──────────────────────────────────────────────────────

    /// Resize both grids to the new dimensions.
    ///
    /// The primary grid reflows: shrinking re-wraps long lines onto
    /// continuation rows, growing merges soft-wrapped chains back together.
    /// The alternate grid is reallocated blank. Margins reset to the full
    /// screen and the pending-wrap latch clears.
    pub fn resize(&mut self, new_width: u16, new_height: u16) {
        let new_width = new_width.max(1);
        let new_height = new_height.max(1);
        if new_width == self.width && new_height == self.height {
            return;
        }

        // Reflow the primary grid, tracking whichever cursor lives on it.
        let mut primary_cursor = if self.is_alt() {
            (self.saved_primary.cursor.row, self.saved_primary.cursor.col)
        } else {
            (self.cursor.row, self.cursor.col)
        };
        self.primary = reflow(
            std::mem::take(&mut self.primary),
            self.width,
            new_width,
            new_height,
            &mut primary_cursor,
            &mut self.scrollback,
            self.max_scrollback,
        );
        if self.is_alt() {
            self.saved_primary.cursor.row = primary_cursor.0;
            self.saved_primary.cursor.col = primary_cursor.1;
        } else {
            self.cursor.row = primary_cursor.0;
            self.cursor.col = primary_cursor.1;
        }

        self.alt = blank_grid(new_width, new_height);
        if self.is_alt() {
            self.cursor.row = self.cursor.row.min(new_height - 1);
            self.cursor.col = self.cursor.col.min(new_width.saturating_sub(1));
        }

        // Custom stops survive; defaults extend into any new columns.
        let old_width = self.width;
        self.tab_stops.retain(|&c| c < new_width);
        if new_width > old_width {
            let mut c = old_width - old_width % 8;
            while c < new_width {
                if c >= old_width && c % 8 == 0 && c > 0 {
                    self.tab_stops.insert(c);
                }
                c += 8 - c % 8;
            }
        }

        self.width = new_width;
        self.height = new_height;
        self.margins = Margins::full(new_width, new_height);
        self.pending_wrap = false;
        self.mark_dirty();
    }
}

fn blank_grid(width: u16, height: u16) -> Vec<Line> {
    (0..height).map(|_| Line::blank(width)).collect()
}

fn default_tab_stops(width: u16) -> BTreeSet<u16> {
    (8..width).step_by(8).collect()
}

/// Re-wrap a grid's lines at a new width and fit them to a new height.
///
/// Soft-wrap chains (runs of lines whose successors carry `wrapped`) are
/// merged into logical lines, re-split at `new_width` (never through a wide
/// pair), and laid back out. Excess top rows go to `scrollback`; missing
/// rows are blank-filled at the bottom. `cursor` is updated in place to
/// follow its cell.
fn reflow(
    lines: Vec<Line>,
    old_width: u16,
    new_width: u16,
    new_height: u16,
    cursor: &mut (u16, u16),
    scrollback: &mut VecDeque<Line>,
    max_scrollback: usize,
) -> Vec<Line> {
    let (cur_row, cur_col) = *cursor;

    // Merge soft-wrap chains into logical cell runs, remembering which
    // logical cell the cursor sits on.
    let mut chains: Vec<Vec<Cell>> = Vec::new();
    let mut cursor_chain = 0usize;
    let mut cursor_offset = 0usize;
    for (row, line) in lines.iter().enumerate() {
        let continues = lines.get(row + 1).is_some_and(|next| next.wrapped);
        if !line.wrapped || chains.is_empty() {
            chains.push(Vec::new());
        }
        let chain_idx = chains.len() - 1;
        let chain = chains.last_mut().expect("chain exists");
        if row == cur_row as usize {
            cursor_chain = chain_idx;
            cursor_offset = chain.len() + (cur_col as usize).min(old_width as usize);
        }
        let take = if continues {
            old_width as usize
        } else {
            line.content_len()
        };
        chain.extend_from_slice(&line.cells[..take.min(line.cells.len())]);
    }
    if chains.is_empty() {
        chains.push(Vec::new());
    }

    // Re-split every chain at the new width.
    let mut out: Vec<Line> = Vec::new();
    let mut new_cursor = (0u16, 0u16);
    for (ci, chain) in chains.iter().enumerate() {
        let first_row = out.len();
        let mut row_cells: Vec<Cell> = Vec::with_capacity(new_width as usize);
        let mut wrapped = false;
        let flush =
            |row_cells: &mut Vec<Cell>, wrapped: bool, out: &mut Vec<Line>| {
                let mut cells = std::mem::take(row_cells);
                cells.resize(new_width as usize, Cell::default());
                out.push(Line { cells, wrapped });
            };
        for (i, cell) in chain.iter().enumerate() {
            // A wide head that would land on the last column moves whole
            // to the next row.
            if cell.is_wide() && row_cells.len() + 1 >= new_width as usize {
                flush(&mut row_cells, wrapped, &mut out);
                wrapped = true;
            }
            if ci == cursor_chain && i == cursor_offset {
                new_cursor = (out.len() as u16, row_cells.len() as u16);
            }
            row_cells.push(*cell);
            if row_cells.len() == new_width as usize {
                flush(&mut row_cells, wrapped, &mut out);
                wrapped = true;
            }
        }
        if ci == cursor_chain && cursor_offset >= chain.len() {
            let col = (cursor_offset - chain.len() + row_cells.len()).min(new_width as usize);
            new_cursor = (out.len() as u16, col as u16);
        }
        if !row_cells.is_empty() || out.len() == first_row {
            flush(&mut row_cells, wrapped, &mut out);
        }
    }

    // Fit to height: overflow pushes history from the top (never past the
    // cursor row), then truncates from the bottom.
    if out.len() > new_height as usize {
        let excess = out.len() - new_height as usize;
        let push = excess.min(new_cursor.0 as usize);
        for line in out.drain(..push) {
            scrollback.push_back(line);
        }
        while scrollback.len() > max_scrollback {
            scrollback.pop_front();
        }
        new_cursor.0 -= push as u16;
        out.truncate(new_height as usize);
    } else {
        while out.len() < new_height as usize {
            out.push(Line::blank(new_width));
        }
    }

    new_cursor.0 = new_cursor.0.min(new_height - 1);
    new_cursor.1 = new_cursor.1.min(new_width.saturating_sub(1));
    *cursor = new_cursor;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Color;

    fn print_str(screen: &mut Screen, s: &str) {
        for ch in s.chars() {
            screen.print(ch, Cell::display_width(ch));
        }
    }

    fn assert_invariants(screen: &Screen) {
        assert!(screen.cursor.row < screen.height());
        assert!(screen.cursor.col <= screen.width());
        assert!(screen.margins.top < screen.margins.bottom || screen.height() == 1);
        assert!(screen.margins.bottom < screen.height());
        for row in 0..screen.height() {
            assert_eq!(
                screen.line(row).map(Line::len),
                Some(screen.width() as usize)
            );
        }
    }

    // ── Printing & wrap ────────────────────────────────────────────

    #[test]
    fn plain_text_advances_cursor() {
        let mut s = Screen::new(80, 24);
        print_str(&mut s, "Hello");
        assert_eq!(s.row_text(0), "Hello");
        assert_eq!((s.cursor.row, s.cursor.col), (0, 5));
        assert_invariants(&s);
    }

    #[test]
    fn print_at_margin_latches_then_wraps() {
        let mut s = Screen::new(5, 2);
        print_str(&mut s, "abcde");
        assert_eq!(s.row_text(0), "abcde");
        assert!(s.pending_wrap);
        assert_eq!(s.cursor.col, 5);

        print_str(&mut s, "f");
        assert_eq!(s.row_text(1), "f");
        assert_eq!((s.cursor.row, s.cursor.col), (1, 1));
        assert!(!s.line(0).unwrap().wrapped);
        assert!(s.line(1).unwrap().wrapped);
        assert!(!s.pending_wrap);
        assert_invariants(&s);
    }

    #[test]
    fn autowrap_off_overwrites_last_cell() {
        let mut s = Screen::new(5, 2);
        s.modes.remove(Modes::DECAWM);
        print_str(&mut s, "abcdefg");
        assert_eq!(s.row_text(0), "abcdg");
        assert_eq!((s.cursor.row, s.cursor.col), (0, 4));
        assert!(!s.pending_wrap);
    }

    #[test]
    fn wide_rune_occupies_two_cells() {
        let mut s = Screen::new(10, 2);
        print_str(&mut s, "中");
        assert_eq!(s.cursor.col, 2);
        let line = s.line(0).unwrap();
        assert_eq!(line.cells[0].rune(), '中');
        assert!(line.cells[0].is_wide());
        assert!(line.cells[1].is_continuation());
        assert_eq!(line.cells[1].style, line.cells[0].style);
    }

    #[test]
    fn wide_rune_at_margin_wraps_whole() {
        let mut s = Screen::new(5, 2);
        print_str(&mut s, "abcd中");
        assert_eq!(s.row_text(0), "abcd");
        assert_eq!(s.row_text(1), "中");
        assert!(s.line(1).unwrap().wrapped);
    }

    #[test]
    fn narrow_overwrite_of_wide_head_blanks_continuation() {
        let mut s = Screen::new(10, 2);
        print_str(&mut s, "中");
        s.move_to(0, 0);
        print_str(&mut s, "x");
        let line = s.line(0).unwrap();
        assert_eq!(line.cells[0].rune(), 'x');
        assert!(!line.cells[1].is_continuation());
    }

    #[test]
    fn overwrite_of_continuation_blanks_head() {
        let mut s = Screen::new(10, 2);
        print_str(&mut s, "中");
        s.move_to(0, 1);
        print_str(&mut s, "x");
        let line = s.line(0).unwrap();
        assert_eq!(line.cells[0].rune(), ' ');
        assert_eq!(line.cells[1].rune(), 'x');
    }

    #[test]
    fn insert_mode_shifts_right() {
        let mut s = Screen::new(5, 1);
        print_str(&mut s, "abc");
        s.modes.insert(Modes::IRM);
        s.move_to(0, 0);
        print_str(&mut s, "X");
        assert_eq!(s.row_text(0), "Xabc");
    }

    #[test]
    fn repeat_last_reprints() {
        let mut s = Screen::new(10, 1);
        print_str(&mut s, "a");
        s.repeat_last(3);
        assert_eq!(s.row_text(0), "aaaa");
    }

    // ── Cursor movement ────────────────────────────────────────────

    #[test]
    fn relative_moves_stop_at_margins() {
        let mut s = Screen::new(10, 10);
        s.set_margins(2, 7);
        s.move_to(4, 0);
        s.move_rel(-10, 0);
        assert_eq!(s.cursor.row, 2);
        s.move_rel(20, 0);
        assert_eq!(s.cursor.row, 7);
    }

    #[test]
    fn origin_mode_addresses_relative_to_region() {
        let mut s = Screen::new(10, 10);
        s.set_margins(2, 7);
        s.modes.insert(Modes::DECOM);
        s.move_to(0, 0);
        assert_eq!((s.cursor.row, s.cursor.col), (2, 0));
        s.move_to(50, 0);
        assert_eq!(s.cursor.row, 7);
    }

    #[test]
    fn backspace_wraps_onto_soft_wrapped_line() {
        let mut s = Screen::new(5, 2);
        print_str(&mut s, "abcdef");
        assert_eq!((s.cursor.row, s.cursor.col), (1, 1));
        s.backspace();
        s.backspace();
        assert_eq!((s.cursor.row, s.cursor.col), (0, 4));
        // Row 0 was not wrapped onto; backspace stops at the left margin.
        s.move_to(0, 0);
        s.backspace();
        assert_eq!((s.cursor.row, s.cursor.col), (0, 0));
    }

    #[test]
    fn tab_moves_cursor_without_writing() {
        let mut s = Screen::new(20, 1);
        print_str(&mut s, "AB");
        s.tab();
        assert_eq!(s.cursor.col, 8);
        assert_eq!(s.row_text(0), "AB");
        s.tab();
        assert_eq!(s.cursor.col, 16);
        s.tab();
        assert_eq!(s.cursor.col, 19); // line end, no more stops
    }

    #[test]
    fn custom_tab_stops() {
        let mut s = Screen::new(20, 1);
        s.clear_all_tab_stops();
        s.move_to(0, 3);
        s.set_tab_stop();
        s.move_to(0, 0);
        s.tab();
        assert_eq!(s.cursor.col, 3);
        s.back_tab(1);
        assert_eq!(s.cursor.col, 0);
    }

    // ── Scrolling ──────────────────────────────────────────────────

    #[test]
    fn linefeed_at_bottom_scrolls_into_history() {
        let mut s = Screen::new(10, 3);
        print_str(&mut s, "AAA");
        s.carriage_return();
        s.linefeed();
        print_str(&mut s, "BBB");
        s.carriage_return();
        s.linefeed();
        print_str(&mut s, "CCC");
        s.carriage_return();
        s.linefeed();
        print_str(&mut s, "DDD");
        assert_eq!(s.row_text(0), "BBB");
        assert_eq!(s.row_text(2), "DDD");
        assert_eq!(s.scrollback_len(), 1);
        assert_eq!(s.scrollback_line(0).unwrap().text(), "AAA");
    }

    #[test]
    fn alt_grid_discards_history() {
        let mut s = Screen::new(10, 2);
        s.enter_alt(true);
        for _ in 0..5 {
            s.linefeed();
        }
        assert_eq!(s.scrollback_len(), 0);
    }

    #[test]
    fn region_scroll_confines_to_margins() {
        let mut s = Screen::new(10, 4);
        for (i, t) in ["1", "2", "3", "4"].iter().enumerate() {
            s.move_to(i as u16, 0);
            print_str(&mut s, t);
        }
        s.set_margins(1, 2);
        s.move_to(1, 0);
        s.insert_lines(1);
        assert_eq!(s.row_text(0), "1");
        assert_eq!(s.row_text(1), "");
        assert_eq!(s.row_text(2), "2");
        assert_eq!(s.row_text(3), "4");
    }

    #[test]
    fn reverse_index_at_top_scrolls_down() {
        let mut s = Screen::new(10, 3);
        print_str(&mut s, "top");
        s.move_to(0, 0);
        s.reverse_index();
        assert_eq!(s.row_text(0), "");
        assert_eq!(s.row_text(1), "top");
    }

    #[test]
    fn explicit_scroll_up_skips_history() {
        let mut s = Screen::new(10, 3);
        print_str(&mut s, "gone");
        s.scroll_up(1, false);
        assert_eq!(s.scrollback_len(), 0);
        assert_eq!(s.row_text(0), "");
    }

    // ── Erase ──────────────────────────────────────────────────────

    #[test]
    fn erase_line_variants() {
        let mut s = Screen::new(5, 2);
        print_str(&mut s, "hello");
        s.move_to(0, 2);
        s.erase_line(1);
        assert_eq!(s.row_text(0), "   lo");

        let mut s = Screen::new(5, 2);
        print_str(&mut s, "hello");
        s.move_to(0, 2);
        s.erase_line(0);
        assert_eq!(s.row_text(0), "he");
    }

    #[test]
    fn erase_uses_current_background() {
        let mut s = Screen::new(5, 1);
        print_str(&mut s, "abc");
        s.cursor.style.bg = Color::Indexed(4);
        s.move_to(0, 0);
        s.erase_line(2);
        assert_eq!(s.line(0).unwrap().cells[0].style.bg, Color::Indexed(4));
    }

    #[test]
    fn erase_display_with_scrollback() {
        let mut s = Screen::new(5, 2);
        print_str(&mut s, "abcde");
        s.linefeed();
        s.linefeed();
        assert!(s.scrollback_len() > 0);
        s.erase_display(3);
        assert_eq!(s.scrollback_len(), 0);
        assert_eq!(s.text().trim(), "");
    }

    #[test]
    fn delete_chars_pulls_tail_left() {
        let mut s = Screen::new(8, 1);
        print_str(&mut s, "abcdef");
        s.move_to(0, 1);
        s.delete_chars(2);
        assert_eq!(s.row_text(0), "adef");
    }

    #[test]
    fn insert_chars_pushes_tail_off() {
        let mut s = Screen::new(5, 1);
        print_str(&mut s, "abcde");
        s.move_to(0, 1);
        s.insert_chars(2);
        assert_eq!(s.row_text(0), "a  bc");
    }

    // ── Save/restore & grids ───────────────────────────────────────

    #[test]
    fn save_restore_roundtrip() {
        let mut s = Screen::new(20, 10);
        s.move_to(4, 9);
        s.cursor.style.fg = Color::Indexed(1);
        s.modes.insert(Modes::DECOM);
        s.save_cursor();

        s.move_to(0, 0);
        s.cursor.style = Style::default();
        s.modes.remove(Modes::DECOM);
        s.restore_cursor();

        assert_eq!((s.cursor.row, s.cursor.col), (4, 9));
        assert_eq!(s.cursor.style.fg, Color::Indexed(1));
        assert!(s.modes.contains(Modes::DECOM));
    }

    #[test]
    fn save_state_is_per_grid() {
        let mut s = Screen::new(20, 10);
        s.move_to(3, 3);
        s.save_cursor();
        s.enter_alt(true);
        s.move_to(7, 7);
        s.save_cursor();
        s.move_to(0, 0);
        s.restore_cursor();
        assert_eq!((s.cursor.row, s.cursor.col), (7, 7));
        s.exit_alt();
        s.restore_cursor();
        assert_eq!((s.cursor.row, s.cursor.col), (3, 3));
    }

    #[test]
    fn alt_grid_preserves_primary_contents() {
        let mut s = Screen::new(10, 2);
        print_str(&mut s, "main");
        s.enter_alt(true);
        assert_eq!(s.row_text(0), "");
        print_str(&mut s, "alt");
        s.exit_alt();
        assert_eq!(s.row_text(0), "main");
    }

    // ── Resets ─────────────────────────────────────────────────────

    #[test]
    fn soft_reset_keeps_grid_contents() {
        let mut s = Screen::new(10, 4);
        print_str(&mut s, "keep");
        s.set_margins(1, 2);
        s.modes.insert(Modes::IRM);
        s.soft_reset();
        assert_eq!(s.row_text(0), "keep");
        assert_eq!(s.margins, Margins::full(10, 4));
        assert!(!s.modes.contains(Modes::IRM));
    }

    #[test]
    fn full_reset_clears_everything() {
        let mut s = Screen::new(10, 2);
        print_str(&mut s, "bye");
        s.enter_alt(false);
        s.full_reset();
        assert!(!s.is_alt());
        assert_eq!(s.text().trim(), "");
        assert_eq!((s.cursor.row, s.cursor.col), (0, 0));
        assert!(s.cursor_visible());
    }

    #[test]
    fn alignment_test_fills_with_e() {
        let mut s = Screen::new(3, 2);
        s.alignment_test();
        assert_eq!(s.row_text(0), "EEE");
        assert_eq!(s.row_text(1), "EEE");
        assert_eq!((s.cursor.row, s.cursor.col), (0, 0));
    }

    // ── Dirty tracking ─────────────────────────────────────────────

    #[test]
    fn dirty_flags_are_monotone_until_cleared() {
        let mut s = Screen::new(5, 1);
        assert!(!s.redraw_needed());
        print_str(&mut s, "x");
        assert!(s.redraw_needed());
        assert!(s.line(0).unwrap().cells[0].dirty);
        s.clear_dirty();
        assert!(!s.redraw_needed());
        assert!(!s.line(0).unwrap().cells[0].dirty);
    }

    // ── Resize & reflow ────────────────────────────────────────────

    #[test]
    fn shrink_width_rewraps_long_lines() {
        let mut s = Screen::new(6, 3);
        print_str(&mut s, "abcdef");
        s.resize(4, 3);
        assert_eq!(s.row_text(0), "abcd");
        assert_eq!(s.row_text(1), "ef");
        assert!(s.line(1).unwrap().wrapped);
        assert_invariants(&s);
    }

    #[test]
    fn grow_width_merges_wrapped_chains() {
        let mut s = Screen::new(5, 3);
        print_str(&mut s, "abcdefg");
        assert_eq!(s.row_text(1), "fg");
        s.resize(10, 3);
        assert_eq!(s.row_text(0), "abcdefg");
        assert_eq!(s.row_text(1), "");
        assert_invariants(&s);
    }

    #[test]
    fn reflow_keeps_cursor_on_its_cell() {
        let mut s = Screen::new(6, 3);
        print_str(&mut s, "abcdef");
        s.move_to(0, 5); // on 'f'
        s.resize(4, 3);
        assert_eq!((s.cursor.row, s.cursor.col), (1, 1));
    }

    #[test]
    fn reflow_never_splits_wide_pairs() {
        let mut s = Screen::new(6, 3);
        print_str(&mut s, "abc中");
        s.resize(4, 3);
        assert_eq!(s.row_text(0), "abc");
        assert_eq!(s.row_text(1), "中");
    }

    #[test]
    fn shrink_height_pushes_history() {
        let mut s = Screen::new(5, 4);
        for (i, t) in ["a", "b", "c", "d"].iter().enumerate() {
            s.move_to(i as u16, 0);
            print_str(&mut s, t);
        }
        s.resize(5, 2);
        assert_eq!(s.row_text(0), "c");
        assert_eq!(s.row_text(1), "d");
        assert_eq!(s.scrollback_len(), 2);
        assert_invariants(&s);
    }

    #[test]
    fn alt_resize_clears_without_reflow() {
        let mut s = Screen::new(10, 3);
        s.enter_alt(true);
        print_str(&mut s, "altaltalt!");
        s.resize(6, 3);
        assert_eq!(s.text().trim(), "");
        assert_invariants(&s);
    }

    #[test]
    fn resize_is_noop_for_same_size() {
        let mut s = Screen::new(10, 3);
        print_str(&mut s, "stay");
        s.resize(10, 3);
        assert_eq!(s.row_text(0), "stay");
    }
}
