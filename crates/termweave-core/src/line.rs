//! A single row of the terminal grid.

use crate::cell::{Cell, Color};

/// One grid row: a run of cells plus the soft-wrap flag.
///
/// `wrapped` marks that this line is a continuation of the previous one:
/// the cursor flowed onto it via autowrap rather than an explicit line feed.
/// Resize reflow and backspace-across-lines both key off it.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub cells: Vec<Cell>,
    pub wrapped: bool,
}

impl Line {
    /// A blank, unwrapped line of `width` cells.
    pub fn blank(width: u16) -> Self {
        Self {
            cells: vec![Cell::default(); width as usize],
            wrapped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells up to and including the last written one.
    ///
    /// Trailing never-written cells do not count; erased cells (blanked by
    /// ED/EL) do. Used by reflow to decide how much of a line carries over.
    pub fn content_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| !c.is_empty())
            .map_or(0, |i| i + 1)
    }

    /// Erase every cell to a blank with the given background.
    pub fn erase(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    /// Reset every cell to the never-written state.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
        self.wrapped = false;
    }

    /// Grow or shrink to `width` cells, filling with blanks.
    pub fn resize(&mut self, width: u16) {
        self.cells.resize(width as usize, Cell::default());
    }

    /// The row's text with trailing blanks trimmed, continuations skipped.
    pub fn text(&self) -> String {
        let s: String = self
            .cells
            .iter()
            .filter(|c| !c.is_continuation())
            .map(Cell::rune)
            .collect();
        s.trim_end().to_string()
    }
}
