//! The host-supplied drawing target.

use termweave_core::Style;

/// Where the terminal paints cells.
///
/// Implemented by the host over whatever it renders with; the terminal
/// calls [`Surface::set_content`] once per visible cell during a draw pass,
/// skipping wide-character continuation columns.
pub trait Surface {
    /// Current size in (columns, rows).
    fn size(&self) -> (u16, u16);

    /// Place one rune with its style at the given cell.
    fn set_content(&mut self, col: u16, row: u16, ch: char, style: &Style);
}
