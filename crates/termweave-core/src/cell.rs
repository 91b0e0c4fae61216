//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores one base rune plus the SGR attributes it was printed
//! with. A rune of `'\0'` means the cell has never been written; it renders
//! as a space. Wide characters occupy a leading cell (width 2) followed by a
//! zero-width continuation cell carrying the same style.

use bitflags::bitflags;
use std::collections::HashMap;
use unicode_width::UnicodeWidthChar;

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u16 {
        const BOLD          = 1 << 0;
        const DIM           = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const BLINK         = 1 << 4;
        const REVERSE       = 1 << 5;
        const HIDDEN        = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// Color representation for terminal cells.
///
/// `Indexed` covers both the 16 named colors (0-15) and the 256-color
/// palette; `Rgb` is 24-bit truecolor from SGR 38;2 / 48;2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Palette index (0-255).
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// Identifier of an interned OSC 8 hyperlink. Zero means "no link".
pub type LinkId = u16;

/// SGR attributes for a cell: flags, colors, and an optional hyperlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub flags: StyleFlags,
    pub fg: Color,
    pub bg: Color,
    /// Interned OSC 8 hyperlink (0 = none).
    pub link: LinkId,
}

impl Style {
    /// Reset all attributes to default (SGR 0). The hyperlink is kept: OSC 8
    /// state is orthogonal to SGR and only cleared by an empty-URI OSC 8.
    pub fn reset_sgr(&mut self) {
        let link = self.link;
        *self = Self {
            link,
            ..Self::default()
        };
    }
}

/// An OSC 8 hyperlink: URI plus the optional explicit `id=` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub uri: String,
    /// Explicit `id=` parameter, empty when the sequence carried none.
    pub id: String,
}

/// Interning registry for OSC 8 hyperlinks.
///
/// Cells store a compact [`LinkId`] instead of the URI string. Links live
/// until the registry is cleared by a full reset; the id space is capped at
/// `u16::MAX`, after which new links degrade to "no link".
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    links: Vec<Link>,
    lookup: HashMap<Link, LinkId>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a link and return its id. An empty URI returns 0.
    pub fn intern(&mut self, uri: &str, id: &str) -> LinkId {
        if uri.is_empty() {
            return 0;
        }
        let link = Link {
            uri: uri.to_string(),
            id: id.to_string(),
        };
        if let Some(&found) = self.lookup.get(&link) {
            return found;
        }
        let next = self.links.len() + 1;
        if next > LinkId::MAX as usize {
            return 0;
        }
        self.links.push(link.clone());
        self.lookup.insert(link, next as LinkId);
        next as LinkId
    }

    /// Look up a link by id.
    pub fn get(&self, id: LinkId) -> Option<&Link> {
        if id == 0 {
            return None;
        }
        self.links.get(id as usize - 1)
    }

    /// Drop every interned link.
    pub fn clear(&mut self) {
        self.links.clear();
        self.lookup.clear();
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Base rune. `'\0'` means the cell was never written.
    ch: char,
    /// Display width in columns: 0 for a wide-char continuation, else 1 or 2.
    width: u8,
    /// Attributes the rune was printed with.
    pub style: Style,
    /// Set on every content or style change; cleared by a host draw pass.
    pub dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: '\0',
            width: 1,
            style: Style::default(),
            dirty: false,
        }
    }
}

impl Cell {
    /// The rune as the host should render it (`'\0'` becomes a space).
    pub fn rune(&self) -> char {
        if self.ch == '\0' { ' ' } else { self.ch }
    }

    /// The raw content rune, `'\0'` when empty.
    pub fn content(&self) -> char {
        self.ch
    }

    /// Display width in terminal columns.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Whether this cell holds the leading half of a wide character.
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Whether this cell is the trailing continuation of a wide character.
    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Whether the cell has never been written to.
    pub fn is_empty(&self) -> bool {
        self.ch == '\0'
    }

    /// Write a rune with the given width and style.
    pub fn write(&mut self, ch: char, width: u8, style: Style) {
        self.ch = ch;
        self.width = width;
        self.style = style;
        self.dirty = true;
    }

    /// Mark this cell as the continuation of a wide character. It carries
    /// the same style as its leading cell and has zero width.
    pub fn write_continuation(&mut self, style: Style) {
        self.ch = ' ';
        self.width = 0;
        self.style = style;
        self.dirty = true;
    }

    /// Erase to a blank space carrying the given background color.
    ///
    /// Used by ED/EL/ECH and the scroll fills, which blank with the current
    /// background (BCE) but reset all other attributes.
    pub fn erase(&mut self, bg: Color) {
        self.ch = ' ';
        self.width = 1;
        self.style = Style {
            bg,
            ..Style::default()
        };
        self.dirty = true;
    }

    /// Reset to the never-written state.
    pub fn reset(&mut self) {
        *self = Self {
            dirty: true,
            ..Self::default()
        };
    }

    /// Display width of a rune in terminal columns.
    ///
    /// 0 for zero-width marks, 2 for East-Asian wide/fullwidth, else 1.
    pub fn display_width(ch: char) -> u8 {
        UnicodeWidthChar::width(ch).unwrap_or(0) as u8
    }
}
