#![forbid(unsafe_code)]

//! Host-agnostic VT/ANSI terminal model.
//!
//! `termweave-core` is the platform-independent heart of termweave. It owns
//! the cell grid, the escape-sequence parser, and the interpreter that
//! applies parsed sequences to the screen, all without any I/O.
//!
//! # Primary responsibilities
//!
//! - **Cell & Line**: rune + style + width value types, soft-wrap flags.
//! - **Parser**: the DEC escape-sequence state machine, byte stream in,
//!   typed [`Sequence`] values out.
//! - **Screen**: dual grids (primary with scrollback, alternate without),
//!   cursor, scrolling margins, modes, tab stops, charsets.
//! - **Interpreter**: C0/ESC/CSI/OSC/DCS dispatch onto the screen, with
//!   replies and host notifications surfaced as [`Effect`] values.
//! - **Selection**: copy extraction over the screen plus its scrollback.
//!
//! # Design principles
//!
//! - **No I/O**: bytes come from the host adapter (`termweave-pty`), and
//!   everything that must leave the model comes back as data.
//! - **Total on adversarial input**: the parser and interpreter never
//!   panic and never error; malformed input is dropped or prints U+FFFD.

pub mod cell;
pub mod charset;
pub mod interpreter;
pub mod line;
pub mod mode;
pub mod parser;
pub mod screen;
pub mod selection;
pub mod sgr;

pub use cell::{Cell, Color, Link, LinkId, LinkRegistry, Style, StyleFlags};
pub use charset::{Charset, CharsetTable};
pub use interpreter::{Effect, Interpreter};
pub use line::Line;
pub use mode::{Modes, MouseEncoding, MouseMode};
pub use parser::{
    CsiParam, CsiParams, Parser, Sequence, SequenceReader, MAX_CSI_PARAMS, MAX_STRING_PAYLOAD,
};
pub use screen::{
    ActiveGrid, Cursor, CursorShape, Margins, SavedCursor, Screen, SixelImage,
    DEFAULT_SCROLLBACK,
};
pub use selection::{BufferPos, Selection};
pub use sgr::apply_sgr;
