//! Host input encoding: key, paste, and mouse events to PTY byte sequences.
//!
//! The key tables are the xterm-style defaults a terminfo entry would
//! provide; hosts with different capability tables can supply their own
//! [`KeyTable`]. Mouse encoding follows the tracking level and extension
//! mode negotiated by the child (see [`MouseMode`] / [`MouseEncoding`]).

use bitflags::bitflags;

use termweave_core::{Modes, MouseEncoding, MouseMode, Screen};

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

/// A logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function key F1-F12.
    F(u8),
}

/// A key press delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            mods: KeyModifiers::empty(),
        }
    }

    pub fn with_mods(key: Key, mods: KeyModifiers) -> Self {
        Self { key, mods }
    }
}

/// Mouse buttons, in xterm encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    fn index(self) -> u16 {
        match self {
            Self::Left => 0,
            Self::Middle => 1,
            Self::Right => 2,
        }
    }
}

/// What a mouse event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    /// Motion with a button held.
    Drag(MouseButton),
    /// Motion with no button held.
    Moved,
    ScrollUp,
    ScrollDown,
}

/// A mouse event delivered by the host, cell coordinates 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub col: u16,
    pub row: u16,
    pub mods: KeyModifiers,
}

/// Any input event the host can forward to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseEvent),
}

/// Byte sequences for named keys, read-only configuration in the shape a
/// terminfo entry would provide.
///
/// Arrow keys have two encodings: normal (`CSI A`) and application cursor
/// key mode (`SS3 A`, DECCKM).
#[derive(Debug, Clone)]
pub struct KeyTable {
    pub enter: &'static str,
    pub backspace: &'static str,
    pub tab: &'static str,
    pub escape: &'static str,
    pub up: &'static str,
    pub down: &'static str,
    pub right: &'static str,
    pub left: &'static str,
    pub up_app: &'static str,
    pub down_app: &'static str,
    pub right_app: &'static str,
    pub left_app: &'static str,
    pub home: &'static str,
    pub end: &'static str,
    pub page_up: &'static str,
    pub page_down: &'static str,
    pub insert: &'static str,
    pub delete: &'static str,
    pub function: [&'static str; 12],
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            enter: "\r",
            backspace: "\x7f",
            tab: "\t",
            escape: "\x1b",
            up: "\x1b[A",
            down: "\x1b[B",
            right: "\x1b[C",
            left: "\x1b[D",
            up_app: "\x1bOA",
            down_app: "\x1bOB",
            right_app: "\x1bOC",
            left_app: "\x1bOD",
            home: "\x1b[1~",
            end: "\x1b[4~",
            page_up: "\x1b[5~",
            page_down: "\x1b[6~",
            insert: "\x1b[2~",
            delete: "\x1b[3~",
            function: [
                "\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS", "\x1b[15~", "\x1b[17~", "\x1b[18~",
                "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~",
            ],
        }
    }
}

impl KeyTable {
    /// Encode a key event given the current terminal modes.
    ///
    /// Ctrl folds printable ASCII into 0x00-0x1F, Alt prefixes ESC, and
    /// modified arrows use the `CSI 1;m X` form.
    pub fn encode(&self, event: KeyEvent, modes: Modes) -> Vec<u8> {
        if event.mods.contains(KeyModifiers::CTRL) {
            return self.encode_ctrl(event, modes);
        }
        if event.mods.contains(KeyModifiers::ALT) {
            return self.encode_alt(event, modes);
        }
        self.encode_plain(event.key, modes)
    }

    fn encode_plain(&self, key: Key, modes: Modes) -> Vec<u8> {
        let app = modes.contains(Modes::DECCKM);
        let s: &str = match key {
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                return c.encode_utf8(&mut buf).as_bytes().to_vec();
            }
            Key::Enter => self.enter,
            Key::Backspace => self.backspace,
            Key::Tab => self.tab,
            Key::Escape => self.escape,
            Key::Up => {
                if app {
                    self.up_app
                } else {
                    self.up
                }
            }
            Key::Down => {
                if app {
                    self.down_app
                } else {
                    self.down
                }
            }
            Key::Right => {
                if app {
                    self.right_app
                } else {
                    self.right
                }
            }
            Key::Left => {
                if app {
                    self.left_app
                } else {
                    self.left
                }
            }
            Key::Home => self.home,
            Key::End => self.end,
            Key::PageUp => self.page_up,
            Key::PageDown => self.page_down,
            Key::Insert => self.insert,
            Key::Delete => self.delete,
            Key::F(n) => self
                .function
                .get(n.saturating_sub(1) as usize)
                .copied()
                .unwrap_or(""),
        };
        s.as_bytes().to_vec()
    }

    fn encode_ctrl(&self, event: KeyEvent, modes: Modes) -> Vec<u8> {
        if let Some(seq) = modified_arrow(event.key, 5) {
            return seq;
        }
        if let Key::Char(c) = event.key {
            if let Some(byte) = ctrl_fold(c) {
                return vec![byte];
            }
        }
        self.encode_plain(event.key, modes)
    }

    fn encode_alt(&self, event: KeyEvent, modes: Modes) -> Vec<u8> {
        if let Some(seq) = modified_arrow(event.key, 3) {
            return seq;
        }
        let mut out = vec![0x1b];
        out.extend(self.encode_plain(event.key, modes));
        out
    }
}

/// `CSI 1 ; m {A-D}` for modified arrow keys; modifier 3 = Alt, 5 = Ctrl.
fn modified_arrow(key: Key, modifier: u8) -> Option<Vec<u8>> {
    let dir = match key {
        Key::Up => b'A',
        Key::Down => b'B',
        Key::Right => b'C',
        Key::Left => b'D',
        _ => return None,
    };
    Some(format!("\x1b[1;{modifier}{}", dir as char).into_bytes())
}

/// Fold a printable rune with Ctrl held into its control byte:
/// `Ctrl-@` = 0x00, `Ctrl-a` = 0x01, ... plus the punctuation aliases.
fn ctrl_fold(c: char) -> Option<u8> {
    match c {
        '@' | '`' | ' ' => Some(0x00),
        'a'..='z' => Some(c as u8 - b'a' + 1),
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        '[' | '{' => Some(0x1b),
        '\\' | '|' => Some(0x1c),
        ']' | '}' => Some(0x1d),
        '^' | '~' => Some(0x1e),
        '_' => Some(0x1f),
        '?' => Some(0x7f),
        _ => None,
    }
}

/// Wrap pasted text in bracketed-paste markers when mode 2004 is on,
/// otherwise pass it through unchanged.
pub fn encode_paste(text: &str, modes: Modes) -> Vec<u8> {
    if modes.contains(Modes::PASTE) {
        let mut out = b"\x1b[200~".to_vec();
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(b"\x1b[201~");
        out
    } else {
        text.as_bytes().to_vec()
    }
}

/// Encode a mouse event for the child, or `None` when the current tracking
/// level does not report it.
///
/// `screen` supplies the tracking level and encoding. The caller tracks no
/// state: drag vs. motion is already distinguished by the event kind.
pub fn encode_mouse(event: MouseEvent, screen: &Screen) -> Option<Vec<u8>> {
    let mode = screen.mouse_mode;
    let encoding = screen.mouse_encoding;
    if mode == MouseMode::None {
        return None;
    }

    // Filter by tracking level.
    match event.kind {
        MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {}
        MouseEventKind::Up(_) => {
            if mode == MouseMode::X10 {
                return None;
            }
        }
        MouseEventKind::Drag(_) => {
            if mode < MouseMode::ButtonEvent {
                return None;
            }
        }
        MouseEventKind::Moved => {
            if mode < MouseMode::AnyEvent {
                return None;
            }
        }
    }

    let mods = if mode == MouseMode::X10 {
        0
    } else {
        let mut m = 0;
        if event.mods.contains(KeyModifiers::SHIFT) {
            m += 4;
        }
        if event.mods.contains(KeyModifiers::ALT) {
            m += 8;
        }
        if event.mods.contains(KeyModifiers::CTRL) {
            m += 16;
        }
        m
    };

    let button_bits = |kind: MouseEventKind| -> u16 {
        match kind {
            MouseEventKind::Down(b) | MouseEventKind::Up(b) => b.index(),
            MouseEventKind::Drag(b) => b.index() + 32,
            MouseEventKind::Moved => 3 + 32,
            MouseEventKind::ScrollUp => 64,
            MouseEventKind::ScrollDown => 65,
        }
    };

    let col = event.col;
    let row = event.row;

    match encoding {
        MouseEncoding::Sgr => {
            // Press/drag/motion use a capital `M`; release a lowercase `m`
            // with the bare button index.
            match event.kind {
                MouseEventKind::Up(button) => Some(
                    format!("\x1b[<{};{};{}m", button.index(), col + 1, row + 1).into_bytes(),
                ),
                kind => Some(
                    format!(
                        "\x1b[<{};{};{}M",
                        button_bits(kind) + mods,
                        col + 1,
                        row + 1
                    )
                    .into_bytes(),
                ),
            }
        }
        MouseEncoding::Urxvt => {
            let b = match event.kind {
                MouseEventKind::Up(_) => 3,
                kind => button_bits(kind),
            } + mods
                + 32;
            Some(format!("\x1b[{};{};{}M", b, col + 1, row + 1).into_bytes())
        }
        MouseEncoding::Default | MouseEncoding::Utf8 => {
            let b = match event.kind {
                // Legacy encoding reports release as button 3.
                MouseEventKind::Up(_) => 3,
                kind => button_bits(kind),
            } + mods
                + 32;
            let mut out = b"\x1b[M".to_vec();
            push_coord(&mut out, b, encoding);
            push_coord(&mut out, 32 + col + 1, encoding);
            push_coord(&mut out, 32 + row + 1, encoding);
            Some(out)
        }
    }
}

/// One legacy coordinate byte; mode 1005 escapes values past 0x7F as
/// UTF-8.
fn push_coord(out: &mut Vec<u8>, value: u16, encoding: MouseEncoding) {
    if encoding == MouseEncoding::Utf8 {
        if let Some(ch) = char::from_u32(u32::from(value)) {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            return;
        }
    }
    out.push(value.min(255) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use termweave_core::Screen;

    fn key(k: Key) -> KeyEvent {
        KeyEvent::new(k)
    }

    // ── Keys ───────────────────────────────────────────────────────

    #[test]
    fn plain_named_keys() {
        let table = KeyTable::default();
        let modes = Modes::power_on();
        assert_eq!(table.encode(key(Key::Enter), modes), b"\r");
        assert_eq!(table.encode(key(Key::Backspace), modes), b"\x7f");
        assert_eq!(table.encode(key(Key::Up), modes), b"\x1b[A");
        assert_eq!(table.encode(key(Key::Home), modes), b"\x1b[1~");
        assert_eq!(table.encode(key(Key::F(1)), modes), b"\x1bOP");
        assert_eq!(table.encode(key(Key::F(5)), modes), b"\x1b[15~");
    }

    #[test]
    fn application_cursor_keys() {
        let table = KeyTable::default();
        let modes = Modes::power_on() | Modes::DECCKM;
        assert_eq!(table.encode(key(Key::Up), modes), b"\x1bOA");
        assert_eq!(table.encode(key(Key::Left), modes), b"\x1bOD");
        // Non-arrow keys are unaffected.
        assert_eq!(table.encode(key(Key::Home), modes), b"\x1b[1~");
    }

    #[test]
    fn ctrl_folds_into_control_bytes() {
        let table = KeyTable::default();
        let modes = Modes::power_on();
        let ctrl = |c| KeyEvent::with_mods(Key::Char(c), KeyModifiers::CTRL);
        assert_eq!(table.encode(ctrl('a'), modes), vec![0x01]);
        assert_eq!(table.encode(ctrl('z'), modes), vec![0x1a]);
        assert_eq!(table.encode(ctrl('@'), modes), vec![0x00]);
        assert_eq!(table.encode(ctrl('['), modes), vec![0x1b]);
        assert_eq!(table.encode(ctrl('?'), modes), vec![0x7f]);
    }

    #[test]
    fn ctrl_arrows_use_modifier_form() {
        let table = KeyTable::default();
        let modes = Modes::power_on();
        let ev = KeyEvent::with_mods(Key::Up, KeyModifiers::CTRL);
        assert_eq!(table.encode(ev, modes), b"\x1b[1;5A");
    }

    #[test]
    fn alt_prefixes_escape() {
        let table = KeyTable::default();
        let modes = Modes::power_on();
        let ev = KeyEvent::with_mods(Key::Char('x'), KeyModifiers::ALT);
        assert_eq!(table.encode(ev, modes), b"\x1bx");
        let ev = KeyEvent::with_mods(Key::Down, KeyModifiers::ALT);
        assert_eq!(table.encode(ev, modes), b"\x1b[1;3B");
    }

    #[test]
    fn unicode_chars_encode_as_utf8() {
        let table = KeyTable::default();
        let modes = Modes::power_on();
        assert_eq!(table.encode(key(Key::Char('é')), modes), "é".as_bytes());
    }

    // ── Paste ──────────────────────────────────────────────────────

    #[test]
    fn bracketed_paste_wraps_markers() {
        let mut modes = Modes::power_on();
        assert_eq!(encode_paste("hi", modes), b"hi");
        modes.insert(Modes::PASTE);
        assert_eq!(encode_paste("hi", modes), b"\x1b[200~hi\x1b[201~");
    }

    // ── Mouse ──────────────────────────────────────────────────────

    fn screen_with(mode: MouseMode, encoding: MouseEncoding) -> Screen {
        let mut screen = Screen::new(80, 24);
        screen.mouse_mode = mode;
        screen.mouse_encoding = encoding;
        screen
    }

    fn press(col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            col,
            row,
            mods: KeyModifiers::empty(),
        }
    }

    #[test]
    fn no_tracking_reports_nothing() {
        let screen = screen_with(MouseMode::None, MouseEncoding::Sgr);
        assert_eq!(encode_mouse(press(0, 0), &screen), None);
    }

    #[test]
    fn sgr_press_and_release() {
        let screen = screen_with(MouseMode::Vt200, MouseEncoding::Sgr);
        assert_eq!(
            encode_mouse(press(4, 2), &screen),
            Some(b"\x1b[<0;5;3M".to_vec())
        );
        let release = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            col: 4,
            row: 2,
            mods: KeyModifiers::empty(),
        };
        assert_eq!(
            encode_mouse(release, &screen),
            Some(b"\x1b[<0;5;3m".to_vec())
        );
    }

    #[test]
    fn sgr_modifiers_add_bits() {
        let screen = screen_with(MouseMode::Vt200, MouseEncoding::Sgr);
        let ev = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Right),
            col: 0,
            row: 0,
            mods: KeyModifiers::CTRL | KeyModifiers::SHIFT,
        };
        // 2 (right) + 4 (shift) + 16 (ctrl) = 22
        assert_eq!(encode_mouse(ev, &screen), Some(b"\x1b[<22;1;1M".to_vec()));
    }

    #[test]
    fn legacy_encoding_offsets_bytes() {
        let screen = screen_with(MouseMode::Vt200, MouseEncoding::Default);
        let encoded = encode_mouse(press(0, 0), &screen).unwrap();
        // ESC [ M, button 0+32=32 ' ', col 33 '!', row 33 '!'
        assert_eq!(encoded, b"\x1b[M !!");
    }

    #[test]
    fn legacy_release_is_button_three() {
        let screen = screen_with(MouseMode::Vt200, MouseEncoding::Default);
        let ev = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            col: 0,
            row: 0,
            mods: KeyModifiers::empty(),
        };
        let encoded = encode_mouse(ev, &screen).unwrap();
        assert_eq!(encoded[3], 32 + 3);
    }

    #[test]
    fn drag_requires_button_event_tracking() {
        let drag = MouseEvent {
            kind: MouseEventKind::Drag(MouseButton::Left),
            col: 1,
            row: 1,
            mods: KeyModifiers::empty(),
        };
        let vt200 = screen_with(MouseMode::Vt200, MouseEncoding::Sgr);
        assert_eq!(encode_mouse(drag, &vt200), None);
        let button = screen_with(MouseMode::ButtonEvent, MouseEncoding::Sgr);
        // 0 (left) + 32 (motion) = 32
        assert_eq!(encode_mouse(drag, &button), Some(b"\x1b[<32;2;2M".to_vec()));
    }

    #[test]
    fn bare_motion_requires_any_event_tracking() {
        let moved = MouseEvent {
            kind: MouseEventKind::Moved,
            col: 0,
            row: 0,
            mods: KeyModifiers::empty(),
        };
        let button = screen_with(MouseMode::ButtonEvent, MouseEncoding::Sgr);
        assert_eq!(encode_mouse(moved, &button), None);
        let any = screen_with(MouseMode::AnyEvent, MouseEncoding::Sgr);
        // 3 (no button) + 32 (motion) = 35
        assert_eq!(encode_mouse(moved, &any), Some(b"\x1b[<35;1;1M".to_vec()));
    }

    #[test]
    fn x10_reports_presses_only() {
        let screen = screen_with(MouseMode::X10, MouseEncoding::Default);
        assert!(encode_mouse(press(0, 0), &screen).is_some());
        let release = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            col: 0,
            row: 0,
            mods: KeyModifiers::empty(),
        };
        assert_eq!(encode_mouse(release, &screen), None);
    }

    #[test]
    fn x10_drops_modifiers() {
        let screen = screen_with(MouseMode::X10, MouseEncoding::Default);
        let ev = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            col: 0,
            row: 0,
            mods: KeyModifiers::CTRL,
        };
        let encoded = encode_mouse(ev, &screen).unwrap();
        assert_eq!(encoded[3], 32);
    }

    #[test]
    fn scroll_wheel_buttons() {
        let screen = screen_with(MouseMode::Vt200, MouseEncoding::Sgr);
        let up = MouseEvent {
            kind: MouseEventKind::ScrollUp,
            col: 0,
            row: 0,
            mods: KeyModifiers::empty(),
        };
        assert_eq!(encode_mouse(up, &screen), Some(b"\x1b[<64;1;1M".to_vec()));
    }

    #[test]
    fn utf8_encoding_escapes_large_coords() {
        let mut screen = Screen::new(300, 100);
        screen.mouse_mode = MouseMode::Vt200;
        screen.mouse_encoding = MouseEncoding::Utf8;
        let encoded = encode_mouse(press(200, 0), &screen).unwrap();
        // 32 + 200 + 1 = 233 → two UTF-8 bytes.
        let tail = &encoded[4..];
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0], 0xC3);
    }
}
