//! Sequence interpreter: applies parsed [`Sequence`] values to a [`Screen`].
//!
//! The interpreter owns no I/O. Anything that must leave the terminal model
//! (replies on the PTY, bell and title notifications) comes back to the
//! caller as [`Effect`] values. Unknown controls are ignored, never errors.

use tracing::trace;

use crate::mode::{Modes, MouseEncoding, MouseMode};
use crate::parser::{CsiParam, Intermediates, Sequence, MAX_STRING_PAYLOAD};
use crate::screen::{CursorShape, Screen, SixelImage};
use crate::sgr::apply_sgr;

/// A side effect the shell must carry out after applying a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bytes to write back to the child (DA, DSR, OSC color queries).
    Reply(Vec<u8>),
    /// BEL was received.
    Bell,
    /// The window title changed (OSC 0/2).
    Title(String),
    /// Mouse tracking level or encoding changed; the host should update its
    /// event routing.
    MouseMode(MouseMode, MouseEncoding),
}

/// In-flight DCS payload capture.
#[derive(Debug, Default)]
struct DcsCapture {
    /// Only sixel (final byte `q`) payloads are kept.
    sixel: bool,
    row: u16,
    col: u16,
    data: Vec<u8>,
}

/// Applies sequences to the screen, collecting effects.
#[derive(Debug, Default)]
pub struct Interpreter {
    dcs: Option<DcsCapture>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one sequence, pushing any side effects onto `effects`.
    pub fn apply(&mut self, screen: &mut Screen, seq: Sequence, effects: &mut Vec<Effect>) {
        match seq {
            Sequence::Print(ch, width) => screen.print(ch, width),
            Sequence::C0(byte) => self.c0(screen, byte, effects),
            Sequence::Esc {
                intermediates,
                final_byte,
            } => self.esc(screen, &intermediates, final_byte),
            Sequence::Csi {
                intermediates,
                params,
                final_byte,
            } => self.csi(screen, &intermediates, &params, final_byte, effects),
            Sequence::Osc {
                payload,
                bel_terminated,
            } => self.osc(screen, &payload, bel_terminated, effects),
            Sequence::DcsStart {
                intermediates: _,
                params: _,
                final_byte,
            } => {
                self.dcs = Some(DcsCapture {
                    sixel: final_byte == b'q',
                    row: screen.cursor.row,
                    col: screen.cursor.col,
                    data: Vec::new(),
                });
            }
            Sequence::DcsData(chunk) => {
                if let Some(capture) = self.dcs.as_mut() {
                    if capture.sixel && capture.data.len() + chunk.len() <= MAX_STRING_PAYLOAD {
                        capture.data.extend_from_slice(&chunk);
                    }
                }
            }
            Sequence::DcsEnd => {
                if let Some(capture) = self.dcs.take() {
                    if capture.sixel && !capture.data.is_empty() {
                        screen.sixels.push(SixelImage {
                            row: capture.row,
                            col: capture.col,
                            data: capture.data,
                        });
                        screen.mark_dirty();
                    }
                }
            }
        }
    }

    // ── C0 ──────────────────────────────────────────────────────────

    fn c0(&mut self, screen: &mut Screen, byte: u8, effects: &mut Vec<Effect>) {
        match byte {
            0x07 => effects.push(Effect::Bell),
            0x08 => screen.backspace(),
            0x09 => screen.tab(),
            0x0A..=0x0C => screen.linefeed(),
            0x0D => screen.carriage_return(),
            0x0E => screen.charsets.invoke(1), // SO
            0x0F => screen.charsets.invoke(0), // SI
            _ => {}
        }
    }

    // ── ESC ─────────────────────────────────────────────────────────

    fn esc(&mut self, screen: &mut Screen, intermediates: &Intermediates, final_byte: u8) {
        match (intermediates.as_slice(), final_byte) {
            ([], b'7') => screen.save_cursor(),
            ([], b'8') => screen.restore_cursor(),
            ([], b'D') => screen.index(),
            ([], b'E') => screen.next_line(),
            ([], b'H') => screen.set_tab_stop(),
            ([], b'M') => screen.reverse_index(),
            ([], b'N') => screen.charsets.single_shift(2),
            ([], b'O') => screen.charsets.single_shift(3),
            ([], b'n') => screen.charsets.invoke(2),
            ([], b'o') => screen.charsets.invoke(3),
            ([], b'=') => screen.modes.insert(Modes::DECKPAM),
            ([], b'>') => screen.modes.remove(Modes::DECKPAM),
            ([], b'c') => screen.full_reset(),
            ([b'#'], b'8') => screen.alignment_test(),
            ([b'('], d) => screen.charsets.designate(0, d),
            ([b')'], d) => screen.charsets.designate(1, d),
            ([b'*'], d) => screen.charsets.designate(2, d),
            ([b'+'], d) => screen.charsets.designate(3, d),
            _ => trace!(final_byte, "ignoring unknown ESC sequence"),
        }
    }

    // ── CSI ─────────────────────────────────────────────────────────

    fn csi(
        &mut self,
        screen: &mut Screen,
        intermediates: &Intermediates,
        params: &[CsiParam],
        final_byte: u8,
        effects: &mut Vec<Effect>,
    ) {
        match (intermediates.as_slice(), final_byte) {
            ([b'?'], b'h') => self.dec_modes(screen, params, true, effects),
            ([b'?'], b'l') => self.dec_modes(screen, params, false, effects),
            // DA2: identify as a base VT100-class emulator.
            ([b'>'], b'c') => effects.push(Effect::Reply(b"\x1b[>0;0;0c".to_vec())),
            ([b' '], b'q') => {
                screen.cursor.shape = CursorShape::from_decscusr(param(params, 0, 0));
                screen.mark_dirty();
            }
            ([b'!'], b'p') => screen.soft_reset(),
            ([], final_byte) => self.csi_standard(screen, params, final_byte, effects),
            _ => trace!(final_byte, "ignoring CSI with unknown intermediates"),
        }
    }

    fn csi_standard(
        &mut self,
        screen: &mut Screen,
        params: &[CsiParam],
        final_byte: u8,
        effects: &mut Vec<Effect>,
    ) {
        match final_byte {
            b'A' => screen.move_rel(-i32::from(count(params)), 0),
            b'B' => screen.move_rel(i32::from(count(params)), 0),
            b'C' => screen.move_rel(0, i32::from(count(params))),
            b'D' => screen.move_rel(0, -i32::from(count(params))),
            b'E' => {
                screen.move_rel(i32::from(count(params)), 0);
                screen.carriage_return();
            }
            b'F' => {
                screen.move_rel(-i32::from(count(params)), 0);
                screen.carriage_return();
            }
            b'G' => screen.set_col(count(params) - 1),
            b'H' | b'f' => {
                let row = param(params, 0, 1).max(1) - 1;
                let col = param(params, 1, 1).max(1) - 1;
                screen.move_to(row, col);
            }
            b'd' => screen.set_row(count(params) - 1),
            b'J' => screen.erase_display(param(params, 0, 0)),
            b'K' => screen.erase_line(param(params, 0, 0)),
            b'L' => screen.insert_lines(count(params)),
            b'M' => screen.delete_lines(count(params)),
            b'S' => screen.scroll_up(count(params), false),
            b'T' => screen.scroll_down(count(params)),
            b'@' => screen.insert_chars(count(params)),
            b'P' => screen.delete_chars(count(params)),
            b'X' => screen.erase_chars(count(params)),
            b'Z' => screen.back_tab(count(params)),
            b'b' => screen.repeat_last(count(params)),
            b'r' => {
                let top = param(params, 0, 1).max(1) - 1;
                let bottom = param(params, 1, screen.height()).max(1) - 1;
                screen.set_margins(top, bottom);
            }
            b'g' => match param(params, 0, 0) {
                0 => screen.clear_tab_stop(),
                3 => screen.clear_all_tab_stops(),
                _ => {}
            },
            b'm' => {
                apply_sgr(&mut screen.cursor.style, params);
                screen.mark_dirty();
            }
            // DA1: VT100 with Advanced Video Option.
            b'c' => {
                if param(params, 0, 0) == 0 {
                    effects.push(Effect::Reply(b"\x1b[?1;2c".to_vec()));
                }
            }
            b'n' => match param(params, 0, 0) {
                5 => effects.push(Effect::Reply(b"\x1b[0n".to_vec())),
                6 => {
                    let report =
                        format!("\x1b[{};{}R", screen.cursor.row + 1, screen.cursor.col + 1);
                    effects.push(Effect::Reply(report.into_bytes()));
                }
                _ => {}
            },
            b'h' => self.ansi_modes(screen, params, true),
            b'l' => self.ansi_modes(screen, params, false),
            b's' => {
                if params.is_empty() {
                    screen.save_cursor();
                }
            }
            b'u' => {
                if params.is_empty() {
                    screen.restore_cursor();
                }
            }
            b't' => {} // window manipulation, unsupported
            _ => trace!(final_byte, "ignoring unknown CSI final"),
        }
    }

    // ── Modes ───────────────────────────────────────────────────────

    fn ansi_modes(&mut self, screen: &mut Screen, params: &[CsiParam], set: bool) {
        for p in params {
            match p.primary_or(0) {
                2 => screen.modes.set(Modes::KAM, set),
                4 => screen.modes.set(Modes::IRM, set),
                12 => screen.modes.set(Modes::SRM, set),
                20 => screen.modes.set(Modes::LNM, set),
                other => trace!(mode = other, set, "ignoring unknown ANSI mode"),
            }
        }
    }

    fn dec_modes(
        &mut self,
        screen: &mut Screen,
        params: &[CsiParam],
        set: bool,
        effects: &mut Vec<Effect>,
    ) {
        let before = (screen.mouse_mode, screen.mouse_encoding);
        for p in params {
            self.dec_mode(screen, p.primary_or(0), set);
        }
        let after = (screen.mouse_mode, screen.mouse_encoding);
        if before != after {
            effects.push(Effect::MouseMode(after.0, after.1));
        }
    }

    fn dec_mode(&mut self, screen: &mut Screen, mode: u16, set: bool) {
        match mode {
            1 => screen.modes.set(Modes::DECCKM, set),
            2 => screen.modes.set(Modes::DECANM, set),
            3 => screen.modes.set(Modes::DECCOLM, set),
            4 => screen.modes.set(Modes::DECSCLM, set),
            5 => {} // DECSCNM, unsupported
            6 => {
                screen.modes.set(Modes::DECOM, set);
                screen.move_to(0, 0);
            }
            7 => screen.modes.set(Modes::DECAWM, set),
            8 => screen.modes.set(Modes::DECARM, set),
            9 => {
                screen.mouse_mode = if set { MouseMode::X10 } else { MouseMode::None };
            }
            12 | 13 => {
                screen.cursor.shape = screen.cursor.shape.with_blink(set);
                screen.mark_dirty();
            }
            25 => {
                screen.modes.set(Modes::DECTCEM, set);
                screen.mark_dirty();
            }
            47 => {
                if set {
                    screen.enter_alt(false);
                } else {
                    screen.exit_alt();
                }
            }
            1000 => {
                screen.mouse_mode = if set { MouseMode::Vt200 } else { MouseMode::None };
            }
            1002 => {
                screen.mouse_mode = if set {
                    MouseMode::ButtonEvent
                } else {
                    MouseMode::None
                };
            }
            1003 => {
                screen.mouse_mode = if set {
                    MouseMode::AnyEvent
                } else {
                    MouseMode::None
                };
            }
            1005 => {
                screen.mouse_encoding = if set {
                    MouseEncoding::Utf8
                } else {
                    MouseEncoding::Default
                };
            }
            1006 => {
                screen.mouse_encoding = if set {
                    MouseEncoding::Sgr
                } else {
                    MouseEncoding::Default
                };
            }
            1015 => {
                screen.mouse_encoding = if set {
                    MouseEncoding::Urxvt
                } else {
                    MouseEncoding::Default
                };
            }
            1047 => {
                if set {
                    screen.enter_alt(true);
                } else {
                    screen.exit_alt();
                }
            }
            1048 => {
                if set {
                    screen.save_cursor();
                } else {
                    screen.restore_cursor();
                }
            }
            1049 => {
                if set {
                    screen.save_cursor();
                    screen.enter_alt(true);
                } else {
                    screen.exit_alt();
                    screen.restore_cursor();
                }
            }
            2004 => screen.modes.set(Modes::PASTE, set),
            other => trace!(mode = other, set, "ignoring unknown DEC mode"),
        }
    }

    // ── OSC ─────────────────────────────────────────────────────────

    fn osc(
        &mut self,
        screen: &mut Screen,
        payload: &[u8],
        bel_terminated: bool,
        effects: &mut Vec<Effect>,
    ) {
        let text = String::from_utf8_lossy(payload);
        let (cmd, rest) = match text.split_once(';') {
            Some((cmd, rest)) => (cmd, rest),
            None => (text.as_ref(), ""),
        };
        match cmd {
            "0" | "2" => {
                screen.title = rest.to_string();
                screen.mark_dirty();
                effects.push(Effect::Title(rest.to_string()));
            }
            "8" => self.osc8(screen, rest),
            "10" | "11" | "12" => {
                if rest == "?" {
                    let (r, g, b) = match cmd {
                        "10" => screen.default_fg,
                        "11" => screen.default_bg,
                        _ => screen.cursor_color,
                    };
                    let terminator: &[u8] = if bel_terminated { b"\x07" } else { b"\x1b\\" };
                    let mut reply = format!(
                        "\x1b]{cmd};rgb:{:04x}/{:04x}/{:04x}",
                        u16::from(r) * 0x101,
                        u16::from(g) * 0x101,
                        u16::from(b) * 0x101,
                    )
                    .into_bytes();
                    reply.extend_from_slice(terminator);
                    effects.push(Effect::Reply(reply));
                } else if let Some(rgb) = parse_color_spec(rest) {
                    match cmd {
                        "10" => screen.default_fg = rgb,
                        "11" => screen.default_bg = rgb,
                        _ => screen.cursor_color = rgb,
                    }
                }
            }
            "110" => screen.default_fg = (0xFF, 0xFF, 0xFF),
            "111" => screen.default_bg = (0x00, 0x00, 0x00),
            "112" => screen.cursor_color = (0xFF, 0xFF, 0xFF),
            _ => trace!(cmd, "ignoring unknown OSC"),
        }
    }

    /// OSC 8: `params ; uri`. The URI keeps any `;` it contains; only the
    /// first separator after the params section splits.
    fn osc8(&mut self, screen: &mut Screen, rest: &str) {
        let Some((params, uri)) = rest.split_once(';') else {
            return;
        };
        if !screen.osc8_enabled {
            return;
        }
        let id = params
            .split(':')
            .find_map(|kv| kv.strip_prefix("id="))
            .unwrap_or("");
        screen.cursor.style.link = screen.links.intern(uri, id);
    }
}

/// Parse an X-style color spec: `rgb:RR/GG/BB` (1-4 hex digits per
/// channel) or `#RRGGBB`.
fn parse_color_spec(spec: &str) -> Option<(u8, u8, u8)> {
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut channels = rest.split('/');
        let r = hex_channel(channels.next()?)?;
        let g = hex_channel(channels.next()?)?;
        let b = hex_channel(channels.next()?)?;
        return Some((r, g, b));
    }
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some((r, g, b));
        }
    }
    None
}

/// One color channel of 1-4 hex digits, scaled down to 8 bits.
fn hex_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u16::from_str_radix(digits, 16).ok()?;
    let scaled = match digits.len() {
        1 => value * 0x11,
        2 => value,
        3 => value >> 4,
        _ => value >> 8,
    };
    Some(scaled as u8)
}

/// Parameter at `idx`, or `default` when missing or empty.
fn param(params: &[CsiParam], idx: usize, default: u16) -> u16 {
    params
        .get(idx)
        .and_then(CsiParam::primary)
        .unwrap_or(default)
}

/// First parameter as a count: missing, empty, and 0 all mean 1.
fn count(params: &[CsiParam]) -> u16 {
    param(params, 0, 1).max(1)
}
