//! VT/ANSI escape-sequence parser.
//!
//! A deterministic byte-at-a-time state machine following the DEC parser
//! model (Paul Williams), producing typed [`Sequence`] values:
//!
//! - printable characters (ASCII + full UTF-8), measured for display width
//! - C0 controls
//! - ESC sequences with intermediates
//! - CSI sequences with full parameter lists (empty slots and `:`
//!   sub-parameters preserved)
//! - OSC strings (BEL- or ST-terminated)
//! - DCS sequences with a streamed payload (sixel data passes verbatim)
//!
//! The parser never fails: malformed sequences are discarded after their
//! terminator, overlong parameter lists complete in an ignore state, and
//! invalid UTF-8 prints U+FFFD. The only heap use in steady state is the
//! OSC/DCS payload buffer, which is capped.

use smallvec::SmallVec;

use crate::cell::Cell;

/// CSI parameter slots beyond this push the sequence into the ignore state.
pub const MAX_CSI_PARAMS: usize = 16;
/// OSC and DCS payloads are capped at this many bytes; the remainder of an
/// overflowing string is consumed but not stored.
pub const MAX_STRING_PAYLOAD: usize = 64 * 1024;
/// DCS payload bytes are streamed to the consumer in chunks of this size.
const DCS_CHUNK: usize = 4096;

/// One CSI parameter slot.
///
/// A slot is the region between `;` separators. Within a slot, `:` splits
/// sub-parameters (SGR 38:2:r:g:b, OSC 8 key=value lists). `None` parts are
/// empty positions, meaning "use the default".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsiParam {
    parts: SmallVec<[Option<u16>; 2]>,
}

impl CsiParam {
    /// A slot holding a single explicit value.
    pub fn new(value: u16) -> Self {
        Self {
            parts: SmallVec::from_slice(&[Some(value)]),
        }
    }

    /// An empty slot ("use default").
    pub fn empty() -> Self {
        Self {
            parts: SmallVec::from_slice(&[None]),
        }
    }

    fn push_part(&mut self, value: Option<u16>) {
        self.parts.push(value);
    }

    /// The primary value, if one was given.
    pub fn primary(&self) -> Option<u16> {
        self.parts.first().copied().flatten()
    }

    /// The primary value, or `default` for an empty slot.
    pub fn primary_or(&self, default: u16) -> u16 {
        self.primary().unwrap_or(default)
    }

    /// All parts including the primary; `None` entries were empty.
    pub fn parts(&self) -> &[Option<u16>] {
        &self.parts
    }

    /// Whether the slot carried `:`-separated sub-parameters.
    pub fn has_subparams(&self) -> bool {
        self.parts.len() > 1
    }
}

impl From<u16> for CsiParam {
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

/// Parameter list of a CSI or DCS sequence.
pub type CsiParams = SmallVec<[CsiParam; 4]>;

/// Intermediate bytes (0x20-0x2F) plus any private markers (0x3C-0x3F).
pub type Intermediates = SmallVec<[u8; 2]>;

/// A decoded unit of terminal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequence {
    /// One printable rune and its display width in columns (0, 1, or 2).
    Print(char, u8),
    /// A C0 control byte (0x00-0x1F) or DEL (0x7F).
    C0(u8),
    /// An ESC sequence: intermediates then the final byte.
    Esc {
        intermediates: Intermediates,
        final_byte: u8,
    },
    /// A CSI sequence. Private markers (`?`, `>`, `<`, `=`) appear at the
    /// front of `intermediates`.
    Csi {
        intermediates: Intermediates,
        params: CsiParams,
        final_byte: u8,
    },
    /// An OSC string, terminator stripped. `bel_terminated` records whether
    /// BEL or ST ended it, so replies can mirror the query's terminator.
    Osc {
        payload: Vec<u8>,
        bel_terminated: bool,
    },
    /// Start of a DCS sequence; payload follows as [`Sequence::DcsData`]
    /// chunks until [`Sequence::DcsEnd`].
    DcsStart {
        intermediates: Intermediates,
        params: CsiParams,
        final_byte: u8,
    },
    /// A chunk of DCS payload, verbatim.
    DcsData(Vec<u8>),
    /// End of the DCS payload (ST seen, or the sequence was aborted).
    DcsEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    /// ESC seen inside an OSC string; `\` completes ST.
    OscEsc,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    /// ESC seen inside a DCS payload; `\` completes ST.
    DcsEsc,
    DcsIgnore,
    /// ESC seen inside an ignored DCS; `\` completes ST.
    DcsIgnoreEsc,
    SosPmApcString,
    /// ESC seen inside SOS/PM/APC; `\` completes ST.
    SosPmApcEsc,
    /// Accumulating a multi-byte UTF-8 character; the value counts
    /// continuation bytes still expected.
    Utf8(u8),
}

/// The escape-sequence parser state machine.
///
/// Feed bytes with [`Parser::feed_into`]; each byte produces zero, one, or
/// (when a malformed multi-byte character is cut short) two sequences.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    intermediates: Intermediates,
    params: CsiParams,
    /// Parts of the parameter slot currently being accumulated.
    cur_parts: SmallVec<[Option<u16>; 2]>,
    /// Digits accumulated for the current part, if any.
    cur_value: Option<u16>,
    /// OSC payload, or the pending DCS chunk.
    string_buf: Vec<u8>,
    /// Total string payload seen so far (for the overflow cap).
    string_len: usize,
    /// Payload overflowed; consume without storing and discard at the end.
    string_overflow: bool,
    utf8_buf: [u8; 4],
    utf8_len: u8,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser in ground state.
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            intermediates: Intermediates::new(),
            params: CsiParams::new(),
            cur_parts: SmallVec::new(),
            cur_value: None,
            string_buf: Vec::new(),
            string_len: 0,
            string_overflow: false,
            utf8_buf: [0; 4],
            utf8_len: 0,
        }
    }

    /// Feed a chunk of bytes and collect the decoded sequences.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Sequence> {
        let mut out = Vec::new();
        self.feed_into(bytes, &mut out);
        out
    }

    /// Feed a chunk of bytes, appending decoded sequences to `out`.
    ///
    /// Callers on hot paths can reuse `out` across reads to keep its
    /// capacity.
    pub fn feed_into(&mut self, bytes: &[u8], out: &mut Vec<Sequence>) {
        for &b in bytes {
            self.advance(b, out);
        }
    }

    fn advance(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match self.state {
            State::Ground => self.ground(b, out),
            State::Escape => self.escape(b, out),
            State::EscapeIntermediate => self.escape_intermediate(b, out),
            State::CsiEntry => self.csi_entry(b, out),
            State::CsiParam => self.csi_param(b, out),
            State::CsiIntermediate => self.csi_intermediate(b, out),
            State::CsiIgnore => self.csi_ignore(b, out),
            State::OscString => self.osc_string(b, out),
            State::OscEsc => self.osc_esc(b, out),
            State::DcsEntry => self.dcs_entry(b, out),
            State::DcsParam => self.dcs_param(b, out),
            State::DcsIntermediate => self.dcs_intermediate(b, out),
            State::DcsPassthrough => self.dcs_passthrough(b, out),
            State::DcsEsc => self.dcs_esc(b, out),
            State::DcsIgnore => self.dcs_ignore(b, out),
            State::DcsIgnoreEsc => self.dcs_ignore_esc(b, out),
            State::SosPmApcString => self.sos_pm_apc(b, out),
            State::SosPmApcEsc => self.sos_pm_apc_esc(b, out),
            State::Utf8(remaining) => self.utf8(b, remaining, out),
        }
    }

    // ── Ground ──────────────────────────────────────────────────────

    fn ground(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x1B => self.begin_escape(),
            0x00..=0x1F | 0x7F => out.push(Sequence::C0(b)),
            0x20..=0x7E => out.push(Sequence::Print(b as char, 1)),
            // UTF-8 leading bytes. 0xC0-0xC1 are overlong, 0xF5-0xFF out of
            // range; both print U+FFFD like any other invalid input.
            0xC2..=0xDF => self.begin_utf8(b, 1),
            0xE0..=0xEF => self.begin_utf8(b, 2),
            0xF0..=0xF4 => self.begin_utf8(b, 3),
            _ => out.push(Sequence::Print('\u{FFFD}', 1)),
        }
    }

    fn begin_utf8(&mut self, b: u8, continuation: u8) {
        self.utf8_buf[0] = b;
        self.utf8_len = 1;
        self.state = State::Utf8(continuation);
    }

    fn utf8(&mut self, b: u8, remaining: u8, out: &mut Vec<Sequence>) {
        if !(0x80..=0xBF).contains(&b) {
            // Invalid continuation: the started character prints as U+FFFD
            // and this byte is reprocessed from ground.
            self.state = State::Ground;
            self.utf8_len = 0;
            out.push(Sequence::Print('\u{FFFD}', 1));
            self.advance(b, out);
            return;
        }
        let idx = self.utf8_len as usize;
        if idx < 4 {
            self.utf8_buf[idx] = b;
            self.utf8_len += 1;
        }
        if remaining > 1 {
            self.state = State::Utf8(remaining - 1);
            return;
        }
        self.state = State::Ground;
        let len = self.utf8_len as usize;
        self.utf8_len = 0;
        match core::str::from_utf8(&self.utf8_buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
        {
            Some(ch) => out.push(Sequence::Print(ch, Cell::display_width(ch))),
            None => out.push(Sequence::Print('\u{FFFD}', 1)),
        }
    }

    // ── Escape ──────────────────────────────────────────────────────

    fn begin_escape(&mut self) {
        self.state = State::Escape;
        self.intermediates.clear();
    }

    fn begin_csi(&mut self) {
        self.state = State::CsiEntry;
        self.intermediates.clear();
        self.params.clear();
        self.cur_parts.clear();
        self.cur_value = None;
    }

    fn begin_string(&mut self, state: State) {
        self.state = state;
        self.string_buf.clear();
        self.string_len = 0;
        self.string_overflow = false;
    }

    fn escape(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            b'[' => self.begin_csi(),
            b']' => self.begin_string(State::OscString),
            b'P' => {
                self.begin_csi();
                self.state = State::DcsEntry;
            }
            b'X' | b'^' | b'_' => self.begin_string(State::SosPmApcString),
            0x20..=0x2F => {
                self.intermediates.push(b);
                self.state = State::EscapeIntermediate;
            }
            0x30..=0x7E => {
                self.state = State::Ground;
                out.push(Sequence::Esc {
                    intermediates: self.intermediates.clone(),
                    final_byte: b,
                });
            }
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => self.state = State::Ground,
        }
    }

    fn escape_intermediate(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x20..=0x2F => self.intermediates.push(b),
            0x30..=0x7E => {
                self.state = State::Ground;
                out.push(Sequence::Esc {
                    intermediates: self.intermediates.clone(),
                    final_byte: b,
                });
            }
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => self.state = State::Ground,
        }
    }

    // ── CSI ─────────────────────────────────────────────────────────

    /// Fold a digit into the current parameter part, saturating.
    fn push_digit(&mut self, b: u8) {
        let digit = u16::from(b - b'0');
        let value = self.cur_value.unwrap_or(0);
        self.cur_value = Some(value.saturating_mul(10).saturating_add(digit));
    }

    /// Finish the current `:` part.
    fn finish_part(&mut self) {
        self.cur_parts.push(self.cur_value.take());
    }

    /// Finish the current parameter slot. Returns false on overflow.
    fn finish_param(&mut self) -> bool {
        self.finish_part();
        if self.params.len() >= MAX_CSI_PARAMS {
            return false;
        }
        let mut param = CsiParam::default();
        for part in self.cur_parts.drain(..) {
            param.push_part(part);
        }
        self.params.push(param);
        true
    }

    /// Finish the parameter list for the final byte. A sequence with no
    /// parameter bytes at all yields an empty list.
    fn finish_params(&mut self) -> bool {
        if self.params.is_empty() && self.cur_parts.is_empty() && self.cur_value.is_none() {
            return true;
        }
        self.finish_param()
    }

    fn csi_entry(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x30..=0x39 => {
                self.push_digit(b);
                self.state = State::CsiParam;
            }
            b':' => {
                self.finish_part();
                self.state = State::CsiParam;
            }
            b';' => {
                if self.finish_param() {
                    self.state = State::CsiParam;
                } else {
                    self.state = State::CsiIgnore;
                }
            }
            // Private parameter markers: ? > < =
            0x3C..=0x3F => {
                self.intermediates.push(b);
                self.state = State::CsiParam;
            }
            0x20..=0x2F => {
                self.intermediates.push(b);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => self.emit_csi(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => {} // DEL ignored
        }
    }

    fn csi_param(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x30..=0x39 => self.push_digit(b),
            b':' => self.finish_part(),
            b';' => {
                if !self.finish_param() {
                    self.state = State::CsiIgnore;
                }
            }
            // A private marker after parameter bytes is malformed.
            0x3C..=0x3F => self.state = State::CsiIgnore,
            0x20..=0x2F => {
                self.intermediates.push(b);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => self.emit_csi(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => {}
        }
    }

    fn csi_intermediate(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x20..=0x2F => self.intermediates.push(b),
            0x30..=0x3F => self.state = State::CsiIgnore,
            0x40..=0x7E => self.emit_csi(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => {}
        }
    }

    fn csi_ignore(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x40..=0x7E => self.state = State::Ground,
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => out.push(Sequence::C0(b)),
            _ => {}
        }
    }

    fn emit_csi(&mut self, final_byte: u8, out: &mut Vec<Sequence>) {
        self.state = State::Ground;
        if !self.finish_params() {
            return;
        }
        out.push(Sequence::Csi {
            intermediates: self.intermediates.clone(),
            params: core::mem::take(&mut self.params),
            final_byte,
        });
    }

    // ── OSC ─────────────────────────────────────────────────────────

    fn push_string_byte(&mut self, b: u8) {
        if self.string_len >= MAX_STRING_PAYLOAD {
            self.string_overflow = true;
            return;
        }
        self.string_len += 1;
        self.string_buf.push(b);
    }

    fn emit_osc(&mut self, bel_terminated: bool, out: &mut Vec<Sequence>) {
        self.state = State::Ground;
        if self.string_overflow {
            self.string_buf.clear();
            return;
        }
        out.push(Sequence::Osc {
            payload: core::mem::take(&mut self.string_buf),
            bel_terminated,
        });
    }

    fn osc_string(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x07 => self.emit_osc(true, out),
            0x1B => self.state = State::OscEsc,
            0x18 | 0x1A => self.state = State::Ground,
            0x00..=0x1F => out.push(Sequence::C0(b)),
            _ => self.push_string_byte(b),
        }
    }

    fn osc_esc(&mut self, b: u8, out: &mut Vec<Sequence>) {
        if b == b'\\' {
            self.emit_osc(false, out);
        } else {
            // Not ST: the OSC is abandoned and the ESC starts a new
            // sequence.
            self.begin_escape();
            self.advance(b, out);
        }
    }

    // ── DCS ─────────────────────────────────────────────────────────

    fn dcs_entry(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x30..=0x39 => {
                self.push_digit(b);
                self.state = State::DcsParam;
            }
            b':' => {
                self.finish_part();
                self.state = State::DcsParam;
            }
            b';' => {
                if self.finish_param() {
                    self.state = State::DcsParam;
                } else {
                    self.state = State::DcsIgnore;
                }
            }
            0x3C..=0x3F => {
                self.intermediates.push(b);
                self.state = State::DcsParam;
            }
            0x20..=0x2F => {
                self.intermediates.push(b);
                self.state = State::DcsIntermediate;
            }
            0x40..=0x7E => self.emit_dcs_start(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            _ => {}
        }
    }

    fn dcs_param(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x30..=0x39 => self.push_digit(b),
            b':' => self.finish_part(),
            b';' => {
                if !self.finish_param() {
                    self.state = State::DcsIgnore;
                }
            }
            0x3C..=0x3F => self.state = State::DcsIgnore,
            0x20..=0x2F => {
                self.intermediates.push(b);
                self.state = State::DcsIntermediate;
            }
            0x40..=0x7E => self.emit_dcs_start(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            _ => {}
        }
    }

    fn dcs_intermediate(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x20..=0x2F => self.intermediates.push(b),
            0x30..=0x3F => self.state = State::DcsIgnore,
            0x40..=0x7E => self.emit_dcs_start(b, out),
            0x18 | 0x1A => self.state = State::Ground,
            0x1B => self.begin_escape(),
            _ => {}
        }
    }

    fn emit_dcs_start(&mut self, final_byte: u8, out: &mut Vec<Sequence>) {
        if !self.finish_params() {
            self.state = State::DcsIgnore;
            return;
        }
        self.state = State::DcsPassthrough;
        self.string_buf.clear();
        self.string_len = 0;
        self.string_overflow = false;
        out.push(Sequence::DcsStart {
            intermediates: self.intermediates.clone(),
            params: core::mem::take(&mut self.params),
            final_byte,
        });
    }

    fn flush_dcs_data(&mut self, out: &mut Vec<Sequence>) {
        if !self.string_buf.is_empty() {
            out.push(Sequence::DcsData(core::mem::take(&mut self.string_buf)));
        }
    }

    fn dcs_passthrough(&mut self, b: u8, out: &mut Vec<Sequence>) {
        match b {
            0x1B => self.state = State::DcsEsc,
            0x18 | 0x1A => {
                // Aborted mid-payload; close the stream so consumers see a
                // bounded sequence.
                self.flush_dcs_data(out);
                out.push(Sequence::DcsEnd);
                self.state = State::Ground;
            }
            // Payload is verbatim: C0 bytes are data here, not controls.
            _ => {
                self.push_string_byte(b);
                if self.string_buf.len() >= DCS_CHUNK {
                    self.flush_dcs_data(out);
                }
            }
        }
    }

    fn dcs_esc(&mut self, b: u8, out: &mut Vec<Sequence>) {
        self.flush_dcs_data(out);
        out.push(Sequence::DcsEnd);
        if b == b'\\' {
            self.state = State::Ground;
        } else {
            self.begin_escape();
            self.advance(b, out);
        }
    }

    fn dcs_ignore(&mut self, b: u8, _out: &mut Vec<Sequence>) {
        match b {
            0x1B => self.state = State::DcsIgnoreEsc,
            0x18 | 0x1A => self.state = State::Ground,
            _ => {}
        }
    }

    fn dcs_ignore_esc(&mut self, b: u8, out: &mut Vec<Sequence>) {
        if b == b'\\' {
            self.state = State::Ground;
        } else {
            self.begin_escape();
            self.advance(b, out);
        }
    }

    // ── SOS / PM / APC ──────────────────────────────────────────────

    fn sos_pm_apc(&mut self, b: u8, _out: &mut Vec<Sequence>) {
        match b {
            0x1B => self.state = State::SosPmApcEsc,
            0x18 | 0x1A => self.state = State::Ground,
            _ => {}
        }
    }

    fn sos_pm_apc_esc(&mut self, b: u8, out: &mut Vec<Sequence>) {
        if b == b'\\' {
            self.state = State::Ground;
        } else {
            self.begin_escape();
            self.advance(b, out);
        }
    }
}

/// Blocking sequence source over a byte stream.
///
/// Wraps a reader (typically the PTY master) and the parser; `next()` blocks
/// until one complete sequence is available, and returns `None` once the
/// stream closes or errors. Read errors are indistinguishable from EOF by
/// design: either way the child side is gone.
pub struct SequenceReader<R> {
    reader: R,
    parser: Parser,
    queue: std::collections::VecDeque<Sequence>,
    buf: [u8; 4096],
    eof: bool,
}

impl<R: std::io::Read> SequenceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: Parser::new(),
            queue: std::collections::VecDeque::new(),
            buf: [0; 4096],
            eof: false,
        }
    }

    /// The next decoded sequence, or `None` at end of stream.
    pub fn next_sequence(&mut self) -> Option<Sequence> {
        loop {
            if let Some(seq) = self.queue.pop_front() {
                return Some(seq);
            }
            if self.eof {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) | Err(_) => {
                    self.eof = true;
                    return None;
                }
                Ok(n) => {
                    let mut out = Vec::new();
                    self.parser.feed_into(&self.buf[..n], &mut out);
                    self.queue.extend(out);
                }
            }
        }
    }
}
