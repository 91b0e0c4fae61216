//! Terminal modes: the ANSI/DEC mode bitset and mouse tracking state.

use bitflags::bitflags;

bitflags! {
    /// ANSI standard and DEC private modes, one bit each.
    ///
    /// SM/RM toggle the ANSI group, DECSET/DECRST the DEC group. Bits with
    /// no behavioural effect in this emulator (KAM, SRM, DECANM, DECCOLM,
    /// DECSCLM, DECARM) are still tracked so queries and save/restore see
    /// consistent state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modes: u32 {
        /// Keyboard action mode (SM 2): locks the keyboard.
        const KAM = 1 << 0;
        /// Insert/replace mode (SM 4): printables shift the line right.
        const IRM = 1 << 1;
        /// Send/receive mode (SM 12).
        const SRM = 1 << 2;
        /// Line feed/new line mode (SM 20): LF implies CR.
        const LNM = 1 << 3;
        /// Application cursor keys (DECSET 1).
        const DECCKM = 1 << 4;
        /// ANSI/VT52 mode (DECSET 2).
        const DECANM = 1 << 5;
        /// 132-column mode (DECSET 3); tracked, not implemented.
        const DECCOLM = 1 << 6;
        /// Smooth scroll (DECSET 4); tracked only.
        const DECSCLM = 1 << 7;
        /// Origin mode (DECSET 6): addressing relative to the scroll region.
        const DECOM = 1 << 8;
        /// Autowrap (DECSET 7). On by default.
        const DECAWM = 1 << 9;
        /// Autorepeat (DECSET 8); tracked only.
        const DECARM = 1 << 10;
        /// Text cursor enable (DECSET 25). On by default.
        const DECTCEM = 1 << 11;
        /// Alternate screen active (DECSET 47/1047/1049).
        const ALT_SCREEN = 1 << 12;
        /// Bracketed paste (DECSET 2004).
        const PASTE = 1 << 13;
        /// Application keypad (DECKPAM / DECKPNM).
        const DECKPAM = 1 << 14;
    }
}

impl Modes {
    /// Power-on defaults: autowrap on, cursor visible.
    pub fn power_on() -> Self {
        Modes::DECAWM | Modes::DECTCEM
    }
}

/// Mouse tracking level (DECSET 9 / 1000 / 1002 / 1003).
///
/// Levels are ordered: each includes the reports of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MouseMode {
    /// No tracking.
    #[default]
    None,
    /// X10 compatibility (DECSET 9): button presses only.
    X10,
    /// VT200 normal tracking (DECSET 1000): press and release.
    Vt200,
    /// Button-event tracking (DECSET 1002): plus drag while pressed.
    ButtonEvent,
    /// Any-event tracking (DECSET 1003): plus bare motion.
    AnyEvent,
}

/// Mouse report encoding (DECSET 1005 / 1006 / 1015).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    /// Legacy `CSI M` with byte-offset coordinates.
    #[default]
    Default,
    /// UTF-8 extended coordinates (DECSET 1005).
    Utf8,
    /// SGR encoding `CSI < ... M/m` (DECSET 1006).
    Sgr,
    /// URXVT decimal encoding (DECSET 1015).
    Urxvt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_defaults() {
        let m = Modes::power_on();
        assert!(m.contains(Modes::DECAWM));
        assert!(m.contains(Modes::DECTCEM));
        assert!(!m.contains(Modes::IRM));
        assert!(!m.contains(Modes::ALT_SCREEN));
    }

    #[test]
    fn mouse_modes_are_ordered_by_verbosity() {
        assert!(MouseMode::None < MouseMode::X10);
        assert!(MouseMode::Vt200 < MouseMode::ButtonEvent);
        assert!(MouseMode::ButtonEvent < MouseMode::AnyEvent);
    }
}
