//! Events the terminal raises toward the host.

use termweave_core::{MouseEncoding, MouseMode};

/// A notification from the terminal to the host.
///
/// Handlers run on the terminal's background threads, with no lock held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VtEvent {
    /// The child set the window title (OSC 0/2).
    Title(String),
    /// The child rang the bell.
    Bell,
    /// Mouse tracking level or encoding changed; the host should start or
    /// stop forwarding the matching mouse events.
    MouseMode {
        mode: MouseMode,
        encoding: MouseEncoding,
    },
    /// Screen contents changed since the last draw; repaint when convenient.
    Redraw,
    /// The child exited and the PTY is closed.
    Closed,
}

/// Host callback registered with [`crate::Vt::attach`].
pub type EventHandler = Box<dyn FnMut(VtEvent) + Send>;
