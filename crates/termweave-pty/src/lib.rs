#![forbid(unsafe_code)]

//! PTY-backed virtual terminal.
//!
//! `termweave-pty` is the concurrency shell around [`termweave_core`]: it
//! spawns a child process on a pseudo-terminal, feeds the child's output
//! through the parser and interpreter on a background thread, and gives the
//! host a small façade, [`Vt`], to draw cells, deliver input, and receive
//! events.
//!
//! # Modules
//!
//! - [`vt`]: the [`Vt`] façade; start/resize/draw/handle_event/close.
//! - [`pty`]: PTY spawn, read/write/resize, child lifecycle.
//! - [`input`]: key, paste, and mouse encoding toward the child.
//! - [`events`]: [`VtEvent`] notifications toward the host.
//! - [`surface`]: the host-implemented drawing target.
//!
//! # Concurrency
//!
//! One reader thread owns the PTY read side and applies sequences to the
//! screen under its mutex; one timer thread coalesces redraw notifications
//! at the configured interval; the host thread drives everything else. The
//! event handler is always invoked with no lock held.

pub mod events;
pub mod input;
pub mod pty;
pub mod surface;
pub mod vt;

use std::io;
use std::sync::{Mutex, MutexGuard};

pub use events::{EventHandler, VtEvent};
pub use input::{
    encode_mouse, encode_paste, HostEvent, Key, KeyEvent, KeyModifiers, KeyTable, MouseButton,
    MouseEvent, MouseEventKind,
};
pub use pty::Pty;
pub use surface::Surface;
pub use vt::{Vt, VtConfig};

pub use termweave_core as core;

/// Errors surfaced to the host. Parser-level problems never appear here;
/// malformed child output is silently discarded by design.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation needed a live child but none is attached.
    #[error("no child is running")]
    NotRunning,
    /// `start` was called while a child is still attached.
    #[error("a child is already running")]
    AlreadyRunning,
    /// The child could not be created.
    #[error("failed to spawn child")]
    SpawnFailed(#[source] io::Error),
    /// A write toward the child failed; the screen was not touched.
    #[error("pty write failed")]
    WriteFailed(#[source] io::Error),
    /// The PTY rejected a window-size change.
    #[error("pty resize failed")]
    ResizeFailed(#[source] io::Error),
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
