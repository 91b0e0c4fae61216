//! The `Vt` façade: a child process, a screen, and the threads between.
//!
//! One reader thread parses PTY output and applies it to the screen under
//! its mutex; one timer thread coalesces redraw notifications; the host
//! thread calls everything else. The event handler always runs with no
//! lock held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use termweave_core::{
    CursorShape, Effect, Interpreter, Modes, Screen, SequenceReader, DEFAULT_SCROLLBACK,
};

use crate::events::{EventHandler, VtEvent};
use crate::input::{encode_mouse, encode_paste, HostEvent, KeyTable};
use crate::pty::Pty;
use crate::surface::Surface;
use crate::{lock, Error};

/// Construction-time options.
#[derive(Debug, Clone)]
pub struct VtConfig {
    /// Value of `TERM` in the child's environment.
    pub term: String,
    /// When false, OSC 8 hyperlinks are stripped from cell styles.
    pub osc8: bool,
    /// Redraw coalescing interval for [`VtEvent::Redraw`].
    pub poll_interval: Duration,
    /// Cap on primary-grid scrollback lines.
    pub scrollback_lines: usize,
    /// Key capability table used to encode input.
    pub key_table: KeyTable,
}

impl Default for VtConfig {
    fn default() -> Self {
        Self {
            term: "xterm-256color".to_string(),
            osc8: true,
            poll_interval: Duration::from_millis(8),
            scrollback_lines: DEFAULT_SCROLLBACK,
            key_table: KeyTable::default(),
        }
    }
}

impl VtConfig {
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_osc8(mut self, enabled: bool) -> Self {
        self.osc8 = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_scrollback_lines(mut self, lines: usize) -> Self {
        self.scrollback_lines = lines;
        self
    }

    pub fn with_key_table(mut self, table: KeyTable) -> Self {
        self.key_table = table;
        self
    }
}

/// Threads and handles that exist only while a child runs.
struct Running {
    pty: Arc<Pty>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

/// A virtual terminal bound to (at most) one child process.
pub struct Vt {
    config: VtConfig,
    screen: Arc<Mutex<Screen>>,
    handler: Arc<Mutex<Option<EventHandler>>>,
    surface: Option<Box<dyn Surface>>,
    /// Redraw already announced and not yet drawn.
    redraw_posted: Arc<AtomicBool>,
    running: Option<Running>,
}

impl Default for Vt {
    fn default() -> Self {
        Self::new()
    }
}

impl Vt {
    /// A terminal with default configuration: 80x24 until resized, cursor
    /// visible, primary grid, no child yet.
    pub fn new() -> Self {
        Self::with_config(VtConfig::default())
    }

    pub fn with_config(config: VtConfig) -> Self {
        let mut screen = Screen::with_scrollback(80, 24, config.scrollback_lines);
        screen.osc8_enabled = config.osc8;
        Self {
            config,
            screen: Arc::new(Mutex::new(screen)),
            handler: Arc::new(Mutex::new(None)),
            surface: None,
            redraw_posted: Arc::new(AtomicBool::new(false)),
            running: None,
        }
    }

    /// Register the host's drawing target. The next [`Vt::start`] sizes
    /// the PTY from it.
    pub fn set_surface(&mut self, surface: Box<dyn Surface>) {
        self.surface = Some(surface);
    }

    /// Register the event callback. It is invoked from background threads
    /// with no lock held.
    pub fn attach(&mut self, handler: impl FnMut(VtEvent) + Send + 'static) {
        *lock(&self.handler) = Some(Box::new(handler));
    }

    /// Drop the event callback; subsequent events are discarded.
    pub fn detach(&mut self) {
        *lock(&self.handler) = None;
    }

    /// Spawn `cmd` on a fresh PTY and begin interpreting its output.
    /// Returns once the child is running.
    pub fn start(
        &mut self,
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<(), Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let (cols, rows) = match self.surface.as_ref() {
            Some(surface) => surface.size(),
            None => {
                let screen = lock(&self.screen);
                (screen.width(), screen.height())
            }
        };

        let (pty, raw_reader) = Pty::spawn(cmd, args, env, &self.config.term, cols, rows)
            .map_err(Error::SpawnFailed)?;
        let pty = Arc::new(pty);
        lock(&self.screen).resize(cols, rows);

        let shutdown = Arc::new(AtomicBool::new(false));

        let reader = {
            let screen = Arc::clone(&self.screen);
            let handler = Arc::clone(&self.handler);
            let pty = Arc::clone(&pty);
            thread::spawn(move || {
                let mut sequences = SequenceReader::new(raw_reader);
                let mut interpreter = Interpreter::new();
                let mut effects = Vec::new();
                while let Some(seq) = sequences.next_sequence() {
                    trace!(?seq, "applying sequence");
                    {
                        let mut screen = lock(&screen);
                        interpreter.apply(&mut screen, seq, &mut effects);
                    }
                    for effect in effects.drain(..) {
                        match effect {
                            Effect::Reply(bytes) => {
                                let _ = pty.write_all(&bytes);
                            }
                            Effect::Bell => post(&handler, VtEvent::Bell),
                            Effect::Title(title) => post(&handler, VtEvent::Title(title)),
                            Effect::MouseMode(mode, encoding) => {
                                post(&handler, VtEvent::MouseMode { mode, encoding });
                            }
                        }
                    }
                }
                // EOF: the child is gone. Reap it, then tell the host.
                let status = pty.wait();
                debug!(?status, "child exited, reader done");
                post(&handler, VtEvent::Closed);
            })
        };

        let poller = {
            let screen = Arc::clone(&self.screen);
            let handler = Arc::clone(&self.handler);
            let shutdown = Arc::clone(&shutdown);
            let redraw_posted = Arc::clone(&self.redraw_posted);
            let interval = self.config.poll_interval;
            thread::spawn(move || {
                while !shutdown.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    let needs_redraw = lock(&screen).redraw_needed();
                    if needs_redraw && !redraw_posted.swap(true, Ordering::SeqCst) {
                        post(&handler, VtEvent::Redraw);
                    }
                }
            })
        };

        self.running = Some(Running {
            pty,
            shutdown,
            reader: Some(reader),
            poller: Some(poller),
        });
        Ok(())
    }

    /// Kill the child, close the PTY, and wait for the reader to finish.
    /// [`VtEvent::Closed`] is emitted by the reader on the way out.
    /// Idempotent.
    pub fn close(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        running.pty.kill();
        running.shutdown.store(true, Ordering::Relaxed);
        if let Some(reader) = running.reader.take() {
            let _ = reader.join();
        }
        if let Some(poller) = running.poller.take() {
            let _ = poller.join();
        }
    }

    /// Whether a child is currently attached.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Resize the grids and propagate the new size to the PTY.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), Error> {
        lock(&self.screen).resize(cols, rows);
        if let Some(running) = self.running.as_ref() {
            running
                .pty
                .resize(cols, rows)
                .map_err(Error::ResizeFailed)?;
        }
        Ok(())
    }

    /// Deliver a host input event. Returns whether it was consumed.
    pub fn handle_event(&mut self, event: &HostEvent) -> Result<bool, Error> {
        let pty = self
            .running
            .as_ref()
            .map(|r| Arc::clone(&r.pty))
            .ok_or(Error::NotRunning)?;

        let bytes = match event {
            HostEvent::Key(key) => {
                let modes = lock(&self.screen).modes;
                if modes.contains(Modes::KAM) {
                    // Keyboard action mode locks the keyboard.
                    return Ok(false);
                }
                self.config.key_table.encode(*key, modes)
            }
            HostEvent::Paste(text) => {
                let modes = lock(&self.screen).modes;
                encode_paste(text, modes)
            }
            HostEvent::Mouse(mouse) => {
                let screen = lock(&self.screen);
                match encode_mouse(*mouse, &screen) {
                    Some(bytes) => bytes,
                    None => return Ok(false),
                }
            }
        };
        if bytes.is_empty() {
            return Ok(false);
        }
        pty.write_all(&bytes).map_err(Error::WriteFailed)?;
        Ok(true)
    }

    /// Paint the active grid onto the registered surface and clear dirty
    /// state. A no-op without a surface.
    pub fn draw(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let mut screen = lock(&self.screen);
        for row in 0..screen.height() {
            let Some(line) = screen.line(row) else {
                continue;
            };
            let mut col = 0u16;
            while (col as usize) < line.cells.len() {
                let cell = &line.cells[col as usize];
                surface.set_content(col, row, cell.rune(), &cell.style);
                col += u16::from(cell.width().max(1));
            }
        }
        screen.clear_dirty();
        self.redraw_posted.store(false, Ordering::SeqCst);
    }

    /// Cursor position, shape, and visibility, read atomically.
    pub fn cursor(&self) -> (u16, u16, CursorShape, bool) {
        let screen = lock(&self.screen);
        (
            screen.cursor.row,
            screen.cursor.col,
            screen.cursor.shape,
            screen.cursor_visible(),
        )
    }

    /// Debugging snapshot of the active grid.
    pub fn string(&self) -> String {
        lock(&self.screen).text()
    }

    /// Run `f` against the screen under its mutex. For host-side state
    /// inspection (modes, title, scrollback).
    pub fn with_screen<T>(&self, f: impl FnOnce(&Screen) -> T) -> T {
        f(&lock(&self.screen))
    }
}

impl Drop for Vt {
    fn drop(&mut self) {
        self.close();
    }
}

fn post(handler: &Arc<Mutex<Option<EventHandler>>>, event: VtEvent) {
    let mut guard = lock(handler);
    if let Some(callback) = guard.as_mut() {
        callback(event);
    }
}
