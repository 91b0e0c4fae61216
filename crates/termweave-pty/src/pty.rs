//! PTY binding: spawn a child on a pseudo-terminal and expose the raw
//! read/write/resize/close surface the VT shell builds on.
//!
//! Built on `portable-pty`, which places the child in its own session with
//! the PTY as controlling terminal. The read side is handed to the reader
//! thread once; the write side is independently locked so host input never
//! contends with the screen mutex.

use std::io::{self, Read, Write};
use std::sync::Mutex;

use portable_pty::{Child, CommandBuilder, ExitStatus, MasterPty, PtySize, native_pty_system};
use tracing::debug;

use crate::lock;

/// A live PTY with the child process attached to its slave side.
pub struct Pty {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
}

impl std::fmt::Debug for Pty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pty").finish_non_exhaustive()
    }
}

impl Pty {
    /// Spawn `cmd` with `args` and `env` on a fresh PTY of the given size.
    ///
    /// `term` lands in the child's environment as `TERM`. Returns the PTY
    /// handle plus the blocking read side for the reader thread.
    pub fn spawn(
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        term: &str,
        cols: u16,
        rows: u16,
    ) -> io::Result<(Self, Box<dyn Read + Send>)> {
        let mut builder = CommandBuilder::new(cmd);
        builder.args(args);
        builder.env("TERM", term);
        for (key, value) in env {
            builder.env(key, value);
        }

        let pair = native_pty_system()
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(pty_error)?;
        let child = pair.slave.spawn_command(builder).map_err(pty_error)?;
        let reader = pair.master.try_clone_reader().map_err(pty_error)?;
        let writer = pair.master.take_writer().map_err(pty_error)?;

        debug!(cmd, cols, rows, "spawned child on pty");

        Ok((
            Self {
                master: Mutex::new(pair.master),
                writer: Mutex::new(writer),
                child: Mutex::new(child),
            },
            reader,
        ))
    }

    /// Write bytes to the child, best effort, flushing immediately.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut writer = lock(&self.writer);
        writer.write_all(bytes)?;
        writer.flush()
    }

    /// Propagate a new window size to the PTY (and the child via SIGWINCH).
    pub fn resize(&self, cols: u16, rows: u16) -> io::Result<()> {
        lock(&self.master)
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(pty_error)
    }

    /// Kill the child if it is still running. The PTY read side sees EOF
    /// once the child is gone.
    pub fn kill(&self) {
        let _ = lock(&self.child).kill();
    }

    /// Reap the child, returning its exit status.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        lock(&self.child).wait()
    }
}

fn pty_error<E: std::fmt::Display>(err: E) -> io::Error {
    io::Error::other(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn read_all_with_timeout(reader: &mut dyn Read, timeout: Duration) -> Vec<u8> {
        // The PTY read side blocks, so drain until EOF; the child exits on
        // its own in these tests.
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        while Instant::now() < deadline {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
            }
        }
        out
    }

    #[cfg(unix)]
    #[test]
    fn spawn_captures_child_output() {
        let (pty, mut reader) = Pty::spawn(
            "sh",
            &["-c".to_string(), "printf hello-vt".to_string()],
            &[],
            "xterm-256color",
            80,
            24,
        )
        .expect("spawn");
        let status = pty.wait().expect("wait");
        assert!(status.success());
        let output = read_all_with_timeout(reader.as_mut(), Duration::from_secs(5));
        assert!(
            output.windows(8).any(|w| w == b"hello-vt"),
            "missing output: {output:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn term_is_set_in_child_env() {
        let (pty, mut reader) = Pty::spawn(
            "sh",
            &["-c".to_string(), "printf %s \"$TERM\"".to_string()],
            &[],
            "xterm-256color",
            80,
            24,
        )
        .expect("spawn");
        let _ = pty.wait().expect("wait");
        let output = read_all_with_timeout(reader.as_mut(), Duration::from_secs(5));
        assert!(
            output.windows(14).any(|w| w == b"xterm-256color"),
            "TERM not set: {output:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn extra_env_reaches_child() {
        let (pty, mut reader) = Pty::spawn(
            "sh",
            &["-c".to_string(), "printf %s \"$VT_MARKER\"".to_string()],
            &[("VT_MARKER".to_string(), "present".to_string())],
            "xterm-256color",
            80,
            24,
        )
        .expect("spawn");
        let _ = pty.wait().expect("wait");
        let output = read_all_with_timeout(reader.as_mut(), Duration::from_secs(5));
        assert!(output.windows(7).any(|w| w == b"present"));
    }

    #[cfg(unix)]
    #[test]
    fn write_reaches_child_stdin() {
        let (pty, mut reader) = Pty::spawn(
            "sh",
            &["-c".to_string(), "read line; printf got-%s \"$line\"".to_string()],
            &[],
            "xterm-256color",
            80,
            24,
        )
        .expect("spawn");
        pty.write_all(b"ping\r").expect("write");
        let _ = pty.wait().expect("wait");
        let output = read_all_with_timeout(reader.as_mut(), Duration::from_secs(5));
        assert!(
            output.windows(8).any(|w| w == b"got-ping"),
            "missing echo: {output:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn kill_terminates_child() {
        let (pty, _reader) = Pty::spawn(
            "sh",
            &["-c".to_string(), "sleep 30".to_string()],
            &[],
            "xterm-256color",
            80,
            24,
        )
        .expect("spawn");
        pty.kill();
        let status = pty.wait().expect("wait");
        assert!(!status.success());
    }
}
