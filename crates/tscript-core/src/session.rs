//! Session orchestration.
//!
//! Wires the pieces together in the order the terminal demands: snapshot
//! before any mutation, raw mode only once the pty and transcript exist,
//! restoration and the end marker on every exit path, reaping last.

use std::os::fd::AsFd;
use std::path::PathBuf;
use std::process::ExitStatus;

use tracing::{info, warn};

use crate::error::TscriptResult;
use crate::pty::PtySession;
use crate::relay::{Relay, Shutdown};
use crate::resize::{self, ResizeWatcher};
use crate::terminal::{RawModeGuard, TerminalSnapshot};
use crate::transcript::Transcript;

/// Knobs for a single recording session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Transcript output path.
    pub transcript_path: PathBuf,
    /// Shell override; `None` resolves `$SHELL`, then `/bin/sh`.
    pub shell: Option<String>,
}

/// What a finished session looked like.
#[derive(Debug)]
pub struct SessionSummary {
    /// Which direction closed first.
    pub shutdown: Shutdown,
    /// Exit status of the shell, when it was observed exiting.
    pub child_status: Option<ExitStatus>,
    /// Where the transcript was written.
    pub transcript_path: PathBuf,
}

/// Record one interactive session on the terminal behind `tty_in`/`tty_out`.
///
/// Blocks until the shell exits or terminal input reaches end-of-stream.
/// The terminal's saved attributes are reapplied and the transcript's end
/// marker is written even when the relay fails.
pub fn run<I, O>(tty_in: I, tty_out: O, options: &SessionOptions) -> TscriptResult<SessionSummary>
where
    I: AsFd,
    O: AsFd,
{
    let tty_in = tty_in.as_fd();
    let tty_out = tty_out.as_fd();

    let snapshot = TerminalSnapshot::capture(tty_in)?;
    resize::install_winch_handler()?;

    let mut pty = PtySession::spawn(&snapshot, options.shell.as_deref())?;

    let mut transcript = Transcript::create(&options.transcript_path)?;
    transcript.write_start_marker()?;

    let raw = RawModeGuard::enter(tty_in, &snapshot)?;
    let watcher = ResizeWatcher::new(tty_in, pty.master(), snapshot.geometry());
    let outcome = Relay::new(tty_in, tty_out, pty.master(), &mut transcript, Some(watcher)).run();

    // Restore the terminal before anything else so a failure below cannot
    // leave it raw.
    drop(raw);

    // Best effort even when the relay failed.
    if let Err(e) = transcript.finish() {
        warn!("could not finalize transcript: {e}");
    }

    let shutdown = outcome?;
    let child_status = match shutdown {
        Shutdown::ShellEof => match pty.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("could not reap shell: {e}");
                None
            }
        },
        // The master closes when `pty` drops; the hangup takes the shell
        // down without this process blocking on it.
        Shutdown::TerminalEof => None,
    };

    info!(?shutdown, transcript = %options.transcript_path.display(), "session finished");
    Ok(SessionSummary {
        shutdown,
        child_status,
        transcript_path: options.transcript_path.clone(),
    })
}
