//! Real-terminal state: attribute snapshot, window geometry, and a raw-mode
//! guard that restores the saved attributes on drop.
//!
//! The snapshot is taken once, before any mode change, and serves two
//! masters: it seeds the pty slave so the shell inherits the user's terminal
//! modes, and it is the restore target for every exit path.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::sys::termios::{self, SetArg, Termios};
use tracing::{debug, error};

use crate::error::{TscriptError, TscriptResult};

/// Terminal window geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u16,
    pub cols: u16,
}

impl Geometry {
    pub(crate) fn to_winsize(self) -> nix::pty::Winsize {
        nix::pty::Winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

/// Immutable copy of the controlling terminal's mode attributes and
/// geometry, captured before any mutation.
#[derive(Debug, Clone)]
pub struct TerminalSnapshot {
    attrs: Termios,
    geometry: Geometry,
}

impl TerminalSnapshot {
    /// Query the terminal behind `fd`. Fails if `fd` is not a terminal or
    /// either query fails; performs no writes.
    pub fn capture<Fd: AsFd>(fd: Fd) -> TscriptResult<Self> {
        let fd = fd.as_fd();
        let attrs = termios::tcgetattr(fd)
            .map_err(|e| TscriptError::TerminalQuery(format!("tcgetattr: {e}")))?;
        let geometry = query_geometry(fd)?;
        debug!(rows = geometry.rows, cols = geometry.cols, "captured terminal state");
        Ok(Self { attrs, geometry })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub(crate) fn attrs(&self) -> &Termios {
        &self.attrs
    }
}

/// Read the current window size of the terminal behind `fd`.
pub fn query_geometry<Fd: AsFd>(fd: Fd) -> TscriptResult<Geometry> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(fd.as_fd().as_raw_fd(), libc::TIOCGWINSZ, &mut ws) };
    if rc == -1 {
        return Err(TscriptError::TerminalQuery(format!(
            "TIOCGWINSZ: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(Geometry {
        rows: ws.ws_row,
        cols: ws.ws_col,
    })
}

/// Push a window size onto the terminal (or pty master) behind `fd`.
pub fn set_geometry<Fd: AsFd>(fd: Fd, geometry: Geometry) -> TscriptResult<()> {
    let ws = geometry.to_winsize();
    let rc = unsafe { libc::ioctl(fd.as_fd().as_raw_fd(), libc::TIOCSWINSZ, &ws) };
    if rc == -1 {
        return Err(TscriptError::Resize(format!(
            "TIOCSWINSZ: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// RAII guard holding the terminal in raw mode.
///
/// Entered exactly once per session. Drop reapplies the snapshot's
/// attributes no matter how the session ends; a failed restore is reported
/// but cannot block process exit.
pub struct RawModeGuard<'a> {
    fd: BorrowedFd<'a>,
    saved: Termios,
}

impl<'a> RawModeGuard<'a> {
    /// Switch the terminal behind `fd` to raw mode (no line buffering, no
    /// echo, no signal characters interpreted by the driver).
    pub fn enter(fd: BorrowedFd<'a>, snapshot: &TerminalSnapshot) -> TscriptResult<Self> {
        let mut raw = snapshot.attrs().clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(fd, SetArg::TCSANOW, &raw)
            .map_err(|e| TscriptError::Setup(format!("tcsetattr raw: {e}")))?;
        debug!("terminal switched to raw mode");
        Ok(Self {
            fd,
            saved: snapshot.attrs().clone(),
        })
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(self.fd, SetArg::TCSANOW, &self.saved) {
            error!("failed to restore terminal attributes: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::termios::LocalFlags;

    fn scratch_pty() -> nix::pty::OpenptyResult {
        let ws = Geometry { rows: 24, cols: 80 }.to_winsize();
        nix::pty::openpty(Some(&ws), None).expect("openpty")
    }

    #[test]
    fn capture_reads_geometry() {
        let pty = scratch_pty();
        let snapshot = TerminalSnapshot::capture(&pty.slave).unwrap();
        assert_eq!(snapshot.geometry(), Geometry { rows: 24, cols: 80 });
    }

    #[test]
    fn capture_fails_on_non_terminal() {
        let file = tempfile::tempfile().unwrap();
        let err = TerminalSnapshot::capture(&file).unwrap_err();
        assert!(matches!(err, TscriptError::TerminalQuery(_)));
    }

    #[test]
    fn set_geometry_round_trips() {
        let pty = scratch_pty();
        let new = Geometry { rows: 50, cols: 132 };
        set_geometry(&pty.master, new).unwrap();
        assert_eq!(query_geometry(&pty.slave).unwrap(), new);
    }

    #[test]
    fn raw_mode_clears_canonical_flags_and_restores() {
        let pty = scratch_pty();
        let snapshot = TerminalSnapshot::capture(&pty.slave).unwrap();
        let before = termios::tcgetattr(&pty.slave).unwrap();
        assert!(before.local_flags.contains(LocalFlags::ICANON));

        {
            let _guard = RawModeGuard::enter(pty.slave.as_fd(), &snapshot).unwrap();
            let raw = termios::tcgetattr(&pty.slave).unwrap();
            assert!(!raw.local_flags.contains(LocalFlags::ICANON));
            assert!(!raw.local_flags.contains(LocalFlags::ECHO));
        }

        let after = termios::tcgetattr(&pty.slave).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
        assert_eq!(after.input_flags, before.input_flags);
        assert_eq!(after.output_flags, before.output_flags);
        assert_eq!(after.control_flags, before.control_flags);
    }
}
