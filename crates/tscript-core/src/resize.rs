//! Window-size change propagation.
//!
//! The SIGWINCH handler does the minimum an async handler may do: it stores
//! into a static flag. The relay loop drains the flag from its own thread,
//! queries the terminal's current geometry, and pushes it to the pty master
//! only when it actually changed.

use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::debug;

use crate::error::{TscriptError, TscriptResult};
use crate::terminal::{query_geometry, set_geometry, Geometry};

static WINCH_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_: libc::c_int) {
    WINCH_PENDING.store(true, Ordering::SeqCst);
}

/// Install the SIGWINCH handler. Call once, before the relay loop starts.
///
/// `SA_RESTART` keeps reads and writes transparent to the signal; poll(2)
/// is never restarted by the kernel, so the relay loop still sees `EINTR`
/// and retries.
pub fn install_winch_handler() -> TscriptResult<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigwinch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGWINCH, &action) }
        .map_err(|e| TscriptError::Setup(format!("sigaction SIGWINCH: {e}")))?;
    Ok(())
}

/// Tracks the last geometry successfully applied to the pty master and
/// forwards changes from the real terminal.
pub struct ResizeWatcher<'a> {
    tty: BorrowedFd<'a>,
    master: BorrowedFd<'a>,
    applied: Geometry,
}

impl<'a> ResizeWatcher<'a> {
    /// `applied` is the geometry the master was created with.
    pub fn new(tty: BorrowedFd<'a>, master: BorrowedFd<'a>, applied: Geometry) -> Self {
        Self {
            tty,
            master,
            applied,
        }
    }

    /// Handle a pending window-change notification, if any. Returns `true`
    /// when a new geometry was pushed to the master.
    pub fn propagate_pending(&mut self) -> TscriptResult<bool> {
        if !WINCH_PENDING.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        let current =
            query_geometry(self.tty).map_err(|e| TscriptError::Resize(e.to_string()))?;
        self.push_if_changed(current)
    }

    /// Push `current` to the master if it differs from the last applied
    /// geometry. The tracked state is updated only after a successful push,
    /// so a failure never leaves a stale value looking current.
    pub fn push_if_changed(&mut self, current: Geometry) -> TscriptResult<bool> {
        if current == self.applied {
            return Ok(false);
        }
        set_geometry(self.master, current)?;
        self.applied = current;
        debug!(rows = current.rows, cols = current.cols, "window size propagated");
        Ok(true)
    }

    /// Last geometry successfully applied to the master.
    pub fn applied(&self) -> Geometry {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn unchanged_geometry_is_not_pushed() {
        let ws = Geometry { rows: 24, cols: 80 }.to_winsize();
        let pty = nix::pty::openpty(Some(&ws), None).unwrap();
        let before = query_geometry(&pty.slave).unwrap();

        let mut watcher = ResizeWatcher::new(
            pty.slave.as_fd(),
            pty.master.as_fd(),
            Geometry { rows: 24, cols: 80 },
        );
        assert!(!watcher.push_if_changed(Geometry { rows: 24, cols: 80 }).unwrap());
        assert_eq!(query_geometry(&pty.slave).unwrap(), before);
    }

    #[test]
    fn changed_geometry_is_pushed_exactly_once() {
        let ws = Geometry { rows: 24, cols: 80 }.to_winsize();
        let pty = nix::pty::openpty(Some(&ws), None).unwrap();

        let mut watcher = ResizeWatcher::new(
            pty.slave.as_fd(),
            pty.master.as_fd(),
            Geometry { rows: 24, cols: 80 },
        );
        let new = Geometry { rows: 50, cols: 132 };
        assert!(watcher.push_if_changed(new).unwrap());
        assert_eq!(query_geometry(&pty.slave).unwrap(), new);
        assert_eq!(watcher.applied(), new);

        // A repeat notification with the same size is suppressed.
        assert!(!watcher.push_if_changed(new).unwrap());
    }
}
