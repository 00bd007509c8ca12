//! PTY allocation and shell spawning.
//!
//! The master/slave pair is opened already carrying the captured terminal
//! attributes and geometry, so the shell inherits the user's modes from its
//! first read. The child becomes a session leader with the slave as its
//! controlling terminal before exec.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};

use nix::pty::openpty;
use tracing::info;

use crate::error::{TscriptError, TscriptResult};
use crate::terminal::TerminalSnapshot;

const DEFAULT_SHELL: &str = "/bin/sh";

/// A live pty session: the master side plus the spawned shell.
///
/// The parent owns only the master and the child handle; the slave is
/// closed here as soon as the child holds it.
pub struct PtySession {
    master: OwnedFd,
    slave_path: Option<PathBuf>,
    child: Child,
}

impl PtySession {
    /// Allocate a pty pair seeded with `snapshot` and exec the shell in a
    /// child connected to the slave.
    ///
    /// `shell` overrides the environment; otherwise `$SHELL` is used,
    /// falling back to `/bin/sh` when unset or empty. Allocation or spawn
    /// failure is fatal to the whole session.
    pub fn spawn(snapshot: &TerminalSnapshot, shell: Option<&str>) -> TscriptResult<Self> {
        let winsize = snapshot.geometry().to_winsize();
        let pty = openpty(Some(&winsize), Some(snapshot.attrs()))
            .map_err(|e| TscriptError::Spawn(format!("openpty: {e}")))?;

        let slave_path = slave_name(&pty.master);
        let shell = resolve_shell(shell);
        let slave_fd = pty.slave.as_raw_fd();

        // New session, adopt the slave as controlling terminal, wire it up
        // as stdio, then exec. Runs in the child between fork and exec.
        let child = unsafe {
            Command::new(&shell)
                .pre_exec(move || {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    if libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0) == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    for target in 0..=2 {
                        if libc::dup2(slave_fd, target) == -1 {
                            return Err(std::io::Error::last_os_error());
                        }
                    }
                    if slave_fd > 2 {
                        libc::close(slave_fd);
                    }
                    Ok(())
                })
                .spawn()
                .map_err(|e| TscriptError::Spawn(format!("exec {shell}: {e}")))?
        };

        drop(pty.slave);
        info!(shell = %shell, pid = child.id(), slave = ?slave_path, "shell spawned on pty slave");

        Ok(Self {
            master: pty.master,
            slave_path,
            child,
        })
    }

    /// The master descriptor, for the relay loop and resize pushes.
    pub fn master(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }

    /// Pathname of the slave device, when the platform reports one.
    pub fn slave_path(&self) -> Option<&Path> {
        self.slave_path.as_deref()
    }

    /// Process id of the shell.
    pub fn child_id(&self) -> u32 {
        self.child.id()
    }

    /// Reap the shell. Call after the master has reported end-of-stream;
    /// the child is already gone and this returns promptly.
    pub fn wait(&mut self) -> TscriptResult<ExitStatus> {
        let status = self.child.wait()?;
        info!(%status, "shell exited");
        Ok(status)
    }
}

fn resolve_shell(overridden: Option<&str>) -> String {
    match overridden {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
    }
}

fn slave_name(master: &OwnedFd) -> Option<PathBuf> {
    let mut buf = [0u8; 128];
    let rc = unsafe {
        libc::ptsname_r(
            master.as_raw_fd(),
            buf.as_mut_ptr().cast::<libc::c_char>(),
            buf.len(),
        )
    };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0)?;
    let name = std::str::from_utf8(&buf[..end]).ok()?;
    Some(PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_shell_prefers_override() {
        assert_eq!(resolve_shell(Some("/bin/dash")), "/bin/dash");
    }

    #[test]
    fn resolve_shell_ignores_empty_override() {
        let resolved = resolve_shell(Some(""));
        assert!(resolved.starts_with('/'), "got: {resolved}");
    }

    #[test]
    fn resolve_shell_falls_back_to_a_path() {
        let resolved = resolve_shell(None);
        assert!(resolved.starts_with('/'), "got: {resolved}");
    }

    #[test]
    fn slave_name_reports_a_device_path() {
        let ws = nix::pty::Winsize {
            ws_row: 24,
            ws_col: 80,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let pty = nix::pty::openpty(Some(&ws), None).unwrap();
        let name = slave_name(&pty.master).unwrap();
        assert!(name.starts_with("/dev"), "got: {}", name.display());
    }
}
