//! The parent-side relay loop.
//!
//! Blocks in poll(2) over the real terminal's input and the pty master,
//! copying bytes terminal→master and master→terminal+transcript. End of
//! stream on either side is the one normal way a session ends; a wait
//! interrupted by the resize handler is retried, not reported.

use std::os::fd::{AsRawFd, BorrowedFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::{read, write};
use tracing::debug;

use crate::error::{TscriptError, TscriptResult};
use crate::resize::ResizeWatcher;
use crate::transcript::Transcript;

/// Relay buffer capacity; one stack buffer reused across iterations.
pub const BUF_SIZE: usize = 4096;

/// Which direction reported end-of-stream first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// End of input on the real terminal.
    TerminalEof,
    /// The shell exited and the master drained.
    ShellEof,
}

/// Byte pump between the real terminal and the pty master.
pub struct Relay<'a> {
    tty_in: BorrowedFd<'a>,
    tty_out: BorrowedFd<'a>,
    master: BorrowedFd<'a>,
    transcript: &'a mut Transcript,
    resize: Option<ResizeWatcher<'a>>,
}

impl<'a> Relay<'a> {
    pub fn new(
        tty_in: BorrowedFd<'a>,
        tty_out: BorrowedFd<'a>,
        master: BorrowedFd<'a>,
        transcript: &'a mut Transcript,
        resize: Option<ResizeWatcher<'a>>,
    ) -> Self {
        Self {
            tty_in,
            tty_out,
            master,
            transcript,
            resize,
        }
    }

    /// Run until one side reports end-of-stream or a fatal I/O error.
    pub fn run(&mut self) -> TscriptResult<Shutdown> {
        let mut buf = [0u8; BUF_SIZE];

        loop {
            // Drain any window change noticed since the last iteration
            // before blocking again.
            if let Some(watcher) = self.resize.as_mut() {
                watcher.propagate_pending()?;
            }

            let mut fds = [
                PollFd::new(self.tty_in, PollFlags::POLLIN),
                PollFd::new(self.master, PollFlags::POLLIN),
            ];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => {}
                // The resize handler interrupts the wait; retry.
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(TscriptError::Relay(format!("poll: {e}"))),
            }
            let tty_ready = ready(&fds[0]);
            let master_ready = ready(&fds[1]);

            if tty_ready {
                match read(self.tty_in.as_raw_fd(), &mut buf) {
                    Ok(0) => {
                        debug!("end of input on terminal");
                        return Ok(Shutdown::TerminalEof);
                    }
                    Ok(n) => write_exact(self.master, &buf[..n], "pty master")?,
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(TscriptError::Relay(format!("read terminal: {e}"))),
                }
            }

            if master_ready {
                match read(self.master.as_raw_fd(), &mut buf) {
                    Ok(0) => {
                        debug!("end of output on pty master");
                        return Ok(Shutdown::ShellEof);
                    }
                    Ok(n) => {
                        write_exact(self.tty_out, &buf[..n], "terminal")?;
                        self.transcript.write_bytes(&buf[..n])?;
                    }
                    // Linux masters report EIO once the shell is gone.
                    Err(Errno::EIO) => {
                        debug!("pty master hangup");
                        return Ok(Shutdown::ShellEof);
                    }
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(TscriptError::Relay(format!("read pty master: {e}"))),
                }
            }
        }
    }
}

/// POLLHUP/POLLERR are surfaced through the read path so end-of-stream is
/// observed there rather than special-cased here.
fn ready(fd: &PollFd) -> bool {
    fd.revents().is_some_and(|r| {
        r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
    })
}

fn write_exact(fd: BorrowedFd<'_>, data: &[u8], target: &'static str) -> TscriptResult<()> {
    let written =
        write(fd, data).map_err(|e| TscriptError::Relay(format!("write {target}: {e}")))?;
    if written != data.len() {
        return Err(TscriptError::ShortWrite {
            target,
            written,
            expected: data.len(),
        });
    }
    Ok(())
}
