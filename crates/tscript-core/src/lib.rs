//! tscript-core: session engine for the tscript terminal recorder.
//!
//! Interposes a pty pair between the real terminal and a spawned shell,
//! relays bytes in both directions, logs everything the shell produces to
//! a transcript file, propagates window-size changes, and restores the
//! terminal's saved mode on every exit path.

pub mod error;
pub mod pty;
pub mod relay;
pub mod resize;
pub mod session;
pub mod terminal;
pub mod transcript;

// Re-export commonly used items at crate root.
pub use error::{TscriptError, TscriptResult};
pub use pty::PtySession;
pub use relay::{Relay, Shutdown};
pub use resize::ResizeWatcher;
pub use session::{SessionOptions, SessionSummary};
pub use terminal::{Geometry, RawModeGuard, TerminalSnapshot};
pub use transcript::Transcript;
