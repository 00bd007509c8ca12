use thiserror::Error;

/// Errors produced by the session engine.
#[derive(Debug, Error)]
pub enum TscriptError {
    #[error("terminal query failed: {0}")]
    TerminalQuery(String),

    #[error("session setup failed: {0}")]
    Setup(String),

    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("relay I/O failed: {0}")]
    Relay(String),

    #[error("short write to {target}: wrote {written} of {expected} bytes")]
    ShortWrite {
        target: &'static str,
        written: usize,
        expected: usize,
    },

    #[error("resize propagation failed: {0}")]
    Resize(String),

    #[error("transcript write failed: {0}")]
    Transcript(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TscriptResult<T> = Result<T, TscriptError>;
