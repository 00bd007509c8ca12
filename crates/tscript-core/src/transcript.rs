//! Transcript file: the raw shell-output stream bracketed by two
//! wall-clock marker lines.
//!
//! Everything between the markers is written verbatim by the relay loop;
//! the file carries no framing beyond the two bookend lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::error::{TscriptError, TscriptResult};

/// Marker timestamp format, e.g. `14:23:05`.
const MARKER_TIME_FORMAT: &str = "%H:%M:%S";

/// Owner and group read-write.
const TRANSCRIPT_MODE: u32 = 0o660;

/// Append-only transcript, created fresh (truncating any prior file) at
/// session start and closed exactly once via [`Transcript::finish`].
pub struct Transcript {
    file: File,
    path: PathBuf,
}

impl Transcript {
    /// Create (or truncate) the transcript file.
    pub fn create(path: &Path) -> TscriptResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(TRANSCRIPT_MODE)
            .open(path)
            .map_err(|e| TscriptError::Transcript(format!("open {}: {e}", path.display())))?;
        debug!(path = %path.display(), "transcript created");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the opening marker line with the current wall-clock time.
    pub fn write_start_marker(&mut self) -> TscriptResult<()> {
        let line = format!(
            "Script started on {}\n",
            Local::now().format(MARKER_TIME_FORMAT)
        );
        self.write_bytes(line.as_bytes())
    }

    /// Append relayed shell-output bytes verbatim. A short write is fatal:
    /// the transcript must never silently drop bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> TscriptResult<()> {
        let written = self
            .file
            .write(data)
            .map_err(|e| TscriptError::Transcript(format!("write: {e}")))?;
        if written != data.len() {
            return Err(TscriptError::ShortWrite {
                target: "transcript",
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    /// Write the closing marker line and close the file.
    pub fn finish(mut self) -> TscriptResult<()> {
        let line = format!(
            "Script done on {}\n",
            Local::now().format(MARKER_TIME_FORMAT)
        );
        self.write_bytes(line.as_bytes())?;
        self.file
            .flush()
            .map_err(|e| TscriptError::Transcript(format!("flush: {e}")))?;
        debug!(path = %self.path.display(), "transcript finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn markers_bracket_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typescript");

        let mut transcript = Transcript::create(&path).unwrap();
        transcript.write_start_marker().unwrap();
        transcript.write_bytes(b"ls\r\nfile-a  file-b\r\n").unwrap();
        transcript.finish().unwrap();

        let content = std::fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&content);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Script started on "));
        assert!(text.contains("ls\r\nfile-a  file-b\r\n"));
        assert!(text.lines().last().unwrap().starts_with("Script done on "));
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typescript");
        std::fs::write(&path, b"stale contents").unwrap();

        let transcript = Transcript::create(&path).unwrap();
        drop(transcript);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn transcript_mode_excludes_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typescript");
        let _transcript = Transcript::create(&path).unwrap();
        // The requested mode is 0660; the umask may narrow it further but
        // never widen it.
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o007, 0);
        assert_eq!(mode & 0o600, 0o600);
    }
}
