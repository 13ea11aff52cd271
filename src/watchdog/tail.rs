// src/watchdog/tail.rs

//! Follow a growing log file, line by line.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Create the log file (and its parent directories) if it does not exist.
///
/// Existing content is left untouched.
pub async fn ensure_log_file(path: &Path) -> io::Result<()> {
    if fs::try_exists(path).await? {
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    info!(path = %path.display(), "touched new log file");
    Ok(())
}

/// Read cursor over a log file that another process appends to.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    partial: Vec<u8>,
}

impl LogTail {
    /// Open `path` positioned at its current end; older content is skipped.
    pub async fn open_at_end(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut file = File::open(&path).await?;
        let offset = file.seek(SeekFrom::End(0)).await?;
        debug!(path = %path.display(), offset, "log tail attached");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            partial: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next complete line appended since the previous call.
    ///
    /// Returns `Ok(None)` when no complete line is available yet; a trailing
    /// fragment without a newline is kept until the rest arrives.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.partial).await?;
            if n == 0 {
                self.follow_truncation().await?;
                return Ok(None);
            }
            self.offset += n as u64;

            if self.partial.last() == Some(&b'\n') {
                let raw = std::mem::take(&mut self.partial);
                let line = String::from_utf8_lossy(&raw);
                return Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()));
            }
        }
    }

    /// Start over from the beginning when the file at our path got shorter
    /// than what we already read (truncated or recreated by the writer).
    async fn follow_truncation(&mut self) -> io::Result<()> {
        let len = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if len < self.offset {
            info!(
                path = %self.path.display(),
                previous_offset = self.offset,
                len,
                "log file was truncated; following from the start"
            );
            self.reader = BufReader::new(File::open(&self.path).await?);
            self.offset = 0;
            self.partial.clear();
        }
        Ok(())
    }
}

/// Spawn the background task that pushes every new line of `tail` into
/// `lines`.
///
/// The task checks for new content every `interval` and ends on its own once
/// the receiving side is dropped.
pub fn spawn_tail(
    mut tail: LogTail,
    lines: mpsc::Sender<String>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if lines.is_closed() {
                break;
            }

            match tail.next_line().await {
                Ok(Some(line)) => {
                    if lines.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => sleep(interval).await,
                Err(e) => {
                    warn!(
                        path = %tail.path().display(),
                        error = %e,
                        "failed to read log file; tail stopped"
                    );
                    break;
                }
            }
        }
        debug!(path = %tail.path().display(), "log tail ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn skips_existing_content_and_reads_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        std::fs::write(&path, "old line\n").unwrap();

        let mut tail = LogTail::open_at_end(&path).await.unwrap();
        assert_eq!(tail.next_line().await.unwrap(), None);

        append(&path, "first\r\nsecond\n");
        assert_eq!(tail.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(tail.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(tail.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_lines_wait_for_their_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        std::fs::write(&path, "").unwrap();

        let mut tail = LogTail::open_at_end(&path).await.unwrap();
        append(&path, "Launching bug");
        assert_eq!(tail.next_line().await.unwrap(), None);

        append(&path, " reporter\n");
        assert_eq!(
            tail.next_line().await.unwrap().as_deref(),
            Some("Launching bug reporter")
        );
    }

    #[tokio::test]
    async fn truncated_file_is_followed_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        std::fs::write(&path, "a fairly long line from a previous run\n").unwrap();

        let mut tail = LogTail::open_at_end(&path).await.unwrap();
        std::fs::write(&path, "fresh\n").unwrap();

        // First poll notices the truncation, second one reads the new content.
        assert_eq!(tail.next_line().await.unwrap(), None);
        assert_eq!(tail.next_line().await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn ensure_log_file_creates_parents_and_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/engine.log");

        ensure_log_file(&path).await.unwrap();
        assert!(path.is_file());

        std::fs::write(&path, "keep me\n").unwrap();
        ensure_log_file(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me\n");
    }
}
