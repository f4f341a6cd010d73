//! Retrying text and file transfers.
//!
//! The engine wraps a `Transport` with:
//! - bounded retry with a fixed delay on connection/timeout failures
//! - HEAD-based size probing and skip-if-complete for file downloads
//! - adaptive block sizes for streaming writes
//! - byte-count and archive integrity checks on finished downloads

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::headers::HeaderSet;
use super::http::{Transport, TransportError};
use super::progress::{NoProgress, TransferProgress};
use crate::cache::check_archive;
use crate::config::RetrieverConfig;
use crate::error::{FetchError, FetchResult};

/// Choose the streaming block size from the declared content length.
///
/// Scales from 1 KiB for small files up to 4 MiB for files of 256 MiB and
/// more.
pub fn block_size(total_size: u64) -> usize {
    if total_size >> 28 != 0 {
        0x40_0000
    } else if total_size >> 24 != 0 {
        0x8_0000
    } else if total_size >> 20 != 0 {
        0x1_0000
    } else if total_size >> 16 != 0 {
        0x2000
    } else {
        0x400
    }
}

/// What `fetch_to_file` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was transferred from the network.
    Downloaded { bytes: u64 },
    /// A complete file was already at the destination.
    AlreadyPresent { bytes: u64 },
}

impl FileOutcome {
    /// Size of the file now at the destination.
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Downloaded { bytes } | Self::AlreadyPresent { bytes } => *bytes,
        }
    }
}

/// Outcome of one failed attempt.
enum Attempt {
    /// Network trouble; try again after the delay.
    Retry(String),
    /// Give up immediately.
    Fail(FetchError),
}

fn from_transport(url: &str, err: TransportError) -> Attempt {
    match err {
        TransportError::Transient(reason) => Attempt::Retry(reason),
        TransportError::Fatal(reason) => Attempt::Fail(FetchError::Transport {
            url: url.to_string(),
            reason,
        }),
    }
}

fn warn_on_status(url: &str, status: u16) {
    if !(200..300).contains(&status) {
        warn!(url, status, "Server returned a non-success status");
    }
}

/// Performs all outbound transfers for a run.
pub struct TransferEngine {
    transport: Arc<dyn Transport>,
    retry_count: u32,
    retry_delay: Duration,
    progress: Arc<dyn TransferProgress>,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    /// Create an engine using the retry settings from `config`.
    pub fn new(transport: Arc<dyn Transport>, config: &RetrieverConfig) -> Self {
        Self {
            transport,
            retry_count: config.retry_count.max(1),
            retry_delay: config.retry_delay,
            progress: Arc::new(NoProgress),
        }
    }

    /// Report byte-level progress of file transfers to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn TransferProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Number of attempts per operation.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry<T>(
        &self,
        url: &str,
        mut op: impl FnMut() -> Result<T, Attempt>,
    ) -> FetchResult<T> {
        let mut last_reason = String::new();

        for attempt in 1..=self.retry_count {
            match op() {
                Ok(value) => return Ok(value),
                Err(Attempt::Fail(e)) => return Err(e),
                Err(Attempt::Retry(reason)) => {
                    warn!(
                        url,
                        attempt,
                        max_attempts = self.retry_count,
                        reason = %reason,
                        "Network error"
                    );
                    last_reason = reason;
                    if attempt < self.retry_count {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.retry_count,
            reason: last_reason,
        })
    }

    /// GET `url` and decode the body as UTF-8.
    pub fn fetch_text(&self, url: &str, headers: &HeaderSet) -> FetchResult<String> {
        debug!(url, "Fetch");

        let bytes = self.with_retry(url, || {
            let mut response = self
                .transport
                .get(url, headers)
                .map_err(|e| from_transport(url, e))?;
            warn_on_status(url, response.status);

            let mut buf = Vec::new();
            response
                .body
                .read_to_end(&mut buf)
                .map_err(|e| Attempt::Retry(format!("read error: {}", e)))?;
            Ok(buf)
        })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Query the remote size via HEAD. Returns 0 when undeclared.
    pub fn probe_size(&self, url: &str, headers: &HeaderSet) -> FetchResult<u64> {
        self.with_retry(url, || {
            self.transport
                .head(url, headers)
                .map_err(|e| from_transport(url, e))
        })
        .map(|size| size.unwrap_or(0))
    }

    /// Download `url` to `dest`.
    ///
    /// Skips the transfer when `dest` already holds a file of the probed size
    /// (or the server declares no size). Otherwise streams the body, checks
    /// the received byte count against the declared length and validates zip
    /// archives. Failed integrity checks remove the file.
    pub fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        headers: &HeaderSet,
    ) -> FetchResult<FileOutcome> {
        let remote_size = self.probe_size(url, headers)?;

        if dest.is_file() {
            let local_size = fs::metadata(dest)
                .map_err(|e| FetchError::io(dest, e))?
                .len();
            if remote_size == 0 || local_size == remote_size {
                debug!(path = %dest.display(), "File already complete");
                return Ok(FileOutcome::AlreadyPresent { bytes: local_size });
            }
            info!(path = %dest.display(), "Removing outdated file");
            fs::remove_file(dest).map_err(|e| FetchError::io(dest, e))?;
        }

        let (received, declared) = self.stream_to_file(url, dest, headers)?;

        if let Some(expected) = declared.filter(|&d| d != 0) {
            if received != expected {
                fs::remove_file(dest).ok();
                return Err(FetchError::SizeMismatch {
                    path: dest.to_path_buf(),
                    expected,
                    received,
                });
            }
        }

        if let Err(e) = check_archive(dest) {
            warn!(path = %dest.display(), "Removing corrupt file");
            fs::remove_file(dest).ok();
            return Err(e);
        }

        Ok(FileOutcome::Downloaded { bytes: received })
    }

    /// Stream a GET body into `dest`, restarting from scratch on retry.
    ///
    /// Returns the bytes written and the declared length.
    fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        headers: &HeaderSet,
    ) -> FetchResult<(u64, Option<u64>)> {
        debug!(url, path = %dest.display(), "Fetch to file");

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
        }

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.with_retry(url, || {
            let mut response = self
                .transport
                .get(url, headers)
                .map_err(|e| from_transport(url, e))?;
            warn_on_status(url, response.status);

            let declared = response.content_length;
            let file = File::create(dest).map_err(|e| Attempt::Fail(FetchError::io(dest, e)))?;
            let mut writer = BufWriter::new(file);
            let mut buffer = vec![0u8; block_size(declared.unwrap_or(0))];
            let mut received = 0u64;

            self.progress.begin(&name, declared.filter(|&d| d != 0));
            loop {
                let bytes_read = match response.body.read(&mut buffer) {
                    Ok(n) => n,
                    Err(e) => {
                        self.progress.finish();
                        return Err(Attempt::Retry(format!("read error: {}", e)));
                    }
                };
                if bytes_read == 0 {
                    break;
                }

                if let Err(e) = writer.write_all(&buffer[..bytes_read]) {
                    self.progress.finish();
                    return Err(Attempt::Fail(FetchError::io(dest, e)));
                }
                received += bytes_read as u64;
                self.progress.advance(bytes_read as u64);
            }
            self.progress.finish();

            writer
                .flush()
                .map_err(|e| Attempt::Fail(FetchError::io(dest, e)))?;

            Ok((received, declared))
        })
    }
}
