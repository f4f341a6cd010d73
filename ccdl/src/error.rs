//! Error types for the retrieval pipeline.
//!
//! Every variant is unrecoverable for the current run: callers propagate the
//! error up to the binary, which reports it and exits. The only recovery the
//! library performs on its own is the delete-and-refetch-once of a corrupt
//! cached document.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for retrieval operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching, caching or parsing catalog data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A HEAD or GET kept failing with connection/timeout errors.
    #[error("giving up on {url} after {attempts} attempts: {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// A non-retryable transport failure (bad URL, client setup).
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Fewer (or more) bytes arrived than the server declared.
    #[error("expected {expected} bytes for {}, received {received}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        received: u64,
    },

    /// A downloaded archive failed its internal CRC check.
    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// A catalog, manifest or descriptor did not parse.
    #[error("malformed {what} from {source_name}: {reason}")]
    MalformedPayload {
        what: &'static str,
        source_name: String,
        reason: String,
    },

    /// The catalog parsed but lacks a node or attribute it must have.
    #[error("unexpected catalog structure: {0}")]
    CatalogStructure(String),

    /// A declared dependency has no matching build anywhere in the catalog.
    #[error("dependency {code} {version} not found in catalog")]
    UnresolvedDependency { code: String, version: String },

    /// A cache key cannot be mapped to a path inside the cache root.
    #[error("invalid cache key: {0}")]
    InvalidCacheKey(String),

    /// Local filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the integrity checks on a finished transfer.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. } | Self::CorruptArchive { .. }
        )
    }
}
