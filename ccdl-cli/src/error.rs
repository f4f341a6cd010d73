//! CLI error types.

use ccdl::FetchError;
use thiserror::Error;

/// Errors reported by the `ccdl` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The retrieval pipeline failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Invalid arguments or settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested product, version or language is not in the catalog.
    #[error("{0}")]
    NotFound(String),
}
