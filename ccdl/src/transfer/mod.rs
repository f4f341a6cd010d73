//! Outbound HTTP transfers.
//!
//! This module provides everything that touches the network:
//! - The `Transport` seam and its reqwest implementation (`http`)
//! - Client identification headers (`headers`)
//! - Retrying text/file transfers with integrity checks (`engine`)
//! - Byte-level progress reporting (`progress`)
//!
//! # Architecture
//!
//! ```text
//! TransferEngine
//!         │
//!         ├── Transport (trait)
//!         │       └── HttpTransport (reqwest::blocking)
//!         │
//!         ├── retry loop (bounded attempts, fixed delay)
//!         │
//!         └── TransferProgress (trait)
//! ```

mod engine;
mod headers;
mod http;
mod progress;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{block_size, FileOutcome, TransferEngine};
pub use headers::{ClientHeaders, HeaderSet, BUILD_GUID_HEADER};
pub use http::{HttpTransport, Transport, TransportError, TransportResponse};
pub use progress::{NoProgress, TransferProgress};
