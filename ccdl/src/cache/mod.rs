//! On-disk cache of catalogs, descriptors and package files.
//!
//! Every cached artifact has a deterministic path derived from its
//! [`Resource`] class and key. The discipline is read-if-valid, else
//! write-once-then-read: entries are never evicted proactively, and an entry
//! that fails validation is deleted so the next fetch replaces it wholesale.

mod store;
mod validate;

pub use store::{CacheStore, Resource};
pub use validate::{check_archive, validate, ArtifactFormat};
