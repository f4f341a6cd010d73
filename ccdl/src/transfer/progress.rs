//! Progress reporting for file transfers.

/// Receives byte-level progress for one transfer at a time.
///
/// Transfers are sequential, so an implementation only ever tracks a single
/// active file.
pub trait TransferProgress: Send + Sync {
    /// A transfer of `name` is starting. `total` is the declared length.
    fn begin(&self, _name: &str, _total: Option<u64>) {}

    /// `bytes` more bytes were written.
    fn advance(&self, _bytes: u64) {}

    /// The current transfer ended, successfully or not.
    fn finish(&self) {}
}

/// Progress sink that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}
