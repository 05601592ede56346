use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;

mod fs;
mod ingest;
mod memory;
mod types;

pub use fs::FsStore;
pub use memory::MemStore;
pub use types::{StoreError, StoredFile, SweepReport};

use crate::name::FileName;

/// A boxed stream of byte chunks for streaming reads
pub type ByteStream = Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send + Unpin>;

/// An async reader borrowed for the duration of a write
pub type ByteReader<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// A flat namespace of files keyed by [`FileName`].
///
/// Writes are atomic with respect to readers: an entry only becomes visible
/// once all of its bytes are committed. Two writers racing on the same name
/// are not coordinated; whichever commits last wins.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Store data from a reader under `name`, replacing any existing entry.
    ///
    /// Fails with `SizeLimitExceeded` if `declared_size` or the bytes
    /// actually read exceed `limit`. On any failure nothing is left behind.
    async fn put(
        &self,
        name: &FileName,
        data: ByteReader<'_>,
        declared_size: Option<u64>,
        limit: u64,
    ) -> Result<StoredFile, StoreError>;

    /// Open an entry for reading.
    async fn get(&self, name: &FileName) -> Result<(StoredFile, ByteStream), StoreError>;

    /// Get entry metadata without opening its content.
    async fn info(&self, name: &FileName) -> Result<StoredFile, StoreError>;

    /// List all committed entries, sorted by name.
    async fn list(&self) -> Result<Vec<StoredFile>, StoreError>;

    /// Remove an entry.
    async fn delete(&self, name: &FileName) -> Result<(), StoreError>;

    /// Remove every entry last modified at or before `cutoff`.
    ///
    /// Never fails: per-entry problems are logged and counted in the report.
    async fn sweep(&self, cutoff: SystemTime) -> SweepReport;
}
