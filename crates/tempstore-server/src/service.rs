//! Store composition: validation, limits, derived metadata and eviction
//! behind one handle shared by all request handlers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::content_type::{self, Disposition};
use crate::evictor::{self, Evictor};
use crate::name::FileName;
use crate::storage::{ByteReader, ByteStream, Store, StoreError, StoredFile, SweepReport};

/// Metadata returned to clients for a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub file_size: u64,
    pub modified_time: Timestamp,
    pub content_type: String,
    pub address: String,
}

/// An open file ready to be sent to a client.
pub struct Download {
    pub info: FileInfo,
    pub disposition: Disposition,
    pub body: ByteStream,
}

pub struct StoreService<S: Store> {
    store: Arc<S>,
    max_file_size: u64,
    public_base: String,
    evictor: Evictor,
}

impl<S: Store> StoreService<S> {
    /// Build the service and start its sweep worker.
    ///
    /// Must be called within a Tokio runtime. If the config sets a sweep
    /// interval, periodic sweeps start immediately.
    pub fn new(store: S, config: &Config) -> Self {
        let store = Arc::new(store);
        let evictor = Evictor::spawn(Arc::clone(&store), config.retention());

        if let Some(every) = config.sweep_interval() {
            info!(every = ?every, retention = ?config.retention(), "Scheduling periodic sweeps");
            let _ticker: JoinHandle<()> = evictor.schedule(every);
        }

        Self {
            store,
            max_file_size: config.max_file_size,
            public_base: config.public_base.trim_end_matches('/').to_owned(),
            evictor,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn retention(&self) -> Duration {
        self.evictor.retention()
    }

    pub fn evictor(&self) -> &Evictor {
        &self.evictor
    }

    /// Ingest an upload. `name` is the client-declared file name, if any.
    pub async fn upload(
        &self,
        name: Option<&str>,
        data: ByteReader<'_>,
        declared_size: Option<u64>,
    ) -> Result<FileInfo, StoreError> {
        let name = name.ok_or_else(|| StoreError::Validation("no file selected".into()))?;
        let name = FileName::parse(name)?;
        let stored = self
            .store
            .put(&name, data, declared_size, self.max_file_size)
            .await?;
        Ok(self.describe(stored))
    }

    /// All stored files, ordered by name.
    pub async fn list(&self) -> Result<Vec<FileInfo>, StoreError> {
        let files = self.store.list().await?;
        Ok(files.into_iter().map(|f| self.describe(f)).collect())
    }

    pub async fn info(&self, name: &str) -> Result<FileInfo, StoreError> {
        let name = FileName::parse(name)?;
        let stored = self.store.info(&name).await?;
        Ok(self.describe(stored))
    }

    /// Open a file for delivery with the disposition its type calls for.
    pub async fn fetch(&self, name: &str) -> Result<Download, StoreError> {
        let name = FileName::parse(name)?;
        let (stored, body) = self.store.get(&name).await?;
        let info = self.describe(stored);
        let disposition = Disposition::for_content_type(&info.content_type);
        Ok(Download {
            info,
            disposition,
            body,
        })
    }

    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let name = FileName::parse(name)?;
        self.store.delete(&name).await
    }

    /// Start a sweep in the background and return at once.
    pub fn trigger_cleanup(&self) -> Result<(), StoreError> {
        self.evictor.trigger()
    }

    /// Sweep inline and report what was removed.
    pub async fn cleanup_now(&self) -> SweepReport {
        evictor::sweep_once(self.store.as_ref(), self.retention()).await
    }

    /// Locator clients can use to fetch `name`.
    pub fn address_for(&self, name: &FileName) -> String {
        format!("{}/{}", self.public_base, encode_path_segment(name.as_str()))
    }

    fn describe(&self, stored: StoredFile) -> FileInfo {
        let content_type = content_type::resolve(stored.name.as_str()).to_owned();
        FileInfo {
            address: self.address_for(&stored.name),
            content_type,
            file_size: stored.size,
            modified_time: to_timestamp(stored.modified),
            filename: stored.name.to_string(),
        }
    }
}

fn to_timestamp(time: SystemTime) -> Timestamp {
    Timestamp::try_from(time).unwrap_or(Timestamp::UNIX_EPOCH)
}

/// Percent-encode everything outside RFC 3986 `unreserved`.
pub(crate) fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::storage::MemStore;

    fn service(max_file_size: u64) -> StoreService<MemStore> {
        let config = Config {
            max_file_size,
            ..Config::default()
        };
        StoreService::new(MemStore::new(), &config)
    }

    async fn upload(svc: &StoreService<MemStore>, name: &str, data: &[u8]) -> Result<FileInfo, StoreError> {
        let mut reader = data;
        svc.upload(Some(name), &mut reader, None).await
    }

    #[tokio::test]
    async fn test_upload_describes_file() {
        let svc = service(1024);
        let info = upload(&svc, "photo.jpg", &[0u8; 100]).await.unwrap();

        assert_eq!(info.filename, "photo.jpg");
        assert_eq!(info.file_size, 100);
        assert_eq!(info.content_type, "image/jpeg");
        assert_eq!(info.address, "/files/photo.jpg");
    }

    #[tokio::test]
    async fn test_upload_without_name() {
        let svc = service(1024);
        let mut reader: &[u8] = b"data";
        let err = svc.upload(None, &mut reader, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upload_rejects_traversal() {
        let svc = service(1024);
        let err = upload(&svc, "../escape.txt", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_over_ceiling() {
        let svc = service(1024);
        let err = upload(&svc, "big.bin", &[0u8; 1025]).await.unwrap_err();
        assert!(matches!(err, StoreError::SizeLimitExceeded { limit: 1024 }));
        assert!(matches!(svc.info("big.bin").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_fetch_text_is_inline() {
        let svc = service(1024);
        upload(&svc, "a.txt", b"hello").await.unwrap();

        let download = svc.fetch("a.txt").await.unwrap();
        assert_eq!(download.info.content_type, "text/plain");
        assert_eq!(download.disposition, Disposition::Inline);
        let chunks: Vec<_> = download.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"hello");
    }

    #[tokio::test]
    async fn test_fetch_archive_is_attachment() {
        let svc = service(1024);
        upload(&svc, "bundle.zip", b"PK").await.unwrap();

        let download = svc.fetch("bundle.zip").await.unwrap();
        assert_eq!(download.disposition, Disposition::Attachment);
    }

    #[tokio::test]
    async fn test_cleanup_now_uses_retention() {
        let svc = service(1024);
        upload(&svc, "old.txt", b"x").await.unwrap();
        upload(&svc, "new.txt", b"x").await.unwrap();
        svc.store()
            .set_modified(
                &FileName::parse("old.txt").unwrap(),
                SystemTime::now() - svc.retention() - Duration::from_secs(1),
            )
            .await
            .unwrap();

        let report = svc.cleanup_now().await;

        assert_eq!(report.removed, 1);
        let names: Vec<_> = svc.list().await.unwrap().into_iter().map(|f| f.filename).collect();
        assert_eq!(names, vec!["new.txt"]);
    }

    #[test]
    fn test_address_encoding() {
        assert_eq!(encode_path_segment("a.txt"), "a.txt");
        assert_eq!(encode_path_segment("my file.txt"), "my%20file.txt");
        assert_eq!(encode_path_segment("é"), "%C3%A9");
        assert_eq!(encode_path_segment("50%?#"), "50%25%3F%23");
    }
}
