use std::collections::BTreeMap;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::RwLock;
use tracing::debug;

use crate::name::FileName;

use super::ingest::{check_declared_size, copy_capped};
use super::{ByteReader, ByteStream, Store, StoreError, StoredFile, SweepReport};

struct Entry {
    data: Bytes,
    modified: SystemTime,
}

impl Entry {
    fn stored_file(&self, name: &FileName) -> StoredFile {
        StoredFile {
            name: name.clone(),
            size: self.data.len() as u64,
            modified: self.modified,
        }
    }
}

/// In-memory store, mainly for tests.
///
/// Uploads are buffered privately and only inserted into the map once
/// complete, giving the same visibility rules as [`super::FsStore`].
#[derive(Default)]
pub struct MemStore {
    entries: RwLock<BTreeMap<FileName, Entry>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the modification time of an entry.
    pub async fn set_modified(&self, name: &FileName, modified: SystemTime) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(name).ok_or(StoreError::NotFound)?;
        entry.modified = modified;
        Ok(())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn put(
        &self,
        name: &FileName,
        data: ByteReader<'_>,
        declared_size: Option<u64>,
        limit: u64,
    ) -> Result<StoredFile, StoreError> {
        check_declared_size(declared_size, limit)?;

        let mut buf = Vec::new();
        copy_capped(data, &mut buf, limit).await?;

        let entry = Entry {
            data: Bytes::from(buf),
            modified: SystemTime::now(),
        };
        let stored = entry.stored_file(name);
        self.entries.write().await.insert(name.clone(), entry);
        Ok(stored)
    }

    async fn get(&self, name: &FileName) -> Result<(StoredFile, ByteStream), StoreError> {
        let entries = self.entries.read().await;
        let entry = entries.get(name).ok_or(StoreError::NotFound)?;
        let body = stream::iter([Ok::<_, StoreError>(entry.data.clone())]);
        Ok((entry.stored_file(name), Box::new(body)))
    }

    async fn info(&self, name: &FileName) -> Result<StoredFile, StoreError> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .map(|entry| entry.stored_file(name))
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|(name, entry)| entry.stored_file(name))
            .collect())
    }

    async fn delete(&self, name: &FileName) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn sweep(&self, cutoff: SystemTime) -> SweepReport {
        let mut entries = self.entries.write().await;
        let scanned = entries.len();
        entries.retain(|name, entry| {
            let keep = entry.modified > cutoff;
            if !keep {
                debug!(%name, "Evicted expired entry");
            }
            keep
        });

        SweepReport {
            scanned,
            removed: scanned - entries.len(),
            failed: 0,
            abandoned: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::TryStreamExt;

    use super::*;

    fn name(s: &str) -> FileName {
        FileName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_and_ordering() {
        let store = MemStore::new();
        for n in ["b.txt", "a.txt"] {
            let mut reader: &[u8] = n.as_bytes();
            store.put(&name(n), &mut reader, None, 100).await.unwrap();
        }

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name.to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let (meta, body) = store.get(&name("a.txt")).await.unwrap();
        let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(chunks.concat(), b"a.txt");
    }

    #[tokio::test]
    async fn test_oversize_not_inserted() {
        let store = MemStore::new();
        let mut reader: &[u8] = &[0u8; 11];
        let err = store.put(&name("a.bin"), &mut reader, None, 10).await.unwrap_err();

        assert!(matches!(err, StoreError::SizeLimitExceeded { limit: 10 }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_and_delete() {
        let store = MemStore::new();
        for n in ["old.txt", "new.txt"] {
            let mut reader: &[u8] = b"x";
            store.put(&name(n), &mut reader, None, 100).await.unwrap();
        }
        let now = SystemTime::now();
        store
            .set_modified(&name("old.txt"), now - Duration::from_secs(7200))
            .await
            .unwrap();

        let report = store.sweep(now - Duration::from_secs(3600)).await;
        assert_eq!(report.removed, 1);
        assert!(matches!(store.info(&name("old.txt")).await, Err(StoreError::NotFound)));

        store.delete(&name("new.txt")).await.unwrap();
        assert!(matches!(store.delete(&name("new.txt")).await, Err(StoreError::NotFound)));
    }
}
