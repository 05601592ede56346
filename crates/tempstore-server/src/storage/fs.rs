use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::BufReader;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::name::FileName;

use super::ingest::{check_declared_size, copy_capped};
use super::{ByteReader, ByteStream, Store, StoreError, StoredFile, SweepReport};

/// Prefix of in-progress uploads. Valid names never start with `.`, so
/// staging files can't collide with or be listed as committed entries.
const STAGING_PREFIX: &str = ".staging-";

/// Staging files younger than this are never swept, whatever the cutoff,
/// so a short retention can't pull the file out from under a live upload.
const STAGING_MIN_AGE: Duration = Duration::from_secs(60 * 60);

/// Store backed by a single flat directory.
///
/// All metadata comes from the filesystem at read time; there are no
/// sidecar files.
pub struct FsStore {
    base_path: PathBuf,
}

impl FsStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create the store directory if needed
    pub async fn init(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn entry_path(&self, name: &FileName) -> PathBuf {
        self.base_path.join(name.as_str())
    }

    /// Remove staging files left behind by uploads that never finished,
    /// e.g. because the process was killed mid-write.
    async fn sweep_staging(&self, cutoff: SystemTime, report: &mut SweepReport) {
        let cutoff = SystemTime::now()
            .checked_sub(STAGING_MIN_AGE)
            .map_or(cutoff, |floor| floor.min(cutoff));

        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(error = %e, "Sweep could not scan for staging files");
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Sweep could not scan for staging files");
                    break;
                }
            };

            let file_name = entry.file_name();
            if !file_name.to_string_lossy().starts_with(STAGING_PREFIX) {
                continue;
            }

            let modified = match entry.metadata().await {
                Ok(m) if m.is_file() => m.modified(),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };
            match modified {
                Ok(modified) if modified > cutoff => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(file = ?file_name, error = %e, "Failed to stat staging file");
                    report.failed += 1;
                    continue;
                }
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    info!(file = ?file_name, "Removed abandoned staging file");
                    report.abandoned += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(file = ?file_name, error = %e, "Failed to remove staging file");
                    report.failed += 1;
                }
            }
        }
    }

    fn stored_file(name: FileName, metadata: &std::fs::Metadata) -> Result<StoredFile, StoreError> {
        Ok(StoredFile {
            name,
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

#[async_trait]
impl Store for FsStore {
    async fn put(
        &self,
        name: &FileName,
        data: ByteReader<'_>,
        declared_size: Option<u64>,
        limit: u64,
    ) -> Result<StoredFile, StoreError> {
        check_declared_size(declared_size, limit)?;

        fs::create_dir_all(&self.base_path).await?;

        // Stage next to the final location so the commit is a same-directory rename
        let (staging_file, staging_path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.base_path)?
            .into_parts();
        let mut file = File::from_std(staging_file);

        let written = match copy_capped(data, &mut file, limit).await {
            Ok(n) => n,
            Err(err) => {
                drop(file);
                warn!(%name, error = %err, "Discarding partial upload");
                if let Err(cleanup) = staging_path.close() {
                    warn!(%name, error = %cleanup, "Failed to remove staging file");
                }
                return Err(err);
            }
        };

        file.sync_all().await?;
        let metadata = file.metadata().await?;
        drop(file);

        let path = self.entry_path(name);
        staging_path
            .persist(&path)
            .map_err(|e| StoreError::Io(e.error))?;

        info!(%name, size = written, "Stored file");
        Self::stored_file(name.clone(), &metadata)
    }

    async fn get(&self, name: &FileName) -> Result<(StoredFile, ByteStream), StoreError> {
        let path = self.entry_path(name);
        let file = File::open(&path).await.map_err(StoreError::from_lookup)?;

        // Metadata from the open handle so size matches what we stream
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound);
        }
        let stored = Self::stored_file(name.clone(), &metadata)?;

        let reader = BufReader::with_capacity(64 * 1024, file);
        let stream = ReaderStream::new(reader).map(|result| result.map_err(StoreError::Io));

        Ok((stored, Box::new(stream)))
    }

    async fn info(&self, name: &FileName) -> Result<StoredFile, StoreError> {
        let path = self.entry_path(name);
        let metadata = fs::metadata(&path)
            .await
            .map_err(StoreError::from_lookup)?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound);
        }
        Self::stored_file(name.clone(), &metadata)
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|s| FileName::parse(s).ok())
            else {
                // staging files and anything we could never have written
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                // removed between read_dir and stat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            files.push(Self::stored_file(name, &metadata)?);
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn delete(&self, name: &FileName) -> Result<(), StoreError> {
        // Only files are entries; never try to remove a directory
        self.info(name).await?;
        fs::remove_file(self.entry_path(name))
            .await
            .map_err(StoreError::from_lookup)?;
        info!(%name, "Deleted file");
        Ok(())
    }

    async fn sweep(&self, cutoff: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        self.sweep_staging(cutoff, &mut report).await;

        let files = match self.list().await {
            Ok(files) => files,
            Err(err) => {
                warn!(error = %err, "Sweep could not list store");
                return report;
            }
        };

        for file in files {
            report.scanned += 1;
            if file.modified > cutoff {
                continue;
            }

            // Re-check right before removing: the entry may have been rewritten.
            // A commit landing between this stat and the unlink is still lost;
            // the check only narrows that window.
            match self.info(&file.name).await {
                Ok(current) if current.modified > cutoff => {
                    debug!(name = %file.name, "Entry rewritten since scan, keeping");
                    continue;
                }
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    debug!(name = %file.name, "Entry already gone");
                    continue;
                }
                Err(err) => {
                    warn!(name = %file.name, error = %err, "Failed to stat expired entry");
                    report.failed += 1;
                    continue;
                }
            }

            match fs::remove_file(self.entry_path(&file.name)).await {
                Ok(()) => {
                    debug!(name = %file.name, "Evicted expired entry");
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(name = %file.name, "Entry already gone");
                }
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Failed to evict entry");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
