use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::debug;

use crate::events::{ChannelEvent, UpdateEvent};

/// Capacity of the change broadcast. Lagging subscribers skip events.
const EVENT_CAPACITY: usize = 256;

/// Authoritative state of the tracked file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filepath: String,
    pub raw: String,
}

impl FileRecord {
    pub fn new(filepath: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            raw: raw.into(),
        }
    }
}

impl From<UpdateEvent> for FileRecord {
    fn from(event: UpdateEvent) -> Self {
        Self {
            filepath: event.filepath,
            raw: event.raw,
        }
    }
}

impl From<FileRecord> for UpdateEvent {
    fn from(record: FileRecord) -> Self {
        Self {
            filepath: record.filepath,
            raw: record.raw,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend owner of the tracked file.
///
/// Holds the last known content, writes edits through to disk and announces
/// every change on a broadcast channel that feeds the push channel.
pub struct FileStore {
    /// Location on disk
    path: PathBuf,
    /// Current record, also used to recognise our own writes coming back from the watcher
    record: RwLock<FileRecord>,
    events: broadcast::Sender<ChannelEvent>,
    /// Flipped to true on shutdown so open push streams can end
    closed: watch::Sender<bool>,
}

impl FileStore {
    /// Open the file at `path`, reading its current content.
    ///
    /// The reported `filepath` is the path as given.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(Self::with_record(
            path.clone(),
            FileRecord::new(path.display().to_string(), raw),
        ))
    }

    /// Create a store around an already known record without touching disk.
    pub fn with_record(path: PathBuf, record: FileRecord) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (closed, _) = watch::channel(false);
        Self {
            path,
            record: RwLock::new(record),
            events,
            closed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> FileRecord {
        self.record.read().await.clone()
    }

    /// Persist new content and announce it.
    ///
    /// The content goes to a sibling temp file that is renamed over the
    /// tracked file, so a concurrent reader sees either the old or the new
    /// content, never a truncated one. The write lock is held throughout so
    /// concurrent edits land in the same order on disk and in memory.
    pub async fn write(&self, raw: String) -> Result<FileRecord, StoreError> {
        let mut record = self.record.write().await;
        let tmp = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp, &raw).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        record.raw = raw;
        let snapshot = record.clone();
        drop(record);

        self.publish(ChannelEvent::UpdateFile(snapshot.clone().into()));
        Ok(snapshot)
    }

    /// Re-read the file from disk after an external change.
    ///
    /// Returns `None` when the content is what we already hold, which is the
    /// case for the watcher noticing our own [`FileStore::write`]. The disk is
    /// read under the record lock so a reload can never interleave with a
    /// write and bring back older content.
    pub async fn reload(&self) -> Result<Option<FileRecord>, StoreError> {
        let mut record = self.record.write().await;
        let raw = tokio::fs::read_to_string(&self.path).await?;
        if record.raw == raw {
            debug!("Reload of {} found no change", self.path.display());
            return Ok(None);
        }
        record.raw = raw;
        let snapshot = record.clone();
        drop(record);

        self.publish(ChannelEvent::UpdateFile(snapshot.clone().into()));
        Ok(Some(snapshot))
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }

    /// Broadcast an event to every push channel subscriber.
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, event: ChannelEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// End every open push stream. Used on server shutdown, since a
    /// graceful shutdown waits for in-flight responses to finish.
    pub fn shutdown(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.closed.borrow()
    }

    /// Receiver that changes once [`FileStore::shutdown`] is called.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn temp_store(content: &str) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.md");
        std::fs::write(&path, content).unwrap();
        let store = FileStore::open(&path).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_reads_content() {
        let (_dir, store) = temp_store("# Hello").await;
        let record = store.read().await;
        assert_eq!(record.raw, "# Hello");
        assert!(record.filepath.ends_with("slides.md"));
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileStore::open(dir.path().join("missing.md")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_persists_and_broadcasts() {
        let (_dir, store) = temp_store("# Hello").await;
        let mut rx = store.subscribe();

        let record = store.write("# Hello\nWorld".to_string()).await.unwrap();
        assert_eq!(record.raw, "# Hello\nWorld");
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "# Hello\nWorld"
        );

        match rx.recv().await.unwrap() {
            ChannelEvent::UpdateFile(event) => assert_eq!(event.raw, "# Hello\nWorld"),
            other => panic!("Expected file update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reload_ignores_own_write() {
        let (_dir, store) = temp_store("a").await;
        store.write("b".to_string()).await.unwrap();
        let mut rx = store.subscribe();

        assert!(store.reload().await.unwrap().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reload_announces_external_change() {
        let (_dir, store) = temp_store("a").await;
        let mut rx = store.subscribe();

        std::fs::write(store.path(), "changed elsewhere").unwrap();
        let record = store.reload().await.unwrap().unwrap();
        assert_eq!(record.raw, "changed elsewhere");
        assert!(matches!(
            rx.recv().await.unwrap(),
            ChannelEvent::UpdateFile(_)
        ));
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let (dir, store) = temp_store("a").await;
        store.write("b".to_string()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("slides.md")]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_record() {
        let (dir, store) = temp_store("a").await;
        let mut rx = store.subscribe();
        drop(dir);

        assert!(store.write("b".to_string()).await.is_err());
        assert_eq!(store.read().await.raw, "a");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reload_racing_write_never_sees_torn_content() {
        let old = "a".repeat(4 * 1024 * 1024);
        let new = "b".repeat(4 * 1024 * 1024);
        let (_dir, store) = temp_store(&old).await;
        let store = Arc::new(store);
        let mut rx = store.subscribe();

        for round in 0..10 {
            let content = if round % 2 == 0 { new.clone() } else { old.clone() };
            let writer = {
                let store = store.clone();
                tokio::spawn(async move { store.write(content).await.unwrap() })
            };
            let reloaders: Vec<_> = (0..20)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.reload().await.unwrap() })
                })
                .collect();

            writer.await.unwrap();
            for reloader in reloaders {
                if let Some(record) = reloader.await.unwrap() {
                    assert!(record.raw == old || record.raw == new);
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            match event {
                ChannelEvent::UpdateFile(update) => {
                    assert!(
                        update.raw == old || update.raw == new,
                        "broadcast partial content of {} bytes",
                        update.raw.len()
                    );
                }
                other => panic!("Expected file update, got {:?}", other),
            }
        }
        assert_eq!(
            store.read().await.raw,
            std::fs::read_to_string(store.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let (_dir, store) = temp_store("a").await;
        let mut closed = store.closed();
        assert!(!store.is_shut_down());

        store.shutdown();
        closed.changed().await.unwrap();
        assert!(*closed.borrow());
        assert!(store.is_shut_down());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let store = FileStore::with_record(PathBuf::from("x.md"), FileRecord::new("x.md", ""));
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(
            store.publish(ChannelEvent::Unknown {
                name: "ping".to_string(),
                data: String::new(),
            }),
            0
        );
    }
}
