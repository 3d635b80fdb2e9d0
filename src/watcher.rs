//! Watches the tracked file on disk and announces external edits.
//!
//! The parent directory is watched rather than the file itself, since many
//! editors save by writing a temporary file and renaming it into place.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::file::FileStore;

/// Running file watcher. Dropping it stops watching.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    handle: JoinHandle<()>,
}

impl FileWatcher {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start watching the store's file; every relevant change triggers
/// [`FileStore::reload`], which broadcasts only when the content differs.
pub fn spawn_file_watcher(store: Arc<FileStore>) -> Result<FileWatcher, notify::Error> {
    let path = store.path().to_path_buf();
    let dir = watch_dir(&path);
    let file_name = path.file_name().map(|n| n.to_os_string());

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => warn!("[watcher] Watch error: {}", e),
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("[watcher] Watching {}", path.display());

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !is_relevant(&event, file_name.as_deref()) {
                continue;
            }
            debug!("[watcher] {:?} on {:?}", event.kind, event.paths);
            match store.reload().await {
                Ok(Some(record)) => {
                    info!(
                        "[watcher] {} changed on disk ({} bytes)",
                        record.filepath,
                        record.raw.len()
                    );
                }
                Ok(None) => {}
                // Mid-rename the file may briefly not exist; the next event retries.
                Err(e) => debug!("[watcher] Reload failed: {}", e),
            }
        }
    });

    Ok(FileWatcher {
        _watcher: watcher,
        handle,
    })
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}
