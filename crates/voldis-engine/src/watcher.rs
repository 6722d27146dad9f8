use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{
    Config as NotifyConfig, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode,
    Watcher,
};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use voldis_core::{key_for, path_for, ConnectionRegistry, EngineError, Store};

/// The kind of change a watch event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File created or modified; its content is pushed to the store.
    Written,
    /// File removed; the key is deleted and the deletion fanned out.
    Removed,
}

/// A filesystem change under a watched connection root.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug)]
enum WatcherImpl {
    Recommended(RecommendedWatcher),
    Poll(PollWatcher),
}

impl WatcherImpl {
    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> notify::Result<()> {
        match self {
            WatcherImpl::Recommended(watcher) => watcher.watch(path, mode),
            WatcherImpl::Poll(watcher) => watcher.watch(path, mode),
        }
    }
}

/// Watches one connection root and translates filesystem events into store
/// mutations, one event at a time.
///
/// The underlying OS subscription is best-effort: events are not guaranteed
/// ordered or exhaustive, and the periodic reconciler covers the gaps.
#[derive(Debug)]
pub struct WatchEngine {
    // Held for its Drop: the subscription ends when the engine is dropped.
    _watcher: WatcherImpl,
    rx: mpsc::Receiver<FileChange>,
}

impl WatchEngine {
    /// Subscribe to filesystem events under `root`.
    ///
    /// A registration failure here is fatal for the connection; there is no
    /// automatic re-subscription.
    pub fn subscribe(root: &Path) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel::<FileChange>(1024);

        let handler = move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                if let Some(change) = convert_event(&event) {
                    if tx.blocking_send(change).is_err() {
                        warn!("Watch channel closed, dropping event");
                    }
                }
            }
            Err(e) => {
                error!("Watch error: {}", e);
            }
        };

        let mut watcher = if let Some(poll_interval) = poll_interval_from_env() {
            let config = NotifyConfig::default()
                .with_poll_interval(poll_interval)
                .with_compare_contents(true);
            WatcherImpl::Poll(PollWatcher::new(handler, config).map_err(|e| {
                EngineError::Watch(format!("Failed to create poll watcher: {}", e))
            })?)
        } else {
            WatcherImpl::Recommended(
                RecommendedWatcher::new(handler, NotifyConfig::default())
                    .map_err(|e| EngineError::Watch(format!("Failed to create watcher: {}", e)))?,
            )
        };

        watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
            EngineError::Watch(format!("Failed to watch path '{}': {}", root.display(), e))
        })?;

        debug!("Watching path: {}", root.display());
        Ok(WatchEngine { _watcher: watcher, rx })
    }

    /// Drain events until the subscription ends, applying each one against
    /// the store and the registered roots. Events are processed strictly one
    /// at a time for this connection; concurrency exists only across
    /// connections.
    pub async fn run(
        mut self,
        store: Arc<dyn Store>,
        registry: Arc<ConnectionRegistry>,
        root: PathBuf,
    ) {
        while let Some(change) = self.rx.recv().await {
            apply_change(store.as_ref(), &registry, &root, &change).await;
        }
        debug!("Watch loop for {} stopped", root.display());
    }
}

/// Translate one filesystem event into store mutations.
///
/// A removal deletes the key and then removes the translated path under
/// *every* registered root, which is how a deletion on one mount propagates
/// to all others sharing the store. A write pushes the file's bytes
/// unconditionally: unlike bulk ingest there is no length check, every write
/// event is trusted as authoritative. Per-event errors are logged and
/// absorbed.
pub async fn apply_change(
    store: &dyn Store,
    registry: &ConnectionRegistry,
    root: &Path,
    change: &FileChange,
) {
    let Some(key) = key_for(root, &change.path) else {
        // Event for the root itself; nothing to sync.
        return;
    };

    match change.kind {
        ChangeKind::Removed => {
            debug!("Removal of {} under {}", key, root.display());
            if let Err(e) = store.delete(&key).await {
                warn!("Store delete failed for {}: {}", key, e);
            }
            for other_root in registry.roots() {
                let target = path_for(&other_root, &key);
                if let Err(e) = remove_path(&target).await {
                    warn!("Failed to remove {}: {}", target.display(), e);
                }
            }
        }
        ChangeKind::Written => {
            let content = match tokio::fs::read(&change.path).await {
                Ok(content) => content,
                Err(e) => {
                    // Gone before we could read it, or a directory; either
                    // way there is nothing to push.
                    debug!("Skipping {}: {}", change.path.display(), e);
                    return;
                }
            };
            match store.set(&key, &content).await {
                Ok(()) => debug!("Pushed {} ({} bytes)", key, content.len()),
                Err(e) => warn!("Store set failed for {}: {}", key, e),
            }
        }
    }
}

/// Remove a file or directory tree, treating "already gone" as success.
async fn remove_path(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(_) => match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        },
    }
}

fn poll_interval_from_env() -> Option<Duration> {
    let value = std::env::var("VOLDIS_WATCH_POLL_INTERVAL_MS").ok()?;
    let millis: u64 = value.parse().ok()?;
    if millis == 0 {
        return None;
    }
    Some(Duration::from_millis(millis))
}

/// Convert a notify event to a FileChange. Anything that is not a removal is
/// treated as a write; access-only events are dropped.
fn convert_event(event: &Event) -> Option<FileChange> {
    let path = event.paths.first()?.clone();
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Written,
        EventKind::Modify(_) => ChangeKind::Written,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) => return None,
        EventKind::Other => return None,
        EventKind::Any => return None,
    };

    Some(FileChange { path, kind })
}
