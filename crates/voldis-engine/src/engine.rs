use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use voldis_core::{Connection, ConnectionRegistry, EngineError, Store};

use crate::ingest;
use crate::reconciler;
use crate::watcher::WatchEngine;

/// Orchestrates connections between local volume directories and the shared
/// store.
///
/// Owns the store client and the connection registry and injects both into
/// every background task it spawns: per-mount bulk ingestion and watch loops,
/// plus one process-wide reconciler. None of the plugin-facing operations
/// block on background work.
pub struct Engine {
    store: Arc<dyn Store>,
    registry: Arc<ConnectionRegistry>,
    volume_root: PathBuf,
    reconcile_interval: Duration,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        volume_root: impl Into<PathBuf>,
        reconcile_interval: Duration,
    ) -> Self {
        Engine {
            store,
            registry: Arc::new(ConnectionRegistry::new()),
            volume_root: volume_root.into(),
            reconcile_interval,
            reconciler: Mutex::new(None),
        }
    }

    /// Registry shared with the background tasks.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Mountpoint for a volume name: always `volume_root/name`. Pure, no
    /// side effects.
    pub fn path(&self, name: &str) -> PathBuf {
        self.volume_root.join(name)
    }

    /// Ensure the mountpoint directory exists and the store is reachable.
    ///
    /// The ping fails fast so an unreachable store surfaces at create time
    /// rather than as a stream of logged background errors later.
    pub async fn create(&self, name: &str) -> Result<PathBuf, EngineError> {
        let mountpoint = self.path(name);
        info!("Creating volume {} at {}", name, mountpoint.display());

        tokio::fs::create_dir_all(&mountpoint).await?;
        self.store.ping().await?;

        Ok(mountpoint)
    }

    /// Attach a volume: register the connection, launch bulk ingestion and
    /// the watch loop as independent tasks, and make sure the reconciler is
    /// running. Returns the mountpoint immediately, without waiting for
    /// ingestion or watching to reach steady state.
    pub async fn mount(&self, name: &str) -> Result<PathBuf, EngineError> {
        let mountpoint = self.path(name);
        tokio::fs::create_dir_all(&mountpoint).await?;
        info!("Mounting volume {} on {}", name, mountpoint.display());

        let mut conn = Connection::new(name, &mountpoint);

        let ingest_store = Arc::clone(&self.store);
        let ingest_root = mountpoint.clone();
        conn.add_task(tokio::spawn(async move {
            ingest::ingest(ingest_store.as_ref(), &ingest_root).await;
        }));

        match WatchEngine::subscribe(&mountpoint) {
            Ok(watch) => {
                let store = Arc::clone(&self.store);
                let registry = Arc::clone(&self.registry);
                let root = mountpoint.clone();
                conn.add_task(tokio::spawn(watch.run(store, registry, root)));
            }
            // Fatal for this connection only: the mount stays usable through
            // the reconciler, and there is no re-subscription.
            Err(e) => warn!("Watch subscription failed for {}: {}", name, e),
        }

        self.registry.insert(conn);
        self.ensure_reconciler().await;

        Ok(mountpoint)
    }

    /// Detach a volume: deregister the connection and abort its background
    /// tasks. The directory tree is left on disk.
    pub async fn unmount(&self, name: &str) {
        if self.registry.remove(name).is_some() {
            info!("Unmounted volume {}", name);
        }
    }

    /// Detach a volume and recursively delete its mountpoint from disk.
    ///
    /// The connection is unmounted first so the watch loop cannot observe
    /// the directory deletion and fan it out as a mass store deletion.
    pub async fn remove(&self, name: &str) -> Result<(), EngineError> {
        self.unmount(name).await;

        let mountpoint = self.path(name);
        info!("Removing volume {} at {}", name, mountpoint.display());
        match tokio::fs::remove_dir_all(&mountpoint).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stop the reconciler and every connection's background tasks.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.reconciler.lock().await.take() {
            handle.abort();
        }
        self.registry.clear();
        info!("Engine shut down");
    }

    async fn ensure_reconciler(&self) {
        let mut guard = self.reconciler.lock().await;
        if guard.is_none() {
            *guard = Some(reconciler::spawn(
                Arc::clone(&self.store),
                Arc::clone(&self.registry),
                self.reconcile_interval,
            ));
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // try_lock so dropping inside a runtime cannot deadlock; shutdown()
        // is the orderly path.
        if let Ok(mut guard) = self.reconciler.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
