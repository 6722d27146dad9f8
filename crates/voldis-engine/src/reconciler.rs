use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use voldis_core::{path_for, ConnectionRegistry, EngineError, Store, KEY_SEPARATOR};

/// Spawn the process-wide reconciliation task.
///
/// Ticks on a fixed period for the life of the process; the first tick fires
/// immediately, so a fresh mount gets its initial pull without waiting a full
/// period.
pub fn spawn(
    store: Arc<dyn Store>,
    registry: Arc<ConnectionRegistry>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            reconcile_tick(store.as_ref(), &registry).await;
        }
    })
}

/// One reconciliation pass: list every store key and, for every registered
/// connection, materialize any key missing from that connection's directory.
///
/// This pass only fills gaps. It never overwrites an existing local file,
/// even if store content has since changed; that is the engine's one explicit
/// tie-break rule, favoring local content when both exist. An error on one
/// (connection, key) pair is logged and the tick continues with the next
/// pair.
pub async fn reconcile_tick(store: &dyn Store, registry: &ConnectionRegistry) {
    let keys = match store.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Failed to list store keys: {}", e);
            return;
        }
    };

    for root in registry.roots() {
        for key in &keys {
            if let Err(e) = materialize(store, &root, key).await {
                warn!("Reconcile failed for {} under {}: {}", key, root.display(), e);
            }
        }
    }
}

async fn materialize(store: &dyn Store, root: &Path, key: &str) -> Result<(), EngineError> {
    let path = path_for(root, key);

    if key.contains(KEY_SEPARATOR) {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(());
    }

    // The key may have been deleted between the KEYS listing and this GET.
    let Some(content) = store.get(key).await? else {
        return Ok(());
    };

    tokio::fs::write(&path, &content).await?;
    debug!("Materialized {} ({} bytes)", path.display(), content.len());
    Ok(())
}
