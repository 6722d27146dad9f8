use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use voldis_core::{key_for, Store};

/// Walk the tree rooted at `root` once and push every regular file into the
/// store.
///
/// A file is only pushed when the stored value's byte length differs from the
/// local file's (a missing key counts as zero length). The length-only
/// comparison deliberately mirrors the store's cheap change heuristic; the
/// watch loop pushes unconditionally and covers same-length edits at runtime.
///
/// Partial-failure tolerant: errors reading an individual file or talking to
/// the store are logged and the rest of the walk continues.
pub async fn ingest(store: &dyn Store, root: &Path) {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Failed to read directory {}: {}", dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to walk {}: {}", dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                ingest_file(store, root, &path).await;
            }
        }
    }

    debug!("Bulk ingest of {} finished", root.display());
}

async fn ingest_file(store: &dyn Store, root: &Path, path: &Path) {
    let Some(key) = key_for(root, path) else {
        return;
    };

    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return;
        }
    };

    let stored_len = match store.get(&key).await {
        Ok(value) => value.map(|v| v.len()).unwrap_or(0),
        Err(e) => {
            warn!("Store get failed for {}: {}", key, e);
            return;
        }
    };

    if stored_len == content.len() {
        return;
    }

    match store.set(&key, &content).await {
        Ok(()) => debug!("Ingested {} ({} bytes)", key, content.len()),
        Err(e) => warn!("Store set failed for {}: {}", key, e),
    }
}
