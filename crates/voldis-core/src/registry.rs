use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::debug;

/// One mounted directory attached to the shared store.
///
/// Owns the background tasks (bulk ingest, watch loop) spawned for this
/// mount; they are aborted when the connection is dropped, which happens when
/// it is removed from the registry on unmount. Nothing outside the registry
/// holds a reference to a `Connection`, only to cloned root paths.
pub struct Connection {
    name: String,
    root: PathBuf,
    tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Connection {
            name: name.into(),
            root: root.into(),
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Attach a background task whose lifetime is tied to this connection.
    pub fn add_task(&mut self, handle: JoinHandle<()>) {
        self.tasks.push(handle);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!("Connection '{}' dropped, {} task(s) aborted", self.name, self.tasks.len());
    }
}

/// The set of currently mounted connections.
///
/// All mutation and enumeration is serialized behind a single mutex so that
/// concurrent mount/unmount calls cannot corrupt the set or race with a
/// reconciler pass reading it. Membership reflects exactly the connections
/// between their `mount` and `unmount` calls.
#[derive(Default)]
pub struct ConnectionRegistry {
    conns: Mutex<Vec<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. A connection with the same name is replaced,
    /// aborting its tasks, so a repeated mount never leaves two watch loops
    /// running for one root.
    pub fn insert(&self, conn: Connection) {
        let mut conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        conns.retain(|c| c.name != conn.name);
        conns.push(conn);
    }

    /// Deregister a connection by name. Dropping the returned connection
    /// aborts its background tasks.
    pub fn remove(&self, name: &str) -> Option<Connection> {
        let mut conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        let idx = conns.iter().position(|c| c.name == name)?;
        Some(conns.swap_remove(idx))
    }

    pub fn contains(&self, name: &str) -> bool {
        let conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        conns.iter().any(|c| c.name == name)
    }

    /// Snapshot of every registered root path.
    pub fn roots(&self) -> Vec<PathBuf> {
        let conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        conns.iter().map(|c| c.root.clone()).collect()
    }

    pub fn len(&self) -> usize {
        let conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every connection, aborting all their tasks.
    pub fn clear(&self) {
        let mut conns = self.conns.lock().unwrap_or_else(|e| e.into_inner());
        conns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_roots() {
        let registry = ConnectionRegistry::new();
        registry.insert(Connection::new("a", "/srv/volumes/a"));
        registry.insert(Connection::new("b", "/srv/volumes/b"));

        let mut roots = registry.roots();
        roots.sort();
        assert_eq!(
            roots,
            vec![PathBuf::from("/srv/volumes/a"), PathBuf::from("/srv/volumes/b")]
        );
    }

    #[test]
    fn test_remove() {
        let registry = ConnectionRegistry::new();
        registry.insert(Connection::new("a", "/srv/volumes/a"));
        assert!(registry.contains("a"));

        let conn = registry.remove("a").unwrap();
        assert_eq!(conn.name(), "a");
        assert!(!registry.contains("a"));
        assert!(registry.is_empty());

        assert!(registry.remove("a").is_none());
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let registry = ConnectionRegistry::new();
        registry.insert(Connection::new("a", "/old/a"));
        registry.insert(Connection::new("a", "/new/a"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.roots(), vec![PathBuf::from("/new/a")]);
    }

    #[tokio::test]
    async fn test_drop_aborts_tasks() {
        let registry = ConnectionRegistry::new();
        let mut conn = Connection::new("a", "/srv/volumes/a");
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let probe = handle.abort_handle();
        conn.add_task(handle);
        registry.insert(conn);

        registry.remove("a");
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(probe.is_finished());
    }
}
