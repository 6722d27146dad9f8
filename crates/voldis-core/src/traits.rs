use async_trait::async_trait;

use crate::error::StoreError;

/// Trait for remote key-value store clients.
///
/// Keys are canonical relative paths (see [`crate::key_for`]); values are raw
/// file bytes. The store is the single source of truth shared by all mounted
/// connections, so implementations must not cache: every call is a fresh
/// round trip that reflects concurrent writers.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Fetch the value for a key. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Set a key to the given value, creating it if it doesn't exist.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// List every key in the store. Order is unspecified.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
