/// Errors that can occur talking to the key-value store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Connection to the store failed.
    #[error("Connection to store at '{addr}' failed")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store was reachable but the round trip failed (network, timeout,
    /// auth).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Malformed store URL or response.
    #[error("Store protocol error: {0}")]
    Protocol(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::ConnectionFailed { .. } => true,
            StoreError::Unavailable(_) => true,
            StoreError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// Errors that can occur during engine operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Store round trip failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Local filesystem failure (reading, writing, walking).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The watch subsystem failed to register or deliver.
    #[error("Watch error: {0}")]
    Watch(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<voldis_config::ConfigError> for EngineError {
    fn from(e: voldis_config::ConfigError) -> Self {
        EngineError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_transient_connection_failed() {
        let err = StoreError::ConnectionFailed {
            addr: "redis://127.0.0.1:6379".to_string(),
            source: Box::new(std::io::Error::other("conn err")),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_store_is_transient_io() {
        let err = StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_store_not_transient_protocol() {
        let err = StoreError::Protocol("bad url".to_string());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_engine_from_store() {
        let err: EngineError = StoreError::Unavailable("timeout".to_string()).into();
        assert!(matches!(err, EngineError::Store(_)));
    }

    #[test]
    fn test_engine_from_config() {
        let config_err = voldis_config::ConfigError::InvalidConfig("bad".to_string());
        let err: EngineError = config_err.into();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
