mod error;
mod keys;
mod registry;
mod traits;

pub use error::{EngineError, StoreError};
pub use keys::{key_for, path_for, KEY_SEPARATOR};
pub use registry::{Connection, ConnectionRegistry};
pub use traits::Store;
