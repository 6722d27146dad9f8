mod engine;
mod ingest;
mod reconciler;
mod watcher;

pub use engine::Engine;
pub use ingest::ingest;
pub use reconciler::reconcile_tick;
pub use watcher::{apply_change, ChangeKind, FileChange, WatchEngine};
