//! Checkpoint store handlers.

mod filesystem;
mod noop;

pub use filesystem::{FilesystemCheckpointFactory, FilesystemCheckpointStore, CHECKPOINT_FILE_NAME};
pub use noop::NoopCheckpointStore;
