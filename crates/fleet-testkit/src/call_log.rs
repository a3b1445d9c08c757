//! Shared, ordered record of collaborator calls.

use parking_lot::Mutex;
use std::sync::Arc;

/// Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: &'static str) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().clone()
    }

    /// Entries whose name starts with `prefix`, in call order
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<&'static str> {
        self.entries
            .lock()
            .iter()
            .copied()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| *e == entry)
    }
}
