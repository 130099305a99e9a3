//! Live output registry
//!
//! Holds the stdout lines of executions that are still in flight. Entries
//! are opened on submit and closed right after the terminal write.

use sortie_runner::LineBuffer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct LiveOutput {
    buffers: Arc<Mutex<HashMap<Uuid, LineBuffer>>>,
}

impl LiveOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, id: Uuid) {
        self.buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, LineBuffer::new());
    }

    /// Appends a line; ignored once the entry is closed
    pub fn push(&self, id: Uuid, line: String) {
        let buffer = self
            .buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned();

        if let Some(buffer) = buffer {
            buffer.push(line);
        }
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Vec<String>> {
        self.buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(LineBuffer::snapshot)
    }

    pub fn close(&self, id: Uuid) {
        self.buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_push_close() {
        let live = LiveOutput::new();
        let id = Uuid::new_v4();

        assert!(live.snapshot(id).is_none());

        live.open(id);
        live.push(id, "one".to_string());
        live.push(id, "two".to_string());
        assert_eq!(live.snapshot(id), Some(vec!["one".to_string(), "two".to_string()]));

        live.close(id);
        live.push(id, "late".to_string());
        assert!(live.snapshot(id).is_none());
    }

    #[test]
    fn test_entries_are_isolated() {
        let live = LiveOutput::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        live.open(a);
        live.open(b);

        live.push(a, "for a".to_string());

        assert_eq!(live.snapshot(a).map(|l| l.len()), Some(1));
        assert_eq!(live.snapshot(b), Some(Vec::new()));
    }
}
