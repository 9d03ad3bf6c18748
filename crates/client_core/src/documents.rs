//! Count of documents indexed in the knowledge base, fed by upload/delete
//! events from an external uploader.

/// Completion event reported by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// An upload finished. The uploader only counts it when it reported the
    /// resulting document count.
    Added { reported_count: Option<usize> },
    Removed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentRegistry {
    count: usize,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn decrement(&mut self) {
        self.count = self.count.saturating_sub(1);
    }

    pub fn apply(&mut self, event: DocumentEvent) {
        match event {
            DocumentEvent::Added {
                reported_count: Some(_),
            } => self.increment(),
            DocumentEvent::Added {
                reported_count: None,
            } => {
                tracing::debug!("upload reported no document count; registry unchanged");
            }
            DocumentEvent::Removed => self.decrement(),
        }
    }

    pub fn label(&self) -> String {
        match self.count {
            1 => "1 document".to_string(),
            n => format!("{n} documents"),
        }
    }
}
