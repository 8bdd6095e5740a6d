//! The single open-document slot owned by the dispatch loop.

use tracing::debug;

use crate::error::{Result, WorkerError};

/// State of the slot.
pub enum Slot<D> {
    /// Nothing open.
    Empty,
    /// A remote document whose bytes are still being fetched.
    Loading { generation: u64, url: String },
    /// A document ready for page-scoped calls.
    Open { generation: u64, document: D },
}

/// Holds at most one document. Handlers receive it by reference; only the
/// open and close handlers take it mutably.
pub struct Session<D> {
    slot: Slot<D>,
    generation: u64,
}

impl<D> Default for Session<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Session<D> {
    pub fn new() -> Self {
        Self {
            slot: Slot::Empty,
            generation: 0,
        }
    }

    pub fn slot(&self) -> &Slot<D> {
        &self.slot
    }

    /// Generation of whatever currently occupies the slot (0 when empty).
    pub fn generation(&self) -> u64 {
        match &self.slot {
            Slot::Empty => 0,
            Slot::Loading { generation, .. } | Slot::Open { generation, .. } => *generation,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Replace the slot with an open document, dropping any previous one.
    pub fn open(&mut self, document: D) -> u64 {
        let generation = self.next_generation();
        self.slot = Slot::Open {
            generation,
            document,
        };
        debug!(generation, "document opened");
        generation
    }

    /// Replace the slot with a pending remote load.
    pub fn begin_loading(&mut self, url: impl Into<String>) -> u64 {
        let generation = self.next_generation();
        self.slot = Slot::Loading {
            generation,
            url: url.into(),
        };
        debug!(generation, "remote document loading");
        generation
    }

    /// Finish a remote load. Returns `false` if the slot has moved on since
    /// `generation` was issued, in which case `document` is dropped.
    pub fn complete_loading(&mut self, generation: u64, document: D) -> bool {
        match &self.slot {
            Slot::Loading { generation: g, .. } if *g == generation => {
                self.slot = Slot::Open {
                    generation,
                    document,
                };
                true
            }
            _ => false,
        }
    }

    /// Abandon a remote load that failed. Stale generations are ignored.
    pub fn fail_loading(&mut self, generation: u64) -> bool {
        match &self.slot {
            Slot::Loading { generation: g, .. } if *g == generation => {
                self.slot = Slot::Empty;
                true
            }
            _ => false,
        }
    }

    /// Clear the slot. Closing an empty slot is a no-op.
    pub fn close(&mut self) {
        if !matches!(self.slot, Slot::Empty) {
            debug!(generation = self.generation(), "document closed");
        }
        self.slot = Slot::Empty;
    }

    /// The open document, or the reason there is none.
    pub fn document(&self) -> Result<&D> {
        match &self.slot {
            Slot::Empty => Err(WorkerError::NoDocumentOpen),
            Slot::Loading { url, .. } => Err(WorkerError::TryLater(url.clone())),
            Slot::Open { document, .. } => Ok(document),
        }
    }

    pub fn document_mut(&mut self) -> Result<&mut D> {
        match &mut self.slot {
            Slot::Empty => Err(WorkerError::NoDocumentOpen),
            Slot::Loading { url, .. } => Err(WorkerError::TryLater(url.clone())),
            Slot::Open { document, .. } => Ok(document),
        }
    }

    /// Generation of the pending remote load, if one is in progress.
    pub fn loading_generation(&self) -> Option<u64> {
        match &self.slot {
            Slot::Loading { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.slot, Slot::Loading { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new_is_empty() {
        let session: Session<String> = Session::new();
        assert!(matches!(session.document(), Err(WorkerError::NoDocumentOpen)));
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = Session::new();
        session.open("doc".to_string());
        session.close();
        session.close();
        assert!(matches!(session.document(), Err(WorkerError::NoDocumentOpen)));
    }

    #[test]
    fn test_loading_reports_try_later() {
        let mut session: Session<String> = Session::new();
        session.begin_loading("https://example.com/a.pdf");
        let err = session.document().err().unwrap();
        assert!(err.is_try_later());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut session = Session::new();
        let first = session.begin_loading("https://example.com/a.pdf");
        let second = session.begin_loading("https://example.com/b.pdf");
        assert!(!session.complete_loading(first, "a".to_string()));
        assert!(session.complete_loading(second, "b".to_string()));
        assert_eq!(session.document().unwrap(), "b");
    }

    #[test]
    fn test_open_replaces_previous_document() {
        let mut session = Session::new();
        let first = session.open("a".to_string());
        let second = session.open("b".to_string());
        assert!(second > first);
        assert_eq!(session.document().unwrap(), "b");
    }
}
