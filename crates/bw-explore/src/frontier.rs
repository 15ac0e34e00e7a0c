use bw_core::StateBlob;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::store::FrontierStore;

/// A pending exploration: the state to resume and the choice texts that led
/// there from the story start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    pub state_blob: StateBlob,
    pub path: Vec<String>,
    pub depth: usize,
}

impl PathRecord {
    pub fn root(state_blob: StateBlob) -> Self {
        Self {
            state_blob,
            path: Vec::new(),
            depth: 0,
        }
    }

    pub fn child(&self, state_blob: StateBlob, choice_text: &str) -> Self {
        let mut path = self.path.clone();
        path.push(choice_text.to_string());
        Self {
            state_blob,
            path,
            depth: self.depth + 1,
        }
    }
}

/// LIFO stack of pending paths with bounded memory. When the in-memory part
/// reaches the spill threshold it is written to the store as one batch; when
/// it runs dry the newest half threshold of stored records is loaded back,
/// leaving room to push before the next spill.
pub struct Frontier<S: FrontierStore> {
    stack: Vec<PathRecord>,
    store: S,
    spill_threshold: usize,
    spills: u64,
    reloads: u64,
}

impl<S: FrontierStore> Frontier<S> {
    pub fn new(store: S, spill_threshold: usize) -> Self {
        Self {
            stack: Vec::new(),
            store,
            spill_threshold: spill_threshold.max(1),
            spills: 0,
            reloads: 0,
        }
    }

    pub fn push(&mut self, record: PathRecord) -> Result<(), StoreError> {
        self.stack.push(record);
        if self.stack.len() >= self.spill_threshold {
            self.spill()?;
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Option<PathRecord>, StoreError> {
        if let Some(record) = self.stack.pop() {
            return Ok(Some(record));
        }
        if self.store.is_empty() {
            return Ok(None);
        }
        self.reload()?;
        Ok(self.stack.pop())
    }

    /// Move whatever is still in memory into the store.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        if self.stack.is_empty() {
            return Ok(());
        }
        self.spill()
    }

    pub fn has_more(&self) -> bool {
        !self.stack.is_empty() || !self.store.is_empty()
    }

    pub fn in_memory_len(&self) -> usize {
        self.stack.len()
    }

    pub fn stored_len(&self) -> u64 {
        self.store.len()
    }

    /// Depth of the record that would be popped next from memory.
    pub fn current_depth(&self) -> usize {
        self.stack.last().map_or(0, |record| record.depth)
    }

    pub fn spills(&self) -> u64 {
        self.spills
    }

    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn reload_size(&self) -> usize {
        (self.spill_threshold / 2).max(1)
    }

    fn spill(&mut self) -> Result<(), StoreError> {
        self.store.insert_batch(&self.stack)?;
        self.spills += 1;
        debug!(
            records = self.stack.len(),
            stored = self.store.len(),
            "spilled frontier"
        );
        self.stack.clear();
        Ok(())
    }

    fn reload(&mut self) -> Result<(), StoreError> {
        let batch = self.store.last(self.reload_size())?;
        let ids = batch.iter().map(|record| record.id).collect::<Vec<_>>();
        self.store.delete(&ids)?;
        self.reloads += 1;
        debug!(
            records = batch.len(),
            stored = self.store.len(),
            "reloaded frontier"
        );
        // `last` is newest first; keep the newest on top of the stack.
        self.stack = batch.into_iter().rev().map(|record| record.val).collect();
        Ok(())
    }
}
