use std::collections::HashSet;

use crate::codec::StateHash;

/// Hashes of states already expanded in the current window.
#[derive(Debug, Default)]
pub struct VisitedIndex {
    hashes: HashSet<StateHash>,
    clears: u64,
}

impl VisitedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, hash: &StateHash) -> bool {
        self.hashes.contains(hash)
    }

    /// Returns `false` when the hash was already present.
    pub fn mark(&mut self, hash: StateHash) -> bool {
        self.hashes.insert(hash)
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
        self.clears += 1;
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clears(&self) -> u64 {
        self.clears
    }
}

#[cfg(test)]
mod visited_tests {
    use super::*;

    #[test]
    fn mark_reports_first_insert_only() {
        let mut visited = VisitedIndex::new();
        let hash = StateHash::from([7u8; 32]);
        assert!(!visited.seen(&hash));
        assert!(visited.mark(hash));
        assert!(!visited.mark(hash));
        assert!(visited.seen(&hash));

        visited.clear();
        assert!(visited.is_empty());
        assert_eq!(visited.clears(), 1);
        assert!(visited.mark(hash));
    }
}
