use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec::StateHash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingDetail {
    pub knot: String,
    pub last_line: String,
}

/// Ending counts keyed by state hash, iterated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EndingTally {
    order: Vec<StateHash>,
    counts: HashMap<StateHash, u64>,
    details: HashMap<StateHash, EndingDetail>,
}

impl EndingTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, hash: StateHash, detail: EndingDetail) {
        self.add(hash, 1);
        self.details.entry(hash).or_insert(detail);
    }

    pub fn add(&mut self, hash: StateHash, count: u64) {
        match self.counts.get_mut(&hash) {
            Some(slot) => *slot += count,
            None => {
                self.order.push(hash);
                self.counts.insert(hash, count);
            }
        }
    }

    pub fn set_detail(&mut self, hash: StateHash, detail: EndingDetail) {
        self.details.insert(hash, detail);
    }

    pub fn count(&self, hash: &StateHash) -> u64 {
        self.counts.get(hash).copied().unwrap_or(0)
    }

    pub fn detail(&self, hash: &StateHash) -> Option<&EndingDetail> {
        self.details.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = (StateHash, u64)> + '_ {
        self.order.iter().map(|hash| (*hash, self.count(hash)))
    }

    pub fn details(&self) -> impl Iterator<Item = (StateHash, &EndingDetail)> + '_ {
        self.order
            .iter()
            .filter_map(|hash| self.details.get(hash).map(|detail| (*hash, detail)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.counts.clear();
        self.details.clear();
    }

    /// Sum counts; details already known are kept.
    pub fn merge(&mut self, other: &EndingTally) {
        for (hash, count) in other.entries() {
            self.add(hash, count);
        }
        for (hash, detail) in other.details() {
            self.details.entry(hash).or_insert_with(|| detail.clone());
        }
    }

    /// Highest count. On a tie the later entry wins.
    pub fn most_reached(&self) -> Option<(StateHash, u64)> {
        self.entries()
            .reduce(|best, next| if best.1 > next.1 { best } else { next })
    }

    /// Lowest count. On a tie the later entry wins.
    pub fn least_reached(&self) -> Option<(StateHash, u64)> {
        self.entries()
            .reduce(|best, next| if best.1 < next.1 { best } else { next })
    }
}

#[cfg(test)]
mod tally_tests {
    use super::*;

    fn hash(byte: u8) -> StateHash {
        StateHash::from([byte; 32])
    }

    fn detail(knot: &str) -> EndingDetail {
        EndingDetail {
            knot: knot.to_string(),
            last_line: format!("{} ends", knot),
        }
    }

    #[test]
    fn record_counts_and_keeps_first_detail() {
        let mut tally = EndingTally::new();
        tally.record(hash(1), detail("a"));
        tally.record(hash(1), detail("other"));
        tally.record(hash(2), detail("b"));
        assert_eq!(tally.count(&hash(1)), 2);
        assert_eq!(tally.detail(&hash(1)).map(|d| d.knot.as_str()), Some("a"));
        assert_eq!(tally.total(), 3);
        assert_eq!(
            tally.entries().collect::<Vec<_>>(),
            vec![(hash(1), 2), (hash(2), 1)]
        );
    }

    #[test]
    fn ties_resolve_to_later_entry() {
        let mut tally = EndingTally::new();
        tally.add(hash(1), 5);
        tally.add(hash(2), 1);
        tally.add(hash(3), 5);
        tally.add(hash(4), 1);
        assert_eq!(tally.most_reached(), Some((hash(3), 5)));
        assert_eq!(tally.least_reached(), Some((hash(4), 1)));
    }

    #[test]
    fn merge_sums_counts() {
        let mut left = EndingTally::new();
        left.add(hash(1), 3);
        let mut right = EndingTally::new();
        right.add(hash(1), 2);
        right.record(hash(2), detail("b"));
        left.merge(&right);
        assert_eq!(left.count(&hash(1)), 5);
        assert_eq!(left.count(&hash(2)), 1);
        assert!(left.detail(&hash(2)).is_some());

        left.clear();
        assert!(left.is_empty());
        assert_eq!(left.most_reached(), None);
    }
}
