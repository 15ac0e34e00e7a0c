use std::path::PathBuf;

/// Guard thresholds and batching for one traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreConfig {
    /// Pops between forced checkpoint flushes.
    pub batch_size: usize,
    /// In-memory frontier length that triggers a spill to the store.
    pub spill_threshold: usize,
    /// Paths at this depth are aborted without expansion.
    pub max_depth: usize,
    /// Times one state may recur inside a single advance chain.
    pub loop_threshold: usize,
    /// Rendered units allowed between two choice points.
    pub max_objects_between_choices: usize,
    /// A window whose rolling max objects reaches this value is flushed early.
    pub object_flush_threshold: usize,
    /// Frontier + visited + tally entries held in memory before an early flush.
    pub working_set_limit: usize,
    /// Forget visited states on every flush to reclaim memory. Old states may
    /// then be expanded again.
    pub clear_visited_on_flush: bool,
    /// Endings between two continue decisions.
    pub continue_interval: u64,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            batch_size: 20_000,
            spill_threshold: 10_000,
            max_depth: 200,
            loop_threshold: 3,
            max_objects_between_choices: 1_000,
            object_flush_threshold: 1_000,
            working_set_limit: 5_000_000,
            clear_visited_on_flush: true,
            continue_interval: 10_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointConfig {
    pub dir: PathBuf,
    pub prefix: String,
}

impl CheckpointConfig {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

/// Prefix shared by every artifact of a run over one story file: the file
/// stem plus the first 8 hex digits of the content hash.
pub fn run_prefix(stem: &str, story_bytes: &[u8]) -> String {
    let digest = blake3::hash(story_bytes).to_hex();
    let stem = stem
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    format!("{}_{}", stem, &digest.as_str()[..8])
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = ExploreConfig::default();
        assert_eq!(config.batch_size, 20_000);
        assert_eq!(config.spill_threshold, 10_000);
        assert_eq!(config.max_depth, 200);
        assert_eq!(config.loop_threshold, 3);
        assert_eq!(config.max_objects_between_choices, 1_000);
        assert!(config.clear_visited_on_flush);
    }

    #[test]
    fn run_prefix_is_stable_and_sanitized() {
        let first = run_prefix("The Intercept.v2", b"{}");
        let second = run_prefix("The Intercept.v2", b"{}");
        assert_eq!(first, second);
        assert!(first.starts_with("The_Intercept_v2_"));
        assert_eq!(first.len(), "The_Intercept_v2_".len() + 8);
        assert_ne!(first, run_prefix("The Intercept.v2", b"{ }"));
    }
}
