use serde::{Deserialize, Serialize};

/// Traversal statistics for one checkpoint window, or the sum of several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunCounters {
    pub state_counter: u64,
    pub choices_count: u64,
    pub endings_count: u64,
    pub max_depth_reached: usize,
    pub max_depth_aborts: u64,
    pub max_objects_between_choices: usize,
}

impl RunCounters {
    /// Sum counts, keep the larger high-water marks.
    pub fn absorb(&mut self, other: &RunCounters) {
        self.state_counter += other.state_counter;
        self.choices_count += other.choices_count;
        self.endings_count += other.endings_count;
        self.max_depth_aborts += other.max_depth_aborts;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
        self.max_objects_between_choices = self
            .max_objects_between_choices
            .max(other.max_objects_between_choices);
    }

    pub fn combined(&self, other: &RunCounters) -> RunCounters {
        let mut out = *self;
        out.absorb(other);
        out
    }
}

#[cfg(test)]
mod counters_tests {
    use super::*;

    #[test]
    fn absorb_sums_counts_and_maxes_marks() {
        let mut total = RunCounters {
            state_counter: 4,
            endings_count: 1,
            max_depth_reached: 9,
            max_objects_between_choices: 3,
            ..RunCounters::default()
        };
        total.absorb(&RunCounters {
            state_counter: 2,
            endings_count: 5,
            max_depth_reached: 4,
            max_objects_between_choices: 12,
            max_depth_aborts: 1,
            ..RunCounters::default()
        });
        assert_eq!(total.state_counter, 6);
        assert_eq!(total.endings_count, 6);
        assert_eq!(total.max_depth_reached, 9);
        assert_eq!(total.max_objects_between_choices, 12);
        assert_eq!(total.max_depth_aborts, 1);
    }
}
