use std::collections::BTreeMap;

use bw_core::{StoryError, StoryValue};
use serde::{Deserialize, Serialize};

use crate::engine::StoryEngine;

pub const SNAPSHOT_SCHEMA_V1: &str = "storySnapshot.v1";

/// Serializable engine state. Every collection is ordered so two equal
/// states always serialize to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySnapshot {
    pub schema_version: String,
    pub knot: String,
    pub node_index: usize,
    pub variables: BTreeMap<String, StoryValue>,
    pub spent_options: Vec<String>,
    pub pending: Vec<PendingChoice>,
    pub last_line: String,
    pub ended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChoice {
    pub index: usize,
    pub text: String,
    pub option_id: String,
    pub divert: Option<String>,
    pub once: bool,
}

impl StoryEngine {
    pub fn snapshot(&self) -> StorySnapshot {
        StorySnapshot {
            schema_version: SNAPSHOT_SCHEMA_V1.to_string(),
            knot: self.knot.clone(),
            node_index: self.node_index,
            variables: self.variables.clone(),
            spent_options: self.spent_options.iter().cloned().collect(),
            pending: self.pending.clone(),
            last_line: self.last_line.clone(),
            ended: self.ended,
        }
    }

    pub fn resume(&mut self, snapshot: StorySnapshot) -> Result<(), StoryError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_V1 {
            return Err(StoryError::new(
                "SNAPSHOT_SCHEMA",
                format!(
                    "Unsupported snapshot schema \"{}\".",
                    snapshot.schema_version
                ),
            ));
        }

        if self.graph.knot(&snapshot.knot).is_none() {
            return Err(StoryError::new(
                "SNAPSHOT_KNOT_UNKNOWN",
                format!("Snapshot points at unknown knot \"{}\".", snapshot.knot),
            ));
        }

        for name in snapshot.variables.keys() {
            if !self.graph.variables.contains_key(name) {
                return Err(StoryError::new(
                    "SNAPSHOT_VARIABLE_UNKNOWN",
                    format!("Snapshot contains unknown variable \"{}\".", name),
                ));
            }
        }

        self.knot = snapshot.knot;
        self.node_index = snapshot.node_index;
        self.variables = snapshot.variables;
        self.spent_options = snapshot.spent_options.into_iter().collect();
        self.pending = snapshot.pending;
        self.last_line = snapshot.last_line;
        self.ended = snapshot.ended;
        Ok(())
    }
}
