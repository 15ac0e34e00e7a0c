use std::collections::BTreeMap;

use bw_core::{StoryError, StoryValue};
use serde::{Deserialize, Serialize};

pub const STORY_SCHEMA_V1: &str = "story.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGraph {
    pub schema_version: String,
    pub start: String,
    #[serde(default)]
    pub variables: BTreeMap<String, StoryValue>,
    pub knots: BTreeMap<String, Vec<StoryNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoryNode {
    Text {
        value: String,
        #[serde(default)]
        when: Option<String>,
    },
    Code {
        code: String,
    },
    Divert {
        target: String,
        #[serde(default)]
        when: Option<String>,
    },
    Choice {
        options: Vec<ChoiceOption>,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub divert: Option<String>,
    #[serde(default)]
    pub once: bool,
}

impl StoryGraph {
    /// Parse a compiled story. Only the envelope is checked here; unknown
    /// divert targets surface as runtime faults when they are reached.
    pub fn from_json(raw: &str) -> Result<Self, StoryError> {
        let graph: StoryGraph = serde_json::from_str(raw.trim_start_matches('\u{feff}'))
            .map_err(|error| StoryError::new("STORY_PARSE", error.to_string()))?;

        if graph.schema_version != STORY_SCHEMA_V1 {
            return Err(StoryError::new(
                "STORY_SCHEMA",
                format!(
                    "Unsupported story schema \"{}\", expected \"{}\".",
                    graph.schema_version, STORY_SCHEMA_V1
                ),
            ));
        }

        if !graph.knots.contains_key(&graph.start) {
            return Err(StoryError::new(
                "STORY_START_MISSING",
                format!("Start knot \"{}\" is not defined.", graph.start),
            ));
        }

        Ok(graph)
    }

    pub fn knot(&self, name: &str) -> Option<&[StoryNode]> {
        self.knots.get(name).map(Vec::as_slice)
    }
}
