//! Reference interpreter for compiled story graphs.
//!
//! A story is a JSON document of named knots, each an ordered list of nodes.
//! Conditions and code blocks are Rhai; text may interpolate `${expr}`.

mod engine;
mod eval;
mod snapshot;
mod story;

pub use engine::{StoryEngine, STEP_GUARD};
pub use snapshot::{PendingChoice, StorySnapshot, SNAPSHOT_SCHEMA_V1};
pub use story::{ChoiceOption, StoryGraph, StoryNode, STORY_SCHEMA_V1};

#[cfg(test)]
mod tests;
