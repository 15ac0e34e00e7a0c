use std::collections::{BTreeMap, BTreeSet};

use bw_core::{ChoiceItem, StateBlob, StoryError, StoryInterpreter, StoryValue};
use regex::Regex;
use rhai::Engine;

use crate::snapshot::PendingChoice;
use crate::story::{StoryGraph, StoryNode};

/// Silent steps (code, diverts, skipped nodes) allowed before a single
/// `advance` gives up.
pub const STEP_GUARD: usize = 10_000;

const RHAI_MAX_OPERATIONS: u64 = 100_000;

pub struct StoryEngine {
    pub(crate) graph: StoryGraph,
    pub(crate) rhai: Engine,
    pub(crate) template: Regex,

    pub(crate) knot: String,
    pub(crate) node_index: usize,
    pub(crate) variables: BTreeMap<String, StoryValue>,
    pub(crate) spent_options: BTreeSet<String>,
    pub(crate) pending: Vec<PendingChoice>,
    pub(crate) last_line: String,
    pub(crate) ended: bool,
}

impl StoryEngine {
    pub fn new(graph: StoryGraph) -> Result<Self, StoryError> {
        if graph.knot(&graph.start).is_none() {
            return Err(StoryError::new(
                "STORY_START_MISSING",
                format!("Start knot \"{}\" is not defined.", graph.start),
            ));
        }

        let template = Regex::new(r"\$\{([^{}]+)\}")
            .map_err(|error| StoryError::new("ENGINE_TEMPLATE_REGEX", error.to_string()))?;

        let mut rhai = Engine::new();
        rhai.set_strict_variables(true);
        rhai.set_max_operations(RHAI_MAX_OPERATIONS);

        Ok(Self {
            knot: graph.start.clone(),
            node_index: 0,
            variables: graph.variables.clone(),
            spent_options: BTreeSet::new(),
            pending: Vec::new(),
            last_line: String::new(),
            ended: false,
            graph,
            rhai,
            template,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, StoryError> {
        Self::new(StoryGraph::from_json(raw)?)
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn variable(&self, name: &str) -> Option<&StoryValue> {
        self.variables.get(name)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn waiting_choice(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Render the next line. Returns an empty string when the engine only
    /// reached a choice point or the end without producing text.
    pub fn next_line(&mut self) -> Result<String, StoryError> {
        if self.ended {
            return Err(StoryError::new("ENGINE_ENDED", "Story has already ended."));
        }
        if self.waiting_choice() {
            return Err(StoryError::new(
                "ENGINE_WAITING_CHOICE",
                "A choice must be made before continuing.",
            ));
        }

        self.settle()?;
        if self.ended || self.waiting_choice() {
            return Ok(String::new());
        }

        let Some(StoryNode::Text { value, .. }) = self.current_node()?.cloned() else {
            return Err(StoryError::new(
                "ENGINE_POSITION_INVALID",
                format!(
                    "Settled position {}:{} is not a text node.",
                    self.knot, self.node_index
                ),
            ));
        };

        let rendered = self.render_text(&value)?;
        self.node_index += 1;
        self.last_line = rendered.clone();
        self.settle()?;
        Ok(rendered)
    }

    pub fn choose(&mut self, index: usize) -> Result<(), StoryError> {
        if self.pending.is_empty() {
            return Err(StoryError::new(
                "ENGINE_NO_PENDING_CHOICE",
                "No pending choice is available.",
            ));
        }

        let Some(choice) = self.pending.get(index).cloned() else {
            return Err(StoryError::new(
                "ENGINE_CHOICE_INDEX",
                format!("Choice index \"{}\" is out of range.", index),
            ));
        };

        if choice.once {
            self.spent_options.insert(choice.option_id.clone());
        }
        self.pending.clear();

        match choice.divert {
            Some(target) => self.enter_knot(&target),
            None => {
                self.node_index += 1;
                Ok(())
            }
        }
    }

    pub(crate) fn current_node(&self) -> Result<Option<&StoryNode>, StoryError> {
        let nodes = self.graph.knot(&self.knot).ok_or_else(|| {
            StoryError::new(
                "ENGINE_KNOT_NOT_FOUND",
                format!("Knot \"{}\" is not defined.", self.knot),
            )
        })?;
        Ok(nodes.get(self.node_index))
    }

    fn enter_knot(&mut self, target: &str) -> Result<(), StoryError> {
        if self.graph.knot(target).is_none() {
            return Err(StoryError::new(
                "ENGINE_KNOT_NOT_FOUND",
                format!("Divert target \"{}\" is not defined.", target),
            ));
        }
        self.knot = target.to_string();
        self.node_index = 0;
        Ok(())
    }

    /// Run silent nodes until the position rests on a visible text node, a
    /// pending choice, or the end of the story.
    fn settle(&mut self) -> Result<(), StoryError> {
        for _ in 0..STEP_GUARD {
            if self.ended || self.waiting_choice() {
                return Ok(());
            }

            let Some(node) = self.current_node()?.cloned() else {
                self.ended = true;
                return Ok(());
            };

            match node {
                StoryNode::Text { when, .. } => {
                    if self.condition_holds(when.as_deref())? {
                        return Ok(());
                    }
                    self.node_index += 1;
                }
                StoryNode::Code { code } => {
                    self.run_code(&code)?;
                    self.node_index += 1;
                }
                StoryNode::Divert { target, when } => {
                    if self.condition_holds(when.as_deref())? {
                        self.enter_knot(&target)?;
                    } else {
                        self.node_index += 1;
                    }
                }
                StoryNode::Choice { options } => {
                    let mut visible = Vec::new();
                    for (option_index, option) in options.iter().enumerate() {
                        let option_id =
                            format!("{}:{}:{}", self.knot, self.node_index, option_index);
                        if option.once && self.spent_options.contains(&option_id) {
                            continue;
                        }
                        if !self.condition_holds(option.when.as_deref())? {
                            continue;
                        }
                        visible.push(PendingChoice {
                            index: visible.len(),
                            text: self.render_text(&option.text)?,
                            option_id,
                            divert: option.divert.clone(),
                            once: option.once,
                        });
                    }

                    if visible.is_empty() {
                        self.node_index += 1;
                    } else {
                        self.pending = visible;
                    }
                }
                StoryNode::End => {
                    self.ended = true;
                }
            }
        }

        Err(StoryError::new(
            "ENGINE_GUARD_EXCEEDED",
            format!(
                "Execution guard exceeded {} silent steps in knot \"{}\".",
                STEP_GUARD, self.knot
            ),
        ))
    }

    fn condition_holds(&self, when: Option<&str>) -> Result<bool, StoryError> {
        match when {
            Some(expr) => self.eval_boolean(expr),
            None => Ok(true),
        }
    }
}

impl StoryInterpreter for StoryEngine {
    fn can_continue(&self) -> bool {
        !self.ended && !self.waiting_choice()
    }

    fn advance(&mut self) -> Result<String, StoryError> {
        self.next_line()
    }

    fn current_choices(&self) -> Vec<ChoiceItem> {
        self.pending
            .iter()
            .map(|choice| ChoiceItem {
                index: choice.index,
                text: choice.text.clone(),
            })
            .collect()
    }

    fn choose(&mut self, index: usize) -> Result<(), StoryError> {
        StoryEngine::choose(self, index)
    }

    fn capture_state(&self) -> Result<StateBlob, StoryError> {
        let snapshot = self.snapshot();
        serde_json::to_string(&snapshot)
            .map(StateBlob::new)
            .map_err(|error| StoryError::new("SNAPSHOT_ENCODE", error.to_string()))
    }

    fn restore_state(&mut self, blob: &StateBlob) -> Result<(), StoryError> {
        let snapshot = serde_json::from_str(blob.as_str())
            .map_err(|error| StoryError::new("SNAPSHOT_DECODE", error.to_string()))?;
        self.resume(snapshot)
    }

    fn current_knot(&self) -> String {
        self.knot.clone()
    }

    fn current_text(&self) -> String {
        self.last_line.clone()
    }
}
