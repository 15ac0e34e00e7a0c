use std::collections::HashMap;

use bw_core::{StateBlob, StoryInterpreter};
use tracing::{debug, trace};

use crate::codec::{self, StateHash};
use crate::config::ExploreConfig;
use crate::counters::RunCounters;
use crate::error::ExploreError;
use crate::faults::{ErrorRecord, ErrorRecorder, FaultKind};
use crate::frontier::{Frontier, PathRecord};
use crate::store::FrontierStore;
use crate::tally::{EndingDetail, EndingTally};
use crate::visited::VisitedIndex;

pub const LOOP_MESSAGE: &str = "Detected loop without choices";
pub const OBJECT_LIMIT_MESSAGE: &str = "Exceeded maximum number of objects between choices";

/// The choice behind the record being expanded. Records popped from the
/// frontier only carry the state after their choice; `state_before` is known
/// for choices applied during the current expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChoice {
    pub text: String,
    pub state_before: Option<StateBlob>,
    pub state_after: Option<StateBlob>,
}

impl LastChoice {
    /// The choice that produced `record`, or `None` for the root.
    pub fn leading_to(record: &PathRecord) -> Option<Self> {
        record.path.last().map(|text| Self {
            text: text.clone(),
            state_before: None,
            state_after: Some(record.state_blob.clone()),
        })
    }
}

/// Everything one expansion step reads or updates, besides the frontier.
#[derive(Debug, Default)]
pub struct TraversalContext {
    pub visited: VisitedIndex,
    pub tally: EndingTally,
    pub errors: ErrorRecorder,
    /// Counters of the current checkpoint window.
    pub counters: RunCounters,
    pub last_choice: Option<LastChoice>,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault with the last choice attached. Returns `false` when the
    /// `(knot, kind)` pair was already reported.
    pub fn fault(
        &mut self,
        kind: FaultKind,
        message: impl Into<String>,
        knot: impl Into<String>,
        path: &[String],
    ) -> bool {
        let mut record = ErrorRecord::new(kind, message, knot, path);
        if let Some(last) = &self.last_choice {
            record = record
                .with_last_choice(last.text.clone())
                .with_states(last.state_before.clone(), last.state_after.clone());
        }
        self.errors.record(record)
    }

    /// Entries held in memory by this context.
    pub fn working_set(&self) -> usize {
        self.visited.len() + self.tally.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    DepthAborted,
    AlreadyVisited,
    Faulted(FaultKind),
    Ending,
    Expanded { pushed: usize, merged: usize },
}

/// Run one frontier record through restore, advance and branch.
///
/// Story faults are recorded in `ctx` and reported as
/// [`StepOutcome::Faulted`]. Only codec and store failures return `Err`.
pub fn expand_record<I, S>(
    interp: &mut I,
    ctx: &mut TraversalContext,
    frontier: &mut Frontier<S>,
    config: &ExploreConfig,
    record: &PathRecord,
) -> Result<StepOutcome, ExploreError>
where
    I: StoryInterpreter + ?Sized,
    S: FrontierStore,
{
    ctx.last_choice = LastChoice::leading_to(record);
    ctx.counters.max_depth_reached = ctx.counters.max_depth_reached.max(record.depth);
    if record.depth >= config.max_depth {
        ctx.counters.max_depth_aborts += 1;
        trace!(depth = record.depth, "depth limit reached");
        return Ok(StepOutcome::DepthAborted);
    }

    codec::decode(interp, &record.state_blob)?;
    let state_hash = codec::hash(&record.state_blob);
    if !ctx.visited.mark(state_hash) {
        return Ok(StepOutcome::AlreadyVisited);
    }
    ctx.counters.state_counter += 1;

    if let Some(kind) = advance_to_branch(interp, ctx, config, record, state_hash)? {
        return Ok(StepOutcome::Faulted(kind));
    }

    let choices = interp.current_choices();
    if choices.is_empty() {
        let detail = EndingDetail {
            knot: interp.current_knot(),
            last_line: interp.current_text().trim().to_string(),
        };
        debug!(
            ending = %state_hash.short(),
            knot = %detail.knot,
            depth = record.depth,
            "reached ending"
        );
        ctx.tally.record(state_hash, detail);
        ctx.counters.endings_count += 1;
        return Ok(StepOutcome::Ending);
    }

    let mut pushed = 0usize;
    let mut merged = 0usize;
    for choice in choices {
        let state_before = codec::encode(interp)?;
        if let Err(fault) = interp.choose(choice.index) {
            codec::decode(interp, &state_before)?;
            ctx.last_choice = Some(LastChoice {
                text: choice.text.clone(),
                state_before: Some(state_before),
                state_after: None,
            });
            let knot = interp.current_knot();
            ctx.fault(FaultKind::RuntimeFault, fault.to_string(), knot, &record.path);
            return Ok(StepOutcome::Faulted(FaultKind::RuntimeFault));
        }

        let state_after = codec::encode(interp)?;
        let after_hash = codec::hash(&state_after);
        ctx.last_choice = Some(LastChoice {
            text: choice.text.clone(),
            state_before: Some(state_before.clone()),
            state_after: Some(state_after.clone()),
        });

        if ctx.visited.seen(&after_hash) {
            merged += 1;
        } else {
            frontier.push(record.child(state_after, &choice.text))?;
            pushed += 1;
        }
        codec::decode(interp, &state_before)?;
    }

    Ok(StepOutcome::Expanded { pushed, merged })
}

/// Advance until the interpreter stops at a choice point or an ending.
/// Returns the fault kind when a guard trips or the story faults.
fn advance_to_branch<I>(
    interp: &mut I,
    ctx: &mut TraversalContext,
    config: &ExploreConfig,
    record: &PathRecord,
    state_hash: StateHash,
) -> Result<Option<FaultKind>, ExploreError>
where
    I: StoryInterpreter + ?Sized,
{
    let mut repetitions = HashMap::from([(state_hash, 1usize)]);
    let mut objects = 0usize;

    while interp.can_continue() {
        if let Err(fault) = interp.advance() {
            let knot = interp.current_knot();
            ctx.fault(FaultKind::RuntimeFault, fault.to_string(), knot, &record.path);
            return Ok(Some(FaultKind::RuntimeFault));
        }

        objects += 1;
        ctx.counters.max_objects_between_choices =
            ctx.counters.max_objects_between_choices.max(objects);
        if objects >= config.max_objects_between_choices {
            let knot = interp.current_knot();
            ctx.fault(
                FaultKind::ObjectCountExceeded,
                OBJECT_LIMIT_MESSAGE,
                knot,
                &record.path,
            );
            return Ok(Some(FaultKind::ObjectCountExceeded));
        }

        let live = codec::hash(&codec::encode(interp)?);
        let seen = repetitions.entry(live).or_insert(0);
        *seen += 1;
        if *seen >= config.loop_threshold {
            let knot = interp.current_knot();
            ctx.fault(FaultKind::LoopDetected, LOOP_MESSAGE, knot, &record.path);
            return Ok(Some(FaultKind::LoopDetected));
        }
    }

    Ok(None)
}
