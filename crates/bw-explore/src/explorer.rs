use std::path::PathBuf;

use bw_core::StoryInterpreter;
use tracing::{error, info};

use crate::checkpoint::CheckpointManager;
use crate::codec;
use crate::config::ExploreConfig;
use crate::counters::RunCounters;
use crate::engine::{expand_record, StepOutcome, TraversalContext};
use crate::error::ExploreError;
use crate::faults::FaultKind;
use crate::frontier::{Frontier, PathRecord};
use crate::report::{consolidate, ConsolidatedReport};
use crate::store::FrontierStore;

/// Snapshot handed to the continue gate and progress logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub totals: RunCounters,
    pub errors: usize,
    pub frontier_in_memory: usize,
    pub frontier_stored: u64,
    pub current_depth: usize,
    pub visited: usize,
}

/// Asked every `continue_interval` endings whether the run should go on.
pub trait ContinueGate {
    fn should_continue(&mut self, progress: &Progress) -> bool;
}

impl<F> ContinueGate for F
where
    F: FnMut(&Progress) -> bool,
{
    fn should_continue(&mut self, progress: &Progress) -> bool {
        self(progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The frontier was exhausted.
    Completed,
    /// The continue gate declined.
    Stopped,
}

pub struct Explorer<I: StoryInterpreter, S: FrontierStore> {
    interp: I,
    frontier: Frontier<S>,
    ctx: TraversalContext,
    config: ExploreConfig,
    checkpoints: CheckpointManager,
    gate: Option<Box<dyn ContinueGate>>,
    batch_pops: usize,
    next_gate_at: u64,
}

impl<I: StoryInterpreter, S: FrontierStore> Explorer<I, S> {
    /// Seed the frontier with the interpreter's current state as the root.
    pub fn new(
        interp: I,
        store: S,
        config: ExploreConfig,
        checkpoints: CheckpointManager,
    ) -> Result<Self, ExploreError> {
        let mut frontier = Frontier::new(store, config.spill_threshold);
        if frontier.stored_len() > 0 {
            info!(
                stored = frontier.stored_len(),
                "resuming from stored frontier"
            );
        } else {
            frontier.push(PathRecord::root(codec::encode(&interp)?))?;
        }
        let mut ctx = TraversalContext::new();
        for (knot, kind) in checkpoints.reported_faults() {
            ctx.errors.remember(knot.clone(), *kind);
        }
        // Adopted checkpoints already count toward the endings total.
        let next_gate_at = checkpoints
            .flushed_totals()
            .endings_count
            .saturating_add(config.continue_interval.max(1));
        Ok(Self {
            interp,
            frontier,
            ctx,
            next_gate_at,
            config,
            checkpoints,
            gate: None,
            batch_pops: 0,
        })
    }

    pub fn with_continue_gate(mut self, gate: impl ContinueGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    pub fn run(&mut self) -> Result<RunStatus, ExploreError> {
        info!(
            batch_size = self.config.batch_size,
            max_depth = self.config.max_depth,
            "starting traversal"
        );

        while self.frontier.has_more() {
            let Some(record) = self.frontier.pop()? else {
                break;
            };
            if record.depth > 0 {
                self.ctx.counters.choices_count += 1;
            }

            if let Err(fault) = self.step(&record) {
                error!(error = %fault, depth = record.depth, "traversal aborted");
                self.ctx.fault(
                    FaultKind::Unexpected,
                    fault.to_string(),
                    self.interp.current_knot(),
                    &record.path,
                );
                return Err(fault);
            }

            if !self.consult_gate() {
                info!("traversal stopped by continue gate");
                return Ok(RunStatus::Stopped);
            }
        }

        let progress = self.progress();
        info!(
            states = progress.totals.state_counter,
            endings = progress.totals.endings_count,
            errors = progress.errors,
            "traversal complete"
        );
        Ok(RunStatus::Completed)
    }

    fn step(&mut self, record: &PathRecord) -> Result<StepOutcome, ExploreError> {
        let outcome = expand_record(
            &mut self.interp,
            &mut self.ctx,
            &mut self.frontier,
            &self.config,
            record,
        )?;

        self.batch_pops += 1;
        let batch_boundary = self.batch_pops >= self.config.batch_size;
        let flushed = self.checkpoints.maybe_flush(
            &mut self.ctx,
            self.frontier.in_memory_len(),
            &self.config,
            batch_boundary,
        )?;
        if flushed.is_some() {
            self.batch_pops = 0;
            self.log_progress();
        }
        Ok(outcome)
    }

    fn consult_gate(&mut self) -> bool {
        let endings = self.totals().endings_count;
        if endings < self.next_gate_at {
            return true;
        }
        self.next_gate_at = endings.saturating_add(self.config.continue_interval.max(1));
        let progress = self.progress();
        match self.gate.as_mut() {
            Some(gate) => gate.should_continue(&progress),
            None => true,
        }
    }

    fn log_progress(&self) {
        let progress = self.progress();
        info!(
            choices = progress.totals.choices_count,
            endings = progress.totals.endings_count,
            errors = progress.errors,
            depth = progress.current_depth,
            frontier = progress.frontier_in_memory,
            stored = progress.frontier_stored,
            "progress"
        );
    }

    /// Write the current window as a checkpoint regardless of triggers.
    pub fn flush(&mut self) -> Result<PathBuf, ExploreError> {
        let path = self.checkpoints.flush(&mut self.ctx, &self.config)?;
        self.batch_pops = 0;
        Ok(path)
    }

    /// Persist the whole run so a later explorer over the same store and
    /// checkpoint directory can pick it up.
    pub fn suspend(&mut self) -> Result<PathBuf, ExploreError> {
        self.frontier.persist()?;
        let path = self.flush()?;
        info!(
            stored = self.frontier.stored_len(),
            checkpoint = %path.display(),
            "traversal suspended"
        );
        Ok(path)
    }

    /// Totals of flushed windows plus the live one.
    pub fn totals(&self) -> RunCounters {
        self.checkpoints
            .flushed_totals()
            .combined(&self.ctx.counters)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            totals: self.totals(),
            errors: self.checkpoints.flushed_errors() + self.ctx.errors.pending().len(),
            frontier_in_memory: self.frontier.in_memory_len(),
            frontier_stored: self.frontier.stored_len(),
            current_depth: self.frontier.current_depth(),
            visited: self.ctx.visited.len(),
        }
    }

    /// Merge every written checkpoint with the live window.
    pub fn final_report(&self) -> Result<ConsolidatedReport, ExploreError> {
        Ok(consolidate(self.checkpoints.written(), Some(&self.ctx))?)
    }

    pub fn context(&self) -> &TraversalContext {
        &self.ctx
    }

    pub fn frontier(&self) -> &Frontier<S> {
        &self.frontier
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn into_store(self) -> S {
        self.frontier.into_store()
    }
}
