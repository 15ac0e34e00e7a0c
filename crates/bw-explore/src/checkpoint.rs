use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codec::StateHash;
use crate::config::{CheckpointConfig, ExploreConfig};
use crate::counters::RunCounters;
use crate::engine::TraversalContext;
use crate::error::CheckpointError;
use crate::faults::{ErrorRecord, FaultKind};
use crate::report::{consolidate, discover_checkpoints};
use crate::tally::{EndingDetail, EndingTally};

pub const CHECKPOINT_SCHEMA_V1: &str = "checkpoint.v1";

fn default_schema_version() -> String {
    CHECKPOINT_SCHEMA_V1.to_string()
}

/// One flush window: its ending tally, counters and newly recorded errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub ending_counts: Vec<(StateHash, u64)>,
    #[serde(default)]
    pub ending_details: Vec<(StateHash, EndingDetail)>,
    #[serde(flatten)]
    pub counters: RunCounters,
    #[serde(default)]
    pub all_errors: Vec<ErrorRecord>,
}

impl Checkpoint {
    pub fn from_window(ctx: &TraversalContext) -> Self {
        Self {
            schema_version: default_schema_version(),
            ending_counts: ctx.tally.entries().collect(),
            ending_details: ctx
                .tally
                .details()
                .map(|(hash, detail)| (hash, detail.clone()))
                .collect(),
            counters: ctx.counters,
            all_errors: ctx.errors.pending().to_vec(),
        }
    }

    pub fn tally(&self) -> EndingTally {
        let mut tally = EndingTally::new();
        for (hash, count) in &self.ending_counts {
            tally.add(*hash, *count);
        }
        for (hash, detail) in &self.ending_details {
            tally.set_detail(*hash, detail.clone());
        }
        tally
    }
}

pub fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let body = serde_json::to_vec_pretty(checkpoint).map_err(CheckpointError::Encode)?;
    let tmp = path.with_extension("json.tmp");
    let write_error = |source: std::io::Error| CheckpointError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(&tmp).map_err(write_error)?;
    file.write_all(&body).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    fs::rename(&tmp, path).map_err(write_error)
}

pub fn read_checkpoint(path: &Path) -> Result<Checkpoint, CheckpointError> {
    let raw = fs::read_to_string(path).map_err(|source| CheckpointError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let checkpoint: Checkpoint =
        serde_json::from_str(&raw).map_err(|source| CheckpointError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if checkpoint.schema_version != CHECKPOINT_SCHEMA_V1 {
        return Err(CheckpointError::InvalidSchemaVersion {
            path: path.to_path_buf(),
            expected: CHECKPOINT_SCHEMA_V1.to_string(),
            found: checkpoint.schema_version,
        });
    }
    Ok(checkpoint)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    BatchBoundary,
    WorkingSet { entries: usize, limit: usize },
    ObjectCount { observed: usize, threshold: usize },
}

/// Writes checkpoint files and keeps the running totals of flushed windows.
#[derive(Debug)]
pub struct CheckpointManager {
    config: CheckpointConfig,
    written: Vec<PathBuf>,
    flushed: RunCounters,
    flushed_errors: usize,
    next_index: usize,
    /// Working-set entries a flush could not reclaim.
    retained: usize,
    reported: Vec<(String, FaultKind)>,
}

impl CheckpointManager {
    pub fn new(config: CheckpointConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.dir).map_err(|source| CheckpointError::Directory {
            path: config.dir.clone(),
            source,
        })?;
        Ok(Self {
            config,
            written: Vec::new(),
            flushed: RunCounters::default(),
            flushed_errors: 0,
            next_index: 0,
            retained: 0,
            reported: Vec::new(),
        })
    }

    /// Adopt the checkpoints an interrupted run already wrote for this
    /// prefix, so new windows are numbered after the highest adopted index,
    /// reports include them and their faults are not reported again.
    pub fn resume(config: CheckpointConfig) -> Result<Self, CheckpointError> {
        let mut manager = Self::new(config)?;
        let existing = discover_checkpoints(&manager.config.dir, Some(&manager.config.prefix))?;
        let earlier = consolidate(&existing, None)?;
        manager.flushed = earlier.counters;
        manager.flushed_errors = earlier.errors.len();
        manager.reported = earlier
            .errors
            .iter()
            .map(|record| (record.knot.clone(), record.kind))
            .collect();
        manager.reported.sort();
        manager.reported.dedup();
        let next_index = earlier
            .sources
            .iter()
            .filter_map(|path| manager.index_of(path))
            .max()
            .map_or(0, |index| index + 1);
        manager.next_index = next_index;
        manager.written = earlier.sources;
        if !manager.written.is_empty() {
            info!(
                checkpoints = manager.written.len(),
                endings = manager.flushed.endings_count,
                "adopted earlier checkpoints"
            );
        }
        Ok(manager)
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    pub fn checkpoint_path(&self, index: usize) -> PathBuf {
        self.config
            .dir
            .join(format!("{}_checkpoint_{}.json", self.config.prefix, index))
    }

    fn index_of(&self, path: &Path) -> Option<usize> {
        let name = path.file_name()?.to_str()?;
        name.strip_prefix(self.config.prefix.as_str())?
            .strip_prefix("_checkpoint_")?
            .strip_suffix(".json")?
            .parse()
            .ok()
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Counters of every window flushed so far.
    pub fn flushed_totals(&self) -> RunCounters {
        self.flushed
    }

    pub fn flushed_errors(&self) -> usize {
        self.flushed_errors
    }

    /// `(knot, kind)` pairs already reported by adopted checkpoints.
    pub fn reported_faults(&self) -> &[(String, FaultKind)] {
        &self.reported
    }

    /// Decide whether the current window should be flushed now.
    pub fn trigger(
        &self,
        ctx: &TraversalContext,
        frontier_in_memory: usize,
        config: &ExploreConfig,
        batch_boundary: bool,
    ) -> Option<FlushTrigger> {
        if batch_boundary {
            return Some(FlushTrigger::BatchBoundary);
        }
        // Only growth past what the last flush left behind counts, so a
        // window that keeps its visited index is not flushed on every pop.
        let entries = frontier_in_memory + ctx.working_set();
        if entries.saturating_sub(self.retained) > config.working_set_limit {
            return Some(FlushTrigger::WorkingSet {
                entries,
                limit: config.working_set_limit,
            });
        }
        let observed = ctx.counters.max_objects_between_choices;
        if observed >= config.object_flush_threshold {
            return Some(FlushTrigger::ObjectCount {
                observed,
                threshold: config.object_flush_threshold,
            });
        }
        None
    }

    pub fn maybe_flush(
        &mut self,
        ctx: &mut TraversalContext,
        frontier_in_memory: usize,
        config: &ExploreConfig,
        batch_boundary: bool,
    ) -> Result<Option<PathBuf>, CheckpointError> {
        let Some(trigger) = self.trigger(ctx, frontier_in_memory, config, batch_boundary) else {
            return Ok(None);
        };
        if trigger != FlushTrigger::BatchBoundary {
            info!(?trigger, "resource limit reached, flushing early");
        }
        let path = self.flush(ctx, config)?;
        self.retained = frontier_in_memory + ctx.working_set();
        Ok(Some(path))
    }

    /// Persist the window, then reset it. Nothing in `ctx` changes unless
    /// the file was written.
    pub fn flush(
        &mut self,
        ctx: &mut TraversalContext,
        config: &ExploreConfig,
    ) -> Result<PathBuf, CheckpointError> {
        let checkpoint = Checkpoint::from_window(ctx);
        let path = self.checkpoint_path(self.next_index);
        write_checkpoint(&path, &checkpoint)?;
        self.next_index += 1;

        self.flushed.absorb(&ctx.counters);
        self.flushed_errors += checkpoint.all_errors.len();
        self.written.push(path.clone());

        ctx.counters = RunCounters::default();
        ctx.tally.clear();
        ctx.errors.drain();
        if config.clear_visited_on_flush {
            warn!(
                states = ctx.visited.len(),
                "clearing visited index, earlier states may be explored again"
            );
            ctx.visited.clear();
        }
        self.retained = ctx.working_set();

        info!(
            path = %path.display(),
            endings = checkpoint.counters.endings_count,
            errors = checkpoint.all_errors.len(),
            "checkpoint written"
        );
        Ok(path)
    }
}
