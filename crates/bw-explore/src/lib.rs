//! Exhaustive traversal of branching stories.
//!
//! The explorer walks every reachable choice of a story interpreter,
//! depth-first, and records what it finds:
//!
//! ```text
//! pop PathRecord -> restore state -> advance to choice point or ending
//!     -> ending: tally it
//!     -> choices: apply each one, push unseen successor states
//! every batch: write a checkpoint, clear the in-memory tally
//! at the end: consolidate checkpoints + live window into one report
//! ```
//!
//! # Module Structure
//!
//! - [`codec`]: state blob hashing and interpreter save/restore
//! - [`store`]: durable overflow storage for the frontier
//! - [`frontier`]: hybrid in-memory / spilled stack of pending paths
//! - [`visited`]: set of already expanded states
//! - [`faults`]: fault records and per-(knot, kind) deduplication
//! - [`tally`]: ending counts and details
//! - [`engine`]: single path expansion step
//! - [`explorer`]: the driving loop
//! - [`checkpoint`]: flush triggers and checkpoint artifacts
//! - [`report`]: consolidation and the human-readable summary
//!
//! # Ordering
//!
//! Depth-first order is exact inside one in-memory batch. Once the frontier
//! spills to disk, reloaded batches interleave with newer pushes, so global
//! order is only approximately LIFO. Deduplication makes the set of visited
//! states independent of that order.

pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod counters;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod faults;
pub mod frontier;
pub mod report;
pub mod store;
pub mod tally;
pub mod visited;

pub use checkpoint::{Checkpoint, CheckpointManager, FlushTrigger, CHECKPOINT_SCHEMA_V1};
pub use codec::StateHash;
pub use config::{run_prefix, CheckpointConfig, ExploreConfig};
pub use counters::RunCounters;
pub use engine::{expand_record, StepOutcome, TraversalContext};
pub use error::{CheckpointError, ExploreError, StoreError};
pub use explorer::{ContinueGate, Explorer, Progress, RunStatus};
pub use faults::{ErrorRecord, ErrorRecorder, FaultKind};
pub use frontier::{Frontier, PathRecord};
pub use report::{
    cleanup, consolidate, discover_checkpoints, format_report, ConsolidatedReport, EndingSummary,
};
pub use store::{FrontierStore, MemoryStore, SegmentStore, StoredRecord};
pub use tally::{EndingDetail, EndingTally};
pub use visited::VisitedIndex;
