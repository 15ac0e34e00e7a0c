use std::collections::BTreeSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bw_core::StateBlob;
use serde::{Deserialize, Serialize};
use tracing::error;

pub const NO_CHOICE_MADE: &str = "No choices made";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FaultKind {
    RuntimeFault,
    LoopDetected,
    ObjectCountExceeded,
    Unexpected,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuntimeFault => "RuntimeFault",
            Self::LoopDetected => "LoopDetected",
            Self::ObjectCountExceeded => "ObjectCountExceeded",
            Self::Unexpected => "Unexpected",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: FaultKind,
    pub knot: String,
    pub path: Vec<String>,
    pub last_choice: String,
    #[serde(default)]
    pub state_before: Option<StateBlob>,
    #[serde(default)]
    pub state_after: Option<StateBlob>,
    /// Unix milliseconds.
    pub timestamp: u64,
}

impl ErrorRecord {
    pub fn new(
        kind: FaultKind,
        message: impl Into<String>,
        knot: impl Into<String>,
        path: &[String],
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            knot: knot.into(),
            path: path.to_vec(),
            last_choice: path
                .last()
                .cloned()
                .unwrap_or_else(|| NO_CHOICE_MADE.to_string()),
            state_before: None,
            state_after: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_states(mut self, before: Option<StateBlob>, after: Option<StateBlob>) -> Self {
        self.state_before = before;
        self.state_after = after;
        self
    }

    pub fn with_last_choice(mut self, text: impl Into<String>) -> Self {
        self.last_choice = text.into();
        self
    }
}

/// Keeps the first fault per `(knot, kind)` for the whole run. Accepted
/// records wait in `pending` until the next checkpoint drains them.
#[derive(Debug, Default)]
pub struct ErrorRecorder {
    seen: BTreeSet<(String, FaultKind)>,
    pending: Vec<ErrorRecord>,
    accepted: u64,
    suppressed: u64,
}

impl ErrorRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `(knot, kind)` as already reported, e.g. by an earlier leg of a
    /// resumed run.
    pub fn remember(&mut self, knot: impl Into<String>, kind: FaultKind) {
        self.seen.insert((knot.into(), kind));
    }

    /// Returns `false` when an equal `(knot, kind)` was already recorded.
    pub fn record(&mut self, record: ErrorRecord) -> bool {
        if !self.seen.insert((record.knot.clone(), record.kind)) {
            self.suppressed += 1;
            return false;
        }

        error!(
            kind = %record.kind,
            knot = %record.knot,
            depth = record.path.len(),
            last_choice = %record.last_choice,
            "{}",
            record.message
        );
        self.accepted += 1;
        self.pending.push(record);
        true
    }

    pub fn pending(&self) -> &[ErrorRecord] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<ErrorRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
