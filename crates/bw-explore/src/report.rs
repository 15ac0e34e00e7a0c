use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::checkpoint::read_checkpoint;
use crate::codec::StateHash;
use crate::counters::RunCounters;
use crate::engine::TraversalContext;
use crate::error::CheckpointError;
use crate::faults::ErrorRecord;
use crate::tally::{EndingDetail, EndingTally};

/// Totals of a whole run, merged from its checkpoints and live window.
#[derive(Debug, Default)]
pub struct ConsolidatedReport {
    pub counters: RunCounters,
    pub tally: EndingTally,
    pub errors: Vec<ErrorRecord>,
    /// Checkpoint files that were read.
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndingSummary {
    pub hash: StateHash,
    pub count: u64,
    pub detail: Option<EndingDetail>,
}

impl ConsolidatedReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb_checkpoint(&mut self, path: &Path) -> Result<(), CheckpointError> {
        let checkpoint = read_checkpoint(path)?;
        self.tally.merge(&checkpoint.tally());
        self.counters.absorb(&checkpoint.counters);
        self.errors.extend(checkpoint.all_errors);
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    pub fn absorb_live(&mut self, ctx: &TraversalContext) {
        self.tally.merge(&ctx.tally);
        self.counters.absorb(&ctx.counters);
        self.errors.extend(ctx.errors.pending().iter().cloned());
    }

    pub fn most_reached(&self) -> Option<EndingSummary> {
        self.tally
            .most_reached()
            .map(|(hash, count)| self.summary(hash, count))
    }

    pub fn least_reached(&self) -> Option<EndingSummary> {
        self.tally
            .least_reached()
            .map(|(hash, count)| self.summary(hash, count))
    }

    fn summary(&self, hash: StateHash, count: u64) -> EndingSummary {
        EndingSummary {
            hash,
            count,
            detail: self.tally.detail(&hash).cloned(),
        }
    }
}

/// Merge checkpoints in the given order, then the live window if any.
/// Paths that no longer exist are skipped.
pub fn consolidate(
    paths: &[PathBuf],
    live: Option<&TraversalContext>,
) -> Result<ConsolidatedReport, CheckpointError> {
    let mut report = ConsolidatedReport::new();
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "checkpoint missing, skipped");
            continue;
        }
        report.absorb_checkpoint(path)?;
    }
    if let Some(ctx) = live {
        report.absorb_live(ctx);
    }
    Ok(report)
}

/// Find `<prefix>_checkpoint_<n>.json` files directly inside `dir`, ordered
/// by prefix then index.
pub fn discover_checkpoints(
    dir: &Path,
    prefix: Option<&str>,
) -> Result<Vec<PathBuf>, CheckpointError> {
    let pattern = Regex::new(r"^(?P<prefix>.+)_checkpoint_(?P<index>\d+)\.json$")?;

    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| CheckpointError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(captures) = pattern.captures(name) else {
            continue;
        };
        let found_prefix = captures["prefix"].to_string();
        if prefix.is_some_and(|wanted| wanted != found_prefix) {
            continue;
        }
        let Ok(index) = captures["index"].parse::<u64>() else {
            continue;
        };
        found.push((found_prefix, index, entry.into_path()));
    }

    found.sort();
    Ok(found.into_iter().map(|(_, _, path)| path).collect())
}

/// Delete the checkpoint files a report was built from.
pub fn cleanup(report: &ConsolidatedReport) -> Result<usize, CheckpointError> {
    let mut removed = 0usize;
    for path in &report.sources {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CheckpointError::Remove {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
    info!(removed, "checkpoints cleaned up");
    Ok(removed)
}

pub fn format_report(report: &ConsolidatedReport) -> String {
    let mut out = String::new();
    let counters = &report.counters;

    let _ = writeln!(out, "═══════════════════════════════════════════════════");
    let _ = writeln!(out, "  EXPLORATION REPORT");
    let _ = writeln!(out, "═══════════════════════════════════════════════════");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Total choices:            {}", counters.choices_count);
    let _ = writeln!(out, "  Total endings:            {}", counters.endings_count);
    let _ = writeln!(out, "  Unique endings:           {}", report.tally.len());
    let _ = writeln!(out, "  States expanded:          {}", counters.state_counter);
    let _ = writeln!(out, "  Total errors:             {}", report.errors.len());
    let _ = writeln!(out, "  Max depth reached:        {}", counters.max_depth_reached);
    let _ = writeln!(out, "  Max depth aborts:         {}", counters.max_depth_aborts);
    let _ = writeln!(
        out,
        "  Max objects per choice:   {}",
        counters.max_objects_between_choices
    );
    let _ = writeln!(out, "  Checkpoints merged:       {}", report.sources.len());
    let _ = writeln!(out);

    write_ending(&mut out, "Most reached ending", report.most_reached());
    write_ending(&mut out, "Least reached ending", report.least_reached());

    if report.errors.is_empty() {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "───────────────────────────────────────────────────");
    let _ = writeln!(out, "  ERRORS");
    let _ = writeln!(out, "───────────────────────────────────────────────────");
    for (index, record) in report.errors.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Error {}:", index + 1);
        let _ = writeln!(out, "    Type:         {}", record.kind);
        let _ = writeln!(out, "    Message:      {}", record.message);
        let _ = writeln!(out, "    Knot:         {}", record.knot);
        let _ = writeln!(out, "    Path:         {}", format_path(&record.path));
        let _ = writeln!(out, "    Last choice:  {}", record.last_choice);
        let _ = writeln!(
            out,
            "    State before: {}",
            record
                .state_before
                .as_ref()
                .map_or("N/A", |blob| blob.as_str())
        );
        let _ = writeln!(
            out,
            "    State after:  {}",
            record
                .state_after
                .as_ref()
                .map_or("N/A", |blob| blob.as_str())
        );
    }
    out
}

fn write_ending(out: &mut String, label: &str, summary: Option<EndingSummary>) {
    let Some(summary) = summary else {
        let _ = writeln!(out, "  {}: none", label);
        return;
    };
    match summary.detail {
        Some(detail) => {
            let _ = writeln!(
                out,
                "  {}: Knot = {}, Last line = \"{}\" (Reached {} times)",
                label, detail.knot, detail.last_line, summary.count
            );
        }
        None => {
            let _ = writeln!(
                out,
                "  {}: {} (Reached {} times)",
                label,
                summary.hash.short(),
                summary.count
            );
        }
    }
}

fn format_path(path: &[String]) -> String {
    if path.is_empty() {
        return "(start)".to_string();
    }
    path.join(" -> ")
}
