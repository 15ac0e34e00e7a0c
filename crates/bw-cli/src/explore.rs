use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use bw_explore::{
    cleanup, format_report, CheckpointConfig, CheckpointManager, ExploreConfig, Explorer,
    FrontierStore, Progress, RunStatus, SegmentStore,
};
use tracing::{info, warn};

use crate::{load_story, ExploreArgs, LoadedStory};

pub(crate) fn explore_config(args: &ExploreArgs) -> ExploreConfig {
    let defaults = ExploreConfig::default();
    ExploreConfig {
        batch_size: args.batch_size.max(1),
        spill_threshold: args.spill_threshold.max(1),
        max_depth: args.max_depth,
        clear_visited_on_flush: !args.keep_visited,
        continue_interval: args
            .stop_after_endings
            .unwrap_or(defaults.continue_interval),
        ..defaults
    }
}

pub(crate) fn run_explore(args: ExploreArgs) -> anyhow::Result<i32> {
    let LoadedStory {
        path,
        engine,
        prefix,
    } = load_story(&args.story)?;
    let output_dir = PathBuf::from(&args.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let store = SegmentStore::open(output_dir.join(format!("{}_frontier", prefix)))?;
    let checkpoint_config = CheckpointConfig::new(&output_dir, &prefix);
    let checkpoints = if store.is_empty() {
        CheckpointManager::new(checkpoint_config)?
    } else {
        info!(stored = store.len(), "resuming interrupted run");
        CheckpointManager::resume(checkpoint_config)?
    };

    info!(story = %path.display(), prefix = %prefix, "exploring");
    let mut explorer = Explorer::new(engine, store, explore_config(&args), checkpoints)?;
    if args.stop_after_endings.is_some() {
        explorer = explorer.with_continue_gate(|progress: &Progress| {
            info!(endings = progress.totals.endings_count, "ending limit reached");
            false
        });
    }

    let outcome = explorer.run();
    if matches!(outcome, Ok(RunStatus::Stopped)) {
        explorer.suspend()?;
    }

    let report = explorer.final_report()?;
    println!("{}", format_report(&report));

    let status = outcome.context("Exploration aborted")?;
    match status {
        RunStatus::Completed => {
            if args.keep_checkpoints {
                info!(checkpoints = report.sources.len(), "checkpoints kept");
            } else {
                cleanup(&report)?;
            }
            explorer.into_store().destroy()?;
            println!("RESULT:OK");
            println!("STATUS:COMPLETED");
        }
        RunStatus::Stopped => {
            warn!("run stopped early, rerun the same command to resume");
            println!("RESULT:OK");
            println!("STATUS:STOPPED");
        }
    }
    Ok(0)
}
