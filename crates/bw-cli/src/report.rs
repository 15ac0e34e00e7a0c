use std::path::Path;

use anyhow::bail;
use bw_explore::{cleanup, consolidate, discover_checkpoints, format_report};

use crate::ReportArgs;

pub(crate) fn run_report(args: ReportArgs) -> anyhow::Result<i32> {
    let dir = Path::new(&args.checkpoint_dir);
    if !dir.is_dir() {
        bail!("Checkpoint directory does not exist: {}", dir.display());
    }

    let paths = discover_checkpoints(dir, args.prefix.as_deref())?;
    if paths.is_empty() {
        bail!("No checkpoints found in {}", dir.display());
    }

    let report = consolidate(&paths, None)?;
    println!("{}", format_report(&report));
    if args.cleanup {
        cleanup(&report)?;
    }
    println!("RESULT:OK");
    Ok(0)
}
