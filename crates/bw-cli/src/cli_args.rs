use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "branchwalk")]
#[command(about = "Exhaustive branch explorer for story graphs")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Walk every reachable branch of a story and print the final report.
    Explore(ExploreArgs),
    /// Consolidate checkpoints written by an earlier run.
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ExploreArgs {
    #[arg(long = "story")]
    pub(crate) story: String,
    /// Pops between checkpoint flushes.
    #[arg(long = "continue", default_value_t = 20_000)]
    pub(crate) batch_size: usize,
    #[arg(long = "output-dir", default_value = ".")]
    pub(crate) output_dir: String,
    #[arg(long = "keep-checkpoints")]
    pub(crate) keep_checkpoints: bool,
    /// Stop cleanly once this many endings were reached. Rerun to resume.
    #[arg(long = "stop-after-endings")]
    pub(crate) stop_after_endings: Option<u64>,
    #[arg(long = "max-depth", default_value_t = 200)]
    pub(crate) max_depth: usize,
    #[arg(long = "spill-threshold", default_value_t = 10_000)]
    pub(crate) spill_threshold: usize,
    /// Keep visited states across flushes instead of clearing them.
    #[arg(long = "keep-visited")]
    pub(crate) keep_visited: bool,
}

#[derive(Debug, Args)]
pub(crate) struct ReportArgs {
    #[arg(long = "checkpoint-dir")]
    pub(crate) checkpoint_dir: String,
    #[arg(long = "prefix")]
    pub(crate) prefix: Option<String>,
    /// Delete the checkpoints after printing the report.
    #[arg(long = "cleanup")]
    pub(crate) cleanup: bool,
}
