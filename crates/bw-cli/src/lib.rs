use std::ffi::OsString;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod error_map;
mod explore;
mod report;
mod source_loader;

pub(crate) use cli_args::{Cli, ExploreArgs, Mode, ReportArgs};
pub(crate) use error_map::emit_error;
pub(crate) use source_loader::{load_story, LoadedStory};

/// Log to stderr so stdout carries only the report. `RUST_LOG` overrides
/// the default `info` filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Mode::Explore(args) => explore::run_explore(args),
        Mode::Report(args) => report::run_report(args),
    }
}

#[cfg(test)]
mod tests;
