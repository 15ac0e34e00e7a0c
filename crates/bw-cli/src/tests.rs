use super::*;

use std::fs;
use std::path::{Path, PathBuf};

use bw_explore::ExploreConfig;
use clap::Parser;

fn story_path(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("stories")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("args should parse")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn explore_args_accept_continue_with_equals_sign() {
    let cli = parse(&[
        "bw-cli",
        "explore",
        "--story",
        "s.json",
        "--continue=500",
        "--stop-after-endings",
        "7",
        "--keep-visited",
    ]);
    let Mode::Explore(args) = cli.command else {
        panic!("expected explore");
    };
    assert_eq!(args.batch_size, 500);
    assert_eq!(args.output_dir, ".");

    let config = explore::explore_config(&args);
    assert_eq!(config.batch_size, 500);
    assert_eq!(config.continue_interval, 7);
    assert!(!config.clear_visited_on_flush);
    assert_eq!(config.max_depth, ExploreConfig::default().max_depth);
}

#[test]
fn explore_defaults_match_library_defaults() {
    let Mode::Explore(args) = parse(&["bw-cli", "explore", "--story", "s.json"]).command else {
        panic!("expected explore");
    };
    assert_eq!(explore::explore_config(&args), ExploreConfig::default());
}

#[test]
fn usage_errors_and_missing_inputs_exit_non_zero() {
    assert_ne!(run_cli_from_args(["bw-cli", "explore"]), 0);
    assert_eq!(
        run_cli_from_args(["bw-cli", "explore", "--story", "/definitely/missing.json"]),
        1
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let dir_arg = dir.path().to_string_lossy().to_string();
    assert_eq!(
        run_cli_from_args(["bw-cli", "report", "--checkpoint-dir", dir_arg.as_str()]),
        1
    );
}

#[test]
fn load_story_derives_prefix_from_stem_and_content() {
    let loaded = load_story(&story_path("two_endings.json")).expect("story");
    assert!(loaded.prefix.starts_with("two_endings_"));
    assert_eq!(loaded.prefix.len(), "two_endings_".len() + 8);
    assert!(loaded.path.ends_with("two_endings.json"));

    let dir = tempfile::tempdir().expect("tempdir");
    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{").expect("write");
    assert!(load_story(&broken.to_string_lossy()).is_err());
}

#[test]
fn completed_run_removes_checkpoints_and_frontier() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().to_string_lossy().to_string();
    let story = story_path("three_forks.json");
    let code = run_cli_from_args([
        "bw-cli",
        "explore",
        "--story",
        story.as_str(),
        "--output-dir",
        out.as_str(),
        "--continue=2",
    ]);
    assert_eq!(code, 0);
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn kept_checkpoints_can_be_reported_later() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().to_string_lossy().to_string();
    let story = story_path("three_forks.json");
    let code = run_cli_from_args([
        "bw-cli",
        "explore",
        "--story",
        story.as_str(),
        "--output-dir",
        out.as_str(),
        "--continue=4",
        "--keep-checkpoints",
    ]);
    assert_eq!(code, 0);

    let names = file_names(dir.path());
    assert!(!names.is_empty());
    assert!(names
        .iter()
        .all(|name| name.starts_with("three_forks_") && name.contains("_checkpoint_")));

    let code = run_cli_from_args([
        "bw-cli",
        "report",
        "--checkpoint-dir",
        out.as_str(),
        "--cleanup",
    ]);
    assert_eq!(code, 0);
    assert!(file_names(dir.path()).is_empty());
}
