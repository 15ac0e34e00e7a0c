use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_bw-cli")
}

fn story(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("stories")
        .join(name)
}

fn explore(story_name: &str, out: &Path, extra: &[&str]) -> Output {
    Command::new(bin())
        .arg("explore")
        .arg("--story")
        .arg(story(story_name))
        .arg("--output-dir")
        .arg(out)
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("cli should execute")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output, context: &str) {
    if !output.status.success() {
        panic!(
            "{} failed\nstdout:\n{}\nstderr:\n{}",
            context,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn explore_runs_every_sample_story() {
    let mut stories = std::fs::read_dir(story(""))
        .expect("stories dir must exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    stories.sort();
    assert!(!stories.is_empty(), "expected sample stories");

    for path in stories {
        let out = tempfile::tempdir().expect("tempdir");
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let output = explore(&name, out.path(), &[]);
        assert_success(&output, &name);

        let text = stdout(&output);
        assert!(text.contains("EXPLORATION REPORT"), "report missing for {}", name);
        assert!(text.contains("STATUS:COMPLETED"), "status missing for {}", name);
    }
}

#[test]
fn two_endings_report_counts_both_branches() {
    let out = tempfile::tempdir().expect("tempdir");
    let output = explore("two_endings.json", out.path(), &[]);
    assert_success(&output, "two_endings");

    let text = stdout(&output);
    assert!(text.contains("Total choices:            2"));
    assert!(text.contains("Total endings:            2"));
    assert!(text.contains("Total errors:             0"));
    assert!(text.contains("Max depth reached:        1"));
    assert!(text.contains("Reached 1 times"));
}

#[test]
fn faulty_story_lists_each_fault_once() {
    let out = tempfile::tempdir().expect("tempdir");
    let output = explore("faulty.json", out.path(), &[]);
    assert_success(&output, "faulty");

    let text = stdout(&output);
    assert!(text.contains("Total errors:             3"));
    assert!(text.contains("Type:         LoopDetected"));
    assert!(text.contains("Knot:         attic"));
    assert!(text.contains("Knot:         cellar"));
}

#[test]
fn stopped_run_resumes_to_the_full_total() {
    let out = tempfile::tempdir().expect("tempdir");
    let first = explore(
        "three_forks.json",
        out.path(),
        &["--stop-after-endings", "3"],
    );
    assert_success(&first, "first leg");
    let first_text = stdout(&first);
    assert!(first_text.contains("STATUS:STOPPED"));
    assert!(first_text.contains("Total endings:            3"));

    let second = explore("three_forks.json", out.path(), &[]);
    assert_success(&second, "second leg");
    let second_text = stdout(&second);
    assert!(second_text.contains("STATUS:COMPLETED"));
    assert!(second_text.contains("Total endings:            8"));

    let leftovers = std::fs::read_dir(out.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
}

#[test]
fn rerunning_a_stopped_command_advances_by_the_ending_limit() {
    let out = tempfile::tempdir().expect("tempdir");
    let args = ["--stop-after-endings", "3"];

    let first = explore("three_forks.json", out.path(), &args);
    assert_success(&first, "first leg");
    let first_text = stdout(&first);
    assert!(first_text.contains("STATUS:STOPPED"));
    assert!(first_text.contains("Total endings:            3"));

    let second = explore("three_forks.json", out.path(), &args);
    assert_success(&second, "second leg");
    let second_text = stdout(&second);
    assert!(second_text.contains("STATUS:STOPPED"));
    assert!(second_text.contains("Total endings:            6"));

    let third = explore("three_forks.json", out.path(), &args);
    assert_success(&third, "third leg");
    let third_text = stdout(&third);
    assert!(third_text.contains("STATUS:COMPLETED"));
    assert!(third_text.contains("Total endings:            8"));
    assert!(third_text.contains("Total choices:            14"));
}

#[test]
fn unreadable_story_reports_error_and_exit_code() {
    let out = tempfile::tempdir().expect("tempdir");
    let broken = out.path().join("broken.json");
    std::fs::write(&broken, "{\"schemaVersion\":\"story.v9\"}").expect("write");

    let output = Command::new(bin())
        .arg("explore")
        .arg("--story")
        .arg(&broken)
        .arg("--output-dir")
        .arg(out.path())
        .output()
        .expect("cli should execute");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("RESULT:ERROR"));
}
