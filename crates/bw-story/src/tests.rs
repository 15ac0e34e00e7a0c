use bw_core::StoryInterpreter;

use crate::StoryEngine;

fn engine(raw: &str) -> StoryEngine {
    StoryEngine::from_json(raw).expect("story should load")
}

fn drain(engine: &mut StoryEngine) -> Vec<String> {
    let mut lines = Vec::new();
    while engine.can_continue() {
        let line = engine.advance().expect("advance should pass");
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

#[test]
fn linear_story_renders_lines_then_ends() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","knots":{
  "a":[{"kind":"text","value":"one"},{"kind":"divert","target":"b"}],
  "b":[{"kind":"text","value":"two"}]
}}"#,
    );

    assert_eq!(drain(&mut story), vec!["one", "two"]);
    assert!(story.is_ended());
    assert!(story.current_choices().is_empty());
    assert_eq!(story.current_knot(), "b");
    assert_eq!(story.current_text(), "two");
}

#[test]
fn choice_without_divert_resumes_after_choice_node() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","variables":{"picked":""},"knots":{
  "a":[
    {"kind":"choice","options":[{"text":"Red"},{"text":"Blue"}]},
    {"kind":"text","value":"after"},
    {"kind":"end"},
    {"kind":"text","value":"unreachable"}
  ]
}}"#,
    );

    assert_eq!(story.advance().expect("settle"), "");
    let choices = story.current_choices();
    assert_eq!(choices.len(), 2);
    assert_eq!(choices[1].index, 1);
    assert_eq!(choices[1].text, "Blue");

    story.choose(1).expect("choose");
    assert_eq!(drain(&mut story), vec!["after"]);
    assert!(story.is_ended());
}

#[test]
fn conditions_filter_text_diverts_and_options() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","variables":{"key":false,"gold":2},"knots":{
  "a":[
    {"kind":"text","value":"hidden","when":"key"},
    {"kind":"divert","target":"vault","when":"key"},
    {"kind":"text","value":"gold=${gold}","when":"gold >= 2"},
    {"kind":"choice","options":[
      {"text":"Open vault","when":"key","divert":"vault"},
      {"text":"Buy key","when":"gold > 1","divert":"buy"}
    ]}
  ],
  "buy":[{"kind":"code","code":"gold = gold - 2; key = true;"},{"kind":"divert","target":"a"}],
  "vault":[{"kind":"text","value":"vault"}]
}}"#,
    );

    assert_eq!(drain(&mut story), vec!["gold=2"]);
    let choices = story.current_choices();
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].text, "Buy key");

    story.choose(0).expect("buy");
    assert_eq!(drain(&mut story), vec!["hidden", "vault"]);
}

#[test]
fn choice_with_no_visible_options_is_skipped() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","variables":{"open":false},"knots":{
  "a":[
    {"kind":"choice","options":[{"text":"Door","when":"open"}]},
    {"kind":"text","value":"nothing to do"}
  ]
}}"#,
    );

    assert_eq!(drain(&mut story), vec!["nothing to do"]);
    assert!(story.is_ended());
}

#[test]
fn unknown_divert_surfaces_as_runtime_fault() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","knots":{
  "a":[{"kind":"text","value":"x"},{"kind":"choice","options":[{"text":"Go","divert":"missing"}]}]
}}"#,
    );

    assert_eq!(story.advance().expect("line"), "x");
    let error = story.choose(0).expect_err("divert target missing");
    assert_eq!(error.code, "ENGINE_KNOT_NOT_FOUND");
}

#[test]
fn silent_divert_loop_trips_step_guard() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","knots":{
  "a":[{"kind":"divert","target":"b"}],
  "b":[{"kind":"divert","target":"a"}]
}}"#,
    );

    let error = story.advance().expect_err("guard should trip");
    assert_eq!(error.code, "ENGINE_GUARD_EXCEEDED");
}

#[test]
fn advance_and_choose_reject_wrong_phase() {
    let mut story = engine(
        r#"{"schemaVersion":"story.v1","start":"a","knots":{
  "a":[{"kind":"choice","options":[{"text":"Only"}]}]
}}"#,
    );

    assert_eq!(
        story.choose(0).expect_err("nothing pending").code,
        "ENGINE_NO_PENDING_CHOICE"
    );
    story.advance().expect("settle on choice");
    assert_eq!(
        story.advance().expect_err("waiting").code,
        "ENGINE_WAITING_CHOICE"
    );
    assert_eq!(
        story.choose(3).expect_err("out of range").code,
        "ENGINE_CHOICE_INDEX"
    );

    story.choose(0).expect("choose");
    assert_eq!(story.advance().expect("end"), "");
    assert_eq!(story.advance().expect_err("ended").code, "ENGINE_ENDED");
}
