use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bw_explore::run_prefix;
use bw_story::StoryEngine;

pub(crate) struct LoadedStory {
    pub(crate) path: PathBuf,
    pub(crate) engine: StoryEngine,
    pub(crate) prefix: String,
}

pub(crate) fn load_story(raw_path: &str) -> anyhow::Result<LoadedStory> {
    let path = PathBuf::from(raw_path);
    if !path.is_file() {
        bail!("Story file does not exist: {}", path.display());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read story {}", path.display()))?;
    let engine = StoryEngine::from_json(&raw)
        .with_context(|| format!("Failed to load story {}", path.display()))?;
    let prefix = run_prefix(story_stem(&path), raw.as_bytes());

    Ok(LoadedStory {
        path,
        engine,
        prefix,
    })
}

fn story_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("story")
}
