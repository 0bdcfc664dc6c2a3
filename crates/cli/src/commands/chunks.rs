//! `storyloom chunks`: Dump extracted chunks as JSON.

use std::path::Path;

use anyhow::Context as _;
use storyloom_config::EngineConfig;
use storyloom_context::{ChunkType, ContextExtractor, ExtractionOptions, Priority};

pub fn run(
    snapshot: &Path,
    max_tokens: Option<usize>,
    only: Vec<ChunkType>,
    min_priority: Option<Priority>,
    current_chapter: Option<String>,
) -> anyhow::Result<()> {
    let config = EngineConfig::load().context("failed to load configuration")?;
    let op = super::focus(super::read_snapshot(snapshot)?, current_chapter);

    let mut options =
        ExtractionOptions::with_max_tokens(max_tokens.unwrap_or(config.context.max_tokens));
    if !only.is_empty() {
        options = options.only(only);
    }
    if let Some(priority) = min_priority {
        options = options.min_priority(priority);
    }

    let extracted = ContextExtractor::new(options).extract(&op);
    println!("{}", serde_json::to_string_pretty(&extracted)?);
    Ok(())
}
