//! `storyloom outline`: Plot outline without a generation backend.
//!
//! The CLI ships no AI backend, so every call takes the template path. This
//! exercises the same fallback the host application sees when its backend
//! is unavailable.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use storyloom_config::EngineConfig;
use storyloom_core::error::GenerationError;
use storyloom_core::generation::{GeneratedText, GenerationRequest, GenerationResult, TextGenerator};
use storyloom_engine::StoryEngine;

/// Refuses every request.
struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate_text(&self, _request: GenerationRequest) -> GenerationResult<GeneratedText> {
        Err(GenerationError::NotConfigured(
            "the storyloom CLI has no generation backend".into(),
        ))
    }
}

pub async fn run(snapshot: &Path, target_words: Option<u32>) -> anyhow::Result<()> {
    let config = EngineConfig::load().context("failed to load configuration")?;
    let op = super::read_snapshot(snapshot)?;

    let engine = StoryEngine::from_config(&config, Arc::new(OfflineGenerator));
    let outline = engine.outline_plot(&op, target_words).await;

    println!("{}", serde_json::to_string_pretty(&outline.value)?);
    if let Some(reason) = outline.provenance.fallback_reason() {
        eprintln!("⚠️  Template outline ({reason})");
    }
    Ok(())
}
