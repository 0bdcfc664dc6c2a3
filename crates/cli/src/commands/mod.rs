pub mod chunks;
pub mod config_cmd;
pub mod context;
pub mod outline;

use std::path::Path;

use anyhow::Context as _;
use storyloom_context::{ChunkType, Priority};
use storyloom_core::project::OperationContext;

/// Read an operation snapshot from a JSON file.
pub fn read_snapshot(path: &Path) -> anyhow::Result<OperationContext> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let op: OperationContext = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid project snapshot", path.display()))?;
    tracing::debug!(
        project_id = %op.project_id(),
        chapters = op.project.chapters.len(),
        characters = op.characters.len(),
        "Loaded snapshot"
    );
    Ok(op)
}

/// Apply a `--current-chapter` flag on top of the snapshot's own focus.
pub fn focus(mut op: OperationContext, current_chapter: Option<String>) -> OperationContext {
    if current_chapter.is_some() {
        op.current_chapter_id = current_chapter;
    }
    op
}

pub fn parse_chunk_type(value: &str) -> Result<ChunkType, String> {
    ChunkType::ALL
        .into_iter()
        .find(|t| t.as_str() == value)
        .ok_or_else(|| {
            let known: Vec<&str> = ChunkType::ALL.iter().map(ChunkType::as_str).collect();
            format!("unknown chunk type '{value}' (expected one of: {})", known.join(", "))
        })
}

pub fn parse_priority(value: &str) -> Result<Priority, String> {
    [Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .find(|p| p.as_str() == value)
        .ok_or_else(|| {
            format!("unknown priority '{value}' (expected critical, high, medium or low)")
        })
}
