//! Chunk and extraction-result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token;

/// Format version stamped on every [`ProjectContext`]. Bump when chunk
/// rendering changes so cached contexts from an older format are discarded.
pub const CONTEXT_FORMAT_VERSION: u32 = 1;

// ── Enums ─────────────────────────────────────────────────────────────────

/// What part of the project a chunk describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    ProjectMetadata,
    Characters,
    WorldBuilding,
    Chapters,
    Timeline,
    Themes,
}

impl ChunkType {
    /// Every type, in extraction order.
    pub const ALL: [ChunkType; 6] = [
        ChunkType::ProjectMetadata,
        ChunkType::Characters,
        ChunkType::WorldBuilding,
        ChunkType::Chapters,
        ChunkType::Timeline,
        ChunkType::Themes,
    ];

    /// Order in which groups appear in a formatted prompt.
    pub const DISPLAY_ORDER: [ChunkType; 6] = [
        ChunkType::ProjectMetadata,
        ChunkType::Characters,
        ChunkType::Chapters,
        ChunkType::WorldBuilding,
        ChunkType::Timeline,
        ChunkType::Themes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectMetadata => "project_metadata",
            Self::Characters => "characters",
            Self::WorldBuilding => "world_building",
            Self::Chapters => "chapters",
            Self::Timeline => "timeline",
            Self::Themes => "themes",
        }
    }

    /// Section heading used by the formatter.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::ProjectMetadata => "Project Overview",
            Self::Characters => "Characters",
            Self::WorldBuilding => "World Building",
            Self::Chapters => "Chapters",
            Self::Timeline => "Timeline",
            Self::Themes => "Themes",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusion priority under a token budget.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn is_critical(&self) -> bool {
        *self == Self::Critical
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Chunk ─────────────────────────────────────────────────────────────────

/// Which entity a chunk was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    pub id: String,
    pub name: String,
}

/// One semantically coherent unit of project knowledge.
///
/// Fields are private: `tokens` is computed from `content` at construction
/// and nothing can change either afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextChunk {
    #[serde(rename = "type")]
    chunk_type: ChunkType,
    priority: Priority,
    content: String,
    tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ChunkSource>,
}

impl ContextChunk {
    pub fn new(chunk_type: ChunkType, priority: Priority, content: impl Into<String>) -> Self {
        let content = content.into();
        let tokens = token::estimate_tokens(&content);
        Self {
            chunk_type,
            priority,
            content,
            tokens,
            source: None,
        }
    }

    /// Attach the id and display name of the entity this chunk describes.
    pub fn with_source(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.source = Some(ChunkSource {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn source(&self) -> Option<&ChunkSource> {
        self.source.as_ref()
    }
}

// ── Extraction result ─────────────────────────────────────────────────────

/// The extraction result for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectContext {
    project_id: String,
    chunks: Vec<ContextChunk>,
    total_tokens: usize,
    extracted_at: DateTime<Utc>,
    version: u32,
}

impl ProjectContext {
    pub fn new(
        project_id: impl Into<String>,
        chunks: Vec<ContextChunk>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let total_tokens = token::estimate_chunks_tokens(&chunks);
        Self {
            project_id: project_id.into(),
            chunks,
            total_tokens,
            extracted_at,
            version: CONTEXT_FORMAT_VERSION,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn chunks(&self) -> &[ContextChunk] {
        &self.chunks
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks of one type, in stored order.
    pub fn chunks_of(&self, chunk_type: ChunkType) -> impl Iterator<Item = &ContextChunk> {
        self.chunks
            .iter()
            .filter(move |c| c.chunk_type == chunk_type)
    }
}
