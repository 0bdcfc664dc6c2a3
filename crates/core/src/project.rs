//! Project aggregate: the read-only view of a writing project the engine
//! extracts context from.
//!
//! Every collection carries `#[serde(default)]`: a record missing its
//! chapters, timeline or themes deserializes to empty vectors instead of
//! failing, so extraction never has to special-case absent data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A writing project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// One-sentence premise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_word_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,

    #[serde(default)]
    pub chapters: Vec<Chapter>,

    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,

    #[serde(default)]
    pub world: WorldState,

    /// Last modification time; bumped by the host on every edit
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: None,
            logline: None,
            synopsis: None,
            target_word_count: None,
            themes: Vec::new(),
            chapters: Vec::new(),
            timeline: Vec::new(),
            world: WorldState::default(),
            updated_at: Utc::now(),
        }
    }

    /// Total words written across all chapters.
    pub fn words_written(&self) -> u64 {
        self.chapters.iter().map(|c| u64::from(c.word_count)).sum()
    }

    /// Order index the next chapter would take (1-based).
    pub fn next_chapter_order(&self) -> u32 {
        self.chapters
            .iter()
            .map(|c| c.order)
            .max()
            .map_or(1, |last| last.saturating_add(1))
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }
}

/// World-level settings that change how the whole story reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magic_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_level: Option<String>,
}

impl WorldState {
    pub fn has_magic_system(&self) -> bool {
        self.magic_system.is_some()
    }

    pub fn has_technology_level(&self) -> bool {
        self.technology_level.is_some()
    }
}

/// A single chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,

    /// Sequence index within the project (1-based)
    pub order: u32,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub status: ChapterStatus,

    #[serde(default)]
    pub word_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    #[default]
    Outline,
    Drafting,
    Revising,
    Complete,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Drafting => "drafting",
            Self::Revising => "revising",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A story event placed on the project's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Position in story chronology (not necessarily chapter order)
    pub chronological_index: i64,

    #[serde(default)]
    pub importance: EventImportance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventImportance {
    Minor,
    #[default]
    Moderate,
    Major,
}

/// A character in the story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub role: CharacterRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,

    /// How the character changes over the story
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<String>,
}

impl Character {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: CharacterRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            description: None,
            motivation: None,
            arc: None,
        }
    }
}

/// Narrative role. Unknown roles from older records read as `Minor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    Protagonist,
    Antagonist,
    Supporting,
    Mentor,
    LoveInterest,
    #[default]
    #[serde(other)]
    Minor,
}

impl CharacterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protagonist => "protagonist",
            Self::Antagonist => "antagonist",
            Self::Supporting => "supporting",
            Self::Mentor => "mentor",
            Self::LoveInterest => "love interest",
            Self::Minor => "minor",
        }
    }
}

impl std::fmt::Display for CharacterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place in the story world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Why this place matters to the plot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<String>,
}

/// A culture, faction or people in the story world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Culture {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Everything a single engine operation needs to know about a project.
///
/// Bundles the project aggregate with related entities the host stores
/// separately, plus the chapter the user is focused on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    pub project: Project,

    #[serde(default)]
    pub characters: Vec<Character>,

    #[serde(default)]
    pub locations: Vec<Location>,

    #[serde(default)]
    pub cultures: Vec<Culture>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chapter_id: Option<String>,
}

impl OperationContext {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            characters: Vec::new(),
            locations: Vec::new(),
            cultures: Vec::new(),
            current_chapter_id: None,
        }
    }

    pub fn with_characters(mut self, characters: Vec<Character>) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_cultures(mut self, cultures: Vec<Culture>) -> Self {
        self.cultures = cultures;
        self
    }

    pub fn with_current_chapter(mut self, chapter_id: impl Into<String>) -> Self {
        self.current_chapter_id = Some(chapter_id.into());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project.id
    }
}
