//! Chunk extraction: renders a project into typed, prioritized chunks and
//! packs them into a token budget.
//!
//! Each context type has its own pure extraction function taking borrowed
//! input and returning fresh chunks. [`ContextExtractor::extract`] runs the
//! enabled ones, drops chunks under the priority threshold, sorts by
//! priority and packs greedily.
//!
//! # Packing
//!
//! Chunks are accepted while `running + tokens <= max_tokens`. The first
//! chunk that would overflow ends packing. If that chunk is critical it is
//! admitted anyway, so a selection can exceed the budget by at most one
//! trailing critical chunk.
//!
//! # Determinism
//!
//! Identical inputs always produce identical chunks in identical order;
//! only `extracted_at` depends on the clock.

use chrono::Utc;
use storyloom_config::ContextConfig;
use storyloom_core::project::{
    Chapter, Character, CharacterRole, Culture, EventImportance, Location, OperationContext,
    Project, TimelineEvent,
};
use tracing::debug;

use crate::chunk::{ChunkType, ContextChunk, Priority, ProjectContext};

/// Most major events summarised in the timeline chunk.
pub const MAX_TIMELINE_EVENTS: usize = 10;

// ── Options ───────────────────────────────────────────────────────────────

/// Caller controls for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Token budget for the packed result.
    pub max_tokens: usize,
    /// Allow-list of context types. `None` enables every type.
    pub include: Option<Vec<ChunkType>>,
    /// Chunks below this priority are dropped before packing.
    pub priority_threshold: Option<Priority>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            include: None,
            priority_threshold: None,
        }
    }
}

impl ExtractionOptions {
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Self::default()
        }
    }

    /// Restrict extraction to the given types.
    pub fn only(mut self, types: impl IntoIterator<Item = ChunkType>) -> Self {
        self.include = Some(types.into_iter().collect());
        self
    }

    /// Drop chunks below `priority`.
    pub fn min_priority(mut self, priority: Priority) -> Self {
        self.priority_threshold = Some(priority);
        self
    }

    pub fn includes(&self, chunk_type: ChunkType) -> bool {
        self.include
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&chunk_type))
    }
}

impl From<&ContextConfig> for ExtractionOptions {
    fn from(config: &ContextConfig) -> Self {
        Self::with_max_tokens(config.max_tokens)
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────

/// The chunk extractor. Stateless apart from its options. Create one and
/// reuse it.
#[derive(Debug, Clone, Default)]
pub struct ContextExtractor {
    options: ExtractionOptions,
}

impl ContextExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn with_default_options() -> Self {
        Self::new(ExtractionOptions::default())
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extract and pack the context for one operation.
    pub fn extract(&self, op: &OperationContext) -> ProjectContext {
        let candidates = self.candidates(op);
        let candidate_count = candidates.len();
        let selected = pack_chunks(candidates, self.options.max_tokens);
        let context = ProjectContext::new(op.project_id(), selected, Utc::now());

        debug!(
            project_id = %context.project_id(),
            candidates = candidate_count,
            selected = context.chunks().len(),
            total_tokens = context.total_tokens(),
            budget = self.options.max_tokens,
            "Extracted project context"
        );

        context
    }

    /// Every chunk the enabled extractors produce, filtered by the priority
    /// threshold but not yet sorted or packed.
    pub fn candidates(&self, op: &OperationContext) -> Vec<ContextChunk> {
        let project = &op.project;
        let mut chunks = Vec::new();

        for chunk_type in ChunkType::ALL {
            if !self.options.includes(chunk_type) {
                continue;
            }
            let extracted = match chunk_type {
                ChunkType::ProjectMetadata => project_metadata_chunks(project),
                ChunkType::Characters => character_chunks(&op.characters),
                ChunkType::WorldBuilding => world_building_chunks(&op.locations, &op.cultures),
                ChunkType::Chapters => {
                    chapter_chunks(&project.chapters, op.current_chapter_id.as_deref())
                }
                // Without chapters there is no story yet to place events in.
                ChunkType::Timeline if project.chapters.is_empty() => Vec::new(),
                ChunkType::Timeline => timeline_chunks(&project.timeline),
                ChunkType::Themes => theme_chunks(&project.themes),
            };
            chunks.extend(extracted);
        }

        if let Some(threshold) = self.options.priority_threshold {
            chunks.retain(|c| c.priority() >= threshold);
        }
        chunks
    }
}

/// Sort by priority (stable) and greedily pack into `max_tokens`.
pub fn pack_chunks(mut candidates: Vec<ContextChunk>, max_tokens: usize) -> Vec<ContextChunk> {
    candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));

    let mut selected = Vec::new();
    let mut used = 0;
    for chunk in candidates {
        if used + chunk.tokens() <= max_tokens {
            used += chunk.tokens();
            selected.push(chunk);
            continue;
        }
        if chunk.priority().is_critical() {
            selected.push(chunk);
        }
        break;
    }
    selected
}

// ── Per-type extraction ───────────────────────────────────────────────────

/// Exactly one critical chunk describing the project as a whole.
pub fn project_metadata_chunks(project: &Project) -> Vec<ContextChunk> {
    let mut lines = vec![format!("Title: {}", project.title)];
    if let Some(genre) = &project.genre {
        lines.push(format!("Genre: {genre}"));
    }
    if let Some(logline) = &project.logline {
        lines.push(format!("Premise: {logline}"));
    }
    if let Some(synopsis) = &project.synopsis {
        lines.push(format!("Synopsis: {synopsis}"));
    }
    if let Some(target) = project.target_word_count {
        lines.push(format!("Target length: {target} words"));
    }
    lines.push(format!(
        "Progress: {} chapters, {} words written",
        project.chapters.len(),
        project.words_written()
    ));
    if let Some(magic) = &project.world.magic_system {
        lines.push(format!("Magic system: {magic}"));
    }
    if let Some(technology) = &project.world.technology_level {
        lines.push(format!("Technology: {technology}"));
    }

    vec![
        ContextChunk::new(ChunkType::ProjectMetadata, Priority::Critical, lines.join("\n"))
            .with_source(&project.id, &project.title),
    ]
}

pub fn character_priority(role: CharacterRole) -> Priority {
    match role {
        CharacterRole::Protagonist | CharacterRole::Antagonist => Priority::Critical,
        CharacterRole::Supporting | CharacterRole::Mentor => Priority::High,
        CharacterRole::LoveInterest | CharacterRole::Minor => Priority::Medium,
    }
}

/// One chunk per character.
pub fn character_chunks(characters: &[Character]) -> Vec<ContextChunk> {
    characters
        .iter()
        .map(|character| {
            let mut text = format!("{} ({})", character.name, character.role);
            push_field(&mut text, "Description", character.description.as_deref());
            push_field(&mut text, "Motivation", character.motivation.as_deref());
            push_field(&mut text, "Arc", character.arc.as_deref());
            ContextChunk::new(
                ChunkType::Characters,
                character_priority(character.role),
                text,
            )
            .with_source(&character.id, &character.name)
        })
        .collect()
}

/// One medium-priority chunk per location, then one per culture.
pub fn world_building_chunks(locations: &[Location], cultures: &[Culture]) -> Vec<ContextChunk> {
    let locations = locations.iter().map(|location| {
        let mut text = format!("Location: {}", location.name);
        push_field(&mut text, "Description", location.description.as_deref());
        push_field(&mut text, "Significance", location.significance.as_deref());
        ContextChunk::new(ChunkType::WorldBuilding, Priority::Medium, text)
            .with_source(&location.id, &location.name)
    });

    let cultures = cultures.iter().map(|culture| {
        let mut text = format!("Culture: {}", culture.name);
        push_field(&mut text, "Description", culture.description.as_deref());
        if !culture.values.is_empty() {
            push_field(&mut text, "Values", Some(culture.values.join(", ").as_str()));
        }
        ContextChunk::new(ChunkType::WorldBuilding, Priority::Medium, text)
            .with_source(&culture.id, &culture.name)
    });

    locations.chain(cultures).collect()
}

/// Priority of a chapter by its distance (in sequence index) from the
/// focused chapter.
pub fn chapter_priority(is_current: bool, distance: u32) -> Priority {
    if is_current {
        return Priority::Critical;
    }
    match distance {
        0 | 1 => Priority::High,
        2 | 3 => Priority::Medium,
        _ => Priority::Low,
    }
}

/// One chunk per chapter, in sequence order.
///
/// Distance is measured from the current chapter. When there is none (or
/// the id is unknown) it is measured from the latest chapter, which then
/// ranks high rather than critical.
pub fn chapter_chunks(chapters: &[Chapter], current_chapter_id: Option<&str>) -> Vec<ContextChunk> {
    let mut ordered: Vec<&Chapter> = chapters.iter().collect();
    ordered.sort_by_key(|c| c.order);

    let current = current_chapter_id.and_then(|id| ordered.iter().find(|c| c.id == id).copied());
    let Some(anchor) = current.or_else(|| ordered.last().copied()).map(|c| c.order) else {
        return Vec::new();
    };

    ordered
        .into_iter()
        .map(|chapter| {
            let is_current = current.is_some_and(|c| c.id == chapter.id);
            let priority = chapter_priority(is_current, chapter.order.abs_diff(anchor));

            let mut text = format!(
                "Chapter {}: {} [{}, {} words]",
                chapter.order, chapter.title, chapter.status, chapter.word_count
            );
            if is_current {
                text.push_str(" (current chapter)");
            }
            push_field(&mut text, "Summary", chapter.summary.as_deref());

            ContextChunk::new(ChunkType::Chapters, priority, text)
                .with_source(&chapter.id, &chapter.title)
        })
        .collect()
}

/// At most one chunk listing up to [`MAX_TIMELINE_EVENTS`] major events in
/// chronological order.
pub fn timeline_chunks(events: &[TimelineEvent]) -> Vec<ContextChunk> {
    let mut major: Vec<&TimelineEvent> = events
        .iter()
        .filter(|e| e.importance == EventImportance::Major)
        .collect();
    if major.is_empty() {
        return Vec::new();
    }
    major.sort_by_key(|e| e.chronological_index);

    let mut text = String::from("Major events in story order:");
    for (i, event) in major.iter().take(MAX_TIMELINE_EVENTS).enumerate() {
        match &event.description {
            Some(description) => {
                text.push_str(&format!("\n{}. {}: {}", i + 1, event.title, description))
            }
            None => text.push_str(&format!("\n{}. {}", i + 1, event.title)),
        }
    }

    vec![ContextChunk::new(ChunkType::Timeline, Priority::Medium, text)]
}

/// At most one chunk naming the project's themes.
pub fn theme_chunks(themes: &[String]) -> Vec<ContextChunk> {
    if themes.is_empty() {
        return Vec::new();
    }
    vec![ContextChunk::new(
        ChunkType::Themes,
        Priority::Medium,
        format!("Themes: {}", themes.join(", ")),
    )]
}

fn push_field(text: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        text.push_str(&format!("\n{label}: {value}"));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
