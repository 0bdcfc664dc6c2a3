//! `StoryEngine`: context assembly and resilient generation for
//! application operations.

use std::sync::Arc;

use storyloom_config::{ContextConfig, EngineConfig};
use storyloom_context::{
    CacheSettings, CacheStats, ContextCache, ContextExtractor, ContextFormatter,
    ContextInjectionResult, ExtractionOptions, ProjectContext,
};
use storyloom_core::generation::{GenerationOptions, GenerationRequest, TextGenerator};
use storyloom_core::project::OperationContext;
use storyloom_core::source::ProjectSource;
use storyloom_generation::{
    ChapterDraft, Generated, PlotOutline, ResilientGenerator, RetryPolicy, chapter_scaffold,
    parse_chapter_draft, parse_plot_outline, three_act_template,
};
use tracing::{debug, info};

use crate::error::EngineError;

/// Story length assumed when neither the caller nor the project sets one.
pub const DEFAULT_TARGET_WORDS: u32 = 80_000;

/// The engine facade. Cheap to share behind an `Arc`.
pub struct StoryEngine {
    cache: Arc<ContextCache>,
    extractor: ContextExtractor,
    formatter: ContextFormatter,
    generator: ResilientGenerator,
    budgets: ContextConfig,
}

impl StoryEngine {
    /// Build an engine around an existing cache, so several engines (or
    /// other components) can share one.
    pub fn new(
        config: &EngineConfig,
        cache: Arc<ContextCache>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            cache,
            extractor: ContextExtractor::new(ExtractionOptions::from(&config.context)),
            formatter: ContextFormatter::new(),
            generator: ResilientGenerator::new(generator, RetryPolicy::from(&config.retry)),
            budgets: config.context.clone(),
        }
    }

    /// Build an engine with its own cache.
    pub fn from_config(config: &EngineConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let cache = Arc::new(ContextCache::new(CacheSettings::from(&config.cache)));
        Self::new(config, cache, generator)
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    /// The extracted context for an operation, served from the cache when
    /// the project has not changed.
    ///
    /// The cache key does not include `current_chapter_id`. Re-focusing the
    /// same project on another chapter keeps serving the context built for
    /// the old focus until the entry expires; call [`Self::project_updated`]
    /// when the focus changes.
    pub fn project_context(&self, op: &OperationContext) -> Arc<ProjectContext> {
        self.cache
            .get_or_extract(op, |op| self.extractor.extract(op))
    }

    /// Full system prompt under the configured budget.
    pub fn inject_context(&self, op: &OperationContext) -> ContextInjectionResult {
        self.inject_context_within(op, self.budgets.max_tokens)
    }

    /// Full system prompt under a caller-chosen budget.
    pub fn inject_context_within(
        &self,
        op: &OperationContext,
        max_tokens: usize,
    ) -> ContextInjectionResult {
        let context = self.project_context(op);
        self.formatter.format(&context, max_tokens)
    }

    /// Critical chunks only, under the minimal budget.
    pub fn inject_minimal_context(&self, op: &OperationContext) -> ContextInjectionResult {
        let context = self.project_context(op);
        self.formatter
            .format_minimal(&context, self.budgets.minimal_max_tokens)
    }

    /// Draft the chapter after the last one in the project.
    ///
    /// Falls back to a beat-sheet scaffold when generation fails.
    pub async fn write_next_chapter(
        &self,
        op: &OperationContext,
        brief: &str,
    ) -> Generated<ChapterDraft> {
        let number = op.project.next_chapter_order();
        let injected = self.inject_context(op);

        let mut prompt = format!(
            "Write chapter {number} of \"{}\". Continue from where the story left off, \
             in the established voice and tense.",
            op.project.title
        );
        if !brief.trim().is_empty() {
            prompt.push_str(&format!("\n\nWhat should happen: {}", brief.trim()));
        }
        prompt.push_str("\n\nStart with a Markdown heading for the chapter title.");

        let request = GenerationRequest::new(prompt)
            .with_system(injected.system_prompt)
            .with_options(GenerationOptions {
                temperature: 0.8,
                ..GenerationOptions::default()
            });

        let draft = self
            .generator
            .generate_with(
                request,
                |text| parse_chapter_draft(text, number),
                || chapter_scaffold(number, brief),
            )
            .await;

        info!(
            project_id = %op.project_id(),
            chapter = number,
            degraded = draft.is_degraded(),
            attempts = draft.provenance.attempts(),
            "Chapter draft ready"
        );
        draft
    }

    /// Outline the whole plot in acts.
    ///
    /// `target_words` defaults to the project's target, then to
    /// [`DEFAULT_TARGET_WORDS`]. Falls back to a three-act template whose act
    /// lengths sum to the target.
    pub async fn outline_plot(
        &self,
        op: &OperationContext,
        target_words: Option<u32>,
    ) -> Generated<PlotOutline> {
        let target = target_words
            .or(op.project.target_word_count)
            .unwrap_or(DEFAULT_TARGET_WORDS);
        let injected = self.inject_minimal_context(op);

        let prompt = format!(
            "Outline the plot of \"{}\" for a story of about {target} words. \
             Respond with JSON only, shaped as \
             {{\"acts\": [{{\"number\": 1, \"title\": \"...\", \"summary\": \"...\", \
             \"duration\": <words>, \"beats\": [\"...\"]}}]}}. \
             Act durations should add up to {target}.",
            op.project.title
        );

        let request = GenerationRequest::new(prompt)
            .with_system(injected.system_prompt)
            .with_options(GenerationOptions {
                json_response: true,
                ..GenerationOptions::default()
            });

        let outline = self
            .generator
            .generate_with(request, parse_plot_outline, || three_act_template(target))
            .await;

        info!(
            project_id = %op.project_id(),
            target_words = target,
            acts = outline.value.acts.len(),
            degraded = outline.is_degraded(),
            "Plot outline ready"
        );
        outline
    }

    /// Drop the cached context for a project after it was edited or
    /// re-focused on another chapter.
    pub fn project_updated(&self, project_id: &str) -> bool {
        self.cache.invalidate(project_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Load a project from `source` and focus it on `current_chapter`.
    pub async fn load_operation(
        &self,
        source: &dyn ProjectSource,
        project_id: &str,
        current_chapter: Option<&str>,
    ) -> Result<OperationContext, EngineError> {
        let mut op = source
            .load(project_id)
            .await?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))?;
        op.current_chapter_id = current_chapter.map(str::to_string);

        debug!(
            project_id,
            source = %source.name(),
            chapters = op.project.chapters.len(),
            characters = op.characters.len(),
            "Loaded project"
        );
        Ok(op)
    }
}

impl std::fmt::Debug for StoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("cache", &self.cache)
            .field("generator", &self.generator)
            .field("budgets", &self.budgets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use storyloom_core::error::GenerationError;
    use storyloom_core::generation::{GeneratedText, GenerationResult};
    use storyloom_core::project::{Chapter, ChapterStatus, Project};

    /// Answers every call with the same text and remembers the requests.
    struct CannedGenerator {
        reply: GenerationResult<GeneratedText>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl CannedGenerator {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(GeneratedText::new(text)),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: GenerationError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> GenerationRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate_text(
            &self,
            request: GenerationRequest,
        ) -> GenerationResult<GeneratedText> {
            self.requests.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn project() -> OperationContext {
        let mut project = Project::new("p1", "The Lantern Keeper");
        project.target_word_count = Some(60_000);
        project.chapters = vec![Chapter {
            id: "c1".into(),
            order: 1,
            title: "Inheritance".into(),
            summary: Some("Isolde takes over the lighthouse.".into()),
            status: ChapterStatus::Complete,
            word_count: 3000,
        }];
        OperationContext::new(project)
    }

    #[tokio::test]
    async fn chapter_request_carries_injected_context() {
        let generator = CannedGenerator::ok("# Salt Roads\n\nThe ferry left at dawn.");
        let engine = StoryEngine::from_config(&EngineConfig::default(), generator.clone());

        let draft = engine.write_next_chapter(&project(), "Isolde sails for the city").await;

        assert!(!draft.is_degraded());
        assert_eq!(draft.value.title, "Salt Roads");
        let request = generator.last_request();
        assert!(request.prompt.contains("Write chapter 2"));
        assert!(request.prompt.contains("Isolde sails for the city"));
        assert!(request.system.unwrap().contains("Title: The Lantern Keeper"));
    }

    #[tokio::test(start_paused = true)]
    async fn chapter_falls_back_to_scaffold() {
        let generator = CannedGenerator::failing(GenerationError::Authentication("bad key".into()));
        let engine = StoryEngine::from_config(&EngineConfig::default(), generator);

        let draft = engine.write_next_chapter(&project(), "").await;

        assert!(draft.is_degraded());
        assert_eq!(draft.value, chapter_scaffold(2, ""));
    }

    #[tokio::test(start_paused = true)]
    async fn outline_uses_project_target_for_fallback() {
        let generator = CannedGenerator::ok("Act one: the lamp gutters.");
        let engine = StoryEngine::from_config(&EngineConfig::default(), generator.clone());

        let outline = engine.outline_plot(&project(), None).await;

        assert!(outline.is_degraded());
        assert_eq!(outline.value.total_duration(), 60_000);
        let request = generator.last_request();
        assert!(request.options.json_response);
        assert!(request.prompt.contains("60000 words"));
    }

    #[tokio::test]
    async fn outline_parses_generated_json() {
        let generator = CannedGenerator::ok(
            r#"{"acts":[{"number":1,"title":"Storm","summary":"s","duration":30000},
                        {"number":2,"title":"Calm","summary":"s","duration":30000}]}"#,
        );
        let engine = StoryEngine::from_config(&EngineConfig::default(), generator);

        let outline = engine.outline_plot(&project(), Some(60_000)).await;

        assert!(!outline.is_degraded());
        assert_eq!(outline.value.acts.len(), 2);
    }

    #[test]
    fn project_updated_invalidates_cache() {
        let engine = StoryEngine::from_config(&EngineConfig::default(), CannedGenerator::ok("x"));
        let op = project();

        engine.inject_context(&op);
        assert_eq!(engine.cache_stats().size, 1);
        assert!(engine.project_updated("p1"));
        assert_eq!(engine.cache_stats().size, 0);
        assert!(!engine.project_updated("p1"));
    }

    #[test]
    fn refocus_needs_project_updated() {
        let engine = StoryEngine::from_config(&EngineConfig::default(), CannedGenerator::ok("x"));
        let mut op = project();
        op.current_chapter_id = Some("c1".into());
        assert!(engine.inject_context(&op).system_prompt.contains("(current chapter)"));

        // Same project, no focus: the fingerprint is unchanged.
        op.current_chapter_id = None;
        assert!(engine.inject_context(&op).system_prompt.contains("(current chapter)"));

        engine.project_updated("p1");
        assert!(!engine.inject_context(&op).system_prompt.contains("(current chapter)"));
    }

    #[test]
    fn minimal_context_is_smaller() {
        let engine = StoryEngine::from_config(&EngineConfig::default(), CannedGenerator::ok("x"));
        let op = project();

        let full = engine.inject_context(&op);
        let minimal = engine.inject_minimal_context(&op);
        assert!(minimal.chunks_included < full.chunks_included);
        assert!(minimal.context_tokens < full.context_tokens);
        // Both served from one extraction.
        assert_eq!(engine.cache_stats().misses, 1);
    }
}
