//! Prompt formatting: renders a [`ProjectContext`] into a system prompt
//! under a token budget.
//!
//! Layout:
//!
//! ```text
//! [header]                      always emitted, counted against the budget
//! ## Project Overview           one section per non-empty chunk type,
//! ## Characters                 in ChunkType::DISPLAY_ORDER
//! ...
//! [footer]                      only if it still fits
//! ```
//!
//! Budget rules mirror extraction: a chunk that does not fit is skipped and
//! marks the result truncated, except a critical chunk, which is emitted
//! anyway and ends its section. A section heading that does not fit ends
//! formatting altogether. A dropped footer is not truncation.

use serde::Serialize;
use tracing::debug;

use crate::chunk::{ChunkType, ContextChunk, Priority, ProjectContext};
use crate::token::estimate_tokens;

/// Opening block explaining what follows.
pub const CONTEXT_HEADER: &str = "# Story Context\n\n\
The following is established information about the writer's project. \
Use it to keep the story consistent and treat it as canon unless the writer says otherwise.\n";

/// Closing instruction block.
pub const CONTEXT_FOOTER: &str = "\n## Guidance\n\n\
Stay faithful to the details above. Match the project's genre and tone, \
keep character voices distinct and never contradict established events.\n";

/// The formatter's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextInjectionResult {
    pub system_prompt: String,
    /// Estimated tokens of everything emitted, header and footer included
    pub context_tokens: usize,
    pub chunks_included: usize,
    /// Whether any chunk or section was left out for budget reasons
    pub truncated: bool,
}

/// Stateless prompt renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render every chunk in `context` that fits in `max_tokens`.
    pub fn format(&self, context: &ProjectContext, max_tokens: usize) -> ContextInjectionResult {
        let mut out = Rendering::new(max_tokens);

        for chunk_type in ChunkType::DISPLAY_ORDER {
            let group: Vec<&ContextChunk> = context.chunks_of(chunk_type).collect();
            if group.is_empty() {
                continue;
            }
            if !out.section(chunk_type) {
                break;
            }
            out.group(&group);
        }

        let result = out.finish();
        debug!(
            project_id = %context.project_id(),
            context_tokens = result.context_tokens,
            chunks_included = result.chunks_included,
            truncated = result.truncated,
            budget = max_tokens,
            "Formatted context"
        );
        result
    }

    /// Render only the critical chunks, for calls that need the essentials
    /// and a small prompt.
    pub fn format_minimal(
        &self,
        context: &ProjectContext,
        max_tokens: usize,
    ) -> ContextInjectionResult {
        let critical: Vec<ContextChunk> = context
            .chunks()
            .iter()
            .filter(|c| c.priority() == Priority::Critical)
            .cloned()
            .collect();
        let minimal = ProjectContext::new(context.project_id(), critical, context.extracted_at());
        self.format(&minimal, max_tokens)
    }
}

/// Accumulates prompt text and budget bookkeeping for one `format` call.
struct Rendering {
    prompt: String,
    used: usize,
    max_tokens: usize,
    included: usize,
    truncated: bool,
}

impl Rendering {
    fn new(max_tokens: usize) -> Self {
        Self {
            prompt: CONTEXT_HEADER.to_string(),
            used: estimate_tokens(CONTEXT_HEADER),
            max_tokens,
            included: 0,
            truncated: false,
        }
    }

    fn fits(&self, tokens: usize) -> bool {
        self.used + tokens <= self.max_tokens
    }

    /// Emit a section heading. Returns false (and marks truncation) when it
    /// does not fit.
    fn section(&mut self, chunk_type: ChunkType) -> bool {
        let heading = format!("\n## {}\n\n", chunk_type.heading());
        let tokens = estimate_tokens(&heading);
        if !self.fits(tokens) {
            self.truncated = true;
            return false;
        }
        self.prompt.push_str(&heading);
        self.used += tokens;
        true
    }

    fn group(&mut self, group: &[&ContextChunk]) {
        for (i, chunk) in group.iter().enumerate() {
            if self.fits(chunk.tokens()) {
                self.emit(chunk);
                continue;
            }
            if chunk.priority().is_critical() {
                self.emit(chunk);
                if i + 1 < group.len() {
                    self.truncated = true;
                }
                break;
            }
            self.truncated = true;
        }
    }

    fn emit(&mut self, chunk: &ContextChunk) {
        self.prompt.push_str(chunk.content());
        self.prompt.push_str("\n\n");
        self.used += chunk.tokens();
        self.included += 1;
    }

    fn finish(mut self) -> ContextInjectionResult {
        let footer_tokens = estimate_tokens(CONTEXT_FOOTER);
        if self.fits(footer_tokens) {
            self.prompt.push_str(CONTEXT_FOOTER);
            self.used += footer_tokens;
        }
        ContextInjectionResult {
            system_prompt: self.prompt,
            context_tokens: self.used,
            chunks_included: self.included,
            truncated: self.truncated,
        }
    }
}
