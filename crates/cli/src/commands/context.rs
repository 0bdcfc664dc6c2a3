//! `storyloom context`: Render the injected context for a snapshot.

use std::path::Path;

use anyhow::Context as _;
use storyloom_config::EngineConfig;
use storyloom_context::{ContextExtractor, ContextFormatter, ExtractionOptions};

pub fn run(
    snapshot: &Path,
    max_tokens: Option<usize>,
    minimal: bool,
    current_chapter: Option<String>,
) -> anyhow::Result<()> {
    let config = EngineConfig::load().context("failed to load configuration")?;
    let op = super::focus(super::read_snapshot(snapshot)?, current_chapter);

    let mut options = ExtractionOptions::from(&config.context);
    if let Some(max) = max_tokens {
        options.max_tokens = options.max_tokens.max(max);
    }
    let extracted = ContextExtractor::new(options).extract(&op);

    let formatter = ContextFormatter::new();
    let result = if minimal {
        formatter.format_minimal(
            &extracted,
            max_tokens.unwrap_or(config.context.minimal_max_tokens),
        )
    } else {
        formatter.format(&extracted, max_tokens.unwrap_or(config.context.max_tokens))
    };

    println!("{}", result.system_prompt);
    eprintln!(
        "📚 {} chunks, {} tokens{}",
        result.chunks_included,
        result.context_tokens,
        if result.truncated { " (truncated)" } else { "" }
    );
    Ok(())
}
