//! Chapter drafts: parsing generated chapters and the scaffold fallback.

use serde::{Deserialize, Serialize};
use storyloom_core::error::GenerationError;

/// A drafted chapter ready to hand back to the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub body: String,
}

/// Interpret generated text as a chapter.
///
/// A first line that looks like a heading (`# ...` or `Chapter ...`) becomes
/// the title; otherwise the title is `Chapter {number}`. Empty output, or a
/// heading with no prose under it, is a parse error.
pub fn parse_chapter_draft(text: &str, number: u32) -> Result<ChapterDraft, GenerationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Parse("chapter response is empty".into()));
    }

    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let heading = first.trim();
    let (title, body) = if heading.starts_with('#') || heading.starts_with("Chapter ") {
        (heading.trim_start_matches('#').trim().to_string(), rest.trim())
    } else {
        (format!("Chapter {number}"), text)
    };

    if body.is_empty() {
        return Err(GenerationError::Parse(format!(
            "chapter '{title}' has a heading but no prose"
        )));
    }
    Ok(ChapterDraft {
        title,
        body: body.to_string(),
    })
}

/// Deterministic beat sheet returned when no chapter could be generated.
///
/// `brief` is whatever the writer asked for; it is echoed so the scaffold
/// stays anchored to the request.
pub fn chapter_scaffold(number: u32, brief: &str) -> ChapterDraft {
    let mut body = String::from(
        "[Scaffold: generation was unavailable. Replace these beats with prose.]\n",
    );
    let brief = brief.trim();
    if !brief.is_empty() {
        body.push_str(&format!("\nBrief: {brief}\n"));
    }
    for (i, beat) in SCAFFOLD_BEATS.iter().enumerate() {
        body.push_str(&format!("\n{}. {beat}", i + 1));
    }
    body.push('\n');

    ChapterDraft {
        title: format!("Chapter {number}"),
        body,
    }
}

const SCAFFOLD_BEATS: [&str; 5] = [
    "Opening: pick up where the previous chapter left the point-of-view character.",
    "Goal: show what they want from this chapter and what stands in the way.",
    "Complication: introduce a setback or revelation that changes the plan.",
    "Turn: force a choice that reveals character.",
    "Hook: close on an unresolved question that pulls into the next chapter.",
];
