//! Plot outlines: parsing generated outlines and the three-act fallback.

use serde::{Deserialize, Serialize};
use storyloom_core::error::GenerationError;

/// One act of a plot outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub number: u32,
    pub title: String,
    pub summary: String,
    /// Planned length of the act in words
    pub duration: u32,
    #[serde(default)]
    pub beats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotOutline {
    pub acts: Vec<Act>,
}

impl PlotOutline {
    /// Sum of all act durations.
    pub fn total_duration(&self) -> u64 {
        self.acts.iter().map(|a| u64::from(a.duration)).sum()
    }
}

/// Parse a JSON outline, tolerating a surrounding Markdown code fence.
pub fn parse_plot_outline(text: &str) -> Result<PlotOutline, GenerationError> {
    let outline: PlotOutline = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| GenerationError::Parse(format!("plot outline is not valid JSON: {e}")))?;

    if outline.acts.is_empty() {
        return Err(GenerationError::Parse("plot outline has no acts".into()));
    }
    if let Some(act) = outline.acts.iter().find(|a| a.title.trim().is_empty()) {
        return Err(GenerationError::Parse(format!("act {} has no title", act.number)));
    }
    Ok(outline)
}

/// Deterministic three-act skeleton for a story of `target_words`.
///
/// Acts take 25%, 50% and 25% of the target. The last act absorbs rounding,
/// so durations always sum to exactly `target_words`.
pub fn three_act_template(target_words: u32) -> PlotOutline {
    let setup = target_words / 4;
    let confrontation = target_words / 2;
    let resolution = target_words - setup - confrontation;

    PlotOutline {
        acts: vec![
            Act {
                number: 1,
                title: "Setup".into(),
                summary: "Introduce the protagonist, their world and what they want, \
                          then disrupt it with an inciting incident."
                    .into(),
                duration: setup,
                beats: beats(&[
                    "Opening image",
                    "Inciting incident",
                    "Debate",
                    "Break into act two",
                ]),
            },
            Act {
                number: 2,
                title: "Confrontation".into(),
                summary: "Raise the stakes as the protagonist pursues the goal and meets \
                          growing opposition, ending in a crisis."
                    .into(),
                duration: confrontation,
                beats: beats(&[
                    "Rising action",
                    "Midpoint reversal",
                    "Closing in",
                    "Darkest moment",
                ]),
            },
            Act {
                number: 3,
                title: "Resolution".into(),
                summary: "The protagonist confronts the central conflict and the story \
                          settles into its new equilibrium."
                    .into(),
                duration: resolution,
                beats: beats(&["Climax", "Falling action", "Final image"]),
            },
        ],
    }
}

fn beats(names: &[&str]) -> Vec<String> {
    names.iter().map(|b| (*b).to_string()).collect()
}

/// Strip a leading ```` ``` ```` or ```` ```json ```` fence and its closing
/// fence, if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
