//! Resilient text generation for Storyloom.
//!
//! [`ResilientGenerator`] wraps any [`TextGenerator`](storyloom_core::TextGenerator)
//! with bounded retries, exponential backoff and a per-attempt timeout. When
//! a call ultimately fails, or succeeds with a body that cannot be parsed,
//! it returns a deterministic template instead of an error:
//!
//! ```text
//! Attempting(n) ──ok──────────────▶ parse ──ok──▶ Generated
//!      │                              └──err──▶ Fallback(Unparseable)
//!      ├─retryable, n < max──▶ sleep(backoff) ──▶ Attempting(n+1)
//!      ├─retryable, n == max─▶ Fallback(RetriesExhausted)
//!      └─non-retryable───────▶ Fallback(NonRetryable)
//! ```
//!
//! Templates for the built-in operations live in [`outline`] and [`chapter`].

pub mod chapter;
pub mod orchestrator;
pub mod outline;
pub mod retry;

pub use chapter::{ChapterDraft, chapter_scaffold, parse_chapter_draft};
pub use orchestrator::{AttemptOutcome, FallbackReason, Generated, Provenance, ResilientGenerator};
pub use outline::{Act, PlotOutline, parse_plot_outline, three_act_template};
pub use retry::RetryPolicy;
