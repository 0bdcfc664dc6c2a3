//! The Storyloom engine facade.
//!
//! [`StoryEngine`] wires the pieces together for application operations:
//!
//! ```text
//! operation ──▶ ContextCache ──miss──▶ ContextExtractor
//!                    │
//!                    ▼
//!             ContextFormatter ──▶ ResilientGenerator ──▶ TextGenerator
//! ```
//!
//! Construct one engine at startup and share it. Every public operation
//! returns a usable value; the only errors surfaced are about loading a
//! project from its [`ProjectSource`](storyloom_core::ProjectSource).

pub mod engine;
pub mod error;
pub mod source;

pub use engine::{DEFAULT_TARGET_WORDS, StoryEngine};
pub use error::EngineError;
pub use source::InMemoryProjectSource;
