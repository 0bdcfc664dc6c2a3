//! # Storyloom Core
//!
//! Domain types, collaborator traits, and error definitions for the Storyloom
//! context engine. This crate has **no runtime dependencies** beyond serde,
//! chrono and the error/trait helpers; it defines the model that every other
//! crate builds against.
//!
//! ## Design Philosophy
//!
//! The engine consumes two external collaborators, both defined as traits here:
//! - [`ProjectSource`]: read-only access to a project and its related entities
//! - [`TextGenerator`]: the opaque, provider-agnostic text generation call
//!
//! Implementations live elsewhere (or in the host application), which keeps
//! the engine testable with scripted mocks.

pub mod error;
pub mod generation;
pub mod project;
pub mod source;

// Re-export key types at crate root for ergonomics
pub use error::{GenerationError, RepositoryError};
pub use generation::{
    GeneratedText, GenerationOptions, GenerationRequest, GenerationResult, TextGenerator,
};
pub use project::{
    Chapter, ChapterStatus, Character, CharacterRole, Culture, EventImportance, Location,
    OperationContext, Project, TimelineEvent, WorldState,
};
pub use source::ProjectSource;
