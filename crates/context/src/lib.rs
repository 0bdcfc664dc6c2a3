//! Context assembly for Storyloom.
//!
//! Turns a project into a token-bounded, prioritized bundle of text for an
//! AI call:
//!
//! 1. **Extract**: one pure function per context type renders typed,
//!    prioritized chunks, then a greedy packer fits them into a budget
//! 2. **Cache**: extraction results are memoized per project and
//!    invalidated by a fingerprint of the project's mutable fields
//! 3. **Format**: surviving chunks are grouped by type and rendered into an
//!    instruction-bearing system prompt with truncation accounting
//!
//! # Priorities
//!
//! | Priority | Examples | Budget behaviour |
//! |----------|----------|------------------|
//! | Critical | project metadata, protagonist, current chapter | Admitted even when over budget (once, then packing stops) |
//! | High | mentors, adjacent chapters | Packed first after critical |
//! | Medium | world building, nearby chapters, timeline | Packed while budget remains |
//! | Low | distant chapters | First to go |

pub mod cache;
pub mod chunk;
pub mod clock;
pub mod extractor;
pub mod formatter;
pub mod token;

pub use cache::{
    CacheEntryStats, CacheSettings, CacheStats, ContextCache, ContextCacheEntry, fingerprint,
};
pub use chunk::{
    CONTEXT_FORMAT_VERSION, ChunkSource, ChunkType, ContextChunk, Priority, ProjectContext,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use extractor::{ContextExtractor, ExtractionOptions};
pub use formatter::{ContextFormatter, ContextInjectionResult};
pub use token::estimate_tokens;
