//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, measured after
//! collapsing whitespace. Close enough to BPE tokenizers on English prose to
//! budget prompts, and fully deterministic so cached contexts and budget math
//! reproduce across runs.

use crate::chunk::ContextChunk;

/// Estimate the token count for a string.
///
/// Whitespace runs collapse to one space and the ends are trimmed, then
/// `ceil(chars / 4)`. Empty or whitespace-only input is 0 tokens.
pub fn estimate_tokens(text: &str) -> usize {
    normalized_len(text).div_ceil(4)
}

/// Sum of the precomputed token counts of a slice of chunks.
pub fn estimate_chunks_tokens(chunks: &[ContextChunk]) -> usize {
    chunks.iter().map(ContextChunk::tokens).sum()
}

/// Length in chars of `text` with whitespace normalized, without allocating.
fn normalized_len(text: &str) -> usize {
    let mut chars = 0;
    let mut words: usize = 0;
    for word in text.split_whitespace() {
        chars += word.chars().count();
        words += 1;
    }
    // One separating space between each pair of words.
    chars + words.saturating_sub(1)
}
