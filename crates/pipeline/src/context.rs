//! Context assembly.

use ragdesk_core::index::Passage;

/// Separator placed between passages.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Join passage contents in retrieval order. No deduplication, reranking
/// or length cap.
pub fn assemble_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up. Only used for logging.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}
