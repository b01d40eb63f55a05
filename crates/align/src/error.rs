use thiserror::Error;

/// Errors produced while aligning two token sequences.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Alignment cost exceeded `max_edit_distance` even after block-hash
    /// anchoring. Retrying at a coarser granularity usually helps.
    #[error(
        "diff too large: {a_tokens} vs {b_tokens} tokens exceed edit distance limit {limit}"
    )]
    DiffTooLarge {
        a_tokens: usize,
        b_tokens: usize,
        limit: usize,
    },
    #[error("alignment task failed: {0}")]
    Internal(String),
}
