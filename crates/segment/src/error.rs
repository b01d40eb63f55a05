use thiserror::Error;

/// Errors raised while interpreting segmentation inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("unknown granularity '{0}' (expected character, word, sentence or paragraph)")]
    UnknownGranularity(String),
}
