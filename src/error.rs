use align::AlignError;
use thiserror::Error;

use crate::providers::SourceError;

/// Errors surfaced by [`Comparator::compare`](crate::Comparator::compare).
///
/// Every variant is plain data so one failure can be handed to every caller
/// sharing an in-flight computation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// Unknown enum value, out-of-range threshold or empty slug. Raised before
    /// any work starts; nothing is cached.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("revision not found: {slug} version {version}")]
    RevisionNotFound { slug: String, version: u32 },
    /// Alignment cost stayed above the configured limit after block-hash
    /// anchoring. Retry with a coarser granularity.
    #[error(
        "diff too large: {a_tokens} vs {b_tokens} tokens exceed edit distance limit {limit}"
    )]
    DiffTooLarge {
        a_tokens: usize,
        b_tokens: usize,
        limit: usize,
    },
    #[error("revision source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ComparisonError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ComparisonError::InvalidConfig(_) => "invalid_config",
            ComparisonError::RevisionNotFound { .. } => "revision_not_found",
            ComparisonError::DiffTooLarge { .. } => "diff_too_large",
            ComparisonError::SourceUnavailable(_) => "source_unavailable",
            ComparisonError::Internal(_) => "internal",
        }
    }
}

impl From<AlignError> for ComparisonError {
    fn from(value: AlignError) -> Self {
        match value {
            AlignError::InvalidConfig(msg) => ComparisonError::InvalidConfig(msg),
            AlignError::DiffTooLarge {
                a_tokens,
                b_tokens,
                limit,
            } => ComparisonError::DiffTooLarge {
                a_tokens,
                b_tokens,
                limit,
            },
            AlignError::Internal(msg) => ComparisonError::Internal(msg),
        }
    }
}

impl From<SourceError> for ComparisonError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::NotFound { slug, version } => {
                ComparisonError::RevisionNotFound { slug, version }
            }
            SourceError::Unavailable(msg) => ComparisonError::SourceUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let cases = [
            (ComparisonError::InvalidConfig("x".into()), "invalid_config"),
            (
                ComparisonError::RevisionNotFound {
                    slug: "doc".into(),
                    version: 3,
                },
                "revision_not_found",
            ),
            (
                ComparisonError::DiffTooLarge {
                    a_tokens: 1,
                    b_tokens: 2,
                    limit: 0,
                },
                "diff_too_large",
            ),
            (ComparisonError::SourceUnavailable("down".into()), "source_unavailable"),
            (ComparisonError::Internal("panic".into()), "internal"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn align_and_source_errors_convert() {
        let err: ComparisonError = AlignError::DiffTooLarge {
            a_tokens: 10,
            b_tokens: 12,
            limit: 4,
        }
        .into();
        assert_eq!(err.kind(), "diff_too_large");

        let err: ComparisonError = SourceError::NotFound {
            slug: "contract".into(),
            version: 7,
        }
        .into();
        assert_eq!(err.to_string(), "revision not found: contract version 7");
    }
}
