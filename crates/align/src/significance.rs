use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal label for how much a document changed, least to most.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    None,
    Minor,
    Moderate,
    Major,
    CompleteRewrite,
}

impl Significance {
    pub fn as_str(self) -> &'static str {
        match self {
            Significance::None => "none",
            Significance::Minor => "minor",
            Significance::Moderate => "moderate",
            Significance::Major => "major",
            Significance::CompleteRewrite => "complete_rewrite",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of [`SIGNIFICANCE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceRule {
    pub label: Significance,
    /// Inclusive lower bound on overall similarity.
    pub min_similarity: f64,
    /// Inclusive upper bound on non-equal operations; `None` is unbounded.
    pub max_changes: Option<usize>,
}

/// Rows are tried top to bottom; the first row whose bounds both hold wins.
/// The last row matches everything.
///
/// The `major` floor sits above the 0.3 that identical skeletons alone
/// contribute under the default blend, so revisions sharing no text are a
/// `complete_rewrite` even when their shape matches.
pub const SIGNIFICANCE_TABLE: [SignificanceRule; 5] = [
    SignificanceRule {
        label: Significance::None,
        min_similarity: 0.98,
        max_changes: Some(0),
    },
    SignificanceRule {
        label: Significance::Minor,
        min_similarity: 0.85,
        max_changes: Some(10),
    },
    SignificanceRule {
        label: Significance::Moderate,
        min_similarity: 0.60,
        max_changes: Some(50),
    },
    SignificanceRule {
        label: Significance::Major,
        min_similarity: 0.35,
        max_changes: None,
    },
    SignificanceRule {
        label: Significance::CompleteRewrite,
        min_similarity: 0.0,
        max_changes: None,
    },
];

/// Label a comparison from its overall similarity and non-equal op count.
pub fn classify(overall_similarity: f64, changes: usize) -> Significance {
    let similarity = if overall_similarity.is_finite() {
        overall_similarity
    } else {
        0.0
    };
    SIGNIFICANCE_TABLE
        .iter()
        .find(|rule| {
            similarity >= rule.min_similarity && rule.max_changes.is_none_or(|max| changes <= max)
        })
        .map_or(Significance::CompleteRewrite, |rule| rule.label)
}
