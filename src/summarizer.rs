//! Optional narrative summarization of a finished comparison.
//!
//! The comparator calls the installed [`NarrativeSummarizer`] best-effort
//! under a timeout. A failure or timeout only leaves `executive_summary`
//! unset.

use align::{ChangeSummary, ComparisonMetrics, DiffOperation, RiskLevel};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),
    #[error("summarizer failed: {0}")]
    Failed(String),
}

/// Prose produced for a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub executive_summary: String,
    pub risk_level: Option<RiskLevel>,
}

#[async_trait]
pub trait NarrativeSummarizer: Send + Sync {
    async fn summarize(
        &self,
        summary: &ChangeSummary,
        operations: &[DiffOperation],
        metrics: &ComparisonMetrics,
    ) -> Result<Narrative, SummarizerError>;

    fn name(&self) -> &str {
        "summarizer"
    }
}

/// Fixed-phrase summarizer banded on overall similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(summary: &ChangeSummary, metrics: &ComparisonMetrics) -> Narrative {
        let overall = metrics.overall_similarity;
        let (verdict, risk) = if overall > 0.9 {
            ("very similar", RiskLevel::Low)
        } else if overall > 0.7 {
            ("moderate differences", RiskLevel::Medium)
        } else {
            ("significant differences", RiskLevel::High)
        };
        let headline = if overall > 0.9 {
            format!("The documents are {verdict}")
        } else {
            format!("The documents show {verdict}")
        };
        let executive_summary = format!(
            "{headline} ({:.1}% overall similarity, {} change). {} and {}.",
            overall * 100.0,
            metrics.change_significance,
            count(summary.major_additions.len(), "major addition"),
            count(summary.major_removals.len(), "major removal"),
        );
        Narrative {
            executive_summary,
            risk_level: Some(risk),
        }
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

#[async_trait]
impl NarrativeSummarizer for TemplateSummarizer {
    async fn summarize(
        &self,
        summary: &ChangeSummary,
        _operations: &[DiffOperation],
        metrics: &ComparisonMetrics,
    ) -> Result<Narrative, SummarizerError> {
        Ok(Self::render(summary, metrics))
    }

    fn name(&self) -> &str {
        "template"
    }
}
