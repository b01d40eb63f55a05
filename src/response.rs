use align::{
    ChangeSummary, ComparisonConfig, ComparisonMetrics, ComparisonWarning, DiffOperation,
    DiffStatistics, OpKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::Fingerprint;

/// Outcome of one comparison. Immutable once produced; the cache replaces
/// entries wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub slug: String,
    pub version_a: u32,
    pub version_b: u32,
    pub config: ComparisonConfig,
    pub fingerprint: Fingerprint,
    pub operations: Vec<DiffOperation>,
    pub metrics: ComparisonMetrics,
    pub change_summary: ChangeSummary,
    pub statistics: DiffStatistics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ComparisonWarning>,
    pub processing_time_ms: u64,
    /// True only when this copy was served from the cache.
    pub cached: bool,
    pub computed_at: DateTime<Utc>,
}

impl ComparisonResult {
    pub(crate) fn served_from_cache(&self) -> Self {
        Self {
            cached: true,
            ..self.clone()
        }
    }

    /// Number of insert, delete and replace operations.
    pub fn change_count(&self) -> usize {
        self.statistics.changes()
    }

    /// Flatten into the wire contract, where tokens become plain strings.
    pub fn to_response(&self) -> ComparisonResponse {
        ComparisonResponse {
            slug: self.slug.clone(),
            version_a: self.version_a,
            version_b: self.version_b,
            fingerprint: self.fingerprint.clone(),
            operations: self.operations.iter().map(OperationView::from).collect(),
            metrics: self.metrics.clone(),
            change_summary: self.change_summary.clone(),
            statistics: self.statistics,
            warnings: self.warnings.clone(),
            processing_time_ms: self.processing_time_ms,
            cached: self.cached,
            computed_at: self.computed_at,
        }
    }
}

/// JSON response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResponse {
    pub slug: String,
    pub version_a: u32,
    pub version_b: u32,
    pub fingerprint: Fingerprint,
    pub operations: Vec<OperationView>,
    pub metrics: ComparisonMetrics,
    pub change_summary: ChangeSummary,
    pub statistics: DiffStatistics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ComparisonWarning>,
    pub processing_time_ms: u64,
    pub cached: bool,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationView {
    pub operation: OpKind,
    pub a_content: Vec<String>,
    pub b_content: Vec<String>,
    pub position: usize,
    pub b_position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl From<&DiffOperation> for OperationView {
    fn from(op: &DiffOperation) -> Self {
        Self {
            operation: op.kind,
            a_content: op.a_content.iter().map(|t| t.text.clone()).collect(),
            b_content: op.b_content.iter().map(|t| t.text.clone()).collect(),
            position: op.position,
            b_position: op.b_position,
            confidence: op.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segment::{segment, Granularity};

    #[test]
    fn operation_view_carries_exact_token_text() {
        let a = segment("old  value", Granularity::Word);
        let b = segment("new value", Granularity::Word);
        let op = DiffOperation::replace(3, 4, &a, &b).with_confidence(0.8);

        let view = OperationView::from(&op);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["operation"], "replace");
        assert_eq!(json["a_content"], serde_json::json!(["old  ", "value"]));
        assert_eq!(json["b_content"], serde_json::json!(["new ", "value"]));
        assert_eq!(json["position"], 3);
        assert_eq!(json["confidence"], 0.8);
    }

    #[test]
    fn equal_ops_omit_confidence() {
        let a = segment("same", Granularity::Word);
        let json = serde_json::to_value(OperationView::from(&DiffOperation::equal(0, 0, &a, &a)))
            .unwrap();
        assert_eq!(json["operation"], "equal");
        assert!(json.get("confidence").is_none());
    }
}
