//! Similarity scores derived from a finished edit script.

use segment::{skeleton, KeyInterner, SkeletonElement};
use serde::{Deserialize, Serialize};

use crate::anchor::{bounded_lcs, DiffLimits};
use crate::error::AlignError;
use crate::significance::{classify, Significance};
use crate::similarity::dice;
use crate::types::{DiffOperation, OpKind};

/// Blend weights, rounding and skeleton diff limits for [`ComparisonMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricWeights {
    #[serde(default = "MetricWeights::default_text_weight")]
    pub text_weight: f64,
    #[serde(default = "MetricWeights::default_structural_weight")]
    pub structural_weight: f64,
    /// Decimal places kept in every reported score.
    #[serde(default = "MetricWeights::default_precision")]
    pub precision: u32,
    /// Edit distance the skeleton LCS explores before degrading to multiset
    /// overlap.
    #[serde(default = "MetricWeights::default_structural_max_edit_distance")]
    pub structural_max_edit_distance: usize,
    #[serde(default = "MetricWeights::default_structural_block_size")]
    pub structural_block_size: usize,
}

impl MetricWeights {
    pub(crate) fn default_text_weight() -> f64 {
        0.7
    }

    pub(crate) fn default_structural_weight() -> f64 {
        0.3
    }

    pub(crate) fn default_precision() -> u32 {
        3
    }

    pub(crate) fn default_structural_max_edit_distance() -> usize {
        2000
    }

    pub(crate) fn default_structural_block_size() -> usize {
        4
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        let in_range = |w: f64| (0.0..=1.0).contains(&w);
        if !in_range(self.text_weight) || !in_range(self.structural_weight) {
            return Err(AlignError::InvalidConfig(
                "metric weights must be between 0.0 and 1.0".into(),
            ));
        }
        if (self.text_weight + self.structural_weight - 1.0).abs() > 1e-6 {
            return Err(AlignError::InvalidConfig(
                "text_weight and structural_weight must sum to 1.0".into(),
            ));
        }
        if self.precision > 6 {
            return Err(AlignError::InvalidConfig(
                "precision must be at most 6 decimal places".into(),
            ));
        }
        if self.structural_max_edit_distance == 0 || self.structural_block_size == 0 {
            return Err(AlignError::InvalidConfig(
                "structural limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            text_weight: Self::default_text_weight(),
            structural_weight: Self::default_structural_weight(),
            precision: Self::default_precision(),
            structural_max_edit_distance: Self::default_structural_max_edit_distance(),
            structural_block_size: Self::default_structural_block_size(),
        }
    }
}

/// Quantitative and qualitative scores of one comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonMetrics {
    pub text_similarity: f64,
    pub structural_similarity: f64,
    pub overall_similarity: f64,
    pub change_significance: Significance,
    /// `1 - overall_similarity`.
    pub change_intensity: f64,
    /// Mean confidence of semantic `replace` operations, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
}

impl ComparisonMetrics {
    /// Every score is finite and within `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        let unit = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        unit(self.text_similarity)
            && unit(self.structural_similarity)
            && unit(self.overall_similarity)
            && unit(self.change_intensity)
            && self.semantic_similarity.is_none_or(unit)
    }
}

/// Score `ops`, the edit script between `a_text` and `b_text`.
pub fn aggregate(
    ops: &[DiffOperation],
    a_text: &str,
    b_text: &str,
    weights: &MetricWeights,
) -> ComparisonMetrics {
    let text = text_similarity(ops);
    let structural = structural_similarity(a_text, b_text, weights);
    let overall = weights.text_weight * text + weights.structural_weight * structural;

    let confidences: Vec<f64> = ops
        .iter()
        .filter(|op| op.kind == OpKind::Replace)
        .filter_map(|op| op.confidence)
        .collect();
    let semantic = (!confidences.is_empty())
        .then(|| confidences.iter().sum::<f64>() / confidences.len() as f64);

    let precision = weights.precision;
    let overall = round_unit(overall, precision);
    let changes = ops.iter().filter(|op| op.is_change()).count();
    ComparisonMetrics {
        text_similarity: round_unit(text, precision),
        structural_similarity: round_unit(structural, precision),
        overall_similarity: overall,
        change_significance: classify(overall, changes),
        change_intensity: round_unit(1.0 - overall, precision),
        semantic_similarity: semantic.map(|s| round_unit(s, precision)),
    }
}

/// `2 × equal weight / (weight A + weight B)` over key characters.
pub fn text_similarity(ops: &[DiffOperation]) -> f64 {
    let mut equal = 0;
    let mut total_a = 0;
    let mut total_b = 0;
    for op in ops {
        let (wa, wb) = (op.a_weight(), op.b_weight());
        total_a += wa;
        total_b += wb;
        if op.kind == OpKind::Equal {
            equal += wa;
        }
    }
    dice(equal, total_a, total_b)
}

/// Unit-weight Dice over the LCS of the two document skeletons.
pub fn structural_similarity(a_text: &str, b_text: &str, weights: &MetricWeights) -> f64 {
    let a = skeleton(a_text);
    let b = skeleton(b_text);
    let a_keys: Vec<String> = a.iter().map(skeleton_key).collect();
    let b_keys: Vec<String> = b.iter().map(skeleton_key).collect();

    let mut interner = KeyInterner::new();
    let a_ids: Vec<u32> = a_keys.iter().map(|k| interner.intern(k)).collect();
    let b_ids: Vec<u32> = b_keys.iter().map(|k| interner.intern(k)).collect();

    let limits = DiffLimits {
        max_edit_distance: weights.structural_max_edit_distance,
        block_size: weights.structural_block_size,
    };
    let matched = bounded_lcs(&a_ids, &b_ids, limits, |_| 1);
    dice(matched, a_ids.len(), b_ids.len())
}

fn skeleton_key(element: &SkeletonElement) -> String {
    match element {
        SkeletonElement::Heading(text) => format!("h:{text}"),
        SkeletonElement::Body => "b".to_string(),
    }
}

fn round_unit(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(precision as i32);
    ((value.clamp(0.0, 1.0) * scale).round() / scale).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segment::{segment, Granularity};

    fn words(text: &str) -> Vec<segment::Token> {
        segment(text, Granularity::Word)
    }

    #[test]
    fn identical_documents_score_one() {
        let text = "# Title\nBody text.\n\nMore.";
        let tokens = words(text);
        let ops = vec![DiffOperation::equal(0, 0, &tokens, &tokens)];
        let m = aggregate(&ops, text, text, &MetricWeights::default());
        assert_eq!(m.text_similarity, 1.0);
        assert_eq!(m.structural_similarity, 1.0);
        assert_eq!(m.overall_similarity, 1.0);
        assert_eq!(m.change_intensity, 0.0);
        assert_eq!(m.change_significance, Significance::None);
        assert_eq!(m.semantic_similarity, None);
    }

    #[test]
    fn disjoint_text_scores_zero_text_similarity() {
        let a = words("abc");
        let b = words("xyz");
        let ops = vec![DiffOperation::delete(0, 0, &a), DiffOperation::insert(1, 0, &b)];
        let m = aggregate(&ops, "abc", "xyz", &MetricWeights::default());
        assert_eq!(m.text_similarity, 0.0);
        // Both are a single body paragraph.
        assert_eq!(m.structural_similarity, 1.0);
        assert_eq!(m.overall_similarity, 0.3);
        assert_eq!(m.change_significance, Significance::CompleteRewrite);
    }

    #[test]
    fn text_similarity_is_weighted_by_key_chars() {
        let a = words("keep gone");
        let b = words("keep");
        let ops = vec![
            DiffOperation::equal(0, 0, &a[..1], &b[..1]),
            DiffOperation::delete(1, 1, &a[1..]),
        ];
        // 2 * 4 / (8 + 4)
        assert!((text_similarity(&ops) - 8.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn structural_similarity_tracks_headings() {
        let a = "# Intro\nx\n\n# Terms\ny\n\n# Appendix\nz";
        let b = "# Intro\nx\n\n# Appendix\nz";
        // Skeletons of 6 and 4 elements sharing 4.
        let weights = MetricWeights::default();
        assert!((structural_similarity(a, b, &weights) - 0.8).abs() < 1e-12);
        assert_eq!(structural_similarity("", "", &weights), 1.0);
    }

    #[test]
    fn tight_structural_limits_fall_back_to_overlap() {
        let a = "# A\nw\n\n# B\nx\n\n# A\ny\n\n# B\nz";
        let b = "# B\nw\n\n# A\nx\n\n# B\ny\n\n# A\nz";
        let exact = structural_similarity(a, b, &MetricWeights::default());
        assert!(exact < 1.0, "exact = {exact}");

        // Repeated headings leave nothing to anchor on.
        let tight = MetricWeights {
            structural_max_edit_distance: 1,
            structural_block_size: 16,
            ..MetricWeights::default()
        };
        assert!(tight.validate().is_ok());
        assert_eq!(structural_similarity(a, b, &tight), 1.0);
    }

    #[test]
    fn semantic_similarity_averages_confidences() {
        let a = segment("One. Two.", Granularity::Sentence);
        let b = segment("Uno. Dos.", Granularity::Sentence);
        let ops = vec![
            DiffOperation::replace(0, 0, &a[..1], &b[..1]).with_confidence(0.8),
            DiffOperation::replace(1, 1, &a[1..], &b[1..]).with_confidence(0.7),
        ];
        let m = aggregate(&ops, "One. Two.", "Uno. Dos.", &MetricWeights::default());
        assert_eq!(m.semantic_similarity, Some(0.75));
    }

    #[test]
    fn rounding_is_fixed_precision_and_clamped() {
        assert_eq!(round_unit(0.123456, 3), 0.123);
        assert_eq!(round_unit(1.2, 3), 1.0);
        assert_eq!(round_unit(-0.1, 3), 0.0);
        assert_eq!(round_unit(f64::NAN, 3), 0.0);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = MetricWeights {
            text_weight: 0.5,
            structural_weight: 0.3,
            ..MetricWeights::default()
        };
        assert!(weights.validate().is_err());
        assert!(MetricWeights::default().validate().is_ok());
    }

    #[test]
    fn well_formed_rejects_out_of_range() {
        let mut m = aggregate(&[], "", "", &MetricWeights::default());
        assert!(m.is_well_formed());
        m.overall_similarity = f64::INFINITY;
        assert!(!m.is_well_formed());
    }
}
