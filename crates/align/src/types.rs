use std::fmt;
use std::str::FromStr;

use segment::{reconstruct, total_weight, Granularity, Token};
use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// Comparison strategy, dispatched by [`align`](crate::align).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Pure text alignment (Myers with block-hash anchoring).
    Syntactic,
    /// Greedy embedding-similarity pairing of sentence/paragraph units.
    Semantic,
    /// Syntactic baseline with semantic reclassification of delete+insert gaps.
    #[default]
    Hybrid,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Syntactic, Algorithm::Semantic, Algorithm::Hybrid];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Syntactic => "syntactic",
            Algorithm::Semantic => "semantic",
            Algorithm::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                AlignError::InvalidConfig(format!(
                    "unknown algorithm `{s}` (expected syntactic, semantic or hybrid)"
                ))
            })
    }
}

/// Validated per-comparison settings. Immutable once a comparison starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComparisonConfig {
    pub granularity: Granularity,
    pub algorithm: Algorithm,
    pub similarity_threshold: f64,
}

impl ComparisonConfig {
    pub fn new(granularity: Granularity, algorithm: Algorithm, similarity_threshold: f64) -> Self {
        Self {
            granularity,
            algorithm,
            similarity_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AlignError::InvalidConfig(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Threshold rounded to hundredths; requests in the same bucket share a
    /// cache entry.
    pub fn threshold_bucket(&self) -> u32 {
        (self.similarity_threshold.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self::new(Granularity::Word, Algorithm::Hybrid, 0.7)
    }
}

/// Tuning knobs shared by every aligner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlignOptions {
    /// Minimum edit-similarity for an adjacent delete+insert pair to be
    /// merged into a syntactic `replace`.
    #[serde(default = "AlignOptions::default_merge_threshold")]
    pub merge_threshold: f64,
    /// Largest edit distance Myers explores before falling back to
    /// block-hash anchoring.
    #[serde(default = "AlignOptions::default_max_edit_distance")]
    pub max_edit_distance: usize,
    /// Edit distance [`edit_similarity`](crate::edit_similarity) explores
    /// before degrading to word-multiset overlap.
    #[serde(default = "AlignOptions::default_similarity_max_edit_distance")]
    pub similarity_max_edit_distance: usize,
    /// Token count of the k-gram blocks used when no unique token anchors exist.
    #[serde(default = "AlignOptions::default_anchor_block_size")]
    pub anchor_block_size: usize,
    /// Minimum similarity for position-based pairing of leftover semantic units.
    #[serde(default = "AlignOptions::default_position_pair_floor")]
    pub position_pair_floor: f64,
    /// Combined token count above which CPU stages run on the blocking pool.
    #[serde(default = "AlignOptions::default_offload_token_threshold")]
    pub offload_token_threshold: usize,
    /// Upper bound on candidate unit pairs scored by the semantic aligner.
    #[serde(default = "AlignOptions::default_max_semantic_pairs")]
    pub max_semantic_pairs: usize,
}

impl AlignOptions {
    pub(crate) fn default_merge_threshold() -> f64 {
        0.6
    }

    pub(crate) fn default_max_edit_distance() -> usize {
        2000
    }

    pub(crate) fn default_similarity_max_edit_distance() -> usize {
        512
    }

    pub(crate) fn default_anchor_block_size() -> usize {
        8
    }

    pub(crate) fn default_position_pair_floor() -> f64 {
        0.3
    }

    pub(crate) fn default_offload_token_threshold() -> usize {
        20_000
    }

    pub(crate) fn default_max_semantic_pairs() -> usize {
        4_000_000
    }

    pub fn validate(&self) -> Result<(), AlignError> {
        if !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(AlignError::InvalidConfig(
                "merge_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.position_pair_floor) {
            return Err(AlignError::InvalidConfig(
                "position_pair_floor must be between 0.0 and 1.0".into(),
            ));
        }
        if self.max_edit_distance == 0 {
            return Err(AlignError::InvalidConfig(
                "max_edit_distance must be greater than zero".into(),
            ));
        }
        if self.similarity_max_edit_distance == 0 {
            return Err(AlignError::InvalidConfig(
                "similarity_max_edit_distance must be greater than zero".into(),
            ));
        }
        if self.anchor_block_size == 0 {
            return Err(AlignError::InvalidConfig(
                "anchor_block_size must be greater than zero".into(),
            ));
        }
        if self.max_semantic_pairs == 0 {
            return Err(AlignError::InvalidConfig(
                "max_semantic_pairs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            merge_threshold: Self::default_merge_threshold(),
            max_edit_distance: Self::default_max_edit_distance(),
            similarity_max_edit_distance: Self::default_similarity_max_edit_distance(),
            anchor_block_size: Self::default_anchor_block_size(),
            position_pair_floor: Self::default_position_pair_floor(),
            offload_token_threshold: Self::default_offload_token_threshold(),
            max_semantic_pairs: Self::default_max_semantic_pairs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Equal,
    Insert,
    Delete,
    Replace,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Equal => "equal",
            OpKind::Insert => "insert",
            OpKind::Delete => "delete",
            OpKind::Replace => "replace",
        }
    }
}

/// One step of the edit script transforming revision A into revision B.
///
/// `a_content` is empty for inserts and `b_content` is empty for deletes.
/// Equal operations carry both sides' tokens, which share keys but may differ
/// in surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffOperation {
    pub kind: OpKind,
    /// Index of the first A token covered (or the insertion point).
    pub position: usize,
    /// Index of the first B token covered (or the deletion point).
    pub b_position: usize,
    pub a_content: Vec<Token>,
    pub b_content: Vec<Token>,
    /// Similarity of a semantically matched `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl DiffOperation {
    pub fn equal(position: usize, b_position: usize, a: &[Token], b: &[Token]) -> Self {
        Self::build(OpKind::Equal, position, b_position, a, b)
    }

    pub fn delete(position: usize, b_position: usize, a: &[Token]) -> Self {
        Self::build(OpKind::Delete, position, b_position, a, &[])
    }

    pub fn insert(position: usize, b_position: usize, b: &[Token]) -> Self {
        Self::build(OpKind::Insert, position, b_position, &[], b)
    }

    pub fn replace(position: usize, b_position: usize, a: &[Token], b: &[Token]) -> Self {
        Self::build(OpKind::Replace, position, b_position, a, b)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    fn build(kind: OpKind, position: usize, b_position: usize, a: &[Token], b: &[Token]) -> Self {
        Self {
            kind,
            position,
            b_position,
            a_content: a.to_vec(),
            b_content: b.to_vec(),
            confidence: None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.kind != OpKind::Equal
    }

    pub fn a_text(&self) -> String {
        reconstruct(&self.a_content)
    }

    pub fn b_text(&self) -> String {
        reconstruct(&self.b_content)
    }

    pub fn a_weight(&self) -> usize {
        total_weight(&self.a_content)
    }

    pub fn b_weight(&self) -> usize {
        total_weight(&self.b_content)
    }
}

/// Recoverable conditions attached to a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonWarning {
    /// The embedding provider failed or timed out; output is syntactic.
    EmbeddingProviderUnavailable { message: String },
    /// Semantic alignment was requested below sentence granularity.
    SemanticGranularityUnsupported { granularity: Granularity },
    /// Too many unit pairs to score; output is syntactic.
    SemanticBudgetExceeded { pairs: usize, limit: usize },
}

/// Edit script plus any warnings raised while producing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    pub operations: Vec<DiffOperation>,
    pub warnings: Vec<ComparisonWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let opts = AlignOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.merge_threshold, 0.6);
        assert_eq!(opts.anchor_block_size, 8);
    }

    #[test]
    fn invalid_merge_threshold_rejected() {
        let opts = AlignOptions {
            merge_threshold: 1.5,
            ..AlignOptions::default()
        };
        match opts.validate().expect_err("options should be invalid") {
            AlignError::InvalidConfig(msg) => assert!(msg.contains("merge_threshold")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn options_fill_defaults_from_partial_yaml_shape() {
        let opts: AlignOptions = serde_json::from_str(r#"{"max_edit_distance": 10}"#).unwrap();
        assert_eq!(opts.max_edit_distance, 10);
        assert_eq!(opts.position_pair_floor, 0.3);
    }

    #[test]
    fn algorithm_parses_exact_names_only() {
        assert_eq!("hybrid".parse::<Algorithm>().unwrap(), Algorithm::Hybrid);
        assert!("Hybrid".parse::<Algorithm>().is_err());
        assert!("fuzzy".parse::<Algorithm>().is_err());
    }

    #[test]
    fn threshold_validation_and_bucket() {
        let mut cfg = ComparisonConfig::default();
        assert_eq!(cfg.threshold_bucket(), 70);
        cfg.similarity_threshold = 0.704;
        assert_eq!(cfg.threshold_bucket(), 70);
        cfg.similarity_threshold = 1.2;
        assert!(cfg.validate().is_err());
        cfg.similarity_threshold = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let warning = ComparisonWarning::SemanticGranularityUnsupported {
            granularity: Granularity::Word,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "semantic_granularity_unsupported");
        assert_eq!(json["granularity"], "word");
    }
}
