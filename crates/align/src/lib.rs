//! # Revision alignment (`align`)
//!
//! Turns two token sequences produced by [`segment`] into an edit script and
//! scores it.
//!
//! ## Strategies
//!
//! [`align`] dispatches on [`Algorithm`]:
//!
//! - `syntactic`: Myers shortest edit script over token keys, O((N+M)·D). When
//!   the edit distance of a region exceeds [`AlignOptions::max_edit_distance`]
//!   the region is split at unique-token (or k-gram block) anchors and the gaps
//!   are diffed recursively. Adjacent delete+insert blocks merge into a
//!   `replace` when their [`edit_similarity`] reaches
//!   [`AlignOptions::merge_threshold`].
//! - `semantic`: sentence/paragraph units are embedded in one call and matched
//!   greedily by cosine similarity, never crossing earlier matches. Leftovers
//!   are paired by position above [`AlignOptions::position_pair_floor`].
//! - `hybrid`: syntactic first; only its unmerged delete+insert blocks are
//!   re-scored semantically.
//!
//! Every strategy preserves the round-trip invariant: concatenating
//! `a_content` over equal/delete/replace operations rebuilds revision A, and
//! `b_content` over equal/insert/replace rebuilds revision B.
//!
//! ## Scoring
//!
//! [`aggregate`] computes [`ComparisonMetrics`], [`classify`] maps them onto
//! [`SIGNIFICANCE_TABLE`], [`group_changes`] extracts the largest additions
//! and removals, and [`DiffStatistics`] counts operations and volumes.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use revdiff_align::{align, AlignOptions, Algorithm, ComparisonConfig, OpKind, SemanticContext};
//! use segment::{segment, Granularity};
//! use semantic::LexicalEmbedder;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let alignment = rt.block_on(async {
//!     let a = Arc::from(segment("The cat sat on the mat.", Granularity::Sentence));
//!     let b = Arc::from(segment("A cat was sitting on the mat.", Granularity::Sentence));
//!     let config = ComparisonConfig::new(Granularity::Sentence, Algorithm::Hybrid, 0.6);
//!     let ctx = SemanticContext { embedder: &LexicalEmbedder, timeout: Duration::from_secs(1) };
//!     align(a, b, &config, &AlignOptions::default(), ctx).await.unwrap()
//! });
//! assert_eq!(alignment.operations.len(), 1);
//! assert_eq!(alignment.operations[0].kind, OpKind::Replace);
//! ```

mod anchor;
mod error;
mod grouper;
mod hybrid;
mod metrics;
mod myers;
mod semantic_aligner;
mod significance;
mod similarity;
mod stats;
mod strategy;
mod syntactic;
mod types;

pub use crate::error::AlignError;
pub use crate::grouper::{group_changes, ChangeSummary, RiskLevel, DEFAULT_TOP_K};
pub use crate::metrics::{
    aggregate, structural_similarity, text_similarity, ComparisonMetrics, MetricWeights,
};
pub use crate::significance::{classify, Significance, SignificanceRule, SIGNIFICANCE_TABLE};
pub use crate::similarity::{dice, edit_similarity};
pub use crate::stats::DiffStatistics;
pub use crate::strategy::{align, SemanticContext};
pub use crate::syntactic::align_syntactic;
pub use crate::types::{
    Algorithm, AlignOptions, Alignment, ComparisonConfig, ComparisonWarning, DiffOperation, OpKind,
};
