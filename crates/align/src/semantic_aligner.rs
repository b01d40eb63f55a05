//! Meaning-based alignment of sentence and paragraph units.
//!
//! Every unit of both revisions is embedded in one provider call. Pairs at or
//! above the similarity threshold are then matched greedily, highest
//! similarity first, skipping any pair that would cross an already accepted
//! match so the edit script stays order-preserving. Units left over between
//! matches are optionally paired by position, and whatever remains becomes
//! delete and insert blocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use segment::Token;
use semantic::{embed_with_timeout, SparseVector};

use crate::error::AlignError;
use crate::types::{AlignOptions, ComparisonWarning, DiffOperation};
use crate::SemanticContext;

/// An accepted pairing of A unit `a` with B unit `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UnitMatch {
    pub a: usize,
    pub b: usize,
    pub similarity: f64,
}

/// Why semantic alignment did not produce an edit script.
#[derive(Debug)]
pub(crate) enum Fallback {
    /// Recoverable; the caller should use syntactic output and attach this.
    Degrade(ComparisonWarning),
    Fail(AlignError),
}

/// Embedded units of one revision pair.
pub(crate) struct UnitVectors {
    pub a: Vec<SparseVector>,
    pub b: Vec<SparseVector>,
}

impl UnitVectors {
    /// Identical keys always score 1.0, whatever the provider returns.
    pub fn similarity(&self, a: &[Token], b: &[Token], i: usize, j: usize) -> f64 {
        if a[i].key() == b[j].key() {
            1.0
        } else {
            self.a[i].cosine(&self.b[j])
        }
    }
}

/// Keys of `units`, in iteration order, ready for [`embed_keys`].
pub(crate) fn unit_keys<'t>(units: impl IntoIterator<Item = &'t Token>) -> Vec<String> {
    units.into_iter().map(|t| t.key().to_string()).collect()
}

/// Embed `texts` in one provider call. Vectors come back normalized and in
/// sparse form.
pub(crate) async fn embed_keys(
    texts: Vec<String>,
    ctx: &SemanticContext<'_>,
) -> Result<Vec<SparseVector>, ComparisonWarning> {
    let vectors = embed_with_timeout(ctx.embedder, &texts, ctx.timeout)
        .await
        .map_err(|err| {
            tracing::warn!(
                provider = ctx.embedder.name(),
                error = %err,
                units = texts.len(),
                "embedding_unavailable"
            );
            ComparisonWarning::EmbeddingProviderUnavailable {
                message: err.to_string(),
            }
        })?;
    Ok(vectors.iter().map(|v| SparseVector::from_dense(v)).collect())
}

/// Greedy, order-consistent matching of units scoring `>= threshold`.
///
/// Candidates are visited by similarity (descending), then by distance
/// between positions, then by A position, which makes repeated identical
/// units pair in document order. Returned matches are sorted by A position
/// and strictly increasing in B position.
pub(crate) fn match_units(
    a: &[Token],
    b: &[Token],
    vectors: &UnitVectors,
    threshold: f64,
) -> Vec<UnitMatch> {
    let mut candidates: Vec<UnitMatch> = Vec::new();
    for i in 0..a.len() {
        for j in 0..b.len() {
            let similarity = vectors.similarity(a, b, i, j);
            if similarity >= threshold {
                candidates.push(UnitMatch { a: i, b: j, similarity });
            }
        }
    }
    candidates.sort_by(|x, y| {
        y.similarity
            .total_cmp(&x.similarity)
            .then_with(|| x.a.abs_diff(x.b).cmp(&y.a.abs_diff(y.b)))
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });

    let mut kept: BTreeMap<usize, UnitMatch> = BTreeMap::new();
    let mut b_taken = vec![false; b.len()];
    for candidate in candidates {
        if kept.contains_key(&candidate.a) || b_taken[candidate.b] {
            continue;
        }
        let before_ok = kept
            .range(..candidate.a)
            .next_back()
            .is_none_or(|(_, m)| m.b < candidate.b);
        let after_ok = kept
            .range(candidate.a + 1..)
            .next()
            .is_none_or(|(_, m)| m.b > candidate.b);
        if before_ok && after_ok {
            b_taken[candidate.b] = true;
            kept.insert(candidate.a, candidate);
        }
    }
    kept.into_values().collect()
}

/// Offsets and pairing policy for [`assemble`].
pub(crate) struct AssemblePlan {
    /// Added to every A position (non-zero when aligning a sub-range).
    pub a_base: usize,
    pub b_base: usize,
    /// Position-pair leftover units scoring at least this much.
    pub pair_floor: Option<f64>,
}

/// Build the edit script for `a` and `b` from order-consistent `matches`.
pub(crate) fn assemble(
    a: &[Token],
    b: &[Token],
    vectors: &UnitVectors,
    matches: &[UnitMatch],
    plan: &AssemblePlan,
) -> Vec<DiffOperation> {
    let mut out = Vec::new();
    let (mut ai, mut bi) = (0, 0);
    for m in matches {
        fill_gap(a, b, vectors, ai..m.a, bi..m.b, plan, &mut out);
        emit_pair(a, b, m.a, m.b, m.similarity, plan, &mut out);
        ai = m.a + 1;
        bi = m.b + 1;
    }
    fill_gap(a, b, vectors, ai..a.len(), bi..b.len(), plan, &mut out);
    out
}

fn fill_gap(
    a: &[Token],
    b: &[Token],
    vectors: &UnitVectors,
    a_range: std::ops::Range<usize>,
    b_range: std::ops::Range<usize>,
    plan: &AssemblePlan,
    out: &mut Vec<DiffOperation>,
) {
    let (mut del_from, mut ins_from) = (a_range.start, b_range.start);
    if let Some(floor) = plan.pair_floor {
        for (i, j) in a_range.clone().zip(b_range.clone()) {
            let similarity = vectors.similarity(a, b, i, j);
            if similarity >= floor {
                flush(a, b, del_from..i, ins_from..j, plan, out);
                emit_pair(a, b, i, j, similarity, plan, out);
                del_from = i + 1;
                ins_from = j + 1;
            }
        }
    }
    flush(a, b, del_from..a_range.end, ins_from..b_range.end, plan, out);
}

fn emit_pair(
    a: &[Token],
    b: &[Token],
    i: usize,
    j: usize,
    similarity: f64,
    plan: &AssemblePlan,
    out: &mut Vec<DiffOperation>,
) {
    let (position, b_position) = (plan.a_base + i, plan.b_base + j);
    let (left, right) = (&a[i..=i], &b[j..=j]);
    if a[i].key() == b[j].key() {
        out.push(DiffOperation::equal(position, b_position, left, right));
    } else {
        out.push(DiffOperation::replace(position, b_position, left, right).with_confidence(similarity));
    }
}

fn flush(
    a: &[Token],
    b: &[Token],
    dels: std::ops::Range<usize>,
    ins: std::ops::Range<usize>,
    plan: &AssemblePlan,
    out: &mut Vec<DiffOperation>,
) {
    if !dels.is_empty() {
        out.push(DiffOperation::delete(
            plan.a_base + dels.start,
            plan.b_base + ins.start,
            &a[dels.clone()],
        ));
    }
    if !ins.is_empty() {
        out.push(DiffOperation::insert(
            plan.a_base + dels.end,
            plan.b_base + ins.start,
            &b[ins],
        ));
    }
}

/// Full semantic alignment of two unit sequences.
pub(crate) async fn align_semantic(
    a: Arc<[Token]>,
    b: Arc<[Token]>,
    threshold: f64,
    opts: &AlignOptions,
    ctx: &SemanticContext<'_>,
) -> Result<Vec<DiffOperation>, Fallback> {
    let pairs = a.len().saturating_mul(b.len());
    if pairs > opts.max_semantic_pairs {
        tracing::warn!(pairs, limit = opts.max_semantic_pairs, "semantic_budget_exceeded");
        return Err(Fallback::Degrade(ComparisonWarning::SemanticBudgetExceeded {
            pairs,
            limit: opts.max_semantic_pairs,
        }));
    }

    let vectors = if a.is_empty() || b.is_empty() {
        UnitVectors {
            a: Vec::new(),
            b: Vec::new(),
        }
    } else {
        let mut all = embed_keys(unit_keys(a.iter().chain(b.iter())), ctx)
            .await
            .map_err(Fallback::Degrade)?;
        let b_vecs = all.split_off(a.len());
        UnitVectors { a: all, b: b_vecs }
    };

    let plan = AssemblePlan {
        a_base: 0,
        b_base: 0,
        pair_floor: Some(opts.position_pair_floor),
    };
    let weight = a.len() + b.len();
    crate::strategy::run_cpu(weight, opts.offload_token_threshold, move || {
        let matches = match_units(&a, &b, &vectors, threshold);
        assemble(&a, &b, &vectors, &matches, &plan)
    })
    .await
    .map_err(Fallback::Fail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OpKind;
    use segment::{segment, Granularity};

    fn units(text: &str) -> Vec<Token> {
        segment(text, Granularity::Sentence)
    }

    /// One-hot vectors from explicit topic ids, so tests control similarity.
    fn vectors(a_topics: &[usize], b_topics: &[usize]) -> UnitVectors {
        let one_hot = |topic: usize| {
            let mut dense = vec![0f32; 8];
            dense[topic] = 1.0;
            SparseVector::from_dense(&dense)
        };
        UnitVectors {
            a: a_topics.iter().map(|t| one_hot(*t)).collect(),
            b: b_topics.iter().map(|t| one_hot(*t)).collect(),
        }
    }

    #[test]
    fn matches_are_order_consistent() {
        let a = units("One here. Two here. Three here.");
        let b = units("Three there. One there. Two there.");
        let v = vectors(&[1, 2, 3], &[3, 1, 2]);
        let matches = match_units(&a, &b, &v, 0.5);
        let pairs: Vec<(usize, usize)> = matches.iter().map(|m| (m.a, m.b)).collect();
        // (2, 0) crosses the other two matches and is demoted.
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn repeated_identical_units_pair_in_order() {
        let a = units("Yes. Yes.");
        let b = units("Yes. Yes.");
        let v = vectors(&[0, 0], &[0, 0]);
        let matches = match_units(&a, &b, &v, 0.9);
        let pairs: Vec<(usize, usize)> = matches.iter().map(|m| (m.a, m.b)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn assemble_pairs_leftovers_by_position_above_floor() {
        let a = units("Alpha one. Beta two. Gamma three.");
        let b = units("Alpha uno. Delta dos. Gamma tres.");
        let v = vectors(&[1, 2, 3], &[1, 5, 3]);
        let matches = match_units(&a, &b, &v, 0.9);
        assert_eq!(matches.len(), 2);

        let plan = AssemblePlan {
            a_base: 0,
            b_base: 0,
            pair_floor: Some(0.3),
        };
        let ops = assemble(&a, &b, &v, &matches, &plan);
        let kinds: Vec<OpKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![OpKind::Replace, OpKind::Delete, OpKind::Insert, OpKind::Replace]
        );
        assert_eq!(ops[0].confidence, Some(1.0));
        assert_eq!(ops[1].position, 1);
        assert_eq!(ops[2].position, 2);
        assert_eq!(ops[2].b_position, 1);
    }

    #[test]
    fn floor_pairs_weakly_similar_units() {
        let a = units("Alpha one.");
        let b = units("Alpha uno.");
        let mut dense_a = vec![0f32; 4];
        dense_a[0] = 1.0;
        let mut dense_b = vec![0f32; 4];
        dense_b[0] = 0.5;
        dense_b[1] = 1.0;
        let v = UnitVectors {
            a: vec![SparseVector::from_dense(&dense_a)],
            b: vec![SparseVector::from_dense(&dense_b)],
        };
        let plan = AssemblePlan {
            a_base: 4,
            b_base: 7,
            pair_floor: Some(0.3),
        };
        let ops = assemble(&a, &b, &v, &[], &plan);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::Replace);
        assert_eq!((ops[0].position, ops[0].b_position), (4, 7));
        let confidence = ops[0].confidence.unwrap();
        assert!((confidence - 0.5 / 1.25f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn identical_keys_are_equal_without_pairing() {
        let a = units("Same text.");
        let b = units("Same text.  ");
        let v = vectors(&[1], &[2]);
        let matches = match_units(&a, &b, &v, 0.99);
        let plan = AssemblePlan {
            a_base: 0,
            b_base: 0,
            pair_floor: None,
        };
        let ops = assemble(&a, &b, &v, &matches, &plan);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::Equal);
        assert_eq!(ops[0].confidence, None);
    }
}
