use segment::Token;

use crate::error::AlignError;
use crate::semantic_aligner::{
    assemble, embed_keys, match_units, unit_keys, AssemblePlan, UnitVectors,
};
use crate::strategy::run_cpu;
use crate::types::{AlignOptions, ComparisonWarning, DiffOperation, OpKind};
use crate::SemanticContext;

/// Re-evaluate the unmerged change blocks of a syntactic edit script.
///
/// Only delete+insert pairs are candidates: the syntactic aligner emits them
/// when the block's edit similarity fell below the merge threshold. Their
/// units are embedded in a single provider call; units scoring at least
/// `threshold` become semantic `replace` operations, everything else keeps
/// its syntactic form. Syntactic `replace` operations are never touched.
///
/// Embedding failures leave `baseline` unchanged and return a warning.
pub(crate) async fn blend(
    baseline: Vec<DiffOperation>,
    threshold: f64,
    opts: &AlignOptions,
    ctx: &SemanticContext<'_>,
) -> Result<(Vec<DiffOperation>, Option<ComparisonWarning>), AlignError> {
    let gaps: Vec<usize> = baseline
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].kind == OpKind::Delete && pair[1].kind == OpKind::Insert)
        .map(|(idx, _)| idx)
        .collect();
    if gaps.is_empty() {
        return Ok((baseline, None));
    }

    let pairs = gaps
        .iter()
        .map(|&g| baseline[g].a_content.len().saturating_mul(baseline[g + 1].b_content.len()))
        .fold(0usize, usize::saturating_add);
    if pairs > opts.max_semantic_pairs {
        tracing::warn!(pairs, limit = opts.max_semantic_pairs, "semantic_budget_exceeded");
        let warning = ComparisonWarning::SemanticBudgetExceeded {
            pairs,
            limit: opts.max_semantic_pairs,
        };
        return Ok((baseline, Some(warning)));
    }

    let texts = unit_keys(
        gaps.iter()
            .flat_map(|&g| baseline[g].a_content.iter().chain(&baseline[g + 1].b_content)),
    );
    let embedded = embed_keys(texts, ctx).await;
    let vectors = match embedded {
        Ok(vectors) => vectors,
        Err(warning) => return Ok((baseline, Some(warning))),
    };

    let weight = gaps
        .iter()
        .map(|&g| baseline[g].a_content.len() + baseline[g + 1].b_content.len())
        .sum();
    let ops = run_cpu(weight, opts.offload_token_threshold, move || {
        reclassify_gaps(baseline, &gaps, vectors, threshold)
    })
    .await?;
    Ok((ops, None))
}

fn reclassify_gaps(
    baseline: Vec<DiffOperation>,
    gaps: &[usize],
    vectors: Vec<semantic::SparseVector>,
    threshold: f64,
) -> Vec<DiffOperation> {
    let mut vectors = vectors.into_iter();
    let mut next_gap = gaps.iter().copied().peekable();
    let mut out = Vec::with_capacity(baseline.len());
    let mut ops = baseline.into_iter().enumerate();

    while let Some((idx, op)) = ops.next() {
        if next_gap.peek() != Some(&idx) {
            out.push(op);
            continue;
        }
        next_gap.next();
        let Some((_, insert)) = ops.next() else {
            out.push(op);
            break;
        };

        let unit_vectors = UnitVectors {
            a: vectors.by_ref().take(op.a_content.len()).collect(),
            b: vectors.by_ref().take(insert.b_content.len()).collect(),
        };
        let deleted: &[Token] = &op.a_content;
        let inserted: &[Token] = &insert.b_content;
        let matches = match_units(deleted, inserted, &unit_vectors, threshold);
        if matches.is_empty() {
            out.push(op);
            out.push(insert);
            continue;
        }

        let plan = AssemblePlan {
            a_base: op.position,
            b_base: insert.b_position,
            pair_floor: None,
        };
        out.extend(assemble(deleted, inserted, &unit_vectors, &matches, &plan));
    }
    out
}
