use segment::{KeyInterner, Token};

use crate::anchor::{diff_ids, DiffLimits};
use crate::error::AlignError;
use crate::myers::RunKind;
use crate::similarity::edit_similarity;
use crate::types::{AlignOptions, DiffOperation};

/// Minimal edit script between `a` and `b` by token key.
///
/// Consecutive delete/insert runs form one change block. A block with content
/// on both sides becomes a `replace` when its [`edit_similarity`] reaches
/// `opts.merge_threshold`; otherwise it is emitted as a delete followed by an
/// insert.
pub fn align_syntactic(
    a: &[Token],
    b: &[Token],
    opts: &AlignOptions,
) -> Result<Vec<DiffOperation>, AlignError> {
    let mut interner = KeyInterner::new();
    let a_ids = interner.intern_tokens(a);
    let b_ids = interner.intern_tokens(b);

    let limits = DiffLimits {
        max_edit_distance: opts.max_edit_distance,
        block_size: opts.anchor_block_size,
    };
    let runs = diff_ids(&a_ids, &b_ids, limits).map_err(|too_large| {
        tracing::warn!(
            a_tokens = a.len(),
            b_tokens = b.len(),
            region_a = too_large.a_len,
            region_b = too_large.b_len,
            "diff_too_large"
        );
        AlignError::DiffTooLarge {
            a_tokens: a.len(),
            b_tokens: b.len(),
            limit: opts.max_edit_distance,
        }
    })?;

    let mut ops = Vec::with_capacity(runs.len());
    let mut pending: Option<(usize, usize, usize, usize)> = None;

    for run in runs {
        if run.kind == RunKind::Equal {
            if let Some(block) = pending.take() {
                emit_change(a, b, block, opts, &mut ops);
            }
            ops.push(DiffOperation::equal(
                run.a.start,
                run.b.start,
                &a[run.a.clone()],
                &b[run.b.clone()],
            ));
        } else {
            let block = pending.get_or_insert((run.a.start, run.a.start, run.b.start, run.b.start));
            block.1 = run.a.end;
            block.3 = run.b.end;
        }
    }
    if let Some(block) = pending.take() {
        emit_change(a, b, block, opts, &mut ops);
    }
    Ok(ops)
}

fn emit_change(
    a: &[Token],
    b: &[Token],
    (a_start, a_end, b_start, b_end): (usize, usize, usize, usize),
    opts: &AlignOptions,
    ops: &mut Vec<DiffOperation>,
) {
    let deleted = &a[a_start..a_end];
    let inserted = &b[b_start..b_end];

    if !deleted.is_empty()
        && !inserted.is_empty()
        && edit_similarity(deleted, inserted, opts) >= opts.merge_threshold
    {
        ops.push(DiffOperation::replace(a_start, b_start, deleted, inserted));
        return;
    }
    if !deleted.is_empty() {
        ops.push(DiffOperation::delete(a_start, b_start, deleted));
    }
    if !inserted.is_empty() {
        ops.push(DiffOperation::insert(a_end, b_start, inserted));
    }
}
