use segment::{reconstruct, segment, total_weight, Granularity, KeyInterner, Token};

use crate::anchor::{bounded_lcs, DiffLimits};
use crate::types::AlignOptions;

/// Weighted Dice coefficient: `2·matched / (total_a + total_b)`, with two
/// empty sides counting as identical.
pub fn dice(matched: usize, total_a: usize, total_b: usize) -> f64 {
    if total_a + total_b == 0 {
        return 1.0;
    }
    (2.0 * matched as f64 / (total_a + total_b) as f64).clamp(0.0, 1.0)
}

/// Character-weighted word-level similarity between two spans.
///
/// Both spans are re-tokenized into words regardless of the granularity they
/// were aligned at, and the longest common word subsequence is scored with
/// [`dice`] over key character counts. Comparison is case-sensitive. Beyond
/// [`AlignOptions::similarity_max_edit_distance`] the subsequence degrades to
/// multiset overlap.
pub fn edit_similarity(a: &[Token], b: &[Token], opts: &AlignOptions) -> f64 {
    let a_text = reconstruct(a);
    let b_text = reconstruct(b);
    let a_words = segment(&a_text, Granularity::Word);
    let b_words = segment(&b_text, Granularity::Word);

    let mut interner = KeyInterner::new();
    let a_ids = interner.intern_tokens(&a_words);
    let b_ids = interner.intern_tokens(&b_words);

    let limits = DiffLimits {
        max_edit_distance: opts.similarity_max_edit_distance,
        block_size: opts.anchor_block_size,
    };
    let matched = bounded_lcs(&a_ids, &b_ids, limits, |i| a_words[i].weight());
    dice(matched, total_weight(&a_words), total_weight(&b_words))
}
