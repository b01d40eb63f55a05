//! Cost-bounded diffing: Myers with a block-hash anchoring fallback.
//!
//! When the edit distance of a region exceeds `max_edit_distance`, the
//! region is partitioned by anchors (tokens, or failing that k-gram blocks,
//! that occur exactly once on each side), the longest order-consistent chain
//! of anchors is aligned exactly, and the gaps between anchors are diffed
//! recursively. A region that shares no anchors becomes one delete run plus
//! one insert run when the sides are disjoint, and is rejected otherwise.

use std::hash::{Hash, Hasher};

use fxhash::{FxHashMap, FxHashSet, FxHasher};

use crate::myers::{self, push_run, Run};

/// Limits for one anchored diff.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiffLimits {
    pub max_edit_distance: usize,
    pub block_size: usize,
}

/// The region could not be aligned within the limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TooLarge {
    pub a_len: usize,
    pub b_len: usize,
}

/// Edit script between `a` and `b` as coalesced runs.
pub(crate) fn diff_ids(a: &[u32], b: &[u32], limits: DiffLimits) -> Result<Vec<Run>, TooLarge> {
    let mut out = Vec::new();
    diff_region(a, b, 0, 0, limits, &mut out)?;
    Ok(out)
}

fn diff_region(
    a: &[u32],
    b: &[u32],
    a_off: usize,
    b_off: usize,
    limits: DiffLimits,
    out: &mut Vec<Run>,
) -> Result<(), TooLarge> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    push_run(out, Run::equal(a_off, b_off, prefix));

    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];
    let (ma_off, mb_off) = (a_off + prefix, b_off + prefix);

    if mid_a.is_empty() || mid_b.is_empty() {
        push_run(out, Run::delete(ma_off..ma_off + mid_a.len(), mb_off));
        push_run(out, Run::insert(ma_off + mid_a.len(), mb_off..mb_off + mid_b.len()));
    } else if let Some(runs) = myers::diff(mid_a, mid_b, limits.max_edit_distance) {
        for run in runs {
            push_run(
                out,
                Run {
                    kind: run.kind,
                    a: run.a.start + ma_off..run.a.end + ma_off,
                    b: run.b.start + mb_off..run.b.end + mb_off,
                },
            );
        }
    } else {
        let mut anchors = unique_token_anchors(mid_a, mid_b);
        if anchors.is_empty() {
            anchors = block_anchors(mid_a, mid_b, limits.block_size);
        }
        tracing::debug!(
            a_tokens = mid_a.len(),
            b_tokens = mid_b.len(),
            anchors = anchors.len(),
            "anchor_fallback"
        );

        if anchors.is_empty() {
            if !is_disjoint(mid_a, mid_b) {
                return Err(TooLarge {
                    a_len: mid_a.len(),
                    b_len: mid_b.len(),
                });
            }
            push_run(out, Run::delete(ma_off..ma_off + mid_a.len(), mb_off));
            push_run(out, Run::insert(ma_off + mid_a.len(), mb_off..mb_off + mid_b.len()));
        } else {
            let (mut ai, mut bi) = (0, 0);
            for anchor in anchors {
                diff_region(
                    &mid_a[ai..anchor.a],
                    &mid_b[bi..anchor.b],
                    ma_off + ai,
                    mb_off + bi,
                    limits,
                    out,
                )?;
                push_run(out, Run::equal(ma_off + anchor.a, mb_off + anchor.b, anchor.len));
                ai = anchor.a + anchor.len;
                bi = anchor.b + anchor.len;
            }
            diff_region(&mid_a[ai..], &mid_b[bi..], ma_off + ai, mb_off + bi, limits, out)?;
        }
    }

    push_run(
        out,
        Run::equal(a_off + a.len() - suffix, b_off + b.len() - suffix, suffix),
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    a: usize,
    b: usize,
    len: usize,
}

/// Ids occurring exactly once in each sequence, chained by LIS.
fn unique_token_anchors(a: &[u32], b: &[u32]) -> Vec<Anchor> {
    #[derive(Default)]
    struct Seen {
        count_a: u32,
        pos_a: usize,
        count_b: u32,
        pos_b: usize,
    }

    let mut seen: FxHashMap<u32, Seen> = FxHashMap::default();
    for (pos, id) in a.iter().enumerate() {
        let entry = seen.entry(*id).or_default();
        entry.count_a += 1;
        entry.pos_a = pos;
    }
    for (pos, id) in b.iter().enumerate() {
        if let Some(entry) = seen.get_mut(id) {
            entry.count_b += 1;
            entry.pos_b = pos;
        }
    }

    let mut pairs: Vec<(usize, usize)> = seen
        .values()
        .filter(|s| s.count_a == 1 && s.count_b == 1)
        .map(|s| (s.pos_a, s.pos_b))
        .collect();
    pairs.sort_unstable();

    longest_increasing_chain(&pairs)
        .into_iter()
        .map(|(a, b)| Anchor { a, b, len: 1 })
        .collect()
}

/// Non-overlapping k-gram blocks occurring exactly once in each sequence.
fn block_anchors(a: &[u32], b: &[u32], k: usize) -> Vec<Anchor> {
    if k == 0 || a.len() < k || b.len() < k {
        return Vec::new();
    }

    let hash = |window: &[u32]| {
        let mut hasher = FxHasher::default();
        window.hash(&mut hasher);
        hasher.finish()
    };

    // (count in a, first position in a, count in b, first position in b)
    let mut blocks: FxHashMap<u64, (u32, usize, u32, usize)> = FxHashMap::default();
    for (pos, window) in a.windows(k).enumerate() {
        let entry = blocks.entry(hash(window)).or_insert((0, pos, 0, 0));
        entry.0 += 1;
    }
    for (pos, window) in b.windows(k).enumerate() {
        if let Some(entry) = blocks.get_mut(&hash(window)) {
            if entry.2 == 0 {
                entry.3 = pos;
            }
            entry.2 += 1;
        }
    }

    let mut pairs: Vec<(usize, usize)> = blocks
        .values()
        .filter(|(ca, pa, cb, pb)| {
            *ca == 1 && *cb == 1 && a[*pa..*pa + k] == b[*pb..*pb + k]
        })
        .map(|(_, pa, _, pb)| (*pa, *pb))
        .collect();
    pairs.sort_unstable();

    let mut anchors: Vec<Anchor> = Vec::new();
    for (pa, pb) in longest_increasing_chain(&pairs) {
        let clear = anchors
            .last()
            .is_none_or(|last| pa >= last.a + last.len && pb >= last.b + last.len);
        if clear {
            anchors.push(Anchor { a: pa, b: pb, len: k });
        }
    }
    anchors
}

/// Longest subsequence of `pairs` (sorted by `.0`) strictly increasing in `.1`.
fn longest_increasing_chain(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    // tails[l] = index into `pairs` of the smallest tail of a chain of length l + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; pairs.len()];

    for (i, &(_, b)) in pairs.iter().enumerate() {
        let slot = tails.partition_point(|&t| pairs[t].1 < b);
        if slot > 0 {
            prev[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut chain = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        chain.push(pairs[i]);
        cursor = prev[i];
    }
    chain.reverse();
    chain
}

fn is_disjoint(a: &[u32], b: &[u32]) -> bool {
    let left: FxHashSet<u32> = a.iter().copied().collect();
    !b.iter().any(|id| left.contains(id))
}

/// LCS length under a cost bound, degrading to multiset overlap when even
/// anchoring cannot align the sequences.
pub(crate) fn bounded_lcs<W>(a: &[u32], b: &[u32], limits: DiffLimits, weight_a: W) -> usize
where
    W: Fn(usize) -> usize,
{
    match diff_ids(a, b, limits) {
        Ok(runs) => runs
            .iter()
            .filter(|r| r.kind == myers::RunKind::Equal)
            .flat_map(|r| r.a.clone())
            .map(&weight_a)
            .sum(),
        Err(_) => {
            let mut available: FxHashMap<u32, usize> = FxHashMap::default();
            for id in b {
                *available.entry(*id).or_default() += 1;
            }
            a.iter()
                .enumerate()
                .filter(|(_, id)| match available.get_mut(id) {
                    Some(n) if *n > 0 => {
                        *n -= 1;
                        true
                    }
                    _ => false,
                })
                .map(|(i, _)| weight_a(i))
                .sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::myers::RunKind;

    fn limits(max_edit_distance: usize) -> DiffLimits {
        DiffLimits {
            max_edit_distance,
            block_size: 3,
        }
    }

    fn rebuild(a: &[u32], b: &[u32], runs: &[Run]) -> (Vec<u32>, Vec<u32>) {
        let mut ra = Vec::new();
        let mut rb = Vec::new();
        let (mut next_a, mut next_b) = (0, 0);
        for run in runs {
            assert_eq!(run.a.start, next_a);
            assert_eq!(run.b.start, next_b);
            next_a = run.a.end;
            next_b = run.b.end;
            if run.kind == RunKind::Equal {
                assert_eq!(a[run.a.clone()], b[run.b.clone()]);
            }
            ra.extend_from_slice(&a[run.a.clone()]);
            rb.extend_from_slice(&b[run.b.clone()]);
        }
        (ra, rb)
    }

    #[test]
    fn lis_picks_longest_chain() {
        let pairs = [(0, 3), (1, 0), (2, 1), (3, 5), (4, 2)];
        assert_eq!(longest_increasing_chain(&pairs), vec![(1, 0), (2, 1), (4, 2)]);
        assert!(longest_increasing_chain(&[]).is_empty());
    }

    #[test]
    fn unique_anchors_split_large_regions() {
        // Every token differs except the unique middle marker 100.
        let mut a: Vec<u32> = (0..20).collect();
        a.push(100);
        a.extend(20..40);
        let mut b: Vec<u32> = (200..220).collect();
        b.push(100);
        b.extend(220..240);

        let runs = diff_ids(&a, &b, limits(4)).unwrap();
        assert_eq!(rebuild(&a, &b, &runs), (a.clone(), b.clone()));
        assert!(runs
            .iter()
            .any(|r| r.kind == RunKind::Equal && r.a == (20..21) && r.b == (20..21)));
    }

    #[test]
    fn block_anchors_used_when_no_unique_tokens() {
        // Two repeated symbols only; one shared distinctive 3-gram [1,1,2].
        let a = vec![1, 2, 2, 1, 1, 2, 2, 2, 1];
        let b = vec![2, 1, 1, 2, 1, 1, 1];
        let runs = diff_ids(&a, &b, limits(1)).unwrap();
        assert_eq!(rebuild(&a, &b, &runs), (a.clone(), b.clone()));
    }

    #[test]
    fn disjoint_regions_become_delete_then_insert() {
        let a = vec![1, 2, 3, 4, 5];
        let b = vec![6, 7, 8];
        let runs = diff_ids(&a, &b, limits(1)).unwrap();
        assert_eq!(runs, vec![Run::delete(0..5, 0), Run::insert(5, 0..3)]);
    }

    #[test]
    fn unanchorable_overlap_is_too_large() {
        let a = vec![1, 2, 1, 2, 1, 2];
        let b = vec![2, 2, 1, 1, 2, 2, 1];
        let err = diff_ids(&a, &b, limits(1)).unwrap_err();
        assert_eq!(err.a_len + err.b_len, a.len() + b.len());
    }

    #[test]
    fn bounded_lcs_falls_back_to_overlap() {
        let a = vec![1, 2, 1, 2, 1, 2];
        let b = vec![2, 2, 1, 1, 2, 2, 1];
        assert_eq!(bounded_lcs(&a, &b, limits(1), |_| 1), 6);
        assert_eq!(bounded_lcs(&a, &b, limits(100), |_| 1), 4);
    }
}
