//! Myers O((N+M)·D) shortest edit script over interned token ids.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunKind {
    Equal,
    Delete,
    Insert,
}

/// A maximal run of one edit kind. Ranges index the A and B id slices; the
/// range on the untouched side is empty and marks the run's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Run {
    pub kind: RunKind,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

impl Run {
    pub fn equal(a: usize, b: usize, len: usize) -> Self {
        Self {
            kind: RunKind::Equal,
            a: a..a + len,
            b: b..b + len,
        }
    }

    pub fn delete(a: Range<usize>, b: usize) -> Self {
        Self {
            kind: RunKind::Delete,
            a,
            b: b..b,
        }
    }

    pub fn insert(a: usize, b: Range<usize>) -> Self {
        Self {
            kind: RunKind::Insert,
            a: a..a,
            b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }
}

/// Append `run` to `out`, merging it into the previous run of the same kind.
pub(crate) fn push_run(out: &mut Vec<Run>, run: Run) {
    if run.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.kind == run.kind && last.a.end == run.a.start && last.b.end == run.b.start {
            last.a.end = run.a.end;
            last.b.end = run.b.end;
            return;
        }
    }
    out.push(run);
}

/// Shortest edit script from `a` to `b`, or `None` when the edit distance
/// exceeds `max_d`.
///
/// The trace keeps one frontier snapshot per `d`, each only `2d + 3` wide,
/// so memory grows with `D²` rather than `N·M`.
pub(crate) fn diff(a: &[u32], b: &[u32], max_d: usize) -> Option<Vec<Run>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let limit = max_d.min(a.len() + b.len()) as isize;
    let offset = limit + 1;
    let mut v = vec![0isize; (2 * limit + 3) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=limit {
        trace.push(v[(offset - d - 1) as usize..=(offset + d + 1) as usize].to_vec());
        let mut k = -d;
        while k <= d {
            let idx = (offset + k) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                return Some(backtrack(&trace, n, m));
            }
            k += 2;
        }
    }
    None
}

fn backtrack(trace: &[Vec<isize>], n: isize, m: isize) -> Vec<Run> {
    let mut x = n;
    let mut y = m;
    let mut reversed: Vec<Run> = Vec::new();

    for (d, frontier) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| frontier[(k + d + 1) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        let snake = (x - prev_x).min(y - prev_y).max(0);
        if snake > 0 {
            reversed.push(Run::equal(
                (x - snake) as usize,
                (y - snake) as usize,
                snake as usize,
            ));
        }
        x -= snake;
        y -= snake;

        if d > 0 {
            if x == prev_x {
                reversed.push(Run::insert(x as usize, (y - 1) as usize..y as usize));
            } else {
                reversed.push(Run::delete((x - 1) as usize..x as usize, y as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    let mut runs = Vec::with_capacity(reversed.len());
    for run in reversed.into_iter().rev() {
        push_run(&mut runs, run);
    }
    runs
}

/// Number of matched ids in the edit script.
pub(crate) fn matched_len(runs: &[Run]) -> usize {
    runs.iter()
        .filter(|r| r.kind == RunKind::Equal)
        .map(|r| r.a.len())
        .sum()
}
