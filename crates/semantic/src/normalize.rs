//! Vector helpers shared by every embedder and by the semantic aligner.

/// In-place L2 normalization. Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cosine similarity of two dense vectors, clamped to `[0, 1]`.
///
/// Mismatched dimensions, zero vectors and non-finite inputs all score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cosine.is_finite() {
        cosine.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Unit-length vector keeping only non-zero components.
///
/// Pairwise similarity over many units is dominated by dot products; lexical
/// vectors are mostly zeros, so the sparse form keeps that cost proportional to
/// the number of shared terms.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    pub fn from_dense(dense: &[f32]) -> Self {
        let mut values = dense.to_vec();
        if values.iter().any(|x| !x.is_finite()) {
            values.iter_mut().for_each(|x| *x = 0.0);
        }
        l2_normalize_in_place(&mut values);
        let entries = values
            .into_iter()
            .enumerate()
            .filter(|(_, x)| *x != 0.0)
            .map(|(idx, x)| (idx as u32, x))
            .collect();
        Self {
            dim: dense.len(),
            entries,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cosine similarity in `[0, 1]`; vectors of different dimension score 0.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        if self.dim != other.dim {
            return 0.0;
        }
        let (mut i, mut j) = (0, 0);
        let mut dot = 0f64;
        while i < self.entries.len() && j < other.entries.len() {
            let (ia, va) = self.entries[i];
            let (ib, vb) = other.entries[j];
            match ia.cmp(&ib) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += f64::from(va) * f64::from(vb);
                    i += 1;
                    j += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}
