use async_trait::async_trait;
use fxhash::FxHashMap;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, Embedder};

/// Deterministic in-process embedder: L2-normalized term-frequency vectors
/// over the vocabulary of the batch being embedded.
///
/// Terms are lowercase alphanumeric runs. Dimensions are assigned in
/// first-seen order across the whole batch, so vectors are only comparable
/// with other vectors from the same `embed` call. That is exactly how the
/// semantic aligner uses them: every unit of both revisions goes out in one
/// batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalEmbedder;

impl LexicalEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`Embedder::embed`].
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        let mut vocabulary: FxHashMap<String, usize> = FxHashMap::default();
        let docs: Vec<Vec<usize>> = texts
            .iter()
            .map(|text| {
                terms(text.as_ref())
                    .map(|term| {
                        let next = vocabulary.len();
                        *vocabulary.entry(term).or_insert(next)
                    })
                    .collect()
            })
            .collect();

        let dim = vocabulary.len();
        docs.into_iter()
            .map(|term_ids| {
                let mut vector = vec![0f32; dim];
                for id in term_ids {
                    vector[id] += 1.0;
                }
                l2_normalize_in_place(&mut vector);
                vector
            })
            .collect()
    }
}

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for LexicalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(self.embed_batch(texts))
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
