use std::sync::Arc;
use std::time::Duration;

use segment::Token;
use semantic::Embedder;

use crate::error::AlignError;
use crate::hybrid::blend;
use crate::semantic_aligner::{align_semantic, Fallback};
use crate::syntactic::align_syntactic;
use crate::types::{AlignOptions, Algorithm, Alignment, ComparisonConfig, ComparisonWarning};

/// Embedding capability handed to the semantic and hybrid strategies.
#[derive(Clone, Copy)]
pub struct SemanticContext<'a> {
    pub embedder: &'a dyn Embedder,
    /// Deadline for each embedding call.
    pub timeout: Duration,
}

/// Align two token sequences with the strategy selected by `config.algorithm`.
///
/// Semantic work only happens at sentence and paragraph granularity. Below
/// that, `semantic` degrades to syntactic with a
/// [`ComparisonWarning::SemanticGranularityUnsupported`] and `hybrid` is plain
/// syntactic. Embedding failures never fail the call; they surface as
/// warnings on a syntactic result.
pub async fn align(
    a: Arc<[Token]>,
    b: Arc<[Token]>,
    config: &ComparisonConfig,
    opts: &AlignOptions,
    ctx: SemanticContext<'_>,
) -> Result<Alignment, AlignError> {
    config.validate()?;
    opts.validate()?;

    let semantic_ok = config.granularity.supports_semantic();
    match config.algorithm {
        Algorithm::Syntactic => syntactic_only(a, b, opts, Vec::new()).await,
        Algorithm::Hybrid if !semantic_ok => syntactic_only(a, b, opts, Vec::new()).await,
        Algorithm::Semantic if !semantic_ok => {
            let warning = ComparisonWarning::SemanticGranularityUnsupported {
                granularity: config.granularity,
            };
            syntactic_only(a, b, opts, vec![warning]).await
        }
        Algorithm::Semantic => {
            match align_semantic(a.clone(), b.clone(), config.similarity_threshold, opts, &ctx).await {
                Ok(operations) => Ok(Alignment {
                    operations,
                    warnings: Vec::new(),
                }),
                Err(Fallback::Degrade(warning)) => syntactic_only(a, b, opts, vec![warning]).await,
                Err(Fallback::Fail(err)) => Err(err),
            }
        }
        Algorithm::Hybrid => {
            let baseline = syntactic_ops(a, b, opts).await?;
            let (operations, warning) =
                blend(baseline, config.similarity_threshold, opts, &ctx).await?;
            Ok(Alignment {
                operations,
                warnings: warning.into_iter().collect(),
            })
        }
    }
}

async fn syntactic_only(
    a: Arc<[Token]>,
    b: Arc<[Token]>,
    opts: &AlignOptions,
    warnings: Vec<ComparisonWarning>,
) -> Result<Alignment, AlignError> {
    let operations = syntactic_ops(a, b, opts).await?;
    Ok(Alignment {
        operations,
        warnings,
    })
}

async fn syntactic_ops(
    a: Arc<[Token]>,
    b: Arc<[Token]>,
    opts: &AlignOptions,
) -> Result<Vec<crate::DiffOperation>, AlignError> {
    let weight = a.len() + b.len();
    let opts = *opts;
    run_cpu(weight, opts.offload_token_threshold, move || {
        align_syntactic(&a, &b, &opts)
    })
    .await?
}

/// Run CPU-bound work inline, or on the blocking pool when `weight` exceeds
/// `threshold` so large comparisons don't stall other tasks on the runtime.
pub(crate) async fn run_cpu<T, F>(weight: usize, threshold: usize, work: F) -> Result<T, AlignError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    if weight <= threshold {
        return Ok(work());
    }
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AlignError::Internal(format!("alignment worker failed: {err}")))
}
