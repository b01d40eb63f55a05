use thiserror::Error;

/// Errors surfaced by an [`Embedder`](crate::Embedder).
///
/// Every variant carries owned strings so the error can be cloned into the
/// warning attached to a degraded comparison.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// The provider could not be reached or refused the request.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    /// The provider did not answer within the configured timeout.
    #[error("embedding provider timed out after {0} ms")]
    Timeout(u64),
    /// The provider answered with something that is not one vector per input.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    /// Configuration is inconsistent (e.g. api mode without an endpoint).
    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
}
