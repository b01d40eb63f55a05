//! Resilience for remote embedding calls: retry with backoff and a circuit
//! breaker, so an unhealthy provider fails fast and the comparison degrades to
//! syntactic alignment instead of stalling.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{execute_with_retry_async, is_retryable_error, RetryConfig, RetryResult};
