//! Backoff schedule and the stock retry policies.
//!
//! Every stock policy caps at [`MAX_ITERATIONS`] attempts: on iteration 11
//! it declines and the failure falls through to the next policy.

use std::time::Duration;

use crate::error::{status, TransportError};
use crate::request::RequestError;

/// Default attempt cap for the stock policies.
pub const MAX_ITERATIONS: u32 = 10;

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Highest iteration that may still be retried.
    pub max_iterations: u32,
    /// Delay after the first failed attempt.
    pub initial: Duration,
    /// Factor applied per further attempt.
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            initial: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    pub fn new(max_iterations: u32, initial: Duration, multiplier: f64) -> Self {
        Self {
            max_iterations,
            initial,
            multiplier,
        }
    }

    /// Delay before re-issuing after the `iteration`-th failed attempt
    /// (1-based): `initial * multiplier^(iteration - 1)`.
    /// Returns `None` once `iteration` exceeds `max_iterations`.
    pub fn next_delay(&self, iteration: u32) -> Option<Duration> {
        if iteration == 0 || iteration > self.max_iterations {
            return None;
        }
        let exponent = (iteration - 1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }
}

/// `2^(iteration-1)` seconds.
pub fn exponential_delay(iteration: u32) -> Duration {
    Duration::from_secs(1u64 << iteration.saturating_sub(1).min(63))
}

/// Build a policy that retries one HTTP status on the given schedule.
pub fn retry_on_status(
    code: u16,
    backoff: Backoff,
) -> impl Fn(&RequestError) -> Option<Duration> + Send + Sync + 'static {
    move |err: &RequestError| {
        if err.status() != Some(code) {
            return None;
        }
        backoff.next_delay(err.iteration)
    }
}

/// HTTP 503: exponential backoff.
pub fn retry_on_service_unavailable(err: &RequestError) -> Option<Duration> {
    if err.status() != Some(status::SERVICE_UNAVAILABLE) || err.iteration > MAX_ITERATIONS {
        return None;
    }
    Some(exponential_delay(err.iteration))
}

/// HTTP 502: exponential backoff.
pub fn retry_on_bad_gateway(err: &RequestError) -> Option<Duration> {
    if err.status() != Some(status::BAD_GATEWAY) || err.iteration > MAX_ITERATIONS {
        return None;
    }
    Some(exponential_delay(err.iteration))
}

/// HTTP 429: wait for the server-supplied `Retry-After`. Declines when the
/// header is missing or not a number of seconds.
pub fn retry_on_too_many_requests(err: &RequestError) -> Option<Duration> {
    let TransportError::Status(response) = &err.error else {
        return None;
    };
    if response.status != status::TOO_MANY_REQUESTS || err.iteration > MAX_ITERATIONS {
        return None;
    }
    match response.retry_after_secs() {
        Some(secs) => Some(Duration::from_secs(secs)),
        None => {
            tracing::debug!(endpoint = %err.endpoint, "429 without usable Retry-After");
            None
        }
    }
}

/// Connection failures (no HTTP status): exponential backoff.
pub fn retry_on_connection_error(err: &RequestError) -> Option<Duration> {
    if !matches!(err.error, TransportError::Connection(_)) || err.iteration > MAX_ITERATIONS {
        return None;
    }
    Some(exponential_delay(err.iteration))
}

/// Client-side timeouts: exponential backoff.
pub fn retry_on_timeout(err: &RequestError) -> Option<Duration> {
    if !matches!(err.error, TransportError::Timeout(_)) || err.iteration > MAX_ITERATIONS {
        return None;
    }
    Some(exponential_delay(err.iteration))
}
