//! Shared HTTP plumbing for the hosted and local adapters.

use std::time::{Duration, Instant};

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, ProviderResult};
use crate::telemetry;
use crate::types::{Deadline, Usage};

/// Default per-request timeout when the caller's deadline is further out.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Send `request` under `deadline` and decode a JSON body of type `T`.
///
/// The transport timeout is `timeout` or the time left before `deadline`,
/// whichever is shorter. Records request metrics for `provider`.
pub(crate) async fn send_json<T: DeserializeOwned + Send>(
    provider: &str,
    request: RequestBuilder,
    timeout: Duration,
    deadline: &Deadline,
) -> ProviderResult<(T, Duration)> {
    let start = Instant::now();
    let request = request.timeout(deadline.remaining().min(timeout));
    let outcome = deadline
        .run(async move {
            let response = request.send().await.map_err(map_transport_error)?;
            let response = check_status(response)?;
            response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Unknown(format!("undecodable response body: {e}")))
        })
        .await
        .and_then(|inner| inner);

    let elapsed = start.elapsed();
    let status = if outcome.is_ok() { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(elapsed.as_secs_f64());

    outcome.map(|body| (body, elapsed))
}

pub(crate) fn record_usage(provider: &str, usage: &Usage) {
    metrics::counter!(telemetry::TOKENS_TOTAL,
        "provider" => provider.to_owned(),
        "direction" => "prompt",
    )
    .increment(u64::from(usage.prompt_tokens));
    metrics::counter!(telemetry::TOKENS_TOTAL,
        "provider" => provider.to_owned(),
        "direction" => "completion",
    )
    .increment(u64::from(usage.completion_tokens));
}

/// Map a non-success response onto the provider error taxonomy.
fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    Err(error_for_status(status, retry_after))
}

pub(crate) fn error_for_status(status: StatusCode, retry_after: Option<Duration>) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Unauthorized,
        429 => ProviderError::RateLimited { retry_after },
        408 | 504 => ProviderError::Timeout,
        400 | 404 | 413 | 422 => ProviderError::InvalidRequest(format!("HTTP {status}")),
        500 | 502 | 503 => ProviderError::ProviderUnavailable(format!("HTTP {status}")),
        _ => ProviderError::Unknown(format!("HTTP {status}")),
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_connect() {
        ProviderError::ProviderUnavailable(err.to_string())
    } else {
        ProviderError::Unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(
            error_for_status(StatusCode::UNAUTHORIZED, None),
            ProviderError::Unauthorized
        );
        assert_eq!(
            error_for_status(StatusCode::FORBIDDEN, None),
            ProviderError::Unauthorized
        );
        assert_eq!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(2))),
            ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert_eq!(
            error_for_status(StatusCode::GATEWAY_TIMEOUT, None),
            ProviderError::Timeout
        );
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, None),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, None),
            ProviderError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::IM_A_TEAPOT, None),
            ProviderError::Unknown(_)
        ));
    }
}
