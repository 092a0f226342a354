// Maps a raw HTTP failure onto exactly one typed error kind
use std::collections::HashMap;

use reqwest::header::HeaderMap;
use tracing::{debug, error, warn};

use crate::error::ApiError;

const RATE_LIMIT_STATUS: u16 = 403;
const RATE_LIMIT_PHRASES: [&str; 2] = ["API rate limit exceeded", "rate limit"];
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Classify an upstream response that may be an error.
///
/// Returns `None` for anything below 400 (successes and redirects) so the
/// regular decode path stays in charge of those. A 403 whose body mentions
/// the rate limit becomes [`ApiError::RateLimitExceeded`]; every other
/// status >= 400 becomes [`ApiError::UpstreamApi`].
pub fn classify_error(
    status: u16,
    url: &str,
    body: &str,
    headers: &HashMap<String, String>,
) -> Option<ApiError> {
    if status < 400 {
        return None;
    }

    error!("GitHub API request failed - url: {}, status: {}", url, status);
    debug!("response headers: {:?}", headers);
    debug!("response body: {}", body);

    if is_rate_limit(status, body) {
        return Some(ApiError::RateLimitExceeded {
            reset_epoch_secs: parse_reset_time(headers.get(RATE_LIMIT_RESET_HEADER)),
            url: url.to_string(),
            body: body.to_string(),
            headers: headers.clone(),
        });
    }

    Some(ApiError::UpstreamApi {
        status,
        url: url.to_string(),
        body: body.to_string(),
        headers: headers.clone(),
    })
}

fn is_rate_limit(status: u16, body: &str) -> bool {
    status == RATE_LIMIT_STATUS && RATE_LIMIT_PHRASES.iter().any(|phrase| body.contains(phrase))
}

fn parse_reset_time(raw: Option<&String>) -> u64 {
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("failed to parse rate limit reset time '{}', defaulting to 0", value);
            0
        }),
        None => {
            debug!("no {} header on rate-limited response", RATE_LIMIT_RESET_HEADER);
            0
        }
    }
}

/// Flatten response headers into plain strings; multi-valued headers join
/// with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for key in headers.keys() {
        let joined = headers
            .get_all(key)
            .iter()
            .map(|value| value.to_str().unwrap_or("<non-ascii>"))
            .collect::<Vec<_>>()
            .join(", ");
        flat.insert(key.as_str().to_string(), joined);
    }
    flat
}
