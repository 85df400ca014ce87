//! HTTP retry helpers for transient errors.
//!
//! The bulletin fetcher uses [`send_text`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! automatic retry with exponential backoff for transient failures
//! (timeouts, connection resets, server errors, rate limiting).
//!
//! # Usage
//!
//! ```ignore
//! use crate::retry;
//!
//! let page = retry::send_text(|| client.get(&url)).await?;
//! ```

use std::time::Duration;

use crate::BulletinError;

/// Maximum number of retry attempts for transient HTTP errors
/// (connection failures, timeouts, server errors).
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait
/// before giving up is 62 seconds.
const MAX_RETRIES: u32 = 5;

/// Maximum number of full re-fetch attempts when the response body
/// cannot be read (truncated or garbled response).
///
/// Each body retry goes through [`send_inner`] again, so connection-level
/// retries still apply.
const MAX_BODY_RETRIES: u32 = 5;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`).
///
/// # Retry behaviour
///
/// Two layers of retry:
///
/// 1. **Connection-level** ([`send_inner`]): retries up to [`MAX_RETRIES`]
///    times with exponential backoff on connection errors, timeouts,
///    HTTP 429, and HTTP 5xx.
/// 2. **Body-read**: if the response arrives but the body cannot be read
///    as text, the *entire* request is re-fetched up to
///    [`MAX_BODY_RETRIES`] times.
///
/// Does **not** retry HTTP 4xx (except 429) — these are permanent.
///
/// # Errors
///
/// Returns [`BulletinError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body cannot be read
/// after all body retries.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, BulletinError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for body_attempt in 0..=MAX_BODY_RETRIES {
        let response = send_inner(&build_request, MAX_RETRIES).await?;

        let url = response.url().to_string();
        let status = response.status();
        let content_length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) => {
                if body_attempt < MAX_BODY_RETRIES {
                    let delay = Duration::from_secs(1u64 << (body_attempt + 1));
                    log::warn!(
                        "Text body read failed (body retry {}/{MAX_BODY_RETRIES}), \
                         re-fetching in {delay:?}...\n  \
                         url: {url}\n  \
                         status: {status}\n  \
                         content-length: {content_length:?}\n  \
                         error: {e}",
                        body_attempt + 1,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                log::error!(
                    "Text body read failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                     url: {url}\n  \
                     status: {status}\n  \
                     content-length: {content_length:?}\n  \
                     error: {e}",
                );
                return Err(BulletinError::Http(e));
            }
        }
    }

    unreachable!("send_text body retry loop exited without returning")
}

/// Core retry loop for [`send_text`].
///
/// Sends the request built by `build_request`, retrying on transient
/// errors up to `max_retries` times with exponential backoff. Returns
/// the successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, BulletinError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<BulletinError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let result = build_request().send().await;

        match result {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(BulletinError::Http(e));
                    continue;
                }
                return Err(BulletinError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                // 429 Too Many Requests — always retry
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    if attempt < max_retries {
                        log::warn!("  HTTP 429 (rate limited)");
                        last_error = Some(BulletinError::Bulletin {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(BulletinError::Bulletin {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                // 5xx Server Error — retry
                if status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} (server error)");
                        last_error = Some(BulletinError::Bulletin {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(BulletinError::Bulletin {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                // 4xx Client Error (not 429) — permanent, don't retry
                if status.is_client_error() {
                    return Err(BulletinError::Bulletin {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }

    // Should be unreachable, but in case the loop exits without returning:
    Err(last_error.unwrap_or_else(|| BulletinError::Bulletin {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
