use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::FetchError;
use crate::rate_limiter::RateLimiter;

const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// A `reqwest::Client` paired with the shared rate limiter and retry policy
/// every fetch in a run goes through (§4.B). One `HttpClient` is built per
/// `sync` invocation and shared across every worker, the same way the
/// original scraper reused one `requests.Session` per run; `reqwest::Client`
/// already pools connections internally, so a single shared instance is the
/// direct equivalent.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    backoff: Duration,
}

impl HttpClient {
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>, max_retries: u32, backoff: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .cookie_store(true)
                .build()
                .unwrap_or_else(|_| Client::new()),
            limiter,
            max_retries,
            backoff,
        }
    }

    /// Fetches `url`, waiting for the shared rate limiter before every
    /// attempt and retrying transient statuses with exponential backoff
    /// (§4.B). Non-retryable statuses and exhausted retries both surface as
    /// [`FetchError`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] on a transport-level failure after all
    /// retries, or [`FetchError::Status`] if the final attempt still returns a
    /// non-success status.
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        let (_, body) = self.send_with_retry(|| self.client.get(url)).await?;
        Ok(body)
    }

    /// Submits `form` to `url` and returns the response body. Used once per
    /// `sync` run to establish a search condition the upstream site remembers
    /// via cookie for subsequent list-page GETs (§4.C).
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, FetchError> {
        let (_, body) = self
            .send_with_retry(|| self.client.post(url).form(form))
            .await?;
        Ok(body)
    }

    /// Fetches `url`, following redirects (the default policy), retrying
    /// transient statuses the same way [`HttpClient::get`] does, and returns
    /// the final URL along with the body so callers can detect a
    /// redirect-to-list response (§4.B, §4.C, §8 scenario 3 — retries apply
    /// to detail fetches too, not only list/search requests).
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn get_with_final_url(&self, url: &str) -> Result<(String, String), FetchError> {
        self.send_with_retry(|| self.client.get(url)).await
    }

    /// Shared retry loop: acquire the limiter before every attempt, send
    /// `build_request`'s request, and retry on a transport error or a
    /// retryable status with `backoff * 2^attempt` sleep in between (§4.B).
    /// Returns the response's final URL (post-redirect) alongside its body.
    async fn send_with_retry(
        &self,
        build_request: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<(String, String), FetchError> {
        let mut attempt = 0_u32;
        loop {
            self.limiter.acquire().await;
            let result = build_request().send().await;

            match result {
                Ok(response) => {
                    let final_url = response.url().to_string();
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|source| FetchError::Request {
                            url: final_url.clone(),
                            source,
                        })?;
                        return Ok((final_url, body));
                    }
                    if !is_retryable(status) || attempt + 1 >= self.max_retries {
                        return Err(FetchError::Status {
                            url: final_url,
                            status: status.as_u16(),
                        });
                    }
                }
                Err(source) => {
                    if attempt + 1 >= self.max_retries {
                        return Err(FetchError::Request {
                            url: source.url().map(ToString::to_string).unwrap_or_default(),
                            source,
                        });
                    }
                }
            }

            tokio::time::sleep(self.backoff * 2_u32.pow(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_match_the_upstream_set() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::OK));
    }
}
