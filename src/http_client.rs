use crate::error::{AggregatorError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Shared HTTP client used by every source adapter and the image/header
/// extraction services. Every GET carries a stable user agent and an
/// optional referer; failures below 500 are never retried because a 4xx
/// generally means "this article is gone", not "the network hiccuped".
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, max_retries: u32, base_delay: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("failed to build reqwest client");

        HttpClient { client, max_retries, base_delay }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET `url`, returning the body as text. 4xx responses become
    /// `AggregatorError::Skip` immediately (no retry); 5xx and transport
    /// errors are retried with exponential backoff up to `max_retries`.
    pub async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let bytes = self.get_bytes_with_content_type(url, referer).await?.0;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// GET `url`, returning the raw body bytes and the `Content-Type`
    /// header value (used by the image service to validate MIME types).
    pub async fn get_bytes_with_content_type(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<(Vec<u8>, Option<String>)> {
        let mut backoff = ExponentialBackoff::<backoff::SystemClock> {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            max_interval: self.base_delay * 16,
            multiplier: 2.0,
            max_elapsed_time: Some(self.base_delay * 60),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let mut req = self.client.get(url);
            if let Some(r) = referer {
                req = req.header(reqwest::header::REFERER, r);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_client_error() {
                        return Err(AggregatorError::skip(format!(
                            "{} responded {}",
                            url, status
                        )));
                    }
                    if status.is_server_error() {
                        if attempt >= self.max_retries {
                            return Err(AggregatorError::Other(format!(
                                "{} responded {} after {} attempts",
                                url, status, attempt + 1
                            )));
                        }
                        attempt += 1;
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(%url, attempt, ?delay, "server error, retrying");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(AggregatorError::Other(format!("{} responded {}", url, status)));
                    }
                    if status == StatusCode::NOT_MODIFIED {
                        return Ok((Vec::new(), None));
                    }

                    let content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());
                    let bytes = resp.bytes().await?.to_vec();
                    debug!(%url, bytes = bytes.len(), "fetched");
                    return Ok((bytes, content_type));
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(AggregatorError::Http(e));
                    }
                    attempt += 1;
                    if let Some(delay) = backoff.next_backoff() {
                        warn!(%url, attempt, ?delay, error = %e, "transport error, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AggregatorError::Http(e));
                }
            }
        }
    }
}
