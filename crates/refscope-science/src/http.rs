use std::sync::Arc;
use std::time::{Duration, Instant};

use refscope_core::{CoreError, NetworkConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, ScienceError};

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP client shared by every outgoing lookup.
///
/// Each request carries the configured User-Agent and the lookup marker
/// header, so an interceptor watching the same traffic can tell these
/// requests apart from ones it should resolve.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        Self::with_params(
            Duration::from_millis(config.min_interval_ms),
            config.max_retries,
            &config.user_agent,
            &config.lookup_header,
            &config.lookup_header_value,
        )
    }

    pub fn with_params(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        marker_name: &str,
        marker_value: &str,
    ) -> Result<Self> {
        let name = HeaderName::from_bytes(marker_name.as_bytes())
            .map_err(|e| CoreError::Config(format!("bad lookup header name {marker_name:?}: {e}")))?;
        let value = HeaderValue::from_str(marker_value)
            .map_err(|e| CoreError::Config(format!("bad lookup header value {marker_value:?}: {e}")))?;
        let mut defaults = HeaderMap::new();
        defaults.insert(name, value);

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(defaults)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    /// GET with an `Accept` header.
    pub async fn get_accepting(&self, url: &str, accept: &'static str) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(accept));
        self.get_with_headers(url, headers).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(url, attempt, "GET");
            let resp = self.client.get(url).headers(headers.clone()).send().await;
            match resp {
                Ok(r) if r.status() == 429 => {
                    if attempt >= self.max_retries {
                        return Err(ScienceError::FetchFailed(format!(
                            "{url}: rate limited (HTTP 429)"
                        )));
                    }
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or_else(|| 2u64.pow(attempt));
                    warn!(url, wait, "rate limited, backing off");
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    return Err(ScienceError::FetchFailed(format!(
                        "{url}: HTTP {}",
                        r.status().as_u16()
                    )));
                }
                Ok(r) => return r.text().await.map_err(ScienceError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ScienceError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    warn!(url, error = %e, backoff, "request failed, retrying");
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, accept: &'static str) -> Result<T> {
        let text = self.get_accepting(url, accept).await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::ParseFailed(format!("{url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client() -> RateLimitedClient {
        RateLimitedClient::with_params(Duration::ZERO, 0, "refscope-test", "X-Refscope-Lookup", "1")
            .unwrap()
    }

    #[tokio::test]
    async fn every_request_carries_marker_and_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("x-refscope-lookup", "1")
            .match_header("user-agent", "refscope-test")
            .with_status(200)
            .with_body("ok")
            .expect(1)
            .create_async()
            .await;

        let body = client().get(&format!("{}/page", server.url())).await.unwrap();
        assert_eq!(body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_failed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = client()
            .get(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScienceError::FetchFailed(msg) if msg.contains("HTTP 404")));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_failed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/data")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client()
            .get_json::<serde_json::Value>(&format!("{}/data", server.url()), "application/json")
            .await
            .unwrap_err();
        assert!(matches!(err, ScienceError::ParseFailed(_)));
    }

    #[test]
    fn invalid_marker_header_is_a_config_error() {
        let err = RateLimitedClient::with_params(Duration::ZERO, 0, "ua", "bad header", "1")
            .err()
            .unwrap();
        assert!(matches!(err, ScienceError::Core(CoreError::Config(_))));
    }
}
