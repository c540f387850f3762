mod dns;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use mailharvest_core::config::CrawlConfig;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use dns::CachedResolver;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Result of one fetch attempt: a body is present only for a 200
/// response whose `Content-Type` is `text/html` or `text/plain`. Any
/// transport error collapses to `status = 0`, `body = None`.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

impl FetchOutcome {
    fn absent() -> Self {
        Self {
            status: 0,
            body: None,
            content_type: None,
        }
    }
}

/// Performs single-shot HTTP GETs with TLS verification disabled, a fixed
/// UA, redirect following, and a per-host concurrency cap.
pub struct PageFetcher {
    client: reqwest::Client,
    host_semaphores: DashMap<String, Arc<Semaphore>>,
    per_host_limit: usize,
}

impl PageFetcher {
    pub fn new(cfg: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let resolver = CachedResolver::new(Duration::from_secs(cfg.dns_cache_ttl_secs));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .dns_resolver(Arc::new(resolver))
            .build()?;

        Ok(Self {
            client,
            host_semaphores: DashMap::new(),
            per_host_limit: cfg.per_host_limit,
        })
    }

    fn semaphore_for(&self, host: &str) -> Arc<Semaphore> {
        self.host_semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
            .clone()
    }

    /// Fetches `url`, absorbing every transport error into a zero-status
    /// outcome rather than propagating, logging each at debug level.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let host = url.host_str().unwrap_or("").to_string();
        let sem = self.semaphore_for(&host);
        let permit = match sem.acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                debug!(%url, error = %e, "host semaphore closed");
                return FetchOutcome::absent();
            }
        };

        let result = self.client.get(url.clone()).send().await;
        drop(permit);

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%url, error = %e, "fetch failed");
                return FetchOutcome::absent();
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body_eligible = status == 200
            && content_type
                .as_deref()
                .map(|ct| ct.contains("text/html") || ct.contains("text/plain"))
                .unwrap_or(false);

        if !body_eligible {
            return FetchOutcome {
                status,
                body: None,
                content_type,
            };
        }

        match response.text().await {
            Ok(body) => FetchOutcome {
                status,
                body: Some(body),
                content_type,
            },
            Err(e) => {
                debug!(%url, error = %e, "failed to read response body");
                FetchOutcome {
                    status,
                    body: None,
                    content_type,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            max_depth: 3,
            timeout_secs: 5,
            max_concurrent: 10,
            per_host_limit: 50,
            dns_cache_ttl_secs: 300,
        }
    }

    #[tokio::test]
    async fn fetch_returns_body_for_html_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>").insert_header("content-type", "text/html"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config()).unwrap();
        let url: Url = server.uri().parse().unwrap();
        let outcome = fetcher.fetch(&url).await;
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body.unwrap(), "<html>hi</html>");
    }

    #[tokio::test]
    async fn fetch_drops_body_for_non_html_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4]).insert_header("content-type", "image/png"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config()).unwrap();
        let url: Url = server.uri().parse().unwrap();
        let outcome = fetcher.fetch(&url).await;
        assert_eq!(outcome.status, 200);
        assert!(outcome.body.is_none());
    }

    #[tokio::test]
    async fn fetch_absorbs_connection_errors() {
        let fetcher = PageFetcher::new(&test_config()).unwrap();
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        let outcome = fetcher.fetch(&url).await;
        assert_eq!(outcome.status, 0);
        assert!(outcome.body.is_none());
    }
}
