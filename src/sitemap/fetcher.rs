use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Result, SitemapError, TransportError};

/// Settings applied to every sitemap request.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Wait after the n-th failed attempt is `n * backoff_step`.
    pub backoff_step: Duration,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_step: Duration::from_millis(1000),
            user_agent: "Mozilla/5.0 (compatible; SitemapMonitor/1.0;)".to_string(),
        }
    }
}

/// A single GET attempt. Implementations report any non-2xx status as
/// [`TransportError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<String, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> std::result::Result<String, TransportError> {
        (**self).get(url).await
    }
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(policy: &FetchPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .connect_timeout(policy.timeout)
            .user_agent(policy.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> std::result::Result<String, TransportError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

/// Runs every request through a bounded retry loop with linear backoff.
pub struct RetryFetcher<T> {
    transport: T,
    max_attempts: u32,
    backoff_step: Duration,
}

impl<T: Transport> RetryFetcher<T> {
    pub fn new(transport: T, policy: &FetchPolicy) -> Self {
        Self {
            transport,
            max_attempts: policy.max_attempts.max(1),
            backoff_step: policy.backoff_step,
        }
    }

    pub async fn fetch(&self, url: &str) -> std::result::Result<String, SitemapError> {
        let mut attempt = 1;
        loop {
            match self.transport.get(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(SitemapError::Fetch {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::debug!("Attempt {} for {} failed: {}", attempt, url, e);
                    tokio::time::sleep(self.backoff_step.saturating_mul(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    use super::*;
    use crate::sitemap::testing::FakeTransport;

    const URL: &str = "https://example.com/sitemap.xml";

    fn fetcher(transport: FakeTransport) -> RetryFetcher<FakeTransport> {
        RetryFetcher::new(transport, &FetchPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let transport = FakeTransport::new().route(URL, "<urlset/>");
        let fetcher = fetcher(transport);

        let started = Instant::now();
        let body = fetcher.fetch(URL).await.unwrap();

        assert_eq!(body, "<urlset/>");
        assert_eq!(fetcher.transport.attempts(URL), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let transport = FakeTransport::new().script(
            URL,
            vec![
                Err(StatusCode::SERVICE_UNAVAILABLE),
                Err(StatusCode::BAD_GATEWAY),
                Ok("https://example.com/a"),
            ],
        );
        let fetcher = fetcher(transport);

        let started = Instant::now();
        let body = fetcher.fetch(URL).await.unwrap();

        assert_eq!(body, "https://example.com/a");
        assert_eq!(fetcher.transport.attempts(URL), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_carry_last_error() {
        let transport = FakeTransport::new().script(
            URL,
            vec![
                Err(StatusCode::INTERNAL_SERVER_ERROR),
                Err(StatusCode::INTERNAL_SERVER_ERROR),
                Err(StatusCode::NOT_FOUND),
            ],
        );
        let fetcher = fetcher(transport);

        let started = Instant::now();
        let err = fetcher.fetch(URL).await.unwrap_err();

        match err {
            SitemapError::Fetch {
                url,
                attempts,
                source: TransportError::Status(status),
            } => {
                assert_eq!(url, URL);
                assert_eq!(attempts, 3);
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // 1s + 2s, no wait after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_backoff_step_saturates() {
        // The second wait would overflow a plain `Duration` multiplication.
        let policy = FetchPolicy {
            max_attempts: 3,
            backoff_step: Duration::MAX / 2 + Duration::from_secs(1),
            ..FetchPolicy::default()
        };
        let transport = FakeTransport::new().script(
            URL,
            vec![
                Err(StatusCode::SERVICE_UNAVAILABLE),
                Err(StatusCode::SERVICE_UNAVAILABLE),
                Ok("https://example.com/a"),
            ],
        );
        let fetcher = RetryFetcher::new(transport, &policy);

        let body = fetcher.fetch(URL).await.unwrap();

        assert_eq!(body, "https://example.com/a");
        assert_eq!(fetcher.transport.attempts(URL), 3);
    }

    /// Serves `/ok` with a 200 and everything else with a 404 on a loopback
    /// port, keeping the raw request heads.
    async fn serve() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let response = if head.starts_with("GET /ok ") {
                    "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello"
                } else {
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                };
                seen.lock().unwrap().push(head);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, requests)
    }

    #[tokio::test]
    async fn http_transport_sends_user_agent_and_maps_status() {
        let (base, requests) = serve().await;
        let policy = FetchPolicy {
            user_agent: "sitemap-watch-test/1.0".to_string(),
            ..FetchPolicy::default()
        };
        let transport = HttpTransport::new(&policy).unwrap();

        let body = transport.get(&format!("{base}/ok")).await.unwrap();
        assert_eq!(body, "hello");

        let err = transport.get(&format!("{base}/missing")).await.unwrap_err();
        assert!(matches!(err, TransportError::Status(StatusCode::NOT_FOUND)));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for head in requests.iter() {
            assert!(
                head.to_ascii_lowercase().contains("user-agent: sitemap-watch-test/1.0"),
                "missing user agent in {head:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_never_sleeps() {
        let policy = FetchPolicy {
            max_attempts: 1,
            ..FetchPolicy::default()
        };
        let fetcher = RetryFetcher::new(FakeTransport::new(), &policy);

        let started = Instant::now();
        assert!(fetcher.fetch(URL).await.is_err());
        assert_eq!(fetcher.transport.attempts(URL), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
