use crate::config::Settings;
use crate::error::FetchError;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retrieves the raw bytes of a published artifact by path.
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl HttpArtifactFetcher {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_content_base_url()?;
        Ok(Self::new(
            base_url,
            Duration::from_secs(settings.content_timeout_secs),
            settings.content_retries,
        )?)
    }

    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            retries: retries.max(1),
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Base delay before the first retry; doubles on each further attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    // Doubles per attempt, capped at MAX_BACKOFF.
    fn backoff_for(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt.saturating_sub(1))
            .and_then(|factor| self.backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch_once(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |source| FetchError::Transport {
            path: path.to_string(),
            source,
        };

        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = res.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(path).await {
                Ok(bytes) => {
                    tracing::debug!(path, attempt, len = bytes.len(), "fetched artifact");
                    return Ok(bytes);
                }
                Err(err) => {
                    if attempt >= self.retries || !err.is_retryable() {
                        return Err(err);
                    }
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(path, attempt, ?backoff, error = %err, "artifact fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Reads artifacts from a local directory laid out like the content host.
#[derive(Debug, Clone)]
pub struct LocalDirFetcher {
    root: PathBuf,
}

impl LocalDirFetcher {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for LocalDirFetcher {
    fn source_name(&self) -> &'static str {
        "local_dir"
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full = self.root.join(path.trim_start_matches('/'));
        tokio::fs::read(&full).await.map_err(|source| FetchError::Io {
            path: full.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base_url: &str, retries: u32) -> HttpArtifactFetcher {
        HttpArtifactFetcher::new(base_url, Duration::from_secs(5), retries)
            .unwrap()
            .with_backoff(Duration::from_millis(5))
    }

    #[test]
    fn joins_base_url_and_path() {
        let f = fetcher("https://example.com/data/", 1);
        assert_eq!(
            f.url("/regime_history.csv"),
            "https://example.com/data/regime_history.csv"
        );
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let f = fetcher("https://example.com", 40).with_backoff(Duration::from_secs(1));
        assert_eq!(f.backoff_for(1), Duration::from_secs(1));
        assert_eq!(f.backoff_for(3), Duration::from_secs(4));
        assert_eq!(f.backoff_for(6), MAX_BACKOFF);
        assert_eq!(f.backoff_for(33), MAX_BACKOFF);
        assert_eq!(f.backoff_for(40), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/regime_history.csv"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/regime_history.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("date\n"))
            .mount(&server)
            .await;

        let bytes = fetcher(&server.uri(), 3)
            .fetch("regime_history.csv")
            .await
            .unwrap();
        assert_eq!(bytes, b"date\n");
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web_top10.csv"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(&server.uri(), 3)
            .fetch("web_top10.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = fetcher(&server.uri(), 2)
            .fetch("regime_snapshot.json")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn local_dir_reports_missing_file() {
        let dir = std::env::temp_dir().join("regimeboard-fetcher-missing");
        let err = LocalDirFetcher::new(&dir)
            .fetch("regime_snapshot.json")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
