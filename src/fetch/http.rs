//! HTTP data source fetcher
//!
//! Fetches sources over HTTP(S) with `reqwest`. Relative urls resolve
//! against the configured base url, and `file://` urls (or bare paths when
//! no base is set) are read from disk.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::time::Duration;

use super::{DataFetcher, FetchError};

/// Configuration for [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base url that relative sources resolve against (e.g. "http://localhost:8000/")
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 30,
            user_agent: format!("datavis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Where a source url points after resolution
#[derive(Debug, Clone, PartialEq)]
enum Target {
    Http(Url),
    File(PathBuf),
}

/// Fetcher backed by `reqwest`
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the given configuration
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch a page by its own location
    ///
    /// Unlike data sources, a page never resolves against the base url:
    /// anything that is not an absolute url is read from disk.
    pub async fn fetch_page(&self, page: &str) -> Result<String, FetchError> {
        let target = self.resolve_with(page, None)?;
        self.fetch_target(page, target).await
    }

    fn resolve(&self, url: &str) -> Result<Target, FetchError> {
        self.resolve_with(url, self.config.base_url.as_deref())
    }

    fn resolve_with(&self, url: &str, base_url: Option<&str>) -> Result<Target, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let absolute = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => match base_url {
                Some(base) => Url::parse(base)
                    .and_then(|b| b.join(url))
                    .map_err(|e| invalid(e.to_string()))?,
                None => return Ok(Target::File(PathBuf::from(url))),
            },
        };

        match absolute.scheme() {
            "http" | "https" => Ok(Target::Http(absolute)),
            "file" => absolute
                .to_file_path()
                .map(Target::File)
                .map_err(|_| invalid("not a local file path".to_string())),
            other => Err(invalid(format!("unsupported scheme `{}`", other))),
        }
    }

    async fn fetch_target(&self, url: &str, target: Target) -> Result<String, FetchError> {
        match target {
            Target::Http(resolved) => {
                tracing::debug!(source = %url, resolved = %resolved, "Fetching over HTTP");
                self.get(resolved).await
            }
            Target::File(path) => {
                tracing::debug!(source = %url, path = ?path, "Reading from disk");
                Ok(tokio::fs::read_to_string(&path).await?)
            }
        }
    }

    async fn get(&self, url: Url) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::Unavailable
            } else {
                FetchError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request(e)
            }
        })
    }
}

#[async_trait]
impl DataFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let target = self.resolve(url)?;
        self.fetch_target(url, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fetcher(base_url: Option<&str>) -> HttpFetcher {
        HttpFetcher::new(FetchConfig {
            base_url: base_url.map(str::to_string),
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.user_agent.starts_with("datavis/"));
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let f = fetcher(Some("http://localhost:8000/transactions/"));
        assert_eq!(
            f.resolve("/data/in-out/2014/5/").unwrap(),
            Target::Http(Url::parse("http://localhost:8000/data/in-out/2014/5/").unwrap())
        );
        assert_eq!(
            f.resolve("summary.json").unwrap(),
            Target::Http(Url::parse("http://localhost:8000/transactions/summary.json").unwrap())
        );
    }

    #[test]
    fn test_resolve_absolute_and_paths() {
        let f = fetcher(None);
        assert!(matches!(
            f.resolve("https://example.com/data").unwrap(),
            Target::Http(_)
        ));
        assert_eq!(
            f.resolve("data/chart.json").unwrap(),
            Target::File(PathBuf::from("data/chart.json"))
        );
        assert!(matches!(
            f.resolve("ftp://example.com/data"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("source.json");
        std::fs::write(&path, r#"{"data": []}"#).unwrap();

        let f = fetcher(None);
        let text = f.fetch_text(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, r#"{"data": []}"#);

        let url = Url::from_file_path(&path).unwrap();
        let text = f.fetch_text(url.as_str()).await.unwrap();
        assert_eq!(text, r#"{"data": []}"#);
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let f = fetcher(None);
        let result = f
            .fetch_text(dir.path().join("missing.json").to_str().unwrap())
            .await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }

    #[test]
    fn test_page_ignores_base_url() {
        let f = fetcher(Some("http://localhost:8000/"));
        assert_eq!(
            f.resolve_with("saved-month.html", None).unwrap(),
            Target::File(PathBuf::from("saved-month.html"))
        );
        assert!(matches!(
            f.resolve_with("http://localhost:8000/month/", None).unwrap(),
            Target::Http(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_from_disk_with_base_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved-month.html");
        std::fs::write(&path, "<div data-vis=\"LineChart\"></div>").unwrap();

        // Port 9 is never listened on here; a page read must not touch it
        let f = fetcher(Some("http://127.0.0.1:9/"));
        let html = f.fetch_page(path.to_str().unwrap()).await.unwrap();
        assert!(html.contains("data-vis"));

        let url = Url::from_file_path(&path).unwrap();
        assert!(f.fetch_page(url.as_str()).await.is_ok());
    }

    /// Serve one connection with a canned raw HTTP response
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/data/in-out/2014/5/", addr)
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\n\
             Content-Length: 4\r\n\
             Connection: close\r\n\r\n\
             boom",
        )
        .await;

        let result = fetcher(None).fetch_text(&url).await;
        match result {
            Err(FetchError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Length: 12\r\n\
             Connection: close\r\n\r\n\
             {\"data\": []}",
        )
        .await;

        let text = fetcher(None).fetch_text(&url).await.unwrap();
        assert_eq!(text, r#"{"data": []}"#);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept and hold the connection without ever answering
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            drop(socket);
        });

        let f = HttpFetcher::new(FetchConfig {
            request_timeout_secs: 1,
            ..FetchConfig::default()
        })
        .unwrap();
        let result = f.fetch_text(&format!("http://{}/slow", addr)).await;
        assert!(matches!(result, Err(FetchError::Timeout)), "{:?}", result);

        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetcher(None).fetch_text(&format!("http://{}/", addr)).await;
        assert!(matches!(result, Err(FetchError::Unavailable)), "{:?}", result);
    }
}
