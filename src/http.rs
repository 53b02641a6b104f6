use crate::fetcher::Fetcher;
use anyhow::Context;
use std::ops::Deref;
use std::time::Duration;

/// A [`Fetcher`] that GETs a URL and returns the response body as text.
/// Error statuses count as failed fetches.
#[derive(Clone)]
pub struct HttpClient(reqwest::Client);

impl HttpClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "fail to build http client")?;
        Ok(Self(client))
    }
}

impl Deref for HttpClient {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpClient {
    type Key = reqwest::Url;
    type Output = String;

    async fn fetch(&self, url: &reqwest::Url) -> anyhow::Result<String> {
        self.get(url.clone())
            .send()
            .await
            .with_context(|| format!("fail to send GET request to url: `{url}`"))?
            .error_for_status()
            .with_context(|| format!("url `{url}` responded with an error status"))?
            .text()
            .await
            .with_context(|| format!("fail to read response body from url: `{url}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, CachingFetcher};
    use crate::error::CacheError;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `status` and `body` to every connection, counting the requests.
    async fn spawn_server(
        status: &'static str,
        body: &'static str,
    ) -> (reqwest::Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);

                let mut request: Vec<u8> = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        let url = reqwest::Url::parse(&format!("http://{addr}/page")).unwrap();
        (url, hits)
    }

    fn local_client() -> HttpClient {
        HttpClient(
            reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_build_with_timeout() {
        assert!(HttpClient::new(Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let (url, _) = spawn_server("200 OK", "<html>hello</html>").await;
        let client = local_client();
        assert_eq!(client.fetch(&url).await.unwrap(), "<html>hello</html>");
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let (url, _) = spawn_server("500 Internal Server Error", "oops").await;
        let client = local_client();
        assert!(client.fetch(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_cached_page_is_requested_once() {
        let (url, hits) = spawn_server("200 OK", "cached body").await;
        let client = local_client();
        let cache = CachingFetcher::new(MemoryStore::new(), client, CachePolicy::default());

        assert_eq!(cache.get(&url).await.unwrap(), "cached body");
        assert_eq!(cache.get(&url).await.unwrap(), "cached body");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(cache.fetch_count(&url).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_error_page_is_not_cached() {
        let (url, hits) = spawn_server("404 Not Found", "missing").await;
        let client = local_client();
        let cache = CachingFetcher::new(MemoryStore::new(), client, CachePolicy::default());

        let err = cache.get(&url).await.unwrap_err();
        assert!(matches!(err, CacheError::FetchFailed { .. }));
        assert!(cache.get(&url).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fetch_count(&url).await.unwrap(), 0);
    }
}
