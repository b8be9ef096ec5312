// src/fetch/mod.rs

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};

pub mod query;
pub mod table;

/// Issues GET requests and hands back the decoded body.
///
/// Everything above this trait is transport-agnostic, so tests can swap in an
/// in-memory source and count requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `encoding` is the fallback label used when the response declares no charset.
    async fn get_text(&self, url: &Url, encoding: &str) -> Result<String>;
}

/// `reqwest`-backed transport. No retries: the first failure is returned.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> ScrapeError {
    ScrapeError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &Url, encoding: &str) -> Result<String> {
        debug!("Fetching text from {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?
            .error_for_status()
            .map_err(|e| transport_error(url, e))?
            .text_with_charset(encoding)
            .await
            .map_err(|e| transport_error(url, e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `body` once with the given `Content-Type` and returns the URL.
    async fn serve_once(content_type: &'static str, body: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{}/index.aspx?p=1", addr)).unwrap()
    }

    #[tokio::test]
    async fn gbk_body_decodes_with_fallback_encoding() {
        // "2017年01月" in GBK.
        let url = serve_once("text/html", b"2017\xc4\xea01\xd4\xc2").await;
        let transport = HttpTransport::new(&ScraperConfig::default()).unwrap();

        let text = transport.get_text(&url, "gb2312").await.unwrap();
        assert_eq!(text, "2017年01月");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let transport = HttpTransport::new(&ScraperConfig::default()).unwrap();

        let err = transport.get_text(&url, "utf-8").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport { .. }));
    }
}
