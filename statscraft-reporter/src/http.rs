use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::user_agent;
use crate::error::TransportError;
use crate::transport::Transport;

/// Process-wide HTTP client shared by every reporter in the host.
///
/// `Client::clone()` is just an `Arc` increment. Per-reporter timeouts are
/// applied per request via `.timeout()`.
static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|e| {
            log::error!("[TRANSPORT] Failed to build shared HTTP client: {}", e);
            Client::new()
        })
});

pub fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}

/// POSTs report documents as JSON over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: shared_client().clone(),
            timeout,
        }
    }

    /// Use a dedicated client instead of the shared one.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str, document: &str) -> Result<Option<String>, TransportError> {
        let body = document.as_bytes().to_vec();

        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(USER_AGENT, user_agent())
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .header(ACCEPT, "application/json")
            .header(CONNECTION, "close")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Io(format!("Failed to reach {}: {}", url, e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::Io(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(TransportError::Io(format!(
                "Report API returned HTTP {}: {}",
                status,
                first_line(&text).unwrap_or_default()
            )));
        }

        log::debug!("[TRANSPORT] POST {} -> {}", url, status);
        Ok(first_line(&text))
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines().next().map(|line| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line(""), None);
        assert_eq!(first_line("OK\nmore"), Some("OK".to_string()));
        assert_eq!(first_line("ERR bad key\r\n"), Some("ERR bad key".to_string()));
    }

    /// Serve exactly one HTTP response and hand back the raw request.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let l = l.to_ascii_lowercase();
                            l.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/v1/report/plugin", addr), handle)
    }

    #[tokio::test]
    async fn test_posts_document_with_headers() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nOK\n",
        )
        .await;

        let transport = HttpTransport::with_client(Client::new(), Duration::from_secs(5));
        let line = transport.send(&url, r#"{"name":"Demo"}"#).await.unwrap();
        assert_eq!(line.as_deref(), Some("OK"));

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /v1/report/plugin"));
        assert!(lower.contains("user-agent: statscraft/1"));
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("content-length: 15"));
        assert!(request.ends_with(r#"{"name":"Demo"}"#));
    }

    #[tokio::test]
    async fn test_http_error_status_is_io_error() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;

        let transport = HttpTransport::with_client(Client::new(), Duration::from_secs(5));
        let err = transport.send(&url, "{}").await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
        server.await.unwrap();
    }
}
