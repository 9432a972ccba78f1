//! Report delivery seam and the response contract of the report API.

use async_trait::async_trait;

use crate::error::TransportError;

/// Response lines starting with this marker are application-level rejections
pub const ERROR_MARKER: &str = "ERR";

/// Sends one report document and returns the first line of the response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `Ok(None)` means the endpoint answered with no response line at all.
    async fn send(&self, url: &str, document: &str) -> Result<Option<String>, TransportError>;
}

/// Send `document` to `url` and apply the response contract:
/// no line is an error, a line starting with `ERR` is a rejection carrying
/// the rest of the line, anything else is success and its content is ignored.
pub async fn deliver(
    transport: &dyn Transport,
    url: &str,
    document: &str,
) -> Result<(), TransportError> {
    match transport.send(url, document).await? {
        None => Err(TransportError::EmptyResponse),
        Some(line) => match line.strip_prefix(ERROR_MARKER) {
            Some(detail) => Err(TransportError::Rejected(detail.trim_start().to_string())),
            None => Ok(()),
        },
    }
}

/// Dry-run transport that logs documents instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, url: &str, document: &str) -> Result<Option<String>, TransportError> {
        log::info!("[TRANSPORT] (dry run) POST {} {}", url, document);
        Ok(Some("OK".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;

    #[tokio::test]
    async fn test_success_line_ignored() {
        let transport = RecordingTransport::responding(Some("OK 12 servers today"));
        assert!(deliver(&transport, "http://x/plugin", "{}").await.is_ok());
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_line_is_error() {
        let transport = RecordingTransport::responding(None);
        let err = deliver(&transport, "http://x/plugin", "{}").await.unwrap_err();
        assert_eq!(err, TransportError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_err_marker_is_rejection() {
        let transport = RecordingTransport::responding(Some("ERR invalid authKey"));
        let err = deliver(&transport, "http://x/plugin", "{}").await.unwrap_err();
        assert_eq!(err, TransportError::Rejected("invalid authKey".to_string()));
    }

    #[tokio::test]
    async fn test_bare_err_marker_has_empty_detail() {
        let transport = RecordingTransport::responding(Some("ERR"));
        let err = deliver(&transport, "http://x/server", "{}").await.unwrap_err();
        assert_eq!(err, TransportError::Rejected(String::new()));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = RecordingTransport::failing("connection refused");
        let err = deliver(&transport, "http://x/update", "{}").await.unwrap_err();
        assert_eq!(err, TransportError::Io("connection refused".to_string()));
    }

    #[tokio::test]
    async fn test_log_transport_accepts() {
        assert!(deliver(&LogTransport, "http://x/server", "{\"a\":\"b\"}").await.is_ok());
    }
}
