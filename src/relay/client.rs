use super::{extract_content, CompletionBackend, CompletionRequest, RelayError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

pub struct HttpRelay {
    http: reqwest::Client,
    url: Option<String>,
    api_key: Option<String>,
    model: String,
}

impl HttpRelay {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            url: config.relay_url.clone(),
            api_key: config.relay_api_key.clone(),
            model: config.relay_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpRelay {
    async fn complete(&self, user_text: &str) -> Result<String, RelayError> {
        let url = self.url.as_deref().ok_or(RelayError::NotConfigured)?;
        let request = CompletionRequest::single_turn(&self.model, user_text);

        let mut builder = self.http.post(url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!("Relaying {} chars to {}", user_text.len(), url);
        let response = builder.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Relay error: status code {}", status.as_u16());
            return Err(RelayError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        Ok(extract_content(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/v1/chat/completions", addr), handle)
    }

    fn relay_for(url: Option<String>, key: Option<&str>) -> HttpRelay {
        HttpRelay {
            http: reqwest::Client::new(),
            url,
            api_key: key.map(str::to_string),
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ok_response_returns_content() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"choices":[{"message":{"content":"4"}}]}"#,
        )
        .await;
        let relay = relay_for(Some(url), Some("secret"));

        let answer = relay.complete("What is 2+2?").await.unwrap();
        assert_eq!(answer, "4");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(raw.contains(r#""content":"What is 2+2?""#));
        assert!(raw.contains(r#""max_tokens":150"#));
    }

    #[tokio::test]
    async fn test_missing_choices_falls_back() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK", r#"{"id":"x"}"#).await;
        let relay = relay_for(Some(url), None);

        let answer = relay.complete("hi").await.unwrap();
        assert_eq!(answer, crate::relay::FALLBACK_TEXT);

        let raw = server.await.unwrap();
        assert!(!raw.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_non_200_is_status_error() {
        let (url, _server) =
            one_shot_server("HTTP/1.1 503 Service Unavailable", r#"{"error":"busy"}"#).await;
        let relay = relay_for(Some(url), None);

        match relay.complete("hi").await {
            Err(RelayError::Status(503)) => {}
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let (url, _server) = one_shot_server("HTTP/1.1 200 OK", "not json").await;
        let relay = relay_for(Some(url), None);

        assert!(matches!(
            relay.complete("hi").await,
            Err(RelayError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint() {
        let relay = relay_for(None, None);
        assert!(matches!(
            relay.complete("hi").await,
            Err(RelayError::NotConfigured)
        ));
    }
}
