//! Request dispatch: one authenticated call to the inference service.
//!
//! This is the only stage with network I/O. It picks the endpoint and body
//! shape from the mode, attaches `Authorization: Bearer …`, and makes
//! exactly one attempt. There is no retry or backoff; a failed analysis is
//! reported to the user, who decides whether to try again.
//!
//! | Outcome | Error |
//! |---------|-------|
//! | no credential | [`NoCapError::AuthRequired`], nothing sent |
//! | payload does not fit the mode | [`NoCapError::Validation`], nothing sent |
//! | no HTTP response | [`NoCapError::Transport`] |
//! | non-2xx status | [`NoCapError::AnalysisFailed`] |

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::NoCapError;
use crate::mode::AnalysisMode;
use crate::pipeline::encode::SubmissionPayload;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A successful (2xx) response, body not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub mode: AnalysisMode,
    pub status: u16,
    pub body: Vec<u8>,
    pub duration_ms: u64,
}

/// Error body the service sends alongside non-2xx statuses.
///
/// Read best-effort for the message only; it never changes the outcome.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Issues analysis requests against the configured service.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    config: ClientConfig,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> Result<Self, NoCapError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| NoCapError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `payload` for `mode`, authenticated with `credential`.
    pub async fn dispatch(
        &self,
        mode: AnalysisMode,
        payload: &SubmissionPayload,
        credential: Option<&Credential>,
    ) -> Result<RawResponse, NoCapError> {
        let Some(credential) = credential else {
            warn!("No active session; {} request not sent", mode);
            return Err(NoCapError::AuthRequired {
                reason: "no signed-in user".into(),
            });
        };

        if !payload.fits(mode) {
            return Err(NoCapError::Validation(format!(
                "{} payload cannot be sent in {mode} mode",
                payload.kind()
            )));
        }

        let path = mode.endpoint();
        let url = self.config.endpoint(path);
        let request = self.client.post(&url).bearer_auth(credential.secret());

        let request = match payload {
            SubmissionPayload::Text(text) => request.json(&json!({ "text": text })),
            SubmissionPayload::Url(target) => request.json(&json!({ "url": target })),
            SubmissionPayload::ImageBase64 { data, filename } => {
                request.json(&json!({ "image": data, "filename": filename }))
            }
            SubmissionPayload::File {
                bytes,
                filename,
                mime,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(mime)
                    .map_err(|e| NoCapError::Validation(format!("MIME type '{mime}': {e}")))?;
                request.multipart(Form::new().part("file", part))
            }
        };

        info!("POST {} ({} payload)", path, payload.kind());
        let start = Instant::now();

        let response = request.send().await.map_err(|e| NoCapError::Transport {
            endpoint: path.to_string(),
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            // The status alone decides the outcome; the body only adds detail.
            let detail = response
                .bytes()
                .await
                .ok()
                .and_then(|body| error_detail(&body));
            warn!(
                "{} answered HTTP {} after {}ms",
                path,
                status.as_u16(),
                start.elapsed().as_millis()
            );
            return Err(NoCapError::AnalysisFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await.map_err(|e| NoCapError::Transport {
            endpoint: path.to_string(),
            detail: format!("reading body: {e}"),
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "{} answered HTTP {} with {} bytes in {}ms",
            path,
            status.as_u16(),
            body.len(),
            duration_ms
        );

        Ok(RawResponse {
            mode,
            status: status.as_u16(),
            body: body.to_vec(),
            duration_ms,
        })
    }
}

/// Pull `error: details` out of a failure body, if it has that shape.
fn error_detail(body: &[u8]) -> Option<String> {
    let b: ErrorBody = serde_json::from_slice(body).ok()?;
    match (b.error, b.details) {
        (Some(e), Some(d)) => Some(format!("{e}: {d}")),
        (Some(e), None) => Some(e),
        (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_shapes() {
        assert_eq!(
            error_detail(br#"{"error":"Model error","details":"boom"}"#).as_deref(),
            Some("Model error: boom")
        );
        assert_eq!(
            error_detail(br#"{"error":"Invalid URL format"}"#).as_deref(),
            Some("Invalid URL format")
        );
        assert_eq!(error_detail(b"<html>502</html>"), None);
        assert_eq!(error_detail(b"{}"), None);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        // Port 9 (discard) is never contacted: the call must fail before I/O.
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let d = Dispatcher::new(config).unwrap();
        let err = d
            .dispatch(
                AnalysisMode::Text,
                &SubmissionPayload::Text("hello".into()),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NoCapError::AuthRequired { .. }));
    }

    /// Serve one request, answering with `head` and `body`, then hang up.
    async fn one_shot_server(head: &'static str, body: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Drain the whole request so closing does not reset the connection.
            while !request.ends_with(b"\"hello\"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn truncated_error_body_is_still_analysis_failed() {
        let base = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 1000\r\nContent-Type: application/json\r\n\r\n",
            b"{\"error\":",
        )
        .await;
        let config = ClientConfig::builder().base_url(base).build().unwrap();
        let d = Dispatcher::new(config).unwrap();
        let cred = Credential::new("t");

        let err = d
            .dispatch(
                AnalysisMode::Text,
                &SubmissionPayload::Text("hello".into()),
                Some(&cred),
            )
            .await
            .unwrap_err();
        match err {
            NoCapError::AnalysisFailed { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, None);
            }
            other => panic!("expected AnalysisFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_transport() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let config = ClientConfig::builder()
            .base_url(format!("http://127.0.0.1:{port}"))
            .build()
            .unwrap();
        let d = Dispatcher::new(config).unwrap();
        let cred = Credential::new("t");
        let err = d
            .dispatch(
                AnalysisMode::Text,
                &SubmissionPayload::Text("hello".into()),
                Some(&cred),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, NoCapError::Transport { ref endpoint, .. } if endpoint == "/mode/text"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn mismatched_payload_short_circuits() {
        let d = Dispatcher::new(ClientConfig::default()).unwrap();
        let cred = Credential::new("t");
        let err = d
            .dispatch(
                AnalysisMode::Image,
                &SubmissionPayload::Text("hello".into()),
                Some(&cred),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NoCapError::Validation(_)));
    }
}
