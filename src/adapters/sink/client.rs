//! HTTP client for the analytics sink
//!
//! Upload is a three-step resumable protocol:
//!
//! 1. **Locate** - ask the control API for a signed upload URL
//! 2. **Initiate** - open a resumable session against the signed URL
//! 3. **Finalize** - transfer the gzip payload to the session URI
//!
//! Only the locate step is retried; a failed initiation or transfer gets a
//! fresh signed URL on the next cycle instead. Control-plane calls and the
//! payload transfer run on separate clients with different timeouts.

use crate::adapters::sink::SinkTransport;
use crate::config::{ExportConfig, RetryConfig};
use crate::domain::{Result, SinkError, SinkSettings, TallyError};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::io::Write;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";
const RESUMABLE_HEADER: &str = "x-goog-resumable";
const GZIP_CONTENT_TYPE: &str = "application/gzip";

/// Fixed metadata body for the resumable initiation request
const INITIATE_BODY: &str = r#"{"contentEncoding":"gzip","contentDisposition":"attachment"}"#;

/// Control API response carrying the signed upload URL
#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Registration handshake response
///
/// `metrics_marker` is epoch seconds of the last instant the sink has data
/// for; zero or absent means this instance has never delivered anything.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub metrics_marker: i64,
}

/// HTTP implementation of [`SinkTransport`] plus the one-time operations
/// (register) that don't belong on the trait.
pub struct SinkClient {
    /// Client for control API calls (signed URL, register, cursor)
    control: reqwest::Client,

    /// Client for the object-store transfer, with a longer timeout
    transfer: reqwest::Client,

    settings: SinkSettings,
    retry: RetryConfig,
}

impl SinkClient {
    /// Create a new sink client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP clients cannot be built.
    pub fn new(settings: SinkSettings, export: &ExportConfig) -> Result<Self> {
        let control = reqwest::Client::builder()
            .timeout(Duration::from_secs(export.control_timeout_seconds))
            .build()
            .map_err(|e| {
                TallyError::Configuration(format!("Failed to build control HTTP client: {e}"))
            })?;

        let transfer = reqwest::Client::builder()
            .timeout(Duration::from_secs(export.transfer_timeout_seconds))
            .build()
            .map_err(|e| {
                TallyError::Configuration(format!("Failed to build transfer HTTP client: {e}"))
            })?;

        Ok(Self {
            control,
            transfer,
            settings,
            retry: export.retry.clone(),
        })
    }

    /// Base URL for this instance's control API resource
    fn agent_url(&self) -> String {
        format!(
            "{}/{}/agent/{}",
            self.settings.endpoint, self.settings.tenant, self.settings.instance_id
        )
    }

    fn api_key(&self) -> &str {
        self.settings.api_key.expose_secret().as_ref()
    }

    /// Register this instance with the sink.
    ///
    /// # Errors
    ///
    /// Returns a sink error on rejection or a malformed response. Not
    /// retried; registration is an interactive one-time operation.
    pub async fn register(&self) -> Result<Registration> {
        let body = serde_json::json!({
            "instanceId": self.settings.instance_id,
            "timezone": self.settings.timezone,
        });

        let response = self
            .control
            .post(self.agent_url())
            .header(API_KEY_HEADER, self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| TallyError::Sink(transport_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TallyError::Sink(status_error(status, message)));
        }

        let registration = response.json::<Registration>().await.map_err(|e| {
            TallyError::Sink(SinkError::Protocol(format!(
                "Malformed registration response: {e}"
            )))
        })?;

        tracing::info!(
            instance_id = %self.settings.instance_id,
            metrics_marker = registration.metrics_marker,
            "Registered with sink"
        );
        Ok(registration)
    }

    /// Locate a signed upload URL, retrying transient failures.
    ///
    /// Retry policy: `max_attempts` total attempts, exponential backoff
    /// doubling from `base_delay_ms`. Only 5xx, network, and timeout errors
    /// are retried; 4xx and protocol errors fail immediately.
    async fn locate_upload_url(&self, target_id: &str) -> Result<String> {
        let mut attempt = 1;
        let mut delay = Duration::from_millis(self.retry.base_delay_ms);

        loop {
            match self.request_upload_url(target_id).await {
                Ok(url) => return Ok(url),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        target_id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Signed URL request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(TallyError::Sink(e)),
            }
        }
    }

    async fn request_upload_url(
        &self,
        target_id: &str,
    ) -> std::result::Result<String, SinkError> {
        let response = self
            .control
            .get(format!("{}/upload-url", self.agent_url()))
            .query(&[("name", target_id), ("type", "metrics")])
            .header(API_KEY_HEADER, self.api_key())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        let parsed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Protocol(format!("Malformed signed-URL response: {e}")))?;

        parsed
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SinkError::Protocol("Signed-URL response missing 'url'".to_string()))
    }

    /// Open a resumable upload session. The session URI arrives in the
    /// `Location` header of a 201 response.
    async fn initiate_session(&self, signed_url: &str) -> std::result::Result<String, SinkError> {
        let response = self
            .transfer
            .post(signed_url)
            .header(CONTENT_TYPE, GZIP_CONTENT_TYPE)
            .header(RESUMABLE_HEADER, "start")
            .body(INITIATE_BODY)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(SinkError::Permanent {
                status: status.as_u16(),
                message: "resumable initiation rejected".to_string(),
            });
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                SinkError::Protocol("Initiation response missing Location header".to_string())
            })
    }

    /// Transfer the gzip payload to the session URI.
    async fn transfer_payload(
        &self,
        session_uri: &str,
        body: Vec<u8>,
    ) -> std::result::Result<(), SinkError> {
        let response = self
            .transfer
            .put(session_uri)
            .header(CONTENT_TYPE, GZIP_CONTENT_TYPE)
            .header(CONTENT_ENCODING, "gzip")
            .header(RESUMABLE_HEADER, "stop")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(SinkError::Permanent {
                status: status.as_u16(),
                message: "payload transfer rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SinkTransport for SinkClient {
    async fn upload(&self, payload: &str, target_id: &str) -> Result<()> {
        if payload.trim().is_empty() {
            tracing::debug!(target_id, "Nothing to upload, skipping");
            return Ok(());
        }

        let compressed = gzip_bytes(payload)?;
        let compressed_len = compressed.len();

        let signed_url = self.locate_upload_url(target_id).await?;
        let session_uri = self
            .initiate_session(&signed_url)
            .await
            .map_err(TallyError::Sink)?;
        self.transfer_payload(&session_uri, compressed)
            .await
            .map_err(TallyError::Sink)?;

        tracing::info!(
            target_id,
            raw_bytes = payload.len(),
            compressed_bytes = compressed_len,
            "Payload delivered to sink"
        );
        Ok(())
    }

    async fn advance_cursor(&self, epoch_seconds: i64) -> Result<()> {
        let body = serde_json::json!({ "metricsMarker": epoch_seconds });

        let response = self
            .control
            .patch(self.agent_url())
            .header(API_KEY_HEADER, self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| TallyError::Sink(transport_error(e)))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let message = response.text().await.unwrap_or_default();
            return Err(TallyError::Sink(status_error(status, message)));
        }
        Ok(())
    }
}

/// Gzip-compress a payload for transfer
fn gzip_bytes(payload: &str) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Classify an HTTP status into the transient/permanent split
fn status_error(status: StatusCode, message: String) -> SinkError {
    if status.is_server_error() {
        SinkError::Transient {
            status: status.as_u16(),
            message,
        }
    } else {
        SinkError::Permanent {
            status: status.as_u16(),
            message,
        }
    }
}

/// Map a reqwest transport failure into a sink error
fn transport_error(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout(err.to_string())
    } else {
        SinkError::Network(err.to_string())
    }
}
