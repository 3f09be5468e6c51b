//! HTTP client for the booking API, used by the terminal front-end

use crate::domain::booking::{BookingPayload, BookingRecord};
use crate::domain::tracking::TrackingRecord;
use crate::services::tracking::{LookupError, TrackingLookup};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// `{"success": bool, "data" | "error" | "message": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self, status: StatusCode) -> Result<T, ClientError> {
        match self.data {
            Some(data) if self.success && status.is_success() => Ok(data),
            _ => Err(ClientError::Rejected {
                status,
                message: self
                    .error
                    .or(self.message)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            }),
        }
    }
}

/// Entry of `GET /api/services`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Clone)]
pub struct BookingClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BookingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl { url: base_url.to_string(), reason };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a base url".to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).http1_only().build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/seg/seg/...`, escaping each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("{status}: {e}")))?;
        envelope.into_result(status)
    }

    /// `POST /api/bookings`
    pub async fn submit(&self, payload: &BookingPayload) -> Result<BookingRecord, ClientError> {
        let url = self.endpoint(&["api", "bookings"]);
        let response = self.http.post(url).json(payload).send().await?;
        let record: BookingRecord = Self::read(response).await?;
        debug!(id = %record.id, "booking_submitted");
        Ok(record)
    }

    /// `GET /api/services`
    pub async fn services(&self) -> Result<Vec<ServiceInfo>, ClientError> {
        let url = self.endpoint(&["api", "services"]);
        let response = self.http.get(url).send().await?;
        Self::read(response).await
    }

    /// `GET /api/track/{code}`
    pub async fn track(&self, code: &str) -> Result<TrackingRecord, ClientError> {
        let url = self.endpoint(&["api", "track", code]);
        let response = self.http.get(url).send().await?;
        Self::read(response).await
    }
}

/// Tracking lookups served by a remote booking server
pub struct RemoteLookup {
    client: BookingClient,
}

impl RemoteLookup {
    pub fn new(client: BookingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackingLookup for RemoteLookup {
    async fn resolve(&self, code: &str) -> Result<TrackingRecord, LookupError> {
        // An empty path segment would hit a different route
        if code.trim().is_empty() {
            return Err(LookupError::EmptyInput);
        }

        match self.client.track(code).await {
            Ok(record) => Ok(record),
            Err(ClientError::Rejected { status: StatusCode::BAD_REQUEST, .. }) => {
                Err(LookupError::EmptyInput)
            }
            Err(ClientError::Rejected { status: StatusCode::NOT_FOUND, .. }) => {
                Err(LookupError::NotFound)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "remote_lookup_failed");
                Err(LookupError::Unavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BookingClient {
        BookingClient::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let c = client("http://localhost:3000");
        assert_eq!(c.endpoint(&["api", "bookings"]).as_str(), "http://localhost:3000/api/bookings");

        let c = client("http://localhost:3000/courier/");
        assert_eq!(
            c.endpoint(&["api", "track", "TRK1"]).as_str(),
            "http://localhost:3000/courier/api/track/TRK1"
        );
    }

    #[test]
    fn test_endpoint_escapes_code() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.endpoint(&["api", "track", "a b/c"]).as_str(),
            "http://localhost:3000/api/track/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            BookingClient::new("not a url", Duration::from_secs(1)),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            BookingClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_envelope_error_message() {
        let envelope: Envelope<BookingRecord> =
            serde_json::from_str(r#"{"success":false,"message":"Method Not Allowed"}"#).unwrap();
        match envelope.into_result(StatusCode::METHOD_NOT_ALLOWED) {
            Err(ClientError::Rejected { status, message }) => {
                assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(message, "Method Not Allowed");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_lookup_blank_code_short_circuits() {
        let lookup = RemoteLookup::new(client("http://127.0.0.1:9"));
        assert_eq!(lookup.resolve("   ").await, Err(LookupError::EmptyInput));
    }

    #[tokio::test]
    async fn test_remote_lookup_unreachable_server() {
        let lookup = RemoteLookup::new(client("http://127.0.0.1:9"));
        assert!(matches!(lookup.resolve("TRK1").await, Err(LookupError::Unavailable(_))));
    }
}
