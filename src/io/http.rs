//! HTTP API
//!
//! Routes:
//! - `POST /api/bookings` - store a booking (201 / 400 / 405 / 413)
//! - `GET /api/track/{code}` - tracking lookup (200 / 400 / 404 / 405)
//! - `GET /api/services` - service type catalog
//! - `GET /health` - liveness
//! - `GET /metrics` - Prometheus metrics
//!
//! JSON responses use the envelope `{"success": bool, "data" | "error" | "message": ...}`.

use crate::domain::types::ServiceType;
use crate::infra::metrics::Metrics;
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::bookings::{BookingError, BookingService};
use crate::services::tracking::{LookupError, TrackingLookup};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared state handed to every request
pub struct ApiState {
    bookings: BookingService,
    tracking: Arc<dyn TrackingLookup>,
    metrics: Arc<Metrics>,
    max_body_bytes: usize,
}

impl ApiState {
    pub fn new(
        bookings: BookingService,
        tracking: Arc<dyn TrackingLookup>,
        metrics: Arc<Metrics>,
        max_body_bytes: usize,
    ) -> Self {
        Self { bookings, tracking, metrics, max_body_bytes }
    }
}

/// Every failure the API reports, mapped to a status code in one place
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    WriteFailure(#[from] BookingError),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error("Not Found")]
    RouteNotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Lookup(LookupError::EmptyInput) => StatusCode::BAD_REQUEST,
            ApiError::Lookup(LookupError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Lookup(LookupError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::WriteFailure(_) | ApiError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let body = match &self {
            ApiError::MethodNotAllowed => json!({"success": false, "message": self.to_string()}),
            _ => json!({"success": false, "error": self.to_string()}),
        };
        json_response(self.status(), &body)
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

fn text_response(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

/// CORS preflight for the API routes
fn preflight(allow: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", allow)
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::new()))
        .expect("static response should not fail")
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Decode `%XX` escapes in a path segment. Malformed escapes are kept as-is.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push((hex_value(bytes[i + 1]) << 4) | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Tracking code from `/api/track` or `/api/track/{code}`
fn tracking_code(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/api/track")?;
    if rest.is_empty() {
        return Some(String::new());
    }
    rest.strip_prefix('/').map(percent_decode)
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::PayloadTooLarge),
        Err(e) => Err(ApiError::BodyRead(e.to_string())),
    }
}

async fn create_booking<B>(body: B, state: &ApiState) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let bytes = read_body(body, state.max_body_bytes).await?;
    let record = state.bookings.create(&bytes)?;
    Ok(json_response(StatusCode::CREATED, &json!({"success": true, "data": record})))
}

async fn track(code: &str, state: &ApiState) -> Result<Response<Full<Bytes>>, ApiError> {
    let record = state.tracking.resolve(code).await?;
    Ok(json_response(StatusCode::OK, &json!({"success": true, "data": record})))
}

fn service_catalog() -> Response<Full<Bytes>> {
    let services: Vec<Value> = ServiceType::ALL
        .iter()
        .map(|s| json!({"id": s.as_str(), "name": s.name(), "description": s.description()}))
        .collect();
    json_response(StatusCode::OK, &json!({"success": true, "data": services}))
}

async fn route<B>(req: Request<B>, state: &ApiState) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path == "/api/bookings" {
        return match method {
            Method::POST => create_booking(req.into_body(), state).await,
            Method::OPTIONS => Ok(preflight("POST, OPTIONS")),
            _ => Err(ApiError::MethodNotAllowed),
        };
    }

    if let Some(code) = tracking_code(&path) {
        return match method {
            Method::GET => track(&code, state).await,
            Method::OPTIONS => Ok(preflight("GET, OPTIONS")),
            _ => Err(ApiError::MethodNotAllowed),
        };
    }

    match (&method, path.as_str()) {
        (&Method::GET, "/api/services") => Ok(service_catalog()),
        (&Method::GET, "/health") => {
            Ok(text_response(StatusCode::OK, "text/plain; charset=utf-8", "ok".to_string()))
        }
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics.snapshot(), state.bookings.store().len());
            Ok(text_response(StatusCode::OK, "text/plain; version=0.0.4; charset=utf-8", body))
        }
        _ => Err(ApiError::RouteNotFound),
    }
}

/// Handle one HTTP request
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match route(req, &state).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ApiError::MethodNotAllowed => state.metrics.record_method_not_allowed(),
                ApiError::PayloadTooLarge => state.metrics.record_payload_too_large(),
                _ => {}
            }
            e.into_response()
        }
    };

    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_request(latency_us);
    debug!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_us = %latency_us,
        "http_request"
    );
    Ok(response)
}

/// Accept connections until shutdown is signalled
pub async fn serve(
    listener: TcpListener,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender also ends the server
                if changed.is_err() || *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the listener and serve the API
pub async fn start_http_server(
    addr: SocketAddr,
    state: Arc<ApiState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http_server_started");
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::services::tracking::FixtureLookup;
    use std::time::Duration;

    fn state() -> Arc<ApiState> {
        let metrics = Arc::new(Metrics::new());
        let bookings = BookingService::new(Arc::new(MemoryStore::new()), metrics.clone());
        let tracking = Arc::new(FixtureLookup::sample(Duration::ZERO));
        Arc::new(ApiState::new(bookings, tracking, metrics, 1024))
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn call(state: &Arc<ApiState>, req: Request<Full<Bytes>>) -> (StatusCode, Value) {
        let response = handle_request(req, state.clone()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_post_booking_created() {
        let state = state();
        let body = r#"{"name":"Ada","email":"ada@example.com","phone":"555","pickup":"A","destination":"B","date":"2025-03-20"}"#;
        let (status, value) = call(&state, request(Method::POST, "/api/bookings", body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["name"], "Ada");
        assert_eq!(value["data"]["destination"], "B");
        assert!(value["data"]["id"].is_string());
    }

    #[tokio::test]
    async fn test_post_booking_write_failure() {
        let state = state();
        let (status, value) =
            call(&state, request(Method::POST, "/api/bookings", r#"{"date":"whenever"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("Cast to date failed"));
    }

    #[tokio::test]
    async fn test_get_bookings_not_allowed() {
        let state = state();
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (status, value) = call(&state, request(method, "/api/bookings", "")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(value, json!({"success": false, "message": "Method Not Allowed"}));
        }
        assert_eq!(state.metrics.snapshot().method_not_allowed, 3);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let state = state();
        let big = format!(r#"{{"name":"{}"}}"#, "x".repeat(2048));
        let (status, _) = call(&state, request(Method::POST, "/api/bookings", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.bookings.store().is_empty());
    }

    #[tokio::test]
    async fn test_track_found() {
        let state = state();
        let (status, value) = call(&state, request(Method::GET, "/api/track/TRK123456789", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["data"]["status"], "In Transit");
        assert_eq!(value["data"]["history"].as_array().unwrap().len(), 3);
        assert_eq!(value["data"]["currentLocation"], "Denver, CO");
    }

    #[tokio::test]
    async fn test_track_errors() {
        let state = state();
        let (status, value) = call(&state, request(Method::GET, "/api/track/UNKNOWN", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"], "Tracking number not found. Please check and try again.");

        let (status, value) = call(&state, request(Method::GET, "/api/track/%20%20", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Please enter a tracking number.");

        let (status, _) = call(&state, request(Method::GET, "/api/track", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&state, request(Method::POST, "/api/track/TRK123456789", "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_preflight_and_unknown_route() {
        let state = state();
        let response =
            handle_request(request(Method::OPTIONS, "/api/bookings", ""), state.clone()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["Access-Control-Allow-Methods"], "POST, OPTIONS");

        let (status, value) = call(&state, request(Method::GET, "/nope", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_services_catalog() {
        let (status, value) = call(&state(), request(Method::GET, "/api/services", "")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> =
            value["data"].as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["express", "standard", "international"]);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let state = state();
        call(&state, request(Method::GET, "/health", "")).await;
        let response = handle_request(request(Method::GET, "/metrics", ""), state.clone()).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("courier_requests_total 1"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("TRK123"), "TRK123");
        assert_eq!(percent_decode("%20%20"), "  ");
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%+5"), "%+5");
        assert_eq!(percent_decode("%-1x"), "%-1x");
        assert_eq!(percent_decode("%4a%4A"), "JJ");
    }

    #[test]
    fn test_tracking_code() {
        assert_eq!(tracking_code("/api/track"), Some(String::new()));
        assert_eq!(tracking_code("/api/track/"), Some(String::new()));
        assert_eq!(tracking_code("/api/track/TRK1"), Some("TRK1".to_string()));
        assert_eq!(tracking_code("/api/tracking"), None);
        assert_eq!(tracking_code("/api/bookings"), None);
    }
}
