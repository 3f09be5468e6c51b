//! IO modules - external system interfaces
//!
//! - `http` - HTTP API server (bookings, tracking, health, metrics)
//! - `client` - reqwest client for the HTTP API
//! - `store` - Booking persistence (memory or JSONL file)
//! - `prometheus` - Prometheus text exposition

pub mod client;
pub mod http;
pub mod prometheus;
pub mod store;

// Re-export commonly used types
pub use client::{BookingClient, ClientError, RemoteLookup};
pub use http::{serve, start_http_server, ApiState};
pub use store::{BookingStore, JsonlStore, MemoryStore, StoreError};
