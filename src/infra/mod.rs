//! Infrastructure - configuration, logging, and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `logging` - tracing subscriber setup
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, LogFormat, StoreBackend};
pub use logging::init_logging;
pub use metrics::Metrics;
