//! # partyhub-observability
//!
//! Observability-Crate fuer PartyHub:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Typen (`/api/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, PartyMetrics};
pub use middleware::timing_middleware;
