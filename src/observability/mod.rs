//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request director / response interceptor:
//!     → logging.rs (exchange log events, gated by LogMode)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (tracing fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all exchange log events
//! - Metrics are cheap and no-ops unless the exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, ExchangeLogger};
