//! Intercepting reverse proxy for IoT device cloud traffic.
//!
//! Forwards device requests to the vendor API and rewrites selected
//! responses on the way back: the server-discovery answer is substituted,
//! device-settings fields are force-patched, and a notification fires when a
//! tracked device reports a patched settings block.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod notify;
pub mod observability;
pub mod rewrite;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use upstream::UpstreamTarget;
