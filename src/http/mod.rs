//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → middleware/access_control.rs (virtual host filter)
//!     → request.rs (request ID, director: upstream target + logging)
//!     → hyper-util client (upstream exchange)
//!     → rewrite::ResponseInterceptor (path dispatch, patching)
//!     → response.rs (hop-by-hop stripping, length, gateway errors)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestDirector, X_REQUEST_ID};
pub use server::HttpServer;
