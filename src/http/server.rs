//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, timeout, access filter)
//! - Bind server to listener with graceful shutdown
//! - Forward directed requests to the upstream
//! - Hand upstream responses to the interceptor
//! - Observability (metrics, request IDs)

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::middleware::access_control::{access_control_middleware, AccessFilter};
use crate::http::request::{request_id, request_id_layer, RequestDirector};
use crate::http::response::strip_hop_by_hop;
use crate::lifecycle::shutdown_signal;
use crate::notify::Notifier;
use crate::observability::{metrics, ExchangeLogger};
use crate::rewrite::{Disposition, Exchange, ResponseInterceptor, RewriteTable};
use crate::upstream::UpstreamTarget;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<RequestDirector>,
    pub interceptor: Arc<ResponseInterceptor>,
    pub client: Client<HttpConnector, Body>,
    pub upstream_timeout: Duration,
}

/// HTTP server for the intercepting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server from validated configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ProxyConfig, upstream: UpstreamTarget, notifier: Arc<dyn Notifier>) -> Self {
        let table = Arc::new(RewriteTable::from_config(&config.rewrite));
        let logger = ExchangeLogger::new(&config.logging);

        let director = Arc::new(RequestDirector::new(upstream, table.clone(), logger));
        let interceptor = Arc::new(ResponseInterceptor::new(&config, table.clone(), notifier));

        // Initialize HTTP Client. Redirects are never followed.
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            director,
            interceptor,
            client,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let access = Arc::new(AccessFilter::new(&config.access));
        if access.is_enabled() {
            tracing::info!(host = ?config.access.allowed_host, "Virtual host filter enabled");
        }

        tracing::info!(
            rules = table.len(),
            log_mode = %config.logging.mode,
            "Rewrite table loaded"
        );

        let router = Self::build_router(&config, state, access);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, access: Arc<AccessFilter>) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(access, access_control_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until a shutdown signal arrives, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Directs the request upstream and intercepts the response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let exchange = Exchange {
        request_id: request_id(&request),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
    };

    tracing::debug!(
        request_id = %exchange.request_id,
        method = %exchange.method,
        path = %exchange.path,
        "Proxying request"
    );

    match forward(&state, &exchange, request).await {
        Ok((response, disposition)) => {
            metrics::record_request(
                exchange.method.as_str(),
                response.status().as_u16(),
                disposition.as_str(),
                start_time,
            );
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %exchange.request_id,
                path = %exchange.path,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(exchange.method.as_str(), e.status().as_u16(), "failed", start_time);
            e.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    exchange: &Exchange,
    request: Request<Body>,
) -> Result<(Response, Disposition), ProxyError> {
    let outbound = state.director.direct(&exchange.request_id, request).await?;

    // One deadline covers the response head and any body the interceptor buffers.
    let deadline = tokio::time::Instant::now() + state.upstream_timeout;
    let timed_out = |_: tokio::time::error::Elapsed| ProxyError::Timeout(state.upstream_timeout);

    let response = tokio::time::timeout_at(deadline, state.client.request(outbound))
        .await
        .map_err(timed_out)??;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    let response = Response::from_parts(parts, Body::new(body));

    tokio::time::timeout_at(deadline, state.interceptor.intercept(exchange, response))
        .await
        .map_err(timed_out)?
}
