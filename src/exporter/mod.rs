//! HTTP surface: `/metrics`, `/health` and a landing page.

mod handlers;

use crate::built_info;
use crate::collectors::{config::CollectorConfig, registry::CollectorRegistry};
use crate::redis::Target;
use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use secrecy::SecretString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};
use ulid::Ulid;

const REQUEST_ID: &str = "x-request-id";

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Start the exporter and serve until ctrl-c / SIGTERM.
///
/// # Errors
///
/// Returns an error if the target is invalid, metrics fail to register or the
/// listener cannot be bound.
pub async fn new(
    port: u16,
    listen: Option<String>,
    redis: SecretString,
    name: String,
    timeout: Duration,
    collectors: Vec<String>,
) -> Result<()> {
    let target = Target::parse(&redis, &name)?;
    let config = CollectorConfig::new().with_enabled(&collectors);

    info!(
        addr = %target.addr(),
        name = %target.name(),
        timeout_secs = timeout.as_secs(),
        collectors = ?collectors,
        "starting redis exporter"
    );

    let registry = Arc::new(CollectorRegistry::new(target, timeout, &config)?);
    let app = router(registry)?;

    let listener = bind(port, listen.as_deref()).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("exporter stopped");
    Ok(())
}

/// Routes and middleware around a shared registry.
///
/// # Errors
///
/// Returns an error if the `x-powered-by` header value cannot be built.
pub fn router(registry: Arc<CollectorRegistry>) -> Result<Router> {
    let request_id = HeaderName::from_static(REQUEST_ID);
    let powered_by = HeaderValue::from_str(&format!(
        "{} {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION
    ))?;

    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUlid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let id = request
                            .headers()
                            .get(REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default();
                        info_span!(
                            "http.request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-powered-by"),
                    powered_by,
                )),
        )
        .with_state(registry);

    Ok(app)
}

/// Bind `listen:port`, or `[::]:port` falling back to `0.0.0.0:port` when no address is given.
async fn bind(port: u16, listen: Option<&str>) -> Result<TcpListener> {
    if let Some(listen) = listen {
        let ip: IpAddr = listen
            .parse()
            .with_context(|| format!("invalid listen address: {listen}"))?;
        return TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .with_context(|| format!("failed to bind {listen}:{port}"));
    }

    match TcpListener::bind(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            warn!(error = %e, "IPv6 bind failed, falling back to 0.0.0.0");
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
                .await
                .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
