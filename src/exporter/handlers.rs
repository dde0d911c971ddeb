use crate::built_info;
use crate::collectors::registry::CollectorRegistry;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

#[derive(Serialize)]
struct Health<'a> {
    status: &'static str,
    version: &'static str,
    commit: Option<&'static str>,
    target: &'a str,
    name: &'a str,
    last_scrape: Option<String>,
    last_success: Option<String>,
    last_error: Option<String>,
}

pub async fn metrics(State(registry): State<Arc<CollectorRegistry>>) -> Response {
    match registry.render().await {
        Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

/// Reports the outcome of the last cycle; never starts one.
#[allow(clippy::unused_async)]
pub async fn health(State(registry): State<Arc<CollectorRegistry>>) -> Response {
    let status = registry.status();

    let state = match (status.last_scrape, status.up) {
        (None, _) => "starting",
        (Some(_), true) => "ok",
        (Some(_), false) => "degraded",
    };

    Json(Health {
        status: state,
        version: built_info::PKG_VERSION,
        commit: built_info::GIT_COMMIT_HASH_SHORT,
        target: registry.addr(),
        name: registry.name(),
        last_scrape: status.last_scrape.map(|t| t.to_rfc3339()),
        last_success: status.last_success.map(|t| t.to_rfc3339()),
        last_error: status.last_error.clone(),
    })
    .into_response()
}

#[allow(clippy::unused_async)]
pub async fn root() -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Redis Exporter</title></head>\n<body>\n\
         <h1>Redis Exporter {}</h1>\n\
         <p><a href=\"/metrics\">Metrics</a></p>\n\
         <p><a href=\"/health\">Health</a></p>\n\
         </body>\n</html>\n",
        built_info::PKG_VERSION
    ))
}
