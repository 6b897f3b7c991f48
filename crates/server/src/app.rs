//! Router assembly shared by the binary and the integration tests.

use axum::{Router, middleware};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Span;

use crate::middleware::security_headers::content_security_policy_header;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::routes;
use crate::state::AppState;

/// The backend application: OAuth, products API, views and shell.
pub fn backend_app(state: AppState, session_layer: SessionManagerLayer<SqliteStore>) -> Router {
    let router = routes::backend_routes(&state).layer(session_layer);
    finish(router, state)
}

/// The development frontend origin: install form, bridge page, products page.
pub fn frontend_app(state: AppState) -> Router {
    let router = routes::frontend_routes(&state);
    finish(router, state)
}

fn finish(router: Router<AppState>, state: AppState) -> Router {
    let csp = content_security_policy_header(state.config());
    router
        .layer(middleware::from_fn_with_state(
            csp,
            security_headers_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
