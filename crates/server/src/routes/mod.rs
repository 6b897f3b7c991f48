//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Backend (CATALOG_PORT)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (SQLite reachable)
//! GET  /                       - Install form
//! GET  /install                - Normalize shop, redirect to /auth
//! GET  /auth                   - Start Shopify OAuth
//! GET  /auth/callback          - Complete Shopify OAuth
//! GET  /products               - Products JSON, or the products page for browsers
//! GET  /api/products           - Products JSON
//! GET  /static/*               - Shell assets
//! GET  *                       - Shell fallback, else redirect to /
//!
//! # Frontend origin (development only, CATALOG_FRONTEND_PORT)
//! GET  /                       - Install form
//! GET  /install                - Normalize shop, redirect to backend /auth
//! GET  /auth/callback          - Bridge page after OAuth
//! GET  /products               - Products page
//! GET  /api/products           - Products JSON
//! GET  /static/*               - Shell assets
//! GET  *                       - Shell fallback, else redirect to /
//! ```

use axum::{Router, routing::get};
use tower_http::services::ServeDir;

use crate::state::AppState;

pub mod auth;
pub mod bridge;
pub mod health;
pub mod install;
pub mod products;
pub mod shell;

/// `<meta http-equiv="refresh">` target for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRefresh {
    pub seconds: u64,
    pub url: String,
}

impl From<&shop_catalog_core::catalog::ScheduledRedirect> for MetaRefresh {
    fn from(redirect: &shop_catalog_core::catalog::ScheduledRedirect) -> Self {
        Self {
            seconds: redirect.refresh_seconds(),
            url: redirect.to.clone(),
        }
    }
}

/// Routes served on the backend origin.
pub fn backend_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(install::router())
        .merge(auth::router())
        .merge(products::router())
        .nest_service("/static", ServeDir::new(&state.config().static_dir))
        .fallback(shell::fallback)
}

/// Routes served on the development frontend origin.
pub fn frontend_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(install::router())
        .merge(bridge::router())
        .merge(products::frontend_router())
        .nest_service("/static", ServeDir::new(&state.config().static_dir))
        .fallback(shell::fallback)
}
