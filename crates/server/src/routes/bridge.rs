//! Post-OAuth bridge page on the development frontend origin.
//!
//! The backend's callback lands here with `?shop=`. The page reports whether
//! a session now exists and schedules the next navigation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use shop_catalog_core::catalog::{BridgeOutcome, resolve_bridge};
use tracing::instrument;

use super::MetaRefresh;
use crate::sessions::shop_key;
use crate::state::AppState;

/// Bridge page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth_callback.html")]
pub struct AuthCallbackTemplate {
    pub shop: Option<String>,
    pub refresh: Option<MetaRefresh>,
    pub status: &'static str,
    pub authenticated: bool,
    pub next_url: String,
}

impl AuthCallbackTemplate {
    fn new(shop: Option<String>, outcome: &BridgeOutcome) -> Self {
        Self {
            shop,
            refresh: Some(MetaRefresh::from(&outcome.redirect)),
            status: outcome.status,
            authenticated: outcome.authenticated,
            next_url: outcome.redirect.to.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BridgeQuery {
    pub shop: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/callback", get(auth_callback))
}

/// GET /auth/callback on the frontend origin.
#[instrument(skip(state))]
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<BridgeQuery>,
) -> AuthCallbackTemplate {
    let shop = query
        .shop
        .as_deref()
        .map(shop_key)
        .filter(|s| !s.is_empty());

    let session_found = match shop.as_deref() {
        Some(shop) => match state.sessions().get(shop).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed on bridge page");
                false
            }
        },
        None => false,
    };

    let outcome = resolve_bridge(shop.as_deref(), session_found);
    AuthCallbackTemplate::new(shop, &outcome)
}
