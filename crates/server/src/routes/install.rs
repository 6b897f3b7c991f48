//! Install page: collects the shop domain and hands off to OAuth.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use shop_catalog_core::{install_redirect_url, normalize_shop_input};
use tracing::instrument;

use super::MetaRefresh;
use crate::state::AppState;

/// Install form template.
#[derive(Template, WebTemplate)]
#[template(path = "install.html")]
pub struct InstallTemplate {
    pub shop: Option<String>,
    pub refresh: Option<MetaRefresh>,
    pub value: String,
    pub error: Option<String>,
}

impl InstallTemplate {
    fn new(value: String, error: Option<String>) -> Self {
        Self {
            shop: None,
            refresh: None,
            value,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub shop: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(install_page))
        .route("/install", get(install))
}

/// GET / - Install form.
pub async fn install_page() -> InstallTemplate {
    InstallTemplate::new(String::new(), None)
}

/// GET /install - Normalize the shop and navigate to the backend's `/auth`.
#[instrument(skip(state))]
pub async fn install(
    State(state): State<AppState>,
    Query(query): Query<InstallQuery>,
) -> Response {
    let raw = query.shop.unwrap_or_default();

    match normalize_shop_input(&raw) {
        Ok(shop) => {
            let target = install_redirect_url(&state.config().backend_url, &shop);
            Redirect::to(&target).into_response()
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            InstallTemplate::new(raw, Some(e.to_string())),
        )
            .into_response(),
    }
}
