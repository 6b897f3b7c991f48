//! Shopify OAuth routes.
//!
//! `/auth` issues a single-use `state` nonce, keeps it in the cookie session
//! and sends the merchant to Shopify. `/auth/callback` consumes the nonce,
//! lets the authorization service validate the callback and exchange the
//! code, then records the session in the Session Map.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use shop_catalog_core::ShopDomain;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, MISSING_SHOP_AUTH, Result};
use crate::shopify::{AuthError, CallbackParams};
use crate::state::AppState;

/// Session key holding the OAuth `state` nonce between begin and callback.
pub const OAUTH_STATE_KEY: &str = "shopify_oauth_state";

/// Length of the OAuth `state` nonce.
const STATE_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub shop: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(begin))
        .route("/auth/callback", get(callback))
}

/// `302 Found` to `url`.
fn found(url: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
}

/// Random alphanumeric nonce for the OAuth `state` parameter.
fn generate_state() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// GET /auth - Start the OAuth flow.
#[instrument(skip(state, session))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<AuthQuery>,
) -> Result<Response> {
    let shop = query
        .shop
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingParameter(MISSING_SHOP_AUTH))?;

    let shop = ShopDomain::parse(&shop).map_err(|e| AppError::AuthBegin(e.into()))?;

    let nonce = generate_state();
    session
        .insert(OAUTH_STATE_KEY, &nonce)
        .await
        .map_err(|e| AppError::AuthBegin(AuthError::Nonce(e.to_string())))?;

    let redirect = state
        .oauth()
        .begin(&shop, &nonce)
        .map_err(AppError::AuthBegin)?;

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(found(redirect.url))
}

/// GET /auth/callback - Complete the OAuth flow.
#[instrument(skip(state, session, params))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response> {
    let params = CallbackParams::new(params);

    let expected: Option<String> = session
        .remove(OAUTH_STATE_KEY)
        .await
        .map_err(|e| AppError::AuthCallback(AuthError::Nonce(e.to_string())))?;

    let record = state
        .oauth()
        .complete_callback(&params, expected.as_deref())
        .await
        .map_err(AppError::AuthCallback)?;

    if record.is_storable() {
        state
            .sessions()
            .put(&record.shop, record.clone())
            .await
            .map_err(|e| AppError::AuthCallback(e.into()))?;
    }

    tracing::info!(shop = %record.shop, "Shopify session established");
    Ok(found(state.config().post_auth_redirect(&record.shop)))
}
