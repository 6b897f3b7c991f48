//! Products API and products page.
//!
//! The JSON contract returns Shopify's `products` array untouched. The page
//! runs one fetch through [`ProductsView`] and renders whatever state it
//! lands in. A search (`q` without `refresh`) filters the list the shop last
//! fetched instead of going back to Shopify.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::ACCEPT},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use shop_catalog_core::StatusBadge;
use shop_catalog_core::catalog::view::INSTALL_ROUTE;
use shop_catalog_core::catalog::{
    FetchOutcome, ProductCard, ProductsView, ViewErrorKind, ViewState,
};
use tracing::instrument;

use super::MetaRefresh;
use crate::error::{AppError, MISSING_SHOP, Result};
use crate::sessions::{ApiCredentials, shop_key};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub shop: Option<String>,
    /// Search term for the page; ignored by the JSON contract.
    pub q: Option<String>,
    /// Present on refresh and retry links: fetch again even when searching.
    pub refresh: Option<String>,
}

/// Backend routes: `/products` negotiates, `/api/products` is always JSON.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products))
        .route("/api/products", get(products_json))
}

/// Frontend origin routes: `/products` is always the page.
pub fn frontend_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products_page))
        .route("/api/products", get(products_json))
}

async fn credentials_for(state: &AppState, shop: Option<&str>) -> Result<ApiCredentials> {
    let shop = shop
        .map(shop_key)
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingParameter(MISSING_SHOP))?;

    let record = state
        .sessions()
        .get(&shop)
        .await?
        .ok_or(AppError::SessionNotFound)?;
    Ok(record.credentials())
}

/// Look up the shop's session and fetch its products.
///
/// # Errors
///
/// - `MissingParameter` if `shop` is absent or empty
/// - `SessionNotFound` if the Session Map has no record for the shop
/// - `Upstream` if the Admin API call fails
pub async fn load_products(state: &AppState, shop: Option<&str>) -> Result<Vec<Value>> {
    let credentials = credentials_for(state, shop).await?;
    Ok(state.store_api().list_products(&credentials).await?)
}

/// Products for the page. With `reuse`, the shop's last fetched list is
/// filtered again instead of calling Shopify.
async fn page_products(state: &AppState, shop: &str, reuse: bool) -> Result<Vec<Value>> {
    let credentials = credentials_for(state, Some(shop)).await?;

    let cached = if reuse {
        state.catalogs().get(&credentials.shop).await
    } else {
        None
    };
    if let Some(products) = cached {
        tracing::debug!(shop = %credentials.shop, "Searching cached products");
        return Ok(Vec::clone(&products));
    }

    let products = state.store_api().list_products(&credentials).await?;
    state
        .catalogs()
        .insert(credentials.shop.clone(), Arc::new(products.clone()))
        .await;
    Ok(products)
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// GET /products - JSON for API clients, the page for browser navigations.
#[instrument(skip(state, headers))]
pub async fn products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProductsQuery>,
) -> Response {
    if wants_html(&headers) {
        return render_page(&state, query).await;
    }
    match load_products(&state, query.shop.as_deref()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/products - JSON only.
#[instrument(skip(state))]
pub async fn products_json(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<Value>>> {
    Ok(Json(load_products(&state, query.shop.as_deref()).await?))
}

/// GET /products on the frontend origin.
#[instrument(skip(state))]
pub async fn products_page(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    render_page(&state, query).await
}

async fn render_page(state: &AppState, query: ProductsQuery) -> Response {
    let Some(shop) = query
        .shop
        .as_deref()
        .map(shop_key)
        .filter(|s| !s.is_empty())
    else {
        return Redirect::to(INSTALL_ROUTE).into_response();
    };
    let reuse = query.q.is_some() && query.refresh.is_none();

    let mut view = ProductsView::new();
    view.set_search(query.q.unwrap_or_default());

    if let Some(ticket) = view.fetch() {
        let outcome = match page_products(state, &shop, reuse).await {
            Ok(products) => FetchOutcome::Loaded(products),
            Err(AppError::SessionNotFound) => FetchOutcome::Unauthorized,
            Err(e) => {
                tracing::error!(error = %e, shop = %shop, "Products page fetch failed");
                FetchOutcome::Failed
            }
        };
        view.resolve(ticket, outcome);
    }

    let status = match view.state() {
        ViewState::Error(ViewErrorKind::SessionExpired) => StatusCode::UNAUTHORIZED,
        ViewState::Error(ViewErrorKind::FetchFailed) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };

    (status, ProductsTemplate::from_view(&view, shop)).into_response()
}

/// One product card, ready to print.
#[derive(Debug, Clone)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    pub image: String,
    pub badge: Option<StatusBadge>,
    pub price: String,
    pub extra_variants: Option<String>,
    pub stock: Option<String>,
}

impl From<&ProductCard> for CardView {
    fn from(card: &ProductCard) -> Self {
        Self {
            id: card.id_text(),
            title: card.title().to_string(),
            vendor: card.vendor_label().to_string(),
            product_type: card.type_label().to_string(),
            image: card.image_src().to_string(),
            badge: card.status_badge(),
            price: card.price_label(),
            extra_variants: card.extra_variants_label(),
            stock: card.stock_label(),
        }
    }
}

/// Products page template.
#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub shop: Option<String>,
    pub refresh: Option<MetaRefresh>,
    pub shop_value: String,
    pub search: String,
    pub total: usize,
    pub cards: Vec<CardView>,
    pub error: Option<&'static str>,
    /// Link that fetches again (refresh and "Try Again").
    pub reload_url: String,
}

impl ProductsTemplate {
    fn from_view(view: &ProductsView, shop: String) -> Self {
        let error = match view.state() {
            ViewState::Error(kind) => Some(kind.message()),
            _ => None,
        };

        let mut reload_url = format!("/products?shop={}", urlencoding::encode(&shop));
        if !view.search().is_empty() {
            reload_url.push_str("&q=");
            reload_url.push_str(&urlencoding::encode(view.search()));
        }
        reload_url.push_str("&refresh=1");

        Self {
            refresh: view.pending_redirect().map(MetaRefresh::from),
            shop_value: shop.clone(),
            shop: Some(shop),
            search: view.search().to_string(),
            total: view.total(),
            cards: view.visible().into_iter().map(CardView::from).collect(),
            error,
            reload_url,
        }
    }
}
