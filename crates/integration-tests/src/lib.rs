//! Integration test harness for Shop Catalog.
//!
//! Builds the real routers in-process and drives them with
//! `tower::ServiceExt::oneshot`. Shopify is a `wiremock` server reached
//! through the `api_origin` override, and the session database is
//! `sqlite::memory:`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-catalog-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::{Value, json};
use sha2::Sha256;
use sqlx::SqlitePool;
use tower::ServiceExt;
use url::Url;
use wiremock::MockServer;

use shop_catalog_server::config::{AppConfig, AppEnvironment, LogFormat, ShopifyAppConfig};
use shop_catalog_server::middleware::create_session_layer;
use shop_catalog_server::middleware::session::{SESSION_COOKIE_NAME, create_session_store};
use shop_catalog_server::sessions::{SessionRecord, SessionStore};
use shop_catalog_server::state::AppState;
use shop_catalog_server::{backend_app, db, frontend_app};

/// Shop used by most tests.
pub const SHOP: &str = "acme.myshopify.com";

/// App credentials shared by the harness and the signed callbacks.
pub const API_KEY: &str = "catalog-test-key";
pub const API_SECRET: &str = "shpss_f3A9kQ7mZ2xR8vL4";

pub const APP_URL: &str = "http://localhost:3000";
pub const FRONTEND_URL: &str = "http://localhost:5173";

/// Configuration pointing every per-shop call at `api_origin`.
#[must_use]
pub fn test_config(environment: AppEnvironment, api_origin: Option<&str>) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 3000,
        frontend_port: 5173,
        app_url: APP_URL.to_string(),
        backend_url: APP_URL.to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        environment,
        shopify: ShopifyAppConfig {
            api_key: API_KEY.to_string(),
            api_secret: SecretString::from(API_SECRET),
            scopes: vec!["read_products".to_string(), "write_products".to_string()],
            api_version: "2025-01".to_string(),
            api_origin: api_origin.map(|o| Url::parse(o).expect("valid origin")),
            http_timeout: Duration::from_secs(5),
        },
        session_database_url: SecretString::from("sqlite::memory:"),
        static_dir: static_dir(),
        log_format: LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The server crate's bundled shell assets.
#[must_use]
pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../server/static")
}

/// Migrated in-memory session database.
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_pool(&SecretString::from("sqlite::memory:"))
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

/// Both origins of the app sharing one state.
pub struct TestApp {
    pub backend: Router,
    pub frontend: Router,
    pub state: AppState,
}

impl TestApp {
    /// App wired to the real Shopify clients, talking to `shopify`.
    pub async fn spawn(environment: AppEnvironment, shopify: &MockServer) -> Self {
        let config = test_config(environment, Some(&shopify.uri()));
        let pool = test_pool().await;
        let state = AppState::new(config, pool).expect("app state");
        Self::from_state(state).await
    }

    /// App around an explicitly assembled state.
    pub async fn from_state(state: AppState) -> Self {
        let session_store = create_session_store(state.pool())
            .await
            .expect("session store");
        let session_layer = create_session_layer(session_store, state.config());

        Self {
            backend: backend_app(state.clone(), session_layer),
            frontend: frontend_app(state.clone()),
            state,
        }
    }

    /// Put a session for `shop` straight into the Session Map.
    pub async fn seed_session(&self, shop: &str, token: &str) {
        let record = SessionRecord::offline(shop, SecretString::from(token), Vec::new());
        self.state
            .sessions()
            .put(shop, record)
            .await
            .expect("seed session");
    }
}

/// Send one request through `router`.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible router")
}

/// `GET uri` with optional extra headers.
pub async fn get(router: &Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(router, builder.body(Body::empty()).expect("request")).await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[must_use]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// `name=value` of the session cookie set by `response`, if any.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with(SESSION_COOKIE_NAME))
        .and_then(|c| c.split(';').next())
        .map(String::from)
}

/// Callback query string for `pairs`, signed the way Shopify signs it.
#[must_use]
pub fn signed_callback_query(pairs: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = pairs.to_vec();
    sorted.sort_by_key(|(k, _)| *k);
    let message = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac = Hmac::<Sha256>::new_from_slice(API_SECRET.as_bytes()).expect("hmac key");
    mac.update(message.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        query.append_pair(k, v);
    }
    query.append_pair("hmac", &signature);
    query.finish()
}

/// A small Admin API `products` array with fields the app never reads.
#[must_use]
pub fn products_fixture() -> Value {
    json!([
        {
            "id": 632_910_392,
            "title": "Red Shirt",
            "vendor": "Acme",
            "product_type": "Shirts",
            "status": "active",
            "image": {"src": "https://cdn.shopify.com/red.png"},
            "variants": [
                {"id": 1, "price": "19.5", "inventory_quantity": 7},
                {"id": 2, "price": "21.00", "inventory_quantity": 0}
            ],
            "tags": "summer, cotton",
            "admin_graphql_api_id": "gid://shopify/Product/632910392"
        },
        {
            "id": 921_728_736,
            "title": "Blue Hat",
            "vendor": "Zenith",
            "status": "draft",
            "variants": []
        }
    ])
}
