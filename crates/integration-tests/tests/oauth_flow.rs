//! OAuth begin and callback through the real router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use secrecy::ExposeSecret;
use serde_json::json;
use shop_catalog_core::ShopDomain;
use shop_catalog_integration_tests::{
    API_KEY, FRONTEND_URL, SHOP, TestApp, body_text, get, location, products_fixture,
    session_cookie, signed_callback_query, test_config, test_pool,
};
use shop_catalog_server::config::AppEnvironment;
use shop_catalog_server::sessions::{MemorySessionStore, SessionRecord, SessionStore};
use shop_catalog_server::shopify::{
    AuthError, AuthRedirect, AuthorizationService, CallbackParams, RestClient, http_client,
};
use shop_catalog_server::state::AppState;
use url::Url;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Authorization service that only counts how often it is asked.
#[derive(Default)]
struct CountingAuth {
    begins: AtomicUsize,
}

#[async_trait]
impl AuthorizationService for CountingAuth {
    fn begin(&self, shop: &ShopDomain, state: &str) -> Result<AuthRedirect, AuthError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(AuthRedirect {
            url: format!("https://{shop}/admin/oauth/authorize?state={state}"),
        })
    }

    async fn complete_callback(
        &self,
        _params: &CallbackParams,
        _expected_state: Option<&str>,
    ) -> Result<SessionRecord, AuthError> {
        Err(AuthError::InvalidHmac)
    }
}

async fn counting_app() -> (TestApp, Arc<CountingAuth>) {
    let config = test_config(AppEnvironment::Production, None);
    let client = http_client(&config.shopify).unwrap();
    let store_api = RestClient::new(client, &config.shopify);
    let auth = Arc::new(CountingAuth::default());

    let state = AppState::from_parts(
        config,
        test_pool().await,
        Arc::new(MemorySessionStore::new()),
        auth.clone(),
        Arc::new(store_api),
    );
    (TestApp::from_state(state).await, auth)
}

async fn mount_token_exchange(shopify: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .and(body_string_contains(format!("client_id={API_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "scope": "read_products,write_products"
        })))
        .mount(shopify)
        .await;
}

/// Run `/auth` for `shop` and return the session cookie and issued state.
async fn begin(app: &TestApp, shop: &str) -> (String, String) {
    let response = get(&app.backend, &format!("/auth?shop={shop}"), &[]).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let cookie = session_cookie(&response).expect("session cookie");
    let authorize = Url::parse(&location(&response)).unwrap();
    let state = authorize
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter");
    (cookie, state)
}

#[tokio::test]
async fn test_auth_without_shop_is_400_and_never_begins() {
    let (app, auth) = counting_app().await;

    for uri in ["/auth", "/auth?shop="] {
        let response = get(&app.backend, uri, &[]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Missing shop parameter ?shop=your-shop.myshopify.com"
        );
    }

    assert_eq!(auth.begins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auth_with_invalid_shop_is_500() {
    let (app, auth) = counting_app().await;

    let response = get(&app.backend, "/auth?shop=evil.example.com", &[]).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Auth initiation failed");
    assert_eq!(auth.begins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auth_redirects_to_shopify_authorize() {
    let shopify = MockServer::start().await;
    let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;

    let response = get(&app.backend, &format!("/auth?shop={SHOP}"), &[]).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(session_cookie(&response).is_some());

    let authorize = Url::parse(&location(&response)).unwrap();
    assert_eq!(authorize.host_str(), Some(SHOP));
    assert_eq!(authorize.path(), "/admin/oauth/authorize");

    let pairs: Vec<(String, String)> = authorize.query_pairs().into_owned().collect();
    let param = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(param("client_id").as_deref(), Some(API_KEY));
    assert_eq!(
        param("scope").as_deref(),
        Some("read_products,write_products")
    );
    assert_eq!(
        param("redirect_uri").as_deref(),
        Some("http://localhost:3000/auth/callback")
    );
    let state = param("state").unwrap();
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_callback_establishes_session_in_production() {
    let shopify = MockServer::start().await;
    mount_token_exchange(&shopify, "shpat_acme").await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2025-01/products.json"))
        .and(header_matcher("X-Shopify-Access-Token", "shpat_acme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "products": products_fixture() })),
        )
        .mount(&shopify)
        .await;

    let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;
    let (cookie, state) = begin(&app, SHOP).await;

    let query = signed_callback_query(&[
        ("code", "auth-code-1"),
        ("shop", SHOP),
        ("state", &state),
        ("timestamp", "1700000000"),
    ]);
    let response = get(
        &app.backend,
        &format!("/auth/callback?{query}"),
        &[(header::COOKIE.as_str(), &cookie)],
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/products?shop={SHOP}"));

    let record = app.state.sessions().get(SHOP).await.unwrap().unwrap();
    assert_eq!(record.id, format!("offline_{SHOP}"));
    assert_eq!(record.access_token.expose_secret(), "shpat_acme");

    let persisted = app.state.offline_sessions().get(SHOP).await.unwrap();
    assert!(persisted.is_some());

    // The session now serves products for S, and only S.
    let response = get(&app.backend, &format!("/products?shop={SHOP}"), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app.backend, "/products?shop=other.myshopify.com", &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_redirects_to_frontend_in_development() {
    let shopify = MockServer::start().await;
    mount_token_exchange(&shopify, "shpat_dev").await;

    let app = TestApp::spawn(AppEnvironment::Development, &shopify).await;
    let (cookie, state) = begin(&app, SHOP).await;

    let query = signed_callback_query(&[("code", "c"), ("shop", SHOP), ("state", &state)]);
    let response = get(
        &app.backend,
        &format!("/auth/callback?{query}"),
        &[(header::COOKIE.as_str(), &cookie)],
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{FRONTEND_URL}/auth/callback?shop={SHOP}")
    );
}

#[tokio::test]
async fn test_callback_with_bad_hmac_writes_nothing() {
    let shopify = MockServer::start().await;
    mount_token_exchange(&shopify, "shpat_never").await;

    let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;
    let (cookie, state) = begin(&app, SHOP).await;

    let uri = format!("/auth/callback?code=c&shop={SHOP}&state={state}&hmac=deadbeef");
    let response = get(&app.backend, &uri, &[(header::COOKIE.as_str(), &cookie)]).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Authentication failed");
    assert!(app.state.sessions().get(SHOP).await.unwrap().is_none());
}

#[tokio::test]
async fn test_callback_state_is_single_use() {
    let shopify = MockServer::start().await;
    mount_token_exchange(&shopify, "shpat_once").await;

    let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;
    let (cookie, state) = begin(&app, SHOP).await;
    let query = signed_callback_query(&[("code", "c"), ("shop", SHOP), ("state", &state)]);
    let uri = format!("/auth/callback?{query}");

    let first = get(&app.backend, &uri, &[(header::COOKIE.as_str(), &cookie)]).await;
    assert_eq!(first.status(), StatusCode::FOUND);

    let replay = get(&app.backend, &uri, &[(header::COOKIE.as_str(), &cookie)]).await;
    assert_eq!(replay.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_callback_without_begin_fails() {
    let shopify = MockServer::start().await;
    let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;

    let query = signed_callback_query(&[("code", "c"), ("shop", SHOP), ("state", "forged")]);
    let response = get(&app.backend, &format!("/auth/callback?{query}"), &[]).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.state.sessions().get(SHOP).await.unwrap().is_none());
}
