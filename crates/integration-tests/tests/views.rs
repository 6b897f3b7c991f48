//! Install form, products page, bridge page and the static shell.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{StatusCode, header};
use serde_json::json;
use shop_catalog_integration_tests::{
    APP_URL, SHOP, TestApp, body_text, get, location, products_fixture,
};
use shop_catalog_server::config::AppEnvironment;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HTML: (&str, &str) = ("accept", "text/html,application/xhtml+xml,*/*;q=0.8");

async fn app_with_products(environment: AppEnvironment) -> (TestApp, MockServer) {
    let shopify = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2025-01/products.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "products": products_fixture() })),
        )
        .mount(&shopify)
        .await;

    let app = TestApp::spawn(environment, &shopify).await;
    app.seed_session(SHOP, "shpat_acme").await;
    (app, shopify)
}

mod install {
    use super::*;

    #[tokio::test]
    async fn test_form_is_served_at_root() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Development, &shopify).await;

        for router in [&app.backend, &app.frontend] {
            let response = get(router, "/", &[]).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_text(response).await;
            assert!(body.contains("Install Shopify App"));
            assert!(body.contains(r#"action="/install""#));
            assert!(body.contains(".myshopify.com"));
        }
    }

    #[tokio::test]
    async fn test_install_redirects_to_backend_auth() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Development, &shopify).await;

        for input in ["my-store", "my-store.myshopify.com", "  my-store  "] {
            let uri = format!("/install?shop={}", urlencoding_like(input));
            let response = get(&app.frontend, &uri, &[]).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{input}");
            assert_eq!(
                location(&response),
                "http://localhost:3000/auth?shop=my-store.myshopify.com"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_input_shows_error() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;

        let response = get(&app.backend, "/install?shop=", &[]).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(response).await;
        assert!(body.contains("Please enter your shop domain"));
    }

    fn urlencoding_like(input: &str) -> String {
        input.replace(' ', "%20")
    }
}

mod products_page {
    use super::*;

    #[tokio::test]
    async fn test_page_lists_products() {
        let (app, _shopify) = app_with_products(AppEnvironment::Production).await;

        let response = get(&app.backend, &format!("/products?shop={SHOP}"), &[HTML]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let body = body_text(response).await;
        assert!(body.contains("Products (2)"));
        assert!(body.contains(&format!("Shop: {SHOP}")));
        assert!(body.contains("Red Shirt"));
        assert!(body.contains("Blue Hat"));
        assert!(body.contains("$19.50"));
        assert!(body.contains("+1 variants"));
        assert!(body.contains("Stock: 7"));
        assert!(body.contains("No variants"));
        assert!(body.contains("https://cdn.shopify.com/red.png"));
    }

    #[tokio::test]
    async fn test_search_filters_cards_not_total() {
        let (app, _shopify) = app_with_products(AppEnvironment::Production).await;

        let uri = format!("/products?shop={SHOP}&q=RED");
        let body = body_text(get(&app.backend, &uri, &[HTML]).await).await;
        assert!(body.contains("Products (2)"));
        assert!(body.contains("Red Shirt"));
        assert!(!body.contains("Blue Hat"));

        let uri = format!("/products?shop={SHOP}&q=nothing-matches");
        let body = body_text(get(&app.backend, &uri, &[HTML]).await).await;
        assert!(body.contains("No products found matching your search."));
    }

    #[tokio::test]
    async fn test_unknown_shop_shows_session_expired() {
        let (app, _shopify) = app_with_products(AppEnvironment::Production).await;

        let response = get(
            &app.backend,
            "/products?shop=other.myshopify.com",
            &[HTML],
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_text(response).await;
        assert!(body.contains("Session expired. Please reinstall the app."));
        assert!(body.contains(r#"http-equiv="refresh" content="3;url=/""#));
        assert!(!body.contains("Try Again"));
    }

    #[tokio::test]
    async fn test_upstream_failure_offers_retry() {
        let shopify = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&shopify)
            .await;
        let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;
        app.seed_session(SHOP, "shpat_acme").await;

        let response = get(&app.backend, &format!("/products?shop={SHOP}"), &[HTML]).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("Failed to fetch products. Please try again."));
        assert!(body.contains("Try Again"));
        assert!(!body.contains("http-equiv=\"refresh\""));
    }

    #[tokio::test]
    async fn test_page_without_shop_goes_to_install() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let response = get(&app.frontend, "/products", &[]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_search_reuses_loaded_catalog() {
        let shopify = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2025-01/products.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "products": products_fixture() })),
            )
            .expect(1)
            .mount(&shopify)
            .await;
        let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;
        app.seed_session(SHOP, "shpat_acme").await;

        let response = get(&app.backend, &format!("/products?shop={SHOP}"), &[HTML]).await;
        assert_eq!(response.status(), StatusCode::OK);

        for term in ["r", "re", "red"] {
            let uri = format!("/products?shop={SHOP}&q={term}");
            let body = body_text(get(&app.backend, &uri, &[HTML]).await).await;
            assert!(body.contains("Red Shirt"), "{term}");
            assert!(!body.contains("Blue Hat"), "{term}");
        }
    }

    #[tokio::test]
    async fn test_refresh_fetches_again() {
        let (app, shopify) = app_with_products(AppEnvironment::Production).await;

        let uri = format!("/products?shop={SHOP}&q=red");
        let body = body_text(get(&app.backend, &uri, &[HTML]).await).await;
        assert!(body.contains("refresh=1"));

        let uri = format!("/products?shop={SHOP}&q=red&refresh=1");
        let response = get(&app.backend, &uri, &[HTML]).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(shopify.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shop_lookup_ignores_case_and_whitespace() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let response = get(
            &app.backend,
            "/api/products?shop=Acme.myshopify.com",
            &[],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(
            &app.backend,
            "/products?shop=%20ACME.myshopify.com%20",
            &[HTML],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(&format!("Shop: {SHOP}")));

        let body = body_text(
            get(&app.frontend, "/auth/callback?shop=ACME.myshopify.com", &[]).await,
        )
        .await;
        assert!(body.contains("Authentication successful! Redirecting to products..."));
    }

    #[tokio::test]
    async fn test_frontend_page_needs_no_accept_header() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let response = get(&app.frontend, &format!("/products?shop={SHOP}"), &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Products (2)"));
    }
}

mod bridge {
    use super::*;

    #[tokio::test]
    async fn test_session_found_heads_to_products() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let response = get(&app.frontend, &format!("/auth/callback?shop={SHOP}"), &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Authentication successful! Redirecting to products..."));
        assert!(body.contains(&format!(
            r#"http-equiv="refresh" content="2;url=/products?shop={SHOP}""#
        )));
    }

    #[tokio::test]
    async fn test_missing_shop_returns_to_install() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let body = body_text(get(&app.frontend, "/auth/callback", &[]).await).await;
        assert!(body.contains("Authentication failed: Missing shop parameter"));
        assert!(body.contains(r#"http-equiv="refresh" content="3;url=/""#));
    }

    #[tokio::test]
    async fn test_absent_session_returns_to_install() {
        let (app, _shopify) = app_with_products(AppEnvironment::Development).await;

        let body = body_text(
            get(
                &app.frontend,
                "/auth/callback?shop=other.myshopify.com",
                &[],
            )
            .await,
        )
        .await;
        assert!(body.contains("Authentication failed. Redirecting to install page..."));
        assert!(body.contains(r#"http-equiv="refresh" content="3;url=/""#));
    }
}

mod shell {
    use super::*;

    #[tokio::test]
    async fn test_assets_and_fallback() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Development, &shopify).await;

        for router in [&app.backend, &app.frontend] {
            let response = get(router, "/static/css/app.css", &[]).await;
            assert_eq!(response.status(), StatusCode::OK);

            let response = get(router, "/css/app.css", &[]).await;
            assert_eq!(response.status(), StatusCode::OK);

            let response = get(router, "/settings/unknown", &[]).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/");

            let response = get(router, "/api/unknown", &[]).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;

        let response = get(&app.backend, "/health", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");

        let response = get(&app.backend, "/health/ready", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_every_response_carries_headers() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Production, &shopify).await;

        let response = get(&app.backend, "/health", &[("x-request-id", "req-123")]).await;
        let headers = response.headers();
        assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));

        let response = get(&app.backend, "/api/products", &[]).await;
        let generated = response.headers().get("x-request-id").unwrap();
        assert!(!generated.is_empty());
    }

    #[tokio::test]
    async fn test_install_form_may_post_to_backend_origin() {
        let shopify = MockServer::start().await;
        let app = TestApp::spawn(AppEnvironment::Development, &shopify).await;

        let response = get(&app.frontend, "/", &[]).await;
        let csp = response
            .headers()
            .get(header::CONTENT_SECURITY_POLICY)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(csp.contains(&format!("form-action 'self' {APP_URL} https:")));
    }
}
