//! Security headers middleware.
//!
//! Locked down by default. Images may come from the Shopify CDN and the
//! placeholder host. Forms may target this app, the backend origin the
//! install form hands off to, and Shopify's authorize page.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::config::AppConfig;

/// Content Security Policy allowing forms to post to `form_targets`.
#[must_use]
pub fn content_security_policy(form_targets: &str) -> String {
    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' https://cdn.shopify.com https://via.placeholder.com; \
         connect-src 'self'; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self' {form_targets}; \
         frame-ancestors 'none'"
    )
}

/// The policy header for `config`.
///
/// The backend origin is listed explicitly so the development frontend can
/// hand off to a plain `http://` backend.
#[must_use]
pub fn content_security_policy_header(config: &AppConfig) -> HeaderValue {
    let backend = Url::parse(&config.backend_url)
        .map(|url| url.origin().ascii_serialization())
        .ok()
        .filter(|origin| origin != "null");
    let targets = backend.map_or_else(|| "https:".to_string(), |origin| format!("{origin} https:"));

    HeaderValue::from_str(&content_security_policy(&targets)).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Invalid backend origin in content security policy");
        HeaderValue::from_static("default-src 'none'; form-action 'self' https:; frame-ancestors 'none'")
    })
}

/// Add security headers to all responses.
pub async fn security_headers_middleware(
    State(csp): State<HeaderValue>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CONTENT_SECURITY_POLICY, csp);
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=(), interest-cohort=()",
        ),
    );

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_headers_applied() {
        let csp = HeaderValue::from_str(&content_security_policy("https:")).unwrap();
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(csp, security_headers_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store, max-age=0");
        assert!(
            headers
                .get(CONTENT_SECURITY_POLICY)
                .unwrap()
                .to_str()
                .unwrap()
                .contains("frame-ancestors 'none'")
        );
    }

    #[test]
    fn test_form_action_lists_targets() {
        let policy = content_security_policy("http://localhost:3000 https:");
        assert!(policy.contains("form-action 'self' http://localhost:3000 https:;"));
    }
}
