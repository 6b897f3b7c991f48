//! Shopify collaborators: the OAuth authorization server and the Admin REST API.
//!
//! # Architecture
//!
//! - [`AuthorizationService`] starts and completes the OAuth handshake
//!   ([`ShopifyOAuth`] is the concrete implementation)
//! - [`StoreApiClient`] reads from the Admin API on behalf of a shop
//!   ([`RestClient`] is the concrete implementation)
//! - Both share one `reqwest::Client` built by [`http_client`]
//!
//! Handlers depend on the traits only, so tests can swap either side.
//!
//! # Origin override
//!
//! When `SHOPIFY_API_ORIGIN` is set, every server-to-server call that would
//! go to `https://<shop>` goes to that origin instead. The browser-facing
//! authorize URL always points at the real shop.

mod oauth;
mod rest;

pub use oauth::{ShopifyOAuth, hmac_hex, verify_hmac};
pub use rest::RestClient;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use shop_catalog_core::{ShopDomain, ShopDomainError};
use thiserror::Error;
use url::Url;

use crate::config::ShopifyAppConfig;
use crate::sessions::{ApiCredentials, SessionRecord, SessionStoreError};

/// Errors from the OAuth handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The merchant declined, or Shopify returned an error.
    #[error("authorization denied: {0}")]
    Denied(String),

    /// The callback signature did not verify.
    #[error("invalid HMAC signature")]
    InvalidHmac,

    /// The callback `state` did not match the nonce issued at begin.
    #[error("OAuth state mismatch")]
    InvalidState,

    /// The shop is not a valid `*.myshopify.com` domain.
    #[error("invalid shop: {0}")]
    InvalidShop(#[from] ShopDomainError),

    /// The callback carried no authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// The code-for-token exchange failed.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// The OAuth `state` nonce could not be kept for the callback.
    #[error("failed to persist OAuth state: {0}")]
    Nonce(String),

    /// The completed session could not be written to storage.
    #[error("session storage error: {0}")]
    Storage(#[from] SessionStoreError),

    /// HTTP request to Shopify failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the Admin REST API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (transport or body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify answered with a non-success status.
    #[error("Shopify returned {status}")]
    Status { status: u16 },

    /// The response body had no `products` array.
    #[error("response has no products array")]
    MissingProducts,
}

/// Where to send the merchant to grant access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    pub url: String,
}

/// Raw query parameters of an OAuth callback.
///
/// Kept as an ordered map so the HMAC message can be rebuilt from every
/// parameter Shopify sent, not just the known ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams(BTreeMap<String, String>);

impl CallbackParams {
    #[must_use]
    pub const fn new(params: BTreeMap<String, String>) -> Self {
        Self(params)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `k=v` pairs sorted by key and joined with `&`, excluding `hmac` and
    /// `signature`.
    #[must_use]
    pub fn signing_message(&self) -> String {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != "hmac" && k.as_str() != "signature")
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The OAuth half of the Shopify app.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Build the authorize URL for `shop`, carrying the `state` nonce.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the redirect cannot be built.
    fn begin(&self, shop: &ShopDomain, state: &str) -> Result<AuthRedirect, AuthError>;

    /// Validate a callback, exchange its code and persist the session.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an `AuthError`.
    async fn complete_callback(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<SessionRecord, AuthError>;
}

/// Read access to a shop's Admin API.
#[async_trait]
pub trait StoreApiClient: Send + Sync {
    /// Fetch the shop's products as returned by Shopify.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` on transport failure, a non-success status or
    /// a body without `products`.
    async fn list_products(&self, credentials: &ApiCredentials)
    -> Result<Vec<Value>, UpstreamError>;
}

/// Build the HTTP client shared by the OAuth and REST clients.
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialized.
pub fn http_client(config: &ShopifyAppConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("shop-catalog/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Base URL for server-to-server calls about `shop`.
fn shop_base_url(origin: Option<&Url>, shop: &str) -> String {
    origin.map_or_else(
        || format!("https://{shop}"),
        |origin| origin.as_str().trim_end_matches('/').to_string(),
    )
}
