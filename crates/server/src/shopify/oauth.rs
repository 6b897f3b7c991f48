use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use shop_catalog_core::ShopDomain;
use tracing::instrument;
use url::Url;

use super::{AuthError, AuthRedirect, AuthorizationService, CallbackParams, shop_base_url};
use crate::config::ShopifyAppConfig;
use crate::sessions::{SessionRecord, SessionStore};

type HmacSha256 = Hmac<Sha256>;

/// Shopify OAuth for an offline (per-shop) access token.
///
/// Completed sessions are written to the offline session storage before
/// they are returned to the caller.
#[derive(Clone)]
pub struct ShopifyOAuth {
    inner: Arc<ShopifyOAuthInner>,
}

struct ShopifyOAuthInner {
    client: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    scopes: Vec<String>,
    redirect_uri: String,
    api_origin: Option<Url>,
    storage: Arc<dyn SessionStore>,
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

impl ShopifyOAuth {
    /// Create the OAuth client.
    ///
    /// `redirect_uri` is where Shopify sends the merchant back to
    /// (`<app_url>/auth/callback`).
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        config: &ShopifyAppConfig,
        redirect_uri: String,
        storage: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ShopifyOAuthInner {
                client,
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                scopes: config.scopes.clone(),
                redirect_uri,
                api_origin: config.api_origin.clone(),
                storage,
            }),
        }
    }

    /// Generate the OAuth authorization URL.
    ///
    /// The empty `grant_options[]` requests an offline token.
    #[must_use]
    pub fn authorization_url(&self, shop: &ShopDomain, state: &str) -> String {
        let scope = self.inner.scopes.join(",");
        format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}&grant_options[]=",
            shop,
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.inner.redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Exchange` on a non-success status or an
    /// unreadable body, and `AuthError::Http` if the request fails.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<SessionRecord, AuthError> {
        let url = format!(
            "{}/admin/oauth/access_token",
            shop_base_url(self.inner.api_origin.as_ref(), shop.as_str())
        );

        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("status {status}: {text}")));
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("invalid token response: {e}")))?;

        let scope = token
            .scope
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(SessionRecord::offline(
            shop.as_str(),
            SecretString::from(token.access_token),
            scope,
        ))
    }
}

#[async_trait]
impl AuthorizationService for ShopifyOAuth {
    fn begin(&self, shop: &ShopDomain, state: &str) -> Result<AuthRedirect, AuthError> {
        Ok(AuthRedirect {
            url: self.authorization_url(shop, state),
        })
    }

    #[instrument(skip(self, params, expected_state), fields(shop = ?params.get("shop")))]
    async fn complete_callback(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<SessionRecord, AuthError> {
        if let Some(error) = params.get("error") {
            let description = params.get("error_description").unwrap_or_default();
            return Err(AuthError::Denied(format!("{error} {description}").trim().to_string()));
        }

        if !verify_hmac(params, self.inner.api_secret.expose_secret()) {
            return Err(AuthError::InvalidHmac);
        }

        match (params.get("state"), expected_state) {
            (Some(received), Some(expected)) if received == expected => {}
            _ => return Err(AuthError::InvalidState),
        }

        let shop = ShopDomain::parse(params.get("shop").unwrap_or_default())?;

        let code = params
            .get("code")
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let record = self.exchange_code(&shop, code).await?;

        self.inner.storage.put(&record.shop, record.clone()).await?;

        tracing::info!(shop = %record.shop, "Completed Shopify OAuth");
        Ok(record)
    }
}

/// Hex HMAC-SHA256 of `message` under `secret`.
#[must_use]
pub fn hmac_hex(secret: &str, message: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the `hmac` parameter of an OAuth callback.
///
/// The comparison runs in constant time.
#[must_use]
pub fn verify_hmac(params: &CallbackParams, secret: &str) -> bool {
    let Some(provided) = params.get("hmac") else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(params.signing_message().as_bytes());
    mac.verify_slice(&provided).is_ok()
}
