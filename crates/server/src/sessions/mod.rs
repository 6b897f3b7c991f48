//! Shop sessions produced by OAuth, and the stores that hold them.
//!
//! - [`MemorySessionStore`] is the process-lifetime Session Map the products
//!   API reads from. It is never persisted or hydrated.
//! - [`SqliteSessionStore`] is the on-disk storage the OAuth layer writes
//!   every completed session to.
//!
//! Handlers only see `Arc<dyn SessionStore>`, injected through `AppState`.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Errors from a session store.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Authorization artifact for one shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct SessionRecord {
    /// Shop domain (e.g., my-store.myshopify.com).
    pub shop: String,
    /// Session id; offline sessions use `offline_<shop>`.
    pub id: String,
    /// Admin API access token.
    pub access_token: SecretString,
    /// Granted scopes.
    pub scope: Vec<String>,
    /// Online (per-user) or offline (per-shop) access.
    pub is_online: bool,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("shop", &self.shop)
            .field("id", &self.id)
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("is_online", &self.is_online)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

impl SessionRecord {
    /// Build an offline session for `shop`.
    #[must_use]
    pub fn offline(shop: &str, access_token: SecretString, scope: Vec<String>) -> Self {
        Self {
            shop: shop.to_string(),
            id: offline_session_id(shop),
            access_token,
            scope,
            is_online: false,
            obtained_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether this record can be keyed into the Session Map.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        !self.shop.is_empty() && !self.id.is_empty()
    }

    /// The only fields the Admin API client needs.
    #[must_use]
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            shop: self.shop.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Session Map key for a `shop` query value.
///
/// Records are stored under the lowercase domain `ShopDomain` produces, so
/// lookups trim and lowercase to match.
#[must_use]
pub fn shop_key(shop: &str) -> String {
    shop.trim().to_ascii_lowercase()
}

/// Shopify's id for the offline session of a shop.
#[must_use]
pub fn offline_session_id(shop: &str) -> String {
    format!("offline_{shop}")
}

/// What an Admin API call is authorized with.
#[derive(Clone)]
pub struct ApiCredentials {
    pub shop: String,
    pub access_token: SecretString,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Keyed storage of session records by shop domain.
///
/// `put` replaces any existing record for the shop (last write wins).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the backing storage fails.
    async fn get(&self, shop: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Store or replace the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the backing storage fails.
    async fn put(&self, shop: &str, record: SessionRecord) -> Result<(), SessionStoreError>;
}
