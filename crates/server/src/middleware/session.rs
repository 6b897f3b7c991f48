//! Session middleware configuration.
//!
//! The cookie session only carries the OAuth `state` nonce between
//! `/auth` and `/auth/callback`. It is backed by `SQLite` on the same pool
//! as the offline session storage.

use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shop_catalog_session";

/// Session expiry time in seconds (1 hour, long enough to finish OAuth).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the `SQLite` session store and apply its migration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the session table cannot be created.
pub async fn create_session_store(pool: &SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Create the session layer.
///
/// `SameSite=Lax` so the cookie survives the top-level redirect back from
/// Shopify.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &AppConfig,
) -> SessionManagerLayer<SqliteStore> {
    let is_secure = config.app_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
