//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::sessions::{MemorySessionStore, SessionStore, SqliteSessionStore};
use crate::shopify::{self, AuthorizationService, RestClient, ShopifyOAuth, StoreApiClient};

/// Last product list fetched per shop, reused while the page only searches.
pub type CatalogCache = Cache<String, Arc<Vec<Value>>>;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The Shopify collaborators and the Session
/// Map are held as trait objects so tests can substitute them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: SqlitePool,
    sessions: Arc<dyn SessionStore>,
    offline_sessions: SqliteSessionStore,
    oauth: Arc<dyn AuthorizationService>,
    store_api: Arc<dyn StoreApiClient>,
    catalogs: CatalogCache,
}

impl AppState {
    /// Create the application state with the Shopify-backed collaborators.
    ///
    /// The Session Map starts empty; sessions persisted by earlier runs are
    /// not loaded into it.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(config: AppConfig, pool: SqlitePool) -> Result<Self, reqwest::Error> {
        let client = shopify::http_client(&config.shopify)?;
        let offline_sessions = SqliteSessionStore::new(pool.clone());

        let oauth = ShopifyOAuth::new(
            client.clone(),
            &config.shopify,
            config.oauth_redirect_uri(),
            Arc::new(offline_sessions.clone()),
        );
        let store_api = RestClient::new(client, &config.shopify);

        Ok(Self::from_parts(
            config,
            pool,
            Arc::new(MemorySessionStore::new()),
            Arc::new(oauth),
            Arc::new(store_api),
        ))
    }

    /// Assemble state from explicit collaborators.
    #[must_use]
    pub fn from_parts(
        config: AppConfig,
        pool: SqlitePool,
        sessions: Arc<dyn SessionStore>,
        oauth: Arc<dyn AuthorizationService>,
        store_api: Arc<dyn StoreApiClient>,
    ) -> Self {
        let offline_sessions = SqliteSessionStore::new(pool.clone());
        let catalogs = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                offline_sessions,
                oauth,
                store_api,
                catalogs,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// The in-memory Session Map read by the products API.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.inner.sessions.as_ref()
    }

    /// The on-disk session storage written by the OAuth layer.
    #[must_use]
    pub fn offline_sessions(&self) -> &SqliteSessionStore {
        &self.inner.offline_sessions
    }

    #[must_use]
    pub fn oauth(&self) -> &dyn AuthorizationService {
        self.inner.oauth.as_ref()
    }

    #[must_use]
    pub fn store_api(&self) -> &dyn StoreApiClient {
        self.inner.store_api.as_ref()
    }

    /// Product lists the products page searches over.
    #[must_use]
    pub fn catalogs(&self) -> &CatalogCache {
        &self.inner.catalogs
    }
}
