use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{StoreApiClient, UpstreamError, shop_base_url};
use crate::config::ShopifyAppConfig;
use crate::sessions::ApiCredentials;

/// Shopify Admin REST API client.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    api_version: String,
    api_origin: Option<Url>,
}

impl RestClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &ShopifyAppConfig) -> Self {
        Self {
            client,
            api_version: config.api_version.clone(),
            api_origin: config.api_origin.clone(),
        }
    }

    fn endpoint(&self, shop: &str, resource: &str) -> String {
        format!(
            "{}/admin/api/{}/{resource}",
            shop_base_url(self.api_origin.as_ref(), shop),
            self.api_version
        )
    }
}

#[async_trait]
impl StoreApiClient for RestClient {
    #[instrument(skip(self, credentials), fields(shop = %credentials.shop))]
    async fn list_products(
        &self,
        credentials: &ApiCredentials,
    ) -> Result<Vec<Value>, UpstreamError> {
        let url = self.endpoint(&credentials.shop, "products.json");

        let response = self
            .client
            .get(&url)
            .header(
                "X-Shopify-Access-Token",
                credentials.access_token.expose_secret(),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let mut body: Value = response.json().await?;
        match body.get_mut("products").map(Value::take) {
            Some(Value::Array(products)) => {
                tracing::debug!(count = products.len(), "Fetched products");
                Ok(products)
            }
            _ => Err(UpstreamError::MissingProducts),
        }
    }
}
