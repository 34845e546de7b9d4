//! Storefront REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    api::{ApiError, Catalog, RemoteCart},
    products::{Product, ProductId, ProductRecord},
    storage::PersistedCartEntry,
};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";

const FALLBACK_ERROR_MESSAGE: &str = "API request failed";

/// HTTP client for the catalog and cart endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    currency: &'static Currency,
    http: Client,
}

impl HttpApi {
    /// Create a client for the API at `base_url`, pricing products in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        currency: &'static Currency,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self::with_client(base_url, currency, http))
    }

    /// Create a client for the API at `base_url` on a preconfigured HTTP client.
    pub fn with_client(
        base_url: impl Into<String>,
        currency: &'static Currency,
        http: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            currency,
            http,
        }
    }

    /// API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();

        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

#[async_trait]
impl Catalog for HttpApi {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let response = Self::send(self.http.get(self.url("/products"))).await?;
        let body: ProductsResponse = response.json().await?;

        Ok(products_from_records(body.products, self.currency))
    }
}

#[async_trait]
impl RemoteCart for HttpApi {
    async fn fetch_cart(&self, token: &str) -> Result<Option<Vec<PersistedCartEntry>>, ApiError> {
        let request = self.http.get(self.url("/cart")).bearer_auth(token);

        let response = match Self::send(request).await {
            Ok(response) => response,
            Err(ApiError::Status { status: 404, .. }) => return Ok(None),
            Err(error) => return Err(error),
        };

        let body: CartResponse = response.json().await?;

        Ok(body.into_entries())
    }

    async fn merge_cart(
        &self,
        token: &str,
        entries: &[PersistedCartEntry],
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url("/cart/merge"))
            .bearer_auth(token)
            .json(&MergeRequest {
                local_cart: entries,
            });

        Self::send(request).await?;

        debug!(entries = entries.len(), "remote cart overwritten");

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<ProductRecord>,
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    #[serde(default)]
    items: Option<Vec<RemoteCartItem>>,
}

impl CartResponse {
    fn into_entries(self) -> Option<Vec<PersistedCartEntry>> {
        let items = self.items?;

        Some(
            items
                .into_iter()
                .filter_map(RemoteCartItem::into_entry)
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCartItem {
    product_id: ProductId,
    quantity: i64,
}

impl RemoteCartItem {
    /// Zero and negative quantities are dropped; oversized ones saturate.
    fn into_entry(self) -> Option<PersistedCartEntry> {
        if self.quantity <= 0 {
            return None;
        }

        Some(PersistedCartEntry {
            product_id: self.product_id,
            quantity: u32::try_from(self.quantity).unwrap_or(u32::MAX),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest<'a> {
    local_cart: &'a [PersistedCartEntry],
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

fn products_from_records(records: Vec<ProductRecord>, currency: &'static Currency) -> Vec<Product> {
    records
        .into_iter()
        .filter_map(|record| match Product::from_record(record, currency) {
            Ok(product) => Some(product),
            Err(error) => {
                warn!(%error, "skipping catalog record");
                None
            }
        })
        .collect()
}
