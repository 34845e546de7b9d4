//! Remote collaborators: the product catalog and the remote cart.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::{products::Product, storage::PersistedCartEntry};

/// Errors raised by the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session token was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The API answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,

        /// Error message reported by the API.
        message: String,
    },
}

impl ApiError {
    /// Whether the API rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Product catalog lookup.
#[automock]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Retrieve all products.
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;
}

/// Remote copy of the shopper's cart.
#[automock]
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Retrieve the remote cart, or `None` when the shopper has no cart.
    async fn fetch_cart(&self, token: &str) -> Result<Option<Vec<PersistedCartEntry>>, ApiError>;

    /// Overwrite the remote cart with exactly `entries`.
    async fn merge_cart(&self, token: &str, entries: &[PersistedCartEntry])
    -> Result<(), ApiError>;
}
