//! Storefront API Config

use std::time::Duration;

use clap::Args;

use crate::http::DEFAULT_API_URL;

/// Storefront API settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// API base URL
    #[arg(long, env = "GENZIKART_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "GENZIKART_API_TIMEOUT_SECONDS", default_value_t = 10u64)]
    pub api_timeout_seconds: u64,
}

impl ApiConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }
}
