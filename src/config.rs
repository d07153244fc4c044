//! # Configuration
//!
//! Settings for the editing service client and the preview server. Values
//! come from [`Default`], then the environment, then CLI flags.

use std::time::Duration;

use crate::error::LayoutError;

pub const ENV_EDITING_ENDPOINT: &str = "SITECORE_EDITING_ENDPOINT";
pub const ENV_EDITING_TIMEOUT_MS: &str = "SITECORE_EDITING_TIMEOUT_MS";
pub const ENV_DICTIONARY_PAGE_SIZE: &str = "SITECORE_DICTIONARY_PAGE_SIZE";

/// Editing (GraphQL) service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EditingConfig {
    /// GraphQL endpoint, e.g. `https://cm.example.com/sitecore/api/graph/edge`
    pub endpoint: String,
    /// Upper bound for every upstream call.
    pub request_timeout: Duration,
    /// Dictionary entries requested per page.
    pub dictionary_page_size: u32,
    pub user_agent: String,
    /// Site used for dictionary lookups when the request names none.
    pub default_site: Option<String>,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/sitecore/api/graph/edge".to_string(),
            request_timeout: Duration::from_secs(10),
            dictionary_page_size: 100,
            user_agent: concat!("sitecore-layout/", env!("CARGO_PKG_VERSION")).to_string(),
            default_site: None,
        }
    }
}

impl EditingConfig {
    /// Defaults overridden by `SITECORE_*` environment variables.
    pub fn from_env() -> Result<Self, LayoutError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LayoutError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_EDITING_ENDPOINT)
            && !endpoint.trim().is_empty()
        {
            config.endpoint = endpoint.trim().to_string();
        }

        if let Some(timeout) = lookup(ENV_EDITING_TIMEOUT_MS) {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                LayoutError::argument(ENV_EDITING_TIMEOUT_MS, format!("not a number: {}", timeout))
            })?;
            if millis == 0 {
                return Err(LayoutError::argument(
                    ENV_EDITING_TIMEOUT_MS,
                    "timeout must be greater than zero",
                ));
            }
            config.request_timeout = Duration::from_millis(millis);
        }

        if let Some(size) = lookup(ENV_DICTIONARY_PAGE_SIZE) {
            config.dictionary_page_size = size.trim().parse().map_err(|_| {
                LayoutError::argument(ENV_DICTIONARY_PAGE_SIZE, format!("not a number: {}", size))
            })?;
            if config.dictionary_page_size == 0 {
                return Err(LayoutError::argument(
                    ENV_DICTIONARY_PAGE_SIZE,
                    "page size must be greater than zero",
                ));
            }
        }

        Ok(config)
    }
}

/// Preview server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    pub listen_addr: String,
    pub editing: EditingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            editing: EditingConfig::default(),
        }
    }
}
