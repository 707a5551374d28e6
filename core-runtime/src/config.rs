//! # Catalog Configuration Module
//!
//! Provides configuration management for the catalog core.
//!
//! ## Overview
//!
//! A builder constructs a validated [`CatalogConfig`] holding the HTTP bridge,
//! the API base URL and the tuning knobs of the query layer. Validation is
//! fail-fast: a config that builds is a config the core can run with.
//!
//! ## Required Settings
//!
//! - `base_url` - Origin of the catalog API (e.g. `http://localhost:8000`)
//!
//! ## Optional Settings (with defaults)
//!
//! - `http_client` - HTTP bridge (desktop default: reqwest, `desktop-shims` feature)
//! - `page_size` - Rows per page, 10
//! - `search_debounce` - Quiet period before a search term is applied, 300 ms
//! - `request_timeout` - Per-request timeout of the default HTTP bridge, 30 s
//! - `event_buffer_size` - Event bus capacity, 100
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CatalogConfig;
//! use std::time::Duration;
//!
//! let config = CatalogConfig::builder()
//!     .base_url("http://localhost:8000")
//!     .page_size(25)
//!     .search_debounce(Duration::from_millis(250))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated catalog configuration. Use [`CatalogConfigBuilder`] to construct.
#[derive(Clone)]
pub struct CatalogConfig {
    /// API origin without a trailing slash
    pub base_url: String,

    /// HTTP bridge used by the transport
    pub http_client: Arc<dyn HttpClient>,

    /// Initial rows per page for new list views
    pub page_size: u32,

    /// Quiet period applied to free-text search input
    pub search_debounce: Duration,

    /// Timeout applied by the default HTTP bridge
    pub request_timeout: Duration,

    /// Capacity of the notification/event channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("page_size", &self.page_size)
            .field("search_debounce", &self.search_debounce)
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CatalogConfig {
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL is an absolute http(s) URL
    /// - Page size is within 1..=100
    /// - Debounce and timeout are non-zero
    /// - Event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        normalize_base_url(&self.base_url)?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.search_debounce.is_zero() {
            return Err(Error::Config(
                "Search debounce must be greater than zero. \
                 Omit .search_debounce() to use the 300ms default."
                    .to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse and normalize an API origin: absolute, http(s), no trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Base URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(Error::Config(format!("Base URL '{}' has no host", raw)));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the catalog API. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject an adapter with .http_client()."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

/// Builder for constructing [`CatalogConfig`] instances.
#[derive(Default)]
pub struct CatalogConfigBuilder {
    base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    page_size: Option<u32>,
    search_debounce: Option<Duration>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CatalogConfigBuilder {
    /// Sets the API origin, e.g. `http://localhost:8000`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Injects the HTTP bridge. Required unless `desktop-shims` is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = Some(debounce);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CatalogConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Config` when the base URL is missing or any value is out of range
    /// - `CapabilityMissing` when no HTTP bridge is available
    pub fn build(self) -> Result<CatalogConfig> {
        let raw_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;
        let base_url = normalize_base_url(&raw_url)?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CatalogConfig {
            base_url,
            http_client,
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            search_debounce: self.search_debounce.unwrap_or(DEFAULT_SEARCH_DEBOUNCE),
            request_timeout,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
