//! Configuration for the sync engine.

use crate::error::ConfigError;
use couchbrain_protocol::DEFAULT_PAGE_SIZE;
use std::time::Duration;

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "hubot";

/// Interval between autonomous saves once bootstrap completes.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Where the documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store endpoint (e.g., "https://account.cloudant.com").
    pub url: String,
    /// Database (collection) name.
    pub database: String,
}

impl StoreConfig {
    /// Creates a store configuration.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
        }
    }

    /// Creates a configuration from a URL, honouring the legacy combined
    /// syntax where the trailing path segment names the database.
    pub fn from_url(url: &str) -> Self {
        match parse_legacy_url(url) {
            Some((endpoint, database)) => Self::new(endpoint, database),
            None => Self::new(url, DEFAULT_DATABASE),
        }
    }

    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the configuration through a variable lookup.
    ///
    /// - `CLOUDANT_DB` names the database.
    /// - `CLOUDANT_URL` names the endpoint; a trailing path segment
    ///   overrides the database. An empty value counts as unset.
    /// - Otherwise the first `cloudantNoSQLDB` binding in `VCAP_SERVICES`
    ///   supplies the endpoint.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = lookup("CLOUDANT_DB")
            .filter(|db| !db.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        if let Some(url) = lookup("CLOUDANT_URL").filter(|url| !url.is_empty()) {
            return Ok(match parse_legacy_url(&url) {
                Some((endpoint, db)) => Self::new(endpoint, db),
                None => Self::new(url, database),
            });
        }

        if let Some(services) = lookup("VCAP_SERVICES") {
            let url = url_from_vcap_services(&services)?;
            return Ok(Self::new(url, database));
        }

        Err(ConfigError::MissingUrl)
    }
}

/// Splits a legacy combined URL into endpoint and database.
///
/// Matches `^(https?://.+)/(.+)$`: the split happens at the last slash
/// that has a non-empty host part before it and a non-empty tail after it.
pub fn parse_legacy_url(url: &str) -> Option<(String, String)> {
    let scheme_len = if url.starts_with("https://") {
        "https://".len()
    } else if url.starts_with("http://") {
        "http://".len()
    } else {
        return None;
    };

    let rest = &url[scheme_len..];
    rest.match_indices('/')
        .map(|(idx, _)| idx)
        .rev()
        .find(|&idx| idx > 0 && idx + 1 < rest.len())
        .map(|idx| {
            (
                url[..scheme_len + idx].to_string(),
                rest[idx + 1..].to_string(),
            )
        })
}

fn url_from_vcap_services(services: &str) -> Result<String, ConfigError> {
    let parsed: serde_json::Value = serde_json::from_str(services)
        .map_err(|e| ConfigError::InvalidServices(e.to_string()))?;

    parsed
        .get("cloudantNoSQLDB")
        .and_then(|bindings| bindings.get(0))
        .and_then(|binding| binding.get("credentials"))
        .and_then(|credentials| credentials.get("url"))
        .and_then(|url| url.as_str())
        .map(String::from)
        .ok_or_else(|| {
            ConfigError::InvalidServices("no cloudantNoSQLDB credentials url".into())
        })
}

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Store location.
    pub store: StoreConfig,
    /// Documents requested per listing page during bootstrap.
    pub page_size: u32,
    /// Interval the host is told to save at after bootstrap.
    pub save_interval: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
            save_interval: DEFAULT_SAVE_INTERVAL,
        }
    }

    /// Sets the listing page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the save interval.
    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(StoreConfig::new("", DEFAULT_DATABASE))
    }
}
