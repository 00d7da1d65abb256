//! Directory configuration.
//!
//! Read from the environment with logged fallbacks to development defaults,
//! or deserialized from JSON.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use domainid_directory::PageRequest;
use domainid_directory::pagination::DEFAULT_PAGE_SIZE;

pub const ENV_APPLICATION: &str = "DOMAINID_APPLICATION";
pub const ENV_ORGANIZATION: &str = "DOMAINID_ORGANIZATION";
pub const ENV_PAGE_SIZE: &str = "DOMAINID_PAGE_SIZE";
pub const ENV_SEED_FILE: &str = "DOMAINID_SEED_FILE";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

const DEFAULT_APPLICATION: &str = "DomainId";
const DEFAULT_ORGANIZATION: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Application that seeded roles are scoped to.
    pub application: String,
    /// Organization assumed when a seeded user names none.
    pub organization: String,
    pub page_size: u32,
    pub seed_file: Option<PathBuf>,
    pub database_url: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            application: DEFAULT_APPLICATION.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            seed_file: None,
            database_url: None,
        }
    }
}

impl DirectoryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let application = lookup(ENV_APPLICATION).unwrap_or_else(|| {
            tracing::warn!("{ENV_APPLICATION} not set; using '{}'", defaults.application);
            defaults.application.clone()
        });
        let organization = lookup(ENV_ORGANIZATION).unwrap_or_else(|| {
            tracing::warn!("{ENV_ORGANIZATION} not set; using '{}'", defaults.organization);
            defaults.organization.clone()
        });

        let page_size = match lookup(ENV_PAGE_SIZE) {
            None => defaults.page_size,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size >= 1 => size,
                _ => {
                    tracing::warn!(value = %raw, "{ENV_PAGE_SIZE} is not a positive integer; using {}", defaults.page_size);
                    defaults.page_size
                }
            },
        };

        let database_url = lookup(ENV_DATABASE_URL);
        if database_url.is_none() {
            tracing::info!("{ENV_DATABASE_URL} not set; using the in-memory directory store");
        }

        Self {
            application,
            organization,
            page_size,
            seed_file: lookup(ENV_SEED_FILE).map(PathBuf::from),
            database_url,
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid directory config JSON")?;
        anyhow::ensure!(config.page_size >= 1, "page_size must be >= 1");
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// The `page_number`-th page at the configured size.
    pub fn page(&self, page_number: i64) -> domainid_core::DomainResult<PageRequest> {
        PageRequest::new(page_number, i64::from(self.page_size))
    }
}
