use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::arn::partition_for_region;
use super::global_services::get_global_query_region;
use super::pagination::PaginationConfig;

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "AWS_INVENTORY_CONFIG";

/// Tuning and scoping of an inventory run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Concurrent AWS API calls across all branches
    pub max_concurrent_requests: usize,
    /// Sibling items enriched concurrently within one listing
    pub max_concurrent_nodes: usize,
    /// Pages fetched per listing before the walk stops
    pub max_pages: usize,
    /// Deepest parent/child nesting followed
    pub max_depth: usize,
    /// Per service/region branch deadline, 0 disables it
    pub branch_timeout_secs: u64,
    /// Overrides the partition derived from the region
    pub partition: Option<String>,
    /// Region global services are queried from
    pub global_query_region: String,
    /// Services to collect, empty means all known services
    pub services: Vec<String>,
    /// Regions to collect, empty means the session's default region
    pub regions: Vec<String>,
    /// Account to record; resolved from the caller identity when absent
    pub account_id: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 20,
            max_concurrent_nodes: 8,
            max_pages: 1000,
            max_depth: 3,
            branch_timeout_secs: 300,
            partition: None,
            global_query_region: get_global_query_region().to_string(),
            services: Vec::new(),
            regions: Vec::new(),
            account_id: None,
        }
    }
}

impl InventoryConfig {
    /// Load a config file, picking the format from its extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        let config: Self = match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| anyhow!("Failed to parse YAML: {}", e))?
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| anyhow!("Failed to parse JSON: {}", e))?
            }
            _ => toml::from_str(&content).map_err(|e| anyhow!("Failed to parse TOML: {}", e))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Default location in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "aws-inventory")
            .map(|dirs| dirs.config_dir().join("inventory.toml"))
    }

    /// Load from `AWS_INVENTORY_CONFIG`, then the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_concurrent_requests > 0, "max_concurrent_requests must be positive");
        ensure!(self.max_concurrent_nodes > 0, "max_concurrent_nodes must be positive");
        ensure!(self.max_pages > 0, "max_pages must be positive");
        ensure!(self.max_depth > 0, "max_depth must be positive");
        ensure!(
            !self.global_query_region.is_empty(),
            "global_query_region must not be empty"
        );
        Ok(())
    }

    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig {
            max_pages: self.max_pages,
        }
    }

    pub fn branch_timeout(&self) -> Option<Duration> {
        (self.branch_timeout_secs > 0).then(|| Duration::from_secs(self.branch_timeout_secs))
    }

    /// Partition override, or the one the region belongs to
    pub fn partition_for(&self, region: Option<&str>) -> String {
        match &self.partition {
            Some(partition) => partition.clone(),
            None => partition_for_region(region.unwrap_or(&self.global_query_region)).to_string(),
        }
    }

    /// Whether a service passes the `services` filter
    pub fn includes_service(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s.eq_ignore_ascii_case(service))
    }
}
