use anyhow::{anyhow, bail, Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::region::Region;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

static REGION_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").ok());

/// Reject region names the SDK would only fail on later with an endpoint error
pub fn validate_region(region: &str) -> Result<()> {
    match REGION_PATTERN.as_ref() {
        Some(pattern) if pattern.is_match(region) => Ok(()),
        _ => bail!("Invalid region name '{}'", region),
    }
}

/// Hands out per-region SDK configurations derived from one base session.
///
/// Credential acquisition is left to the default provider chain; this type only
/// re-targets the resolved session at the regions being inventoried.
pub struct SessionCoordinator {
    base: SdkConfig,
    region_configs: RwLock<HashMap<String, SdkConfig>>,
}

impl SessionCoordinator {
    pub fn new(base: SdkConfig) -> Self {
        Self {
            base,
            region_configs: RwLock::new(HashMap::new()),
        }
    }

    /// Session from the environment's default credential and region chain
    pub async fn from_environment() -> Self {
        let base = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(base)
    }

    pub fn default_region(&self) -> Option<String> {
        self.base.region().map(|region| region.to_string())
    }

    /// SDK config targeting `region`, or the session default when `None`
    pub async fn config_for_region(&self, region: Option<&str>) -> Result<SdkConfig> {
        let region = match region {
            Some(region) => region.to_string(),
            None => self
                .default_region()
                .ok_or_else(|| anyhow!("No region configured for the session"))?,
        };
        validate_region(&region)?;

        if let Some(config) = self.region_configs.read().await.get(&region) {
            return Ok(config.clone());
        }

        let config = self
            .base
            .to_builder()
            .region(Region::new(region.clone()))
            .build();

        debug!("Created AWS config for region {}", region);
        self.region_configs
            .write()
            .await
            .insert(region, config.clone());
        Ok(config)
    }

    /// Account of the calling identity
    pub async fn resolve_account_id(&self) -> Result<String> {
        let config = self.config_for_region(None).await?;
        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .context("Failed to resolve caller identity")?;

        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Caller identity has no account"))
    }
}
