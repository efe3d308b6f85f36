//! Per-service collector plug-ins.
//!
//! Each collector turns an SDK configuration into the declaration tree for its
//! service. All traversal, isolation and record building happens in the shared engine;
//! a collector only states *what* to list and how fields map.

use aws_config::SdkConfig;
use std::sync::Arc;

use super::declarations::ResourceDeclaration;
use super::global_services::is_global_service;

pub mod bedrock;
pub mod datazone;
pub mod dsql;
pub mod s3;
pub mod timestream_influxdb;

/// Whether a collector runs once per region or once per account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    Regional,
    Global,
}

pub trait ServiceCollector: Send + Sync {
    /// Stable collector name used by the `services` filter
    fn name(&self) -> &'static str;

    fn scope(&self) -> ServiceScope {
        if is_global_service(self.name()) {
            ServiceScope::Global
        } else {
            ServiceScope::Regional
        }
    }

    /// Declarations for one branch. `sdk_config` already targets the branch region.
    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration>;
}

/// Every collector this crate knows about
pub fn default_collectors() -> Vec<Arc<dyn ServiceCollector>> {
    vec![
        Arc::new(bedrock::BedrockCollector),
        Arc::new(datazone::DataZoneCollector),
        Arc::new(dsql::DsqlCollector),
        Arc::new(s3::S3BucketCollector),
        Arc::new(s3::S3TablesCollector),
        Arc::new(timestream_influxdb::TimestreamInfluxDbCollector),
    ]
}

/// Collectors passing a name filter; an empty filter keeps all of them
pub fn collectors_for(filter: &[String]) -> Vec<Arc<dyn ServiceCollector>> {
    default_collectors()
        .into_iter()
        .filter(|collector| {
            filter.is_empty()
                || filter
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(collector.name()))
        })
        .collect()
}
