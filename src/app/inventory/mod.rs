//! Account inventory traversal.
//!
//! Collectors declare what each service lists; the shared engine walks paginated
//! listings, enriches items, recurses into children and turns every partial failure
//! into a fallback value. The result is a flat [`Collection`] of [`ResourceRecord`]s.

pub mod arn;
pub mod aws_services;
pub mod collector;
pub mod collectors;
pub mod config;
pub mod credentials;
pub mod declarations;
pub mod failure_summary;
pub mod global_services;
pub mod inventory_client;
pub mod isolation;
pub mod operations;
pub mod pagination;
pub mod record_builder;
pub mod scope;
pub mod sdk_errors;
pub mod state;
pub mod tags;

pub use collector::HierarchicalCollector;
pub use collectors::{collectors_for, default_collectors, ServiceCollector, ServiceScope};
pub use config::InventoryConfig;
pub use credentials::SessionCoordinator;
pub use failure_summary::FailureSummary;
pub use global_services::{get_global_query_region, is_global_service, GlobalServiceRegistry};
pub use inventory_client::InventoryClient;
pub use isolation::{FailureReason, StepKind};
pub use state::{Collection, ResourceRecord, Tags, GLOBAL_REGION};
pub use tags::normalize_tags;
