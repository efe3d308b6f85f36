use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::collector::HierarchicalCollector;
use super::collectors::{collectors_for, ServiceCollector, ServiceScope};
use super::config::InventoryConfig;
use super::credentials::SessionCoordinator;
use super::failure_summary::FailureSummary;
use super::isolation::{BranchGuard, FailureReason, StepKind, StepLabel};
use super::sdk_errors::{categorize_error, ErrorCategory};
use super::state::{Collection, GLOBAL_REGION};

/// One unit of concurrent work: a service in a region, or a global service once
#[derive(Clone)]
struct Branch {
    collector: Arc<dyn ServiceCollector>,
    /// `None` selects the session's default region
    region: Option<String>,
    global: bool,
}

impl Branch {
    fn key(&self) -> String {
        format!(
            "{}:{}",
            self.collector.name(),
            if self.global {
                GLOBAL_REGION
            } else {
                self.region.as_deref().unwrap_or("default")
            }
        )
    }
}

/// Runs every selected service collector across the configured regions
pub struct InventoryClient {
    sessions: Arc<SessionCoordinator>,
    collectors: Vec<Arc<dyn ServiceCollector>>,
    config: Arc<InventoryConfig>,
    cancel: CancellationToken,
}

impl InventoryClient {
    pub fn new(sessions: Arc<SessionCoordinator>, config: InventoryConfig) -> Self {
        let collectors = collectors_for(&config.services);
        Self {
            sessions,
            collectors,
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the collector set
    pub fn with_collectors(mut self, collectors: Vec<Arc<dyn ServiceCollector>>) -> Self {
        self.collectors = collectors;
        self
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Cancelling this token stops every branch; records gathered so far are kept
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn branches(&self) -> Vec<Branch> {
        let regions: Vec<Option<String>> = if self.config.regions.is_empty() {
            vec![None]
        } else {
            self.config.regions.iter().cloned().map(Some).collect()
        };

        let mut seen_globals: HashSet<&'static str> = HashSet::new();
        let mut branches = Vec::new();
        for collector in &self.collectors {
            match collector.scope() {
                ServiceScope::Global => {
                    if seen_globals.insert(collector.name()) {
                        branches.push(Branch {
                            collector: collector.clone(),
                            region: None,
                            global: true,
                        });
                    }
                }
                ServiceScope::Regional => {
                    for region in &regions {
                        branches.push(Branch {
                            collector: collector.clone(),
                            region: region.clone(),
                            global: false,
                        });
                    }
                }
            }
        }
        branches
    }

    /// Inventory one account. Branches run concurrently and never fail the whole run;
    /// the returned collection lists every fallback that was applied.
    pub async fn collect(&self, account_id: &str) -> Collection {
        let branches = self.branches();
        trace_info!(
            "Starting inventory of account {} across {} branches",
            account_id,
            branches.len()
        );

        let limiter = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let mut futures: FuturesUnordered<BoxFuture<'_, Collection>> = FuturesUnordered::new();
        for branch in branches {
            futures.push(Box::pin(self.run_branch(branch, account_id, limiter.clone())));
        }

        let mut collection = Collection::new();
        while let Some(part) = futures.next().await {
            collection.extend(part);
        }

        let summary = FailureSummary::from_failures(&collection.failures);
        trace_info!(
            "Inventory of account {} finished: {} records, {}",
            account_id,
            collection.records.len(),
            summary.describe()
        );
        collection
    }

    async fn run_branch(&self, branch: Branch, account_id: &str, limiter: Arc<Semaphore>) -> Collection {
        let mut collection = Collection::new();
        let service = branch.collector.name();
        let label = StepLabel::new(service, "*");

        let query_region = if branch.global {
            Some(self.config.global_query_region.clone())
        } else {
            branch.region.clone()
        };

        let sdk_config = match self.sessions.config_for_region(query_region.as_deref()).await {
            Ok(sdk_config) => sdk_config,
            Err(error) => {
                trace_warn!("Skipping branch {}: {:#}", branch.key(), error);
                collection.push_failure(FailureReason::new(
                    &label,
                    query_region.as_deref(),
                    StepKind::ClientConstruction,
                    "CreateClient",
                    categorize_error(&error, service, "CreateClient"),
                ));
                return collection;
            }
        };

        let record_region = if branch.global {
            None
        } else {
            sdk_config.region().map(|region| region.to_string())
        };

        let deadline = self.config.branch_timeout().map(|timeout| Instant::now() + timeout);
        let guard = BranchGuard::new(limiter, self.cancel.child_token(), deadline);
        let engine = HierarchicalCollector::new(&self.config, guard.clone(), record_region.clone(), account_id);

        let declarations = branch.collector.declarations(&sdk_config);
        trace_debug!(
            "Branch {} collecting {} resource types",
            branch.key(),
            declarations.len()
        );
        collection.extend(engine.collect(&declarations).await);

        if guard.is_cancelled() {
            let reason = if self.cancel.is_cancelled() {
                "inventory cancelled"
            } else {
                "branch deadline exceeded"
            };
            trace_warn!("Branch {} stopped early: {}", branch.key(), reason);
            collection.push_failure(FailureReason::new(
                &label,
                record_region.as_deref(),
                StepKind::Branch,
                "CollectBranch",
                ErrorCategory::Cancelled {
                    reason: reason.to_string(),
                },
            ));
        }

        trace_info!(
            "Branch {} collected {} records ({} failures)",
            branch.key(),
            collection.records.len(),
            collection.failures.len()
        );
        collection
    }
}
