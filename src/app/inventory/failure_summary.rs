use serde::Serialize;
use std::collections::BTreeMap;

use super::isolation::{FailureReason, StepKind};
use super::sdk_errors::ErrorCategory;

/// Counts of the fallbacks applied during one inventory pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    /// Listings that produced nothing
    pub skipped_listings: u32,
    /// Listings cut short after at least one page
    pub partial_listings: u32,
    /// Items recorded from their summary because an optional detail call failed
    pub degraded_details: u32,
    /// Items recorded with empty tags
    pub empty_tags: u32,
    /// Items dropped (required detail failed or no usable identity)
    pub skipped_items: u32,
    /// Branches that could not start or were stopped early
    pub failed_branches: u32,
    pub throttled_count: u32,
    pub permission_denied_count: u32,
    /// Failures per service
    pub by_service: BTreeMap<String, u32>,
}

impl FailureSummary {
    pub fn from_failures(failures: &[FailureReason]) -> Self {
        let mut summary = Self::default();

        for failure in failures {
            match failure.step {
                StepKind::Listing { page: 0 } => summary.skipped_listings += 1,
                StepKind::Listing { .. } => summary.partial_listings += 1,
                StepKind::Detail { required: false } => summary.degraded_details += 1,
                StepKind::Detail { required: true } | StepKind::Identity => summary.skipped_items += 1,
                StepKind::Tags => summary.empty_tags += 1,
                StepKind::ClientConstruction | StepKind::Branch => summary.failed_branches += 1,
            }

            match &failure.category {
                ErrorCategory::Throttled { .. } => summary.throttled_count += 1,
                category if category.is_permission_error() => summary.permission_denied_count += 1,
                _ => {}
            }

            *summary.by_service.entry(failure.service.clone()).or_insert(0) += 1;
        }

        summary
    }

    pub fn total(&self) -> u32 {
        self.by_service.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// One-line description for logs
    pub fn describe(&self) -> String {
        if self.is_clean() {
            return "no failures".to_string();
        }
        format!(
            "{} failures ({} skipped listings, {} partial listings, {} degraded details, {} empty tags, {} skipped items, {} failed branches; {} throttled, {} permission denied)",
            self.total(),
            self.skipped_listings,
            self.partial_listings,
            self.degraded_details,
            self.empty_tags,
            self.skipped_items,
            self.failed_branches,
            self.throttled_count,
            self.permission_denied_count,
        )
    }
}
