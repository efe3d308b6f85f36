//! Partial-failure isolation.
//!
//! Every remote call made during a collection pass goes through [`Isolator::attempt`],
//! which turns the call into an explicit [`Outcome`]. The fallback helpers on
//! [`Isolator`] are the only place where a failed outcome is replaced by its fallback
//! value; the [`FailureReason`] is pushed onto the caller's failure list so the
//! substitution stays auditable.
//!
//! The isolator also owns the branch guard: the shared request limiter plus the
//! branch's cancellation token and deadline. A call that is cancelled or runs past the
//! deadline fails the same way an API error does.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::sdk_errors::{categorize_error, ErrorCategory};
use super::state::Tags;

/// Which step of the traversal failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Listing page failed. Page 0 means the whole listing was skipped,
    /// later pages mean the listing is partial.
    Listing { page: usize },
    /// Detail enrichment failed; `required` details cause the item to be skipped
    Detail { required: bool },
    Tags,
    /// Item had no usable id or ARN and was skipped
    Identity,
    ClientConstruction,
    /// A whole service/region branch failed or was cancelled
    Branch,
}

/// Auditable record of one fallback applied during a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReason {
    pub service: String,
    pub resource_type: String,
    pub region: Option<String>,
    /// Identifier of the item the step was about, if any
    pub resource: Option<String>,
    pub step: StepKind,
    pub operation: String,
    pub category: ErrorCategory,
}

impl FailureReason {
    pub fn new(label: &StepLabel, region: Option<&str>, step: StepKind, operation: &str, category: ErrorCategory) -> Self {
        Self {
            service: label.service.to_string(),
            resource_type: label.resource_type.to_string(),
            region: region.map(str::to_string),
            resource: label.resource.clone(),
            step,
            operation: operation.to_string(),
            category,
        }
    }

    /// True for a listing that produced nothing at all
    pub fn is_skipped_listing(&self) -> bool {
        matches!(self.step, StepKind::Listing { page: 0 })
    }

    /// True for a listing that stopped after some pages were collected
    pub fn is_partial_listing(&self) -> bool {
        matches!(self.step, StepKind::Listing { page } if page > 0)
    }
}

/// Identifies the subject of a step for failure reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLabel {
    pub service: &'static str,
    pub resource_type: &'static str,
    pub resource: Option<String>,
}

impl StepLabel {
    pub fn new(service: &'static str, resource_type: &'static str) -> Self {
        Self {
            service,
            resource_type,
            resource: None,
        }
    }

    pub fn for_resource(&self, resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..self.clone()
        }
    }
}

/// Result of one isolated step
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(FailureReason),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }
}

/// Shared limits of one service/region branch
#[derive(Debug, Clone)]
pub struct BranchGuard {
    limiter: Arc<Semaphore>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl BranchGuard {
    pub fn new(limiter: Arc<Semaphore>, cancel: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            limiter,
            cancel,
            deadline,
        }
    }

    /// Guard with its own limiter and no deadline
    pub fn unbounded(max_concurrent_requests: usize) -> Self {
        Self::new(
            Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
            CancellationToken::new(),
            None,
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
            || self
                .deadline
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or(false)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Runs fallible steps and applies their documented fallbacks
#[derive(Debug, Clone)]
pub struct Isolator {
    guard: BranchGuard,
    region: Option<String>,
}

impl Isolator {
    pub fn new(guard: BranchGuard, region: Option<String>) -> Self {
        Self { guard, region }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_cancelled()
    }

    /// Build a failure reason for a condition the engine detected itself
    pub fn failure(&self, label: &StepLabel, step: StepKind, operation: &str, category: ErrorCategory) -> FailureReason {
        FailureReason::new(label, self.region(), step, operation, category)
    }

    /// Run one remote call under the request limiter, cancellation and deadline
    pub async fn attempt<T, F>(&self, label: &StepLabel, step: StepKind, operation: &str, call: F) -> Outcome<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let cancelled = |reason: &str| {
            Outcome::Failure(self.failure(
                label,
                step,
                operation,
                ErrorCategory::Cancelled {
                    reason: reason.to_string(),
                },
            ))
        };

        if self.guard.cancel.is_cancelled() {
            return cancelled("branch cancelled");
        }

        let _permit = tokio::select! {
            biased;
            _ = self.guard.cancel.cancelled() => return cancelled("branch cancelled"),
            permit = self.guard.limiter.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return cancelled("request limiter closed"),
            },
        };

        let deadline = self.guard.deadline;
        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, call).await.ok(),
                None => Some(call.await),
            }
        };

        let result = tokio::select! {
            biased;
            _ = self.guard.cancel.cancelled() => return cancelled("branch cancelled"),
            result = bounded => result,
        };

        match result {
            None => cancelled("branch deadline exceeded"),
            Some(Ok(value)) => Outcome::Success(value),
            Some(Err(error)) => {
                let category = categorize_error(&error, label.service, operation);
                tracing::debug!(
                    service = label.service,
                    resource_type = label.resource_type,
                    resource = label.resource.as_deref().unwrap_or(""),
                    operation,
                    category = category.short_label(),
                    "isolated failure: {:#}",
                    error
                );
                Outcome::Failure(self.failure(label, step, operation, category))
            }
        }
    }

    /// Tag fetch: failure yields an empty mapping
    pub async fn tags_or_empty<F>(&self, label: &StepLabel, operation: &str, call: F, failures: &mut Vec<FailureReason>) -> Tags
    where
        F: Future<Output = anyhow::Result<Tags>>,
    {
        match self.attempt(label, StepKind::Tags, operation, call).await {
            Outcome::Success(tags) => tags,
            Outcome::Failure(reason) => {
                failures.push(reason);
                Tags::new()
            }
        }
    }

    /// Optional detail fetch: failure yields `None` and the record is built from the
    /// unmodified summary
    pub async fn detail_or_summary<F>(&self, label: &StepLabel, operation: &str, call: F, failures: &mut Vec<FailureReason>) -> Option<Value>
    where
        F: Future<Output = anyhow::Result<Value>>,
    {
        match self.attempt(label, StepKind::Detail { required: false }, operation, call).await {
            Outcome::Success(detail) => Some(detail),
            Outcome::Failure(reason) => {
                failures.push(reason);
                None
            }
        }
    }

    /// Identity-bearing detail fetch: failure yields `None` and the item is skipped
    pub async fn required_or_skip<F>(&self, label: &StepLabel, operation: &str, call: F, failures: &mut Vec<FailureReason>) -> Option<Value>
    where
        F: Future<Output = anyhow::Result<Value>>,
    {
        match self.attempt(label, StepKind::Detail { required: true }, operation, call).await {
            Outcome::Success(detail) => Some(detail),
            Outcome::Failure(reason) => {
                failures.push(reason);
                None
            }
        }
    }
}
