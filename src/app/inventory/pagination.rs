use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::HashSet;

use super::isolation::{FailureReason, Isolator, Outcome, StepKind, StepLabel};
use super::operations::{ListOperation, Page};
use super::scope::ParentScope;
use super::sdk_errors::ErrorCategory;

/// Pagination limits for a listing walk
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig {
    /// Maximum number of pages fetched per listing
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: 1000 }
    }
}

/// Items gathered by a walk, plus the failure that stopped it early
#[derive(Debug, Default)]
pub struct Walked {
    pub items: Vec<Value>,
    pub failure: Option<FailureReason>,
}

enum WalkState {
    Next {
        page: usize,
        token: Option<String>,
        seen: HashSet<String>,
    },
    Stalled {
        page: usize,
        category: ErrorCategory,
    },
    Done,
}

/// Drives a listing operation across continuation tokens.
///
/// The walk is lazy and restartable: each call to [`pages`](Self::pages) starts again
/// from the first page. A failed page ends the walk; whatever earlier pages produced
/// is kept.
pub struct PaginatedWalker<'a> {
    operation: &'a dyn ListOperation,
    scope: &'a ParentScope,
    isolator: &'a Isolator,
    label: StepLabel,
    config: PaginationConfig,
}

impl<'a> PaginatedWalker<'a> {
    pub fn new(
        operation: &'a dyn ListOperation,
        scope: &'a ParentScope,
        isolator: &'a Isolator,
        label: StepLabel,
        config: PaginationConfig,
    ) -> Self {
        Self {
            operation,
            scope,
            isolator,
            label,
            config,
        }
    }

    /// Lazy sequence of page outcomes. A failure is always the last element.
    pub fn pages(&self) -> impl Stream<Item = Outcome<Page>> + '_ {
        let start = WalkState::Next {
            page: 0,
            token: None,
            seen: HashSet::new(),
        };

        stream::unfold(start, move |state| async move {
            let (page, token, mut seen) = match state {
                WalkState::Done => return None,
                WalkState::Stalled { page, category } => {
                    let reason = self.isolator.failure(
                        &self.label,
                        StepKind::Listing { page },
                        self.operation.operation(),
                        category,
                    );
                    return Some((Outcome::Failure(reason), WalkState::Done));
                }
                WalkState::Next { page, token, seen } => (page, token, seen),
            };

            if page >= self.config.max_pages {
                let category = ErrorCategory::engine(
                    "PageLimitReached",
                    format!("stopped after {} pages", self.config.max_pages),
                );
                return Some((
                    Outcome::Failure(self.isolator.failure(
                        &self.label,
                        StepKind::Listing { page },
                        self.operation.operation(),
                        category,
                    )),
                    WalkState::Done,
                ));
            }

            let outcome = self
                .isolator
                .attempt(
                    &self.label,
                    StepKind::Listing { page },
                    self.operation.operation(),
                    self.operation.list_page(self.scope, token),
                )
                .await;

            match outcome {
                Outcome::Failure(reason) => Some((Outcome::Failure(reason), WalkState::Done)),
                Outcome::Success(result) => {
                    let next = match result.next_token.clone().filter(|t| !t.is_empty()) {
                        None => WalkState::Done,
                        Some(next_token) => {
                            if seen.insert(next_token.clone()) {
                                WalkState::Next {
                                    page: page + 1,
                                    token: Some(next_token),
                                    seen,
                                }
                            } else {
                                WalkState::Stalled {
                                    page: page + 1,
                                    category: ErrorCategory::engine(
                                        "RepeatedContinuationToken",
                                        format!("continuation token repeated after page {}", page),
                                    ),
                                }
                            }
                        }
                    };
                    Some((Outcome::Success(result), next))
                }
            }
        })
    }

    /// Lazy sequence of raw item summaries, ending at the first failed page
    pub fn items(&self) -> impl Stream<Item = Value> + '_ {
        self.pages()
            .scan((), |_, outcome| futures::future::ready(outcome.ok()))
            .flat_map(|page| stream::iter(page.items))
    }

    /// Walk every page, keeping partial results when a later page fails
    pub async fn collect(&self) -> Walked {
        let mut walked = Walked::default();
        let pages = self.pages();
        futures::pin_mut!(pages);

        while let Some(outcome) = pages.next().await {
            match outcome {
                Outcome::Success(page) => walked.items.extend(page.items),
                Outcome::Failure(reason) => {
                    if reason.is_partial_listing() {
                        tracing::debug!(
                            service = reason.service.as_str(),
                            resource_type = reason.resource_type.as_str(),
                            kept = walked.items.len(),
                            "listing stopped early, keeping partial results"
                        );
                    }
                    walked.failure = Some(reason);
                    break;
                }
            }
        }

        walked
    }
}
