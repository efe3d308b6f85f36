//! Hierarchical collection.
//!
//! Walks a tree of [`ResourceDeclaration`]s: list, enrich, tag and record each item,
//! then list its children with the parent's identifiers bound into a child scope.
//! Records come out flat and in pre-order. Siblings within one listing are processed
//! concurrently through an order-preserving buffered stream, so the output order does
//! not depend on which call finishes first.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

use super::arn::ArnContext;
use super::config::InventoryConfig;
use super::declarations::{ChildDeclaration, ParentField, ResourceDeclaration, TagSource};
use super::isolation::{BranchGuard, Isolator, StepKind, StepLabel};
use super::operations::TagTarget;
use super::pagination::{PaginatedWalker, PaginationConfig};
use super::record_builder::{ItemView, RecordBuilder};
use super::scope::ParentScope;
use super::sdk_errors::ErrorCategory;
use super::state::{Collection, ResourceRecord, Tags};
use super::tags::normalize_tags;

/// Collects one service/region branch
pub struct HierarchicalCollector {
    isolator: Isolator,
    arn_context: ArnContext,
    pagination: PaginationConfig,
    max_concurrent_nodes: usize,
    max_depth: usize,
}

impl HierarchicalCollector {
    /// `region` is `None` for global services
    pub fn new(config: &InventoryConfig, guard: BranchGuard, region: Option<String>, account_id: impl Into<String>) -> Self {
        let arn_context = ArnContext {
            partition: config.partition_for(region.as_deref()),
            region: region.clone(),
            account_id: account_id.into(),
        };
        Self {
            isolator: Isolator::new(guard, region),
            arn_context,
            pagination: config.pagination(),
            max_concurrent_nodes: config.max_concurrent_nodes.max(1),
            max_depth: config.max_depth,
        }
    }

    pub fn arn_context(&self) -> &ArnContext {
        &self.arn_context
    }

    /// Collect every declared resource type, top-level declarations in order.
    /// Never fails; the worst case is an empty collection with failures recorded.
    pub async fn collect(&self, declarations: &[ResourceDeclaration]) -> Collection {
        let mut collection = Collection::new();
        for declaration in declarations {
            if self.isolator.is_cancelled() {
                break;
            }
            collection.extend(self.collect_level(declaration, ParentScope::root(), None, 1).await);
        }
        collection
    }

    fn collect_level<'a>(
        &'a self,
        declaration: &'a ResourceDeclaration,
        scope: ParentScope,
        parent_id: Option<String>,
        depth: usize,
    ) -> BoxFuture<'a, Collection> {
        Box::pin(async move {
            let mut collection = Collection::new();

            let label = StepLabel::new(declaration.service, declaration.resource_type);
            let listing_label = match &parent_id {
                Some(parent_id) => label.for_resource(parent_id.clone()),
                None => label.clone(),
            };

            // The cut-off listing is reported like any other skipped listing
            if depth > self.max_depth {
                warn!(
                    "Max depth {} reached before {}/{} under {}",
                    self.max_depth,
                    declaration.service,
                    declaration.resource_type,
                    parent_id.as_deref().unwrap_or("root")
                );
                collection.push_failure(self.isolator.failure(
                    &listing_label,
                    StepKind::Listing { page: 0 },
                    declaration.listing.operation(),
                    ErrorCategory::engine(
                        "MaxDepthReached",
                        format!("nesting deeper than {} levels is not listed", self.max_depth),
                    ),
                ));
                return collection;
            }
            if self.isolator.is_cancelled() {
                return collection;
            }

            debug!(
                service = declaration.service,
                resource_type = declaration.resource_type,
                parent = parent_id.as_deref().unwrap_or(""),
                "listing"
            );

            let walker = PaginatedWalker::new(
                declaration.listing.as_ref(),
                &scope,
                &self.isolator,
                listing_label,
                self.pagination,
            );
            let walked = walker.collect().await;
            if let Some(failure) = walked.failure {
                collection.push_failure(failure);
            }

            let scope = &scope;
            let mut nodes = stream::iter(walked.items)
                .map(|summary| self.collect_node(declaration, scope, summary, depth))
                .buffered(self.max_concurrent_nodes);

            while let Some(part) = nodes.next().await {
                collection.extend(part);
            }

            collection
        })
    }

    /// One listed item: its record followed by every descendant record
    async fn collect_node(
        &self,
        declaration: &ResourceDeclaration,
        scope: &ParentScope,
        summary: Value,
        depth: usize,
    ) -> Collection {
        let mut collection = Collection::new();

        if declaration.is_excluded(&summary) || self.isolator.is_cancelled() {
            return collection;
        }

        let label = StepLabel::new(declaration.service, declaration.resource_type);
        let item_label = match ItemView::new(&summary, None).resolve_text(&declaration.id) {
            Some(id) => label.for_resource(id),
            None => label,
        };

        let mut detail: Option<Value> = None;
        for enrichment in &declaration.enrichments {
            let operation = enrichment.operation.as_ref();
            let input = enrichment_input(&summary, detail.as_ref());
            let call = operation.describe(scope, &input);
            let fetched = if enrichment.required {
                match self
                    .isolator
                    .required_or_skip(&item_label, operation.operation(), call, &mut collection.failures)
                    .await
                {
                    Some(fetched) => Some(fetched),
                    None => return collection,
                }
            } else {
                self.isolator
                    .detail_or_summary(&item_label, operation.operation(), call, &mut collection.failures)
                    .await
            };
            if let Some(fetched) = fetched {
                merge_detail(&mut detail, fetched);
            }
        }

        let view = ItemView::new(&summary, detail.as_ref());
        let builder = RecordBuilder::new(declaration, scope, &self.arn_context);
        let Some(identity) = builder.identity(&view) else {
            collection.push_failure(self.isolator.failure(
                &item_label,
                StepKind::Identity,
                "BuildRecord",
                ErrorCategory::engine("MissingIdentity", "item has no usable id or ARN"),
            ));
            return collection;
        };

        let tags = match &declaration.tags {
            TagSource::None => Tags::new(),
            TagSource::Inline(path) => view.get(path).map(normalize_tags).unwrap_or_default(),
            TagSource::Fetch(operation) => {
                let target = TagTarget {
                    id: identity.id.clone(),
                    arn: identity.arn.clone(),
                    name: identity.name.clone(),
                    region: builder.region(&view),
                };
                self.isolator
                    .tags_or_empty(
                        &item_label,
                        operation.operation(),
                        operation.fetch_tags(scope, &target),
                        &mut collection.failures,
                    )
                    .await
            }
        };

        let record = builder.build(&view, identity, tags);
        let child_scopes: Vec<(&ChildDeclaration, Option<ParentScope>)> = declaration
            .children
            .iter()
            .map(|child| (child, bind_child_scope(scope, child, &record)))
            .collect();
        let parent_id = record.id().to_string();
        collection.push_record(record);

        for (child, child_scope) in child_scopes {
            match child_scope {
                Some(child_scope) => {
                    let part = self
                        .collect_level(&child.resource, child_scope, Some(parent_id.clone()), depth + 1)
                        .await;
                    collection.extend(part);
                }
                None => {
                    let child_label = StepLabel::new(child.resource.service, child.resource.resource_type)
                        .for_resource(parent_id.clone());
                    collection.push_failure(self.isolator.failure(
                        &child_label,
                        StepKind::Listing { page: 0 },
                        child.resource.listing.operation(),
                        ErrorCategory::engine("MissingParentField", "parent record lacks a bound field"),
                    ));
                }
            }
        }

        collection
    }
}

/// Summary overlaid with the details fetched so far, so later enrichments can build on
/// earlier ones
fn enrichment_input<'v>(summary: &'v Value, detail: Option<&Value>) -> Cow<'v, Value> {
    match (summary, detail) {
        (Value::Object(summary), Some(Value::Object(detail))) => {
            let mut merged = summary.clone();
            merged.extend(detail.iter().map(|(key, value)| (key.clone(), value.clone())));
            Cow::Owned(Value::Object(merged))
        }
        _ => Cow::Borrowed(summary),
    }
}

/// Later enrichments win on key conflicts
fn merge_detail(detail: &mut Option<Value>, fetched: Value) {
    match (detail.as_mut(), fetched) {
        (Some(Value::Object(existing)), Value::Object(fetched)) => existing.extend(fetched),
        (None, fetched @ Value::Object(_)) => *detail = Some(fetched),
        (_, other) => debug!("ignoring non-object detail payload: {}", other),
    }
}

/// Bind the parent's fields into the child scope. `None` when a bound field is missing.
fn bind_child_scope(scope: &ParentScope, child: &ChildDeclaration, parent: &ResourceRecord) -> Option<ParentScope> {
    let mut child_scope = scope.clone();
    for binding in &child.bindings {
        let value = match &binding.source {
            ParentField::Id => parent.id().to_string(),
            ParentField::Arn => parent.arn().to_string(),
            ParentField::Name => parent.name().to_string(),
            ParentField::Detail(key) => match parent.detail(key)? {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            },
        };
        if value.is_empty() {
            return None;
        }
        child_scope = child_scope.with(binding.param, value);
    }
    Some(child_scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::inventory::declarations::{ArnSource, ParentBinding};
    use crate::app::inventory::failure_summary::FailureSummary;
    use crate::app::inventory::operations::{list_fn, Page};
    use serde_json::json;

    fn collector() -> HierarchicalCollector {
        HierarchicalCollector::new(
            &InventoryConfig::default(),
            BranchGuard::unbounded(4),
            Some("us-east-1".to_string()),
            "111122223333",
        )
    }

    #[test]
    fn test_merge_detail() {
        let mut detail = None;
        merge_detail(&mut detail, json!({"a": 1, "b": 1}));
        merge_detail(&mut detail, json!({"b": 2}));
        merge_detail(&mut detail, json!("ignored"));
        assert_eq!(detail, Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_enrichment_input_overlays_detail() {
        let summary = json!({"Name": "b", "Region": "old"});
        assert_eq!(enrichment_input(&summary, None).as_ref(), &summary);

        let detail = json!({"Region": "eu-west-1"});
        let input = enrichment_input(&summary, Some(&detail));
        assert_eq!(input.as_ref(), &json!({"Name": "b", "Region": "eu-west-1"}));
    }

    #[tokio::test]
    async fn test_depth_limit_stops_descent() {
        let listing = list_fn("ListLoop", |_scope: &ParentScope, _token: Option<String>| async {
            Ok(Page::last(vec![json!({"Id": "n", "Arn": "arn:aws:x:us-east-1:1:n/n"})]))
        });
        let mut declaration = ResourceDeclaration::new("x", "node", listing.clone());
        for _ in 0..4 {
            declaration = ResourceDeclaration::new("x", "node", listing.clone())
                .arn(ArnSource::Native("Arn".into()))
                .child(vec![ParentBinding::new("parent", ParentField::Id)], declaration);
        }

        let collection = collector().collect(&[declaration]).await;
        assert_eq!(collection.records.len(), 3);

        assert_eq!(collection.failures.len(), 1);
        let failure = &collection.failures[0];
        assert_eq!(failure.step, StepKind::Listing { page: 0 });
        assert_eq!(failure.resource.as_deref(), Some("n"));
        assert_eq!(failure.operation, "ListLoop");
        assert!(matches!(
            &failure.category,
            ErrorCategory::NonRetryable { code, .. } if code == "MaxDepthReached"
        ));

        let summary = FailureSummary::from_failures(&collection.failures);
        assert_eq!(summary.skipped_listings, 1);
    }
}
