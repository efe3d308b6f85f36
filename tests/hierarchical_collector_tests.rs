//! Engine behaviour under partial failure.
//!
//! Every test drives the hierarchical collector with in-memory listing, detail and tag
//! operations, so failures can be injected at exact points of the walk.

use anyhow::{anyhow, Result};
use aws_inventory::app::inventory::arn::ArnTemplate;
use aws_inventory::app::inventory::declarations::{
    ArnSource, FieldRef, ParentBinding, ParentField, ResourceDeclaration, TagSource,
};
use aws_inventory::app::inventory::isolation::BranchGuard;
use aws_inventory::app::inventory::operations::{
    detail_fn, list_fn, tag_fn, DetailOperation, ListOperation, Page, TagOperation, TagTarget,
};
use aws_inventory::app::inventory::scope::ParentScope;
use aws_inventory::app::inventory::{
    Collection, HierarchicalCollector, InventoryConfig, StepKind, Tags,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ACCOUNT: &str = "111122223333";
const REGION: &str = "us-west-2";

fn engine(config: &InventoryConfig) -> HierarchicalCollector {
    HierarchicalCollector::new(
        config,
        BranchGuard::unbounded(config.max_concurrent_requests),
        Some(REGION.to_string()),
        ACCOUNT,
    )
}

/// Single-threaded node processing so pre-order is observable directly
fn sequential_config() -> InventoryConfig {
    InventoryConfig {
        max_concurrent_nodes: 1,
        ..InventoryConfig::default()
    }
}

fn ids(collection: &Collection) -> Vec<&str> {
    collection.records.iter().map(|r| r.id()).collect()
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Listing that serves fixed pages; `None` in place of a page is an API error
fn paged_listing(operation: &'static str, pages: Vec<Option<Vec<Value>>>) -> Arc<dyn ListOperation> {
    let pages = Arc::new(pages);
    list_fn(operation, move |_scope: &ParentScope, token: Option<String>| {
        let pages = pages.clone();
        async move {
            let index: usize = token.as_deref().map(|t| t.parse().unwrap()).unwrap_or(0);
            let items = pages[index]
                .clone()
                .ok_or_else(|| anyhow!("InternalServerException: page {} unavailable", index))?;
            let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());
            Ok::<_, anyhow::Error>(Page::new(items, next))
        }
    })
}

/// Children listing keyed by the bound parent id
fn children_listing(children: HashMap<&'static str, Vec<Value>>) -> Arc<dyn ListOperation> {
    let children = Arc::new(children);
    list_fn("ListChildren", move |scope: &ParentScope, _token: Option<String>| {
        let items = scope
            .get("parent_id")
            .and_then(|parent| children.get(parent))
            .cloned();
        async move {
            let items = items.ok_or_else(|| anyhow!("ResourceNotFoundException: no such parent"))?;
            Ok::<_, anyhow::Error>(Page::last(items))
        }
    })
}

/// Detail that fails for the listed ids
fn detail_failing_for(failing: &'static [&'static str]) -> Arc<dyn DetailOperation> {
    detail_fn("DescribeThing", move |_scope: &ParentScope, summary: &Value| {
        let id = summary["Id"].as_str().unwrap_or_default().to_string();
        async move {
            if failing.contains(&id.as_str()) {
                return Err(anyhow!("AccessDeniedException: not authorized to describe {}", id));
            }
            Ok(json!({ "State": "ACTIVE", "Size": id.len() }))
        }
    })
}

/// Tags that fail for the listed ids
fn tags_failing_for(failing: &'static [&'static str]) -> Arc<dyn TagOperation> {
    tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
        let id = target.id.clone();
        async move {
            if failing.contains(&id.as_str()) {
                return Err(anyhow!("AccessDeniedException: not authorized to list tags"));
            }
            Ok(tags(&[("owner", &id)]))
        }
    })
}

fn item(id: &str) -> Value {
    json!({ "Id": id, "Name": id })
}

/// Top-level "A" with children "B1" and "B2"; ARNs are synthesized throughout
fn a_with_children(detail_failures: &'static [&'static str], tag_failures: &'static [&'static str]) -> ResourceDeclaration {
    let child = ResourceDeclaration::new("x", "child", children_listing(HashMap::from([("A", vec![item("B1"), item("B2")])])))
        .arn(ArnSource::Synthesized(
            ArnTemplate::new("x").resource_type("parent").param("parent_id").literal("child"),
        ))
        .enrich(detail_failing_for(detail_failures))
        .tags(TagSource::Fetch(tags_failing_for(tag_failures)))
        .field("state", "State")
        .field("size", "Size");

    ResourceDeclaration::new("x", "parent", paged_listing("ListParents", vec![Some(vec![item("A")])]))
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("parent")))
        .enrich(detail_failing_for(detail_failures))
        .tags(TagSource::Fetch(tags_failing_for(tag_failures)))
        .field("state", "State")
        .field("size", "Size")
        .child(vec![ParentBinding::new("parent_id", ParentField::Id)], child)
}

#[tokio::test]
async fn test_parent_detail_and_child_tag_failures() {
    let declaration = a_with_children(&["A"], &["B1"]);
    let collection = engine(&sequential_config()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["A", "B1", "B2"]);

    let a = &collection.records[0];
    assert_eq!(a.detail("state"), Some(&Value::Null));
    assert_eq!(a.tags(), &tags(&[("owner", "A")]));
    assert_eq!(a.arn(), "arn:aws:x:us-west-2:111122223333:parent/A");

    let b1 = &collection.records[1];
    assert_eq!(b1.detail("state"), Some(&json!("ACTIVE")));
    assert_eq!(b1.detail("parent_id"), Some(&json!("A")));
    assert!(b1.tags().is_empty());
    assert_eq!(b1.arn(), "arn:aws:x:us-west-2:111122223333:parent/A/child/B1");

    let b2 = &collection.records[2];
    assert_eq!(b2.detail("size"), Some(&json!(2)));
    assert_eq!(b2.tags(), &tags(&[("owner", "B2")]));

    let steps: Vec<StepKind> = collection.failures.iter().map(|f| f.step).collect();
    assert_eq!(
        steps,
        vec![StepKind::Detail { required: false }, StepKind::Tags]
    );
    assert_eq!(collection.failures[1].resource.as_deref(), Some("B1"));
}

#[tokio::test]
async fn test_tag_failure_leaves_sibling_untouched() {
    let listing = paged_listing("ListThings", vec![Some(vec![item("X"), item("Y")])]);
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")))
        .tags(TagSource::Fetch(tags_failing_for(&["X"])));

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["X", "Y"]);
    assert!(collection.records[0].tags().is_empty());
    assert_eq!(collection.records[1].tags(), &tags(&[("owner", "Y")]));
    assert_eq!(collection.failures.len(), 1);
}

#[tokio::test]
async fn test_second_page_failure_keeps_first_page() {
    let listing = paged_listing(
        "ListThings",
        vec![Some(vec![item("p1-a"), item("p1-b")]), None, Some(vec![item("p3")])],
    );
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")));

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["p1-a", "p1-b"]);
    assert_eq!(collection.failures.len(), 1);
    assert!(collection.failures[0].is_partial_listing());
    assert_eq!(collection.failures[0].step, StepKind::Listing { page: 1 });
}

#[tokio::test]
async fn test_first_page_failure_skips_only_that_type() {
    let broken = ResourceDeclaration::new("x", "broken", paged_listing("ListBroken", vec![None]));
    let healthy = ResourceDeclaration::new("x", "healthy", paged_listing("ListHealthy", vec![Some(vec![item("h")])]))
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("healthy")));

    let collection = engine(&InventoryConfig::default()).collect(&[broken, healthy]).await;

    assert_eq!(ids(&collection), vec!["h"]);
    assert!(collection.failures[0].is_skipped_listing());
    assert_eq!(collection.failures[0].resource_type, "broken");
}

#[tokio::test]
async fn test_failed_child_listing_keeps_parent() {
    // Parent "Z" has no children entry, so its child listing errors
    let child = ResourceDeclaration::new("x", "child", children_listing(HashMap::from([("A", vec![item("B1")])])))
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("child")));
    let declaration = ResourceDeclaration::new(
        "x",
        "parent",
        paged_listing("ListParents", vec![Some(vec![item("Z"), item("A")])]),
    )
    .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("parent")))
    .child(vec![ParentBinding::new("parent_id", ParentField::Id)], child);

    let collection = engine(&sequential_config()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["Z", "A", "B1"]);
    assert_eq!(collection.failures.len(), 1);
    assert_eq!(collection.failures[0].resource.as_deref(), Some("Z"));
}

#[tokio::test]
async fn test_child_second_page_failure_keeps_first_page_children() {
    // Every parent's children listing serves one page, then throttles
    let listing = list_fn("ListChildren", |_scope: &ParentScope, token: Option<String>| async move {
        match token {
            None => Ok(Page::new(vec![item("c1"), item("c2")], Some("2".to_string()))),
            Some(_) => Err(anyhow!("ThrottlingException: Rate exceeded")),
        }
    });
    let child = ResourceDeclaration::new("x", "child", listing).arn(ArnSource::Synthesized(
        ArnTemplate::new("x").resource_type("parent").param("parent_id").literal("child"),
    ));
    let declaration = ResourceDeclaration::new(
        "x",
        "parent",
        paged_listing("ListParents", vec![Some(vec![item("P"), item("Q")])]),
    )
    .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("parent")))
    .child(vec![ParentBinding::new("parent_id", ParentField::Id)], child);

    let collection = engine(&sequential_config()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["P", "c1", "c2", "Q", "c1", "c2"]);
    let parents: Vec<Option<&str>> = collection
        .records
        .iter()
        .map(|r| r.details().get("parent_id").and_then(Value::as_str))
        .collect();
    assert_eq!(
        parents,
        vec![None, Some("P"), Some("P"), None, Some("Q"), Some("Q")]
    );
    assert_eq!(
        collection.records[1].arn(),
        "arn:aws:x:us-west-2:111122223333:parent/P/child/c1"
    );

    let failures: Vec<(Option<&str>, StepKind)> = collection
        .failures
        .iter()
        .map(|f| (f.resource.as_deref(), f.step))
        .collect();
    assert_eq!(
        failures,
        vec![
            (Some("P"), StepKind::Listing { page: 1 }),
            (Some("Q"), StepKind::Listing { page: 1 }),
        ]
    );
    assert!(collection.failures.iter().all(|f| f.is_partial_listing()));
}

#[tokio::test]
async fn test_required_detail_failure_skips_item_only() {
    let listing = paged_listing("ListThings", vec![Some(vec![item("keep"), item("drop")])]);
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")))
        .require(detail_failing_for(&["drop"]));

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["keep"]);
    assert_eq!(collection.failures[0].step, StepKind::Detail { required: true });
}

#[tokio::test]
async fn test_missing_native_arn_skips_item() {
    let listing = paged_listing(
        "ListThings",
        vec![Some(vec![
            json!({"Id": "with", "Arn": "arn:aws:x:us-west-2:111122223333:thing/with"}),
            json!({"Id": "without"}),
        ])],
    );
    let declaration = ResourceDeclaration::new("x", "thing", listing);

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;

    assert_eq!(ids(&collection), vec!["with"]);
    assert_eq!(collection.failures[0].step, StepKind::Identity);
}

#[tokio::test]
async fn test_children_reference_emitted_parents() {
    let children = HashMap::from([
        ("A", vec![item("A-1"), item("A-2")]),
        ("B", vec![item("B-1")]),
        ("C", vec![]),
    ]);
    let child = ResourceDeclaration::new("x", "child", children_listing(children))
        .arn(ArnSource::Synthesized(
            ArnTemplate::new("x").resource_type("parent").param("parent_id").literal("child"),
        ));
    let declaration = ResourceDeclaration::new(
        "x",
        "parent",
        paged_listing("ListParents", vec![Some(vec![item("A"), item("B")]), Some(vec![item("C")])]),
    )
    .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("parent")))
    .child(vec![ParentBinding::new("parent_id", ParentField::Id)], child);

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;
    assert!(collection.is_complete());

    let mut seen_parents = Vec::new();
    for record in &collection.records {
        match record.resource_type() {
            "parent" => seen_parents.push(record.id().to_string()),
            _ => {
                let parent = record.detail("parent_id").and_then(Value::as_str).unwrap();
                // Pre-order: the parent was already emitted
                assert!(seen_parents.iter().any(|p| p == parent), "{} before its parent", record.id());
            }
        }
    }
    assert_eq!(collection.records.len(), 6);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let listing = list_fn("ListThings", move |_scope: &ParentScope, _token: Option<String>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Page::last((0..20).map(|i| item(&format!("t-{:02}", i))).collect())) }
    });
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .name(FieldRef::text("Missing"))
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")))
        .tags(TagSource::Fetch(tags_failing_for(&[])));

    let config = InventoryConfig::default();
    let first = engine(&config).collect(&[declaration.clone()]).await;
    let second = engine(&config).collect(&[declaration]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(first.records, second.records);
    // Name falls back to the id when the name field is absent
    assert_eq!(first.records[0].name(), "t-00");
}

#[tokio::test]
async fn test_inline_tags_are_normalized() {
    let listing = paged_listing(
        "ListThings",
        vec![Some(vec![json!({
            "Id": "t",
            "TagList": [{"Key": "env", "Value": "prod"}, {"Key": "env", "Value": "dev"}]
        })])],
    );
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")))
        .tags(TagSource::Inline("TagList"));

    let collection = engine(&InventoryConfig::default()).collect(&[declaration]).await;
    assert_eq!(collection.records[0].tags(), &tags(&[("env", "dev")]));
}

#[tokio::test]
async fn test_cancelled_branch_returns_what_it_has() -> Result<()> {
    let guard = BranchGuard::unbounded(4);
    let cancel = guard.cancel_token().clone();
    let collector = HierarchicalCollector::new(&InventoryConfig::default(), guard, Some(REGION.to_string()), ACCOUNT);

    let listing = list_fn("ListThings", move |_scope: &ParentScope, token: Option<String>| {
        let cancel = cancel.clone();
        async move {
            // Cancel while the first page is in flight; the page itself still lands
            if token.is_none() {
                cancel.cancel();
            }
            Ok(Page::new(vec![item("first")], Some("more".to_string())))
        }
    });
    let declaration = ResourceDeclaration::new("x", "thing", listing)
        .arn(ArnSource::Synthesized(ArnTemplate::new("x").resource_type("thing")));

    let collection = collector.collect(&[declaration]).await;
    assert!(collection.records.len() <= 1);
    assert!(collection
        .failures
        .iter()
        .all(|failure| failure.category.short_label() == "cancelled"));
    Ok(())
}
