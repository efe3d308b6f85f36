//! Read-only API operations consumed by the collection engine.
//!
//! Service adapters expose each SDK call as one of three operation kinds: a paged
//! listing, a per-item detail fetch, or a per-item tag fetch. Declarations hold them as
//! trait objects so the engine never depends on a concrete SDK client.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::scope::ParentScope;
use super::state::Tags;

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

impl Page {
    /// Empty continuation tokens are treated as the end of the listing
    pub fn new(items: Vec<Value>, next_token: Option<String>) -> Self {
        Self {
            items,
            next_token: next_token.filter(|token| !token.is_empty()),
        }
    }

    /// A listing that has no continuation at all
    pub fn last(items: Vec<Value>) -> Self {
        Self::new(items, None)
    }
}

/// Identity of the resource a tag fetch is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTarget {
    pub id: String,
    pub arn: String,
    pub name: String,
    /// Region the record will carry
    pub region: String,
}

#[async_trait]
pub trait ListOperation: Send + Sync {
    /// SDK operation name, used in failure reports
    fn operation(&self) -> &str;

    async fn list_page(&self, scope: &ParentScope, token: Option<String>) -> Result<Page>;
}

#[async_trait]
pub trait DetailOperation: Send + Sync {
    fn operation(&self) -> &str;

    /// Fetch the detail object for one listed item. `summary` already carries the
    /// fields returned by earlier enrichments of the same item.
    async fn describe(&self, scope: &ParentScope, summary: &Value) -> Result<Value>;
}

#[async_trait]
pub trait TagOperation: Send + Sync {
    fn operation(&self) -> &str;

    async fn fetch_tags(&self, scope: &ParentScope, target: &TagTarget) -> Result<Tags>;
}

struct ListFn<F, Fut> {
    operation: &'static str,
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> ListOperation for ListFn<F, Fut>
where
    F: Fn(&ParentScope, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page>> + Send + 'static,
{
    fn operation(&self) -> &str {
        self.operation
    }

    async fn list_page(&self, scope: &ParentScope, token: Option<String>) -> Result<Page> {
        (self.f)(scope, token).await
    }
}

struct DetailFn<F, Fut> {
    operation: &'static str,
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> DetailOperation for DetailFn<F, Fut>
where
    F: Fn(&ParentScope, &Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn operation(&self) -> &str {
        self.operation
    }

    async fn describe(&self, scope: &ParentScope, summary: &Value) -> Result<Value> {
        (self.f)(scope, summary).await
    }
}

struct TagFn<F, Fut> {
    operation: &'static str,
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> TagOperation for TagFn<F, Fut>
where
    F: Fn(&ParentScope, &TagTarget) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Tags>> + Send + 'static,
{
    fn operation(&self) -> &str {
        self.operation
    }

    async fn fetch_tags(&self, scope: &ParentScope, target: &TagTarget) -> Result<Tags> {
        (self.f)(scope, target).await
    }
}

/// Wrap a closure as a listing operation.
///
/// The closure must copy what it needs out of the scope before returning its future.
pub fn list_fn<F, Fut>(operation: &'static str, f: F) -> Arc<dyn ListOperation>
where
    F: Fn(&ParentScope, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page>> + Send + 'static,
{
    Arc::new(ListFn {
        operation,
        f,
        _future: PhantomData,
    })
}

pub fn detail_fn<F, Fut>(operation: &'static str, f: F) -> Arc<dyn DetailOperation>
where
    F: Fn(&ParentScope, &Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(DetailFn {
        operation,
        f,
        _future: PhantomData,
    })
}

pub fn tag_fn<F, Fut>(operation: &'static str, f: F) -> Arc<dyn TagOperation>
where
    F: Fn(&ParentScope, &TagTarget) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Tags>> + Send + 'static,
{
    Arc::new(TagFn {
        operation,
        f,
        _future: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_token_ends_listing() {
        assert_eq!(Page::new(vec![], Some(String::new())).next_token, None);
        assert_eq!(
            Page::new(vec![], Some("abc".to_string())).next_token.as_deref(),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn test_closure_operations() {
        let list = list_fn("ListThings", |scope: &ParentScope, token: Option<String>| {
            let parent = scope.get("parent_id").unwrap_or("root").to_string();
            async move {
                Ok(Page::new(
                    vec![json!({"parent": parent})],
                    token.map(|t| format!("{}+", t)),
                ))
            }
        });
        let scope = ParentScope::root().with("parent_id", "p-1");
        let page = list.list_page(&scope, Some("t".to_string())).await.unwrap();

        assert_eq!(list.operation(), "ListThings");
        assert_eq!(page.items, vec![json!({"parent": "p-1"})]);
        assert_eq!(page.next_token.as_deref(), Some("t+"));

        let detail = detail_fn("GetThing", |_scope: &ParentScope, summary: &Value| {
            let id = summary["id"].clone();
            async move { Ok(json!({"id": id, "described": true})) }
        });
        let described = detail.describe(&scope, &json!({"id": "x"})).await.unwrap();
        assert_eq!(described["described"], json!(true));

        let tags = tag_fn("ListTags", |_scope: &ParentScope, target: &TagTarget| {
            let arn = target.arn.clone();
            async move { Ok(Tags::from([("arn".to_string(), arn)])) }
        });
        let target = TagTarget {
            id: "x".to_string(),
            arn: "arn:aws:x:r:1:thing/x".to_string(),
            name: "x".to_string(),
            region: "r".to_string(),
        };
        let fetched = tags.fetch_tags(&scope, &target).await.unwrap();
        assert_eq!(fetched["arn"], "arn:aws:x:r:1:thing/x");
    }
}
