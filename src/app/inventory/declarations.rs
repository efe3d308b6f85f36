//! Declarative description of what to collect for one resource type.
//!
//! A [`ResourceDeclaration`] names the listing operation, where the id, name and ARN
//! come from, which enrichments and tag source apply, the fixed set of detail fields,
//! and the child resource types listed per parent. Parent/child relationships follow
//! the same idea as the per-type child tables used for recursive querying: each child
//! declares which parent fields it needs as named parameters.

use serde_json::Value;
use std::sync::Arc;

use super::arn::ArnTemplate;
use super::operations::{DetailOperation, ListOperation, TagOperation};

/// How a value read from a summary or detail object is rendered into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Copied as is
    Value,
    /// Rendered as a string; numbers and booleans are stringified
    Text,
    /// Canonical RFC 3339 UTC string
    Timestamp,
    /// List of strings joined with the separator
    Joined(&'static str),
    /// Boolean that is true only when every listed flag of the object is true
    AllTrue(&'static [&'static str]),
}

/// One place a field may be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSource {
    /// Dotted path (`Rules.0.SSEAlgorithm`) or JSON pointer (`/Rules/0`)
    pub path: &'static str,
    pub kind: FieldKind,
}

/// Ordered candidates for a field; the first one that resolves wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    sources: Vec<FieldSource>,
}

impl FieldRef {
    fn single(path: &'static str, kind: FieldKind) -> Self {
        Self {
            sources: vec![FieldSource { path, kind }],
        }
    }

    pub fn path(path: &'static str) -> Self {
        Self::single(path, FieldKind::Value)
    }

    pub fn text(path: &'static str) -> Self {
        Self::single(path, FieldKind::Text)
    }

    pub fn timestamp(path: &'static str) -> Self {
        Self::single(path, FieldKind::Timestamp)
    }

    pub fn joined(path: &'static str, separator: &'static str) -> Self {
        Self::single(path, FieldKind::Joined(separator))
    }

    pub fn all_true(path: &'static str, flags: &'static [&'static str]) -> Self {
        Self::single(path, FieldKind::AllTrue(flags))
    }

    /// Add a fallback candidate read as plain value
    pub fn or(mut self, path: &'static str) -> Self {
        self.sources.push(FieldSource {
            path,
            kind: FieldKind::Value,
        });
        self
    }

    pub fn or_joined(mut self, path: &'static str, separator: &'static str) -> Self {
        self.sources.push(FieldSource {
            path,
            kind: FieldKind::Joined(separator),
        });
        self
    }

    pub fn sources(&self) -> &[FieldSource] {
        &self.sources
    }
}

impl From<&'static str> for FieldRef {
    fn from(path: &'static str) -> Self {
        FieldRef::path(path)
    }
}

/// One declared detail field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub key: &'static str,
    pub source: FieldRef,
}

/// Where the record's identity ARN comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArnSource {
    /// ARN must be present in the response; items without one are skipped
    Native(FieldRef),
    /// Native ARN preferred, synthesized when absent
    NativeOr(FieldRef, ArnTemplate),
    /// The API never returns an ARN
    Synthesized(ArnTemplate),
}

/// Where the record's region comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// Region of the branch being collected, or the global sentinel
    Scope,
    /// Region reported by the resource itself, with a default when empty
    Field {
        path: &'static str,
        default: &'static str,
    },
}

/// A detail fetch merged into the item before the record is built
#[derive(Clone)]
pub struct Enrichment {
    pub operation: Arc<dyn DetailOperation>,
    /// Required details carry identity; when they fail the item is skipped
    pub required: bool,
}

#[derive(Clone, Default)]
pub enum TagSource {
    #[default]
    None,
    /// Tags embedded in the summary or detail under this path
    Inline(&'static str),
    Fetch(Arc<dyn TagOperation>),
}

/// Drop listed items whose field matches one of the values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub path: &'static str,
    pub values: &'static [&'static str],
}

impl Exclusion {
    pub fn matches(&self, summary: &Value) -> bool {
        lookup_path(summary, self.path)
            .and_then(Value::as_str)
            .map(|value| self.values.contains(&value))
            .unwrap_or(false)
    }
}

/// Parent record field a child parameter is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentField {
    Id,
    Arn,
    Name,
    /// A field of the parent's built details
    Detail(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentBinding {
    pub param: &'static str,
    pub source: ParentField,
}

impl ParentBinding {
    pub fn new(param: &'static str, source: ParentField) -> Self {
        Self { param, source }
    }
}

/// Child resource type listed once per parent record
#[derive(Clone)]
pub struct ChildDeclaration {
    pub bindings: Vec<ParentBinding>,
    pub resource: ResourceDeclaration,
}

/// Everything the collector needs to know about one resource type
#[derive(Clone)]
pub struct ResourceDeclaration {
    pub service: &'static str,
    pub resource_type: &'static str,
    pub listing: Arc<dyn ListOperation>,
    pub id: FieldRef,
    pub name: Option<FieldRef>,
    pub arn: ArnSource,
    pub region: RegionSource,
    pub enrichments: Vec<Enrichment>,
    pub tags: TagSource,
    pub fields: Vec<FieldMapping>,
    pub exclude: Option<Exclusion>,
    pub children: Vec<ChildDeclaration>,
}

impl ResourceDeclaration {
    /// Declaration with `Id`/`Name`/`Arn` summary fields, region from scope and no tags
    pub fn new(service: &'static str, resource_type: &'static str, listing: Arc<dyn ListOperation>) -> Self {
        Self {
            service,
            resource_type,
            listing,
            id: FieldRef::text("Id"),
            name: Some(FieldRef::text("Name")),
            arn: ArnSource::Native(FieldRef::text("Arn")),
            region: RegionSource::Scope,
            enrichments: Vec::new(),
            tags: TagSource::None,
            fields: Vec::new(),
            exclude: None,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<FieldRef>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<FieldRef>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name always defaults to the id
    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn arn(mut self, arn: ArnSource) -> Self {
        self.arn = arn;
        self
    }

    pub fn region(mut self, region: RegionSource) -> Self {
        self.region = region;
        self
    }

    /// Optional detail fetch; on failure the summary alone is used
    pub fn enrich(mut self, operation: Arc<dyn DetailOperation>) -> Self {
        self.enrichments.push(Enrichment {
            operation,
            required: false,
        });
        self
    }

    /// Detail fetch the item cannot be recorded without
    pub fn require(mut self, operation: Arc<dyn DetailOperation>) -> Self {
        self.enrichments.push(Enrichment {
            operation,
            required: true,
        });
        self
    }

    pub fn tags(mut self, tags: TagSource) -> Self {
        self.tags = tags;
        self
    }

    pub fn field(mut self, key: &'static str, source: impl Into<FieldRef>) -> Self {
        self.fields.push(FieldMapping {
            key,
            source: source.into(),
        });
        self
    }

    pub fn timestamp(self, key: &'static str, path: &'static str) -> Self {
        self.field(key, FieldRef::timestamp(path))
    }

    pub fn exclude(mut self, path: &'static str, values: &'static [&'static str]) -> Self {
        self.exclude = Some(Exclusion { path, values });
        self
    }

    pub fn child(mut self, bindings: Vec<ParentBinding>, resource: ResourceDeclaration) -> Self {
        self.children.push(ChildDeclaration { bindings, resource });
        self
    }

    pub fn is_excluded(&self, summary: &Value) -> bool {
        self.exclude
            .as_ref()
            .map(|exclusion| exclusion.matches(summary))
            .unwrap_or(false)
    }

    /// Depth of the deepest child chain below this declaration
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.resource.depth())
            .max()
            .unwrap_or(0)
    }
}

/// Resolve a dotted path or JSON pointer. JSON null counts as absent.
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let found = if path.starts_with('/') {
        value.pointer(path)
    } else {
        path.split('.')
            .try_fold(value, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    };
    found.filter(|v| !v.is_null())
}
