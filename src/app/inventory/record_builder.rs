use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::arn::ArnContext;
use super::declarations::{lookup_path, ArnSource, FieldKind, FieldRef, FieldSource, RegionSource, ResourceDeclaration};
use super::scope::ParentScope;
use super::state::{Details, ResourceRecord, Tags, GLOBAL_REGION};

/// Read view over one listed item: detail fields shadow summary fields
#[derive(Debug, Clone, Copy)]
pub struct ItemView<'a> {
    pub summary: &'a Value,
    pub detail: Option<&'a Value>,
}

impl<'a> ItemView<'a> {
    pub fn new(summary: &'a Value, detail: Option<&'a Value>) -> Self {
        Self { summary, detail }
    }

    pub fn get(&self, path: &str) -> Option<&'a Value> {
        self.detail
            .and_then(|detail| lookup_path(detail, path))
            .or_else(|| lookup_path(self.summary, path))
    }

    /// First candidate of `field` that resolves to a non-null value
    pub fn resolve(&self, field: &FieldRef) -> Value {
        field
            .sources()
            .iter()
            .map(|source| self.resolve_source(source))
            .find(|value| !value.is_null())
            .unwrap_or(Value::Null)
    }

    /// First candidate that renders to a non-empty string
    pub fn resolve_text(&self, field: &FieldRef) -> Option<String> {
        field.sources().iter().find_map(|source| {
            let text = match self.resolve_source(source) {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some(text).filter(|s| !s.is_empty())
        })
    }

    fn resolve_source(&self, source: &FieldSource) -> Value {
        let raw = self.get(source.path);
        match source.kind {
            FieldKind::Value => raw.cloned().unwrap_or(Value::Null),
            FieldKind::Text => match raw {
                None => Value::Null,
                Some(Value::String(s)) => Value::String(s.clone()),
                Some(other) => Value::String(other.to_string()),
            },
            FieldKind::Timestamp => raw.map(canonical_timestamp).unwrap_or(Value::Null),
            FieldKind::Joined(separator) => match raw {
                Some(Value::Array(parts)) => {
                    let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
                    if parts.is_empty() {
                        Value::Null
                    } else {
                        Value::String(parts.join(separator))
                    }
                }
                Some(Value::String(s)) => Value::String(s.clone()),
                _ => Value::Null,
            },
            FieldKind::AllTrue(flags) => match raw {
                Some(Value::Object(map)) => Value::Bool(
                    flags
                        .iter()
                        .all(|flag| map.get(*flag).and_then(Value::as_bool).unwrap_or(false)),
                ),
                _ => Value::Null,
            },
        }
    }
}

/// Render a timestamp as RFC 3339 UTC (`2024-01-02T03:04:05Z`).
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS[.f][+offset]` strings and epoch
/// seconds. Unparseable strings are kept unchanged.
pub fn canonical_timestamp(raw: &Value) -> Value {
    let parsed = match raw {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_f64().and_then(epoch_to_utc),
        _ => None,
    };
    match parsed {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => raw.clone(),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn epoch_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

/// Identity of an item before tags are fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub arn: String,
}

/// Assembles records for one declaration under one parent scope
pub struct RecordBuilder<'a> {
    declaration: &'a ResourceDeclaration,
    scope: &'a ParentScope,
    context: &'a ArnContext,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(declaration: &'a ResourceDeclaration, scope: &'a ParentScope, context: &'a ArnContext) -> Self {
        Self {
            declaration,
            scope,
            context,
        }
    }

    /// Id, name and ARN of the item. `None` when the id is missing or no ARN can be
    /// obtained, in which case the item cannot be recorded.
    pub fn identity(&self, item: &ItemView<'_>) -> Option<Identity> {
        let id = item.resolve_text(&self.declaration.id)?;
        let name = self
            .declaration
            .name
            .as_ref()
            .and_then(|name| item.resolve_text(name))
            .unwrap_or_else(|| id.clone());

        let arn = match &self.declaration.arn {
            ArnSource::Native(field) => item.resolve_text(field),
            ArnSource::NativeOr(field, template) => item
                .resolve_text(field)
                .or_else(|| template.render(self.context, self.scope, &id, &name)),
            ArnSource::Synthesized(template) => template.render(self.context, self.scope, &id, &name),
        }?;

        Some(Identity { id, name, arn })
    }

    /// Region recorded for the item; `global` for global services
    pub fn region(&self, item: &ItemView<'_>) -> String {
        match &self.declaration.region {
            RegionSource::Scope => self
                .context
                .region
                .clone()
                .unwrap_or_else(|| GLOBAL_REGION.to_string()),
            RegionSource::Field { path, default } => item
                .get(path)
                .and_then(Value::as_str)
                .filter(|region| !region.is_empty())
                .unwrap_or(*default)
                .to_string(),
        }
    }

    /// Parent identifiers first, then every declared field in order. Fields that do
    /// not resolve are present with a null value.
    pub fn details(&self, item: &ItemView<'_>) -> Details {
        let mut details = self.scope.to_details();
        for mapping in &self.declaration.fields {
            details.insert(mapping.key.to_string(), item.resolve(&mapping.source));
        }
        details
    }

    pub fn build(&self, item: &ItemView<'_>, identity: Identity, tags: Tags) -> ResourceRecord {
        ResourceRecord::new(
            self.declaration.service.to_string(),
            self.declaration.resource_type.to_string(),
            identity.id,
            identity.arn,
            identity.name,
            self.region(item),
            self.details(item),
            tags,
        )
    }
}

/// One-shot form: `None` when the item has no usable identity
pub fn build_record(
    declaration: &ResourceDeclaration,
    scope: &ParentScope,
    context: &ArnContext,
    item: &ItemView<'_>,
    tags: Tags,
) -> Option<ResourceRecord> {
    let builder = RecordBuilder::new(declaration, scope, context);
    let identity = builder.identity(item)?;
    Some(builder.build(item, identity, tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::inventory::arn::ArnTemplate;
    use crate::app::inventory::operations::{list_fn, ListOperation, Page};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn listing() -> Arc<dyn ListOperation> {
        list_fn("ListWidgets", |_scope: &ParentScope, _token: Option<String>| async {
            Ok(Page::last(vec![]))
        })
    }

    fn context() -> ArnContext {
        ArnContext {
            partition: "aws".to_string(),
            region: Some("r1".to_string()),
            account_id: "111".to_string(),
        }
    }

    fn widget() -> ResourceDeclaration {
        ResourceDeclaration::new("x", "widget", listing())
            .arn(ArnSource::NativeOr(
                FieldRef::text("Arn"),
                ArnTemplate::new("x").resource_type("widget"),
            ))
            .field("status", "Status")
            .timestamp("created_at", "CreatedAt")
            .field("size", "Size")
    }

    #[test]
    fn test_synthesized_arn_and_name_default() {
        let summary = json!({"Id": "w1", "Status": "READY"});
        let record = build_record(&widget(), &ParentScope::root(), &context(), &ItemView::new(&summary, None), Tags::new())
            .expect("record");

        assert_eq!(record.arn(), "arn:aws:x:r1:111:widget/w1");
        assert_eq!(record.name(), "w1");
        assert_eq!(record.region(), "r1");
        assert_eq!(
            Value::Object(record.details().clone()),
            json!({"status": "READY", "created_at": null, "size": null})
        );
        assert!(record.tags().is_empty());
    }

    #[test]
    fn test_native_arn_preferred_and_detail_shadows_summary() {
        let summary = json!({"Id": "w1", "Name": "first", "Status": "CREATING", "Arn": "arn:native"});
        let detail = json!({"Status": "READY", "CreatedAt": "2024-01-02 03:04:05+00:00", "Size": 7});
        let record = build_record(
            &widget(),
            &ParentScope::root(),
            &context(),
            &ItemView::new(&summary, Some(&detail)),
            Tags::new(),
        )
        .expect("record");

        assert_eq!(record.arn(), "arn:native");
        assert_eq!(record.name(), "first");
        assert_eq!(record.detail("status"), Some(&json!("READY")));
        assert_eq!(record.detail("created_at"), Some(&json!("2024-01-02T03:04:05Z")));
        assert_eq!(record.detail("size"), Some(&json!(7)));
    }

    #[test]
    fn test_missing_id_yields_nothing() {
        let summary = json!({"Name": "nameless", "Id": ""});
        assert!(build_record(&widget(), &ParentScope::root(), &context(), &ItemView::new(&summary, None), Tags::new()).is_none());
    }

    #[test]
    fn test_native_only_arn_missing_skips() {
        let declaration = ResourceDeclaration::new("x", "widget", listing());
        let summary = json!({"Id": "w1"});
        assert!(build_record(&declaration, &ParentScope::root(), &context(), &ItemView::new(&summary, None), Tags::new()).is_none());
    }

    #[test]
    fn test_scope_params_lead_details() {
        let declaration = ResourceDeclaration::new("datazone", "project", listing())
            .arn(ArnSource::Synthesized(
                ArnTemplate::new("datazone").resource_type("project").param("domain_id"),
            ))
            .field("description", "Description");
        let scope = ParentScope::root().with("domain_id", "dzd_1");
        let summary = json!({"Id": "p1", "Name": "proj"});

        let record = build_record(&declaration, &scope, &context(), &ItemView::new(&summary, None), Tags::new())
            .expect("record");

        assert_eq!(record.arn(), "arn:aws:datazone:r1:111:project/dzd_1/p1");
        let keys: Vec<&String> = record.details().keys().collect();
        assert_eq!(keys, vec!["domain_id", "description"]);
    }

    #[test]
    fn test_region_from_field_with_default() {
        let declaration = ResourceDeclaration::new("s3", "bucket", listing())
            .id("Name")
            .arn(ArnSource::Synthesized(ArnTemplate::new("s3").local_name()))
            .region(RegionSource::Field {
                path: "LocationConstraint",
                default: "us-east-1",
            });
        let ctx = ArnContext {
            region: None,
            ..context()
        };

        let west = json!({"Name": "b1", "LocationConstraint": "eu-west-1"});
        let east = json!({"Name": "b2", "LocationConstraint": ""});
        let west = build_record(&declaration, &ParentScope::root(), &ctx, &ItemView::new(&west, None), Tags::new()).expect("record");
        let east = build_record(&declaration, &ParentScope::root(), &ctx, &ItemView::new(&east, None), Tags::new()).expect("record");

        assert_eq!(west.region(), "eu-west-1");
        assert_eq!(west.arn(), "arn:aws:s3:::b1");
        assert_eq!(east.region(), "us-east-1");
    }

    #[test]
    fn test_field_kinds() {
        let summary = json!({
            "Namespace": ["sales", "eu"],
            "Block": {"A": true, "B": true},
            "Partial": {"A": true, "B": false},
            "Count": 4
        });
        let view = ItemView::new(&summary, None);

        assert_eq!(view.resolve(&FieldRef::joined("Namespace", "/")), json!("sales/eu"));
        assert_eq!(view.resolve(&FieldRef::all_true("Block", &["A", "B"])), json!(true));
        assert_eq!(view.resolve(&FieldRef::all_true("Partial", &["A", "B"])), json!(false));
        assert_eq!(view.resolve(&FieldRef::all_true("Absent", &["A"])), Value::Null);
        assert_eq!(view.resolve(&FieldRef::text("Count")), json!("4"));
        assert_eq!(
            view.resolve(&FieldRef::path("NamespaceId").or_joined("Namespace", ".")),
            json!("sales.eu")
        );
    }

    #[test]
    fn test_canonical_timestamp() {
        assert_eq!(canonical_timestamp(&json!("2024-01-02T03:04:05Z")), json!("2024-01-02T03:04:05Z"));
        assert_eq!(
            canonical_timestamp(&json!("2024-01-02T05:04:05+02:00")),
            json!("2024-01-02T03:04:05Z")
        );
        assert_eq!(canonical_timestamp(&json!("2024-01-02 03:04:05")), json!("2024-01-02T03:04:05Z"));
        assert_eq!(canonical_timestamp(&json!(1704164645)), json!("2024-01-02T03:04:05Z"));
        assert_eq!(canonical_timestamp(&json!("not a date")), json!("not a date"));
        assert_eq!(canonical_timestamp(&Value::Null), Value::Null);
    }
}
