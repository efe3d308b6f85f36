//! Tag normalization.
//!
//! Services return tags either as a list of key/value records (with `key`, `Key` or
//! `TagKey` style field names) or as a plain mapping. Everything is folded into one
//! [`Tags`] mapping here so the rest of the engine never sees the difference.

use serde_json::Value;

use super::state::Tags;

const KEY_FIELDS: &[&str] = &["key", "tagkey"];
const VALUE_FIELDS: &[&str] = &["value", "tagvalue"];

/// Normalize a raw tag payload.
///
/// Lists keep their order and the last duplicate key wins. A missing key or value
/// becomes the empty string rather than dropping the entry. Anything that is neither
/// a list nor a mapping yields an empty mapping.
pub fn normalize_tags(raw: &Value) -> Tags {
    match raw {
        Value::Array(entries) => normalize_pairs(entries.iter().map(|entry| {
            (
                lookup_field(entry, KEY_FIELDS),
                lookup_field(entry, VALUE_FIELDS),
            )
        })),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), value_text(value)))
            .collect(),
        _ => Tags::new(),
    }
}

/// Fold already extracted pairs into a mapping
pub fn normalize_pairs<I, K, V>(pairs: I) -> Tags
where
    I: IntoIterator<Item = (Option<K>, Option<V>)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut tags = Tags::new();
    for (key, value) in pairs {
        tags.insert(
            key.map(Into::into).unwrap_or_default(),
            value.map(Into::into).unwrap_or_default(),
        );
    }
    tags
}

fn lookup_field(entry: &Value, names: &[&str]) -> Option<String> {
    let object = entry.as_object()?;
    object
        .iter()
        .find(|(field, _)| names.iter().any(|name| field.eq_ignore_ascii_case(name)))
        .map(|(_, value)| value_text(value))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
