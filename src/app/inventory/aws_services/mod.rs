//! AWS SDK adapters.
//!
//! Each adapter wraps one SDK call as a list, detail or tag operation and converts
//! the SDK output into a PascalCase JSON object. The conversion helpers below accept
//! both required and optional SDK members, so `put(&mut json, "Status", x.status())`
//! reads the same whether the member is `&T` or `Option<&T>`.

use anyhow::{anyhow, Result};
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::declarations::lookup_path;
use super::state::Tags;

pub mod bedrock;
pub mod bedrock_agent;
pub mod datazone;
pub mod dsql;
pub mod s3;
pub mod s3tables;
pub mod timestream_influxdb;

pub(crate) type JsonObject = Map<String, Value>;

/// SDK member convertible to a JSON scalar
pub(crate) trait JsonField {
    fn into_json(self) -> Option<Value>;
}

impl<T: AsRef<str> + ?Sized> JsonField for &T {
    fn into_json(self) -> Option<Value> {
        Some(Value::String(self.as_ref().to_string()))
    }
}

impl<T: AsRef<str> + ?Sized> JsonField for Option<&T> {
    fn into_json(self) -> Option<Value> {
        self.map(|value| Value::String(value.as_ref().to_string()))
    }
}

macro_rules! json_number_field {
    ($($ty:ty),*) => {
        $(
            impl JsonField for $ty {
                fn into_json(self) -> Option<Value> {
                    Some(Value::from(self))
                }
            }

            impl JsonField for Option<$ty> {
                fn into_json(self) -> Option<Value> {
                    self.map(Value::from)
                }
            }
        )*
    };
}

json_number_field!(i32, i64, bool);

impl JsonField for Value {
    fn into_json(self) -> Option<Value> {
        Some(self)
    }
}

impl JsonField for Option<Value> {
    fn into_json(self) -> Option<Value> {
        self
    }
}

/// SDK timestamp member, rendered as RFC 3339
pub(crate) trait JsonTime {
    fn into_json_time(self) -> Option<Value>;
}

impl JsonTime for &DateTime {
    fn into_json_time(self) -> Option<Value> {
        self.fmt(Format::DateTime).ok().map(Value::String)
    }
}

impl JsonTime for Option<&DateTime> {
    fn into_json_time(self) -> Option<Value> {
        self.and_then(JsonTime::into_json_time)
    }
}

/// SDK string map member
pub(crate) trait StringMap<'a> {
    fn into_map(self) -> Option<&'a HashMap<String, String>>;
}

impl<'a> StringMap<'a> for &'a HashMap<String, String> {
    fn into_map(self) -> Option<&'a HashMap<String, String>> {
        Some(self)
    }
}

impl<'a> StringMap<'a> for Option<&'a HashMap<String, String>> {
    fn into_map(self) -> Option<&'a HashMap<String, String>> {
        self
    }
}

/// Insert a member when present
pub(crate) fn put(json: &mut JsonObject, key: &str, value: impl JsonField) {
    if let Some(value) = value.into_json() {
        json.insert(key.to_string(), value);
    }
}

pub(crate) fn put_time(json: &mut JsonObject, key: &str, value: impl JsonTime) {
    if let Some(value) = value.into_json_time() {
        json.insert(key.to_string(), value);
    }
}

pub(crate) fn put_map<'a>(json: &mut JsonObject, key: &str, value: impl StringMap<'a>) {
    if let Some(map) = value.into_map() {
        let object: JsonObject = map
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json.insert(key.to_string(), Value::Object(object));
    }
}

/// String form of a member, for identifiers passed back into SDK calls
pub(crate) fn text(value: impl JsonField) -> Option<String> {
    match value.into_json()? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub(crate) fn string_list(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

pub(crate) fn map_to_tags<'a>(value: impl StringMap<'a>) -> Tags {
    value
        .into_map()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Identifier read back out of a summary this crate produced
pub(crate) fn summary_field(summary: &Value, key: &str) -> Result<String> {
    lookup_path(summary, key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Summary has no {}", key))
}

/// ARN a tag fetch needs, or an error when the record has none
pub(crate) fn require_arn(arn: &str) -> Result<String> {
    if arn.is_empty() {
        Err(anyhow!("Resource has no ARN to fetch tags for"))
    } else {
        Ok(arn.to_string())
    }
}
