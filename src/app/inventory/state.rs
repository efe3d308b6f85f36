use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::isolation::FailureReason;

/// Region value recorded for resources that live outside any region
pub const GLOBAL_REGION: &str = "global";

/// Canonical tag mapping. Ordered so that serialized output is stable across runs.
pub type Tags = BTreeMap<String, String>;

/// Ordered enrichment fields of a record. Leaves may be null.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// One normalized inventory entry.
///
/// Records are produced by the record builder and are read-only afterwards; parent/child
/// relations are carried as identifiers inside `details`, never by nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    service: String,
    #[serde(rename = "type")]
    resource_type: String,
    id: String,
    arn: String,
    name: String,
    region: String,
    details: Details,
    tags: Tags,
}

impl ResourceRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        service: String,
        resource_type: String,
        id: String,
        arn: String,
        name: String,
        region: String,
        details: Details,
        tags: Tags,
    ) -> Self {
        Self {
            service,
            resource_type,
            id,
            arn,
            name,
            region,
            details,
            tags,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Convenience lookup of a single detail field
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    pub fn is_global(&self) -> bool {
        self.region == GLOBAL_REGION
    }
}

/// Result of a collection pass: the flat record sequence plus every failure the
/// isolator converted into a fallback along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    pub records: Vec<ResourceRecord>,
    pub failures: Vec<FailureReason>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, record: ResourceRecord) {
        self.records.push(record);
    }

    pub fn push_failure(&mut self, failure: FailureReason) {
        self.failures.push(failure);
    }

    /// Append another collection, keeping the order of both
    pub fn extend(&mut self, other: Collection) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when no fallback had to be applied
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Stable order for output that merged several concurrent branches
    pub fn sort_by_identity(&mut self) {
        self.records.sort_by(|a, b| {
            (&a.service, &a.region, &a.resource_type, &a.arn).cmp(&(
                &b.service,
                &b.region,
                &b.resource_type,
                &b.arn,
            ))
        });
    }

    pub fn into_records(self) -> Vec<ResourceRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(service: &str, region: &str, arn: &str) -> ResourceRecord {
        ResourceRecord::new(
            service.to_string(),
            "thing".to_string(),
            "id-1".to_string(),
            arn.to_string(),
            "id-1".to_string(),
            region.to_string(),
            Details::new(),
            Tags::new(),
        )
    }

    #[test]
    fn test_record_serializes_type_key() {
        let rec = record("s3", GLOBAL_REGION, "arn:aws:s3:::b");
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["type"], json!("thing"));
        assert_eq!(value["tags"], json!({}));
        assert_eq!(value["details"], json!({}));
        assert!(rec.is_global());
    }

    #[test]
    fn test_sort_by_identity() {
        let mut collection = Collection::new();
        collection.push_record(record("s3", "us-west-2", "arn:b"));
        collection.push_record(record("bedrock", "us-east-1", "arn:z"));
        collection.push_record(record("s3", "us-east-1", "arn:a"));
        collection.sort_by_identity();

        let arns: Vec<&str> = collection.records.iter().map(|r| r.arn()).collect();
        assert_eq!(arns, vec!["arn:z", "arn:a", "arn:b"]);
    }
}
