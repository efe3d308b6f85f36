use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_dsql as dsql;
use serde_json::Value;
use std::sync::Arc;

use super::{put, put_map, put_time, string_list, summary_field, JsonObject};
use crate::app::inventory::operations::{detail_fn, list_fn, DetailOperation, ListOperation, Page};
use crate::app::inventory::scope::ParentScope;

/// Aurora DSQL clusters
#[derive(Clone)]
pub struct DsqlService {
    client: dsql::Client,
}

impl DsqlService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: dsql::Client::new(sdk_config),
        }
    }

    pub fn list_clusters(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListClusters", move |_scope: &ParentScope, token: Option<String>| {
            clusters_page(client.clone(), token)
        })
    }

    /// Full cluster description; tags are part of the response
    pub fn get_cluster(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn("GetCluster", move |_scope: &ParentScope, summary: &Value| {
            describe_cluster(client.clone(), summary_field(summary, "Identifier"))
        })
    }
}

async fn clusters_page(client: dsql::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_clusters().set_next_token(token).send().await?;
    let items = response.clusters().iter().map(cluster_summary_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_cluster(client: dsql::Client, identifier: Result<String>) -> Result<Value> {
    let response = client.get_cluster().identifier(identifier?).send().await?;

    let mut json = JsonObject::new();
    put(&mut json, "Identifier", response.identifier());
    put(&mut json, "Arn", response.arn());
    put(&mut json, "Status", response.status());
    put(&mut json, "Endpoint", response.endpoint());
    put(&mut json, "DeletionProtectionEnabled", response.deletion_protection_enabled());
    put_time(&mut json, "CreationTime", response.creation_time());
    put_map(&mut json, "Tags", response.tags());

    if let Some(encryption) = response.encryption_details() {
        let mut encryption_json = JsonObject::new();
        put(&mut encryption_json, "EncryptionType", encryption.encryption_type());
        put(&mut encryption_json, "EncryptionStatus", encryption.encryption_status());
        put(&mut encryption_json, "KmsKeyArn", encryption.kms_key_arn());
        json.insert("EncryptionDetails".to_string(), Value::Object(encryption_json));
    }

    if let Some(multi_region) = response.multi_region_properties() {
        let mut multi_region_json = JsonObject::new();
        put(&mut multi_region_json, "WitnessRegion", multi_region.witness_region());
        multi_region_json.insert("Clusters".to_string(), string_list(multi_region.clusters()));
        json.insert(
            "MultiRegionProperties".to_string(),
            Value::Object(multi_region_json),
        );
    }

    Ok(Value::Object(json))
}

fn cluster_summary_to_json(cluster: &dsql::types::ClusterSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Identifier", cluster.identifier());
    put(&mut json, "Arn", cluster.arn());
    Value::Object(json)
}
