use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_s3tables as s3tables;
use serde_json::Value;
use std::sync::Arc;

use super::{map_to_tags, put, put_time, require_arn, string_list, JsonObject};
use crate::app::inventory::operations::{list_fn, tag_fn, ListOperation, Page, TagOperation, TagTarget};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::Tags;

/// S3 Tables: table buckets with their namespaces and tables
#[derive(Clone)]
pub struct S3TablesService {
    client: s3tables::Client,
}

impl S3TablesService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: s3tables::Client::new(sdk_config),
        }
    }

    pub fn list_table_buckets(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListTableBuckets", move |_scope: &ParentScope, token: Option<String>| {
            table_buckets_page(client.clone(), token)
        })
    }

    /// Needs `table_bucket_arn`
    pub fn list_namespaces(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListNamespaces", move |scope: &ParentScope, token: Option<String>| {
            namespaces_page(client.clone(), scope.require("table_bucket_arn"), token)
        })
    }

    /// Needs `table_bucket_arn`
    pub fn list_tables(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListTables", move |scope: &ParentScope, token: Option<String>| {
            tables_page(client.clone(), scope.require("table_bucket_arn"), token)
        })
    }

    pub fn list_tags_for_resource(&self) -> Arc<dyn TagOperation> {
        let client = self.client.clone();
        tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
            resource_tags(client.clone(), require_arn(&target.arn))
        })
    }
}

async fn table_buckets_page(client: s3tables::Client, token: Option<String>) -> Result<Page> {
    let response = client
        .list_table_buckets()
        .set_continuation_token(token)
        .send()
        .await?;
    let items = response.table_buckets().iter().map(table_bucket_to_json).collect();
    Ok(Page::new(items, response.continuation_token().map(str::to_string)))
}

async fn namespaces_page(
    client: s3tables::Client,
    table_bucket_arn: Result<String>,
    token: Option<String>,
) -> Result<Page> {
    let response = client
        .list_namespaces()
        .table_bucket_arn(table_bucket_arn?)
        .set_continuation_token(token)
        .send()
        .await?;
    let items = response.namespaces().iter().map(namespace_to_json).collect();
    Ok(Page::new(items, response.continuation_token().map(str::to_string)))
}

async fn tables_page(
    client: s3tables::Client,
    table_bucket_arn: Result<String>,
    token: Option<String>,
) -> Result<Page> {
    let response = client
        .list_tables()
        .table_bucket_arn(table_bucket_arn?)
        .set_continuation_token(token)
        .send()
        .await?;
    let items = response.tables().iter().map(table_to_json).collect();
    Ok(Page::new(items, response.continuation_token().map(str::to_string)))
}

async fn resource_tags(client: s3tables::Client, arn: Result<String>) -> Result<Tags> {
    let response = client.list_tags_for_resource().resource_arn(arn?).send().await?;
    Ok(map_to_tags(response.tags()))
}

fn table_bucket_to_json(bucket: &s3tables::types::TableBucketSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Arn", bucket.arn());
    put(&mut json, "Name", bucket.name());
    put(&mut json, "OwnerAccountId", bucket.owner_account_id());
    put(&mut json, "TableBucketId", bucket.table_bucket_id());
    put(&mut json, "Type", bucket.r#type());
    put_time(&mut json, "CreatedAt", bucket.created_at());
    Value::Object(json)
}

fn namespace_to_json(namespace: &s3tables::types::NamespaceSummary) -> Value {
    let mut json = JsonObject::new();
    json.insert("Namespace".to_string(), string_list(namespace.namespace()));
    put(&mut json, "CreatedBy", namespace.created_by());
    put(&mut json, "OwnerAccountId", namespace.owner_account_id());
    put(&mut json, "NamespaceId", namespace.namespace_id());
    put(&mut json, "TableBucketId", namespace.table_bucket_id());
    put_time(&mut json, "CreatedAt", namespace.created_at());
    Value::Object(json)
}

fn table_to_json(table: &s3tables::types::TableSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "TableArn", table.table_arn());
    put(&mut json, "Name", table.name());
    json.insert("Namespace".to_string(), string_list(table.namespace()));
    put(&mut json, "Type", table.r#type());
    put(&mut json, "ManagedByService", table.managed_by_service());
    put(&mut json, "NamespaceId", table.namespace_id());
    put(&mut json, "TableBucketId", table.table_bucket_id());
    put_time(&mut json, "CreatedAt", table.created_at());
    put_time(&mut json, "ModifiedAt", table.modified_at());
    Value::Object(json)
}
