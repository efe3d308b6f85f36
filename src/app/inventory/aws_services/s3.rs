use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_s3 as s3;
use s3::error::ProvideErrorMetadata;
use serde_json::Value;
use std::sync::Arc;

use super::{put, put_time, summary_field, text, JsonObject};
use crate::app::inventory::declarations::lookup_path;
use crate::app::inventory::operations::{
    detail_fn, list_fn, tag_fn, DetailOperation, ListOperation, Page, TagOperation, TagTarget,
};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::{Tags, GLOBAL_REGION};
use crate::app::inventory::tags::normalize_pairs;

/// Region S3 reports no location constraint for
pub const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// S3 general purpose buckets.
///
/// Bucket calls other than `GetBucketLocation` are sent to the bucket's own region,
/// read from the `LocationConstraint` the location enrichment adds to the item.
#[derive(Clone)]
pub struct S3Service {
    sdk_config: SdkConfig,
}

impl S3Service {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
        }
    }

    /// `ListBuckets` is treated as a single page
    pub fn list_buckets(&self) -> Arc<dyn ListOperation> {
        let client = s3::Client::new(&self.sdk_config);
        list_fn("ListBuckets", move |_scope: &ParentScope, _token: Option<String>| {
            buckets_page(client.clone())
        })
    }

    pub fn get_bucket_location(&self) -> Arc<dyn DetailOperation> {
        let client = s3::Client::new(&self.sdk_config);
        detail_fn("GetBucketLocation", move |_scope: &ParentScope, summary: &Value| {
            bucket_location(client.clone(), summary_field(summary, "Name"))
        })
    }

    pub fn get_bucket_versioning(&self) -> Arc<dyn DetailOperation> {
        let sdk_config = self.sdk_config.clone();
        detail_fn("GetBucketVersioning", move |_scope: &ParentScope, summary: &Value| {
            bucket_versioning(bucket_client(&sdk_config, summary), summary_field(summary, "Name"))
        })
    }

    pub fn get_bucket_encryption(&self) -> Arc<dyn DetailOperation> {
        let sdk_config = self.sdk_config.clone();
        detail_fn("GetBucketEncryption", move |_scope: &ParentScope, summary: &Value| {
            bucket_encryption(bucket_client(&sdk_config, summary), summary_field(summary, "Name"))
        })
    }

    pub fn get_public_access_block(&self) -> Arc<dyn DetailOperation> {
        let sdk_config = self.sdk_config.clone();
        detail_fn("GetPublicAccessBlock", move |_scope: &ParentScope, summary: &Value| {
            public_access_block(bucket_client(&sdk_config, summary), summary_field(summary, "Name"))
        })
    }

    /// Tags from `GetBucketTagging`; a bucket without a tag set has empty tags
    pub fn get_bucket_tagging(&self) -> Arc<dyn TagOperation> {
        let sdk_config = self.sdk_config.clone();
        tag_fn("GetBucketTagging", move |_scope: &ParentScope, target: &TagTarget| {
            bucket_tags(regional_client(&sdk_config, Some(&target.region)), target.name.clone())
        })
    }
}

/// Client for the bucket's own region when the item already knows it
fn bucket_client(sdk_config: &SdkConfig, summary: &Value) -> s3::Client {
    regional_client(
        sdk_config,
        lookup_path(summary, "LocationConstraint").and_then(Value::as_str),
    )
}

fn regional_client(sdk_config: &SdkConfig, region: Option<&str>) -> s3::Client {
    match region {
        Some(region) if !region.is_empty() && region != GLOBAL_REGION => {
            let config = s3::config::Builder::from(sdk_config)
                .region(s3::config::Region::new(region.to_string()))
                .build();
            s3::Client::from_conf(config)
        }
        _ => s3::Client::new(sdk_config),
    }
}

/// Normalize a location constraint to a region name
pub fn location_region(constraint: Option<&str>) -> &str {
    match constraint {
        None | Some("") => DEFAULT_BUCKET_REGION,
        Some("EU") => "eu-west-1",
        Some(region) => region,
    }
}

async fn buckets_page(client: s3::Client) -> Result<Page> {
    let response = client.list_buckets().send().await?;
    let items = response.buckets().iter().map(bucket_to_json).collect();
    Ok(Page::last(items))
}

async fn bucket_location(client: s3::Client, bucket: Result<String>) -> Result<Value> {
    let response = client.get_bucket_location().bucket(bucket?).send().await?;
    let constraint = response.location_constraint().map(|constraint| constraint.as_str());

    let mut json = JsonObject::new();
    put(&mut json, "LocationConstraint", location_region(constraint));
    Ok(Value::Object(json))
}

async fn bucket_versioning(client: s3::Client, bucket: Result<String>) -> Result<Value> {
    let response = client.get_bucket_versioning().bucket(bucket?).send().await?;

    let mut json = JsonObject::new();
    put(&mut json, "VersioningStatus", response.status());
    put(&mut json, "MfaDelete", response.mfa_delete());
    Ok(Value::Object(json))
}

async fn bucket_encryption(client: s3::Client, bucket: Result<String>) -> Result<Value> {
    let response = match client.get_bucket_encryption().bucket(bucket?).send().await {
        Ok(response) => response,
        Err(error) if error.code() == Some("ServerSideEncryptionConfigurationNotFoundError") => {
            return Ok(Value::Object(JsonObject::new()));
        }
        Err(error) => return Err(error.into()),
    };

    let mut json = JsonObject::new();
    if let Some(config) = response.server_side_encryption_configuration() {
        let rules: Vec<Value> = config
            .rules()
            .iter()
            .map(|rule| {
                let mut rule_json = JsonObject::new();
                if let Some(default) = rule.apply_server_side_encryption_by_default() {
                    put(&mut rule_json, "SSEAlgorithm", default.sse_algorithm());
                    put(&mut rule_json, "KMSMasterKeyID", default.kms_master_key_id());
                }
                put(&mut rule_json, "BucketKeyEnabled", rule.bucket_key_enabled());
                Value::Object(rule_json)
            })
            .collect();
        json.insert("EncryptionRules".to_string(), Value::Array(rules));
    }
    Ok(Value::Object(json))
}

async fn public_access_block(client: s3::Client, bucket: Result<String>) -> Result<Value> {
    let response = match client.get_public_access_block().bucket(bucket?).send().await {
        Ok(response) => response,
        Err(error) if error.code() == Some("NoSuchPublicAccessBlockConfiguration") => {
            return Ok(Value::Object(JsonObject::new()));
        }
        Err(error) => return Err(error.into()),
    };

    let mut json = JsonObject::new();
    if let Some(config) = response.public_access_block_configuration() {
        let mut config_json = JsonObject::new();
        put(&mut config_json, "BlockPublicAcls", config.block_public_acls());
        put(&mut config_json, "IgnorePublicAcls", config.ignore_public_acls());
        put(&mut config_json, "BlockPublicPolicy", config.block_public_policy());
        put(&mut config_json, "RestrictPublicBuckets", config.restrict_public_buckets());
        json.insert(
            "PublicAccessBlockConfiguration".to_string(),
            Value::Object(config_json),
        );
    }
    Ok(Value::Object(json))
}

async fn bucket_tags(client: s3::Client, bucket: String) -> Result<Tags> {
    let response = match client.get_bucket_tagging().bucket(bucket).send().await {
        Ok(response) => response,
        Err(error) if error.code() == Some("NoSuchTagSet") => return Ok(Tags::new()),
        Err(error) => return Err(error.into()),
    };
    Ok(normalize_pairs(
        response
            .tag_set()
            .iter()
            .map(|tag| (text(tag.key()), text(tag.value()))),
    ))
}

fn bucket_to_json(bucket: &s3::types::Bucket) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Name", bucket.name());
    put_time(&mut json, "CreationDate", bucket.creation_date());
    Value::Object(json)
}
