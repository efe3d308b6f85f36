use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_timestreaminfluxdb as influxdb;
use serde_json::Value;
use std::sync::Arc;

use super::{map_to_tags, put, require_arn, string_list, summary_field, JsonObject};
use crate::app::inventory::operations::{
    detail_fn, list_fn, tag_fn, DetailOperation, ListOperation, Page, TagOperation, TagTarget,
};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::Tags;

/// Timestream for InfluxDB instances and parameter groups
#[derive(Clone)]
pub struct TimestreamInfluxDbService {
    client: influxdb::Client,
}

impl TimestreamInfluxDbService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: influxdb::Client::new(sdk_config),
        }
    }

    pub fn list_db_instances(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListDbInstances", move |_scope: &ParentScope, token: Option<String>| {
            db_instances_page(client.clone(), token)
        })
    }

    pub fn get_db_instance(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn("GetDbInstance", move |_scope: &ParentScope, summary: &Value| {
            describe_db_instance(client.clone(), summary_field(summary, "Id"))
        })
    }

    pub fn list_db_parameter_groups(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn(
            "ListDbParameterGroups",
            move |_scope: &ParentScope, token: Option<String>| db_parameter_groups_page(client.clone(), token),
        )
    }

    pub fn list_tags_for_resource(&self) -> Arc<dyn TagOperation> {
        let client = self.client.clone();
        tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
            resource_tags(client.clone(), require_arn(&target.arn))
        })
    }
}

async fn db_instances_page(client: influxdb::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_db_instances().set_next_token(token).send().await?;
    let items = response.items().iter().map(db_instance_summary_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_db_instance(client: influxdb::Client, identifier: Result<String>) -> Result<Value> {
    let response = client.get_db_instance().identifier(identifier?).send().await?;

    let mut json = JsonObject::new();
    put(&mut json, "Id", response.id());
    put(&mut json, "Name", response.name());
    put(&mut json, "Arn", response.arn());
    put(&mut json, "Status", response.status());
    put(&mut json, "Endpoint", response.endpoint());
    put(&mut json, "Port", response.port());
    put(&mut json, "NetworkType", response.network_type());
    put(&mut json, "DbInstanceType", response.db_instance_type());
    put(&mut json, "DbStorageType", response.db_storage_type());
    put(&mut json, "AllocatedStorage", response.allocated_storage());
    put(&mut json, "DeploymentType", response.deployment_type());
    put(&mut json, "PubliclyAccessible", response.publicly_accessible());
    put(&mut json, "AvailabilityZone", response.availability_zone());
    put(&mut json, "SecondaryAvailabilityZone", response.secondary_availability_zone());
    put(&mut json, "DbParameterGroupIdentifier", response.db_parameter_group_identifier());
    put(
        &mut json,
        "InfluxAuthParametersSecretArn",
        response.influx_auth_parameters_secret_arn(),
    );
    json.insert("VpcSubnetIds".to_string(), string_list(response.vpc_subnet_ids()));
    json.insert(
        "VpcSecurityGroupIds".to_string(),
        string_list(response.vpc_security_group_ids()),
    );

    if let Some(s3) = response
        .log_delivery_configuration()
        .and_then(|config| config.s3_configuration())
    {
        let mut s3_json = JsonObject::new();
        put(&mut s3_json, "BucketName", s3.bucket_name());
        put(&mut s3_json, "Enabled", s3.enabled());
        let mut log_json = JsonObject::new();
        log_json.insert("S3Configuration".to_string(), Value::Object(s3_json));
        json.insert("LogDeliveryConfiguration".to_string(), Value::Object(log_json));
    }

    Ok(Value::Object(json))
}

async fn db_parameter_groups_page(client: influxdb::Client, token: Option<String>) -> Result<Page> {
    let response = client
        .list_db_parameter_groups()
        .set_next_token(token)
        .send()
        .await?;
    let items = response.items().iter().map(db_parameter_group_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn resource_tags(client: influxdb::Client, arn: Result<String>) -> Result<Tags> {
    let response = client.list_tags_for_resource().resource_arn(arn?).send().await?;
    Ok(map_to_tags(response.tags()))
}

fn db_instance_summary_to_json(instance: &influxdb::types::DbInstanceSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", instance.id());
    put(&mut json, "Name", instance.name());
    put(&mut json, "Arn", instance.arn());
    put(&mut json, "Status", instance.status());
    put(&mut json, "Endpoint", instance.endpoint());
    put(&mut json, "Port", instance.port());
    put(&mut json, "NetworkType", instance.network_type());
    put(&mut json, "DbInstanceType", instance.db_instance_type());
    put(&mut json, "DbStorageType", instance.db_storage_type());
    put(&mut json, "AllocatedStorage", instance.allocated_storage());
    put(&mut json, "DeploymentType", instance.deployment_type());
    Value::Object(json)
}

/// AWS default groups come back with an empty ARN
fn db_parameter_group_to_json(group: &influxdb::types::DbParameterGroupSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", group.id());
    put(&mut json, "Name", group.name());
    put(&mut json, "Arn", group.arn());
    put(&mut json, "Description", group.description());
    Value::Object(json)
}
