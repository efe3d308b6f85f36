use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_bedrock as bedrock;
use serde_json::Value;
use std::sync::Arc;

use super::{put, put_time, require_arn, summary_field, text, JsonObject};
use crate::app::inventory::operations::{
    detail_fn, list_fn, tag_fn, DetailOperation, ListOperation, Page, TagOperation, TagTarget,
};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::Tags;
use crate::app::inventory::tags::normalize_pairs;

/// Bedrock control plane: custom models, customization jobs, provisioned throughput
/// and guardrails
#[derive(Clone)]
pub struct BedrockService {
    client: bedrock::Client,
}

impl BedrockService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: bedrock::Client::new(sdk_config),
        }
    }

    pub fn list_custom_models(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListCustomModels", move |_scope: &ParentScope, token: Option<String>| {
            custom_models_page(client.clone(), token)
        })
    }

    pub fn get_custom_model(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn("GetCustomModel", move |_scope: &ParentScope, summary: &Value| {
            describe_custom_model(client.clone(), summary_field(summary, "ModelArn"))
        })
    }

    pub fn list_model_customization_jobs(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn(
            "ListModelCustomizationJobs",
            move |_scope: &ParentScope, token: Option<String>| customization_jobs_page(client.clone(), token),
        )
    }

    pub fn list_provisioned_model_throughputs(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn(
            "ListProvisionedModelThroughputs",
            move |_scope: &ParentScope, token: Option<String>| provisioned_throughputs_page(client.clone(), token),
        )
    }

    pub fn get_provisioned_model_throughput(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn(
            "GetProvisionedModelThroughput",
            move |_scope: &ParentScope, summary: &Value| {
                describe_provisioned_throughput(client.clone(), summary_field(summary, "ProvisionedModelArn"))
            },
        )
    }

    pub fn list_guardrails(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListGuardrails", move |_scope: &ParentScope, token: Option<String>| {
            guardrails_page(client.clone(), token)
        })
    }

    /// Tags come back as a key/value list
    pub fn list_tags_for_resource(&self) -> Arc<dyn TagOperation> {
        let client = self.client.clone();
        tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
            resource_tags(client.clone(), require_arn(&target.arn))
        })
    }
}

async fn custom_models_page(client: bedrock::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_custom_models().set_next_token(token).send().await?;
    let items = response.model_summaries().iter().map(custom_model_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_custom_model(client: bedrock::Client, model_arn: Result<String>) -> Result<Value> {
    let response = client
        .get_custom_model()
        .model_identifier(model_arn?)
        .send()
        .await?;

    let mut json = JsonObject::new();
    put(&mut json, "ModelArn", response.model_arn());
    put(&mut json, "ModelName", response.model_name());
    put(&mut json, "JobName", response.job_name());
    put(&mut json, "JobArn", response.job_arn());
    put(&mut json, "BaseModelArn", response.base_model_arn());
    put(&mut json, "CustomizationType", response.customization_type());
    put_time(&mut json, "CreationTime", response.creation_time());

    if let Some(training) = response.training_data_config() {
        let mut training_json = JsonObject::new();
        put(&mut training_json, "S3Uri", training.s3_uri());
        json.insert("TrainingDataConfig".to_string(), Value::Object(training_json));
    }

    if let Some(output) = response.output_data_config() {
        let mut output_json = JsonObject::new();
        put(&mut output_json, "S3Uri", output.s3_uri());
        put(&mut output_json, "KmsKeyId", output.kms_key_id());
        json.insert("OutputDataConfig".to_string(), Value::Object(output_json));
    }

    Ok(Value::Object(json))
}

async fn customization_jobs_page(client: bedrock::Client, token: Option<String>) -> Result<Page> {
    let response = client
        .list_model_customization_jobs()
        .set_next_token(token)
        .send()
        .await?;
    let items = response
        .model_customization_job_summaries()
        .iter()
        .map(customization_job_to_json)
        .collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn provisioned_throughputs_page(client: bedrock::Client, token: Option<String>) -> Result<Page> {
    let response = client
        .list_provisioned_model_throughputs()
        .set_next_token(token)
        .send()
        .await?;
    let items = response
        .provisioned_model_summaries()
        .iter()
        .map(provisioned_throughput_to_json)
        .collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_provisioned_throughput(client: bedrock::Client, provisioned_arn: Result<String>) -> Result<Value> {
    let response = client
        .get_provisioned_model_throughput()
        .provisioned_model_id(provisioned_arn?)
        .send()
        .await?;

    let mut json = JsonObject::new();
    put(&mut json, "ProvisionedModelArn", response.provisioned_model_arn());
    put(&mut json, "ProvisionedModelName", response.provisioned_model_name());
    put(&mut json, "Status", response.status());
    put(&mut json, "ModelArn", response.model_arn());
    put(&mut json, "DesiredModelArn", response.desired_model_arn());
    put(&mut json, "FoundationModelArn", response.foundation_model_arn());
    put(&mut json, "ModelUnits", response.model_units());
    put(&mut json, "DesiredModelUnits", response.desired_model_units());
    put(&mut json, "CommitmentDuration", response.commitment_duration());
    put_time(&mut json, "CommitmentExpirationTime", response.commitment_expiration_time());
    put_time(&mut json, "CreationTime", response.creation_time());
    put_time(&mut json, "LastModifiedTime", response.last_modified_time());
    Ok(Value::Object(json))
}

async fn guardrails_page(client: bedrock::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_guardrails().set_next_token(token).send().await?;
    let items = response.guardrails().iter().map(guardrail_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn resource_tags(client: bedrock::Client, arn: Result<String>) -> Result<Tags> {
    let response = client.list_tags_for_resource().resource_arn(arn?).send().await?;
    Ok(normalize_pairs(
        response
            .tags()
            .iter()
            .map(|tag| (text(tag.key()), text(tag.value()))),
    ))
}

fn custom_model_to_json(model: &bedrock::types::CustomModelSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "ModelArn", model.model_arn());
    put(&mut json, "ModelName", model.model_name());
    put(&mut json, "BaseModelArn", model.base_model_arn());
    put(&mut json, "CustomizationType", model.customization_type());
    put_time(&mut json, "CreationTime", model.creation_time());
    Value::Object(json)
}

fn customization_job_to_json(job: &bedrock::types::ModelCustomizationJobSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "JobArn", job.job_arn());
    put(&mut json, "JobName", job.job_name());
    put(&mut json, "Status", job.status());
    put(&mut json, "BaseModelArn", job.base_model_arn());
    put(&mut json, "CustomizationType", job.customization_type());
    put(&mut json, "CustomModelArn", job.custom_model_arn());
    put(&mut json, "CustomModelName", job.custom_model_name());
    put_time(&mut json, "CreationTime", job.creation_time());
    put_time(&mut json, "LastModifiedTime", job.last_modified_time());
    put_time(&mut json, "EndTime", job.end_time());
    Value::Object(json)
}

fn provisioned_throughput_to_json(throughput: &bedrock::types::ProvisionedModelSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "ProvisionedModelArn", throughput.provisioned_model_arn());
    put(&mut json, "ProvisionedModelName", throughput.provisioned_model_name());
    put(&mut json, "ModelArn", throughput.model_arn());
    put(&mut json, "Status", throughput.status());
    put(&mut json, "ModelUnits", throughput.model_units());
    put_time(&mut json, "CreationTime", throughput.creation_time());
    Value::Object(json)
}

fn guardrail_to_json(guardrail: &bedrock::types::GuardrailSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", guardrail.id());
    put(&mut json, "Arn", guardrail.arn());
    put(&mut json, "Name", guardrail.name());
    put(&mut json, "Status", guardrail.status());
    put(&mut json, "Version", guardrail.version());
    put(&mut json, "Description", guardrail.description());
    put_time(&mut json, "CreatedAt", guardrail.created_at());
    put_time(&mut json, "UpdatedAt", guardrail.updated_at());
    Value::Object(json)
}
