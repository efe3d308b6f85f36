use anyhow::Result;
use aws_config::SdkConfig;
use aws_sdk_datazone as datazone;
use serde_json::Value;
use std::sync::Arc;

use super::{map_to_tags, put, put_time, require_arn, JsonObject};
use crate::app::inventory::operations::{list_fn, tag_fn, ListOperation, Page, TagOperation, TagTarget};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::Tags;

/// DataZone domains, their projects and the projects' environments
#[derive(Clone)]
pub struct DataZoneService {
    client: datazone::Client,
}

impl DataZoneService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: datazone::Client::new(sdk_config),
        }
    }

    pub fn list_domains(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListDomains", move |_scope: &ParentScope, token: Option<String>| {
            domains_page(client.clone(), token)
        })
    }

    /// Needs `domain_id`
    pub fn list_projects(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListProjects", move |scope: &ParentScope, token: Option<String>| {
            projects_page(client.clone(), scope.require("domain_id"), token)
        })
    }

    /// Needs `domain_id` and `project_id`
    pub fn list_environments(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListEnvironments", move |scope: &ParentScope, token: Option<String>| {
            environments_page(
                client.clone(),
                scope.require("domain_id"),
                scope.require("project_id"),
                token,
            )
        })
    }

    pub fn list_tags_for_resource(&self) -> Arc<dyn TagOperation> {
        let client = self.client.clone();
        tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
            resource_tags(client.clone(), require_arn(&target.arn))
        })
    }
}

async fn domains_page(client: datazone::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_domains().set_next_token(token).send().await?;
    let items = response.items().iter().map(domain_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn projects_page(client: datazone::Client, domain_id: Result<String>, token: Option<String>) -> Result<Page> {
    let response = client
        .list_projects()
        .domain_identifier(domain_id?)
        .set_next_token(token)
        .send()
        .await?;
    let items = response.items().iter().map(project_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn environments_page(
    client: datazone::Client,
    domain_id: Result<String>,
    project_id: Result<String>,
    token: Option<String>,
) -> Result<Page> {
    let response = client
        .list_environments()
        .domain_identifier(domain_id?)
        .project_identifier(project_id?)
        .set_next_token(token)
        .send()
        .await?;
    let items = response.items().iter().map(environment_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn resource_tags(client: datazone::Client, arn: Result<String>) -> Result<Tags> {
    let response = client.list_tags_for_resource().resource_arn(arn?).send().await?;
    Ok(map_to_tags(response.tags()))
}

fn domain_to_json(domain: &datazone::types::DomainSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", domain.id());
    put(&mut json, "Arn", domain.arn());
    put(&mut json, "Name", domain.name());
    put(&mut json, "Description", domain.description());
    put(&mut json, "Status", domain.status());
    put(&mut json, "PortalUrl", domain.portal_url());
    put(&mut json, "ManagedAccountId", domain.managed_account_id());
    put(&mut json, "DomainVersion", domain.domain_version());
    put_time(&mut json, "CreatedAt", domain.created_at());
    put_time(&mut json, "LastUpdatedAt", domain.last_updated_at());
    Value::Object(json)
}

fn project_to_json(project: &datazone::types::ProjectSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", project.id());
    put(&mut json, "DomainId", project.domain_id());
    put(&mut json, "Name", project.name());
    put(&mut json, "Description", project.description());
    put(&mut json, "ProjectStatus", project.project_status());
    put(&mut json, "CreatedBy", project.created_by());
    put(&mut json, "DomainUnitId", project.domain_unit_id());
    put_time(&mut json, "CreatedAt", project.created_at());
    put_time(&mut json, "UpdatedAt", project.updated_at());
    Value::Object(json)
}

fn environment_to_json(environment: &datazone::types::EnvironmentSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "Id", environment.id());
    put(&mut json, "DomainId", environment.domain_id());
    put(&mut json, "ProjectId", environment.project_id());
    put(&mut json, "Name", environment.name());
    put(&mut json, "Description", environment.description());
    put(&mut json, "Status", environment.status());
    put(&mut json, "Provider", environment.provider());
    put(&mut json, "EnvironmentProfileId", environment.environment_profile_id());
    put(&mut json, "AwsAccountId", environment.aws_account_id());
    put(&mut json, "AwsAccountRegion", environment.aws_account_region());
    put(&mut json, "CreatedBy", environment.created_by());
    put_time(&mut json, "CreatedAt", environment.created_at());
    put_time(&mut json, "UpdatedAt", environment.updated_at());
    Value::Object(json)
}
