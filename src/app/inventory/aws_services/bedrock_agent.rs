use anyhow::{anyhow, Result};
use aws_config::SdkConfig;
use aws_sdk_bedrockagent as bedrockagent;
use serde_json::Value;
use std::sync::Arc;

use super::{map_to_tags, put, put_time, require_arn, summary_field, JsonObject};
use crate::app::inventory::operations::{
    detail_fn, list_fn, tag_fn, DetailOperation, ListOperation, Page, TagOperation, TagTarget,
};
use crate::app::inventory::scope::ParentScope;
use crate::app::inventory::state::Tags;

/// Bedrock Agents: agents, knowledge bases and their data sources
#[derive(Clone)]
pub struct BedrockAgentService {
    client: bedrockagent::Client,
}

impl BedrockAgentService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: bedrockagent::Client::new(sdk_config),
        }
    }

    pub fn list_agents(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListAgents", move |_scope: &ParentScope, token: Option<String>| {
            agents_page(client.clone(), token)
        })
    }

    /// The only source of the agent's ARN
    pub fn get_agent(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn("GetAgent", move |_scope: &ParentScope, summary: &Value| {
            describe_agent(client.clone(), summary_field(summary, "AgentId"))
        })
    }

    pub fn list_knowledge_bases(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListKnowledgeBases", move |_scope: &ParentScope, token: Option<String>| {
            knowledge_bases_page(client.clone(), token)
        })
    }

    pub fn get_knowledge_base(&self) -> Arc<dyn DetailOperation> {
        let client = self.client.clone();
        detail_fn("GetKnowledgeBase", move |_scope: &ParentScope, summary: &Value| {
            describe_knowledge_base(client.clone(), summary_field(summary, "KnowledgeBaseId"))
        })
    }

    /// Needs `knowledge_base_id` bound by the parent knowledge base
    pub fn list_data_sources(&self) -> Arc<dyn ListOperation> {
        let client = self.client.clone();
        list_fn("ListDataSources", move |scope: &ParentScope, token: Option<String>| {
            data_sources_page(client.clone(), scope.require("knowledge_base_id"), token)
        })
    }

    /// Tags come back as a plain mapping
    pub fn list_tags_for_resource(&self) -> Arc<dyn TagOperation> {
        let client = self.client.clone();
        tag_fn("ListTagsForResource", move |_scope: &ParentScope, target: &TagTarget| {
            resource_tags(client.clone(), require_arn(&target.arn))
        })
    }
}

async fn agents_page(client: bedrockagent::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_agents().set_next_token(token).send().await?;
    let items = response.agent_summaries().iter().map(agent_to_json).collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_agent(client: bedrockagent::Client, agent_id: Result<String>) -> Result<Value> {
    let agent_id = agent_id?;
    let response = client.get_agent().agent_id(&agent_id).send().await?;
    let agent = response
        .agent()
        .ok_or_else(|| anyhow!("Agent {} not found", agent_id))?;

    let mut json = JsonObject::new();
    put(&mut json, "AgentId", agent.agent_id());
    put(&mut json, "AgentArn", agent.agent_arn());
    put(&mut json, "AgentName", agent.agent_name());
    put(&mut json, "AgentStatus", agent.agent_status());
    put(&mut json, "AgentVersion", agent.agent_version());
    put(&mut json, "Description", agent.description());
    put(&mut json, "FoundationModel", agent.foundation_model());
    put(&mut json, "Instruction", agent.instruction());
    put(&mut json, "IdleSessionTtlInSeconds", agent.idle_session_ttl_in_seconds());
    put(&mut json, "AgentResourceRoleArn", agent.agent_resource_role_arn());
    put_time(&mut json, "CreatedAt", agent.created_at());
    put_time(&mut json, "UpdatedAt", agent.updated_at());
    put_time(&mut json, "PreparedAt", agent.prepared_at());
    Ok(Value::Object(json))
}

async fn knowledge_bases_page(client: bedrockagent::Client, token: Option<String>) -> Result<Page> {
    let response = client.list_knowledge_bases().set_next_token(token).send().await?;
    let items = response
        .knowledge_base_summaries()
        .iter()
        .map(knowledge_base_to_json)
        .collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn describe_knowledge_base(client: bedrockagent::Client, knowledge_base_id: Result<String>) -> Result<Value> {
    let knowledge_base_id = knowledge_base_id?;
    let response = client
        .get_knowledge_base()
        .knowledge_base_id(&knowledge_base_id)
        .send()
        .await?;
    let kb = response
        .knowledge_base()
        .ok_or_else(|| anyhow!("Knowledge base {} not found", knowledge_base_id))?;

    let mut json = JsonObject::new();
    put(&mut json, "KnowledgeBaseId", kb.knowledge_base_id());
    put(&mut json, "KnowledgeBaseArn", kb.knowledge_base_arn());
    put(&mut json, "Name", kb.name());
    put(&mut json, "Description", kb.description());
    put(&mut json, "Status", kb.status());
    put(&mut json, "RoleArn", kb.role_arn());
    put_time(&mut json, "CreatedAt", kb.created_at());
    put_time(&mut json, "UpdatedAt", kb.updated_at());

    if let Some(config) = kb.knowledge_base_configuration() {
        let mut config_json = JsonObject::new();
        put(&mut config_json, "Type", config.r#type());
        if let Some(vector) = config.vector_knowledge_base_configuration() {
            let mut vector_json = JsonObject::new();
            put(&mut vector_json, "EmbeddingModelArn", vector.embedding_model_arn());
            config_json.insert(
                "VectorKnowledgeBaseConfiguration".to_string(),
                Value::Object(vector_json),
            );
        }
        json.insert("KnowledgeBaseConfiguration".to_string(), Value::Object(config_json));
    }

    if let Some(storage) = kb.storage_configuration() {
        let mut storage_json = JsonObject::new();
        put(&mut storage_json, "Type", storage.r#type());
        json.insert("StorageConfiguration".to_string(), Value::Object(storage_json));
    }

    Ok(Value::Object(json))
}

async fn data_sources_page(
    client: bedrockagent::Client,
    knowledge_base_id: Result<String>,
    token: Option<String>,
) -> Result<Page> {
    let response = client
        .list_data_sources()
        .knowledge_base_id(knowledge_base_id?)
        .set_next_token(token)
        .send()
        .await?;
    let items = response
        .data_source_summaries()
        .iter()
        .map(data_source_to_json)
        .collect();
    Ok(Page::new(items, response.next_token().map(str::to_string)))
}

async fn resource_tags(client: bedrockagent::Client, arn: Result<String>) -> Result<Tags> {
    let response = client.list_tags_for_resource().resource_arn(arn?).send().await?;
    Ok(map_to_tags(response.tags()))
}

fn agent_to_json(agent: &bedrockagent::types::AgentSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "AgentId", agent.agent_id());
    put(&mut json, "AgentName", agent.agent_name());
    put(&mut json, "AgentStatus", agent.agent_status());
    put(&mut json, "Description", agent.description());
    put(&mut json, "LatestAgentVersion", agent.latest_agent_version());
    put_time(&mut json, "UpdatedAt", agent.updated_at());
    Value::Object(json)
}

fn knowledge_base_to_json(kb: &bedrockagent::types::KnowledgeBaseSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "KnowledgeBaseId", kb.knowledge_base_id());
    put(&mut json, "Name", kb.name());
    put(&mut json, "Description", kb.description());
    put(&mut json, "Status", kb.status());
    put_time(&mut json, "UpdatedAt", kb.updated_at());
    Value::Object(json)
}

fn data_source_to_json(data_source: &bedrockagent::types::DataSourceSummary) -> Value {
    let mut json = JsonObject::new();
    put(&mut json, "DataSourceId", data_source.data_source_id());
    put(&mut json, "KnowledgeBaseId", data_source.knowledge_base_id());
    put(&mut json, "Name", data_source.name());
    put(&mut json, "Description", data_source.description());
    put(&mut json, "Status", data_source.status());
    put_time(&mut json, "UpdatedAt", data_source.updated_at());
    Value::Object(json)
}
