use aws_config::SdkConfig;

use super::ServiceCollector;
use crate::app::inventory::arn::ArnTemplate;
use crate::app::inventory::aws_services::bedrock::BedrockService;
use crate::app::inventory::aws_services::bedrock_agent::BedrockAgentService;
use crate::app::inventory::declarations::{
    ArnSource, FieldRef, ParentBinding, ParentField, ResourceDeclaration, TagSource,
};

const SERVICE: &str = "bedrock";

/// Customization jobs in these states are history, not inventory
const FINISHED_JOB_STATES: &[&str] = &["Completed", "Failed", "Stopped"];

/// Bedrock models, guardrails, agents and knowledge bases
pub struct BedrockCollector;

impl ServiceCollector for BedrockCollector {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let bedrock = BedrockService::new(sdk_config);
        let agents = BedrockAgentService::new(sdk_config);
        vec![
            custom_models(&bedrock),
            customization_jobs(&bedrock),
            provisioned_throughputs(&bedrock),
            guardrails(&bedrock),
            agents_declaration(&agents),
            knowledge_bases(&agents),
        ]
    }
}

fn custom_models(bedrock: &BedrockService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "custom-model", bedrock.list_custom_models())
        .id(FieldRef::text("ModelName"))
        .name(FieldRef::text("ModelName"))
        .arn(ArnSource::Native(FieldRef::text("ModelArn")))
        .require(bedrock.get_custom_model())
        .field("base_model_arn", "BaseModelArn")
        .field("customization_type", "CustomizationType")
        .timestamp("creation_time", "CreationTime")
        .field("job_arn", "JobArn")
        .field("job_name", "JobName")
        .field("training_data_config", "TrainingDataConfig")
        .field("output_data_config", "OutputDataConfig")
}

fn customization_jobs(bedrock: &BedrockService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "customization-job", bedrock.list_model_customization_jobs())
        .id(FieldRef::text("JobName"))
        .name(FieldRef::text("JobName"))
        .arn(ArnSource::Native(FieldRef::text("JobArn")))
        .exclude("Status", FINISHED_JOB_STATES)
        .field("status", "Status")
        .field("base_model_arn", "BaseModelArn")
        .field("customization_type", "CustomizationType")
        .timestamp("creation_time", "CreationTime")
        .timestamp("end_time", "EndTime")
        .timestamp("last_modified_time", "LastModifiedTime")
        .field("custom_model_arn", "CustomModelArn")
        .field("custom_model_name", "CustomModelName")
}

fn provisioned_throughputs(bedrock: &BedrockService) -> ResourceDeclaration {
    ResourceDeclaration::new(
        SERVICE,
        "provisioned-throughput",
        bedrock.list_provisioned_model_throughputs(),
    )
    .id(FieldRef::text("ProvisionedModelName"))
    .name(FieldRef::text("ProvisionedModelName"))
    .arn(ArnSource::Native(FieldRef::text("ProvisionedModelArn")))
    .require(bedrock.get_provisioned_model_throughput())
    .tags(TagSource::Fetch(bedrock.list_tags_for_resource()))
    .field("status", "Status")
    .field("model_arn", "ModelArn")
    .field("desired_model_arn", "DesiredModelArn")
    .field("foundation_model_arn", "FoundationModelArn")
    .field("model_units", "ModelUnits")
    .field("desired_model_units", "DesiredModelUnits")
    .field("commitment_duration", "CommitmentDuration")
    .timestamp("commitment_expiration_time", "CommitmentExpirationTime")
    .timestamp("creation_time", "CreationTime")
    .timestamp("last_modified_time", "LastModifiedTime")
}

fn guardrails(bedrock: &BedrockService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "guardrail", bedrock.list_guardrails())
        .tags(TagSource::Fetch(bedrock.list_tags_for_resource()))
        .field("status", "Status")
        .field("version", "Version")
        .timestamp("created_at", "CreatedAt")
        .timestamp("updated_at", "UpdatedAt")
}

fn agents_declaration(agents: &BedrockAgentService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "agent", agents.list_agents())
        .id(FieldRef::text("AgentId"))
        .name(FieldRef::text("AgentName"))
        .arn(ArnSource::Native(FieldRef::text("AgentArn")))
        .require(agents.get_agent())
        .tags(TagSource::Fetch(agents.list_tags_for_resource()))
        .field("status", "AgentStatus")
        .field("foundation_model", "FoundationModel")
        .field("instruction", "Instruction")
        .field("description", "Description")
        .field("agent_version", "AgentVersion")
        .field("idle_session_ttl", "IdleSessionTtlInSeconds")
        .field("agent_resource_role_arn", "AgentResourceRoleArn")
        .timestamp("created_at", "CreatedAt")
        .timestamp("updated_at", "UpdatedAt")
        .timestamp("prepared_at", "PreparedAt")
}

fn knowledge_bases(agents: &BedrockAgentService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "knowledge-base", agents.list_knowledge_bases())
        .id(FieldRef::text("KnowledgeBaseId"))
        .arn(ArnSource::Native(FieldRef::text("KnowledgeBaseArn")))
        .require(agents.get_knowledge_base())
        .tags(TagSource::Fetch(agents.list_tags_for_resource()))
        .field("status", "Status")
        .field("description", "Description")
        .field("knowledge_base_type", "KnowledgeBaseConfiguration.Type")
        .field(
            "embedding_model_arn",
            "KnowledgeBaseConfiguration.VectorKnowledgeBaseConfiguration.EmbeddingModelArn",
        )
        .field("storage_type", "StorageConfiguration.Type")
        .field("role_arn", "RoleArn")
        .timestamp("created_at", "CreatedAt")
        .timestamp("updated_at", "UpdatedAt")
        .child(
            vec![ParentBinding::new("knowledge_base_id", ParentField::Id)],
            data_sources(agents),
        )
}

/// Data sources carry no ARN of their own
fn data_sources(agents: &BedrockAgentService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "data-source", agents.list_data_sources())
        .id(FieldRef::text("DataSourceId"))
        .arn(ArnSource::Synthesized(
            ArnTemplate::new(SERVICE)
                .resource_type("knowledge-base")
                .param("knowledge_base_id")
                .literal("data-source"),
        ))
        .field("status", "Status")
        .field("description", "Description")
        .timestamp("updated_at", "UpdatedAt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::inventory::arn::ArnContext;
    use crate::app::inventory::record_builder::{build_record, ItemView};
    use crate::app::inventory::scope::ParentScope;
    use crate::app::inventory::state::Tags;
    use aws_config::BehaviorVersion;
    use aws_types::region::Region;
    use serde_json::json;

    fn sdk_config() -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build()
    }

    #[test]
    fn test_declarations() {
        let declarations = BedrockCollector.declarations(&sdk_config());
        let types: Vec<&str> = declarations.iter().map(|d| d.resource_type).collect();
        assert_eq!(
            types,
            vec![
                "custom-model",
                "customization-job",
                "provisioned-throughput",
                "guardrail",
                "agent",
                "knowledge-base"
            ]
        );

        let knowledge_base = &declarations[5];
        assert_eq!(knowledge_base.depth(), 2);
        assert_eq!(knowledge_base.children[0].resource.resource_type, "data-source");
    }

    #[test]
    fn test_finished_jobs_excluded() {
        let declarations = BedrockCollector.declarations(&sdk_config());
        let jobs = &declarations[1];
        assert!(jobs.is_excluded(&serde_json::json!({"Status": "Completed"})));
        assert!(!jobs.is_excluded(&serde_json::json!({"Status": "InProgress"})));
    }

    #[test]
    fn test_custom_model_data_configs_are_nested() {
        let declarations = BedrockCollector.declarations(&sdk_config());
        let custom_model = &declarations[0];
        let context = ArnContext {
            partition: "aws".to_string(),
            region: Some("us-east-1".to_string()),
            account_id: "111".to_string(),
        };
        let summary = json!({
            "ModelName": "tuned",
            "ModelArn": "arn:aws:bedrock:us-east-1:111:custom-model/tuned"
        });
        let detail = json!({
            "ModelName": "tuned",
            "ModelArn": "arn:aws:bedrock:us-east-1:111:custom-model/tuned",
            "TrainingDataConfig": {"S3Uri": "s3://train/data.jsonl"},
            "OutputDataConfig": {"S3Uri": "s3://out/", "KmsKeyId": "key-1"}
        });

        let record = build_record(
            custom_model,
            &ParentScope::root(),
            &context,
            &ItemView::new(&summary, Some(&detail)),
            Tags::new(),
        )
        .expect("record");

        assert_eq!(
            record.details()["training_data_config"],
            json!({"S3Uri": "s3://train/data.jsonl"})
        );
        assert_eq!(
            record.details()["output_data_config"],
            json!({"S3Uri": "s3://out/", "KmsKeyId": "key-1"})
        );
    }
}
