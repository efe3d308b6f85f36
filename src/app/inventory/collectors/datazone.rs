use aws_config::SdkConfig;

use super::ServiceCollector;
use crate::app::inventory::arn::ArnTemplate;
use crate::app::inventory::aws_services::datazone::DataZoneService;
use crate::app::inventory::declarations::{
    ArnSource, FieldRef, ParentBinding, ParentField, ResourceDeclaration, TagSource,
};

const SERVICE: &str = "datazone";

/// DataZone domain, project and environment hierarchy
pub struct DataZoneCollector;

impl ServiceCollector for DataZoneCollector {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let datazone = DataZoneService::new(sdk_config);
        vec![domains(&datazone)]
    }
}

fn domains(datazone: &DataZoneService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "domain", datazone.list_domains())
        .arn(ArnSource::NativeOr(
            FieldRef::text("Arn"),
            ArnTemplate::new(SERVICE).resource_type("domain"),
        ))
        .tags(TagSource::Fetch(datazone.list_tags_for_resource()))
        .field("status", "Status")
        .field("description", "Description")
        .field("portal_url", "PortalUrl")
        .field("managed_account_id", "ManagedAccountId")
        .field("domain_version", "DomainVersion")
        .timestamp("created_at", "CreatedAt")
        .timestamp("last_updated_at", "LastUpdatedAt")
        .child(
            vec![ParentBinding::new("domain_id", ParentField::Id)],
            projects(datazone),
        )
}

fn projects(datazone: &DataZoneService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "project", datazone.list_projects())
        .arn(ArnSource::Synthesized(
            ArnTemplate::new(SERVICE).resource_type("project").param("domain_id"),
        ))
        .field("status", "ProjectStatus")
        .field("description", "Description")
        .field("created_by", "CreatedBy")
        .field("domain_unit_id", "DomainUnitId")
        .timestamp("created_at", "CreatedAt")
        .timestamp("updated_at", "UpdatedAt")
        .child(
            vec![ParentBinding::new("project_id", ParentField::Id)],
            environments(datazone),
        )
}

fn environments(datazone: &DataZoneService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "environment", datazone.list_environments())
        .arn(ArnSource::Synthesized(
            ArnTemplate::new(SERVICE).resource_type("environment").param("domain_id"),
        ))
        .field("status", "Status")
        .field("description", "Description")
        .field("provider", "Provider")
        .field("environment_profile_id", "EnvironmentProfileId")
        .field("aws_account_id", "AwsAccountId")
        .field("aws_account_region", "AwsAccountRegion")
        .field("created_by", "CreatedBy")
        .timestamp("created_at", "CreatedAt")
        .timestamp("updated_at", "UpdatedAt")
}
