use aws_config::SdkConfig;

use super::ServiceCollector;
use crate::app::inventory::arn::ArnTemplate;
use crate::app::inventory::aws_services::dsql::DsqlService;
use crate::app::inventory::declarations::{ArnSource, FieldRef, ResourceDeclaration, TagSource};

const SERVICE: &str = "dsql";

/// Aurora DSQL clusters. `GetCluster` returns the tags, so no separate tag call is made.
pub struct DsqlCollector;

impl ServiceCollector for DsqlCollector {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let dsql = DsqlService::new(sdk_config);
        vec![clusters(&dsql)]
    }
}

fn clusters(dsql: &DsqlService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "cluster", dsql.list_clusters())
        .id(FieldRef::text("Identifier"))
        .unnamed()
        .arn(ArnSource::NativeOr(
            FieldRef::text("Arn"),
            ArnTemplate::new(SERVICE).resource_type("cluster"),
        ))
        .require(dsql.get_cluster())
        .tags(TagSource::Inline("Tags"))
        .field("status", "Status")
        .field("endpoint", "Endpoint")
        .timestamp("creation_time", "CreationTime")
        .field("deletion_protection_enabled", "DeletionProtectionEnabled")
        .field("encryption_type", "EncryptionDetails.EncryptionType")
        .field("encryption_status", "EncryptionDetails.EncryptionStatus")
        .field("kms_key_arn", "EncryptionDetails.KmsKeyArn")
        .field("witness_region", "MultiRegionProperties.WitnessRegion")
        .field("linked_clusters", "MultiRegionProperties.Clusters")
}
