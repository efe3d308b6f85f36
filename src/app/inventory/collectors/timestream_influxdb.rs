use aws_config::SdkConfig;

use super::ServiceCollector;
use crate::app::inventory::aws_services::timestream_influxdb::TimestreamInfluxDbService;
use crate::app::inventory::declarations::{ResourceDeclaration, TagSource};

const SERVICE: &str = "timestream-influxdb";

/// Timestream for InfluxDB. Instance details fall back to the listing summary when
/// `GetDbInstance` fails.
pub struct TimestreamInfluxDbCollector;

impl ServiceCollector for TimestreamInfluxDbCollector {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let influxdb = TimestreamInfluxDbService::new(sdk_config);
        vec![db_instances(&influxdb), db_parameter_groups(&influxdb)]
    }
}

fn db_instances(influxdb: &TimestreamInfluxDbService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "db_instance", influxdb.list_db_instances())
        .enrich(influxdb.get_db_instance())
        .tags(TagSource::Fetch(influxdb.list_tags_for_resource()))
        .field("status", "Status")
        .field("endpoint", "Endpoint")
        .field("port", "Port")
        .field("network_type", "NetworkType")
        .field("db_instance_type", "DbInstanceType")
        .field("db_storage_type", "DbStorageType")
        .field("allocated_storage", "AllocatedStorage")
        .field("deployment_type", "DeploymentType")
        .field("publicly_accessible", "PubliclyAccessible")
        .field("availability_zone", "AvailabilityZone")
        .field("secondary_availability_zone", "SecondaryAvailabilityZone")
        .field("vpc_subnet_ids", "VpcSubnetIds")
        .field("vpc_security_group_ids", "VpcSecurityGroupIds")
        .field("db_parameter_group_identifier", "DbParameterGroupIdentifier")
        .field("influx_auth_parameters_secret_arn", "InfluxAuthParametersSecretArn")
        .field("log_delivery_configuration", "LogDeliveryConfiguration")
}

/// AWS default groups exist in every account and have an empty ARN
fn db_parameter_groups(influxdb: &TimestreamInfluxDbService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "db_parameter_group", influxdb.list_db_parameter_groups())
        .exclude("Arn", &[""])
        .tags(TagSource::Fetch(influxdb.list_tags_for_resource()))
        .field("description", "Description")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::BehaviorVersion;
    use aws_types::region::Region;
    use serde_json::json;

    #[test]
    fn test_default_parameter_groups_skipped() {
        let sdk_config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-west-2"))
            .build();
        let declarations = TimestreamInfluxDbCollector.declarations(&sdk_config);
        let groups = &declarations[1];

        assert!(groups.is_excluded(&json!({"Id": "default", "Arn": ""})));
        assert!(!groups.is_excluded(&json!({
            "Id": "pg-1",
            "Arn": "arn:aws:timestream-influxdb:us-west-2:123456789012:db-parameter-group/pg-1"
        })));

        let instances = &declarations[0];
        assert_eq!(instances.enrichments.len(), 1);
        assert!(!instances.enrichments[0].required);
    }
}
