//! S3 general purpose buckets and S3 Tables.
//!
//! Buckets are listed once per account from the global query region and carry their
//! own region. Table buckets are regional and are recorded under the `s3` service.

use aws_config::SdkConfig;

use super::{ServiceCollector, ServiceScope};
use crate::app::inventory::arn::ArnTemplate;
use crate::app::inventory::aws_services::s3::{S3Service, DEFAULT_BUCKET_REGION};
use crate::app::inventory::aws_services::s3tables::S3TablesService;
use crate::app::inventory::declarations::{
    ArnSource, FieldRef, ParentBinding, ParentField, RegionSource, ResourceDeclaration, TagSource,
};

const SERVICE: &str = "s3";

const PUBLIC_ACCESS_FLAGS: &[&str] = &[
    "BlockPublicAcls",
    "IgnorePublicAcls",
    "BlockPublicPolicy",
    "RestrictPublicBuckets",
];

pub struct S3BucketCollector;

impl ServiceCollector for S3BucketCollector {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let s3 = S3Service::new(sdk_config);
        vec![buckets(&s3)]
    }
}

/// Location comes first so the remaining calls go to the bucket's region
fn buckets(s3: &S3Service) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "bucket", s3.list_buckets())
        .id(FieldRef::text("Name"))
        .arn(ArnSource::Synthesized(ArnTemplate::new(SERVICE).local_name()))
        .region(RegionSource::Field {
            path: "LocationConstraint",
            default: DEFAULT_BUCKET_REGION,
        })
        .enrich(s3.get_bucket_location())
        .enrich(s3.get_bucket_versioning())
        .enrich(s3.get_bucket_encryption())
        .enrich(s3.get_public_access_block())
        .tags(TagSource::Fetch(s3.get_bucket_tagging()))
        .timestamp("creation_date", "CreationDate")
        .field("versioning", "VersioningStatus")
        .field("encryption", "EncryptionRules.0.SSEAlgorithm")
        .field(
            "public_access_blocked",
            FieldRef::all_true("PublicAccessBlockConfiguration", PUBLIC_ACCESS_FLAGS),
        )
}

pub struct S3TablesCollector;

impl ServiceCollector for S3TablesCollector {
    fn name(&self) -> &'static str {
        "s3tables"
    }

    fn scope(&self) -> ServiceScope {
        ServiceScope::Regional
    }

    fn declarations(&self, sdk_config: &SdkConfig) -> Vec<ResourceDeclaration> {
        let tables = S3TablesService::new(sdk_config);
        vec![table_buckets(&tables)]
    }
}

fn table_buckets(tables: &S3TablesService) -> ResourceDeclaration {
    let bindings = || {
        vec![
            ParentBinding::new("table_bucket_arn", ParentField::Arn),
            ParentBinding::new("table_bucket_name", ParentField::Name),
        ]
    };

    ResourceDeclaration::new(SERVICE, "table-bucket", tables.list_table_buckets())
        .id(FieldRef::text("Name"))
        .tags(TagSource::Fetch(tables.list_tags_for_resource()))
        .timestamp("creation_date", "CreatedAt")
        .field("owner_account_id", "OwnerAccountId")
        .field("table_bucket_id", "TableBucketId")
        .field("bucket_type", "Type")
        .child(bindings(), namespaces(tables))
        .child(bindings(), tables_declaration(tables))
}

/// Namespaces have no ARN; theirs hangs off the table bucket's. Older listings
/// carry no namespace id, so the joined name stands in.
fn namespaces(tables: &S3TablesService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "namespace", tables.list_namespaces())
        .id(FieldRef::text("NamespaceId").or_joined("Namespace", "/"))
        .name(FieldRef::joined("Namespace", "/"))
        .arn(ArnSource::Synthesized(
            ArnTemplate::nested("table_bucket_arn").literal("namespace").local_name(),
        ))
        .timestamp("created_at", "CreatedAt")
        .field("created_by", "CreatedBy")
        .field("owner_account_id", "OwnerAccountId")
        .field("namespace_id", FieldRef::text("NamespaceId").or_joined("Namespace", "/"))
}

fn tables_declaration(tables: &S3TablesService) -> ResourceDeclaration {
    ResourceDeclaration::new(SERVICE, "table", tables.list_tables())
        .id(FieldRef::text("Name"))
        .arn(ArnSource::Native(FieldRef::text("TableArn")))
        .tags(TagSource::Fetch(tables.list_tags_for_resource()))
        .field("namespace", FieldRef::joined("Namespace", "/"))
        .field("table_type", "Type")
        .timestamp("created_at", "CreatedAt")
        .timestamp("modified_at", "ModifiedAt")
        .field("managed_by_service", "ManagedByService")
        .field("namespace_id", "NamespaceId")
        .field("table_bucket_id", "TableBucketId")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::inventory::arn::ArnContext;
    use crate::app::inventory::record_builder::{ItemView, RecordBuilder};
    use crate::app::inventory::scope::ParentScope;
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
    fn test_bucket_declaration() {
        let declarations = S3BucketCollector.declarations(&sdk_config());
        let bucket = &declarations[0];
        assert_eq!(bucket.enrichments.len(), 4);
        assert!(bucket.enrichments.iter().all(|e| !e.required));
        assert_eq!(
            bucket.enrichments[0].operation.operation(),
            "GetBucketLocation"
        );
    }

    #[test]
    fn test_table_bucket_children_bind_arn_and_name() {
        let declarations = S3TablesCollector.declarations(&sdk_config());
        let table_bucket = &declarations[0];
        let child_types: Vec<&str> = table_bucket
            .children
            .iter()
            .map(|child| child.resource.resource_type)
            .collect();
        assert_eq!(child_types, vec!["namespace", "table"]);
        for child in &table_bucket.children {
            assert_eq!(child.resource.service, "s3");
            assert_eq!(child.bindings.len(), 2);
        }
    }

    fn field_keys(declaration: &ResourceDeclaration) -> Vec<&'static str> {
        declaration.fields.iter().map(|field| field.key).collect()
    }

    #[test]
    fn test_namespace_id_prefers_namespace_id() {
        let declarations = S3TablesCollector.declarations(&sdk_config());
        let namespace = &declarations[0].children[0].resource;
        let context = ArnContext {
            partition: "aws".to_string(),
            region: Some("us-east-1".to_string()),
            account_id: "111".to_string(),
        };
        let bucket_arn = "arn:aws:s3tables:us-east-1:111:bucket/lake";
        let scope = ParentScope::root().with("table_bucket_arn", bucket_arn);
        let builder = RecordBuilder::new(namespace, &scope, &context);

        let with_id = json!({"Namespace": ["sales", "eu"], "NamespaceId": "ns-123"});
        let identity = builder.identity(&ItemView::new(&with_id, None)).expect("identity");
        assert_eq!(identity.id, "ns-123");
        assert_eq!(identity.name, "sales/eu");
        assert_eq!(identity.arn, format!("{}/namespace/sales/eu", bucket_arn));

        let without_id = json!({"Namespace": ["sales", "eu"]});
        let identity = builder.identity(&ItemView::new(&without_id, None)).expect("identity");
        assert_eq!(identity.id, "sales/eu");
        assert_eq!(identity.arn, format!("{}/namespace/sales/eu", bucket_arn));
    }

    #[test]
    fn test_s3_tables_ids_are_recorded() {
        let declarations = S3TablesCollector.declarations(&sdk_config());
        let table_bucket = &declarations[0];
        let bucket_keys = field_keys(table_bucket);
        assert!(bucket_keys.contains(&"table_bucket_id"));
        assert!(bucket_keys.contains(&"bucket_type"));

        assert!(field_keys(&table_bucket.children[0].resource).contains(&"namespace_id"));

        let table_keys = field_keys(&table_bucket.children[1].resource);
        for key in ["managed_by_service", "namespace_id", "table_bucket_id"] {
            assert!(table_keys.contains(&key), "table is missing {}", key);
        }
    }
}
