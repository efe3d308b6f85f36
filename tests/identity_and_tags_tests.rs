#[cfg(test)]
mod arn_synthesis_tests {
    use aws_inventory::app::inventory::arn::{synthesize_arn, ArnContext, ArnTemplate};
    use aws_inventory::app::inventory::scope::ParentScope;

    fn context(region: Option<&str>) -> ArnContext {
        ArnContext {
            partition: "aws".to_string(),
            region: region.map(str::to_string),
            account_id: "111".to_string(),
        }
    }

    #[test]
    fn test_widget_arn() {
        let arn = synthesize_arn("aws", "x", Some("r1"), Some("111"), Some("widget"), &[], "w1");
        assert_eq!(arn, "arn:aws:x:r1:111:widget/w1");
    }

    #[test]
    fn test_template_is_stable_across_runs() {
        let template = ArnTemplate::new("datazone").resource_type("project").param("domain_id");
        let scope = ParentScope::root().with("domain_id", "dzd_123");

        let runs: Vec<Option<String>> = (0..3)
            .map(|_| template.render(&context(Some("eu-west-1")), &scope, "prj_9", "analytics"))
            .collect();

        assert_eq!(
            runs[0].as_deref(),
            Some("arn:aws:datazone:eu-west-1:111:project/dzd_123/prj_9")
        );
        assert!(runs.iter().all(|run| run == &runs[0]));
    }

    #[test]
    fn test_missing_parent_param_yields_no_arn() {
        let template = ArnTemplate::new("datazone").resource_type("environment").param("domain_id");
        assert_eq!(
            template.render(&context(Some("eu-west-1")), &ParentScope::root(), "env_1", "env"),
            None
        );
    }

    #[test]
    fn test_bucket_arn_has_no_region_or_account() {
        let template = ArnTemplate::new("s3").local_name();
        let arn = template.render(&context(None), &ParentScope::root(), "logs", "logs");
        assert_eq!(arn.as_deref(), Some("arn:aws:s3:::logs"));
    }
}

#[cfg(test)]
mod tag_normalization_tests {
    use aws_inventory::app::inventory::{normalize_tags, Tags};
    use serde_json::json;

    fn expected(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let raw = json!([{"key": "env", "value": "prod"}, {"key": "env", "value": "dev"}]);
        assert_eq!(normalize_tags(&raw), expected(&[("env", "dev")]));
    }

    #[test]
    fn test_list_and_mapping_forms_agree() {
        let list = json!([{"Key": "team", "Value": "data"}, {"TagKey": "tier", "TagValue": "gold"}]);
        let mapping = json!({"team": "data", "tier": "gold"});
        assert_eq!(normalize_tags(&list), normalize_tags(&mapping));
    }

    #[test]
    fn test_absent_tags_are_empty_not_null() {
        assert!(normalize_tags(&json!(null)).is_empty());
        assert!(normalize_tags(&json!([])).is_empty());
    }
}

#[cfg(test)]
mod global_services_tests {
    use aws_inventory::app::inventory::{
        get_global_query_region, is_global_service, GlobalServiceRegistry,
    };

    #[test]
    fn test_s3_is_global() {
        assert!(is_global_service("s3"));
    }

    #[test]
    fn test_regional_services_are_not_global() {
        assert!(!is_global_service("bedrock"));
        assert!(!is_global_service("datazone"));
        assert!(!is_global_service("dsql"));
        assert!(!is_global_service("s3tables"));
        assert!(!is_global_service("timestream-influxdb"));
    }

    #[test]
    fn test_global_query_region() {
        assert_eq!(get_global_query_region(), "us-east-1");
        assert_eq!(GlobalServiceRegistry::new().get_query_region(), "us-east-1");
    }
}
