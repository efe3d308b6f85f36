use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How a global service renders the region and account segments of its ARNs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalArnStyle {
    /// Account segment is left empty as well (`arn:aws:s3:::bucket`)
    pub omit_account: bool,
}

/// Registry of AWS services whose resources are not bound to a region.
/// These are queried once per account and their ARNs carry no region segment.
pub struct GlobalServiceRegistry {
    global_services: HashMap<&'static str, GlobalArnStyle>,
}

impl Default for GlobalServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalServiceRegistry {
    pub fn new() -> Self {
        let mut registry = HashMap::new();

        // Bucket namespace is global; ARNs have neither region nor account
        registry.insert("s3", GlobalArnStyle { omit_account: true });
        registry.insert("route53", GlobalArnStyle { omit_account: true });

        // Account-scoped global services
        registry.insert("iam", GlobalArnStyle { omit_account: false });
        registry.insert("cloudfront", GlobalArnStyle { omit_account: false });
        registry.insert("organizations", GlobalArnStyle { omit_account: false });
        registry.insert("globalaccelerator", GlobalArnStyle { omit_account: false });

        Self {
            global_services: registry,
        }
    }

    /// Check if a service is global
    pub fn is_global(&self, service: &str) -> bool {
        self.global_services.contains_key(service)
    }

    pub fn arn_style(&self, service: &str) -> Option<GlobalArnStyle> {
        self.global_services.get(service).copied()
    }

    /// Get the query region for global services (default: us-east-1)
    pub fn get_query_region(&self) -> &'static str {
        "us-east-1"
    }
}

static REGISTRY: Lazy<GlobalServiceRegistry> = Lazy::new(GlobalServiceRegistry::new);

/// Convenience function to check if a service is global
pub fn is_global_service(service: &str) -> bool {
    REGISTRY.is_global(service)
}

/// ARN style of a global service, `None` for regional ones
pub fn global_arn_style(service: &str) -> Option<GlobalArnStyle> {
    REGISTRY.arn_style(service)
}

/// Get the default region to query for global services
pub fn get_global_query_region() -> &'static str {
    REGISTRY.get_query_region()
}
