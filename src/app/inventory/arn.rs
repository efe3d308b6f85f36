//! ARN synthesis for resources whose API responses omit one.
//!
//! Output is a pure function of its inputs, so a synthesized ARN is byte-identical
//! across runs as long as the underlying identifiers do not change. Native ARNs are
//! always preferred; see [`ArnSource`](super::declarations::ArnSource).

use super::global_services::global_arn_style;
use super::scope::ParentScope;

/// Partition for a region name.
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else {
        "aws"
    }
}

/// Render `arn:<partition>:<service>:<region>:<account>:<type>/<parents...>/<local_id>`.
///
/// Global services get an empty region segment (and an empty account segment when
/// their ARN style says so). A missing resource type drops that path element, which is
/// how S3 bucket ARNs (`arn:aws:s3:::name`) come out.
pub fn synthesize_arn(
    partition: &str,
    service: &str,
    region: Option<&str>,
    account: Option<&str>,
    resource_type: Option<&str>,
    parents: &[&str],
    local_id: &str,
) -> String {
    let (region, account) = match global_arn_style(service) {
        Some(style) => (
            "",
            if style.omit_account {
                ""
            } else {
                account.unwrap_or_default()
            },
        ),
        None => (region.unwrap_or_default(), account.unwrap_or_default()),
    };

    let mut path: Vec<&str> = Vec::with_capacity(parents.len() + 2);
    if let Some(resource_type) = resource_type {
        path.push(resource_type);
    }
    path.extend_from_slice(parents);
    path.push(local_id);

    format!(
        "arn:{}:{}:{}:{}:{}",
        partition,
        service,
        region,
        account,
        path.join("/")
    )
}

/// Where the synthesized ARN sits in a collection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnContext {
    pub partition: String,
    pub region: Option<String>,
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(&'static str),
    /// Value of a parent scope parameter
    Param(&'static str),
}

/// Which identifier forms the last path element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalPart {
    Id,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArnBase {
    Service {
        service: &'static str,
        resource_type: Option<&'static str>,
    },
    /// Nested below an ARN held in the parent scope
    Parent { param: &'static str },
}

/// Declarative ARN recipe for one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnTemplate {
    base: ArnBase,
    segments: Vec<PathSegment>,
    local: LocalPart,
}

impl ArnTemplate {
    pub fn new(service: &'static str) -> Self {
        Self {
            base: ArnBase::Service {
                service,
                resource_type: None,
            },
            segments: Vec::new(),
            local: LocalPart::Id,
        }
    }

    /// `<parent arn>/<segments>/<local>`
    pub fn nested(parent_arn_param: &'static str) -> Self {
        Self {
            base: ArnBase::Parent {
                param: parent_arn_param,
            },
            segments: Vec::new(),
            local: LocalPart::Id,
        }
    }

    pub fn resource_type(mut self, resource_type: &'static str) -> Self {
        if let ArnBase::Service {
            resource_type: slot,
            ..
        } = &mut self.base
        {
            *slot = Some(resource_type);
        }
        self
    }

    pub fn literal(mut self, segment: &'static str) -> Self {
        self.segments.push(PathSegment::Literal(segment));
        self
    }

    pub fn param(mut self, param: &'static str) -> Self {
        self.segments.push(PathSegment::Param(param));
        self
    }

    pub fn local_name(mut self) -> Self {
        self.local = LocalPart::Name;
        self
    }

    /// Render the ARN. Returns `None` when a referenced scope parameter or the local
    /// identifier is missing, since a partial ARN is not an identity.
    pub fn render(
        &self,
        ctx: &ArnContext,
        scope: &ParentScope,
        id: &str,
        name: &str,
    ) -> Option<String> {
        let local = match self.local {
            LocalPart::Id => id,
            LocalPart::Name => name,
        };
        if local.is_empty() {
            return None;
        }

        let mut parents = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let value = match segment {
                PathSegment::Literal(literal) => *literal,
                PathSegment::Param(param) => scope.get(param).filter(|v| !v.is_empty())?,
            };
            parents.push(value);
        }

        match &self.base {
            ArnBase::Service {
                service,
                resource_type,
            } => Some(synthesize_arn(
                &ctx.partition,
                service,
                ctx.region.as_deref(),
                Some(ctx.account_id.as_str()),
                *resource_type,
                &parents,
                local,
            )),
            ArnBase::Parent { param } => {
                let parent_arn = scope.get(param).filter(|v| !v.is_empty())?;
                parents.push(local);
                Some(format!("{}/{}", parent_arn, parents.join("/")))
            }
        }
    }
}
