use anyhow::{anyhow, Result};
use serde_json::Value;

use super::state::Details;

/// Parameters inherited from ancestor resources.
///
/// A child listing receives the identifiers of every ancestor bound on the way down
/// (`domain_id`, `project_id`, `table_bucket_arn`, ...). The same parameters are copied
/// into the child's record details so the flat output still links back to its parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentScope {
    params: Vec<(String, String)>,
}

impl ParentScope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns a scope with `param` bound, replacing an earlier binding of the same name
    pub fn with(&self, param: &str, value: impl Into<String>) -> Self {
        let mut scope = self.clone();
        let value = value.into();
        match scope.params.iter_mut().find(|(name, _)| name == param) {
            Some(existing) => existing.1 = value,
            None => scope.params.push((param.to_string(), value)),
        }
        scope
    }

    pub fn get(&self, param: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get) but missing parameters are an error for the calling operation
    pub fn require(&self, param: &str) -> Result<String> {
        self.get(param)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Missing {}", param))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Parent identifiers as record details, in binding order
    pub fn to_details(&self) -> Details {
        self.iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect()
    }
}
