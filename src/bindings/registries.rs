//! Container registry credentials: namespace, global and global-private

use crate::api::client::field;
use crate::api::{ApiClient, Result};
use crate::resource::Mutation;
use serde_json::{json, Value};

/// Which registry store an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryScope<'a> {
    Namespace(&'a str),
    Global,
    GlobalPrivate,
}

impl RegistryScope<'_> {
    fn path(&self) -> String {
        match self {
            Self::Namespace(ns) => format!("registries/namespaces/{}", ns),
            Self::Global => "registries/global".to_string(),
            Self::GlobalPrivate => "registries/private".to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Namespace(_) => "registry",
            Self::Global => "global registry",
            Self::GlobalPrivate => "global private registry",
        }
    }
}

impl ApiClient {
    pub async fn list_registries(&self, scope: RegistryScope<'_>) -> Result<Value> {
        let reply: Value = self
            .dispatch_json(Mutation::get(
                self.functions_url(&scope.path()),
                format!("list {}s", scope.label()),
            ))
            .await?;
        field(&reply, "registries")
    }

    /// Store credentials (`data`, usually `user:token`) for a registry URL
    pub async fn create_registry(&self, scope: RegistryScope<'_>, registry: &str, data: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.functions_url(&scope.path()), format!("create {}", scope.label()))
                .json(json!({ "data": data, "reg": registry })),
        )
        .await
    }

    pub async fn delete_registry(&self, scope: RegistryScope<'_>, registry: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::delete(self.functions_url(&scope.path()), format!("delete {}", scope.label()))
                .json(json!({ "reg": registry })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_paths() {
        assert_eq!(RegistryScope::Namespace("ns").path(), "registries/namespaces/ns");
        assert_eq!(RegistryScope::Global.path(), "registries/global");
        assert_eq!(RegistryScope::GlobalPrivate.path(), "registries/private");
    }
}
