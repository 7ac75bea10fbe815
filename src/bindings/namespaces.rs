//! Namespaces, namespace logs, metrics and dependencies

use crate::api::{ApiClient, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use serde_json::Value;

/// Namespace-level counters exposed under `/metrics/<name>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Invoked,
    Successful,
    Failed,
    Milliseconds,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoked => "invoked",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Milliseconds => "milliseconds",
        }
    }
}

impl ApiClient {
    /// List namespaces
    pub async fn list_namespaces(&self, params: &[String]) -> Result<PagedEnvelope> {
        self.dispatch_json(Mutation::get(self.url("namespaces"), "list namespaces").params(params.to_vec()))
            .await
    }

    pub async fn create_namespace(&self, namespace: &str) -> Result<()> {
        tracing::info!("Creating namespace {}", namespace);
        self.dispatch_void(Mutation::put(self.namespace_url(namespace, ""), "create namespace"))
            .await
    }

    /// Delete a namespace and everything in it
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        tracing::info!("Deleting namespace {}", namespace);
        self.dispatch_void(
            Mutation::delete(self.namespace_url(namespace, ""), "delete namespace").param("recursive=true"),
        )
        .await
    }

    pub async fn namespace_logs(&self, namespace: &str, params: &[String]) -> Result<PagedEnvelope> {
        self.dispatch_json(
            Mutation::get(self.namespace_url(namespace, "/logs"), "list namespace logs").params(params.to_vec()),
        )
        .await
    }

    pub async fn namespace_metric(&self, namespace: &str, metric: Metric) -> Result<Value> {
        let path = format!("/metrics/{}", metric.as_str());
        self.dispatch_json(Mutation::get(
            self.namespace_url(namespace, &path),
            format!("get {} metrics", metric.as_str()),
        ))
        .await
    }

    pub async fn namespace_dependencies(&self, namespace: &str, params: &[String]) -> Result<Value> {
        self.dispatch_json(
            Mutation::get(self.namespace_url(namespace, "/dependencies"), "list namespace dependencies")
                .params(params.to_vec()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        let names: Vec<_> = [Metric::Invoked, Metric::Successful, Metric::Failed, Metric::Milliseconds]
            .iter()
            .map(|m| m.as_str())
            .collect();
        assert_eq!(names, vec!["invoked", "successful", "failed", "milliseconds"]);
    }
}
