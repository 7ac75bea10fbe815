//! Workflow revisions, execution and attributes

use crate::api::client::field;
use crate::api::{sanitize_path, ApiClient, ApiError, Result};
use crate::page::Edge;
use crate::query::QueryParam;
use crate::resource::Mutation;
use serde_json::{json, Value};

/// Revision reference used when none is given
pub const LATEST: &str = "latest";

impl ApiClient {
    /// Replace the workflow source of the working revision
    pub async fn update_workflow(&self, namespace: &str, path: &str, yaml: &str) -> Result<Value> {
        self.dispatch_json(
            Mutation::post(self.tree_url(namespace, path), "update workflow")
                .op("update-workflow")
                .text(yaml, "text/yaml"),
        )
        .await
    }

    /// Save a revision; `reference` defaults to `latest`
    pub async fn save_workflow(&self, namespace: &str, path: &str, reference: Option<&str>) -> Result<Value> {
        self.dispatch_json(
            Mutation::post(self.tree_url(namespace, path), "save workflow")
                .op("save-workflow")
                .param(format!("ref={}", reference.unwrap_or(LATEST))),
        )
        .await
    }

    pub async fn discard_workflow(&self, namespace: &str, path: &str, reference: Option<&str>) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "discard workflow")
                .op("discard-workflow")
                .param(format!("ref={}", reference.unwrap_or(LATEST))),
        )
        .await
    }

    pub async fn delete_revision(&self, namespace: &str, path: &str, reference: Option<&str>) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "delete revision")
                .op("delete-revision")
                .param(format!("ref={}", reference.unwrap_or(LATEST))),
        )
        .await
    }

    pub async fn tag_workflow(&self, namespace: &str, path: &str, reference: Option<&str>, tag: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "tag workflow")
                .op("tag")
                .param(format!("ref={}", reference.unwrap_or(LATEST)))
                .param(format!("tag={}", urlencoding::encode(tag))),
        )
        .await
    }

    /// Revisions and tags of a workflow
    pub async fn workflow_refs(&self, namespace: &str, path: &str, params: &[String]) -> Result<Value> {
        self.dispatch_json(
            Mutation::get(self.tree_url(namespace, path), "get workflow refs")
                .op("refs")
                .params(params.to_vec()),
        )
        .await
    }

    /// Forward workflow logs to cloud events under `logger`; empty disables it
    pub async fn set_workflow_event_logging(&self, namespace: &str, path: &str, logger: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "set log to event")
                .op("set-workflow-event-logging")
                .json(json!({ "logger": logger })),
        )
        .await
    }

    /// Start an instance and return its id
    pub async fn execute_workflow(&self, namespace: &str, path: &str, input: &str) -> Result<String> {
        tracing::info!("Executing workflow {}{}", namespace, sanitize_path(path));
        let reply: Value = self
            .dispatch_json(
                Mutation::post(self.tree_url(namespace, path), "execute workflow")
                    .op("execute")
                    .text(input, "application/json"),
            )
            .await?;

        field(&reply, "instance")?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::UnexpectedResponse("instance id is not a string".to_string()))
    }

    pub async fn add_attributes(&self, namespace: &str, path: &str, attributes: &[String]) -> Result<()> {
        self.dispatch_void(
            Mutation::put(self.tree_url(namespace, path), "add workflow attributes")
                .op("create-node-attributes")
                .json(json!({ "attributes": attributes })),
        )
        .await
    }

    pub async fn delete_attributes(&self, namespace: &str, path: &str, attributes: &[String]) -> Result<()> {
        self.dispatch_void(
            Mutation::delete(self.tree_url(namespace, path), "delete workflow attributes")
                .op("delete-node-attributes")
                .json(json!({ "attributes": attributes })),
        )
        .await
    }

    /// Instances started from a workflow
    pub async fn instances_for_workflow(&self, namespace: &str, path: &str) -> Result<Vec<Edge>> {
        let workflow = sanitize_path(path);
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.namespace_url(namespace, "/instances"), "list workflow instances")
                    .params(QueryParam::filter("AS", "CONTAINS", workflow.trim_start_matches('/'))),
            )
            .await?;

        let edges = reply
            .get("instances")
            .and_then(|i| i.get("edges"))
            .cloned()
            .ok_or_else(|| ApiError::UnexpectedResponse("missing 'instances.edges' field".to_string()))?;
        Ok(serde_json::from_value(edges)?)
    }

    /// Per-state execution time metrics of a workflow
    pub async fn state_millisecond_metrics(&self, namespace: &str, path: &str) -> Result<Value> {
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.tree_url(namespace, path), "get state metrics").op("metrics-state-milliseconds"),
            )
            .await?;
        field(&reply, "results")
    }
}
