//! Filesystem tree: directories and workflows

use crate::api::client::field;
use crate::api::{sanitize_path, ApiClient, Result};
use crate::resource::Mutation;
use serde_json::{json, Value};

/// Kind of node to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Workflow,
}

/// Join a directory path and a child name
fn child_path(dir: &str, name: &str) -> String {
    format!("{}/{}", sanitize_path(dir), name.trim_matches('/'))
}

impl ApiClient {
    /// Read a node (directory listing or workflow)
    pub async fn get_node(&self, namespace: &str, path: &str, params: &[String]) -> Result<Value> {
        self.dispatch_json(Mutation::get(self.tree_url(namespace, path), "get node").params(params.to_vec()))
            .await
    }

    pub async fn create_directory(&self, namespace: &str, dir: &str, name: &str) -> Result<()> {
        self.create_node(namespace, dir, name, NodeKind::Directory, None).await
    }

    /// Create a workflow from its YAML source
    pub async fn create_workflow(&self, namespace: &str, dir: &str, name: &str, yaml: &str) -> Result<()> {
        self.create_node(namespace, dir, name, NodeKind::Workflow, Some(yaml)).await
    }

    async fn create_node(
        &self,
        namespace: &str,
        dir: &str,
        name: &str,
        kind: NodeKind,
        yaml: Option<&str>,
    ) -> Result<()> {
        let url = self.tree_url(namespace, &child_path(dir, name));
        let mutation = match kind {
            NodeKind::Workflow => Mutation::put(url, "create node")
                .op("create-workflow")
                .text(yaml.unwrap_or_default(), "text/yaml"),
            NodeKind::Directory => Mutation::put(url, "create node")
                .op("create-directory")
                .json(json!({ "type": "directory" })),
        };
        self.dispatch_void(mutation).await
    }

    pub async fn delete_node(&self, namespace: &str, dir: &str, name: &str) -> Result<()> {
        let url = self.tree_url(namespace, &child_path(dir, name));
        self.dispatch_void(Mutation::delete(url, "delete node").op("delete-node"))
            .await
    }

    /// Rename a node inside its directory
    pub async fn rename_node(&self, namespace: &str, dir: &str, old_name: &str, new_name: &str) -> Result<()> {
        let url = self.tree_url(namespace, &child_path(dir, old_name));
        self.dispatch_void(
            Mutation::post(url, "rename node")
                .op("rename-node")
                .json(json!({ "new": new_name })),
        )
        .await
    }

    /// Set whether a workflow accepts new instances
    pub async fn toggle_workflow(&self, namespace: &str, path: &str, live: bool) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "toggle workflow")
                .op("toggle")
                .json(json!({ "live": live })),
        )
        .await
    }

    /// Router configuration of a workflow (`live` flag and routes)
    pub async fn workflow_router(&self, namespace: &str, path: &str) -> Result<Value> {
        self.dispatch_json(Mutation::get(self.tree_url(namespace, path), "get workflow router").op("router"))
            .await
    }

    /// Whether a workflow is live
    pub async fn workflow_live(&self, namespace: &str, path: &str) -> Result<bool> {
        let router = self.workflow_router(namespace, path).await?;
        Ok(field(&router, "live")?.as_bool().unwrap_or(false))
    }

    pub async fn edit_workflow_router(&self, namespace: &str, path: &str, routes: Value, live: bool) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "edit workflow router")
                .op("edit-router")
                .json(json!({ "route": routes, "live": live })),
        )
        .await
    }
}
