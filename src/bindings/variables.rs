//! Namespace and workflow variables
//!
//! Variables are opaque blobs stored with a MIME type. Namespace variables
//! live under `vars/<name>`; workflow variables are addressed through `op=`
//! directives on the workflow's tree path.

use crate::api::client::field;
use crate::api::{ApiClient, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use serde_json::Value;

/// MIME type used when none is given
pub const DEFAULT_MIME_TYPE: &str = "application/json";

/// A variable's content as served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub data: String,
    pub content_type: Option<String>,
}

fn var_param(name: &str) -> String {
    format!("var={}", urlencoding::encode(name))
}

impl ApiClient {
    fn namespace_var_url(&self, namespace: &str, name: &str) -> String {
        self.namespace_url(namespace, &format!("/vars/{}", urlencoding::encode(name)))
    }

    pub async fn list_namespace_variables(&self, namespace: &str, params: &[String]) -> Result<PagedEnvelope> {
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.namespace_url(namespace, "/vars"), "list namespace variables")
                    .params(params.to_vec()),
            )
            .await?;
        Ok(serde_json::from_value(field(&reply, "variables")?)?)
    }

    pub async fn get_namespace_variable(&self, namespace: &str, name: &str) -> Result<Variable> {
        let (data, content_type) = self
            .dispatch_text(Mutation::get(self.namespace_var_url(namespace, name), "get variable"))
            .await?;
        Ok(Variable { data, content_type })
    }

    /// Store a namespace variable; `mime_type` defaults to JSON
    pub async fn set_namespace_variable(
        &self,
        namespace: &str,
        name: &str,
        value: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Result<()> {
        self.dispatch_void(
            Mutation::put(self.namespace_var_url(namespace, name), "set variable")
                .text(value, mime_type.unwrap_or(DEFAULT_MIME_TYPE)),
        )
        .await
    }

    pub async fn delete_namespace_variable(&self, namespace: &str, name: &str) -> Result<()> {
        self.dispatch_void(Mutation::delete(self.namespace_var_url(namespace, name), "delete variable"))
            .await
    }

    pub async fn list_workflow_variables(&self, namespace: &str, path: &str, params: &[String]) -> Result<PagedEnvelope> {
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.tree_url(namespace, path), "list workflow variables")
                    .op("vars")
                    .params(params.to_vec()),
            )
            .await?;
        Ok(serde_json::from_value(field(&reply, "variables")?)?)
    }

    pub async fn get_workflow_variable(&self, namespace: &str, path: &str, name: &str) -> Result<Variable> {
        let (data, content_type) = self
            .dispatch_text(
                Mutation::get(self.tree_url(namespace, path), "get variable")
                    .op("var")
                    .param(var_param(name)),
            )
            .await?;
        Ok(Variable { data, content_type })
    }

    /// Store a workflow variable; `mime_type` defaults to JSON
    pub async fn set_workflow_variable(
        &self,
        namespace: &str,
        path: &str,
        name: &str,
        value: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Result<()> {
        self.dispatch_void(
            Mutation::put(self.tree_url(namespace, path), "set variable")
                .op("set-var")
                .param(var_param(name))
                .text(value, mime_type.unwrap_or(DEFAULT_MIME_TYPE)),
        )
        .await
    }

    pub async fn delete_workflow_variable(&self, namespace: &str, path: &str, name: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::delete(self.tree_url(namespace, path), "delete variable")
                .op("delete-var")
                .param(var_param(name)),
        )
        .await
    }
}
