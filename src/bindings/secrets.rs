//! Namespace secrets

use crate::api::client::field;
use crate::api::{ApiClient, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use serde_json::Value;

impl ApiClient {
    fn secret_url(&self, namespace: &str, name: &str) -> String {
        self.namespace_url(namespace, &format!("/secrets/{}", urlencoding::encode(name)))
    }

    /// List secret names; values are never returned
    pub async fn list_secrets(&self, namespace: &str, params: &[String]) -> Result<PagedEnvelope> {
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.namespace_url(namespace, "/secrets"), "list secrets").params(params.to_vec()),
            )
            .await?;
        Ok(serde_json::from_value(field(&reply, "secrets")?)?)
    }

    pub async fn create_secret(&self, namespace: &str, name: &str, value: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::put(self.secret_url(namespace, name), "create secret").text(value, "text/plain"),
        )
        .await
    }

    pub async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.dispatch_void(Mutation::delete(self.secret_url(namespace, name), "delete secret"))
            .await
    }
}
