//! Instances

use crate::api::client::field;
use crate::api::{ApiClient, ApiError, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

/// Instance with the states it passed through
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "as")]
    pub workflow: String,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub flow: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Decode the base64 `data` field of an input/output reply
fn decode_data(reply: &Value) -> Result<String> {
    let data = field(reply, "data")?;
    let encoded = data.as_str().unwrap_or_default();
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ApiError::UnexpectedResponse(format!("invalid base64 data: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl ApiClient {
    fn instance_url(&self, namespace: &str, instance: &str, rest: &str) -> String {
        self.namespace_url(namespace, &format!("/instances/{}{}", instance, rest))
    }

    pub async fn list_instances(&self, namespace: &str, params: &[String]) -> Result<PagedEnvelope> {
        let reply: Value = self
            .dispatch_json(
                Mutation::get(self.namespace_url(namespace, "/instances"), "list instances").params(params.to_vec()),
            )
            .await?;
        Ok(serde_json::from_value(field(&reply, "instances")?)?)
    }

    /// Fetch an instance; the flow sent next to it is folded in
    pub async fn get_instance(&self, namespace: &str, instance: &str) -> Result<Instance> {
        let mut reply: Value = self
            .dispatch_json(Mutation::get(self.instance_url(namespace, instance, ""), "get instance"))
            .await?;

        let flow = reply.get_mut("flow").map(Value::take).unwrap_or(Value::Null);
        let mut instance = field(&reply, "instance")?;
        if let Value::Object(map) = &mut instance {
            if !flow.is_null() {
                map.insert("flow".to_string(), flow);
            }
        }
        Ok(serde_json::from_value(instance)?)
    }

    pub async fn instance_input(&self, namespace: &str, instance: &str) -> Result<String> {
        let reply: Value = self
            .dispatch_json(Mutation::get(
                self.instance_url(namespace, instance, "/input"),
                "get instance input",
            ))
            .await?;
        decode_data(&reply)
    }

    pub async fn instance_output(&self, namespace: &str, instance: &str) -> Result<String> {
        let reply: Value = self
            .dispatch_json(Mutation::get(
                self.instance_url(namespace, instance, "/output"),
                "get instance output",
            ))
            .await?;
        decode_data(&reply)
    }

    pub async fn cancel_instance(&self, namespace: &str, instance: &str) -> Result<()> {
        tracing::info!("Cancelling instance {}/{}", namespace, instance);
        self.dispatch_void(Mutation::post(
            self.instance_url(namespace, instance, "/cancel"),
            "cancelling instance",
        ))
        .await
    }

    pub async fn instance_logs(&self, namespace: &str, instance: &str, params: &[String]) -> Result<PagedEnvelope> {
        self.dispatch_json(
            Mutation::get(self.instance_url(namespace, instance, "/logs"), "get instance logs")
                .params(params.to_vec()),
        )
        .await
    }
}
