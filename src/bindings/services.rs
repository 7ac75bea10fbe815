//! Knative services: global, namespace and workflow scoped

use crate::api::client::field;
use crate::api::{ApiClient, Result};
use crate::resource::Mutation;
use serde::Serialize;
use serde_json::{json, Value};

/// Service (or revision) to create
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub image: String,
    pub min_scale: u32,
    pub size: u32,
    pub cmd: String,
}

impl ServiceSpec {
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            min_scale: 0,
            size: 0,
            cmd: String::new(),
        }
    }
}

/// Share of traffic routed to one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficSplit {
    pub revision: String,
    pub percent: u8,
}

impl ApiClient {
    pub async fn list_global_services(&self) -> Result<Value> {
        let reply: Value = self
            .dispatch_json(Mutation::get(self.url("functions"), "list global services"))
            .await?;
        field(&reply, "functions")
    }

    pub async fn create_global_service(&self, spec: &ServiceSpec) -> Result<()> {
        tracing::info!("Creating global service {}", spec.name);
        self.dispatch_void(
            Mutation::post(self.url("functions"), "create global service").json(serde_json::to_value(spec)?),
        )
        .await
    }

    pub async fn delete_global_service(&self, name: &str) -> Result<()> {
        self.dispatch_void(Mutation::delete(self.functions_url(name), "delete global service"))
            .await
    }

    /// Create a new revision taking `traffic_percent` of the traffic
    pub async fn create_global_service_revision(
        &self,
        service: &str,
        spec: &ServiceSpec,
        traffic_percent: u8,
    ) -> Result<()> {
        let mut body = serde_json::to_value(spec)?;
        if let Value::Object(map) = &mut body {
            map.remove("name");
            map.insert("trafficPercent".to_string(), json!(traffic_percent));
        }
        self.dispatch_void(
            Mutation::post(self.functions_url(service), "create global service revision").json(body),
        )
        .await
    }

    pub async fn delete_global_service_revision(&self, service: &str, revision: &str) -> Result<()> {
        self.dispatch_void(Mutation::delete(
            self.functions_url(&format!("{}/revisions/{}", service, revision)),
            "delete global service revision",
        ))
        .await
    }

    /// Split traffic between revisions of a global service
    pub async fn set_global_service_traffic(&self, service: &str, splits: &[TrafficSplit]) -> Result<()> {
        self.dispatch_void(
            Mutation::patch(self.functions_url(service), "update traffic global service")
                .json(json!({ "values": splits })),
        )
        .await
    }

    pub async fn list_namespace_services(&self, namespace: &str) -> Result<Value> {
        let reply: Value = self
            .dispatch_json(Mutation::get(
                self.functions_url(&format!("namespaces/{}", namespace)),
                "list namespace services",
            ))
            .await?;
        field(&reply, "functions")
    }

    pub async fn create_namespace_service(&self, namespace: &str, spec: &ServiceSpec) -> Result<()> {
        tracing::info!("Creating service {} in {}", spec.name, namespace);
        self.dispatch_void(
            Mutation::post(
                self.functions_url(&format!("namespaces/{}", namespace)),
                "create namespace service",
            )
            .json(serde_json::to_value(spec)?),
        )
        .await
    }

    pub async fn delete_namespace_service(&self, namespace: &str, name: &str) -> Result<()> {
        self.dispatch_void(Mutation::delete(
            self.functions_url(&format!("namespaces/{}/function/{}", namespace, name)),
            "delete namespace service",
        ))
        .await
    }

    /// Services declared by a workflow
    pub async fn list_workflow_services(&self, namespace: &str, path: &str, params: &[String]) -> Result<Value> {
        let url = self.functions_url(&format!(
            "namespaces/{}/tree{}",
            namespace,
            crate::api::sanitize_path(path)
        ));
        let reply: Value = self
            .dispatch_json(
                Mutation::get(url, "list workflow services")
                    .op("services")
                    .params(params.to_vec()),
            )
            .await?;
        field(&reply, "functions")
    }
}
