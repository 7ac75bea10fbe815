//! Cloud events: listeners, broadcasting and broadcast configuration

use crate::api::{ApiClient, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use serde_json::Value;

/// Content type for structured-mode cloud events
pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json; charset=UTF-8";

impl ApiClient {
    /// Event listeners registered in a namespace
    pub async fn event_listeners(&self, namespace: &str, params: &[String]) -> Result<PagedEnvelope> {
        self.dispatch_json(
            Mutation::get(self.namespace_url(namespace, "/events"), "get event listeners").params(params.to_vec()),
        )
        .await
    }

    /// Broadcast a cloud event (JSON, structured mode) into a namespace
    pub async fn send_event(&self, namespace: &str, event: &str) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.namespace_url(namespace, "/broadcast"), "send namespace event")
                .text(event, CLOUDEVENTS_CONTENT_TYPE),
        )
        .await
    }

    pub async fn broadcast_configuration(&self, namespace: &str) -> Result<Value> {
        self.dispatch_json(Mutation::get(
            self.namespace_url(namespace, "/config"),
            "get broadcast configuration",
        ))
        .await
    }

    /// Replace the broadcast configuration with a JSON document
    pub async fn set_broadcast_configuration(&self, namespace: &str, config: &str) -> Result<Value> {
        self.dispatch_json(
            Mutation::patch(self.namespace_url(namespace, "/config"), "set broadcast configuration")
                .text(config, "application/json"),
        )
        .await
    }
}
