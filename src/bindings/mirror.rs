//! Git mirrors and their activities

use crate::api::{ApiClient, Result};
use crate::page::PagedEnvelope;
use crate::resource::Mutation;
use serde::Serialize;
use serde_json::Value;

/// Mirror settings; unset fields are left unchanged by the server
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(rename = "passphrase", skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(rename = "publicKey", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(rename = "privateKey", skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl ApiClient {
    /// Mirror settings (`info`) and recent activities
    pub async fn mirror_info(&self, namespace: &str, path: &str, params: &[String]) -> Result<Value> {
        self.dispatch_json(
            Mutation::get(self.tree_url(namespace, path), "get mirror info")
                .op("mirror-info")
                .params(params.to_vec()),
        )
        .await
    }

    pub async fn update_mirror_settings(&self, namespace: &str, path: &str, settings: &MirrorSettings) -> Result<()> {
        self.dispatch_void(
            Mutation::post(self.tree_url(namespace, path), "updated mirror")
                .op("update-mirror")
                .json(serde_json::to_value(settings)?),
        )
        .await
    }

    /// Start a sync; `force` syncs even when nothing changed upstream
    pub async fn sync_mirror(&self, namespace: &str, path: &str, force: bool) -> Result<()> {
        let mut mutation = Mutation::post(self.tree_url(namespace, path), "sync mirror").op("sync-mirror");
        if force {
            mutation = mutation.param("force=true");
        }
        self.dispatch_void(mutation).await
    }

    /// Lock or unlock a mirror against syncing
    pub async fn set_mirror_lock(&self, namespace: &str, path: &str, lock: bool) -> Result<()> {
        let op = if lock { "lock-mirror" } else { "unlock-mirror" };
        self.dispatch_void(Mutation::post(self.tree_url(namespace, path), "lock mirror").op(op))
            .await
    }

    pub async fn cancel_activity(&self, namespace: &str, activity: &str) -> Result<()> {
        self.dispatch_void(Mutation::post(
            self.namespace_url(namespace, &format!("/activities/{}/cancel", activity)),
            "cancel mirror",
        ))
        .await
    }

    pub async fn activity_logs(&self, namespace: &str, activity: &str, params: &[String]) -> Result<PagedEnvelope> {
        self.dispatch_json(
            Mutation::get(
                self.namespace_url(namespace, &format!("/activities/{}/logs", activity)),
                "mirror activity logs",
            )
            .params(params.to_vec()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mirror_settings_only_sends_set_fields() {
        let settings = MirrorSettings {
            url: Some("https://github.com/direktiv/apps".into()),
            reference: Some("main".into()),
            ..Default::default()
        };
        assert_eq!(
            json!(settings),
            json!({ "url": "https://github.com/direktiv/apps", "ref": "main" })
        );
    }
}
