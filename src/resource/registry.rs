//! Resource Registry - declarative resource descriptors
//!
//! Every resource a channel can bind to is described once here: where it
//! lives (a path template), how its responses are shaped, and what to call
//! it in error messages. Adding a resource is adding a table entry.

use crate::api::{sanitize_path, ApiError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Turns a response body into the stored object
pub type Unwrap = fn(Value) -> Value;

/// How responses and stream frames of a resource are shaped
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// `{ edges, pageInfo, totalCount }`, at the top level or under `key`.
    /// `info` names a sibling object stored next to the list.
    Paged {
        key: Option<&'static str>,
        info: Option<&'static str>,
    },
    /// Like `Paged`, but stream frames append to the window (logs)
    Appended { key: Option<&'static str> },
    /// A single object, replaced on every frame
    Single { unwrap: Unwrap },
    /// A single object carried by `ADDED`/`MODIFIED` frames
    Watched { key: Option<&'static str> },
    /// One item per frame with an `event` discriminator
    Keyed {
        item: &'static str,
        id_field: &'static str,
        list_key: Option<&'static str>,
    },
}

/// Resource definition
#[derive(Debug, Clone)]
pub struct ResourceDef {
    pub key: &'static str,
    pub display_name: &'static str,
    /// Operation summary used to prefix error messages
    pub summary: &'static str,
    /// Path template relative to the API root, e.g. `namespaces/{namespace}/vars`
    pub path: &'static str,
    pub shape: Shape,
}

impl ResourceDef {
    /// Render this resource's path for an identity
    pub fn render(&self, identity: &Identity) -> Result<String> {
        render_path(self.path, identity)
    }

    /// Whether the resource is a paged edge list
    pub fn is_paged(&self) -> bool {
        matches!(self.shape, Shape::Paged { .. } | Shape::Appended { .. })
    }
}

/// Values for the placeholders of a path template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    vars: BTreeMap<String, String>,
}

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for the common namespace-only identity
    pub fn namespace(namespace: &str) -> Self {
        Self::new().with("namespace", namespace)
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }
}

/// Fill `{name}` placeholders from an identity
///
/// `{path}` is optional and normalized with [`sanitize_path`]; every other
/// placeholder is required.
pub fn render_path(template: &str, identity: &Identity) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            return Err(ApiError::MissingParameter(format!("unterminated placeholder in {}", template)));
        };

        let name = &after[..end];
        match (name, identity.get(name)) {
            ("path", value) => out.push_str(&sanitize_path(value.unwrap_or(""))),
            (_, Some(value)) => out.push_str(value),
            (_, None) => return Err(ApiError::MissingParameter(name.to_string())),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn whole(value: Value) -> Value {
    value
}

fn registries(mut value: Value) -> Value {
    value
        .get_mut("registries")
        .map(Value::take)
        .unwrap_or(Value::Null)
}

/// Instance frames carry the flow next to the instance; fold it in
fn instance_with_flow(mut value: Value) -> Value {
    let flow = value.get_mut("flow").map(Value::take);
    let mut instance = value
        .get_mut("instance")
        .map(Value::take)
        .unwrap_or(Value::Null);
    if let (Some(flow), Value::Object(map)) = (flow, &mut instance) {
        map.insert("flow".to_string(), flow);
    }
    instance
}

const SERVICES: Shape = Shape::Keyed {
    item: "function",
    id_field: "serviceName",
    list_key: Some("functions"),
};

const REVISIONS: Shape = Shape::Keyed {
    item: "revision",
    id_field: "name",
    list_key: Some("revisions"),
};

const PODS: Shape = Shape::Keyed {
    item: "pod",
    id_field: "name",
    list_key: Some("pods"),
};

/// All known resources
static RESOURCES: &[ResourceDef] = &[
    ResourceDef {
        key: "namespaces",
        display_name: "Namespaces",
        summary: "list namespaces",
        path: "namespaces",
        shape: Shape::Paged { key: None, info: None },
    },
    ResourceDef {
        key: "namespace-logs",
        display_name: "Namespace Logs",
        summary: "list namespace logs",
        path: "namespaces/{namespace}/logs",
        shape: Shape::Paged { key: None, info: None },
    },
    ResourceDef {
        key: "namespace-variables",
        display_name: "Namespace Variables",
        summary: "list namespace variables",
        path: "namespaces/{namespace}/vars",
        shape: Shape::Paged { key: Some("variables"), info: None },
    },
    ResourceDef {
        key: "namespace-dependencies",
        display_name: "Namespace Dependencies",
        summary: "list namespace dependencies",
        path: "namespaces/{namespace}/dependencies",
        shape: Shape::Single { unwrap: whole },
    },
    ResourceDef {
        key: "broadcast-config",
        display_name: "Broadcast Configuration",
        summary: "get broadcast configuration",
        path: "namespaces/{namespace}/config",
        shape: Shape::Single { unwrap: whole },
    },
    ResourceDef {
        key: "instances",
        display_name: "Instances",
        summary: "list instances",
        path: "namespaces/{namespace}/instances",
        shape: Shape::Paged { key: Some("instances"), info: None },
    },
    ResourceDef {
        key: "instance",
        display_name: "Instance",
        summary: "get instance",
        path: "namespaces/{namespace}/instances/{instance}",
        shape: Shape::Single { unwrap: instance_with_flow },
    },
    ResourceDef {
        key: "instance-logs",
        display_name: "Instance Logs",
        summary: "get instance logs",
        path: "namespaces/{namespace}/instances/{instance}/logs",
        shape: Shape::Appended { key: None },
    },
    ResourceDef {
        key: "nodes",
        display_name: "Nodes",
        summary: "get node",
        path: "namespaces/{namespace}/tree{path}",
        shape: Shape::Single { unwrap: whole },
    },
    ResourceDef {
        key: "workflow",
        display_name: "Workflow",
        summary: "get workflow",
        path: "namespaces/{namespace}/tree{path}",
        shape: Shape::Single { unwrap: whole },
    },
    ResourceDef {
        key: "workflow-variables",
        display_name: "Workflow Variables",
        summary: "list workflow variables",
        path: "namespaces/{namespace}/tree{path}?op=vars",
        shape: Shape::Paged { key: Some("variables"), info: None },
    },
    ResourceDef {
        key: "secrets",
        display_name: "Secrets",
        summary: "list secrets",
        path: "namespaces/{namespace}/secrets",
        shape: Shape::Paged { key: Some("secrets"), info: None },
    },
    ResourceDef {
        key: "registries",
        display_name: "Registries",
        summary: "list registries",
        path: "functions/registries/namespaces/{namespace}",
        shape: Shape::Single { unwrap: registries },
    },
    ResourceDef {
        key: "global-registries",
        display_name: "Global Registries",
        summary: "list global registries",
        path: "functions/registries/global",
        shape: Shape::Single { unwrap: registries },
    },
    ResourceDef {
        key: "global-private-registries",
        display_name: "Global Private Registries",
        summary: "list global private registries",
        path: "functions/registries/private",
        shape: Shape::Single { unwrap: registries },
    },
    ResourceDef {
        key: "events",
        display_name: "Event Listeners",
        summary: "get event listeners",
        path: "namespaces/{namespace}/events",
        shape: Shape::Paged { key: None, info: None },
    },
    ResourceDef {
        key: "global-services",
        display_name: "Global Services",
        summary: "list global services",
        path: "functions",
        shape: SERVICES,
    },
    ResourceDef {
        key: "namespace-services",
        display_name: "Namespace Services",
        summary: "list namespace services",
        path: "functions/namespaces/{namespace}",
        shape: SERVICES,
    },
    ResourceDef {
        key: "workflow-services",
        display_name: "Workflow Services",
        summary: "list workflow services",
        path: "functions/namespaces/{namespace}/tree{path}?op=services",
        shape: SERVICES,
    },
    ResourceDef {
        key: "global-service",
        display_name: "Global Service",
        summary: "get global service",
        path: "functions/{service}",
        shape: Shape::Watched { key: None },
    },
    ResourceDef {
        key: "global-service-revisions",
        display_name: "Global Service Revisions",
        summary: "list global service revisions",
        path: "functions/{service}/revisions",
        shape: REVISIONS,
    },
    ResourceDef {
        key: "global-service-revision",
        display_name: "Global Service Revision",
        summary: "get global service revision",
        path: "functions/{service}/revisions/{revision}",
        shape: Shape::Watched { key: Some("revision") },
    },
    ResourceDef {
        key: "global-service-revision-pods",
        display_name: "Global Service Revision Pods",
        summary: "list revision pods",
        path: "functions/{service}/revisions/{revision}/pods",
        shape: PODS,
    },
    ResourceDef {
        key: "pod-logs",
        display_name: "Pod Logs",
        summary: "get pod logs",
        path: "functions/logs/pod/{pod}",
        shape: Shape::Single { unwrap: whole },
    },
    ResourceDef {
        key: "workflow-service-revisions",
        display_name: "Workflow Service Revisions",
        summary: "list workflow service revisions",
        path: "functions/namespaces/{namespace}/tree{path}?op=function-revisions&svn={service}&version={version}",
        shape: REVISIONS,
    },
    ResourceDef {
        key: "workflow-service-revision",
        display_name: "Workflow Service Revision",
        summary: "get workflow service revision",
        path: "functions/namespaces/{namespace}/tree{path}?op=function-revision&svn={service}&rev={revision}&version={version}",
        shape: Shape::Watched { key: Some("revision") },
    },
    ResourceDef {
        key: "workflow-service-pods",
        display_name: "Workflow Service Pods",
        summary: "list workflow service pods",
        path: "functions/namespaces/{namespace}/tree{path}?op=pods&svn={service}&rev={revision}&version={version}",
        shape: PODS,
    },
    ResourceDef {
        key: "mirror",
        display_name: "Mirror",
        summary: "get mirror info",
        path: "namespaces/{namespace}/tree{path}?op=mirror-info",
        shape: Shape::Paged {
            key: Some("activities"),
            info: Some("info"),
        },
    },
    ResourceDef {
        key: "mirror-activity-logs",
        display_name: "Mirror Activity Logs",
        summary: "mirror activity logs",
        path: "namespaces/{namespace}/activities/{activity}/logs",
        shape: Shape::Appended { key: None },
    },
];

/// Global lookup table built from [`RESOURCES`]
static REGISTRY: OnceLock<HashMap<&'static str, &'static ResourceDef>> = OnceLock::new();

/// Get the resource registry
pub fn get_registry() -> &'static HashMap<&'static str, &'static ResourceDef> {
    REGISTRY.get_or_init(|| RESOURCES.iter().map(|def| (def.key, def)).collect())
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().get(key).copied()
}

/// Get all resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<_> = get_registry().keys().copied().collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_loads_successfully() {
        assert_eq!(get_registry().len(), RESOURCES.len(), "Resource keys must be unique");
    }

    #[test]
    fn test_namespaces_resource_exists() {
        let resource = get_resource("namespaces").expect("namespaces resource should exist");
        assert_eq!(resource.display_name, "Namespaces");
        assert!(resource.is_paged());
    }

    #[test]
    fn test_get_all_resource_keys() {
        let keys = get_all_resource_keys();
        assert!(keys.contains(&"instances"));
        assert!(keys.contains(&"mirror-activity-logs"));
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_render_path() {
        let identity = Identity::namespace("ns").with("instance", "abc");
        assert_eq!(
            render_path("namespaces/{namespace}/instances/{instance}", &identity).unwrap(),
            "namespaces/ns/instances/abc"
        );
    }

    #[test]
    fn test_render_path_sanitizes_node_path() {
        let identity = Identity::namespace("ns").with("path", "dir/wf/");
        assert_eq!(
            render_path("namespaces/{namespace}/tree{path}?op=vars", &identity).unwrap(),
            "namespaces/ns/tree/dir/wf?op=vars"
        );
        // the tree root needs no path
        assert_eq!(
            render_path("namespaces/{namespace}/tree{path}", &Identity::namespace("ns")).unwrap(),
            "namespaces/ns/tree"
        );
    }

    #[test]
    fn test_render_path_missing_parameter() {
        let err = render_path("namespaces/{namespace}/logs", &Identity::new()).unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter(ref name) if name == "namespace"));
    }

    #[test]
    fn test_instance_unwrap_folds_flow() {
        let body = json!({ "instance": { "id": "i1" }, "flow": ["a", "b"] });
        let instance = instance_with_flow(body);
        assert_eq!(instance["id"], "i1");
        assert_eq!(instance["flow"], json!(["a", "b"]));
    }

    #[test]
    fn test_registries_unwrap() {
        let body = json!({ "registries": [{ "name": "docker.io" }] });
        assert_eq!(registries(body)[0]["name"], "docker.io");
    }
}
