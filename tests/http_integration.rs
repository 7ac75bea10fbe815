//! Integration tests for the Direktiv client using wiremock
//!
//! These tests verify requests, error mapping and both channel transports
//! against mocked endpoints, including `text/event-stream` responses.

use direktiv_hooks::api::{ApiClient, ApiError};
use direktiv_hooks::config::ClientConfig;
use direktiv_hooks::query::QueryParam;
use direktiv_hooks::resource::{Identity, Mode, Phase, ResourceChannel, ResourceData, ResourceState};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ClientConfig::new(&format!("{}/api/", server.uri())).expect("valid url");
    ApiClient::new(&config).expect("client")
}

fn page(names: &[&str], has_next: bool) -> Value {
    let edges: Vec<Value> = names
        .iter()
        .map(|n| json!({ "cursor": n, "node": { "name": n } }))
        .collect();
    json!({
        "edges": edges,
        "pageInfo": { "hasNextPage": has_next, "hasPreviousPage": false },
        "totalCount": names.len(),
    })
}

fn sse_body(frames: &[Value]) -> String {
    frames.iter().map(|f| format!("data: {}\n\n", f)).collect()
}

fn names(state: &ResourceState) -> Vec<String> {
    state
        .data
        .as_ref()
        .map(|d| {
            d.values()
                .iter()
                .map(|v| v["name"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Wait until the state satisfies `done`
async fn wait_for(rx: &mut watch::Receiver<ResourceState>, done: impl Fn(&ResourceState) -> bool) -> ResourceState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if done(&*state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("channel alive");
        }
    })
    .await
    .expect("state reached in time")
}

/// Test module for mutation dispatch and error mapping
mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_list_namespaces() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/namespaces/demo"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["demo"], false)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.create_namespace("demo").await.expect("create succeeds");

        let namespaces = client.list_namespaces(&[]).await.expect("list succeeds");
        assert_eq!(namespaces.edges.len(), 1);
        assert_eq!(namespaces.edges[0].node["name"], "demo");
        assert_eq!(namespaces.total_count, Some(1));
    }

    #[tokio::test]
    async fn test_delete_namespace_is_recursive() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/namespaces/demo"))
            .and(query_param("recursive", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_namespace("demo").await.expect("delete succeeds");
    }

    #[tokio::test]
    async fn test_namespace_lifecycle() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/namespaces/demo"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/api/namespaces/demo"))
            .and(query_param("recursive", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["demo", "other"], false)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["other"], false)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let listed = |envelope: &direktiv_hooks::page::PagedEnvelope| -> Vec<String> {
            envelope
                .edges
                .iter()
                .map(|e| e.node["name"].as_str().unwrap_or_default().to_string())
                .collect()
        };

        client.create_namespace("demo").await.expect("create succeeds");
        let after_create = client.list_namespaces(&[]).await.expect("list succeeds");
        assert_eq!(listed(&after_create).iter().filter(|n| *n == "demo").count(), 1);

        client.delete_namespace("demo").await.expect("delete succeeds");
        let after_delete = client.list_namespaces(&[]).await.expect("list succeeds");
        assert!(!listed(&after_delete).contains(&"demo".to_string()));
        assert_eq!(after_delete.total_count, Some(1));
    }

    #[tokio::test]
    async fn test_apikey_header_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .and(header("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[], false)))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new(&format!("{}/api/", server.uri()))
            .unwrap()
            .with_apikey("secret");
        let client = ApiClient::new(&config).unwrap();
        client.list_namespaces(&[]).await.expect("authorized request");
    }

    #[tokio::test]
    async fn test_405_maps_to_method_not_allowed() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/namespaces/demo"))
            .respond_with(ResponseTemplate::new(405).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = client_for(&server).create_namespace("demo").await.unwrap_err();
        assert!(matches!(err, ApiError::MethodNotAllowed { .. }));
        assert_eq!(err.to_string(), "create namespace: method is not allowed");
    }

    #[tokio::test]
    async fn test_403_discards_server_detail() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/namespaces/demo"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "rbac says no" })))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_namespace("demo").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(
            err.to_string(),
            "You do not have permission to 'delete namespace', contact system admin"
        );
    }

    #[tokio::test]
    async fn test_json_error_prefers_grpc_message() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/namespaces/demo"))
            .respond_with(
                ResponseTemplate::new(409)
                    .insert_header("grpc-message", "namespace already exists")
                    .set_body_json(json!({ "message": "conflict" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).create_namespace("demo").await.unwrap_err();
        assert_eq!(err.to_string(), "create namespace: namespace already exists");
    }

    #[tokio::test]
    async fn test_json_error_uses_body_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "database down" })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_namespaces(&[]).await.unwrap_err();
        assert_eq!(err.to_string(), "list namespaces: database down");
    }

    #[tokio::test]
    async fn test_unstructured_error_passes_body_through() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/namespaces/demo/instances/abc/cancel"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).cancel_instance("demo", "abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Unstructured { status: 502, .. }));
        assert_eq!(err.to_string(), "cancelling instance: bad gateway");
    }

    #[tokio::test]
    async fn test_execute_workflow_returns_instance_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/namespaces/demo/tree/dir/hello.yaml"))
            .and(query_param("op", "execute"))
            .and(body_string(r#"{"name":"world"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "namespace": "demo", "instance": "i-1" })))
            .mount(&server)
            .await;

        let id = client_for(&server)
            .execute_workflow("demo", "dir/hello.yaml", r#"{"name":"world"}"#)
            .await
            .expect("execute succeeds");
        assert_eq!(id, "i-1");
    }

    #[tokio::test]
    async fn test_rename_node_sends_new_name() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/namespaces/demo/tree/dir/old.yaml"))
            .and(query_param("op", "rename-node"))
            .and(body_json(json!({ "new": "new.yaml" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .rename_node("demo", "dir", "old.yaml", "new.yaml")
            .await
            .expect("rename succeeds");
    }

    #[tokio::test]
    async fn test_save_workflow_defaults_to_latest() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/namespaces/demo/tree/wf.yaml"))
            .and(query_param("op", "save-workflow"))
            .and(query_param("ref", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "revision": { "name": "r1" } })))
            .mount(&server)
            .await;

        let saved = client_for(&server)
            .save_workflow("demo", "wf.yaml", None)
            .await
            .expect("save succeeds");
        assert_eq!(saved["revision"]["name"], "r1");
    }

    #[tokio::test]
    async fn test_instance_input_is_base64_decoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances/abc/input"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "eyJ4IjoxfQ==" })))
            .mount(&server)
            .await;

        let input = client_for(&server).instance_input("demo", "abc").await.unwrap();
        assert_eq!(input, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn test_variables_keep_their_content_type() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/namespaces/demo/vars/greeting"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/vars/greeting"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("hello"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .set_namespace_variable("demo", "greeting", "\"hello\"", None)
            .await
            .expect("set succeeds");

        let variable = client.get_namespace_variable("demo", "greeting").await.unwrap();
        assert_eq!(variable.data, "hello");
        assert_eq!(variable.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_instances_for_workflow_filters_by_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances"))
            .and(query_param("filter.field", "AS"))
            .and(query_param("filter.type", "CONTAINS"))
            .and(query_param("filter.val", "dir/wf.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instances": page(&["i1", "i2"], false) })))
            .mount(&server)
            .await;

        let edges = client_for(&server)
            .instances_for_workflow("demo", "/dir/wf.yaml")
            .await
            .unwrap();
        assert_eq!(edges.len(), 2);
    }
}

/// Test module for polled resource channels
mod polled_channel_tests {
    use super::*;

    #[tokio::test]
    async fn test_paging_past_the_end_keeps_the_window() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a", "b"], true)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .and(query_param("after", "b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[], false)))
            .with_priority(1)
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "namespaces").unwrap();
        assert_eq!(channel.phase(), Phase::Idle);

        channel
            .bind(Identity::new(), vec![QueryParam::first(2)], Mode::Polled)
            .await
            .expect("first page");
        assert_eq!(channel.phase(), Phase::Ready);
        assert_eq!(names(&channel.state()), vec!["a", "b"]);

        channel
            .set_params(vec![QueryParam::after("b"), QueryParam::first(2)])
            .await
            .expect("empty page");

        let state = channel.state();
        assert_eq!(names(&state), vec!["a", "b"]);
        let page_info = state.page_info.unwrap();
        assert!(!page_info.has_next_page);
        assert!(page_info.has_previous_page);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_data_and_sets_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/secrets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "secrets": page(&["token"], false) })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/secrets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "secrets").unwrap();
        channel
            .bind(Identity::namespace("demo"), vec![], Mode::Polled)
            .await
            .unwrap();

        let err = channel.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), "list secrets: boom");

        let state = channel.state();
        assert_eq!(names(&state), vec!["token"]);
        assert_eq!(state.error.as_deref(), Some("list secrets: boom"));
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded_after_rebind() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/slow/instances"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "instances": page(&["old"], false) }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/fast/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instances": page(&["new"], false) })))
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "instances").unwrap();
        channel
            .bind(Identity::namespace("slow"), vec![], Mode::Polled)
            .await
            .unwrap();

        let in_flight = channel.spawn_refresh().expect("polled binding");
        channel
            .bind(Identity::namespace("fast"), vec![], Mode::Polled)
            .await
            .unwrap();

        in_flight.await.unwrap().expect("stale responses are not errors");
        assert_eq!(names(&channel.state()), vec!["new"]);
    }

    #[tokio::test]
    async fn test_unchanged_binding_does_not_refetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["line"], false)))
            .expect(1)
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "namespace-logs").unwrap();
        for _ in 0..3 {
            channel
                .bind(Identity::namespace("demo"), vec![], Mode::Polled)
                .await
                .unwrap();
        }
    }
}

/// Test module for streaming resource channels
mod streaming_channel_tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_frames_are_reconciled_in_order() {
        let server = MockServer::start().await;

        let body = format!(
            "{}data: \n\n: keep-alive\n\ndata: not json\n\n{}",
            sse_body(&[json!({ "namespace": "demo", "instances": page(&["i1"], false) })]),
            sse_body(&[json!({ "namespace": "demo", "instances": page(&["i1", "i2"], false) })]),
        );

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "instances").unwrap();
        channel
            .bind(Identity::namespace("demo"), vec![], Mode::Streaming)
            .await
            .unwrap();

        let mut rx = channel.watch();
        let state = wait_for(&mut rx, |s| s.error.as_deref() == Some("event stream closed")).await;

        assert_eq!(names(&state), vec!["i1", "i2"]);
        assert_eq!(state.total_count, Some(2));
    }

    #[tokio::test]
    async fn test_stream_403_is_permission_denied() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/logs"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "namespace-logs").unwrap();
        channel
            .bind(Identity::namespace("demo"), vec![], Mode::Streaming)
            .await
            .unwrap();

        let mut rx = channel.watch();
        let state = wait_for(&mut rx, |s| s.error.is_some()).await;
        assert_eq!(state.error.as_deref(), Some("permission denied"));
        assert!(state.data.is_none());
        assert_eq!(channel.phase(), Phase::Loading);
    }

    #[tokio::test]
    async fn test_keyed_pod_stream() {
        let server = MockServer::start().await;

        let body = sse_body(&[
            json!({ "event": "ADDED", "pod": { "name": "pod-b", "status": "Pending" } }),
            json!({ "event": "ADDED", "pod": { "name": "pod-a", "status": "Running" } }),
            json!({ "event": "MODIFIED", "pod": { "name": "pod-b", "status": "Running" } }),
            json!({ "event": "DELETED", "pod": { "name": "pod-a" } }),
        ]);

        Mock::given(method("GET"))
            .and(path("/api/functions/svc/revisions/svc-00001/pods"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "global-service-revision-pods").unwrap();
        let identity = Identity::new().with("service", "svc").with("revision", "svc-00001");
        channel.bind(identity, vec![], Mode::Streaming).await.unwrap();

        let mut rx = channel.watch();
        let state = wait_for(&mut rx, |s| s.error.is_some()).await;

        let Some(ResourceData::Items(pods)) = state.data else {
            panic!("expected keyed items");
        };
        assert_eq!(pods, vec![json!({ "name": "pod-b", "status": "Running" })]);
    }

    #[tokio::test]
    async fn test_mode_switch_starts_from_empty_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[json!({ "instances": page(&["gone"], false) })])),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instances": page(&[], false) })))
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "instances").unwrap();
        channel
            .bind(Identity::namespace("demo"), vec![], Mode::Streaming)
            .await
            .unwrap();

        let mut rx = channel.watch();
        let streamed = wait_for(&mut rx, |s| s.error.as_deref() == Some("event stream closed")).await;
        assert_eq!(names(&streamed), vec!["gone"]);

        channel
            .bind(Identity::namespace("demo"), vec![], Mode::Polled)
            .await
            .unwrap();

        let state = channel.state();
        assert!(names(&state).is_empty(), "streamed window survived: {:?}", names(&state));
        assert_eq!(state.total_count, Some(0));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_unbind_resets_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/namespaces/demo/instances/abc/logs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[json!({ "edges": [{ "cursor": "1", "node": { "msg": "hi" } }] })])),
            )
            .mount(&server)
            .await;

        let mut channel = ResourceChannel::for_key(client_for(&server), "instance-logs").unwrap();
        channel
            .bind(Identity::namespace("demo").with("instance", "abc"), vec![], Mode::Streaming)
            .await
            .unwrap();

        let mut rx = channel.watch();
        wait_for(&mut rx, |s| s.data.is_some()).await;

        channel.unbind();
        channel.unbind();
        assert_eq!(channel.phase(), Phase::Idle);
        assert_eq!(channel.state(), ResourceState::default());
    }
}
