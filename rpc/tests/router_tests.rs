//! Router tests against an in-process control double.

use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use netmapd_rpc::{router, ControlError, NetmapControl, RpcState};
use netmapd_types::{NetmapStatus, NodeAttribute, NodeInfo, NodeState, PublicKey};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct FakeControl {
    requested: Mutex<Vec<NetmapStatus>>,
    fail_with: Option<String>,
}

impl FakeControl {
    fn new() -> Self {
        Self {
            requested: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }
}

impl NetmapControl for FakeControl {
    fn local_node_info(&self) -> NodeInfo {
        NodeInfo::new("/ip4/127.0.0.1/tcp/8080", PublicKey::new(vec![0xab; 3]).unwrap())
            .with_attributes(vec![NodeAttribute::new("Location", "Earth")])
            .with_state(NodeState::Online)
    }

    fn current_epoch(&self) -> u64 {
        42
    }

    fn set_netmap_status(&self, status: NetmapStatus) -> Result<(), ControlError> {
        self.requested.lock().unwrap().push(status);
        if status == NetmapStatus::Unspecified {
            return Err(ControlError::UnsupportedStatus(status));
        }
        match &self.fail_with {
            Some(msg) => Err(ControlError::Failed(msg.clone())),
            None => Ok(()),
        }
    }
}

fn app(control: Arc<FakeControl>, metrics: Option<prometheus::Registry>) -> axum::Router {
    router(Arc::new(RpcState { control, metrics }))
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn status_request(status: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/control/netmap_status")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"status":"{status}"}}"#)))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_node_info_reports_status_and_epoch() {
    let resp = app(Arc::new(FakeControl::new()), None)
        .oneshot(
            Request::builder()
                .uri("/v1/netmap/local_node_info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["public_key"], "ababab");
    assert_eq!(json["state"], "ONLINE");
    assert_eq!(json["epoch"], 42);
    assert_eq!(json["attributes"][0]["key"], "Location");
}

#[tokio::test]
async fn set_status_forwards_to_control() {
    let control = Arc::new(FakeControl::new());
    let resp = app(control.clone(), None)
        .oneshot(status_request("offline"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*control.requested.lock().unwrap(), vec![NetmapStatus::Offline]);
}

#[tokio::test]
async fn unknown_status_string_is_bad_request() {
    let control = Arc::new(FakeControl::new());
    let resp = app(control.clone(), None)
        .oneshot(status_request("maintenance"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(control.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_status_is_bad_request() {
    let resp = app(Arc::new(FakeControl::new()), None)
        .oneshot(status_request("unspecified"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ledger_failure_is_bad_gateway() {
    let control = Arc::new(FakeControl {
        requested: Mutex::new(Vec::new()),
        fail_with: Some("ledger unavailable".into()),
    });
    let resp = app(control, None)
        .oneshot(status_request("online"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(resp).await;
    assert!(json["error"].as_str().unwrap().contains("ledger unavailable"));
}

#[tokio::test]
async fn metrics_route_renders_registry() {
    let registry = prometheus::Registry::new();
    let counter = prometheus::IntCounter::new("netmapd_test_total", "test counter").unwrap();
    registry.register(Box::new(counter.clone())).unwrap();
    counter.inc();

    let resp = app(Arc::new(FakeControl::new()), Some(registry))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("netmapd_test_total 1"));
}

#[tokio::test]
async fn metrics_route_is_404_when_disabled() {
    let resp = app(Arc::new(FakeControl::new()), None)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
