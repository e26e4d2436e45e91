//! Integration Tests for Replication
//!
//! Runs primaries and peers on loopback listeners and checks what reaches
//! the peer, in which order, and that the write path never waits on it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    routing::post,
    Router,
};
use chrono::{DateTime, Utc};
use tidecache::{
    cache::Item,
    create_router,
    replication::{ReplicationQueue, ReplicationStats, Replicator},
    Config, Node, Role,
};
use tower::ServiceExt;

// == Helper Functions ==

async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn node_config(role: Role, replica_addr: Option<String>) -> Config {
    Config {
        role,
        replica_addr,
        listen_addr: ([127, 0, 0, 1], 0).into(),
        janitor_interval: Duration::from_millis(50),
        ..Config::default()
    }
}

fn store(query: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/store?{query}"))
        .body(Body::empty())
        .unwrap()
}

/// Peer that records every write and answers from a status script.
#[derive(Default)]
struct RecordingPeer {
    writes: Mutex<Vec<HashMap<String, String>>>,
    calls: AtomicUsize,
    fail_odd_calls: bool,
    delay: Option<Duration>,
}

async fn recording_store(
    State(peer): State<Arc<RecordingPeer>>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    if let Some(delay) = peer.delay {
        tokio::time::sleep(delay).await;
    }
    let call = peer.calls.fetch_add(1, Ordering::SeqCst);
    peer.writes.lock().unwrap().push(params);

    if peer.fail_odd_calls && call % 2 == 1 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn spawn_peer(peer: Arc<RecordingPeer>) -> SocketAddr {
    let app = Router::new()
        .route("/store", post(recording_store))
        .with_state(peer);
    spawn_server(app).await
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within deadline");
}

// == Primary to Secondary ==

#[tokio::test]
async fn test_primary_write_reaches_secondary() {
    let secondary = Node::start(&node_config(Role::Secondary, None)).unwrap();
    let secondary_state = secondary.state();
    let secondary_addr = spawn_server(create_router(secondary.state())).await;

    let primary =
        Node::start(&node_config(Role::Primary, Some(secondary_addr.to_string()))).unwrap();
    let app = create_router(primary.state());

    let response = app.clone().oneshot(store("key=b&value=2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(store("key=c&value=3&ttl=1h")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    eventually(|| {
        let state = secondary_state.clone();
        async move {
            state.cache.get("b").await.as_deref() == Some("2")
                && state.cache.get("c").await.as_deref() == Some("3")
        }
    })
    .await;

    let stats = primary.state().replication.unwrap().stats.snapshot();
    assert_eq!(stats.enqueued, 2);

    primary.shutdown().await;
    secondary.shutdown().await;
}

#[tokio::test]
async fn test_secondary_does_not_forward() {
    let peer = Arc::new(RecordingPeer::default());
    let _peer_addr = spawn_peer(Arc::clone(&peer)).await;

    let secondary = Node::start(&node_config(Role::Secondary, None)).unwrap();
    let app = create_router(secondary.state());

    let response = app.oneshot(store("key=x&value=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(peer.writes.lock().unwrap().is_empty());

    secondary.shutdown().await;
}

// == Replicator ==

#[tokio::test]
async fn test_replicator_attempts_each_item_once_in_order() {
    let peer = Arc::new(RecordingPeer {
        fail_odd_calls: true,
        ..RecordingPeer::default()
    });
    let addr = spawn_peer(Arc::clone(&peer)).await;

    let stats = Arc::new(ReplicationStats::new());
    let replicator =
        Replicator::new(&addr.to_string(), Duration::from_secs(1), Arc::clone(&stats)).unwrap();

    let (sender, feed, _queue) = ReplicationQueue::spawn(8, 8, Arc::clone(&stats));
    for n in 0..6 {
        sender.enqueue(Item::new(format!("k{n}"), format!("v{n}"), None));
    }
    drop(sender);

    replicator.run(feed).await;

    let keys: Vec<String> = peer
        .writes
        .lock()
        .unwrap()
        .iter()
        .map(|params| params["key"].clone())
        .collect();
    assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4", "k5"]);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.replicated, 3);
    assert_eq!(snapshot.failed, 3);
}

#[tokio::test]
async fn test_replicator_wire_format() {
    let peer = Arc::new(RecordingPeer::default());
    let addr = spawn_peer(Arc::clone(&peer)).await;

    let stats = Arc::new(ReplicationStats::new());
    let replicator =
        Replicator::new(&format!("http://{addr}"), Duration::from_secs(1), stats).unwrap();

    let expires_at: DateTime<Utc> = "2030-06-01T08:15:30.987Z".parse().unwrap();
    replicator
        .replicate(&Item::new("with ttl", "a&b=c", Some(expires_at)))
        .await
        .unwrap();
    replicator
        .replicate(&Item::new("forever", "", None))
        .await
        .unwrap();

    let writes = peer.writes.lock().unwrap();
    assert_eq!(writes[0]["key"], "with ttl");
    assert_eq!(writes[0]["value"], "a&b=c");
    assert_eq!(writes[0]["expires_at"], "2030-06-01T08:15:30Z");
    assert_eq!(writes[1]["value"], "");
    assert!(!writes[1].contains_key("expires_at"));
}

#[tokio::test]
async fn test_replicator_times_out_slow_peer() {
    let peer = Arc::new(RecordingPeer {
        delay: Some(Duration::from_secs(2)),
        ..RecordingPeer::default()
    });
    let addr = spawn_peer(Arc::clone(&peer)).await;

    let replicator = Replicator::new(
        &addr.to_string(),
        Duration::from_millis(100),
        Arc::new(ReplicationStats::new()),
    )
    .unwrap();

    let started = Instant::now();
    let result = replicator.replicate(&Item::new("k", "v", None)).await;

    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(1));
}

// == Write Path Isolation ==

#[tokio::test]
async fn test_writes_do_not_wait_on_slow_peer() {
    let peer = Arc::new(RecordingPeer {
        delay: Some(Duration::from_secs(2)),
        ..RecordingPeer::default()
    });
    let addr = spawn_peer(Arc::clone(&peer)).await;

    let config = Config {
        queue_capacity: 4,
        handoff_capacity: 4,
        ..node_config(Role::Primary, Some(addr.to_string()))
    };
    let primary = Node::start(&config).unwrap();
    let app = create_router(primary.state());

    let started = Instant::now();
    for n in 0..50 {
        let response = app
            .clone()
            .oneshot(store(&format!("key=k{n}&value={n}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert!(started.elapsed() < Duration::from_secs(1));

    let stats = primary.state().replication.unwrap().stats.snapshot();
    assert_eq!(
        stats.enqueued + stats.dropped_handoff,
        50,
        "every write is either queued or dropped, never blocked"
    );

    tokio::time::timeout(Duration::from_secs(2), primary.shutdown())
        .await
        .expect("shutdown should not wait on the peer");
}
