//! Integration tests for the networking coordinator.
//!
//! Runs `spawn_net` against a loopback channel and an API pointed at a
//! closed port, verifying that the command/event wiring degrades
//! gracefully without a backend and that pushed events still drive the
//! shared engine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use tasklive::api::ApiClient;
use tasklive::net::{NetCommand, NetEvent, spawn_net};
use tasklive::push::PushChannel;
use tasklive::push::loopback::LoopbackChannel;
use tasklive::session::SessionStore;
use tasklive::sync::{SharedEngine, SubscriptionRegistry, shared_engine};
use tasklive_proto::event::{TASKS_TOPIC, TaskEvent};
use tasklive_proto::task::{Task, TaskForm, TaskId, TaskStatus, UserRef};

fn make_task(id: &str, title: &str) -> Task {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap();
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        description: String::new(),
        status: TaskStatus::Pending,
        created_by: UserRef {
            id: "u1".to_string(),
            username: "alice".to_string(),
        },
        tags: vec![],
        created_at: at,
        updated_at: at,
    }
}

fn temp_session(name: &str) -> SessionStore {
    SessionStore::at_path(
        std::env::temp_dir()
            .join("tasklive-net-tests")
            .join(name)
            .join("session.json"),
    )
}

/// API client pointed at a port nothing listens on. Every call fails
/// with a network error, never a 401.
fn dead_api() -> ApiClient {
    ApiClient::new("http://127.0.0.1:9/api/v1", Duration::from_millis(200)).expect("client")
}

/// Stub backend that only confirms creates, returning the record with a
/// server-assigned id. Everything else 404s.
async fn create_only_api() -> ApiClient {
    async fn create(Json(form): Json<TaskForm>) -> Json<Task> {
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).single().unwrap();
        Json(Task {
            id: TaskId::from("server-assigned"),
            title: form.title,
            description: form.description,
            status: form.status,
            created_by: UserRef {
                id: "u1".to_string(),
                username: "alice".to_string(),
            },
            tags: form.tags,
            created_at: at,
            updated_at: at,
        })
    }
    let app = Router::new().route("/api/v1/tasks", post(create));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    ApiClient::new(&format!("http://{addr}/api/v1"), Duration::from_secs(2)).expect("client")
}

async fn spawn_with(
    api: ApiClient,
    name: &str,
) -> (
    LoopbackChannel,
    SharedEngine,
    mpsc::Sender<NetCommand>,
    mpsc::Receiver<NetEvent>,
) {
    let (local, peer) = LoopbackChannel::create_pair(32);
    peer.join(TASKS_TOPIC).await.unwrap();
    let engine = shared_engine();
    let registry = Arc::new(SubscriptionRegistry::new());
    let (cmd_tx, evt_rx) = spawn_net(
        api,
        local,
        Arc::clone(&engine),
        registry,
        temp_session(name),
        32,
    )
    .await
    .expect("spawn_net");
    (peer, engine, cmd_tx, evt_rx)
}

async fn spawn(
    name: &str,
) -> (
    LoopbackChannel,
    SharedEngine,
    mpsc::Sender<NetCommand>,
    mpsc::Receiver<NetEvent>,
) {
    spawn_with(dead_api(), name).await
}

/// Collect events until the receiver goes quiet.
async fn drain(evt_rx: &mut mpsc::Receiver<NetEvent>) -> Vec<NetEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(300), evt_rx.recv()).await
    {
        events.push(event);
        if events.len() > 32 {
            break;
        }
    }
    events
}

#[tokio::test]
async fn startup_without_backend_reports_errors_but_stays_up() {
    let (_peer, engine, _cmd_tx, mut evt_rx) = spawn("startup").await;

    let events = drain(&mut evt_rx).await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, NetEvent::ConnectionStatus { connected: true }))
    );
    // Snapshot and user fetches both failed against the dead API.
    assert!(events.iter().any(|e| matches!(e, NetEvent::Error(_))));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, NetEvent::SessionExpired))
    );
    assert!(engine.read().is_empty());
}

#[tokio::test]
async fn pushed_event_mutates_engine_and_pokes_ui() {
    let (peer, engine, _cmd_tx, mut evt_rx) = spawn("pushed").await;
    let _ = drain(&mut evt_rx).await;

    peer.publish(TASKS_TOPIC, &TaskEvent::TaskCreated(make_task("t1", "Live")))
        .await
        .unwrap();

    let events = drain(&mut evt_rx).await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, NetEvent::SnapshotChanged))
    );
    assert!(engine.read().get(&TaskId::from("t1")).is_some());
}

#[tokio::test]
async fn pushed_delete_emits_task_deleted() {
    let (peer, engine, _cmd_tx, mut evt_rx) = spawn("pushed-delete").await;
    engine.write().apply_created(make_task("t1", "Doomed"));
    let _ = drain(&mut evt_rx).await;

    peer.publish(
        TASKS_TOPIC,
        &TaskEvent::TaskDeleted {
            id: TaskId::from("t1"),
        },
    )
    .await
    .unwrap();

    let events = drain(&mut evt_rx).await;
    assert!(events.iter().any(
        |e| matches!(e, NetEvent::TaskDeleted { id } if id.as_str() == "t1")
    ));
    assert!(engine.read().is_empty());
}

#[tokio::test]
async fn replayed_event_is_a_no_op() {
    let (peer, engine, _cmd_tx, mut evt_rx) = spawn("replayed").await;
    let task = make_task("t1", "Once");
    engine.write().apply_created(task.clone());
    let _ = drain(&mut evt_rx).await;

    // The hub replays a create this client already holds: no change,
    // no redraw notification.
    peer.publish(TASKS_TOPIC, &TaskEvent::TaskCreated(task))
        .await
        .unwrap();

    let events = drain(&mut evt_rx).await;
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, NetEvent::SnapshotChanged))
    );
    assert_eq!(engine.read().len(), 1);
}

#[tokio::test]
async fn confirmed_create_is_published_to_peers() {
    let (peer, engine, cmd_tx, mut evt_rx) =
        spawn_with(create_only_api().await, "create-publish").await;
    let _ = drain(&mut evt_rx).await;

    cmd_tx
        .send(NetCommand::CreateTask(TaskForm {
            title: "Shared".to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            tags: vec![],
        }))
        .await
        .unwrap();

    // The hub has no backend feed, so the mutating client publishes the
    // server-confirmed record itself and the peer sees it on `tasks`.
    let (topic, event) = tokio::time::timeout(Duration::from_secs(2), peer.next_event())
        .await
        .expect("peer event")
        .unwrap();
    assert_eq!(topic, TASKS_TOPIC);
    assert!(matches!(
        event,
        TaskEvent::TaskCreated(t) if t.id.as_str() == "server-assigned"
    ));
    assert!(engine.read().get(&TaskId::from("server-assigned")).is_some());
}

#[tokio::test]
async fn failed_mutation_leaves_engine_untouched() {
    let (_peer, engine, cmd_tx, mut evt_rx) = spawn("failed-mutation").await;
    let _ = drain(&mut evt_rx).await;

    cmd_tx
        .send(NetCommand::DeleteTask(TaskId::from("t1")))
        .await
        .unwrap();

    let events = drain(&mut evt_rx).await;
    assert!(events.iter().any(|e| matches!(e, NetEvent::Error(_))));
    assert!(engine.read().is_empty());
}

#[tokio::test]
async fn peer_disconnect_reports_connection_down() {
    let (peer, _engine, _cmd_tx, mut evt_rx) = spawn("disconnect").await;
    let _ = drain(&mut evt_rx).await;

    drop(peer);

    let events = drain(&mut evt_rx).await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, NetEvent::ConnectionStatus { connected: false }))
    );
}

#[tokio::test]
async fn shutdown_stops_command_handling() {
    let (_peer, _engine, cmd_tx, mut evt_rx) = spawn("shutdown").await;
    let _ = drain(&mut evt_rx).await;

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
    // Give the handler time to exit, then verify the channel is closed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cmd_tx.is_closed());
    let _ = drain(&mut evt_rx).await;
}
