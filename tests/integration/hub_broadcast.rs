//! End-to-end tests for the event hub.
//!
//! Starts an in-process hub on an ephemeral port and connects real
//! [`WsChannel`] clients to it, verifying handshake, topic membership,
//! and fan-out semantics over actual WebSocket connections.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use chrono::{TimeZone, Utc};

use tasklive::push::PushChannel;
use tasklive::push::ws::WsChannel;
use tasklive_hub::hub::start_server;
use tasklive_proto::event::{TASKS_TOPIC, TaskEvent};
use tasklive_proto::task::{Task, TaskId, TaskStatus, UserRef};

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

async fn start_hub() -> String {
    let (addr, _handle) = start_server("127.0.0.1:0").await.expect("hub start");
    format!("ws://{addr}/ws")
}

async fn recv(channel: &WsChannel) -> (String, TaskEvent) {
    tokio::time::timeout(Duration::from_secs(2), channel.next_event())
        .await
        .expect("event within deadline")
        .expect("open channel")
}

async fn expect_silence(channel: &WsChannel) {
    let got = tokio::time::timeout(Duration::from_millis(300), channel.next_event()).await;
    assert!(got.is_err(), "expected no event, got {got:?}");
}

#[tokio::test]
async fn publish_reaches_other_member() {
    let url = start_hub().await;
    let alice = WsChannel::connect(&url, "alice-token").await.unwrap();
    let bob = WsChannel::connect(&url, "bob-token").await.unwrap();

    alice.join(TASKS_TOPIC).await.unwrap();
    bob.join(TASKS_TOPIC).await.unwrap();
    // Let the join frames land before publishing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice
        .publish(TASKS_TOPIC, &TaskEvent::TaskCreated(make_task("t1", "Live")))
        .await
        .unwrap();

    let (topic, event) = recv(&bob).await;
    assert_eq!(topic, TASKS_TOPIC);
    assert!(matches!(event, TaskEvent::TaskCreated(task) if task.id.as_str() == "t1"));
}

#[tokio::test]
async fn publisher_gets_no_echo() {
    let url = start_hub().await;
    let alice = WsChannel::connect(&url, "alice-token").await.unwrap();
    let bob = WsChannel::connect(&url, "bob-token").await.unwrap();

    alice.join(TASKS_TOPIC).await.unwrap();
    bob.join(TASKS_TOPIC).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice
        .publish(TASKS_TOPIC, &TaskEvent::TaskCreated(make_task("t1", "Once")))
        .await
        .unwrap();

    let _ = recv(&bob).await;
    expect_silence(&alice).await;
}

#[tokio::test]
async fn events_stop_after_leave() {
    let url = start_hub().await;
    let alice = WsChannel::connect(&url, "alice-token").await.unwrap();
    let bob = WsChannel::connect(&url, "bob-token").await.unwrap();

    alice.join(TASKS_TOPIC).await.unwrap();
    bob.join(TASKS_TOPIC).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    bob.leave(TASKS_TOPIC).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice
        .publish(TASKS_TOPIC, &TaskEvent::TaskCreated(make_task("t1", "Late")))
        .await
        .unwrap();

    expect_silence(&bob).await;
}

#[tokio::test]
async fn topics_are_isolated() {
    let url = start_hub().await;
    let alice = WsChannel::connect(&url, "alice-token").await.unwrap();
    let bob = WsChannel::connect(&url, "bob-token").await.unwrap();

    alice.join("tasks").await.unwrap();
    bob.join("other").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice
        .publish("tasks", &TaskEvent::TaskCreated(make_task("t1", "Scoped")))
        .await
        .unwrap();

    expect_silence(&bob).await;
}

#[tokio::test]
async fn three_clients_fan_out() {
    let url = start_hub().await;
    let alice = WsChannel::connect(&url, "alice-token").await.unwrap();
    let bob = WsChannel::connect(&url, "bob-token").await.unwrap();
    let carol = WsChannel::connect(&url, "carol-token").await.unwrap();

    for client in [&alice, &bob, &carol] {
        client.join(TASKS_TOPIC).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice
        .publish(
            TASKS_TOPIC,
            &TaskEvent::TaskDeleted {
                id: TaskId::from("t1"),
            },
        )
        .await
        .unwrap();

    for peer in [&bob, &carol] {
        let (_, event) = recv(peer).await;
        assert!(matches!(event, TaskEvent::TaskDeleted { id } if id.as_str() == "t1"));
    }
    expect_silence(&alice).await;
}

#[tokio::test]
async fn empty_token_is_rejected() {
    let url = start_hub().await;
    let result = WsChannel::connect(&url, "").await;
    assert!(result.is_err(), "hub accepted an empty token");
}

#[tokio::test]
async fn connect_to_dead_hub_fails() {
    let result = WsChannel::connect("ws://127.0.0.1:9/ws", "token").await;
    assert!(result.is_err());
}
