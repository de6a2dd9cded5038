//! Networking coordinator for wiring the TUI to the async sync layer.
//!
//! This module bridges the synchronous TUI event loop (crossterm
//! poll-based) with the async [`ApiClient`] / [`PushChannel`] stack. It
//! spawns background tokio tasks and communicates with the main thread
//! via [`NetCommand`] / [`NetEvent`] channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  tokio background tasks
//!                     ─── NetCommand →
//! ```
//!
//! The main thread sends [`NetCommand`]s (e.g., create a task) and drains
//! [`NetEvent`]s (e.g., snapshot changed, session expired) on each tick
//! of the poll-based event loop. Task state itself lives in the shared
//! [`SyncEngine`](crate::sync::SyncEngine); events only signal that a
//! redraw is due.

use std::sync::Arc;

use tokio::sync::mpsc;

use tasklive_proto::event::{TASKS_TOPIC, TaskEvent};
use tasklive_proto::task::{TaskFilter, TaskForm, TaskId, TaskPatch};
use tasklive_proto::user::User;

use crate::api::{ApiClient, ApiError};
use crate::push::{ChannelError, PushChannel};
use crate::session::SessionStore;
use crate::sync::{SharedEngine, SubscriptionRegistry, TaskEventHandlers};

/// Commands sent from the TUI main loop to the networking background tasks.
#[derive(Debug)]
pub enum NetCommand {
    /// Re-fetch the task snapshot (narrowed by the given filter) and the
    /// user list from the server.
    Refresh(TaskFilter),
    /// Create a task from a validated form.
    CreateTask(TaskForm),
    /// Apply a partial update to a task.
    UpdateTask {
        /// Target task.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Delete a task.
    DeleteTask(TaskId),
    /// Gracefully shut down the networking tasks.
    Shutdown,
}

/// Events sent from the networking background tasks to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// The shared engine's contents changed; the board should redraw.
    SnapshotChanged,
    /// A task was deleted (locally or by another client). Emitted in
    /// addition to [`NetEvent::SnapshotChanged`] so the UI can drop a
    /// detail view that was showing the task.
    TaskDeleted {
        /// The deleted task's id.
        id: TaskId,
    },
    /// The user directory was (re)loaded.
    UsersLoaded(Vec<User>),
    /// The server rejected our token. The session has been cleared; the
    /// UI should return to the login screen.
    SessionExpired,
    /// Connection status update for the push channel.
    ConnectionStatus {
        /// Whether the push channel is live.
        connected: bool,
    },
    /// An error occurred in the networking layer.
    Error(String),
}

/// Spawn the networking background tasks and return channel handles.
///
/// Joins the tasks topic, installs the board's event binding, fetches
/// the initial snapshot and user list, and spawns:
///
/// 1. An **event pump** that reads pushed events off the channel and
///    dispatches them through the subscription registry.
/// 2. A **command handler** that executes [`NetCommand`]s against the
///    REST API, applies confirmed results to the engine, and publishes
///    the change to the other clients.
///
/// A failed snapshot fetch is not fatal — the board starts empty and
/// live events still flow — unless the failure is a `401`, which clears
/// the session and surfaces [`NetEvent::SessionExpired`].
///
/// # Errors
///
/// Returns [`ChannelError`] if joining the tasks topic fails.
pub async fn spawn_net<C>(
    api: ApiClient,
    channel: C,
    engine: SharedEngine,
    registry: Arc<SubscriptionRegistry>,
    session: SessionStore,
    channel_capacity: usize,
) -> Result<(mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>), ChannelError>
where
    C: PushChannel + Send + Sync + 'static,
{
    channel.join(TASKS_TOPIC).await?;
    let channel = Arc::new(channel);

    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(channel_capacity);

    // Send initial connection status.
    let _ = evt_tx
        .send(NetEvent::ConnectionStatus { connected: true })
        .await;

    // The board's binding: pushed events mutate the engine, and the TUI
    // gets poked to redraw. The handle lives inside the event pump task;
    // when the pump exits the binding is released and late events become
    // no-ops.
    let binding = registry.subscribe(
        TASKS_TOPIC,
        board_handlers(Arc::clone(&engine), evt_tx.clone()),
    );

    // Initial snapshot and user directory.
    load_snapshot(&api, &engine, &TaskFilter::default(), &session, &evt_tx).await;
    load_users(&api, &session, &evt_tx).await;

    // Spawn the event pump.
    let pump_channel = Arc::clone(&channel);
    let pump_registry = Arc::clone(&registry);
    let pump_evt_tx = evt_tx.clone();
    tokio::spawn(async move {
        event_pump(pump_channel, pump_registry, pump_evt_tx).await;
        drop(binding);
    });

    // Spawn the command handler.
    tokio::spawn(async move {
        command_handler(api, channel, engine, session, cmd_rx, evt_tx).await;
    });

    Ok((cmd_tx, evt_rx))
}

/// Handlers that apply pushed events to the engine and poke the TUI.
///
/// Applies are idempotent, so an event for a change this client already
/// made locally (or one replayed by the hub) is harmless. Only applies
/// that actually changed the engine trigger a redraw.
fn board_handlers(engine: SharedEngine, evt_tx: mpsc::Sender<NetEvent>) -> TaskEventHandlers {
    let created_engine = Arc::clone(&engine);
    let created_tx = evt_tx.clone();
    let updated_engine = Arc::clone(&engine);
    let updated_tx = evt_tx.clone();

    TaskEventHandlers::new(
        move |task| {
            if created_engine.write().apply_created(task) {
                notify(&created_tx, NetEvent::SnapshotChanged);
            }
        },
        move |task| {
            if updated_engine.write().apply_updated(task) {
                notify(&updated_tx, NetEvent::SnapshotChanged);
            }
        },
        move |id| {
            if engine.write().apply_deleted(&id) {
                notify(&evt_tx, NetEvent::SnapshotChanged);
                notify(&evt_tx, NetEvent::TaskDeleted { id });
            }
        },
    )
}

/// Non-blocking send for use inside synchronous event handlers. A full
/// event queue only costs a redraw notification.
fn notify(evt_tx: &mpsc::Sender<NetEvent>, event: NetEvent) {
    if let Err(e) = evt_tx.try_send(event) {
        tracing::warn!(err = %e, "dropped net event, queue full");
    }
}

/// Background task: read pushed events and dispatch them to subscribers.
async fn event_pump<C>(
    channel: Arc<C>,
    registry: Arc<SubscriptionRegistry>,
    evt_tx: mpsc::Sender<NetEvent>,
) where
    C: PushChannel,
{
    loop {
        match channel.next_event().await {
            Ok((topic, event)) => {
                let seen = registry.dispatch(&topic, &event);
                tracing::debug!(topic = %topic, event = event.name(), bindings = seen, "event dispatched");
            }
            Err(e) => {
                tracing::warn!(err = %e, "push channel closed");
                let _ = evt_tx
                    .send(NetEvent::ConnectionStatus { connected: false })
                    .await;
                break;
            }
        }
    }
}

/// Background task: execute commands from the TUI main loop.
///
/// Every mutation goes HTTP-first: the server's confirmed record is
/// applied to the engine, then published to the other clients. Nothing
/// is applied optimistically, so a failed request leaves the board
/// untouched.
async fn command_handler<C>(
    api: ApiClient,
    channel: Arc<C>,
    engine: SharedEngine,
    session: SessionStore,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) where
    C: PushChannel,
{
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            NetCommand::Refresh(filter) => {
                load_snapshot(&api, &engine, &filter, &session, &evt_tx).await;
                load_users(&api, &session, &evt_tx).await;
            }
            NetCommand::CreateTask(form) => match api.create_task(&form).await {
                Ok(task) => {
                    engine.write().apply_created(task.clone());
                    let _ = evt_tx.send(NetEvent::SnapshotChanged).await;
                    publish(&channel, &TaskEvent::TaskCreated(task), &evt_tx).await;
                }
                Err(e) => report_api_error(e, &session, &evt_tx).await,
            },
            NetCommand::UpdateTask { id, patch } => match api.update_task(&id, &patch).await {
                Ok(task) => {
                    engine.write().apply_updated(task.clone());
                    let _ = evt_tx.send(NetEvent::SnapshotChanged).await;
                    publish(&channel, &TaskEvent::TaskUpdated(task), &evt_tx).await;
                }
                Err(e) => report_api_error(e, &session, &evt_tx).await,
            },
            NetCommand::DeleteTask(id) => match api.delete_task(&id).await {
                Ok(()) => {
                    engine.write().apply_deleted(&id);
                    let _ = evt_tx.send(NetEvent::SnapshotChanged).await;
                    let _ = evt_tx.send(NetEvent::TaskDeleted { id: id.clone() }).await;
                    publish(&channel, &TaskEvent::TaskDeleted { id }, &evt_tx).await;
                }
                Err(e) => report_api_error(e, &session, &evt_tx).await,
            },
            NetCommand::Shutdown => {
                tracing::info!("net command handler shutting down");
                if let Err(e) = channel.leave(TASKS_TOPIC).await {
                    tracing::debug!(err = %e, "leave on shutdown failed");
                }
                break;
            }
        }
    }
}

/// Fetch a snapshot and replace the engine's contents. The fetch is
/// authoritative for its filter, so a narrowed refresh narrows the board.
async fn load_snapshot(
    api: &ApiClient,
    engine: &SharedEngine,
    filter: &TaskFilter,
    session: &SessionStore,
    evt_tx: &mpsc::Sender<NetEvent>,
) {
    match api.tasks(filter).await {
        Ok(tasks) => {
            engine.write().load_snapshot(tasks);
            let _ = evt_tx.send(NetEvent::SnapshotChanged).await;
        }
        Err(e) => {
            tracing::warn!(err = %e, "task snapshot fetch failed");
            report_api_error(e, session, evt_tx).await;
        }
    }
}

/// Fetch the user directory.
async fn load_users(api: &ApiClient, session: &SessionStore, evt_tx: &mpsc::Sender<NetEvent>) {
    match api.users().await {
        Ok(users) => {
            let _ = evt_tx.send(NetEvent::UsersLoaded(users)).await;
        }
        Err(e) => {
            tracing::warn!(err = %e, "user list fetch failed");
            report_api_error(e, session, evt_tx).await;
        }
    }
}

/// Publish an event to the other clients. A publish failure is reported
/// but never rolls back the local apply — the server already accepted
/// the change, and peers will converge on their next refresh.
async fn publish<C>(channel: &Arc<C>, event: &TaskEvent, evt_tx: &mpsc::Sender<NetEvent>)
where
    C: PushChannel,
{
    if let Err(e) = channel.publish(TASKS_TOPIC, event).await {
        tracing::warn!(err = %e, event = event.name(), "publish failed");
        let _ = evt_tx
            .send(NetEvent::Error(format!("live update not sent: {e}")))
            .await;
    }
}

/// Map an API failure to the right TUI event. A `401` ends the session.
async fn report_api_error(e: ApiError, session: &SessionStore, evt_tx: &mpsc::Sender<NetEvent>) {
    if e.is_unauthorized() {
        if let Err(clear_err) = session.clear() {
            tracing::warn!(err = %clear_err, "failed to clear expired session");
        }
        let _ = evt_tx.send(NetEvent::SessionExpired).await;
    } else {
        let _ = evt_tx.send(NetEvent::Error(e.to_string())).await;
    }
}
