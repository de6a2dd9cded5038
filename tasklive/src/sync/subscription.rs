//! Token-based subscription registry for push events.
//!
//! A view that wants live updates registers a [`TaskEventHandlers`] bundle
//! for a topic and gets back a [`Subscription`] handle. The handle — not
//! the event name — identifies the binding, so concurrent listeners on the
//! same topic never clobber each other, and releasing a handle removes
//! exactly that binding. A binding covers all three event kinds at once;
//! there is no partially subscribed state.
//!
//! Events dispatched to a topic with no live bindings are dropped, which
//! is what makes a push arriving after view teardown a safe no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use tasklive_proto::event::TaskEvent;
use tasklive_proto::task::{Task, TaskId};

type CreatedFn = Box<dyn Fn(Task) + Send + Sync>;
type UpdatedFn = Box<dyn Fn(Task) + Send + Sync>;
type DeletedFn = Box<dyn Fn(TaskId) + Send + Sync>;

/// One callback per event kind, bound together as a unit.
pub struct TaskEventHandlers {
    on_created: CreatedFn,
    on_updated: UpdatedFn,
    on_deleted: DeletedFn,
}

impl TaskEventHandlers {
    /// Bundles the three callbacks.
    pub fn new(
        on_created: impl Fn(Task) + Send + Sync + 'static,
        on_updated: impl Fn(Task) + Send + Sync + 'static,
        on_deleted: impl Fn(TaskId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_created: Box::new(on_created),
            on_updated: Box::new(on_updated),
            on_deleted: Box::new(on_deleted),
        }
    }

    /// Routes an event to the matching callback.
    fn handle(&self, event: &TaskEvent) {
        match event {
            TaskEvent::TaskCreated(task) => (self.on_created)(task.clone()),
            TaskEvent::TaskUpdated(task) => (self.on_updated)(task.clone()),
            TaskEvent::TaskDeleted { id } => (self.on_deleted)(id.clone()),
        }
    }
}

impl std::fmt::Debug for TaskEventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TaskEventHandlers")
    }
}

/// Registry of live handler bindings, keyed by topic and binding id.
///
/// Explicitly constructed at the composition root and passed by `Arc` —
/// never global state — so tests can wire a fake channel to a private
/// registry.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    bindings: Mutex<HashMap<String, HashMap<u64, TaskEventHandlers>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers handlers for a topic and returns the owning handle.
    ///
    /// After this returns, every event dispatched for the topic reaches
    /// the new handlers. Binding ids are never reused, so a released
    /// handle can never receive a late event meant for its successor.
    pub fn subscribe(
        self: &Arc<Self>,
        topic: impl Into<String>,
        handlers: TaskEventHandlers,
    ) -> Subscription {
        let topic = topic.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.bindings
            .lock()
            .entry(topic.clone())
            .or_default()
            .insert(id, handlers);
        tracing::debug!(topic = %topic, binding = id, "subscription installed");
        Subscription {
            registry: Arc::clone(self),
            topic,
            id,
            released: false,
        }
    }

    /// Invokes every handler currently bound to the topic.
    ///
    /// Returns the number of bindings that saw the event. Zero means the
    /// event arrived with no interested view and was dropped.
    pub fn dispatch(&self, topic: &str, event: &TaskEvent) -> usize {
        let bindings = self.bindings.lock();
        let Some(topic_bindings) = bindings.get(topic) else {
            tracing::debug!(topic = %topic, event = event.name(), "event dropped, no bindings");
            return 0;
        };
        for handlers in topic_bindings.values() {
            handlers.handle(event);
        }
        topic_bindings.len()
    }

    /// Number of live bindings for a topic.
    #[must_use]
    pub fn binding_count(&self, topic: &str) -> usize {
        self.bindings.lock().get(topic).map_or(0, HashMap::len)
    }

    fn release(&self, topic: &str, id: u64) {
        let mut bindings = self.bindings.lock();
        if let Some(topic_bindings) = bindings.get_mut(topic) {
            topic_bindings.remove(&id);
            if topic_bindings.is_empty() {
                bindings.remove(topic);
            }
        }
        tracing::debug!(topic = %topic, binding = id, "subscription released");
    }
}

/// Owning handle for one binding. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) removes exactly this binding.
#[derive(Debug)]
pub struct Subscription {
    registry: Arc<SubscriptionRegistry>,
    topic: String,
    id: u64,
    released: bool,
}

impl Subscription {
    /// The topic this handle is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Removes this binding. Equivalent to dropping the handle, but
    /// explicit at view-teardown sites.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(&self.topic, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
