//! Live synchronization of the task board.
//!
//! Two asynchronous sources mutate the same task list: completions of HTTP
//! round trips (fetches and confirmed commands) and push events from the
//! hub. Their relative order is non-deterministic, so every change funnels
//! through the [`SyncEngine`]'s idempotent entry points, and push delivery
//! is scoped to view lifetimes by the [`SubscriptionRegistry`].

pub mod engine;
pub mod subscription;

pub use engine::{SharedEngine, SyncEngine, shared_engine};
pub use subscription::{Subscription, SubscriptionRegistry, TaskEventHandlers};
