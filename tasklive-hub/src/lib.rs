//! `TaskLive` event hub library.
//!
//! Exposes the hub for use in tests and embedding. The hub accepts
//! WebSocket connections, groups them by topic, and fans published task
//! events out to the other members of the topic.

pub mod config;
pub mod hub;
