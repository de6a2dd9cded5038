//! Shared domain and wire definitions for Tasklive.

pub mod event;
pub mod hub;
pub mod task;
pub mod user;
