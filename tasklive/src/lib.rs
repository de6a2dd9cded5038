//! Tasklive — terminal task board with live sync.

pub mod api;
pub mod app;
pub mod config;
pub mod net;
pub mod push;
pub mod session;
pub mod sync;
pub mod ui;
