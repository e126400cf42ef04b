//! Quill collaboration server.
//!
//! Project rooms, presence, cursor relay and comment broadcast over WebSocket.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
