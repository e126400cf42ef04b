//! Request handlers.

mod http;
mod websocket;

pub use http::{get_project_presence, get_status, health_check};
pub use websocket::websocket_handler;
