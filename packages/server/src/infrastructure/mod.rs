//! Infrastructure 層
//!
//! Domain 層で定義した trait の具体的な実装と、通信用の DTO を提供します。

pub mod auth;
pub mod comment_store;
pub mod dto;
pub mod message_pusher;
pub mod repository;
