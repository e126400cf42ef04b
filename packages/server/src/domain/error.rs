//! ドメイン層のエラー定義

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value Object の生成時エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("comment content must not be blank")]
    EmptyContent,

    #[error("unrecognized status '{0}'")]
    InvalidStatus(String),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),

    #[error("connection '{0}' is already registered")]
    DuplicateConnection(String),

    #[error("project room '{0}' not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' not found")]
    ClientNotFound(String),

    #[error("outbound queue for client '{0}' is full")]
    QueueFull(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// 外部コメントストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentStoreError {
    #[error("comment store unavailable: {0}")]
    Unavailable(String),

    #[error("comment '{0}' not found")]
    NotFound(String),
}

/// クライアントに返すエラーコード
///
/// 検証エラーは発信元の接続にのみ返し、ブロードキャストはしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    AuthRequired,
    InvalidStatus,
    EmptyContent,
    NotFound,
    UpstreamUnavailable,
    Forbidden,
    BadRequest,
}

/// ProjectRoom 集約の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("user '{0}' is not a member of the room")]
    NotAMember(String),

    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        from: super::PresenceStatus,
        to: super::PresenceStatus,
    },
}
