//! UseCase 層のエラー定義
//!
//! どのエラーも `code()` でクライアントに返す `ErrorCode` に変換できます。

use thiserror::Error;

use crate::domain::{CommentStoreError, ErrorCode, RepositoryError, RoomError, ValueObjectError};

/// 接続（ハンドシェイク）時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("a valid access token is required")]
    AuthRequired,

    #[error("failed to register connection: {0}")]
    Registration(#[from] RepositoryError),
}

impl ConnectError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConnectError::AuthRequired => ErrorCode::AuthRequired,
            ConnectError::Registration(_) => ErrorCode::BadRequest,
        }
    }
}

/// Room 参加・プレゼンス操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValueObjectError),

    #[error("unrecognized status '{0}'")]
    InvalidStatus(String),

    #[error("{0}")]
    NotFound(String),

    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),
}

impl PresenceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PresenceError::InvalidInput(ValueObjectError::InvalidStatus(_))
            | PresenceError::InvalidStatus(_) => ErrorCode::InvalidStatus,
            PresenceError::InvalidInput(_) => ErrorCode::BadRequest,
            PresenceError::NotFound(_) | PresenceError::ConnectionClosed(_) => {
                ErrorCode::NotFound
            }
        }
    }
}

impl From<RepositoryError> for PresenceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ConnectionClosed(id) => PresenceError::ConnectionClosed(id),
            RepositoryError::Room(RoomError::InvalidTransition { to, .. }) => {
                PresenceError::InvalidStatus(to.to_string())
            }
            other => PresenceError::NotFound(other.to_string()),
        }
    }
}

/// コメント操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("comment content must not be blank")]
    EmptyContent,

    #[error("invalid input: {0}")]
    InvalidInput(ValueObjectError),

    #[error("{0}")]
    NotFound(String),

    #[error("only the author or an elevated member may change this comment")]
    Forbidden,

    #[error("comment store unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl CommentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CommentError::EmptyContent => ErrorCode::EmptyContent,
            CommentError::InvalidInput(_) => ErrorCode::BadRequest,
            CommentError::NotFound(_) => ErrorCode::NotFound,
            CommentError::Forbidden => ErrorCode::Forbidden,
            CommentError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
        }
    }
}

impl From<ValueObjectError> for CommentError {
    fn from(error: ValueObjectError) -> Self {
        match error {
            ValueObjectError::EmptyContent => CommentError::EmptyContent,
            other => CommentError::InvalidInput(other),
        }
    }
}

impl From<RepositoryError> for CommentError {
    fn from(error: RepositoryError) -> Self {
        CommentError::NotFound(error.to_string())
    }
}

impl From<CommentStoreError> for CommentError {
    fn from(error: CommentStoreError) -> Self {
        match error {
            CommentStoreError::NotFound(id) => {
                CommentError::NotFound(format!("comment '{}' not found", id))
            }
            CommentStoreError::Unavailable(reason) => CommentError::UpstreamUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PresenceStatus;

    #[test]
    fn test_repository_errors_map_to_not_found() {
        // テスト項目: 未参加・未知の Room は NotFound として返る
        // given (前提条件):
        let not_member: PresenceError = RepositoryError::Room(RoomError::NotAMember(
            "alice".to_string(),
        ))
        .into();
        let no_room: PresenceError = RepositoryError::RoomNotFound("p1".to_string()).into();

        // when (操作) / then (期待する結果):
        assert_eq!(not_member.code(), ErrorCode::NotFound);
        assert_eq!(no_room.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_invalid_transition_maps_to_invalid_status() {
        // テスト項目: 許可されない状態遷移は InvalidStatus になる
        // given (前提条件):
        let error: PresenceError = RepositoryError::Room(RoomError::InvalidTransition {
            from: PresenceStatus::Offline,
            to: PresenceStatus::Editing,
        })
        .into();

        // when (操作) / then (期待する結果):
        assert_eq!(error, PresenceError::InvalidStatus("editing".to_string()));
        assert_eq!(error.code(), ErrorCode::InvalidStatus);
    }

    #[test]
    fn test_comment_store_errors_map_to_codes() {
        // テスト項目: コメントストアのエラーが対応するコードに変換される
        // given (前提条件):
        let unavailable: CommentError = CommentStoreError::Unavailable("timeout".to_string()).into();
        let missing: CommentError = CommentStoreError::NotFound("c-1".to_string()).into();
        let blank: CommentError = ValueObjectError::EmptyContent.into();

        // when (操作) / then (期待する結果):
        assert_eq!(unavailable.code(), ErrorCode::UpstreamUnavailable);
        assert_eq!(missing.code(), ErrorCode::NotFound);
        assert_eq!(blank.code(), ErrorCode::EmptyContent);
    }
}
