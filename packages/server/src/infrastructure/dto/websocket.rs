//! WebSocket message DTOs.
//!
//! Every message is a JSON object with a kebab-case `type` tag and camelCase fields.

use serde::{Deserialize, Serialize};

use crate::domain::{CommentPosition, CursorPosition, ErrorCode, PresenceStatus};

/// Outbound message type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Connected,
    UserJoined,
    UserLeft,
    PresenceList,
    StatusChanged,
    CursorMoved,
    CommentPosted,
    CommentDeleted,
    CommentResolved,
    Error,
}

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinProject {
        project_id: String,
    },
    LeaveProject {
        project_id: String,
    },
    StatusUpdate {
        status: String,
        #[serde(default)]
        project_id: Option<String>,
    },
    CursorMove {
        project_id: String,
        cursor: CursorPosition,
    },
    PostComment {
        project_id: String,
        content: String,
        #[serde(default)]
        position: Option<CommentPosition>,
    },
    DeleteComment {
        project_id: String,
        comment_id: String,
    },
    ResolveComment {
        project_id: String,
        comment_id: String,
    },
    RequestPresence {
        project_id: String,
    },
    Heartbeat {
        #[serde(default)]
        project_id: Option<String>,
    },
}

/// Sent once to a client right after the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub r#type: MessageType,
    pub connection_id: String,
    pub user_id: String,
    pub user_name: String,
}

/// `user-joined` / `user-left`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMessage {
    pub r#type: MessageType,
    pub user_id: String,
    pub user_name: String,
    pub project_id: String,
    pub timestamp: i64,
}

/// A single presence entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_id: String,
    pub user_name: String,
    pub status: PresenceStatus,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceListMessage {
    pub r#type: MessageType,
    pub project_id: String,
    pub users: Vec<PresenceInfo>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedMessage {
    pub r#type: MessageType,
    pub user_id: String,
    pub status: PresenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMovedMessage {
    pub r#type: MessageType,
    pub user_id: String,
    pub user_name: String,
    pub project_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPostedMessage {
    pub r#type: MessageType,
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CommentPosition>,
    pub timestamp: i64,
}

/// `comment-deleted` / `comment-resolved`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentChangedMessage {
    pub r#type: MessageType,
    pub comment_id: String,
    pub project_id: String,
    pub timestamp: i64,
}

/// Sent only to the connection whose request failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor_move_event() {
        // テスト項目: cursor-move イベントを camelCase のフィールドでパースできる
        // given (前提条件):
        let json = r#"{"type":"cursor-move","projectId":"p1","cursor":{"x":3,"y":4,"file":"src/lib.rs"}}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::CursorMove {
                project_id: "p1".to_string(),
                cursor: CursorPosition {
                    x: 3.0,
                    y: 4.0,
                    file: Some("src/lib.rs".to_string()),
                },
            }
        );
    }

    #[test]
    fn test_parse_status_update_without_project() {
        // テスト項目: projectId を省略した status-update はグローバルな更新として読める
        // given (前提条件):
        let json = r#"{"type":"status-update","status":"analyzing"}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::StatusUpdate {
                status: "analyzing".to_string(),
                project_id: None,
            }
        );
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        // テスト項目: 未知の type はパースエラーになる
        // given (前提条件):
        let json = r#"{"type":"edit-document","projectId":"p1"}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientEvent>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
