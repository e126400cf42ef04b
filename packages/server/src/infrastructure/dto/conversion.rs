//! Conversion logic between DTOs and domain entities.

use quill_shared::time::timestamp_to_rfc3339;

use crate::domain::{OutboundEvent, PresenceRecord, StatusSummary};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&PresenceRecord> for dto::PresenceInfo {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            user_name: record.user_name.to_string(),
            status: record.status,
            last_seen: record.last_seen.value(),
        }
    }
}

impl From<&PresenceRecord> for http::PresenceDetailDto {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            user_name: record.user_name.to_string(),
            status: record.status,
            last_seen: timestamp_to_rfc3339(record.last_seen.value()),
        }
    }
}

impl From<StatusSummary> for http::StatusSummaryDto {
    fn from(summary: StatusSummary) -> Self {
        Self {
            connected_users: summary.connected_users,
            connections: summary.connections,
            active_projects: summary.active_projects,
            total_rooms: summary.total_rooms,
            dropped_messages: summary.dropped_messages,
        }
    }
}

/// Serialize an outbound event into its JSON wire form.
pub fn encode_event(event: &OutboundEvent) -> Result<String, serde_json::Error> {
    match event {
        OutboundEvent::Connected {
            connection_id,
            user_id,
            user_name,
        } => serde_json::to_string(&dto::ConnectedMessage {
            r#type: dto::MessageType::Connected,
            connection_id: connection_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        }),
        OutboundEvent::UserJoined(member) | OutboundEvent::UserLeft(member) => {
            let r#type = if matches!(event, OutboundEvent::UserJoined(_)) {
                dto::MessageType::UserJoined
            } else {
                dto::MessageType::UserLeft
            };
            serde_json::to_string(&dto::MemberMessage {
                r#type,
                user_id: member.user_id.to_string(),
                user_name: member.user_name.to_string(),
                project_id: member.project_id.to_string(),
                timestamp: member.timestamp.value(),
            })
        }
        OutboundEvent::PresenceList {
            project_id,
            users,
            timestamp,
        } => serde_json::to_string(&dto::PresenceListMessage {
            r#type: dto::MessageType::PresenceList,
            project_id: project_id.to_string(),
            users: users.iter().map(dto::PresenceInfo::from).collect(),
            timestamp: timestamp.value(),
        }),
        OutboundEvent::StatusChanged(update) => serde_json::to_string(&dto::StatusChangedMessage {
            r#type: dto::MessageType::StatusChanged,
            user_id: update.user_id.to_string(),
            status: update.status,
            project_id: update.project_id.as_ref().map(ToString::to_string),
            timestamp: update.timestamp.value(),
        }),
        OutboundEvent::CursorMoved(cursor) => serde_json::to_string(&dto::CursorMovedMessage {
            r#type: dto::MessageType::CursorMoved,
            user_id: cursor.user_id.to_string(),
            user_name: cursor.user_name.to_string(),
            project_id: cursor.project_id.to_string(),
            x: cursor.position.x,
            y: cursor.position.y,
            file: cursor.position.file.clone(),
            timestamp: cursor.timestamp.value(),
        }),
        OutboundEvent::CommentPosted(comment) => {
            serde_json::to_string(&dto::CommentPostedMessage {
                r#type: dto::MessageType::CommentPosted,
                id: comment.id.to_string(),
                project_id: comment.project_id.to_string(),
                user_id: comment.user_id.to_string(),
                user_name: comment.user_name.to_string(),
                content: comment.content.as_str().to_string(),
                position: comment.position.clone(),
                timestamp: comment.timestamp.value(),
            })
        }
        OutboundEvent::CommentDeleted {
            comment_id,
            project_id,
            timestamp,
        }
        | OutboundEvent::CommentResolved {
            comment_id,
            project_id,
            timestamp,
        } => {
            let r#type = if matches!(event, OutboundEvent::CommentDeleted { .. }) {
                dto::MessageType::CommentDeleted
            } else {
                dto::MessageType::CommentResolved
            };
            serde_json::to_string(&dto::CommentChangedMessage {
                r#type,
                comment_id: comment_id.to_string(),
                project_id: project_id.to_string(),
                timestamp: timestamp.value(),
            })
        }
        OutboundEvent::Error { code, message } => serde_json::to_string(&dto::ErrorMessage {
            r#type: dto::MessageType::Error,
            code: *code,
            message: message.clone(),
        }),
    }
}
