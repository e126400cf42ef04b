//! Entity 定義
//!
//! 接続、プレゼンス、Room 内で配信されるイベントなど、ドメインの主要な型。

use serde::{Deserialize, Serialize};

use super::{
    CommentContent, CommentId, ConnectionId, DisplayName, ErrorCode, PresenceStatus, ProjectId,
    Timestamp, UserId,
};

/// 認証基盤から受け取るユーザー情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub name: DisplayName,
    pub email: String,
}

/// 1 本の双方向接続
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Identity, connected_at: Timestamp) -> Self {
        Self {
            id,
            identity,
            connected_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }
}

/// (ユーザー, プロジェクト) ごとのプレゼンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub user_name: DisplayName,
    pub project_id: ProjectId,
    pub status: PresenceStatus,
    pub last_seen: Timestamp,
}

/// user-joined / user-left の共通ペイロード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub user_id: UserId,
    pub user_name: DisplayName,
    pub project_id: ProjectId,
    pub timestamp: Timestamp,
}

/// 状態変更イベント（`project_id` が `None` の場合はユーザーの全 Room に適用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateEvent {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub project_id: Option<ProjectId>,
    pub timestamp: Timestamp,
}

/// カーソル位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// カーソル移動イベント（保存せず中継のみ）
#[derive(Debug, Clone, PartialEq)]
pub struct CursorEvent {
    pub user_id: UserId,
    pub user_name: DisplayName,
    pub project_id: ProjectId,
    pub position: CursorPosition,
    pub timestamp: Timestamp,
}

/// コメントの位置（行/ファイル、または座標）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// コメントストアへの登録依頼
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub project_id: ProjectId,
    pub author_id: UserId,
    pub content: CommentContent,
    pub position: Option<CommentPosition>,
}

/// コメントストアが保持しているコメント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComment {
    pub id: CommentId,
    pub project_id: ProjectId,
    pub author_id: UserId,
    pub created_at: Timestamp,
}

/// 投稿されたコメント（Room 内に配信される）
#[derive(Debug, Clone, PartialEq)]
pub struct CommentEvent {
    pub id: CommentId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub user_name: DisplayName,
    pub content: CommentContent,
    pub position: Option<CommentPosition>,
    pub timestamp: Timestamp,
}

/// 運用向けの集計値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// 接続中のユーザー数（複数タブは 1 人）
    pub connected_users: usize,
    /// 接続数
    pub connections: usize,
    /// メンバーが 1 人以上いるプロジェクト Room の数
    pub active_projects: usize,
    /// プロジェクト Room と、接続ごとの個別配信チャンネルの合計
    pub total_rooms: usize,
    /// 送信キューが満杯で破棄したメッセージの累計
    pub dropped_messages: u64,
}

/// クライアントへ送るイベント
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Connected {
        connection_id: ConnectionId,
        user_id: UserId,
        user_name: DisplayName,
    },
    UserJoined(MemberEvent),
    UserLeft(MemberEvent),
    PresenceList {
        project_id: ProjectId,
        users: Vec<PresenceRecord>,
        timestamp: Timestamp,
    },
    StatusChanged(StatusUpdateEvent),
    CursorMoved(CursorEvent),
    CommentPosted(CommentEvent),
    CommentDeleted {
        comment_id: CommentId,
        project_id: ProjectId,
        timestamp: Timestamp,
    },
    CommentResolved {
        comment_id: CommentId,
        project_id: ProjectId,
        timestamp: Timestamp,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl OutboundEvent {
    /// ログ出力用のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Connected { .. } => "connected",
            OutboundEvent::UserJoined(_) => "user-joined",
            OutboundEvent::UserLeft(_) => "user-left",
            OutboundEvent::PresenceList { .. } => "presence-list",
            OutboundEvent::StatusChanged(_) => "status-changed",
            OutboundEvent::CursorMoved(_) => "cursor-moved",
            OutboundEvent::CommentPosted(_) => "comment-posted",
            OutboundEvent::CommentDeleted { .. } => "comment-deleted",
            OutboundEvent::CommentResolved { .. } => "comment-resolved",
            OutboundEvent::Error { .. } => "error",
        }
    }
}
