//! ユースケースの組み立て
//!
//! 起動時に 1 度だけ作るサービスオブジェクト。テストでは毎回新しいインスタンスを作れます。

use std::{sync::Arc, time::Duration};

use quill_shared::time::Clock;

use crate::domain::{
    AccessPolicy, CommentStore, ConnectionId, ConnectionRepository, ErrorCode, IdentityProvider,
    MessagePusher, OutboundEvent, RoomRepository,
};

use super::{
    ConnectClientUseCase, DisconnectClientUseCase, GetPresenceUseCase, GetStatusSummaryUseCase,
    HeartbeatUseCase, JoinProjectUseCase, LeaveProjectUseCase, ManageCommentUseCase,
    MoveCursorUseCase, PostCommentUseCase, UpdateStatusUseCase, fanout,
};

/// 外部コラボレーターとサービス全体の設定
pub struct Collaborators {
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub comment_store: Arc<dyn CommentStore>,
    pub access_policy: Arc<dyn AccessPolicy>,
    pub clock: Arc<dyn Clock>,
    /// コメントストア呼び出しの上限時間
    pub comment_store_timeout: Duration,
}

/// 全ユースケースをまとめたサービス
pub struct CollabService {
    pub connect: ConnectClientUseCase,
    pub join_project: JoinProjectUseCase,
    pub leave_project: LeaveProjectUseCase,
    pub update_status: UpdateStatusUseCase,
    pub move_cursor: MoveCursorUseCase,
    pub post_comment: PostCommentUseCase,
    pub manage_comment: ManageCommentUseCase,
    pub disconnect: DisconnectClientUseCase,
    pub get_presence: GetPresenceUseCase,
    pub heartbeat: HeartbeatUseCase,
    pub get_status_summary: GetStatusSummaryUseCase,
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl CollabService {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            identity_provider,
            comment_store,
            access_policy,
            clock,
            comment_store_timeout,
        } = collaborators;

        Self {
            connect: ConnectClientUseCase::new(
                identity_provider,
                connections.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            join_project: JoinProjectUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            leave_project: LeaveProjectUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            update_status: UpdateStatusUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            move_cursor: MoveCursorUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            post_comment: PostCommentUseCase::new(
                connections.clone(),
                rooms.clone(),
                comment_store.clone(),
                message_pusher.clone(),
                comment_store_timeout,
            ),
            manage_comment: ManageCommentUseCase::new(
                connections.clone(),
                rooms.clone(),
                comment_store,
                access_policy,
                message_pusher.clone(),
                clock.clone(),
                comment_store_timeout,
            ),
            disconnect: DisconnectClientUseCase::new(
                connections.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            get_presence: GetPresenceUseCase::new(
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            heartbeat: HeartbeatUseCase::new(connections.clone(), rooms.clone(), clock),
            get_status_summary: GetStatusSummaryUseCase::new(
                connections.clone(),
                rooms,
                message_pusher.clone(),
            ),
            connections,
            message_pusher,
        }
    }

    /// 要求が失敗したことを、その接続にだけ `error` で知らせる
    pub async fn reject(&self, connection_id: &ConnectionId, code: ErrorCode, message: String) {
        let event = OutboundEvent::Error { code, message };
        fanout::reply(self.message_pusher.as_ref(), connection_id, &event).await;
    }

    /// 残っている全接続に切断処理を行う
    ///
    /// # Returns
    ///
    /// 切断処理を行った接続数
    pub async fn shutdown(&self) -> usize {
        let mut reaped = 0;
        for connection_id in self.connections.all_connection_ids().await {
            if self.disconnect.execute(&connection_id).await.is_some() {
                reaped += 1;
            }
        }
        tracing::info!("Reaped {} session(s) on shutdown", reaped);
        reaped
    }
}
