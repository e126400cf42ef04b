//! UseCase: プロジェクト Room への参加
//!
//! ## テスト作業記録
//!
//! ### 何をテストしているか
//! - JoinProjectUseCase::execute()
//! - user-joined の配信先と、参加した接続への presence-list
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者、2 人目の参加者
//! - エッジケース：同じユーザーの 2 本目の接続、同じ接続での再参加
//! - 異常系：切断処理が始まった接続からの参加

use std::sync::Arc;

use quill_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRepository, JoinOutcome, MemberEvent, Membership, MessagePusher,
    OutboundEvent, ProjectId, RoomRepository, Timestamp,
};

use super::{error::PresenceError, fanout};

/// Room 参加のユースケース
pub struct JoinProjectUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinProjectUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            rooms,
            message_pusher,
            clock,
        }
    }

    /// 接続を Room に参加させる
    ///
    /// ユーザーが新たにメンバーになった場合のみ、他のメンバーに `user-joined` を送る。
    /// 参加した接続には現在の `presence-list` を返す。
    ///
    /// 接続単位のロックを配信まで保持するため、同じ接続の切断処理が送る
    /// `user-left` は必ずこの `user-joined` の後になる。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
    ) -> Result<Membership, PresenceError> {
        let lease = self.connections.acquire(connection_id).await?;
        if !lease.is_open() {
            return Err(PresenceError::ConnectionClosed(connection_id.to_string()));
        }

        let now = Timestamp::new(self.clock.now_millis());
        let membership = self.rooms.join(lease.connection(), project_id, now).await?;

        if membership.outcome == JoinOutcome::UserJoined {
            tracing::info!(
                "User '{}' joined project '{}'",
                membership.record.user_id,
                project_id
            );
            let event = OutboundEvent::UserJoined(MemberEvent {
                user_id: membership.record.user_id.clone(),
                user_name: membership.record.user_name.clone(),
                project_id: project_id.clone(),
                timestamp: now,
            });
            fanout::broadcast(self.message_pusher.as_ref(), &membership.others, &event).await;
        }

        let presence = OutboundEvent::PresenceList {
            project_id: project_id.clone(),
            users: membership.members.clone(),
            timestamp: now,
        };
        fanout::reply(self.message_pusher.as_ref(), connection_id, &presence).await;

        drop(lease);
        Ok(membership)
    }
}
