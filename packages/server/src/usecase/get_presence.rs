//! UseCase: プレゼンス一覧の取得
//!
//! HTTP の問い合わせ（list_members）と、WebSocket の `request-presence`（request）の両方を扱います。

use std::sync::Arc;

use quill_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, OutboundEvent, PresenceRecord, ProjectId, RoomRepository,
    Timestamp,
};

use super::{error::PresenceError, fanout};

/// プレゼンス一覧取得のユースケース
pub struct GetPresenceUseCase {
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl GetPresenceUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            message_pusher,
            clock,
        }
    }

    /// Room のプレゼンス一覧（Room が無い場合は NotFound）
    pub async fn list_members(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<PresenceRecord>, PresenceError> {
        Ok(self.rooms.members(project_id).await?)
    }

    /// 要求した接続にだけ `presence-list` を返す
    ///
    /// 要求できるのは Room に参加している接続のみ。
    pub async fn request(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
    ) -> Result<(), PresenceError> {
        self.rooms.audience(project_id, connection_id).await?;
        let users = self.rooms.members(project_id).await?;
        let event = OutboundEvent::PresenceList {
            project_id: project_id.clone(),
            users,
            timestamp: Timestamp::new(self.clock.now_millis()),
        };
        fanout::reply(self.message_pusher.as_ref(), connection_id, &event).await;
        Ok(())
    }
}
