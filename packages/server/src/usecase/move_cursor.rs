//! UseCase: カーソル位置の中継
//!
//! カーソルは保存せず、同じ Room の他の接続へそのまま転送します。
//! last_seen も更新しません。期限切れの判定は受信側が行います。

use std::sync::Arc;

use quill_shared::time::Clock;

use crate::domain::{
    BroadcastReport, ConnectionId, ConnectionRepository, CursorEvent, CursorPosition,
    MessagePusher, OutboundEvent, ProjectId, RoomRepository, Timestamp,
};

use super::{error::PresenceError, fanout};

/// カーソル中継のユースケース
pub struct MoveCursorUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl MoveCursorUseCase {
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

    /// 送信元以外の全接続へ `cursor-moved` を送る
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
        position: CursorPosition,
    ) -> Result<BroadcastReport, PresenceError> {
        let connection = self.connections.find(connection_id).await?;
        let audience: Vec<ConnectionId> = self
            .rooms
            .audience(project_id, connection_id)
            .await?
            .into_iter()
            .filter(|id| id != connection_id)
            .collect();

        let event = OutboundEvent::CursorMoved(CursorEvent {
            user_id: connection.identity.user_id,
            user_name: connection.identity.name,
            project_id: project_id.clone(),
            position,
            timestamp: Timestamp::new(self.clock.now_millis()),
        });
        Ok(fanout::broadcast(self.message_pusher.as_ref(), &audience, &event).await)
    }
}
