//! UseCase: 運用向け集計値の取得

use std::sync::Arc;

use crate::domain::{ConnectionRepository, MessagePusher, RoomRepository, StatusSummary};

/// 集計値取得のユースケース
pub struct GetStatusSummaryUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetStatusSummaryUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            rooms,
            message_pusher,
        }
    }

    /// 現在の集計値
    ///
    /// 空になった Room はその場で破棄されるため、存在する Room の数がそのまま
    /// アクティブなプロジェクト数になる。`total_rooms` には接続ごとの個別配信
    /// チャンネルも含める。
    pub async fn execute(&self) -> StatusSummary {
        let connections = self.connections.count_connections().await;
        let active_projects = self.rooms.count_rooms().await;
        StatusSummary {
            connected_users: self.connections.count_users().await,
            connections,
            active_projects,
            total_rooms: active_projects + connections,
            dropped_messages: self.message_pusher.dropped_messages(),
        }
    }
}
