//! UseCase 共通の送信ヘルパー
//!
//! 送信の失敗はユースケースの失敗にはせず、ログに残すだけにする。

use crate::domain::{BroadcastReport, ConnectionId, MessagePusher, OutboundEvent};

/// 複数の接続へ送信
pub(crate) async fn broadcast(
    pusher: &dyn MessagePusher,
    targets: &[ConnectionId],
    event: &OutboundEvent,
) -> BroadcastReport {
    match pusher.broadcast(targets, event).await {
        Ok(report) => {
            tracing::debug!(
                "Broadcast {} to {} connection(s) (dropped: {}, missing: {})",
                event.name(),
                report.delivered,
                report.dropped,
                report.missing
            );
            report
        }
        Err(e) => {
            tracing::warn!("Failed to broadcast {}: {}", event.name(), e);
            BroadcastReport::default()
        }
    }
}

/// 1 つの接続へ送信
pub(crate) async fn reply(
    pusher: &dyn MessagePusher,
    connection_id: &ConnectionId,
    event: &OutboundEvent,
) {
    if let Err(e) = pusher.push_to(connection_id, event).await {
        tracing::warn!(
            "Failed to push {} to connection '{}': {}",
            event.name(),
            connection_id,
            e
        );
    }
}
