//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの送信キュー（容量付き `mpsc::Sender`）を管理
//! - イベントの JSON 化と、接続への送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成と送信キューの受信側は UI 層（`src/ui/handler/websocket.rs`）が持ちます。
//! ここでは `try_send` のみを使い、満杯のキューへのメッセージは破棄して数えます。
//! 遅い受信者がいても、ブロードキャスト全体が止まることはありません。

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::{
    domain::{
        BroadcastReport, ConnectionId, MessagePushError, MessagePusher, OutboundEvent,
        PusherChannel,
    },
    infrastructure::dto::conversion::encode_event,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// let (tx, rx) = tokio::sync::mpsc::channel(256);
/// pusher.register_client(connection_id, tx).await;
/// pusher.broadcast(&[connection_id], &event).await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信キュー
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
    /// キュー満杯で破棄したメッセージの累計
    dropped: AtomicU64,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(event: &OutboundEvent) -> Result<String, MessagePushError> {
        encode_event(event).map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!(
                "Connection '{}' unregistered from MessagePusher",
                connection_id
            );
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        let payload = Self::encode(event)?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        match sender.try_send(payload) {
            Ok(()) => {
                tracing::debug!("Pushed {} to connection '{}'", event.name(), connection_id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(MessagePushError::QueueFull(connection_id.to_string()))
            }
            Err(TrySendError::Closed(_)) => {
                Err(MessagePushError::ClientNotFound(connection_id.to_string()))
            }
        }
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &OutboundEvent,
    ) -> Result<BroadcastReport, MessagePushError> {
        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            return Ok(report);
        }

        let payload = Self::encode(event)?;
        let clients = self.clients.lock().await;

        for target in targets {
            let Some(sender) = clients.get(target) else {
                tracing::debug!(
                    "Connection '{}' not found during broadcast, skipping",
                    target
                );
                report.missing += 1;
                continue;
            };
            // ブロードキャストでは一部の送信失敗を許容
            match sender.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::warn!(
                        "Outbound queue full for connection '{}', dropping {}",
                        target,
                        event.name()
                    );
                }
                Err(TrySendError::Closed(_)) => report.missing += 1,
            }
        }

        if report.dropped > 0 {
            self.dropped
                .fetch_add(report.dropped as u64, Ordering::Relaxed);
        }
        tracing::debug!(
            "Broadcasted {} to {} connection(s) ({} dropped, {} missing)",
            event.name(),
            report.delivered,
            report.dropped,
            report.missing
        );

        Ok(report)
    }

    fn dropped_messages(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
