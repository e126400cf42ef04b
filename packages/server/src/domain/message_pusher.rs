//! MessagePusher trait 定義
//!
//! クライアントへのイベント送信のインターフェース。UseCase 層はこの trait にのみ依存し、
//! WebSocket などの具体的な送信手段は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError, OutboundEvent};

/// クライアントへの送信キュー（容量付き）
pub type PusherChannel = mpsc::Sender<String>;

/// ブロードキャスト結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// キューに積めた数
    pub delivered: usize,
    /// キューが満杯で破棄した数
    pub dropped: usize,
    /// 登録されていなかった（既に切断済みの）数
    pub missing: usize,
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信キューを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信キューを登録解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続にイベントを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にイベントを送信
    ///
    /// 受信側ごとにブロックせず、満杯のキューへの送信は破棄する。
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &OutboundEvent,
    ) -> Result<BroadcastReport, MessagePushError>;

    /// これまでに破棄したメッセージ数
    fn dropped_messages(&self) -> u64;
}
