//! UseCase: 接続（ハンドシェイク）
//!
//! アクセストークンからユーザーを特定し、接続を Connection Registry と
//! MessagePusher に登録します。登録時のブロードキャストはありません。

use std::sync::Arc;

use quill_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionIdFactory, ConnectionRepository, IdentityProvider, MessagePusher,
    OutboundEvent, PusherChannel, Timestamp,
};

use super::error::ConnectError;

/// 接続のユースケース
pub struct ConnectClientUseCase {
    identity_provider: Arc<dyn IdentityProvider>,
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectClientUseCase {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity_provider,
            connections,
            message_pusher,
            clock,
        }
    }

    /// トークンを検証して接続を登録する
    ///
    /// 登録に成功すると、最初のメッセージとして `connected` を送信キューに積む。
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 登録した接続
    /// * `Err(ConnectError::AuthRequired)` - トークンが無い、または無効
    pub async fn execute(
        &self,
        token: Option<&str>,
        sender: PusherChannel,
    ) -> Result<Connection, ConnectError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ConnectError::AuthRequired)?;
        let identity = self
            .identity_provider
            .identify(token)
            .await
            .ok_or(ConnectError::AuthRequired)?;

        let connection = Connection::new(
            ConnectionIdFactory::generate(),
            identity,
            Timestamp::new(self.clock.now_millis()),
        );
        self.connections.register(connection.clone()).await?;
        self.message_pusher
            .register_client(connection.id, sender)
            .await;

        let connected = OutboundEvent::Connected {
            connection_id: connection.id,
            user_id: connection.identity.user_id.clone(),
            user_name: connection.identity.name.clone(),
        };
        if let Err(e) = self.message_pusher.push_to(&connection.id, &connected).await {
            tracing::warn!("Failed to send connected to '{}': {}", connection.id, e);
        }

        tracing::info!(
            "Connection '{}' established for user '{}'",
            connection.id,
            connection.user_id()
        );
        Ok(connection)
    }
}
