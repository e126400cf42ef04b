//! UseCase: プレゼンス状態の更新
//!
//! ## テスト作業記録
//!
//! ### 何をテストしているか
//! - UpdateStatusUseCase::execute()
//! - status-changed の配信先（状態を変えたユーザー以外のメンバー）
//!
//! ### どのような状況を想定しているか
//! - 正常系：プロジェクト指定の更新、全 Room への更新
//! - 異常系：未知の状態値（状態も変えず、配信もしない）、未参加の Room
//! - エッジケース：offline への更新で Room から外れる

use std::{collections::BTreeSet, sync::Arc};

use quill_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, OutboundEvent, PresenceRecord,
    PresenceStatus, ProjectId, RoomRepository, StatusUpdateEvent, Timestamp, UserId,
};

use super::{error::PresenceError, fanout};

/// プレゼンス状態更新のユースケース
pub struct UpdateStatusUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl UpdateStatusUseCase {
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

    /// 状態を更新し、他のメンバーに `status-changed` を配信する
    ///
    /// `project_id` が `None` の場合は、ユーザーのいずれかの接続が参加している
    /// 全 Room に適用する。この場合、複数の Room を共有する相手にも配信は 1 回だけ。
    ///
    /// # Returns
    ///
    /// 更新後のプレゼンス（offline の場合は Room から外れた時点のもの）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        status: &str,
        project_id: Option<&ProjectId>,
    ) -> Result<Vec<PresenceRecord>, PresenceError> {
        let status: PresenceStatus = status
            .parse()
            .map_err(|_| PresenceError::InvalidStatus(status.to_string()))?;

        let lease = self.connections.acquire(connection_id).await?;
        if !lease.is_open() {
            return Err(PresenceError::ConnectionClosed(connection_id.to_string()));
        }
        let user_id = lease.connection().user_id().clone();
        let now = Timestamp::new(self.clock.now_millis());

        let Some(project_id) = project_id else {
            let records = self.update_everywhere(&user_id, status, now).await;
            drop(lease);
            return Ok(records);
        };

        let broadcast = self
            .rooms
            .set_status(&user_id, project_id, status, now)
            .await?;
        tracing::info!(
            "User '{}' is now {} in project '{}'",
            user_id,
            status,
            project_id
        );
        let event = OutboundEvent::StatusChanged(StatusUpdateEvent {
            user_id,
            status,
            project_id: Some(project_id.clone()),
            timestamp: now,
        });
        fanout::broadcast(self.message_pusher.as_ref(), &broadcast.audience, &event).await;

        drop(lease);
        Ok(vec![broadcast.change.record])
    }

    async fn update_everywhere(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        now: Timestamp,
    ) -> Vec<PresenceRecord> {
        let mut projects = BTreeSet::new();
        for connection_id in self.connections.connections_of_user(user_id).await {
            projects.extend(self.rooms.rooms_of(&connection_id).await);
        }

        let mut records = Vec::with_capacity(projects.len());
        let mut audience = BTreeSet::new();
        for project_id in &projects {
            match self.rooms.set_status(user_id, project_id, status, now).await {
                Ok(broadcast) => {
                    audience.extend(broadcast.audience);
                    records.push(broadcast.change.record);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping status update for '{}' in project '{}': {}",
                        user_id,
                        project_id,
                        e
                    );
                }
            }
        }

        if !records.is_empty() {
            tracing::info!(
                "User '{}' is now {} in {} project(s)",
                user_id,
                status,
                records.len()
            );
            let event = OutboundEvent::StatusChanged(StatusUpdateEvent {
                user_id: user_id.clone(),
                status,
                project_id: None,
                timestamp: now,
            });
            let audience: Vec<ConnectionId> = audience.into_iter().collect();
            fanout::broadcast(self.message_pusher.as_ref(), &audience, &event).await;
        }
        records
    }
}
