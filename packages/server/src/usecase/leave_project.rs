//! UseCase: プロジェクト Room からの退出
//!
//! 切断処理（DisconnectClientUseCase）も Room ごとの退出にこのユースケースを使います。

use std::sync::Arc;

use quill_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, LeaveOutcome, MemberEvent, MessagePusher,
    OutboundEvent, ProjectId, RepositoryError, RoomRepository, Timestamp,
};

use super::{error::PresenceError, fanout};

/// Room 退出のユースケース
pub struct LeaveProjectUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl LeaveProjectUseCase {
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

    /// 接続を Room から外す
    ///
    /// 参加していない Room や未登録の接続に対しては何もしない（`NotJoined`）。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
    ) -> Result<LeaveOutcome, PresenceError> {
        let lease = match self.connections.acquire(connection_id).await {
            Ok(lease) => lease,
            Err(RepositoryError::ConnectionNotFound(_)) => return Ok(LeaveOutcome::NotJoined),
            Err(e) => return Err(e.into()),
        };
        let outcome = self.leave_room(lease.connection(), project_id).await?;
        drop(lease);
        Ok(outcome)
    }

    /// Room から外し、ユーザーの最後の接続だった場合は `user-left` を配信する
    ///
    /// 呼び出し側が接続単位のロックを保持していること。
    pub(crate) async fn leave_room(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
    ) -> Result<LeaveOutcome, RepositoryError> {
        let departure = self.rooms.leave(connection, project_id).await?;

        if let LeaveOutcome::UserLeft(record) = &departure.outcome {
            tracing::info!("User '{}' left project '{}'", record.user_id, project_id);
            let event = OutboundEvent::UserLeft(MemberEvent {
                user_id: record.user_id.clone(),
                user_name: record.user_name.clone(),
                project_id: project_id.clone(),
                timestamp: Timestamp::new(self.clock.now_millis()),
            });
            fanout::broadcast(self.message_pusher.as_ref(), &departure.remaining, &event).await;
        }

        Ok(departure.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionIdFactory, PresenceStatus},
        usecase::{
            join_project::JoinProjectUseCase,
            test_support::{Harness, drain, project, types},
        },
    };

    fn usecases(harness: &Harness) -> (JoinProjectUseCase, LeaveProjectUseCase) {
        (
            JoinProjectUseCase::new(
                harness.connections.clone(),
                harness.rooms.clone(),
                harness.pusher.clone(),
                harness.clock.clone(),
            ),
            LeaveProjectUseCase::new(
                harness.connections.clone(),
                harness.rooms.clone(),
                harness.pusher.clone(),
                harness.clock.clone(),
            ),
        )
    }

    #[tokio::test]
    async fn test_last_connection_leaving_broadcasts_user_left() {
        // テスト項目: ユーザーの最後の接続が抜けると、残りのメンバーに user-left が届く
        // given (前提条件):
        let harness = Harness::new();
        let (join, leave) = usecases(&harness);
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join.execute(&alice.id, &project("p1")).await.unwrap();
        join.execute(&bob.id, &project("p1")).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        let outcome = leave.execute(&alice.id, &project("p1")).await.unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, LeaveOutcome::UserLeft(ref record) if record.status == PresenceStatus::Offline));
        let bob_messages = drain(&mut bob_rx);
        assert_eq!(types(&bob_messages), vec!["user-left"]);
        assert_eq!(bob_messages[0]["userId"], "alice");
        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(harness.rooms.members(&project("p1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_tab_keeps_user_in_room() {
        // テスト項目: 同じユーザーの別の接続が残っていれば user-left は出ず、状態も変わらない
        // given (前提条件):
        let harness = Harness::new();
        let (join, leave) = usecases(&harness);
        let (tab1, _rx1) = harness.connect("alice").await;
        let (tab2, _rx2) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        for id in [tab1.id, tab2.id, bob.id] {
            join.execute(&id, &project("p1")).await.unwrap();
        }
        harness
            .rooms
            .set_status(
                tab1.user_id(),
                &project("p1"),
                PresenceStatus::Editing,
                crate::domain::Timestamp::new(1),
            )
            .await
            .unwrap();
        drain(&mut bob_rx);

        // when (操作):
        let outcome = leave.execute(&tab1.id, &project("p1")).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, LeaveOutcome::ConnectionRemoved);
        assert!(drain(&mut bob_rx).is_empty());
        let members = harness.rooms.members(&project("p1")).await.unwrap();
        let alice = members
            .iter()
            .find(|record| record.user_id.as_str() == "alice")
            .unwrap();
        assert_eq!(alice.status, PresenceStatus::Editing);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        // テスト項目: 参加していない Room・未登録の接続からの退出は何もしない
        // given (前提条件):
        let harness = Harness::new();
        let (join, leave) = usecases(&harness);
        let (alice, _alice_rx) = harness.connect("alice").await;
        join.execute(&alice.id, &project("p1")).await.unwrap();
        leave.execute(&alice.id, &project("p1")).await.unwrap();

        // when (操作):
        let again = leave.execute(&alice.id, &project("p1")).await.unwrap();
        let never_joined = leave.execute(&alice.id, &project("p2")).await.unwrap();
        let unknown = leave
            .execute(&ConnectionIdFactory::generate(), &project("p1"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(again, LeaveOutcome::NotJoined);
        assert_eq!(never_joined, LeaveOutcome::NotJoined);
        assert_eq!(unknown, LeaveOutcome::NotJoined);
        assert_eq!(harness.rooms.count_rooms().await, 0);
    }
}
