//! UseCase: ハートビート
//!
//! プレゼンスの last_seen を更新します。配信は行いません。

use std::{collections::BTreeSet, sync::Arc};

use quill_shared::time::Clock;

use crate::domain::{ConnectionId, ConnectionRepository, ProjectId, RoomRepository, Timestamp};

use super::error::PresenceError;

/// ハートビートのユースケース
pub struct HeartbeatUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl HeartbeatUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            rooms,
            clock,
        }
    }

    /// last_seen を更新し、更新したプレゼンスの数を返す
    ///
    /// `project_id` が `None` の場合は、ユーザーのいずれかの接続が参加している全 Room が対象。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: Option<&ProjectId>,
    ) -> Result<usize, PresenceError> {
        let connection = self.connections.find(connection_id).await?;
        let user_id = connection.user_id();
        let now = Timestamp::new(self.clock.now_millis());

        let projects: BTreeSet<ProjectId> = match project_id {
            Some(project_id) => BTreeSet::from([project_id.clone()]),
            None => {
                let mut projects = BTreeSet::new();
                for id in self.connections.connections_of_user(user_id).await {
                    projects.extend(self.rooms.rooms_of(&id).await);
                }
                projects
            }
        };

        let mut touched = 0;
        for project_id in &projects {
            if self.rooms.touch(user_id, project_id, now).await {
                touched += 1;
            }
        }
        tracing::debug!("Heartbeat from '{}' refreshed {} record(s)", user_id, touched);
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::{
        join_project::JoinProjectUseCase,
        test_support::{Harness, NOW, drain, project},
    };
    use quill_shared::time::FixedClock;

    #[tokio::test]
    async fn test_heartbeat_refreshes_last_seen_silently() {
        // テスト項目: ハートビートで全 Room の last_seen が更新され、何も配信されない
        // given (前提条件): 参加時刻は NOW、ハートビートは NOW + 10 秒
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        let join = JoinProjectUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            harness.pusher.clone(),
            harness.clock.clone(),
        );
        for p in ["p1", "p2"] {
            join.execute(&alice.id, &project(p)).await.unwrap();
            join.execute(&bob.id, &project(p)).await.unwrap();
        }
        drain(&mut bob_rx);
        let later = Arc::new(FixedClock::new(NOW + 10_000));
        let usecase =
            HeartbeatUseCase::new(harness.connections.clone(), harness.rooms.clone(), later);

        // when (操作):
        let touched = usecase.execute(&alice.id, None).await.unwrap();

        // then (期待する結果):
        assert_eq!(touched, 2);
        for p in ["p1", "p2"] {
            let members = harness.rooms.members(&project(p)).await.unwrap();
            let alice = members.iter().find(|r| r.user_id.as_str() == "alice").unwrap();
            assert_eq!(alice.last_seen, Timestamp::new(NOW + 10_000));
        }
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_for_unjoined_project_touches_nothing() {
        // テスト項目: 参加していない Room 指定のハートビートは何も更新しない
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        let usecase = HeartbeatUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            harness.clock.clone(),
        );

        // when (操作):
        let touched = usecase.execute(&alice.id, Some(&project("p1"))).await.unwrap();

        // then (期待する結果):
        assert_eq!(touched, 0);
    }
}
