//! UseCase: 切断処理（Disconnect Reaper）
//!
//! ## テスト作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::execute()
//! - 切断した接続が参加していた全 Room からの退出と、接続の登録解除
//!
//! ### なぜこのテストが必要か
//! - user-left は「そのユーザーの最後の接続」が抜けた Room でだけ、1 回だけ送られる
//! - 同じ接続の join と並行して実行されても、閉じた接続が Room に残ってはいけない
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数 Room に参加している接続の切断
//! - エッジケース：別タブが残っている Room、二重の切断処理
//! - 並行処理：join と切断の競合

use std::{sync::Arc, time::Duration};

use quill_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, LeaveOutcome, MessagePusher, ProjectId,
    RoomRepository,
};

use super::leave_project::LeaveProjectUseCase;

/// Room 退出の最大試行回数
const CLEANUP_ATTEMPTS: u32 = 3;
/// 再試行までの待ち時間
const CLEANUP_BACKOFF: Duration = Duration::from_millis(50);

/// 切断処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectReport {
    /// 接続が抜けた Room
    pub rooms_left: Vec<ProjectId>,
    /// ユーザーがメンバーから外れた（user-left を送った）Room
    pub user_left_in: Vec<ProjectId>,
    /// 再試行しても退出できなかった Room
    pub failed: Vec<ProjectId>,
}

/// 切断処理のユースケース
pub struct DisconnectClientUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    leave: LeaveProjectUseCase,
}

impl DisconnectClientUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let leave = LeaveProjectUseCase::new(
            connections.clone(),
            rooms.clone(),
            message_pusher.clone(),
            clock,
        );
        Self {
            connections,
            rooms,
            message_pusher,
            leave,
        }
    }

    /// 接続を閉じ、参加していた全 Room から退出させてから登録解除する
    ///
    /// 既に切断処理済みの接続に対しては何もせず `None` を返す。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<DisconnectReport> {
        let Ok(mut lease) = self.connections.acquire(connection_id).await else {
            self.message_pusher.unregister_client(connection_id).await;
            return None;
        };
        if !lease.is_open() {
            return None;
        }
        lease.close();
        let connection = lease.connection().clone();

        let mut report = DisconnectReport::default();
        for project_id in self.rooms.rooms_of(connection_id).await {
            match self.leave_with_retry(&connection, &project_id).await {
                Some(outcome) => {
                    if matches!(outcome, LeaveOutcome::UserLeft(_)) {
                        report.user_left_in.push(project_id.clone());
                    }
                    report.rooms_left.push(project_id);
                }
                None => report.failed.push(project_id),
            }
        }

        self.connections.unregister(connection_id).await;
        self.message_pusher.unregister_client(connection_id).await;
        drop(lease);

        tracing::info!(
            "Connection '{}' of user '{}' reaped (left {} room(s))",
            connection_id,
            connection.user_id(),
            report.rooms_left.len()
        );
        Some(report)
    }

    async fn leave_with_retry(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
    ) -> Option<LeaveOutcome> {
        for attempt in 1..=CLEANUP_ATTEMPTS {
            match self.leave.leave_room(connection, project_id).await {
                Ok(outcome) => return Some(outcome),
                Err(e) => {
                    tracing::warn!(
                        "Cleanup of connection '{}' in project '{}' failed (attempt {}/{}): {}",
                        connection.id,
                        project_id,
                        attempt,
                        CLEANUP_ATTEMPTS,
                        e
                    );
                    if attempt < CLEANUP_ATTEMPTS {
                        tokio::time::sleep(CLEANUP_BACKOFF).await;
                    }
                }
            }
        }
        tracing::error!(
            "Giving up cleanup of connection '{}' in project '{}'",
            connection.id,
            project_id
        );
        None
    }
}
