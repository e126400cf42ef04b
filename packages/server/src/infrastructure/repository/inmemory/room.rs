//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//!
//! ## ロックの構成
//!
//! - `rooms`: ProjectId → Room ハンドルのマップ。ハンドルの取得・挿入・削除の間だけ保持する
//! - Room ハンドル: Room ごとの Mutex。メンバー集合とプレゼンスの更新はこの中で行う
//! - `connection_rooms`: 接続 → 参加 Room の逆引き。Room のロックを保持したまま短時間だけ取得する
//!
//! ロック順序は「Room → `rooms`」「Room → `connection_rooms`」のみ。
//! `rooms` を保持したまま Room のロックを待つ経路は存在しない。
//!
//! 空になった Room は `retired` を立ててからマップから外す。
//! 外す直前にハンドルを取得していた join は `retired` を見てやり直す。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, Departure, JoinOutcome, LeaveOutcome, Membership, PresenceRecord,
    PresenceStatus, ProjectId, ProjectRoom, RepositoryError, RoomError, RoomRepository,
    StatusBroadcast, Timestamp, UserId,
};

struct RoomSlot {
    room: ProjectRoom,
    retired: bool,
}

type RoomHandle = Arc<Mutex<RoomSlot>>;

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<ProjectId, RoomHandle>>,
    connection_rooms: Mutex<HashMap<ConnectionId, HashSet<ProjectId>>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self, project_id: &ProjectId) -> Option<RoomHandle> {
        self.rooms.lock().await.get(project_id).cloned()
    }

    async fn handle_or_create(&self, project_id: &ProjectId, now: Timestamp) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(project_id.clone())
            .or_insert_with(|| {
                tracing::debug!("Project room '{}' created", project_id);
                Arc::new(Mutex::new(RoomSlot {
                    room: ProjectRoom::new(project_id.clone(), now),
                    retired: false,
                }))
            })
            .clone()
    }

    /// Room が空ならマップから外す（呼び出し側が Room のロックを保持していること）
    async fn retire_if_empty(&self, slot: &mut RoomSlot, handle: &RoomHandle) {
        if !slot.room.is_empty() {
            return;
        }
        slot.retired = true;
        let mut rooms = self.rooms.lock().await;
        if rooms
            .get(&slot.room.id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            rooms.remove(&slot.room.id);
            tracing::debug!("Project room '{}' is empty and was removed", slot.room.id);
        }
    }

    async fn index_add(&self, connection_id: ConnectionId, project_id: &ProjectId) {
        let mut index = self.connection_rooms.lock().await;
        index
            .entry(connection_id)
            .or_default()
            .insert(project_id.clone());
    }

    async fn index_remove(&self, connection_id: &ConnectionId, project_id: &ProjectId) {
        let mut index = self.connection_rooms.lock().await;
        if let Some(projects) = index.get_mut(connection_id) {
            projects.remove(project_id);
            if projects.is_empty() {
                index.remove(connection_id);
            }
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn join(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
        now: Timestamp,
    ) -> Result<Membership, RepositoryError> {
        loop {
            let handle = self.handle_or_create(project_id, now).await;
            let mut slot = handle.lock().await;
            if slot.retired {
                continue;
            }

            let outcome = slot.room.join(connection, now);
            let record = slot
                .room
                .presence(connection.user_id())
                .cloned()
                .ok_or_else(|| RoomError::NotAMember(connection.user_id().to_string()))?;
            let others = slot.room.connections_excluding_user(connection.user_id());
            let members = slot.room.presence_list();
            if outcome != JoinOutcome::AlreadyJoined {
                self.index_add(connection.id, project_id).await;
            }

            return Ok(Membership {
                outcome,
                record,
                others,
                members,
            });
        }
    }

    async fn leave(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
    ) -> Result<Departure, RepositoryError> {
        let not_joined = Departure {
            outcome: LeaveOutcome::NotJoined,
            remaining: Vec::new(),
        };

        let Some(handle) = self.handle(project_id).await else {
            self.index_remove(&connection.id, project_id).await;
            return Ok(not_joined);
        };
        let mut slot = handle.lock().await;
        if slot.retired {
            self.index_remove(&connection.id, project_id).await;
            return Ok(not_joined);
        }

        let outcome = slot.room.leave(&connection.id, connection.user_id());
        self.index_remove(&connection.id, project_id).await;
        let remaining = slot.room.connections_excluding_user(connection.user_id());
        self.retire_if_empty(&mut slot, &handle).await;

        Ok(Departure { outcome, remaining })
    }

    async fn set_status(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        status: PresenceStatus,
        now: Timestamp,
    ) -> Result<StatusBroadcast, RepositoryError> {
        let handle = self
            .handle(project_id)
            .await
            .ok_or_else(|| RepositoryError::RoomNotFound(project_id.to_string()))?;
        let mut slot = handle.lock().await;
        if slot.retired {
            return Err(RepositoryError::RoomNotFound(project_id.to_string()));
        }

        let change = slot.room.set_status(user_id, status, now)?;
        for connection_id in &change.retired_connections {
            self.index_remove(connection_id, project_id).await;
        }
        let audience = slot.room.connections_excluding_user(user_id);
        self.retire_if_empty(&mut slot, &handle).await;

        Ok(StatusBroadcast { change, audience })
    }

    async fn touch(&self, user_id: &UserId, project_id: &ProjectId, now: Timestamp) -> bool {
        let Some(handle) = self.handle(project_id).await else {
            return false;
        };
        let mut slot = handle.lock().await;
        !slot.retired && slot.room.touch(user_id, now)
    }

    async fn audience(
        &self,
        project_id: &ProjectId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, RepositoryError> {
        let handle = self
            .handle(project_id)
            .await
            .ok_or_else(|| RepositoryError::RoomNotFound(project_id.to_string()))?;
        let slot = handle.lock().await;
        if slot.retired {
            return Err(RepositoryError::RoomNotFound(project_id.to_string()));
        }
        if !slot.room.has_connection(connection_id) {
            return Err(RoomError::NotAMember(connection_id.to_string()).into());
        }
        Ok(slot.room.connection_ids())
    }

    async fn connections_in(&self, project_id: &ProjectId) -> Vec<ConnectionId> {
        let Some(handle) = self.handle(project_id).await else {
            return Vec::new();
        };
        let slot = handle.lock().await;
        if slot.retired {
            return Vec::new();
        }
        slot.room.connection_ids()
    }

    async fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<ProjectId> {
        let index = self.connection_rooms.lock().await;
        let mut projects: Vec<ProjectId> = index
            .get(connection_id)
            .map(|projects| projects.iter().cloned().collect())
            .unwrap_or_default();
        projects.sort();
        projects
    }

    async fn members(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<PresenceRecord>, RepositoryError> {
        let handle = self
            .handle(project_id)
            .await
            .ok_or_else(|| RepositoryError::RoomNotFound(project_id.to_string()))?;
        let slot = handle.lock().await;
        if slot.retired {
            return Err(RepositoryError::RoomNotFound(project_id.to_string()));
        }
        Ok(slot.room.presence_list())
    }

    async fn count_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
