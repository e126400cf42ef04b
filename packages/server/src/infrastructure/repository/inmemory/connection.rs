//! InMemory Connection Repository 実装
//!
//! 接続 ID → (接続情報, 接続単位のロック) のマップを保持します。
//! マップ自体のロックは参照の取得・挿入・削除の間だけ保持し、
//! 接続単位の処理は `ConnectionLease` で直列化します。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, ConnectionLease, ConnectionLifecycle, ConnectionRepository,
    RepositoryError, UserId,
};

struct ConnectionSlot {
    connection: Connection,
    lifecycle: Arc<Mutex<ConnectionLifecycle>>,
}

/// インメモリ Connection Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    slots: Mutex<HashMap<ConnectionId, ConnectionSlot>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, connection: Connection) -> Result<(), RepositoryError> {
        let mut slots = self.slots.lock().await;
        if slots.contains_key(&connection.id) {
            return Err(RepositoryError::DuplicateConnection(
                connection.id.to_string(),
            ));
        }
        slots.insert(
            connection.id,
            ConnectionSlot {
                connection,
                lifecycle: Arc::new(Mutex::new(ConnectionLifecycle::Open)),
            },
        );
        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let mut slots = self.slots.lock().await;
        slots.remove(connection_id).map(|slot| slot.connection)
    }

    async fn find(&self, connection_id: &ConnectionId) -> Result<Connection, RepositoryError> {
        let slots = self.slots.lock().await;
        slots
            .get(connection_id)
            .map(|slot| slot.connection.clone())
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))
    }

    async fn acquire(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ConnectionLease, RepositoryError> {
        let (connection, lifecycle) = {
            let slots = self.slots.lock().await;
            let slot = slots
                .get(connection_id)
                .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
            (slot.connection.clone(), slot.lifecycle.clone())
        };
        let state = lifecycle.lock_owned().await;
        Ok(ConnectionLease::new(connection, state))
    }

    async fn connections_of_user(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let slots = self.slots.lock().await;
        slots
            .values()
            .filter(|slot| slot.connection.user_id() == user_id)
            .map(|slot| slot.connection.id)
            .collect()
    }

    async fn all_connection_ids(&self) -> Vec<ConnectionId> {
        let slots = self.slots.lock().await;
        slots.keys().copied().collect()
    }

    async fn count_connections(&self) -> usize {
        self.slots.lock().await.len()
    }

    async fn count_users(&self) -> usize {
        let slots = self.slots.lock().await;
        slots
            .values()
            .map(|slot| slot.connection.user_id())
            .collect::<HashSet<_>>()
            .len()
    }
}
