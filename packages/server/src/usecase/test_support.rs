//! UseCase テスト用の共通フィクスチャ

use std::sync::Arc;

use quill_shared::time::FixedClock;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        Connection, ConnectionIdFactory, ConnectionRepository, DisplayName, Identity,
        MessagePusher, ProjectId, Timestamp, UserId,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    },
};

pub const NOW: i64 = 1_700_000_000_000;

pub struct Harness {
    pub connections: Arc<InMemoryConnectionRepository>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(InMemoryConnectionRepository::new()),
            rooms: Arc::new(InMemoryRoomRepository::new()),
            pusher: Arc::new(WebSocketMessagePusher::new()),
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }

    /// 接続を登録し、送信キューの受信側を返す
    pub async fn connect(&self, user: &str) -> (Connection, mpsc::Receiver<String>) {
        let connection = Connection::new(
            ConnectionIdFactory::generate(),
            identity(user),
            Timestamp::new(NOW),
        );
        let (tx, rx) = mpsc::channel(32);
        self.connections.register(connection.clone()).await.unwrap();
        self.pusher.register_client(connection.id, tx).await;
        (connection, rx)
    }
}

pub fn identity(user: &str) -> Identity {
    let mut name = user.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Identity {
        user_id: UserId::new(user.to_string()).unwrap(),
        name: DisplayName::new(name).unwrap(),
        email: format!("{}@example.com", user),
    }
}

pub fn project(id: &str) -> ProjectId {
    ProjectId::new(id.to_string()).unwrap()
}

/// キューに溜まっているメッセージをすべて取り出す
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        messages.push(serde_json::from_str(&payload).unwrap());
    }
    messages
}

/// 取り出したメッセージの type 一覧
pub fn types(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .map(|message| message["type"].as_str().unwrap_or_default().to_string())
        .collect()
}
