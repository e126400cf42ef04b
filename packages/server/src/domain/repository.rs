//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::{
    Connection, ConnectionId, JoinOutcome, LeaveOutcome, PresenceRecord, PresenceStatus,
    ProjectId, RepositoryError, StatusChange, Timestamp, UserId,
};

/// 接続のライフサイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionLifecycle {
    #[default]
    Open,
    Closed,
}

/// 接続単位の排他ロック
///
/// 同じ接続に対する join と切断処理はこのロックで直列化される。
/// 切断処理が `close()` した後に取得したリースは `is_open() == false` になるため、
/// 閉じた接続が Room に復活することはない。
pub struct ConnectionLease {
    connection: Connection,
    state: OwnedMutexGuard<ConnectionLifecycle>,
}

impl ConnectionLease {
    pub fn new(connection: Connection, state: OwnedMutexGuard<ConnectionLifecycle>) -> Self {
        Self { connection, state }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn is_open(&self) -> bool {
        *self.state == ConnectionLifecycle::Open
    }

    pub fn close(&mut self) {
        *self.state = ConnectionLifecycle::Closed;
    }
}

/// Connection Registry
///
/// 生きている接続と、その接続に紐付いたユーザー情報を管理する。
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続を登録
    async fn register(&self, connection: Connection) -> Result<(), RepositoryError>;

    /// 接続を登録解除（冪等。既に存在しない場合は `None`）
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 接続を取得
    async fn find(&self, connection_id: &ConnectionId) -> Result<Connection, RepositoryError>;

    /// 接続単位のロックを取得
    async fn acquire(&self, connection_id: &ConnectionId)
    -> Result<ConnectionLease, RepositoryError>;

    /// 指定ユーザーの全接続
    async fn connections_of_user(&self, user_id: &UserId) -> Vec<ConnectionId>;

    /// 登録されている全接続
    async fn all_connection_ids(&self) -> Vec<ConnectionId>;

    /// 接続数
    async fn count_connections(&self) -> usize;

    /// 接続中のユーザー数（複数タブは 1 人として数える）
    async fn count_users(&self) -> usize;
}

/// join の結果と配信先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub outcome: JoinOutcome,
    pub record: PresenceRecord,
    /// 参加したユーザー以外のメンバーの接続
    pub others: Vec<ConnectionId>,
    /// 参加直後の Room のプレゼンス一覧
    pub members: Vec<PresenceRecord>,
}

/// leave の結果と配信先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub outcome: LeaveOutcome,
    /// Room に残っている、他のユーザーの接続
    pub remaining: Vec<ConnectionId>,
}

/// set_status の結果と配信先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBroadcast {
    pub change: StatusChange,
    /// 状態を変えたユーザー以外のメンバーの接続
    pub audience: Vec<ConnectionId>,
}

/// Room Manager + Presence Store
///
/// Room ごとの排他制御の中で、メンバー集合・プレゼンス・接続→Room の逆引きを
/// まとめて更新する。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 接続を Room に参加させる（Room が無ければ作成）
    async fn join(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
        now: Timestamp,
    ) -> Result<Membership, RepositoryError>;

    /// 接続を Room から外す（空になった Room は破棄）
    async fn leave(
        &self,
        connection: &Connection,
        project_id: &ProjectId,
    ) -> Result<Departure, RepositoryError>;

    /// プレゼンス状態を更新
    async fn set_status(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        status: PresenceStatus,
        now: Timestamp,
    ) -> Result<StatusBroadcast, RepositoryError>;

    /// last_seen を更新（ブロードキャストなし）
    async fn touch(&self, user_id: &UserId, project_id: &ProjectId, now: Timestamp) -> bool;

    /// Room 内の全接続（指定接続が参加していない場合はエラー）
    async fn audience(
        &self,
        project_id: &ProjectId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, RepositoryError>;

    /// Room 内の全接続（参加の確認なし。Room が無ければ空）
    async fn connections_in(&self, project_id: &ProjectId) -> Vec<ConnectionId>;

    /// 接続が参加している Room
    async fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<ProjectId>;

    /// Room のプレゼンス一覧
    async fn members(&self, project_id: &ProjectId)
    -> Result<Vec<PresenceRecord>, RepositoryError>;

    /// 存在する Room の数
    async fn count_rooms(&self) -> usize;
}
