//! 外部コラボレーターのインターフェース
//!
//! 認証基盤、コメントストア、権限判定はこのサービスの外側にあり、
//! ここではその境界の形だけを定義します。

use async_trait::async_trait;

use super::{CommentId, CommentStoreError, Identity, NewComment, ProjectId, StoredComment, UserId};

/// アクセストークンからユーザー情報を得る
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// トークンが無効な場合は `None`
    async fn identify(&self, token: &str) -> Option<Identity>;
}

/// コメントの永続化を担う外部ストア
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// コメントを保存し、採番された ID と作成時刻を返す
    async fn create(&self, comment: NewComment) -> Result<StoredComment, CommentStoreError>;

    /// コメントを取得（作者の確認に使う）
    async fn find(&self, comment_id: &CommentId) -> Result<StoredComment, CommentStoreError>;

    /// コメントを削除
    async fn delete(&self, comment_id: &CommentId) -> Result<(), CommentStoreError>;

    /// コメントを解決済みにする
    async fn resolve(&self, comment_id: &CommentId) -> Result<(), CommentStoreError>;
}

/// 管理者などの上位ロールの判定
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    async fn is_elevated(&self, user_id: &UserId, project_id: &ProjectId) -> bool;
}
