//! InMemory CommentStore 実装
//!
//! 外部ストアを用意できない開発環境やテスト向け。プロセスが終了すると内容は失われます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use quill_shared::time::Clock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    CommentId, CommentStore, CommentStoreError, NewComment, StoredComment, Timestamp,
};

struct CommentEntry {
    comment: StoredComment,
    content: String,
    resolved: bool,
}

/// インメモリ CommentStore 実装
pub struct InMemoryCommentStore {
    comments: Mutex<HashMap<CommentId, CommentEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCommentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            comments: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 保存されているコメント数
    pub async fn len(&self) -> usize {
        self.comments.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.comments.lock().await.is_empty()
    }

    /// コメント本文と解決状態を取得
    pub async fn content_of(&self, comment_id: &CommentId) -> Option<(String, bool)> {
        let comments = self.comments.lock().await;
        comments
            .get(comment_id)
            .map(|entry| (entry.content.clone(), entry.resolved))
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn create(&self, comment: NewComment) -> Result<StoredComment, CommentStoreError> {
        let id = CommentId::new(Uuid::new_v4().to_string())
            .map_err(|e| CommentStoreError::Unavailable(e.to_string()))?;
        let stored = StoredComment {
            id: id.clone(),
            project_id: comment.project_id,
            author_id: comment.author_id,
            created_at: Timestamp::new(self.clock.now_millis()),
        };

        let mut comments = self.comments.lock().await;
        comments.insert(
            id,
            CommentEntry {
                comment: stored.clone(),
                content: comment.content.into_string(),
                resolved: false,
            },
        );
        Ok(stored)
    }

    async fn find(&self, comment_id: &CommentId) -> Result<StoredComment, CommentStoreError> {
        let comments = self.comments.lock().await;
        comments
            .get(comment_id)
            .map(|entry| entry.comment.clone())
            .ok_or_else(|| CommentStoreError::NotFound(comment_id.to_string()))
    }

    async fn delete(&self, comment_id: &CommentId) -> Result<(), CommentStoreError> {
        let mut comments = self.comments.lock().await;
        comments
            .remove(comment_id)
            .map(|_| ())
            .ok_or_else(|| CommentStoreError::NotFound(comment_id.to_string()))
    }

    async fn resolve(&self, comment_id: &CommentId) -> Result<(), CommentStoreError> {
        let mut comments = self.comments.lock().await;
        let entry = comments
            .get_mut(comment_id)
            .ok_or_else(|| CommentStoreError::NotFound(comment_id.to_string()))?;
        entry.resolved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommentContent, ProjectId, UserId};
    use quill_shared::time::FixedClock;

    fn new_comment(content: &str) -> NewComment {
        NewComment {
            project_id: ProjectId::new("p1".to_string()).unwrap(),
            author_id: UserId::new("alice".to_string()).unwrap(),
            content: CommentContent::new(content.to_string()).unwrap(),
            position: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        // テスト項目: 保存時に ID と作成時刻が採番される
        // given (前提条件):
        let store = InMemoryCommentStore::new(Arc::new(FixedClock::new(42_000)));

        // when (操作):
        let stored = store.create(new_comment("nice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(stored.created_at, Timestamp::new(42_000));
        assert_eq!(stored.author_id.as_str(), "alice");
        assert_eq!(store.find(&stored.id).await.unwrap(), stored);
        assert_eq!(
            store.content_of(&stored.id).await,
            Some(("nice".to_string(), false))
        );
    }

    #[tokio::test]
    async fn test_resolve_then_delete() {
        // テスト項目: 解決済みにした後に削除でき、削除後は NotFound になる
        // given (前提条件):
        let store = InMemoryCommentStore::new(Arc::new(FixedClock::new(1)));
        let stored = store.create(new_comment("todo")).await.unwrap();

        // when (操作):
        store.resolve(&stored.id).await.unwrap();
        let resolved = store.content_of(&stored.id).await;
        store.delete(&stored.id).await.unwrap();

        // then (期待する結果):
        assert_eq!(resolved, Some(("todo".to_string(), true)));
        assert!(store.is_empty().await);
        assert_eq!(
            store.delete(&stored.id).await,
            Err(CommentStoreError::NotFound(stored.id.to_string()))
        );
    }
}
