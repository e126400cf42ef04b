//! UseCase: コメントの削除・解決
//!
//! 操作できるのはコメントの作者と、AccessPolicy が上位ロールと判定したユーザーだけです。

use std::{future::Future, sync::Arc, time::Duration};

use quill_shared::time::Clock;

use crate::domain::{
    AccessPolicy, CommentId, CommentStore, CommentStoreError, ConnectionId, ConnectionRepository,
    MessagePusher, OutboundEvent, ProjectId, RoomRepository, Timestamp,
};

use super::{error::CommentError, fanout};

/// コメントに対する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Delete,
    Resolve,
}

/// コメント削除・解決のユースケース
pub struct ManageCommentUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    comment_store: Arc<dyn CommentStore>,
    access_policy: Arc<dyn AccessPolicy>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl ManageCommentUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        comment_store: Arc<dyn CommentStore>,
        access_policy: Arc<dyn AccessPolicy>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            connections,
            rooms,
            comment_store,
            access_policy,
            message_pusher,
            clock,
            store_timeout,
        }
    }

    /// 権限を確認してからストアに委譲し、Room 全体に結果を配信する
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
        comment_id: &CommentId,
        action: CommentAction,
    ) -> Result<(), CommentError> {
        let connection = self.connections.find(connection_id).await?;
        self.rooms.audience(project_id, connection_id).await?;

        let comment = self
            .call_store(self.comment_store.find(comment_id))
            .await?;
        if &comment.project_id != project_id {
            return Err(CommentError::NotFound(format!(
                "comment '{}' not found in project '{}'",
                comment_id, project_id
            )));
        }

        let user_id = connection.user_id();
        let is_author = &comment.author_id == user_id;
        if !is_author && !self.access_policy.is_elevated(user_id, project_id).await {
            tracing::warn!(
                "User '{}' is not allowed to {:?} comment '{}'",
                user_id,
                action,
                comment_id
            );
            return Err(CommentError::Forbidden);
        }

        match action {
            CommentAction::Delete => {
                self.call_store(self.comment_store.delete(comment_id))
                    .await?
            }
            CommentAction::Resolve => {
                self.call_store(self.comment_store.resolve(comment_id))
                    .await?
            }
        }
        tracing::info!(
            "Comment '{}' in project '{}': {:?} by '{}'",
            comment_id,
            project_id,
            action,
            user_id
        );

        let timestamp = Timestamp::new(self.clock.now_millis());
        let event = match action {
            CommentAction::Delete => OutboundEvent::CommentDeleted {
                comment_id: comment_id.clone(),
                project_id: project_id.clone(),
                timestamp,
            },
            CommentAction::Resolve => OutboundEvent::CommentResolved {
                comment_id: comment_id.clone(),
                project_id: project_id.clone(),
                timestamp,
            },
        };
        let audience = self.rooms.connections_in(project_id).await;
        fanout::broadcast(self.message_pusher.as_ref(), &audience, &event).await;
        Ok(())
    }

    async fn call_store<T>(
        &self,
        call: impl Future<Output = Result<T, CommentStoreError>>,
    ) -> Result<T, CommentError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CommentError::UpstreamUnavailable(format!(
                "comment store did not respond within {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ErrorCode, StoredComment, UserId,
            collaborator::{MockAccessPolicy, MockCommentStore},
        },
        usecase::{
            join_project::JoinProjectUseCase,
            test_support::{Harness, drain, project, types},
        },
    };

    fn comment_id() -> CommentId {
        CommentId::new("c-1".to_string()).unwrap()
    }

    fn authored_by(author: &str, project_id: &str) -> StoredComment {
        StoredComment {
            id: comment_id(),
            project_id: project(project_id),
            author_id: UserId::new(author.to_string()).unwrap(),
            created_at: Timestamp::new(1),
        }
    }

    fn usecase(
        harness: &Harness,
        store: MockCommentStore,
        policy: MockAccessPolicy,
    ) -> ManageCommentUseCase {
        ManageCommentUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            Arc::new(store),
            Arc::new(policy),
            harness.pusher.clone(),
            harness.clock.clone(),
            Duration::from_secs(1),
        )
    }

    async fn join_all(harness: &Harness, ids: &[ConnectionId]) {
        let join = JoinProjectUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            harness.pusher.clone(),
            harness.clock.clone(),
        );
        for id in ids {
            join.execute(id, &project("p1")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_author_can_delete_comment() {
        // テスト項目: 作者はコメントを削除でき、Room 全体に comment-deleted が届く
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|_| Ok(authored_by("alice", "p1")));
        store.expect_delete().times(1).returning(|_| Ok(()));
        let mut policy = MockAccessPolicy::new();
        policy.expect_is_elevated().never();

        // when (操作):
        usecase(&harness, store, policy)
            .execute(&alice.id, &project("p1"), &comment_id(), CommentAction::Delete)
            .await
            .unwrap();

        // then (期待する結果):
        for rx in [&mut alice_rx, &mut bob_rx] {
            let messages = drain(rx);
            assert_eq!(types(&messages), vec!["comment-deleted"]);
            assert_eq!(messages[0]["commentId"], "c-1");
        }
    }

    #[tokio::test]
    async fn test_non_author_without_role_is_forbidden() {
        // テスト項目: 作者でも上位ロールでもないユーザーの解決は Forbidden で、ストアも変更されない
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, _bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut alice_rx);
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|_| Ok(authored_by("alice", "p1")));
        store.expect_resolve().never();
        let mut policy = MockAccessPolicy::new();
        policy.expect_is_elevated().returning(|_, _| false);

        // when (操作):
        let result = usecase(&harness, store, policy)
            .execute(&bob.id, &project("p1"), &comment_id(), CommentAction::Resolve)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::Forbidden);
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_elevated_user_can_resolve_others_comment() {
        // テスト項目: 上位ロールのユーザーは他人のコメントを解決できる
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (admin, _admin_rx) = harness.connect("admin").await;
        join_all(&harness, &[alice.id, admin.id]).await;
        drain(&mut alice_rx);
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|_| Ok(authored_by("alice", "p1")));
        store.expect_resolve().times(1).returning(|_| Ok(()));
        let mut policy = MockAccessPolicy::new();
        policy
            .expect_is_elevated()
            .returning(|user_id, _| user_id.as_str() == "admin");

        // when (操作):
        usecase(&harness, store, policy)
            .execute(&admin.id, &project("p1"), &comment_id(), CommentAction::Resolve)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(types(&drain(&mut alice_rx)), vec!["comment-resolved"]);
    }

    #[tokio::test]
    async fn test_comment_from_other_project_is_not_found() {
        // テスト項目: 別プロジェクトのコメントは NotFound として扱う
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        join_all(&harness, &[alice.id]).await;
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|_| Ok(authored_by("alice", "p2")));
        store.expect_delete().never();
        let policy = MockAccessPolicy::new();

        // when (操作):
        let result = usecase(&harness, store, policy)
            .execute(&alice.id, &project("p1"), &comment_id(), CommentAction::Delete)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_comment_is_not_found() {
        // テスト項目: ストアに存在しないコメントは NotFound
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        join_all(&harness, &[alice.id]).await;
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|id| Err(CommentStoreError::NotFound(id.to_string())));
        let policy = MockAccessPolicy::new();

        // when (操作):
        let result = usecase(&harness, store, policy)
            .execute(&alice.id, &project("p1"), &comment_id(), CommentAction::Delete)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_store_failure_on_delete_broadcasts_nothing() {
        // テスト項目: ストアの削除が失敗した場合は UpstreamUnavailable で、comment-deleted は配信されない
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        let mut store = MockCommentStore::new();
        store
            .expect_find()
            .returning(|_| Ok(authored_by("alice", "p1")));
        store
            .expect_delete()
            .times(1)
            .returning(|_| Err(CommentStoreError::Unavailable("503".to_string())));
        let policy = MockAccessPolicy::new();

        // when (操作):
        let result = usecase(&harness, store, policy)
            .execute(&alice.id, &project("p1"), &comment_id(), CommentAction::Delete)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::UpstreamUnavailable);
        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut bob_rx).is_empty());
    }

    struct SlowResolveStore;

    #[async_trait::async_trait]
    impl CommentStore for SlowResolveStore {
        async fn create(
            &self,
            _comment: crate::domain::NewComment,
        ) -> Result<StoredComment, CommentStoreError> {
            Err(CommentStoreError::Unavailable("read-only".to_string()))
        }

        async fn find(&self, _id: &CommentId) -> Result<StoredComment, CommentStoreError> {
            Ok(authored_by("alice", "p1"))
        }

        async fn delete(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            Ok(())
        }

        async fn resolve(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_resolve_times_out_without_broadcast() {
        // テスト項目: 解決がタイムアウトした場合は UpstreamUnavailable で、comment-resolved は配信されない
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        let usecase = ManageCommentUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            Arc::new(SlowResolveStore),
            Arc::new(MockAccessPolicy::new()),
            harness.pusher.clone(),
            harness.clock.clone(),
            Duration::from_millis(100),
        );

        // when (操作):
        let result = usecase
            .execute(&alice.id, &project("p1"), &comment_id(), CommentAction::Resolve)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CommentError::UpstreamUnavailable(_))));
        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut bob_rx).is_empty());
    }
}
