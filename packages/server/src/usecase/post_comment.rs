//! UseCase: コメント投稿
//!
//! ## テスト作業記録
//!
//! ### 何をテストしているか
//! - PostCommentUseCase::execute()
//! - 外部ストアへの保存と comment-posted の配信の順序
//!
//! ### なぜこのテストが必要か
//! - 保存に失敗したコメントが配信されてはいけない
//! - ストアの応答が遅い場合もタイムアウトで打ち切られることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：投稿者の別タブを含む Room 全体への配信
//! - 異常系：空のコメント、ストアの失敗、ストアのタイムアウト、未参加の Room

use std::{sync::Arc, time::Duration};

use crate::domain::{
    CommentContent, CommentEvent, CommentPosition, CommentStore, ConnectionId,
    ConnectionRepository, MessagePusher, NewComment, OutboundEvent, ProjectId, RoomRepository,
};

use super::{error::CommentError, fanout};

/// コメント投稿のユースケース
pub struct PostCommentUseCase {
    connections: Arc<dyn ConnectionRepository>,
    rooms: Arc<dyn RoomRepository>,
    comment_store: Arc<dyn CommentStore>,
    message_pusher: Arc<dyn MessagePusher>,
    store_timeout: Duration,
}

impl PostCommentUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        rooms: Arc<dyn RoomRepository>,
        comment_store: Arc<dyn CommentStore>,
        message_pusher: Arc<dyn MessagePusher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            connections,
            rooms,
            comment_store,
            message_pusher,
            store_timeout,
        }
    }

    /// コメントを保存し、Room の全接続に `comment-posted` を配信する
    ///
    /// ストアの呼び出しは `store_timeout` で打ち切る。失敗した場合は何も配信しない。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        project_id: &ProjectId,
        content: String,
        position: Option<CommentPosition>,
    ) -> Result<CommentEvent, CommentError> {
        let content = CommentContent::new(content)?;
        let connection = self.connections.find(connection_id).await?;
        self.rooms.audience(project_id, connection_id).await?;

        let request = NewComment {
            project_id: project_id.clone(),
            author_id: connection.identity.user_id.clone(),
            content: content.clone(),
            position: position.clone(),
        };
        let stored = tokio::time::timeout(self.store_timeout, self.comment_store.create(request))
            .await
            .map_err(|_| {
                CommentError::UpstreamUnavailable(format!(
                    "comment store did not respond within {}ms",
                    self.store_timeout.as_millis()
                ))
            })?
            .inspect_err(|e| tracing::warn!("Failed to store comment: {}", e))?;

        let comment = CommentEvent {
            id: stored.id,
            project_id: project_id.clone(),
            user_id: connection.identity.user_id,
            user_name: connection.identity.name,
            content,
            position,
            timestamp: stored.created_at,
        };
        tracing::info!(
            "Comment '{}' posted to project '{}' by '{}'",
            comment.id,
            project_id,
            comment.user_id
        );

        // 保存済みのコメントは、投稿者が既に抜けていても残っているメンバーに届ける
        let audience = self.rooms.connections_in(project_id).await;
        let event = OutboundEvent::CommentPosted(comment.clone());
        fanout::broadcast(self.message_pusher.as_ref(), &audience, &event).await;

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            CommentId, CommentStoreError, ErrorCode, StoredComment, Timestamp,
            collaborator::MockCommentStore,
        },
        usecase::{
            disconnect_client::DisconnectClientUseCase,
            join_project::JoinProjectUseCase,
            test_support::{Harness, drain, project, types},
        },
    };

    fn usecase(harness: &Harness, store: MockCommentStore, timeout: Duration) -> PostCommentUseCase {
        PostCommentUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            Arc::new(store),
            harness.pusher.clone(),
            timeout,
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

    fn stored(request: &NewComment) -> StoredComment {
        StoredComment {
            id: CommentId::new("c-42".to_string()).unwrap(),
            project_id: request.project_id.clone(),
            author_id: request.author_id.clone(),
            created_at: Timestamp::new(1_234),
        }
    }

    #[tokio::test]
    async fn test_posted_comment_reaches_whole_room() {
        // テスト項目: 保存したコメントが投稿者の別タブを含む Room 全体に配信される
        // given (前提条件):
        let harness = Harness::new();
        let (tab1, mut tab1_rx) = harness.connect("alice").await;
        let (tab2, mut tab2_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[tab1.id, tab2.id, bob.id]).await;
        for rx in [&mut tab1_rx, &mut tab2_rx, &mut bob_rx] {
            drain(rx);
        }
        let mut store = MockCommentStore::new();
        store
            .expect_create()
            .withf(|request| request.content.as_str() == "looks good")
            .times(1)
            .returning(|request| Ok(stored(&request)));
        let usecase = usecase(&harness, store, Duration::from_secs(1));

        // when (操作):
        let comment = usecase
            .execute(&tab1.id, &project("p1"), "  looks good  ".to_string(), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(comment.id.as_str(), "c-42");
        assert_eq!(comment.timestamp, Timestamp::new(1_234));
        for rx in [&mut tab1_rx, &mut tab2_rx, &mut bob_rx] {
            let messages = drain(rx);
            assert_eq!(types(&messages), vec!["comment-posted"]);
            assert_eq!(messages[0]["id"], "c-42");
            assert_eq!(messages[0]["content"], "looks good");
        }
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected_before_store() {
        // テスト項目: 空白だけのコメントはストアを呼ばずに EmptyContent
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        join_all(&harness, &[alice.id]).await;
        let mut store = MockCommentStore::new();
        store.expect_create().never();
        let usecase = usecase(&harness, store, Duration::from_secs(1));

        // when (操作):
        let result = usecase
            .execute(&alice.id, &project("p1"), " \n\t ".to_string(), None)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CommentError::EmptyContent);
    }

    #[tokio::test]
    async fn test_store_failure_broadcasts_nothing() {
        // テスト項目: ストアの失敗時は UpstreamUnavailable になり、comment-posted は 0 件
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        let mut store = MockCommentStore::new();
        store
            .expect_create()
            .returning(|_| Err(CommentStoreError::Unavailable("503".to_string())));
        let usecase = usecase(&harness, store, Duration::from_secs(1));

        // when (操作):
        let result = usecase
            .execute(&alice.id, &project("p1"), "hello".to_string(), None)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::UpstreamUnavailable);
        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut bob_rx).is_empty());
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl CommentStore for SlowStore {
        async fn create(&self, request: NewComment) -> Result<StoredComment, CommentStoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(stored(&request))
        }

        async fn find(&self, id: &CommentId) -> Result<StoredComment, CommentStoreError> {
            Err(CommentStoreError::NotFound(id.to_string()))
        }

        async fn delete(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            Ok(())
        }

        async fn resolve(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        // テスト項目: ストアがタイムアウトした場合は UpstreamUnavailable で、配信されない
        // given (前提条件):
        let harness = Harness::new();
        let (alice, mut alice_rx) = harness.connect("alice").await;
        join_all(&harness, &[alice.id]).await;
        drain(&mut alice_rx);
        let usecase = PostCommentUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            Arc::new(SlowStore),
            harness.pusher.clone(),
            Duration::from_millis(100),
        );

        // when (操作):
        let result = usecase
            .execute(&alice.id, &project("p1"), "hello".to_string(), None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CommentError::UpstreamUnavailable(_))));
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_comment_from_non_member_is_not_found() {
        // テスト項目: 参加していない Room へのコメントはストアを呼ばずに NotFound
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        let mut store = MockCommentStore::new();
        store.expect_create().never();
        let usecase = usecase(&harness, store, Duration::from_secs(1));

        // when (操作):
        let result = usecase
            .execute(&alice.id, &project("p1"), "hello".to_string(), None)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().code(), ErrorCode::NotFound);
    }

    /// 保存の開始を知らせ、解放されるまで応答を返さないストア
    struct GatedStore {
        entered: Arc<tokio::sync::Notify>,
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl CommentStore for GatedStore {
        async fn create(&self, request: NewComment) -> Result<StoredComment, CommentStoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(stored(&request))
        }

        async fn find(&self, id: &CommentId) -> Result<StoredComment, CommentStoreError> {
            Err(CommentStoreError::NotFound(id.to_string()))
        }

        async fn delete(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            Ok(())
        }

        async fn resolve(&self, _id: &CommentId) -> Result<(), CommentStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stored_comment_reaches_room_after_author_disconnects() {
        // テスト項目: 保存中に投稿者が切断されても、保存済みのコメントは残りのメンバーに届く
        // given (前提条件):
        let harness = Harness::new();
        let (alice, _alice_rx) = harness.connect("alice").await;
        let (bob, mut bob_rx) = harness.connect("bob").await;
        join_all(&harness, &[alice.id, bob.id]).await;
        drain(&mut bob_rx);
        let entered = Arc::new(tokio::sync::Notify::new());
        let release = Arc::new(tokio::sync::Notify::new());
        let usecase = PostCommentUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            Arc::new(GatedStore {
                entered: entered.clone(),
                release: release.clone(),
            }),
            harness.pusher.clone(),
            Duration::from_secs(5),
        );
        let disconnect = DisconnectClientUseCase::new(
            harness.connections.clone(),
            harness.rooms.clone(),
            harness.pusher.clone(),
            harness.clock.clone(),
        );

        // when (操作): 保存待ちの間に投稿者の接続を切断処理する
        let p1 = project("p1");
        let post = usecase.execute(&alice.id, &p1, "ship it".to_string(), None);
        let reap = async {
            entered.notified().await;
            disconnect.execute(&alice.id).await;
            release.notify_one();
        };
        let (result, ()) = tokio::join!(post, reap);

        // then (期待する結果):
        assert_eq!(result.unwrap().id.as_str(), "c-42");
        let messages = drain(&mut bob_rx);
        assert_eq!(types(&messages), vec!["user-left", "comment-posted"]);
        assert_eq!(messages[1]["content"], "ship it");
    }
}
