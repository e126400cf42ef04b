//! REST API に委譲する CommentStore 実装
//!
//! ## エンドポイント
//!
//! | 操作 | リクエスト | 成功時 |
//! |------|-----------|--------|
//! | create | `POST {base}/projects/{projectId}/comments` | 201 + コメント |
//! | find | `GET {base}/comments/{commentId}` | 200 + コメント |
//! | delete | `DELETE {base}/comments/{commentId}` | 2xx |
//! | resolve | `POST {base}/comments/{commentId}/resolve` | 2xx |
//!
//! 404 は `NotFound`、それ以外の失敗（通信エラー・タイムアウト・5xx）は `Unavailable` に変換します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CommentId, CommentPosition, CommentStore, CommentStoreError, NewComment, ProjectId,
    StoredComment, Timestamp, UserId,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentRequest<'a> {
    user_id: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<&'a CommentPosition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRecord {
    id: String,
    project_id: String,
    user_id: String,
    created_at: i64,
}

impl TryFrom<CommentRecord> for StoredComment {
    type Error = CommentStoreError;

    fn try_from(record: CommentRecord) -> Result<Self, Self::Error> {
        let malformed = |e: crate::domain::ValueObjectError| {
            CommentStoreError::Unavailable(format!("malformed comment record: {}", e))
        };
        Ok(Self {
            id: CommentId::new(record.id).map_err(malformed)?,
            project_id: ProjectId::new(record.project_id).map_err(malformed)?,
            author_id: UserId::new(record.user_id).map_err(malformed)?,
            created_at: Timestamp::new(record.created_at),
        })
    }
}

/// REST API に委譲する CommentStore 実装
pub struct HttpCommentStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCommentStore {
    /// `request_timeout` は 1 リクエストあたりの上限
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, CommentStoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CommentStoreError::Unavailable(format!("invalid base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CommentStoreError::Unavailable(format!(
                "invalid base url: {}",
                base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CommentStoreError::Unavailable(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base は new() で弾いているため Err にはならない
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn expect_success(
        response: Result<reqwest::Response, reqwest::Error>,
        comment_id: &str,
    ) -> Result<reqwest::Response, CommentStoreError> {
        let response = response.map_err(|e| CommentStoreError::Unavailable(e.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(CommentStoreError::NotFound(comment_id.to_string())),
            status => Err(CommentStoreError::Unavailable(format!(
                "comment store responded with {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl CommentStore for HttpCommentStore {
    async fn create(&self, comment: NewComment) -> Result<StoredComment, CommentStoreError> {
        let url = self.url(&["projects", comment.project_id.as_str(), "comments"]);
        let body = CreateCommentRequest {
            user_id: comment.author_id.as_str(),
            content: comment.content.as_str(),
            position: comment.position.as_ref(),
        };

        let response = self.client.post(url).json(&body).send().await;
        let response = Self::expect_success(response, "").await?;
        let record: CommentRecord = response
            .json()
            .await
            .map_err(|e| CommentStoreError::Unavailable(e.to_string()))?;
        StoredComment::try_from(record)
    }

    async fn find(&self, comment_id: &CommentId) -> Result<StoredComment, CommentStoreError> {
        let url = self.url(&["comments", comment_id.as_str()]);
        let response = self.client.get(url).send().await;
        let response = Self::expect_success(response, comment_id.as_str()).await?;
        let record: CommentRecord = response
            .json()
            .await
            .map_err(|e| CommentStoreError::Unavailable(e.to_string()))?;
        StoredComment::try_from(record)
    }

    async fn delete(&self, comment_id: &CommentId) -> Result<(), CommentStoreError> {
        let url = self.url(&["comments", comment_id.as_str()]);
        let response = self.client.delete(url).send().await;
        Self::expect_success(response, comment_id.as_str()).await?;
        Ok(())
    }

    async fn resolve(&self, comment_id: &CommentId) -> Result<(), CommentStoreError> {
        let url = self.url(&["comments", comment_id.as_str(), "resolve"]);
        let response = self.client.post(url).send().await;
        Self::expect_success(response, comment_id.as_str()).await?;
        Ok(())
    }
}
