//! 管理者リストによる AccessPolicy 実装

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{AccessPolicy, ProjectId, UserId};

/// 設定で渡された管理者ユーザーを全プロジェクトで上位ロールとみなす
#[derive(Debug, Default, Clone)]
pub struct StaticAccessPolicy {
    admins: HashSet<UserId>,
}

impl StaticAccessPolicy {
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// 誰も上位ロールを持たないポリシー（作者のみがコメントを操作できる）
    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessPolicy for StaticAccessPolicy {
    async fn is_elevated(&self, user_id: &UserId, _project_id: &ProjectId) -> bool {
        self.admins.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_admin_is_elevated_in_every_project() {
        // テスト項目: 管理者はどのプロジェクトでも上位ロールを持つ
        // given (前提条件):
        let policy = StaticAccessPolicy::new([user("root")]);
        let p1 = ProjectId::new("p1".to_string()).unwrap();
        let p2 = ProjectId::new("p2".to_string()).unwrap();

        // when (操作) / then (期待する結果):
        assert!(policy.is_elevated(&user("root"), &p1).await);
        assert!(policy.is_elevated(&user("root"), &p2).await);
        assert!(!policy.is_elevated(&user("alice"), &p1).await);
    }

    #[tokio::test]
    async fn test_none_policy_elevates_nobody() {
        // テスト項目: none() のポリシーでは誰も上位ロールを持たない
        // given (前提条件):
        let policy = StaticAccessPolicy::none();
        let p1 = ProjectId::new("p1".to_string()).unwrap();

        // when (操作) / then (期待する結果):
        assert!(!policy.is_elevated(&user("root"), &p1).await);
    }
}
