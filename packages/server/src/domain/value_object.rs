//! Value Object 定義
//!
//! 識別子やコメント本文など、検証済みの値を表す型をまとめています。
//! 生成時に検証を通るため、ドメイン層では常に妥当な値として扱えます。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValueObjectError;

/// 識別子として受け付ける最大文字数
pub const MAX_ID_LENGTH: usize = 128;

/// 表示名として受け付ける最大文字数
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// コメント本文として受け付ける最大文字数
pub const MAX_COMMENT_LENGTH: usize = 10_000;

fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(ValueObjectError::TooLong { field, max });
    }
    Ok(())
}

macro_rules! text_value_object {
    ($(#[$meta:meta])* $name:ident, $field:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                validate_text($field, &value, $max)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

text_value_object!(
    /// ユーザー ID（認証基盤が発行したもの）
    UserId,
    "user_id",
    MAX_ID_LENGTH
);

text_value_object!(
    /// プロジェクト ID（Room の識別子を兼ねる）
    ProjectId,
    "project_id",
    MAX_ID_LENGTH
);

text_value_object!(
    /// コメント ID（コメントストアが採番したもの）
    CommentId,
    "comment_id",
    MAX_ID_LENGTH
);

text_value_object!(
    /// 表示名
    DisplayName,
    "display_name",
    MAX_DISPLAY_NAME_LENGTH
);

/// 接続 ID
///
/// 接続ごとにサーバー側で採番される不透明な識別子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ConnectionId の生成を担うファクトリ
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// UUID v4 で新しい ConnectionId を生成
    pub fn generate() -> ConnectionId {
        ConnectionId(Uuid::new_v4())
    }
}

/// コメント本文
///
/// 前後の空白を取り除いた上で保持する。空白のみの場合は `EmptyContent`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContent(String);

impl CommentContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyContent);
        }
        if trimmed.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ValueObjectError::TooLong {
                field: "content",
                max: MAX_COMMENT_LENGTH,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for CommentContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// プレゼンス状態
///
/// ```text
/// online ──▶ viewing ⇄ editing
///   │   └──▶ analyzing
///   └──────▶ offline   (切断時はどの状態からでも)
/// ```
///
/// `offline` から抜ける遷移は存在せず、再度 join した時点で `online` から始まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Analyzing,
    Viewing,
    Editing,
    Offline,
}

impl PresenceStatus {
    pub const ALL: [PresenceStatus; 5] = [
        PresenceStatus::Online,
        PresenceStatus::Analyzing,
        PresenceStatus::Viewing,
        PresenceStatus::Editing,
        PresenceStatus::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Analyzing => "analyzing",
            PresenceStatus::Viewing => "viewing",
            PresenceStatus::Editing => "editing",
            PresenceStatus::Offline => "offline",
        }
    }

    /// `self` から `next` への遷移が許されるか
    ///
    /// 稼働中の状態同士は最後に報告された状態を採用するため自由に遷移できる。
    pub fn can_transition_to(&self, next: PresenceStatus) -> bool {
        !matches!(self, PresenceStatus::Offline)
            || matches!(next, PresenceStatus::Offline)
    }
}

impl FromStr for PresenceStatus {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValueObjectError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
