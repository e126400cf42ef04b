//! トークン表による IdentityProvider 実装
//!
//! 外部の認証基盤の代わりに、`token -> ユーザー情報` の JSON を読み込んで照合します。
//!
//! ```json
//! {
//!   "token-alice": { "userId": "alice", "name": "Alice", "email": "alice@example.com" }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DisplayName, Identity, IdentityProvider, UserId, ValueObjectError};

/// トークン表の読み込みエラー
#[derive(Debug, Error)]
pub enum TokenFileError {
    #[error("failed to read token file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse token file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid entry for token '{token}': {source}")]
    InvalidEntry {
        token: String,
        #[source]
        source: ValueObjectError,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenEntry {
    user_id: String,
    name: String,
    #[serde(default)]
    email: String,
}

/// 固定のトークン表で認証する IdentityProvider
#[derive(Debug, Default)]
pub struct StaticTokenIdentityProvider {
    identities: HashMap<String, Identity>,
}

impl StaticTokenIdentityProvider {
    pub fn new(identities: HashMap<String, Identity>) -> Self {
        Self { identities }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TokenFileError> {
        let entries: HashMap<String, TokenEntry> = serde_json::from_str(json)?;
        let mut identities = HashMap::with_capacity(entries.len());
        for (token, entry) in entries {
            let identity = Self::to_identity(entry).map_err(|source| {
                TokenFileError::InvalidEntry {
                    token: token.clone(),
                    source,
                }
            })?;
            identities.insert(token, identity);
        }
        Ok(Self { identities })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenFileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn to_identity(entry: TokenEntry) -> Result<Identity, ValueObjectError> {
        Ok(Identity {
            user_id: UserId::new(entry.user_id)?,
            name: DisplayName::new(entry.name)?,
            email: entry.email,
        })
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentityProvider {
    async fn identify(&self, token: &str) -> Option<Identity> {
        if token.is_empty() {
            return None;
        }
        self.identities.get(token).cloned()
    }
}
