//! CommentStore の実装
//!
//! - `http`: 外部の REST API に委譲する実装（本番用）
//! - `inmemory`: プロセス内に保持する実装（開発・テスト用）

pub mod http;
pub mod inmemory;

pub use http::HttpCommentStore;
pub use inmemory::InMemoryCommentStore;
