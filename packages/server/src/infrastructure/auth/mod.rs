//! 認証・権限判定の実装

pub mod policy;
pub mod token_file;

pub use policy::StaticAccessPolicy;
pub use token_file::{StaticTokenIdentityProvider, TokenFileError};
