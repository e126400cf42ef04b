//! InMemory Repository 実装
//!
//! 単一プロセス内で完結するレジストリ。プロセスをまたいだ共有は行いません。

pub mod connection;
pub mod room;

pub use connection::InMemoryConnectionRepository;
pub use room::InMemoryRoomRepository;
