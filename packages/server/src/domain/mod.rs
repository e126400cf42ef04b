//! ドメイン層
//!
//! Value Object、Entity、集約（ProjectRoom）と、外部に依存する処理の trait を定義します。

pub mod collaborator;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod room;
pub mod value_object;

pub use collaborator::{AccessPolicy, CommentStore, IdentityProvider};
pub use entity::{
    CommentEvent, CommentPosition, Connection, CursorEvent,
    CursorPosition, Identity, MemberEvent, NewComment, OutboundEvent, PresenceRecord,
    StatusSummary, StatusUpdateEvent, StoredComment,
};
pub use error::{
    CommentStoreError, ErrorCode, MessagePushError, RepositoryError, RoomError, ValueObjectError,
};
pub use message_pusher::{BroadcastReport, MessagePusher, PusherChannel};
pub use repository::{
    ConnectionLease, ConnectionLifecycle, ConnectionRepository, Departure, Membership,
    RoomRepository, StatusBroadcast,
};
pub use room::{JoinOutcome, LeaveOutcome, ProjectRoom, StatusChange};
pub use value_object::{
    CommentContent, CommentId, ConnectionId, ConnectionIdFactory, DisplayName, PresenceStatus,
    ProjectId, Timestamp, UserId,
};
