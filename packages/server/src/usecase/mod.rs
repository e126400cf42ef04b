//! UseCase 層
//!
//! 1 つの操作につき 1 つのユースケースを置き、Domain 層の trait だけに依存します。

pub mod connect_client;
pub mod disconnect_client;
pub mod error;
mod fanout;
pub mod get_presence;
pub mod get_status_summary;
pub mod heartbeat;
pub mod join_project;
pub mod leave_project;
pub mod manage_comment;
pub mod move_cursor;
pub mod post_comment;
pub mod service;
pub mod update_status;

#[cfg(test)]
mod test_support;

pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::{DisconnectClientUseCase, DisconnectReport};
pub use error::{CommentError, ConnectError, PresenceError};
pub use get_presence::GetPresenceUseCase;
pub use get_status_summary::GetStatusSummaryUseCase;
pub use heartbeat::HeartbeatUseCase;
pub use join_project::JoinProjectUseCase;
pub use leave_project::LeaveProjectUseCase;
pub use manage_comment::{CommentAction, ManageCommentUseCase};
pub use move_cursor::MoveCursorUseCase;
pub use post_comment::PostCommentUseCase;
pub use service::{CollabService, Collaborators};
pub use update_status::UpdateStatusUseCase;
