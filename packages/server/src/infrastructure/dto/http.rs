//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::PresenceStatus;

/// Operational summary for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummaryDto {
    pub connected_users: usize,
    pub connections: usize,
    pub active_projects: usize,
    pub total_rooms: usize,
    pub dropped_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDetailDto {
    pub user_id: String,
    pub user_name: String,
    pub status: PresenceStatus,
    /// RFC 3339
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceListDto {
    pub project_id: String,
    pub users: Vec<PresenceDetailDto>,
}
