//! ProjectRoom 集約
//!
//! 1 プロジェクト分の配信スコープ。メンバー（ユーザー）ごとにプレゼンスと
//! そのユーザーが Room に参加させている接続の集合を持つ。
//!
//! 不変条件: ユーザーがメンバーであるのは、そのユーザーの接続が 1 本以上
//! 参加しているときに限る。

use std::collections::{BTreeSet, HashMap};

use super::{
    Connection, ConnectionId, PresenceRecord, PresenceStatus, ProjectId, RoomError, Timestamp,
    UserId,
};

#[derive(Debug, Clone)]
struct RoomMember {
    presence: PresenceRecord,
    connections: BTreeSet<ConnectionId>,
}

/// join の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// この接続は既に参加済み（何もしない）
    AlreadyJoined,
    /// ユーザーは既にメンバーで、接続だけが追加された
    ConnectionAdded,
    /// ユーザーが新たにメンバーになった
    UserJoined,
}

/// leave の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// この接続は参加していなかった
    NotJoined,
    /// 接続は外れたが、同じユーザーの別の接続が残っている
    ConnectionRemoved,
    /// ユーザーの最後の接続だったため、メンバーから外れた
    UserLeft(PresenceRecord),
}

/// set_status の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub record: PresenceRecord,
    /// offline への遷移で Room から外れた接続
    pub retired_connections: Vec<ConnectionId>,
}

/// プロジェクト単位の Room
#[derive(Debug, Clone)]
pub struct ProjectRoom {
    pub id: ProjectId,
    pub created_at: Timestamp,
    members: HashMap<UserId, RoomMember>,
}

impl ProjectRoom {
    pub fn new(id: ProjectId, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at,
            members: HashMap::new(),
        }
    }

    /// 接続を Room に参加させる
    ///
    /// ユーザーにとって最初の接続であれば `online` のプレゼンスを作成する。
    pub fn join(&mut self, connection: &Connection, now: Timestamp) -> JoinOutcome {
        let user_id = connection.user_id();
        if let Some(member) = self.members.get_mut(user_id) {
            if member.connections.insert(connection.id) {
                JoinOutcome::ConnectionAdded
            } else {
                JoinOutcome::AlreadyJoined
            }
        } else {
            let presence = PresenceRecord {
                user_id: user_id.clone(),
                user_name: connection.identity.name.clone(),
                project_id: self.id.clone(),
                status: PresenceStatus::Online,
                last_seen: now,
            };
            self.members.insert(
                user_id.clone(),
                RoomMember {
                    presence,
                    connections: BTreeSet::from([connection.id]),
                },
            );
            JoinOutcome::UserJoined
        }
    }

    /// 接続を Room から外す
    pub fn leave(&mut self, connection_id: &ConnectionId, user_id: &UserId) -> LeaveOutcome {
        let Some(member) = self.members.get_mut(user_id) else {
            return LeaveOutcome::NotJoined;
        };
        if !member.connections.remove(connection_id) {
            return LeaveOutcome::NotJoined;
        }
        if !member.connections.is_empty() {
            return LeaveOutcome::ConnectionRemoved;
        }
        match self.members.remove(user_id) {
            Some(mut member) => {
                member.presence.status = PresenceStatus::Offline;
                LeaveOutcome::UserLeft(member.presence)
            }
            None => LeaveOutcome::NotJoined,
        }
    }

    /// プレゼンス状態を更新する
    ///
    /// `offline` への遷移はメンバーからの除外と同じ扱いになる。
    pub fn set_status(
        &mut self,
        user_id: &UserId,
        status: PresenceStatus,
        now: Timestamp,
    ) -> Result<StatusChange, RoomError> {
        let member = self
            .members
            .get_mut(user_id)
            .ok_or_else(|| RoomError::NotAMember(user_id.to_string()))?;

        let current = member.presence.status;
        if !current.can_transition_to(status) {
            return Err(RoomError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        member.presence.status = status;
        member.presence.last_seen = now;

        if status != PresenceStatus::Offline {
            return Ok(StatusChange {
                record: member.presence.clone(),
                retired_connections: Vec::new(),
            });
        }

        match self.members.remove(user_id) {
            Some(member) => Ok(StatusChange {
                record: member.presence,
                retired_connections: member.connections.into_iter().collect(),
            }),
            None => Err(RoomError::NotAMember(user_id.to_string())),
        }
    }

    /// last_seen のみを更新する
    pub fn touch(&mut self, user_id: &UserId, now: Timestamp) -> bool {
        match self.members.get_mut(user_id) {
            Some(member) => {
                member.presence.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn presence(&self, user_id: &UserId) -> Option<&PresenceRecord> {
        self.members.get(user_id).map(|member| &member.presence)
    }

    /// メンバーのプレゼンス一覧（user_id 順）
    pub fn presence_list(&self) -> Vec<PresenceRecord> {
        let mut records: Vec<PresenceRecord> = self
            .members
            .values()
            .map(|member| member.presence.clone())
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        records
    }

    pub fn has_connection(&self, connection_id: &ConnectionId) -> bool {
        self.members
            .values()
            .any(|member| member.connections.contains(connection_id))
    }

    /// Room に参加している全接続
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.members
            .values()
            .flat_map(|member| member.connections.iter().copied())
            .collect()
    }

    /// 指定ユーザー以外のメンバーの接続
    pub fn connections_excluding_user(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|(id, _)| *id != user_id)
            .flat_map(|(_, member)| member.connections.iter().copied())
            .collect()
    }

    /// 指定接続以外の全接続
    pub fn connections_excluding(&self, connection_id: &ConnectionId) -> Vec<ConnectionId> {
        self.connection_ids()
            .into_iter()
            .filter(|id| id != connection_id)
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn connection_count(&self) -> usize {
        self.members
            .values()
            .map(|member| member.connections.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
