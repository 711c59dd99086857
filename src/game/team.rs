use crate::protocol::{PlayerId, TeamId, TeamSummary};

use super::player::Player;

/// Balancing container grouping players for display and team leaderboards.
///
/// Teams are created on demand by the room when no existing team has a free
/// slot, and pruned when their last member leaves.
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub member_ids: Vec<PlayerId>,
    pub max_members: usize,
}

impl Team {
    /// Teams are numbered from 1 in creation order.
    pub fn new(ordinal: usize, max_members: usize) -> Self {
        Self {
            id: format!("team-{ordinal}"),
            name: format!("Team {ordinal}"),
            member_ids: Vec::new(),
            max_members,
        }
    }

    pub fn has_space(&self) -> bool {
        self.member_ids.len() < self.max_members
    }

    /// Add a member if there is room. Returns false when full or already
    /// present.
    pub fn add_member(&mut self, player_id: &PlayerId) -> bool {
        if !self.has_space() || self.member_ids.contains(player_id) {
            return false;
        }
        self.member_ids.push(player_id.clone());
        true
    }

    pub fn remove_member(&mut self, player_id: &PlayerId) -> bool {
        let before = self.member_ids.len();
        self.member_ids.retain(|id| id != player_id);
        self.member_ids.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    /// Project this team into its wire form, resolving members against the
    /// room's player table. Members that no longer resolve are skipped.
    pub fn summary<'a, F>(&self, resolve: F) -> TeamSummary
    where
        F: Fn(&PlayerId) -> Option<&'a Player>,
    {
        TeamSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            members: self
                .member_ids
                .iter()
                .filter_map(|id| resolve(id).map(Player::summary))
                .collect(),
            max_members: self.max_members,
        }
    }
}
