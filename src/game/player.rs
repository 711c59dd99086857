use std::sync::Arc;
use std::time::Instant;

use crate::connection::Connection;
use crate::protocol::{PlayerId, PlayerStatus, PlayerSummary, TeamId};

/// One participant in a battle.
///
/// Holds identity, the outbound connection handle, and battle stats. All
/// mutation goes through the methods below so the status machine stays
/// consistent: `Active → KnockedOut → Active` via revive, or
/// `KnockedOut → Dead` when the revival window closes with the revive quota
/// spent. `Dead` is terminal for the current battle.
///
/// Booleans like "is knocked out" are always derived from `status`; there is
/// no parallel flag to drift out of sync.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    pub score: u64,
    pub lives: u8,
    status: PlayerStatus,
    pub correct_answers: u32,
    pub answers_submitted: u32,
    pub total_damage: f64,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub last_activity: Instant,
    /// Set while a socket is bound to this player; `None` between disconnect
    /// and reconnect (or synthesized leave).
    connection: Option<Arc<dyn Connection>>,
    /// When the current disconnect began, for the reconnect grace window.
    pub disconnected_at: Option<Instant>,
}

/// Read-only battle statistics derived from a player's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStats {
    /// `correct_answers / answers_submitted`, or 0 when nothing was answered.
    pub accuracy: f64,
    pub correct_answers: u32,
    pub answers_submitted: u32,
    pub total_damage: f64,
    pub session_duration: std::time::Duration,
}

impl Player {
    pub fn new(id: PlayerId, name: String, team_id: TeamId, lives: u8) -> Self {
        Self {
            id,
            name,
            team_id,
            score: 0,
            lives,
            status: PlayerStatus::Active,
            correct_answers: 0,
            answers_submitted: 0,
            total_damage: 0.0,
            joined_at: chrono::Utc::now(),
            last_activity: Instant::now(),
            connection: None,
            disconnected_at: None,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn is_knocked_out(&self) -> bool {
        self.status == PlayerStatus::KnockedOut
    }

    pub fn is_dead(&self) -> bool {
        self.status == PlayerStatus::Dead
    }

    /// Remove one life, saturating at zero. Returns the remaining lives.
    pub fn lose_life(&mut self) -> u8 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Move to `KnockedOut`. Only an `Active` player can be knocked out;
    /// knocking out a dead player is a no-op returning false.
    pub fn knock_out(&mut self) -> bool {
        if self.status != PlayerStatus::Active {
            return false;
        }
        self.status = PlayerStatus::KnockedOut;
        true
    }

    /// Return a knocked-out player to the battle with one restored life,
    /// capped at `max_lives`. Returns false when the player was not
    /// knocked out.
    pub fn revive(&mut self, max_lives: u8) -> bool {
        if self.status != PlayerStatus::KnockedOut {
            return false;
        }
        self.status = PlayerStatus::Active;
        self.lives = (self.lives + 1).min(max_lives);
        true
    }

    /// Terminal transition when the revival window expires with no quota
    /// left.
    pub fn mark_dead(&mut self) -> bool {
        if self.status != PlayerStatus::KnockedOut {
            return false;
        }
        self.status = PlayerStatus::Dead;
        true
    }

    /// Credit boss damage dealt by this player.
    pub fn record_damage(&mut self, amount: f64) {
        self.total_damage += amount;
    }

    pub fn add_score(&mut self, points: u64) {
        self.score += points;
    }

    /// Count one submitted answer and, if it was right, one correct answer.
    pub fn record_answer(&mut self, correct: bool) {
        self.answers_submitted += 1;
        if correct {
            self.correct_answers += 1;
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Bind a (new) socket to this player. Any previous handle is returned
    /// so the caller can close it; binding clears the disconnect clock.
    pub fn bind_connection(&mut self, conn: Arc<dyn Connection>) -> Option<Arc<dyn Connection>> {
        self.disconnected_at = None;
        self.connection.replace(conn)
    }

    /// Drop the socket handle after a disconnect and start the grace clock.
    pub fn unbind_connection(&mut self) -> Option<Arc<dyn Connection>> {
        self.disconnected_at = Some(Instant::now());
        self.connection.take()
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_open())
    }

    /// Read-only stats snapshot; no side effects.
    pub fn stats(&self) -> PlayerStats {
        let accuracy = if self.answers_submitted == 0 {
            0.0
        } else {
            f64::from(self.correct_answers) / f64::from(self.answers_submitted)
        };
        PlayerStats {
            accuracy,
            correct_answers: self.correct_answers,
            answers_submitted: self.answers_submitted,
            total_damage: self.total_damage,
            session_duration: chrono::Utc::now()
                .signed_duration_since(self.joined_at)
                .to_std()
                .unwrap_or_default(),
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            lives: self.lives,
            score: self.score,
            total_damage: self.total_damage,
            correct_answers: self.correct_answers,
        }
    }
}
