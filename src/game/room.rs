use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::config::GameConfig;
use crate::connection::Connection;
use crate::protocol::{
    generate_revival_code, normalize_revival_code, Boss, GameSnapshot, GameStatus, KnockoutView,
    LeaderboardEntry, PlayerId, Question, QuestionPayload, RoomId, TeamId,
};

use super::content::check_answer_locally;
use super::player::Player;
use super::team::Team;
use super::GameError;

// ============================================================================
// BATTLE LIFECYCLE DOCUMENTATION
// ============================================================================
//
// This module defines the core battle state machine for the quiz raid
// coordinator. A room progresses through three states with specific triggers
// and rules governing each transition.
//
// ## Room Lifecycle States
//
// ```text
// [*] --> Waiting: Room Created (first join)
//
// Waiting --> Active: player count reaches min_players_to_start
// Active --> Completed: boss_health reaches 0
//
// Waiting --> [*]: Room Expired (empty/inactive timeout)
// Active --> [*]: Room Expired (empty/inactive timeout)
// Completed --> [*]: Room Cleanup
// ```
//
// ### 1. Waiting State
//
// - **Description**: Initial state after lazy creation on the first join.
// - **Characteristics**:
//   - Players join freely; `max_boss_health` is recomputed on every join and
//     leave (`base_health + health_per_player × players`) and the boss sits
//     at full health
//   - No answers are accepted (`GameNotActive`)
//   - Transitions to Active when `min_players_to_start` players are present
//
// ### 2. Active State
//
// - **Description**: The battle proper. A shared countdown of
//   `question_time_limit_secs` ticks once per second.
// - **Characteristics**:
//   - Submitted answers are buffered per player (a resubmission overwrites
//     the earlier one in place, keeping its arrival position)
//   - Submissions arriving at the deadline (`time_elapsed` past the limit,
//     or inside the final countdown second) are evaluated inline instead
//   - When the countdown hits zero: every buffered answer is evaluated in
//     arrival order, knockouts past the revival window are swept, and the
//     countdown resets
//   - `max_boss_health` is frozen; joining mid-battle no longer heals or
//     scales the boss
//
// ### 3. Completed State
//
// - **Description**: Terminal. Entered the moment `boss_health` reaches 0.
// - **Characteristics**:
//   - No answer, damage, knockout, or revive mutates the room afterwards
//   - The final leaderboard is frozen for `game_completed`
//   - The room's countdown task observes the status change and exits
//
// ## Answer Resolution
//
// A correct answer at elapsed time `t` (seconds) deals
// `max(0.5, 2.0 × (limit − t) / limit)` damage, credits the player with a
// flat score award, and advances their question cursor. A wrong answer deals
// no damage and costs exactly one life; at zero lives the player is knocked
// out and handed a fresh revival code. Either way the cursor advances, and
// an exhausted per-player queue is reshuffled from the pool and restarted.
//
// ## Knockout Lifecycle
//
// ```text
// Active --> KnockedOut: lives reach 0 (or forced by player_knocked_out)
// KnockedOut --> Active: teammate presents the revival code (quota consumed)
// KnockedOut --> Active: revival window expires with quota remaining (free)
// KnockedOut --> Dead: revival window expires with quota exhausted
// ```
//
// A knocked-out player appears in the knockout registry exactly as long as
// their status is `KnockedOut`; expiry is resolved by the countdown sweep at
// the end of the cycle in which the window elapsed.
//
// ============================================================================

/// Flat score award for a correct answer. Damage, not score, carries the
/// speed bonus, so ties on score are broken by total damage dealt.
const CORRECT_ANSWER_SCORE: u64 = 100;
/// Damage floor for a correct answer, however late it lands.
const MIN_DAMAGE: f64 = 0.5;
/// Peak damage for an instant correct answer, decaying linearly toward the
/// floor as `time_elapsed` approaches the question time limit.
const DAMAGE_SCALE: f64 = 2.0;

/// A submitted answer awaiting the shared countdown.
#[derive(Debug, Clone)]
struct PendingAnswer {
    player_id: PlayerId,
    question_id: String,
    answer: String,
    time_elapsed: f64,
}

/// Registry entry for a knocked-out player.
#[derive(Debug, Clone)]
struct KnockoutEntry {
    /// Canonical (uppercased) revival code.
    code: String,
    since: Instant,
}

/// Result of joining a room.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub team_id: TeamId,
    /// True when this join moved the room from Waiting to Active.
    pub started: bool,
    /// True when the player id was already present and the join re-bound an
    /// existing participant instead of creating one.
    pub reconnected: bool,
    pub player_count: usize,
    pub max_boss_health: f64,
}

/// Result of leaving a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub player_count: usize,
    pub room_empty: bool,
}

/// Fully evaluated answer, ready to be reported to the submitting player and
/// folded into broadcasts.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub player_id: PlayerId,
    pub question_id: String,
    pub correct: bool,
    pub damage: f64,
    /// Player's score after the evaluation.
    pub score: u64,
    /// Player's lives after the evaluation.
    pub lives: u8,
    /// Boss health after the evaluation.
    pub boss_health: f64,
    /// Set when this answer knocked the player out.
    pub revival_code: Option<String>,
    /// The player's next question, when they are still standing.
    pub next_question: Option<QuestionPayload>,
    pub knocked_out: bool,
    /// Set when this answer felled the boss.
    pub completed: bool,
}

/// How `process_answer` disposed of a submission.
#[derive(Debug)]
pub enum AnswerDisposition {
    /// Held in the pending buffer until the countdown resolves it.
    Buffered,
    /// Evaluated inline because the submission arrived at the deadline.
    Evaluated(Box<AnswerOutcome>),
}

/// Result of a direct damage report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub boss_health: f64,
    /// The reporting player's cumulative damage.
    pub total_damage: f64,
    pub completed: bool,
}

/// Result of a successful revive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviveOutcome {
    pub lives: u8,
    pub revive_count: u32,
}

/// Everything a single countdown tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// True when this tick exhausted the countdown and ran batch resolution.
    pub expired: bool,
    pub outcomes: Vec<AnswerOutcome>,
    /// Players returned to the battle by the sweep, with their new lives.
    pub auto_revived: Vec<(PlayerId, u8)>,
    pub marked_dead: Vec<PlayerId>,
    /// True when this tick ended the battle.
    pub completed: bool,
}

/// Authoritative state for one battle.
///
/// The room is a plain synchronous state machine: no transport, no timers,
/// no I/O. The server drives it under the room lock, and the countdown task
/// calls [`GameRoom::tick_second`] once per second while the battle is
/// active.
#[derive(Debug)]
pub struct GameRoom {
    pub room_id: RoomId,
    pub boss: Boss,
    players: HashMap<PlayerId, Player>,
    teams: Vec<Team>,
    next_team_ordinal: usize,
    pub boss_health: f64,
    pub max_boss_health: f64,
    status: GameStatus,
    questions_pool: Vec<Question>,
    player_question_queue: HashMap<PlayerId, Vec<Question>>,
    player_question_index: HashMap<PlayerId, usize>,
    pending_answers: Vec<PendingAnswer>,
    knocked_out: HashMap<PlayerId, KnockoutEntry>,
    revive_count: HashMap<PlayerId, u32>,
    leaderboard: Vec<LeaderboardEntry>,
    question_time_remaining: u32,
    config: GameConfig,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_activity: chrono::DateTime<chrono::Utc>,
}

impl GameRoom {
    pub fn new(room_id: RoomId, boss: Boss, questions: Vec<Question>, config: GameConfig) -> Self {
        let now = chrono::Utc::now();
        let boss_health = boss.base_health;
        Self {
            room_id,
            boss_health,
            max_boss_health: boss_health,
            boss,
            players: HashMap::new(),
            teams: Vec::new(),
            next_team_ordinal: 1,
            status: GameStatus::Waiting,
            questions_pool: questions,
            player_question_queue: HashMap::new(),
            player_question_index: HashMap::new(),
            pending_answers: Vec::new(),
            knocked_out: HashMap::new(),
            revive_count: HashMap::new(),
            leaderboard: Vec::new(),
            question_time_remaining: config.question_time_limit_secs,
            config,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn question_time_remaining(&self) -> u32 {
        self.question_time_remaining
    }

    pub fn pool_is_empty(&self) -> bool {
        self.questions_pool.is_empty()
    }

    /// Connection handles of every currently bound player, for fan-out.
    pub fn connected_recipients(&self) -> Vec<std::sync::Arc<dyn Connection>> {
        self.players
            .values()
            .filter_map(|p| p.connection().cloned())
            .collect()
    }

    /// Update the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = chrono::Utc::now();
    }

    /// Check if the room is expired based on the given timeouts.
    pub fn is_expired(
        &self,
        empty_timeout: chrono::Duration,
        inactive_timeout: chrono::Duration,
    ) -> bool {
        let now = chrono::Utc::now();
        if self.players.is_empty() {
            now.signed_duration_since(self.created_at) > empty_timeout
        } else {
            now.signed_duration_since(self.last_activity) > inactive_timeout
        }
    }

    /// Players whose disconnect grace window has elapsed; the maintenance
    /// sweep synthesizes leaves for these.
    pub fn players_past_grace(&self, grace: Duration) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.connection().is_none())
            .filter(|p| p.disconnected_at.is_some_and(|at| at.elapsed() >= grace))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Register a player, or re-bind an existing one on reconnect.
    ///
    /// New players are placed on the first team with a free slot (creating a
    /// team when none has one) and handed a freshly shuffled question queue.
    /// While the room is Waiting, the boss is rescaled and fully healed, and
    /// the battle auto-starts once `min_players_to_start` is reached.
    pub fn add_player(&mut self, player_id: PlayerId, name: String) -> Result<JoinOutcome, GameError> {
        self.touch();
        if let Some(player) = self.players.get_mut(&player_id) {
            player.touch();
            let team_id = player.team_id.clone();
            return Ok(JoinOutcome {
                team_id,
                started: false,
                reconnected: true,
                player_count: self.players.len(),
                max_boss_health: self.max_boss_health,
            });
        }
        if self.status == GameStatus::Completed {
            return Err(GameError::GameCompleted);
        }

        let team_id = self.assign_team(&player_id);
        let player = Player::new(
            player_id.clone(),
            name,
            team_id.clone(),
            self.config.starting_lives,
        );
        self.players.insert(player_id.clone(), player);
        self.seed_question_queue(&player_id);
        self.rescale_boss_health();
        self.update_leaderboard();

        let started = self.status == GameStatus::Waiting
            && self.players.len() >= self.config.min_players_to_start
            && self.advance_status(GameStatus::Active);

        Ok(JoinOutcome {
            team_id,
            started,
            reconnected: false,
            player_count: self.players.len(),
            max_boss_health: self.max_boss_health,
        })
    }

    /// Deregister a player and every piece of per-player bookkeeping.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> Result<LeaveOutcome, GameError> {
        let player = self
            .players
            .remove(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
        self.player_question_queue.remove(player_id);
        self.player_question_index.remove(player_id);
        self.knocked_out.remove(player_id);
        self.revive_count.remove(player_id);
        self.pending_answers.retain(|p| &p.player_id != player_id);

        if let Some(team) = self.teams.iter_mut().find(|t| t.id == player.team_id) {
            team.remove_member(player_id);
        }
        self.teams.retain(|t| !t.is_empty());

        self.rescale_boss_health();
        self.update_leaderboard();
        self.touch();

        Ok(LeaveOutcome {
            player_count: self.players.len(),
            room_empty: self.players.is_empty(),
        })
    }

    /// The question a player is expected to answer next.
    pub fn current_question(&self, player_id: &PlayerId) -> Result<&Question, GameError> {
        if !self.players.contains_key(player_id) {
            return Err(GameError::PlayerNotFound(player_id.clone()));
        }
        let queue = self
            .player_question_queue
            .get(player_id)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| GameError::NoQuestionAssigned(player_id.clone()))?;
        let index = self.player_question_index.get(player_id).copied().unwrap_or(0);
        queue
            .get(index % queue.len())
            .ok_or_else(|| GameError::NoQuestionAssigned(player_id.clone()))
    }

    /// Accept a submitted answer.
    ///
    /// The submission must target the player's current question; a mismatch
    /// is a domain error with no side effects. Valid submissions are
    /// buffered for the countdown (one slot per player, resubmission
    /// overwrites in place) unless they arrive at the deadline, in which
    /// case they are evaluated inline.
    pub fn process_answer(
        &mut self,
        player_id: &PlayerId,
        question_id: &str,
        answer: String,
        time_elapsed: f64,
    ) -> Result<AnswerDisposition, GameError> {
        match self.status {
            GameStatus::Waiting => return Err(GameError::GameNotActive),
            GameStatus::Completed => return Err(GameError::GameCompleted),
            GameStatus::Active => {}
        }
        {
            let player = self
                .players
                .get(player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
            if !player.is_active() {
                return Err(GameError::PlayerNotActive(player_id.clone()));
            }
        }
        let current = self.current_question(player_id)?;
        if current.id != question_id {
            return Err(GameError::QuestionMismatch {
                submitted: question_id.to_string(),
                current: current.id.clone(),
            });
        }
        self.touch();
        if let Some(player) = self.players.get_mut(player_id) {
            player.touch();
        }

        let limit = f64::from(self.config.question_time_limit_secs);
        if time_elapsed >= limit || self.question_time_remaining <= 1 {
            return match self.evaluate_answer(player_id, &answer, time_elapsed) {
                Some(outcome) => Ok(AnswerDisposition::Evaluated(Box::new(outcome))),
                None => Err(GameError::NoQuestionAssigned(player_id.clone())),
            };
        }

        if let Some(existing) = self
            .pending_answers
            .iter_mut()
            .find(|p| &p.player_id == player_id)
        {
            existing.question_id = question_id.to_string();
            existing.answer = answer;
            existing.time_elapsed = time_elapsed;
        } else {
            self.pending_answers.push(PendingAnswer {
                player_id: player_id.clone(),
                question_id: question_id.to_string(),
                answer,
                time_elapsed,
            });
        }
        Ok(AnswerDisposition::Buffered)
    }

    /// Evaluate every buffered answer in arrival order and clear the buffer.
    ///
    /// Answers whose player has left, been knocked out, or moved on to a
    /// different question in the meantime are dropped. Evaluation stops the
    /// moment the boss falls; the battle is over and later submissions no
    /// longer count.
    pub fn evaluate_all_pending_answers(&mut self) -> Vec<AnswerOutcome> {
        let drained = std::mem::take(&mut self.pending_answers);
        let mut outcomes = Vec::with_capacity(drained.len());
        for pending in drained {
            if self.status != GameStatus::Active {
                break;
            }
            let still_current = self
                .current_question(&pending.player_id)
                .is_ok_and(|q| q.id == pending.question_id);
            if !still_current {
                continue;
            }
            if let Some(outcome) =
                self.evaluate_answer(&pending.player_id, &pending.answer, pending.time_elapsed)
            {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Direct damage report, credited to the reporting player.
    pub fn apply_boss_damage(
        &mut self,
        player_id: &PlayerId,
        amount: f64,
    ) -> Result<DamageOutcome, GameError> {
        match self.status {
            GameStatus::Waiting => return Err(GameError::GameNotActive),
            GameStatus::Completed => return Err(GameError::GameCompleted),
            GameStatus::Active => {}
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(GameError::InvalidInput(
                "damage must be a positive finite number".to_string(),
            ));
        }
        let total_damage = {
            let player = self
                .players
                .get_mut(player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
            player.record_damage(amount);
            player.touch();
            player.total_damage
        };
        self.boss_health = (self.boss_health - amount).max(0.0);
        let completed = self.boss_health <= 0.0 && self.complete_game();
        self.update_leaderboard();
        self.touch();
        Ok(DamageOutcome {
            boss_health: self.boss_health,
            total_damage,
            completed,
        })
    }

    /// Force a knockout reported by the client, storing the supplied code in
    /// canonical form. Returns the stored code.
    pub fn knock_out_player(
        &mut self,
        player_id: &PlayerId,
        code: &str,
    ) -> Result<String, GameError> {
        if self.status == GameStatus::Completed {
            return Err(GameError::GameCompleted);
        }
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
        if !player.knock_out() {
            return Err(GameError::PlayerNotActive(player_id.clone()));
        }
        player.lives = 0;
        player.touch();
        let normalized = normalize_revival_code(code);
        let code = if normalized.is_empty() {
            generate_revival_code()
        } else {
            normalized
        };
        self.knocked_out.insert(
            player_id.clone(),
            KnockoutEntry {
                code: code.clone(),
                since: Instant::now(),
            },
        );
        self.touch();
        Ok(code)
    }

    /// Revive a knocked-out teammate with their revival code.
    ///
    /// Fails without touching any state when the code mismatches or the
    /// target's revive quota is spent.
    pub fn revive_player(
        &mut self,
        target_id: &PlayerId,
        code: &str,
    ) -> Result<ReviveOutcome, GameError> {
        if self.status == GameStatus::Completed {
            return Err(GameError::GameCompleted);
        }
        if !self.players.contains_key(target_id) {
            return Err(GameError::PlayerNotFound(target_id.clone()));
        }
        let entry = self
            .knocked_out
            .get(target_id)
            .ok_or_else(|| GameError::PlayerNotKnockedOut(target_id.clone()))?;
        if entry.code != normalize_revival_code(code) {
            return Err(GameError::InvalidRevivalCode);
        }
        let used = self.revive_count.get(target_id).copied().unwrap_or(0);
        if used >= self.config.max_revives_per_player {
            return Err(GameError::ReviveQuotaExceeded(target_id.clone()));
        }
        let lives = {
            let player = self
                .players
                .get_mut(target_id)
                .ok_or_else(|| GameError::PlayerNotFound(target_id.clone()))?;
            if !player.revive(self.config.starting_lives) {
                return Err(GameError::PlayerNotKnockedOut(target_id.clone()));
            }
            player.touch();
            player.lives
        };
        self.knocked_out.remove(target_id);
        self.revive_count.insert(target_id.clone(), used + 1);
        self.touch();
        Ok(ReviveOutcome {
            lives,
            revive_count: used + 1,
        })
    }

    /// Rebuild the leaderboard: score descending, total damage descending,
    /// player id as the final deterministic tie-break. Ranks run 1..=N.
    pub fn update_leaderboard(&mut self) {
        let mut rows: Vec<&Player> = self.players.values().collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.total_damage.total_cmp(&a.total_damage))
                .then_with(|| a.id.cmp(&b.id))
        });
        self.leaderboard = rows
            .into_iter()
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1),
                player_id: p.id.clone(),
                player_name: p.name.clone(),
                team_id: p.team_id.clone(),
                score: p.score,
                total_damage: p.total_damage,
            })
            .collect();
    }

    /// Immutable snapshot safe to serialize to clients.
    pub fn game_state(&self) -> GameSnapshot {
        let teams = self
            .teams
            .iter()
            .map(|t| t.summary(|id| self.players.get(id)))
            .collect();
        let window = self.config.revival_window_secs;
        let mut knocked_out: Vec<KnockoutView> = self
            .knocked_out
            .iter()
            .filter_map(|(id, entry)| {
                let player = self.players.get(id)?;
                let elapsed = entry.since.elapsed().as_secs();
                Some(KnockoutView {
                    player_id: id.clone(),
                    player_name: player.name.clone(),
                    revival_window_remaining: u32::try_from(window.saturating_sub(elapsed))
                        .unwrap_or(u32::MAX),
                })
            })
            .collect();
        knocked_out.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        GameSnapshot {
            room_id: self.room_id.clone(),
            status: self.status,
            boss_health: self.boss_health,
            max_boss_health: self.max_boss_health,
            boss_name: self.boss.name.clone(),
            player_count: self.players.len(),
            teams,
            leaderboard: self.leaderboard.clone(),
            knocked_out,
            question_time_remaining: self.question_time_remaining,
        }
    }

    /// One second of countdown. Called by the room's countdown task while
    /// the battle is active; a no-op in any other status.
    pub fn tick_second(&mut self) -> TickOutcome {
        let mut tick = TickOutcome::default();
        if self.status != GameStatus::Active {
            return tick;
        }
        self.question_time_remaining = self.question_time_remaining.saturating_sub(1);
        if self.question_time_remaining == 0 {
            tick.expired = true;
            tick.outcomes = self.evaluate_all_pending_answers();
            if self.status == GameStatus::Active {
                let (auto_revived, marked_dead) = self.sweep_knockouts();
                tick.auto_revived = auto_revived;
                tick.marked_dead = marked_dead;
                self.question_time_remaining = self.config.question_time_limit_secs;
            }
        }
        tick.completed = self.status == GameStatus::Completed;
        tick
    }

    /// Append a fed question to the pool and hand it to players whose
    /// queues ran dry.
    pub fn add_question_to_pool(&mut self, question: Question) {
        self.questions_pool.push(question);
        let dry: Vec<PlayerId> = self
            .player_question_queue
            .iter()
            .filter(|(_, queue)| queue.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        for player_id in dry {
            self.seed_question_queue(&player_id);
        }
        self.touch();
    }

    /// Swap in a replacement pool and reseed every player's queue from it.
    pub fn replace_pool(&mut self, questions: Vec<Question>) {
        self.questions_pool = questions;
        let ids: Vec<PlayerId> = self.players.keys().cloned().collect();
        for player_id in &ids {
            self.seed_question_queue(player_id);
        }
        self.touch();
    }

    fn assign_team(&mut self, player_id: &PlayerId) -> TeamId {
        if let Some(team) = self.teams.iter_mut().find(|t| t.has_space()) {
            team.add_member(player_id);
            return team.id.clone();
        }
        let mut team = Team::new(self.next_team_ordinal, self.config.max_members_per_team);
        self.next_team_ordinal += 1;
        team.add_member(player_id);
        let team_id = team.id.clone();
        self.teams.push(team);
        team_id
    }

    fn seed_question_queue(&mut self, player_id: &PlayerId) {
        let mut queue = self.questions_pool.clone();
        queue.shuffle(&mut rand::rng());
        self.player_question_queue.insert(player_id.clone(), queue);
        self.player_question_index.insert(player_id.clone(), 0);
    }

    /// While Waiting the boss scales with the roster and sits at full
    /// health. Once the battle starts, health is frozen.
    fn rescale_boss_health(&mut self) {
        if self.status != GameStatus::Waiting {
            return;
        }
        self.max_boss_health =
            self.boss.base_health + self.config.health_per_player * self.players.len() as f64;
        self.boss_health = self.max_boss_health;
    }

    fn advance_status(&mut self, next: GameStatus) -> bool {
        if next.phase() > self.status.phase() {
            self.status = next;
            true
        } else {
            false
        }
    }

    fn complete_game(&mut self) -> bool {
        if !self.advance_status(GameStatus::Completed) {
            return false;
        }
        self.question_time_remaining = 0;
        self.pending_answers.clear();
        self.update_leaderboard();
        true
    }

    /// Evaluate one answer against the player's current question. Returns
    /// `None` when the player is gone, no longer standing, or has no
    /// current question.
    fn evaluate_answer(
        &mut self,
        player_id: &PlayerId,
        answer: &str,
        time_elapsed: f64,
    ) -> Option<AnswerOutcome> {
        let question = self.current_question(player_id).ok()?.clone();
        let check = {
            let player = self.players.get(player_id)?;
            if !player.is_active() {
                return None;
            }
            check_answer_locally(&question, answer)
        };
        let correct = check.valid && check.correct;
        let limit = f64::from(self.config.question_time_limit_secs.max(1));

        let mut damage = 0.0;
        let mut knocked_out = false;
        {
            let player = self.players.get_mut(player_id)?;
            player.record_answer(correct);
            if correct {
                damage = (DAMAGE_SCALE * (limit - time_elapsed.max(0.0)) / limit).max(MIN_DAMAGE);
                player.record_damage(damage);
                player.add_score(CORRECT_ANSWER_SCORE);
            } else if player.lose_life() == 0 && player.knock_out() {
                knocked_out = true;
            }
        }

        let revival_code = if knocked_out {
            let code = generate_revival_code();
            self.knocked_out.insert(
                player_id.clone(),
                KnockoutEntry {
                    code: code.clone(),
                    since: Instant::now(),
                },
            );
            Some(code)
        } else {
            None
        };

        if damage > 0.0 {
            self.boss_health = (self.boss_health - damage).max(0.0);
        }
        self.advance_question(player_id);
        let completed = self.boss_health <= 0.0 && self.complete_game();
        self.update_leaderboard();

        let (score, lives, standing) = {
            let player = self.players.get(player_id)?;
            (player.score, player.lives, player.is_active())
        };
        let next_question = if standing && self.status == GameStatus::Active {
            self.current_question(player_id)
                .ok()
                .map(QuestionPayload::from)
        } else {
            None
        };

        Some(AnswerOutcome {
            player_id: player_id.clone(),
            question_id: question.id,
            correct,
            damage,
            score,
            lives,
            boss_health: self.boss_health,
            revival_code,
            next_question,
            knocked_out,
            completed,
        })
    }

    fn advance_question(&mut self, player_id: &PlayerId) {
        let Some(index) = self.player_question_index.get_mut(player_id) else {
            return;
        };
        *index += 1;
        let len = self
            .player_question_queue
            .get(player_id)
            .map_or(0, Vec::len);
        if *index >= len {
            *index = 0;
            let mut fresh = self.questions_pool.clone();
            fresh.shuffle(&mut rand::rng());
            if !fresh.is_empty() {
                self.player_question_queue
                    .insert(player_id.clone(), fresh);
            }
        }
    }

    /// Resolve knockouts whose revival window has elapsed: a free revive
    /// while the player still has quota, otherwise Dead.
    fn sweep_knockouts(&mut self) -> (Vec<(PlayerId, u8)>, Vec<PlayerId>) {
        let window = Duration::from_secs(self.config.revival_window_secs);
        let lapsed: Vec<PlayerId> = self
            .knocked_out
            .iter()
            .filter(|(_, entry)| entry.since.elapsed() >= window)
            .map(|(id, _)| id.clone())
            .collect();

        let mut auto_revived = Vec::new();
        let mut marked_dead = Vec::new();
        for player_id in lapsed {
            self.knocked_out.remove(&player_id);
            let quota_left = self.revive_count.get(&player_id).copied().unwrap_or(0)
                < self.config.max_revives_per_player;
            let Some(player) = self.players.get_mut(&player_id) else {
                continue;
            };
            if quota_left {
                if player.revive(self.config.starting_lives) {
                    auto_revived.push((player_id.clone(), player.lives));
                }
            } else if player.mark_dead() {
                marked_dead.push(player_id.clone());
            }
        }
        (auto_revived, marked_dead)
    }

    #[cfg(test)]
    pub(crate) fn backdate_knockout(&mut self, player_id: &PlayerId, seconds: u64) {
        if let Some(entry) = self.knocked_out.get_mut(player_id) {
            entry.since = Instant::now() - Duration::from_secs(seconds);
        }
    }
}
