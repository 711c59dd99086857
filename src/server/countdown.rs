//! Per-room countdown task.
//!
//! One task per active battle, started when the room flips to Active. It
//! drives the shared question timer at one-second resolution: every tick
//! runs the room's timer logic, delivers whatever that produced (batch
//! answer results, auto revives, deaths, completion) and pushes a fresh
//! snapshot to everyone. The task stops when the battle ends or the room's
//! cancellation token fires.

use std::sync::Arc;

use tokio::time::{interval_at, Duration, Instant};

use super::{messaging, RoomCell};
use crate::broadcast::SerializationBuffer;
use crate::protocol::{now_millis, GameStatus, ServerMessage};

/// Snapshot frames are per-room and rebuilt every second; cap the reusable
/// buffer so one giant room does not pin memory forever.
const SNAPSHOT_BUFFER_CAP: usize = 64 * 1024;

pub(crate) fn spawn_countdown(cell: Arc<RoomCell>) {
    tokio::spawn(run_countdown(cell));
}

async fn run_countdown(cell: Arc<RoomCell>) {
    let period = Duration::from_secs(1);
    // First tick lands a full second from now; interval() would fire
    // immediately and shave a second off the first question.
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut buffer = SerializationBuffer::new();

    loop {
        tokio::select! {
            () = cell.countdown.cancelled() => {
                tracing::debug!("Countdown cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let mut room = cell.room.lock().await;
        let tick = room.tick_second();

        for outcome in &tick.outcomes {
            messaging::deliver_answer_outcome(&room, outcome);
        }
        for (player_id, lives) in &tick.auto_revived {
            messaging::broadcast_room(
                &room,
                ServerMessage::PlayerRevived {
                    player_id: player_id.clone(),
                    revived_by: None,
                    lives: *lives,
                    timestamp: now_millis(),
                },
            );
        }
        for player_id in &tick.marked_dead {
            tracing::info!(player_id = %player_id, "Player out of revives, marked dead");
        }
        if !tick.outcomes.is_empty() {
            messaging::broadcast_room(
                &room,
                ServerMessage::leaderboard_update(room.leaderboard().to_vec()),
            );
        }
        if tick.completed {
            messaging::broadcast_completion(&room);
        }

        // The 1 Hz snapshot keeps countdown displays and knockout windows
        // in sync without per-event traffic.
        match buffer.serialize_json(&ServerMessage::game_state_update(room.game_state())) {
            Ok(frame) => messaging::broadcast_frame(&room, frame),
            Err(err) => tracing::warn!(error = %err, "Failed to serialize room snapshot"),
        }
        buffer.reset_if_oversized(SNAPSHOT_BUFFER_CAP);

        if room.status() != GameStatus::Active {
            tracing::debug!("Battle over, countdown task exiting");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::active_room_with_players;
    use crate::game::GameRoom;
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    fn cell_from(room: GameRoom) -> Arc<RoomCell> {
        Arc::new(RoomCell {
            room: Mutex::new(room),
            countdown: CancellationToken::new(),
        })
    }

    /// Let the countdown task drain every tick that `advance` made due.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_broadcasts_a_snapshot() {
        let (room, connections) = active_room_with_players(&["alice", "bob"]);
        let cell = cell_from(room);
        let task = tokio::spawn(run_countdown(Arc::clone(&cell)));

        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        task.abort();
        let _ = task.await;

        let sent = connections["alice"].take_sent();
        let remaining: Vec<u32> = sent
            .iter()
            .filter_map(|m| match m {
                ServerMessage::GameStateUpdate { game_state, .. } => {
                    Some(game_state.question_time_remaining)
                }
                _ => None,
            })
            .collect();
        assert!(remaining.len() >= 3, "got {} snapshots", remaining.len());
        // Countdown is visibly decreasing.
        assert!(remaining.windows(2).all(|w| w[1] <= w[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_resolves_buffered_answers() {
        let (mut room, connections) = active_room_with_players(&["alice", "bob"]);
        let question = room.current_question(&"alice".to_string()).unwrap().clone();
        let disposition = room
            .process_answer(
                &"alice".to_string(),
                &question.id,
                question.correct_answer.clone(),
                3.0,
            )
            .unwrap();
        assert!(matches!(
            disposition,
            crate::game::AnswerDisposition::Buffered
        ));
        let cell = cell_from(room);

        let task = tokio::spawn(run_countdown(Arc::clone(&cell)));
        // Default question window is 30 seconds.
        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;
        task.abort();
        let _ = task.await;

        let to_alice = connections["alice"].take_sent();
        assert!(to_alice
            .iter()
            .any(|m| matches!(m, ServerMessage::AnswerResult { correct: true, .. })));
        assert!(to_alice
            .iter()
            .any(|m| matches!(m, ServerMessage::QuestionChanged { .. })));
        let to_bob = connections["bob"].take_sent();
        assert!(to_bob
            .iter()
            .any(|m| matches!(m, ServerMessage::LeaderboardUpdate { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_task() {
        let (room, _connections) = active_room_with_players(&["alice", "bob"]);
        let cell = cell_from(room);
        let task = tokio::spawn(run_countdown(Arc::clone(&cell)));

        cell.countdown.cancel();
        let joined = task.await;
        assert!(joined.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_battle_ends_the_task() {
        let (mut room, connections) = active_room_with_players(&["alice", "bob"]);
        // Leave the boss a sliver of health so one buffered correct answer
        // finishes the fight on expiry.
        room.apply_boss_damage(&"bob".to_string(), room.game_state().boss_health - 0.5)
            .unwrap();
        let question = room.current_question(&"alice".to_string()).unwrap().clone();
        room.process_answer(
            &"alice".to_string(),
            &question.id,
            question.correct_answer.clone(),
            2.0,
        )
        .unwrap();
        let cell = cell_from(room);

        let task = tokio::spawn(run_countdown(Arc::clone(&cell)));
        tokio::time::advance(Duration::from_secs(31)).await;
        let joined = task.await;
        assert!(joined.is_ok(), "task should exit after completion");

        let to_alice = connections["alice"].take_sent();
        assert!(to_alice
            .iter()
            .any(|m| matches!(m, ServerMessage::GameCompleted { .. })));

        let room = cell.lock().await;
        assert_eq!(room.status(), GameStatus::Completed);
    }
}
