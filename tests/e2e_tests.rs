
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quiz_raid_server::protocol::{
    now_millis, ClientMessage, ErrorCode, GameStatus, ServerMessage,
};
use quiz_raid_server::server::BattleServer;
use test_helpers::{
    connect_raw, connect_to_room, join_message, next_message, send, start_server,
    start_test_server, test_config, wait_for, WsSink, WsStream,
};
use tokio_tungstenite::tungstenite::Message;

/// Asserts the server closes this socket, tolerating frames still in flight.
async fn expect_closed(stream: &mut WsStream) {
    for _ in 0..50 {
        match tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for the close")
        {
            None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
            Some(Ok(_)) => continue,
        }
    }
    panic!("server never closed the connection");
}

fn answer_message(
    player_id: &str,
    question_id: &str,
    answer: &str,
    time_elapsed: f64,
) -> ClientMessage {
    ClientMessage::SubmitAnswer {
        player_id: player_id.to_string(),
        question_id: question_id.to_string(),
        answer: answer.to_string(),
        time_elapsed,
        timestamp: now_millis(),
    }
}

/// The player's current question id plus an answer chosen by `choose_correct`,
/// read through the server handle since the wire payloads never carry the
/// correct answer.
async fn current_question_answer(
    server: &Arc<BattleServer>,
    room_id: &str,
    player_id: &str,
    choose_correct: bool,
) -> (String, String) {
    let cell = server.room(&room_id.to_string()).expect("room exists");
    let room = cell.lock().await;
    let question = room
        .current_question(&player_id.to_string())
        .expect("player has a question assigned");
    let answer = if choose_correct {
        question.correct_answer.clone()
    } else {
        question
            .options
            .iter()
            .find(|option| **option != question.correct_answer)
            .expect("question has a wrong option")
            .clone()
    };
    (question.id.clone(), answer)
}

/// Joins two players and waits until both hold a question in an active
/// battle. Returns the sockets in join order.
async fn start_two_player_battle(
    addr: SocketAddr,
    room_id: &str,
) -> ((WsSink, WsStream), (WsSink, WsStream)) {
    let (mut sink_a, mut stream_a) = connect_to_room(addr, room_id).await;
    send(&mut sink_a, &join_message(room_id, "alice", "Alice")).await;
    wait_for(&mut stream_a, |m| match m {
        ServerMessage::GameStateUpdate { .. } => Some(()),
        _ => None,
    })
    .await;

    let (mut sink_b, mut stream_b) = connect_to_room(addr, room_id).await;
    send(&mut sink_b, &join_message(room_id, "bob", "Bob")).await;

    for stream in [&mut stream_a, &mut stream_b] {
        wait_for(stream, |m| match m {
            ServerMessage::QuestionChanged { .. } => Some(()),
            _ => None,
        })
        .await;
    }
    ((sink_a, stream_a), (sink_b, stream_b))
}

/// Drives a player to zero lives with wrong answers evaluated at the
/// deadline. Returns the revival code from the knockout result.
async fn knock_out_over_the_wire(
    server: &Arc<BattleServer>,
    room_id: &str,
    sink: &mut WsSink,
    stream: &mut WsStream,
    player_id: &str,
) -> String {
    for expected_lives in (0..3u8).rev() {
        let (question_id, wrong) =
            current_question_answer(server, room_id, player_id, false).await;
        send(sink, &answer_message(player_id, &question_id, &wrong, 30.0)).await;

        let (correct, lives, code) = wait_for(stream, |m| match m {
            ServerMessage::AnswerResult {
                question_id: qid,
                correct,
                lives,
                revival_code,
                ..
            } if qid == question_id => Some((correct, lives, revival_code)),
            _ => None,
        })
        .await;
        assert!(!correct);
        assert_eq!(lives, expected_lives);
        if expected_lives == 0 {
            return code.expect("knockout carries a revival code");
        }
        assert!(code.is_none());
    }
    unreachable!("loop returns on the knockout");
}

#[tokio::test]
async fn health_endpoint_reports_server_counts() {
    let (addr, _server) = start_test_server().await;

    let (mut sink, mut stream) = connect_to_room(addr, "health-room").await;
    send(&mut sink, &join_message("health-room", "alice", "Alice")).await;
    wait_for(&mut stream, |m| match m {
        ServerMessage::GameStateUpdate { .. } => Some(()),
        _ => None,
    })
    .await;

    let response = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("health request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("health body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rooms"], 1);
    assert_eq!(body["players"], 1);
    assert_eq!(body["connections"], 1);
}

#[tokio::test]
async fn player_operations_require_a_join_first() {
    let (addr, _server) = start_test_server().await;
    let (mut sink, mut stream) = connect_to_room(addr, "gate-room").await;

    send(
        &mut sink,
        &ClientMessage::RequestGameState {
            player_id: "alice".to_string(),
            timestamp: now_millis(),
        },
    )
    .await;

    match next_message(&mut stream).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::NotJoined));
        }
        other => panic!("expected a not-joined error, got {other:?}"),
    }
}

#[tokio::test]
async fn battle_starts_when_the_second_player_joins() {
    let (addr, _server) = start_test_server().await;

    let (mut sink_a, mut stream_a) = connect_to_room(addr, "r1").await;
    send(&mut sink_a, &join_message("r1", "alice", "Alice")).await;

    // Alone in the room: a waiting snapshot and no question yet.
    let snapshot = wait_for(&mut stream_a, |m| match m {
        ServerMessage::GameStateUpdate { game_state, .. } => Some(game_state),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.status, GameStatus::Waiting);
    assert_eq!(snapshot.player_count, 1);

    let (mut sink_b, mut stream_b) = connect_to_room(addr, "r1").await;
    send(&mut sink_b, &join_message("r1", "bob", "Bob")).await;

    // The first player hears about the newcomer, with the boss pool already
    // rescaled for two players (30 base + 5 each).
    let (player_id, player_count, max_boss_health) = wait_for(&mut stream_a, |m| match m {
        ServerMessage::PlayerJoined {
            player_id,
            player_count,
            max_boss_health,
            ..
        } => Some((player_id, player_count, max_boss_health)),
        _ => None,
    })
    .await;
    assert_eq!(player_id, "bob");
    assert_eq!(player_count, 2);
    assert_eq!(max_boss_health, 40.0);

    // Both see the battle go active and receive their first question.
    for stream in [&mut stream_a, &mut stream_b] {
        let snapshot = wait_for(stream, |m| match m {
            ServerMessage::GameStateUpdate { game_state, .. } => {
                (game_state.status == GameStatus::Active).then_some(game_state)
            }
            _ => None,
        })
        .await;
        assert_eq!(snapshot.boss_health, 40.0);
        assert_eq!(snapshot.max_boss_health, 40.0);
        assert_eq!(snapshot.player_count, 2);

        let question = wait_for(stream, |m| match m {
            ServerMessage::QuestionChanged { question, .. } => Some(question),
            _ => None,
        })
        .await;
        assert!(!question.id.is_empty());
        assert!(!question.options.is_empty());
    }
}

#[tokio::test]
async fn deadline_answer_damages_the_boss() {
    let (addr, server) = start_test_server().await;
    let ((mut sink_a, mut stream_a), (_sink_b, mut stream_b)) =
        start_two_player_battle(addr, "r2").await;

    let (question_id, correct) = current_question_answer(&server, "r2", "alice", true).await;
    send(
        &mut sink_a,
        &answer_message("alice", &question_id, &correct, 30.0),
    )
    .await;

    // At the 30s deadline the speed bonus has fully decayed, leaving the
    // floor damage of 0.5.
    let result = wait_for(&mut stream_a, |m| match m {
        ServerMessage::AnswerResult {
            question_id: qid,
            correct,
            damage,
            score,
            lives,
            boss_health,
            ..
        } if qid == question_id => Some((correct, damage, score, lives, boss_health)),
        _ => None,
    })
    .await;
    assert!(result.0);
    assert_eq!(result.1, 0.5);
    assert_eq!(result.2, 100);
    assert_eq!(result.3, 3);
    assert_eq!(result.4, 39.5);

    // The next question follows for the answering player.
    let next = wait_for(&mut stream_a, |m| match m {
        ServerMessage::QuestionChanged { question, .. } => Some(question),
        _ => None,
    })
    .await;
    assert_ne!(next.id, question_id);

    // Everyone sees the standings move.
    let leaderboard = wait_for(&mut stream_b, |m| match m {
        ServerMessage::LeaderboardUpdate { leaderboard, .. } => {
            (!leaderboard.is_empty()).then_some(leaderboard)
        }
        _ => None,
    })
    .await;
    assert_eq!(leaderboard[0].player_id, "alice");
    assert_eq!(leaderboard[0].score, 100);
    assert_eq!(leaderboard[0].rank, 1);
}

#[tokio::test]
async fn three_wrong_answers_knock_the_player_out() {
    let (addr, server) = start_test_server().await;
    let ((mut sink_a, mut stream_a), (mut sink_b, mut stream_b)) =
        start_two_player_battle(addr, "r3").await;

    let code = knock_out_over_the_wire(&server, "r3", &mut sink_a, &mut stream_a, "alice").await;

    let code_format = regex::Regex::new("^[23456789ABCDEFGHJKLMNPQRSTUVWXYZ]{6}$").unwrap();
    assert!(code_format.is_match(&code), "bad revival code: {code}");

    // The knockout is visible to the whole room, with the revival window
    // counting down.
    send(
        &mut sink_b,
        &ClientMessage::RequestGameState {
            player_id: "bob".to_string(),
            timestamp: now_millis(),
        },
    )
    .await;
    let snapshot = wait_for(&mut stream_b, |m| match m {
        ServerMessage::GameStateUpdate { game_state, .. } => {
            (!game_state.knocked_out.is_empty()).then_some(game_state)
        }
        _ => None,
    })
    .await;
    assert_eq!(snapshot.knocked_out.len(), 1);
    assert_eq!(snapshot.knocked_out[0].player_id, "alice");
    assert!(snapshot.knocked_out[0].revival_window_remaining > 0);
}

#[tokio::test]
async fn teammate_code_revives_the_fallen_player() {
    let (addr, server) = start_test_server().await;
    let ((mut sink_a, mut stream_a), (mut sink_b, mut stream_b)) =
        start_two_player_battle(addr, "r4").await;

    let code = knock_out_over_the_wire(&server, "r4", &mut sink_a, &mut stream_a, "alice").await;

    send(
        &mut sink_b,
        &ClientMessage::RevivePlayer {
            player_id: "bob".to_string(),
            target_player_id: "alice".to_string(),
            revival_code: code.to_lowercase(),
            timestamp: now_millis(),
        },
    )
    .await;

    // Both sockets see the revival; codes are case-insensitive on entry.
    for stream in [&mut stream_a, &mut stream_b] {
        let (player_id, revived_by, lives) = wait_for(stream, |m| match m {
            ServerMessage::PlayerRevived {
                player_id,
                revived_by,
                lives,
                ..
            } => Some((player_id, revived_by, lives)),
            _ => None,
        })
        .await;
        assert_eq!(player_id, "alice");
        assert_eq!(revived_by.as_deref(), Some("bob"));
        assert_eq!(lives, 1);
    }

    // Back in the fight: the revived player can answer again.
    let (question_id, correct) = current_question_answer(&server, "r4", "alice", true).await;
    send(
        &mut sink_a,
        &answer_message("alice", &question_id, &correct, 30.0),
    )
    .await;
    let correct_flag = wait_for(&mut stream_a, |m| match m {
        ServerMessage::AnswerResult {
            question_id: qid,
            correct,
            ..
        } if qid == question_id => Some(correct),
        _ => None,
    })
    .await;
    assert!(correct_flag);
}

#[tokio::test]
async fn boss_defeat_completes_the_battle() {
    let (addr, _server) = start_test_server().await;
    let ((mut sink_a, mut stream_a), (_sink_b, mut stream_b)) =
        start_two_player_battle(addr, "r5").await;

    send(
        &mut sink_a,
        &ClientMessage::BossDamage {
            player_id: "alice".to_string(),
            damage: 40.0,
            question_id: "direct".to_string(),
            timestamp: now_millis(),
        },
    )
    .await;

    for stream in [&mut stream_a, &mut stream_b] {
        let leaderboard = wait_for(stream, |m| match m {
            ServerMessage::GameCompleted { leaderboard, .. } => Some(leaderboard),
            _ => None,
        })
        .await;
        assert_eq!(leaderboard.len(), 2);
        assert_eq!(leaderboard[0].player_id, "alice");
        assert_eq!(leaderboard[0].rank, 1);
        assert_eq!(leaderboard[0].total_damage, 40.0);
    }

    // Late submissions bounce off the finished battle.
    send(
        &mut sink_a,
        &answer_message("alice", "any-question", "anything", 1.0),
    )
    .await;
    let error_code = wait_for(&mut stream_a, |m| match m {
        ServerMessage::Error { error_code, .. } => Some(error_code),
        _ => None,
    })
    .await;
    assert_eq!(error_code, Some(ErrorCode::GameAlreadyCompleted));
}

#[tokio::test]
async fn per_ip_connection_limit_is_enforced() {
    let mut config = test_config();
    config.server.max_connections_per_ip = 1;
    let (addr, _server) = start_server(config).await;

    let (_sink_1, _stream_1) = connect_to_room(addr, "limit-room").await;

    // The second socket from the same address is turned away before the ack.
    let (_sink_2, mut stream_2) = connect_raw(addr, "limit-room").await;
    match next_message(&mut stream_2).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::TooManyConnections));
        }
        other => panic!("expected a connection-limit error, got {other:?}"),
    }
    expect_closed(&mut stream_2).await;
}

#[tokio::test]
async fn invalid_room_path_is_rejected() {
    let (addr, _server) = start_test_server().await;

    let (_sink, mut stream) = connect_raw(addr, "bad.room").await;
    match next_message(&mut stream).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::InvalidRoomId));
        }
        other => panic!("expected a room id error, got {other:?}"),
    }
    expect_closed(&mut stream).await;
}

#[tokio::test]
async fn oversized_frames_are_refused() {
    let mut config = test_config();
    config.server.max_message_size = 1024;
    let (addr, _server) = start_server(config).await;

    let (mut sink, mut stream) = connect_to_room(addr, "size-room").await;
    sink.send(Message::Text("x".repeat(2048).into()))
        .await
        .expect("send oversized frame");

    match next_message(&mut stream).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::MessageTooLarge));
        }
        other => panic!("expected a frame-size error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_are_refused() {
    let (addr, _server) = start_test_server().await;
    let (mut sink, mut stream) = connect_to_room(addr, "parse-room").await;

    sink.send(Message::Text("this is not json".into()))
        .await
        .expect("send garbage text");
    match next_message(&mut stream).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::InvalidMessage));
        }
        other => panic!("expected a parse error, got {other:?}"),
    }

    sink.send(Message::Binary(vec![0x01, 0x02, 0x03].into()))
        .await
        .expect("send binary frame");
    match next_message(&mut stream).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::InvalidMessage));
        }
        other => panic!("expected a binary rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn rejoining_on_a_new_socket_takes_the_seat_over() {
    let (addr, server) = start_test_server().await;
    let ((_sink_a, mut stream_a), (_sink_b, _stream_b)) =
        start_two_player_battle(addr, "r6").await;

    // Same player id on a fresh socket: the new session gets the current
    // state and the old socket is shut down.
    let (mut sink_a2, mut stream_a2) = connect_to_room(addr, "r6").await;
    send(&mut sink_a2, &join_message("r6", "alice", "Alice")).await;

    let snapshot = wait_for(&mut stream_a2, |m| match m {
        ServerMessage::GameStateUpdate { game_state, .. } => Some(game_state),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.status, GameStatus::Active);
    assert_eq!(snapshot.player_count, 2);
    wait_for(&mut stream_a2, |m| match m {
        ServerMessage::QuestionChanged { .. } => Some(()),
        _ => None,
    })
    .await;

    expect_closed(&mut stream_a).await;

    // The seat works from its new socket.
    let (question_id, correct) = current_question_answer(&server, "r6", "alice", true).await;
    send(
        &mut sink_a2,
        &answer_message("alice", &question_id, &correct, 30.0),
    )
    .await;
    let correct_flag = wait_for(&mut stream_a2, |m| match m {
        ServerMessage::AnswerResult {
            question_id: qid,
            correct,
            ..
        } if qid == question_id => Some(correct),
        _ => None,
    })
    .await;
    assert!(correct_flag);
}

#[tokio::test]
async fn progress_survives_a_reconnect() {
    let (addr, server) = start_test_server().await;
    let ((mut sink_a, mut stream_a), (_sink_b, _stream_b)) =
        start_two_player_battle(addr, "r7").await;

    let (question_id, correct) = current_question_answer(&server, "r7", "alice", true).await;
    send(
        &mut sink_a,
        &answer_message("alice", &question_id, &correct, 30.0),
    )
    .await;
    let score = wait_for(&mut stream_a, |m| match m {
        ServerMessage::AnswerResult {
            question_id: qid,
            score,
            ..
        } if qid == question_id => Some(score),
        _ => None,
    })
    .await;
    assert_eq!(score, 100);

    sink_a.close().await.expect("close first socket");
    drop(stream_a);

    // Rejoin within the grace window: score and room membership survive.
    let (mut sink_a2, mut stream_a2) = connect_to_room(addr, "r7").await;
    send(&mut sink_a2, &join_message("r7", "alice", "Alice")).await;
    let snapshot = wait_for(&mut stream_a2, |m| match m {
        ServerMessage::GameStateUpdate { game_state, .. } => Some(game_state),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.player_count, 2);
    let alice = snapshot
        .leaderboard
        .iter()
        .find(|entry| entry.player_id == "alice")
        .expect("alice stays on the leaderboard");
    assert_eq!(alice.score, 100);
}
