use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::{encode_frame, Connection, SendError};
use crate::protocol::validation;
use crate::protocol::{ClientMessage, ConnectionId, ErrorCode, ServerMessage};
use crate::server::BattleServer;

/// Socket-backed [`Connection`]: a handle the room can push frames through
/// without ever blocking. Frames go into a bounded queue drained by the
/// connection's pump task; a full queue drops the frame rather than stall
/// the room lock.
#[derive(Debug)]
struct WsConnection {
    outbound: mpsc::Sender<Bytes>,
    open: AtomicBool,
    shutdown: CancellationToken,
}

impl WsConnection {
    fn new(outbound: mpsc::Sender<Bytes>) -> Self {
        Self {
            outbound,
            open: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
        }
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Connection for WsConnection {
    fn send(&self, message: &ServerMessage) -> Result<(), SendError> {
        self.send_frame(encode_frame(message)?)
    }

    fn send_frame(&self, frame: Bytes) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        self.outbound.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    fn close(&self) {
        self.mark_closed();
        self.shutdown.cancel();
    }
}

/// Serialize and push a frame on the raw sink, bypassing the queue. Used
/// before the connection is registered (rejections) when no pump exists.
async fn send_immediate(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

fn send_or_log(connection: &WsConnection, message: &ServerMessage) {
    if let Err(err) = connection.send(message) {
        tracing::debug!(error = %err, "Failed to queue reply");
    }
}

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<BattleServer>,
    room_id: String,
    addr: SocketAddr,
) {
    let (mut sender, mut receiver) = socket.split();

    if let Err(reason) =
        validation::validate_room_id_with_config(&room_id, &server.config().protocol)
    {
        tracing::debug!(client_addr = %addr, reason = %reason, "Rejecting invalid room id");
        let _ = send_immediate(
            &mut sender,
            &ServerMessage::error(reason, Some(ErrorCode::InvalidRoomId)),
        )
        .await;
        let _ = sender.close().await;
        return;
    }

    let capacity = server.config().websocket.outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Bytes>(capacity);
    let connection = Arc::new(WsConnection::new(tx));
    let connection_id: ConnectionId = Uuid::new_v4();

    if let Err(err) =
        server.register_connection(connection_id, connection.clone(), addr, room_id.clone())
    {
        tracing::warn!(client_addr = %addr, error = %err, "Refusing connection");
        let _ = send_immediate(
            &mut sender,
            &ServerMessage::error(err.to_string(), Some(ErrorCode::TooManyConnections)),
        )
        .await;
        let _ = sender.close().await;
        return;
    }
    tracing::info!(
        %connection_id,
        client_addr = %addr,
        room_id = %room_id,
        "WebSocket connection established"
    );

    // Ack first so the client knows it may send join_game.
    send_or_log(&connection, &ServerMessage::connection_ack(room_id.clone()));

    // Pump: drain the outbound queue onto the socket until the peer goes
    // away or the connection is closed from the server side.
    let pump_connection = Arc::clone(&connection);
    let send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                () = pump_connection.shutdown.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let text = match Utf8Bytes::try_from(frame) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "Dropping non-UTF-8 outbound frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        pump_connection.mark_closed();
        let _ = sender.close().await;
    });

    let max_message_size = server.config().server.max_message_size;
    loop {
        let incoming = tokio::select! {
            // Fires when a rejoin takes this seat over and closes us.
            () = connection.shutdown.cancelled() => break,
            incoming = receiver.next() => match incoming {
                Some(incoming) => incoming,
                None => break,
            },
        };
        let message = match incoming {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(%connection_id, error = %err, "WebSocket receive error");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if text.len() > max_message_size {
                    tracing::warn!(
                        %connection_id,
                        size = text.len(),
                        limit = max_message_size,
                        "Inbound message over the size limit"
                    );
                    send_or_log(
                        &connection,
                        &ServerMessage::error_from_code(ErrorCode::MessageTooLarge),
                    );
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(client_message) => {
                        tracing::debug!(
                            %connection_id,
                            message_type = client_message.type_name(),
                            "Dispatching client message"
                        );
                        server
                            .handle_client_message(connection_id, client_message)
                            .await;
                    }
                    Err(err) => {
                        tracing::debug!(
                            %connection_id,
                            error = %err,
                            "Failed to parse client message"
                        );
                        send_or_log(
                            &connection,
                            &ServerMessage::error(
                                format!("invalid message: {err}"),
                                Some(ErrorCode::InvalidMessage),
                            ),
                        );
                    }
                }
            }
            Message::Binary(_) => {
                send_or_log(
                    &connection,
                    &ServerMessage::error(
                        "binary frames are not supported",
                        Some(ErrorCode::InvalidMessage),
                    ),
                );
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                tracing::debug!(%connection_id, "Client sent close frame");
                break;
            }
        }
    }

    connection.mark_closed();
    server.handle_disconnect(connection_id).await;
    send_task.abort();
    tracing::info!(%connection_id, client_addr = %addr, "WebSocket connection closed");
}
