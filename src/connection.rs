//! Transport-free outbound delivery capability.
//!
//! Game logic never touches sockets. It talks to a [`Connection`], which in
//! production wraps a bounded per-socket queue (see `websocket::connection`)
//! and in tests is a recording fake. Sends are fire-and-forget and must
//! never block: a full queue is a delivery failure, not back-pressure on
//! the room.

use bytes::Bytes;

use crate::protocol::ServerMessage;

/// Errors surfaced by [`Connection::send`] and [`Connection::send_frame`].
///
/// Delivery failures are logged and dropped; the room never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,
    #[error("outbound queue is full")]
    QueueFull,
    #[error("failed to serialize message: {0}")]
    Serialization(String),
}

/// Capability to push messages to one client.
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Serialize `message` and enqueue it. Must not block.
    fn send(&self, message: &ServerMessage) -> Result<(), SendError>;

    /// Enqueue an already-serialized JSON text frame. Broadcast paths
    /// serialize once and share the bytes across recipients.
    fn send_frame(&self, frame: Bytes) -> Result<(), SendError>;

    /// Whether the underlying transport can still accept frames.
    fn is_open(&self) -> bool;

    /// Ask the transport to shut down. Frames already queued may still
    /// flush; everything after is rejected with [`SendError::Closed`].
    fn close(&self);
}

/// Serialize a server message to the JSON text frame form used on the wire.
pub fn encode_frame(message: &ServerMessage) -> Result<Bytes, SendError> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|err| SendError::Serialization(err.to_string()))
}

/// Recording fake used by unit tests across the crate.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingConnection {
    pub sent: std::sync::Mutex<Vec<ServerMessage>>,
    pub open: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingConnection {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            sent: std::sync::Mutex::new(Vec::new()),
            open: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub fn close(&self) {
        self.open.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn take_sent(&self) -> Vec<ServerMessage> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }
}

#[cfg(test)]
impl Connection for RecordingConnection {
    fn send(&self, message: &ServerMessage) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn send_frame(&self, frame: Bytes) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        let message = serde_json::from_slice(&frame)
            .map_err(|err| SendError::Serialization(err.to_string()))?;
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn close(&self) {
        RecordingConnection::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_frame_produces_wire_json() {
        let frame = encode_frame(&ServerMessage::connection_ack("r1".to_string())).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(value["type"], "connection_ack");
        assert_eq!(value["roomId"], "r1");
    }

    #[test]
    fn recording_connection_round_trips_frames() {
        let conn = RecordingConnection::new();
        let message = ServerMessage::connection_ack("r9".to_string());
        conn.send_frame(encode_frame(&message).unwrap()).unwrap();
        assert_eq!(conn.take_sent(), vec![message]);
    }

    #[test]
    fn closed_connection_rejects_sends() {
        let conn = RecordingConnection::new();
        conn.close();
        let message = ServerMessage::connection_ack("r1".to_string());
        assert_eq!(conn.send(&message), Err(SendError::Closed));
    }
}
