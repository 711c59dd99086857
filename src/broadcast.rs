//! Broadcast primitives for fan-out without per-recipient work.
//!
//! Room events routinely go to every connected player. Serializing the same
//! message once per recipient would dominate the cost of a broadcast, so the
//! server encodes each outbound message into a [`BroadcastFrame`] exactly
//! once and hands cheap [`Bytes`] clones to every connection queue.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use smallvec::SmallVec;

use crate::connection::{encode_frame, SendError};
use crate::protocol::{PlayerId, ServerMessage};

/// Recipient count most rooms stay under; used for stack allocation.
pub const TYPICAL_ROOM_SIZE: usize = 8;

/// List of player ids sized for typical rooms. Stays on the stack for up to
/// [`TYPICAL_ROOM_SIZE`] players and spills to the heap beyond that.
pub type PlayerIdList = SmallVec<[PlayerId; TYPICAL_ROOM_SIZE]>;

/// A server message serialized once for delivery to many connections.
///
/// The typed message is kept alongside the wire bytes so call sites that
/// need to inspect or log what was sent do not have to re-parse the frame.
#[derive(Debug, Clone)]
pub struct BroadcastFrame {
    message: Arc<ServerMessage>,
    bytes: Bytes,
}

impl BroadcastFrame {
    /// Serialize `message` into its wire frame. Serialization happens here,
    /// never per recipient.
    pub fn new(message: ServerMessage) -> Result<Self, SendError> {
        let bytes = encode_frame(&message)?;
        Ok(Self {
            message: Arc::new(message),
            bytes,
        })
    }

    pub fn message(&self) -> &ServerMessage {
        &self.message
    }

    /// Cheap reference-counted clone of the wire bytes.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

impl TryFrom<ServerMessage> for BroadcastFrame {
    type Error = SendError;

    fn try_from(message: ServerMessage) -> Result<Self, SendError> {
        Self::new(message)
    }
}

/// Reusable serialization buffer for hot paths that emit a frame every tick.
///
/// The countdown task serializes a snapshot once per second per room; reusing
/// one buffer keeps that path allocation-free in the steady state.
pub struct SerializationBuffer {
    buffer: BytesMut,
    default_capacity: usize,
}

impl SerializationBuffer {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            default_capacity: capacity,
        }
    }

    /// Serialize `value` as JSON and split off the frozen frame, leaving the
    /// buffer ready for the next call.
    pub fn serialize_json<T: Serialize>(&mut self, value: &T) -> Result<Bytes, SendError> {
        self.buffer.clear();
        serde_json::to_writer((&mut self.buffer).writer(), value)
            .map_err(|err| SendError::Serialization(err.to_string()))?;
        Ok(self.buffer.split().freeze())
    }

    /// Shrink back to the default capacity after an unusually large frame.
    pub fn reset_if_oversized(&mut self, max_size: usize) {
        if self.buffer.capacity() > max_size {
            self.buffer = BytesMut::with_capacity(self.default_capacity);
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Default for SerializationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Which players a frame should reach.
#[derive(Debug, Clone)]
pub enum BroadcastTarget {
    /// Every listed player.
    Room { players: PlayerIdList },
    /// Every listed player except one (typically the actor who already got a
    /// direct response).
    RoomExcept {
        players: PlayerIdList,
        except: PlayerId,
    },
    /// Exactly one player.
    Player(PlayerId),
}

impl BroadcastTarget {
    pub fn room(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self::Room {
            players: players.into_iter().collect(),
        }
    }

    pub fn room_except(players: impl IntoIterator<Item = PlayerId>, except: PlayerId) -> Self {
        Self::RoomExcept {
            players: players.into_iter().collect(),
            except,
        }
    }

    /// Upper bound on recipients (the excluded player may not be listed).
    pub fn recipient_count(&self) -> usize {
        match self {
            Self::Room { players } => players.len(),
            Self::RoomExcept { players, .. } => players.len().saturating_sub(1),
            Self::Player(_) => 1,
        }
    }

    /// Iterate over recipient ids with the exclusion applied.
    pub fn recipients(&self) -> impl Iterator<Item = &PlayerId> + '_ {
        let (players, except): (&[PlayerId], Option<&PlayerId>) = match self {
            Self::Room { players } => (players.as_slice(), None),
            Self::RoomExcept { players, except } => (players.as_slice(), Some(except)),
            Self::Player(id) => (std::slice::from_ref(id), None),
        };

        players.iter().filter(move |id| Some(*id) != except)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_serializes_once_and_parses_back() {
        let frame = BroadcastFrame::new(ServerMessage::connection_ack("r1".to_string())).unwrap();

        let copy_a = frame.bytes();
        let copy_b = frame.bytes();
        assert_eq!(copy_a, copy_b);

        let parsed: ServerMessage = serde_json::from_slice(&copy_a).unwrap();
        assert_eq!(&parsed, frame.message());
    }

    #[test]
    fn serialization_buffer_is_reusable() {
        let mut buffer = SerializationBuffer::with_capacity(256);

        let first = buffer
            .serialize_json(&ServerMessage::connection_ack("r1".to_string()))
            .unwrap();
        let second = buffer
            .serialize_json(&ServerMessage::connection_ack("r2".to_string()))
            .unwrap();

        let a: serde_json::Value = serde_json::from_slice(&first).unwrap();
        let b: serde_json::Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(a["roomId"], "r1");
        assert_eq!(b["roomId"], "r2");
    }

    #[test]
    fn oversized_buffer_shrinks_back() {
        let mut buffer = SerializationBuffer::with_capacity(64);
        buffer.buffer.reserve(128 * 1024);
        buffer.reset_if_oversized(64 * 1024);
        assert!(buffer.capacity() <= 64 * 1024);
    }

    #[test]
    fn player_id_list_spills_past_typical_size() {
        let mut list = PlayerIdList::new();
        for i in 0..TYPICAL_ROOM_SIZE {
            list.push(format!("p{i}"));
        }
        assert!(!list.spilled());

        list.push("overflow".to_string());
        assert!(list.spilled());
    }

    #[test]
    fn room_except_filters_the_actor() {
        let players = ["alice", "bob", "carol", "dave"].map(String::from);
        let target = BroadcastTarget::room_except(players, "bob".to_string());

        let recipients: Vec<&PlayerId> = target.recipients().collect();
        assert_eq!(recipients.len(), 3);
        assert!(!recipients.iter().any(|id| id.as_str() == "bob"));
        assert_eq!(target.recipient_count(), 3);
    }

    #[test]
    fn single_target_yields_one_recipient() {
        let target = BroadcastTarget::Player("alice".to_string());
        let recipients: Vec<&PlayerId> = target.recipients().collect();
        assert_eq!(recipients, vec![&"alice".to_string()]);
    }
}
